//! Catalog of named tools grouped by toggleable category (spec.md §4.3).
//!
//! Population is an explicit `register_all()` call, not import side
//! effects (spec.md §9) — see [`crate::builtins::register_all`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::CategoryEnables;
use crate::tool::{Tool, ToolCategory};

/// Entries in insertion order; duplicate names within a single registry are
/// a programming error caught eagerly by [`ToolRegistry::add`].
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<(ToolCategory, Arc<dyn Tool>)>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Panics if a tool with the same name was already
    /// registered — duplicate names within a build are a programming error,
    /// not a runtime condition callers should need to handle.
    pub fn add(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        let name = tool.name();
        assert!(
            !self.entries.iter().any(|(_, t)| t.name() == name),
            "duplicate tool name registered: {name}"
        );
        self.entries.push((tool.category(), tool));
        self
    }

    /// Build the enabled subset for `categories`: toggleable categories are
    /// skipped when their enable flag is false; the rest always load.
    pub fn build(&self, categories: &CategoryEnables) -> EnabledTools {
        let mut tools = HashMap::new();
        for (category, tool) in &self.entries {
            if category.is_toggleable() && !category_enabled(*category, categories) {
                continue;
            }
            tools.insert(tool.name().to_string(), tool.clone());
        }
        EnabledTools { tools }
    }
}

fn category_enabled(category: ToolCategory, categories: &CategoryEnables) -> bool {
    match category {
        ToolCategory::Filesystem => categories.filesystem,
        ToolCategory::Shell => categories.shell,
        ToolCategory::Git => categories.git,
        ToolCategory::Network => categories.network,
        _ => true,
    }
}

/// The enabled subset of the registry for a particular [`CategoryEnables`]
/// snapshot — what the executor dispatches against and what the protocol
/// server advertises as `capabilities`.
#[derive(Clone, Default)]
pub struct EnabledTools {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl EnabledTools {
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}
