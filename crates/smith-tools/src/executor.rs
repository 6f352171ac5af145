//! `execute(tool_name, args)` — look up, validate, invoke under timeout,
//! normalize into a [`ToolResult`] envelope (spec.md §4.5).

use std::time::{Duration, Instant};

use serde_json::Value;

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::registry::EnabledTools;
use crate::schema::validate;
use crate::tool::ToolResult;

pub struct Executor<'a> {
    enabled: &'a EnabledTools,
    ctx: &'a ToolContext,
}

impl<'a> Executor<'a> {
    pub fn new(enabled: &'a EnabledTools, ctx: &'a ToolContext) -> Self {
        Self { enabled, ctx }
    }

    pub async fn execute(&self, tool_name: &str, args: Value) -> ToolResult {
        let start = Instant::now();

        let tool = match self.enabled.get(tool_name) {
            Some(tool) => tool,
            None => {
                return ToolResult::fail(
                    ToolError::UnknownTool(tool_name.to_string()).to_string(),
                    elapsed_ms(start),
                );
            }
        };

        if let Err(e) = validate(tool.args_schema(), &args) {
            return ToolResult::fail(e.to_string(), elapsed_ms(start));
        }

        let effective_timeout = self.ctx.effective_timeout_ms(&args);
        let call = tool.call(args, self.ctx);

        match tokio::time::timeout(Duration::from_millis(effective_timeout), call).await {
            Ok(Ok(data)) => ToolResult::ok(data, elapsed_ms(start)),
            Ok(Err(e)) => ToolResult::fail(e.to_string(), elapsed_ms(start)),
            Err(_) => ToolResult::fail(ToolError::Timeout.to_string(), effective_timeout),
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryEnables;
    use crate::registry::ToolRegistry;
    use crate::schema::{ArgSpec, ArgType};
    use crate::tool::{Tool, ToolCategory};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct EchoTool;
    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &'static str {
            "echo"
        }
        fn category(&self) -> ToolCategory {
            ToolCategory::Processes
        }
        fn args_schema(&self) -> &'static [ArgSpec] {
            &[ArgSpec::required("message", ArgType::String)]
        }
        async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
            Ok(args.get("message").cloned().unwrap_or(Value::Null))
        }
    }

    struct SleepTool;
    #[async_trait]
    impl Tool for SleepTool {
        fn name(&self) -> &'static str {
            "sleep"
        }
        fn category(&self) -> ToolCategory {
            ToolCategory::Processes
        }
        fn args_schema(&self) -> &'static [ArgSpec] {
            &[]
        }
        async fn call(&self, _args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Value::Null)
        }
    }

    struct FailTool;
    #[async_trait]
    impl Tool for FailTool {
        fn name(&self) -> &'static str {
            "fail"
        }
        fn category(&self) -> ToolCategory {
            ToolCategory::Processes
        }
        fn args_schema(&self) -> &'static [ArgSpec] {
            &[]
        }
        async fn call(&self, _args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
            Err(ToolError::ToolFailure("boom".to_string()))
        }
    }

    fn test_ctx() -> ToolContext {
        ToolContext {
            sandbox_dir: std::env::temp_dir(),
            allowed_shell_commands: vec![],
            timeout_ms: 5_000,
            readonly_mode: false,
            categories: CategoryEnables::default(),
        }
    }

    #[tokio::test]
    async fn unknown_tool_fails() {
        let registry = ToolRegistry::new();
        let enabled = registry.build(&CategoryEnables::default());
        let ctx = test_ctx();
        let result = Executor::new(&enabled, &ctx).execute("nope", json!({})).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("unknown tool"));
    }

    #[tokio::test]
    async fn bad_arguments_fails() {
        let mut registry = ToolRegistry::new();
        registry.add(Arc::new(EchoTool));
        let enabled = registry.build(&CategoryEnables::default());
        let ctx = test_ctx();
        let result = Executor::new(&enabled, &ctx).execute("echo", json!({})).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("bad arguments"));
    }

    #[tokio::test]
    async fn success_wraps_data() {
        let mut registry = ToolRegistry::new();
        registry.add(Arc::new(EchoTool));
        let enabled = registry.build(&CategoryEnables::default());
        let ctx = test_ctx();
        let result = Executor::new(&enabled, &ctx)
            .execute("echo", json!({"message": "hi"}))
            .await;
        assert!(result.success);
        assert_eq!(result.data, json!("hi"));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn tool_failure_surfaces_error() {
        let mut registry = ToolRegistry::new();
        registry.add(Arc::new(FailTool));
        let enabled = registry.build(&CategoryEnables::default());
        let ctx = test_ctx();
        let result = Executor::new(&enabled, &ctx).execute("fail", json!({})).await;
        assert!(!result.success);
        assert_eq!(result.error.unwrap(), "boom");
    }

    #[tokio::test]
    async fn timeout_is_enforced() {
        let mut registry = ToolRegistry::new();
        registry.add(Arc::new(SleepTool));
        let enabled = registry.build(&CategoryEnables::default());
        let mut ctx = test_ctx();
        ctx.timeout_ms = 50;
        let result = Executor::new(&enabled, &ctx).execute("sleep", json!({})).await;
        assert!(!result.success);
        assert_eq!(result.duration_ms, 50);
        assert!(result.error.unwrap().contains("timed out"));
    }
}
