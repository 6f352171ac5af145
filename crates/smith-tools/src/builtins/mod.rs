//! Built-in tool implementations grouped by category, wired into a
//! [`ToolRegistry`] by the explicit [`register_all`] constructor (spec.md
//! §9 — replacing a global-mutable-registry-by-import-side-effects design
//! with one explicit call the binary makes at startup).

pub mod browser;
pub mod filesystem;
pub mod git;
pub mod network;
pub mod packages;
pub mod processes;
pub mod search;
pub mod shell;
pub mod system;

use std::sync::Arc;

use crate::registry::ToolRegistry;
use browser::{
    BrowserSingleton, ClickTool, FetchContentTool, FillTool, GetDomTool, NavigateTool,
    ScreenshotTool,
};
use filesystem::{
    AppendFileTool, CopyFileTool, DeleteFileTool, GlobFindTool, GrepFilesTool, ListDirTool,
    MkdirTool, MoveFileTool, ReadFileTool, StatTool, WriteFileTool,
};
use git::{
    GitAddTool, GitCheckoutTool, GitCloneTool, GitCommitTool, GitCreateBranchTool, GitDiffTool,
    GitLogTool, GitPullTool, GitPushTool, GitStashTool, GitStatusTool, GitWorktreeAddTool,
};
use network::{DnsLookupTool, DownloadFileTool, HttpRequestTool, PingTool, PortCheckTool};
use packages::{CargoBuildTool, NpmInstallTool, NpmRunTool, PipInstallTool};
use processes::{EnvReadTool, GetProcessTool, KillProcessTool, ListProcessesTool, SystemInfoTool};
use search::SearchTool;
use shell::{RunCommandTool, RunScriptTool, WhichTool};
use system::{ClipboardReadTool, ClipboardWriteTool, NotifyTool, OpenFileTool, OpenUrlTool};

/// Construct a registry holding every built-in tool. `browser` is shared
/// across the browser-category tools as a single long-lived singleton
/// (spec.md §4.4); everything else is stateless.
pub fn register_all(browser: Arc<BrowserSingleton>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry
        .add(Arc::new(ReadFileTool))
        .add(Arc::new(WriteFileTool))
        .add(Arc::new(AppendFileTool))
        .add(Arc::new(DeleteFileTool))
        .add(Arc::new(MoveFileTool))
        .add(Arc::new(CopyFileTool))
        .add(Arc::new(MkdirTool))
        .add(Arc::new(StatTool))
        .add(Arc::new(ListDirTool))
        .add(Arc::new(GrepFilesTool))
        .add(Arc::new(GlobFindTool));

    registry
        .add(Arc::new(RunCommandTool))
        .add(Arc::new(RunScriptTool))
        .add(Arc::new(WhichTool));

    registry
        .add(Arc::new(GitStatusTool))
        .add(Arc::new(GitDiffTool))
        .add(Arc::new(GitLogTool))
        .add(Arc::new(GitAddTool))
        .add(Arc::new(GitCommitTool))
        .add(Arc::new(GitPushTool))
        .add(Arc::new(GitPullTool))
        .add(Arc::new(GitCheckoutTool))
        .add(Arc::new(GitCreateBranchTool))
        .add(Arc::new(GitStashTool))
        .add(Arc::new(GitCloneTool))
        .add(Arc::new(GitWorktreeAddTool));

    registry
        .add(Arc::new(HttpRequestTool))
        .add(Arc::new(PingTool))
        .add(Arc::new(PortCheckTool))
        .add(Arc::new(DnsLookupTool))
        .add(Arc::new(DownloadFileTool));

    registry
        .add(Arc::new(ListProcessesTool))
        .add(Arc::new(GetProcessTool))
        .add(Arc::new(KillProcessTool))
        .add(Arc::new(SystemInfoTool))
        .add(Arc::new(EnvReadTool));

    registry
        .add(Arc::new(NpmInstallTool))
        .add(Arc::new(NpmRunTool))
        .add(Arc::new(PipInstallTool))
        .add(Arc::new(CargoBuildTool));

    registry
        .add(Arc::new(NotifyTool))
        .add(Arc::new(ClipboardReadTool))
        .add(Arc::new(ClipboardWriteTool))
        .add(Arc::new(OpenUrlTool))
        .add(Arc::new(OpenFileTool));

    registry
        .add(Arc::new(NavigateTool { browser: browser.clone() }))
        .add(Arc::new(GetDomTool { browser: browser.clone() }))
        .add(Arc::new(ClickTool { browser: browser.clone() }))
        .add(Arc::new(FillTool { browser: browser.clone() }))
        .add(Arc::new(FetchContentTool { browser: browser.clone() }))
        .add(Arc::new(ScreenshotTool { browser }))
        .add(Arc::new(SearchTool::new()));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryEnables;

    #[test]
    fn registers_every_tool_once() {
        let browser = Arc::new(BrowserSingleton::with_null_driver());
        let registry = register_all(browser);
        let enabled = registry.build(&CategoryEnables::default());
        let names = enabled.names();
        assert!(names.contains(&"read_file".to_string()));
        assert!(names.contains(&"git_commit".to_string()));
        assert!(names.contains(&"search".to_string()));
        assert!(names.contains(&"navigate".to_string()));
    }
}
