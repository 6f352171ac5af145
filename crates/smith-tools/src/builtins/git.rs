//! Git category: status, diff, log, add, commit, push, pull, checkout,
//! create_branch, stash, clone, worktree_add (spec.md §4.4).
//!
//! Every tool goes through the shell adapter with argv `git ...`; `git`
//! itself must be allowlisted. Destructive sub-commands (commit, push,
//! pull, checkout, stash, clone, worktree add — per the glossary; `add` is
//! not in that enumeration) are refused under read-only mode.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::schema::{ArgSpec, ArgType};
use crate::tool::{Tool, ToolCategory};
use smith_sandbox::{truncate_output, Platform, RunOptions, ShellAdapter, DEFAULT_OUTPUT_CAP_BYTES};

async fn run_git(
    ctx: &ToolContext,
    request_args: &Value,
    args: &[String],
    cwd: Option<std::path::PathBuf>,
    destructive: bool,
) -> Result<Value, ToolError> {
    ctx.check_command_allowed("git")?;
    if destructive {
        ctx.check_not_readonly("git")?;
    }

    let opts = RunOptions {
        cwd: cwd.or_else(|| Some(ctx.sandbox_dir.clone())),
        timeout: Some(std::time::Duration::from_millis(
            ctx.effective_timeout_ms(request_args),
        )),
        env: Default::default(),
    };
    let adapter = ShellAdapter::new(Platform::current());
    let result = adapter.run("git", args, opts).await;

    if result.exit_code != 0 {
        return Err(ToolError::ToolFailure(format!(
            "git {} failed: {}",
            args.join(" "),
            truncate_output(&result.stderr, DEFAULT_OUTPUT_CAP_BYTES)
        )));
    }

    Ok(json!({
        "stdout": truncate_output(&result.stdout, DEFAULT_OUTPUT_CAP_BYTES),
        "stderr": truncate_output(&result.stderr, DEFAULT_OUTPUT_CAP_BYTES),
    }))
}

macro_rules! git_tool {
    ($struct_name:ident, $tool_name:literal, $destructive:expr, $build_args:expr) => {
        pub struct $struct_name;
        #[async_trait]
        impl Tool for $struct_name {
            fn name(&self) -> &'static str {
                $tool_name
            }
            fn category(&self) -> ToolCategory {
                ToolCategory::Git
            }
            fn args_schema(&self) -> &'static [ArgSpec] {
                &[]
            }
            async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
                let git_args = $build_args(&args)?;
                run_git(ctx, &args, &git_args, None, $destructive).await
            }
        }
    };
}

fn opt_str(args: &Value, field: &str) -> Option<String> {
    args.get(field).and_then(Value::as_str).map(String::from)
}

git_tool!(GitStatusTool, "git_status", false, |_args: &Value| {
    Ok::<_, ToolError>(vec!["status".to_string(), "--short".to_string()])
});

git_tool!(GitDiffTool, "git_diff", false, |args: &Value| {
    let mut v = vec!["diff".to_string()];
    if let Some(path) = opt_str(args, "path") {
        v.push(path);
    }
    Ok::<_, ToolError>(v)
});

git_tool!(GitLogTool, "git_log", false, |args: &Value| {
    let limit = args.get("limit").and_then(Value::as_u64).unwrap_or(20);
    Ok::<_, ToolError>(vec![
        "log".to_string(),
        format!("-{limit}"),
        "--oneline".to_string(),
    ])
});

git_tool!(GitAddTool, "git_add", false, |args: &Value| {
    let path = opt_str(args, "path").unwrap_or_else(|| ".".to_string());
    Ok::<_, ToolError>(vec!["add".to_string(), path])
});

git_tool!(GitCommitTool, "git_commit", true, |args: &Value| {
    let message = opt_str(args, "message")
        .ok_or_else(|| ToolError::BadArguments("missing required field 'message'".to_string()))?;
    Ok::<_, ToolError>(vec!["commit".to_string(), "-m".to_string(), message])
});

git_tool!(GitPushTool, "git_push", true, |args: &Value| {
    let mut v = vec!["push".to_string()];
    if let Some(remote) = opt_str(args, "remote") {
        v.push(remote);
    }
    if let Some(branch) = opt_str(args, "branch") {
        v.push(branch);
    }
    Ok::<_, ToolError>(v)
});

git_tool!(GitPullTool, "git_pull", true, |_args: &Value| {
    Ok::<_, ToolError>(vec!["pull".to_string()])
});

git_tool!(GitCheckoutTool, "git_checkout", true, |args: &Value| {
    let target = opt_str(args, "target")
        .ok_or_else(|| ToolError::BadArguments("missing required field 'target'".to_string()))?;
    Ok::<_, ToolError>(vec!["checkout".to_string(), target])
});

git_tool!(GitCreateBranchTool, "git_create_branch", false, |args: &Value| {
    let name = opt_str(args, "name")
        .ok_or_else(|| ToolError::BadArguments("missing required field 'name'".to_string()))?;
    Ok::<_, ToolError>(vec!["checkout".to_string(), "-b".to_string(), name])
});

git_tool!(GitStashTool, "git_stash", true, |args: &Value| {
    let sub = opt_str(args, "action").unwrap_or_else(|| "push".to_string());
    Ok::<_, ToolError>(vec!["stash".to_string(), sub])
});

pub struct GitCloneTool;
#[async_trait]
impl Tool for GitCloneTool {
    fn name(&self) -> &'static str {
        "git_clone"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Git
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[
            ArgSpec::required("url", ArgType::String),
            ArgSpec::required("destination", ArgType::String),
        ]
    }
    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let url = args["url"].as_str().unwrap().to_string();
        let destination = ctx.guarded_path(args["destination"].as_str().unwrap(), true)?;
        run_git(
            ctx,
            &args,
            &[
                "clone".to_string(),
                url,
                destination.to_string_lossy().into_owned(),
            ],
            None,
            true,
        )
        .await
    }
}

pub struct GitWorktreeAddTool;
#[async_trait]
impl Tool for GitWorktreeAddTool {
    fn name(&self) -> &'static str {
        "git_worktree_add"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Git
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[
            ArgSpec::required("path", ArgType::String),
            ArgSpec::optional("branch", ArgType::String),
        ]
    }
    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let path = ctx.guarded_path(args["path"].as_str().unwrap(), true)?;
        let mut git_args = vec![
            "worktree".to_string(),
            "add".to_string(),
            path.to_string_lossy().into_owned(),
        ];
        if let Some(branch) = opt_str(&args, "branch") {
            git_args.push(branch);
        }
        run_git(ctx, &args, &git_args, None, true).await
    }
}
