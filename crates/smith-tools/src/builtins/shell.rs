//! Shell category: run_command, run_script, which (spec.md §4.4).

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::schema::{ArgSpec, ArgType};
use crate::tool::{Tool, ToolCategory};
use smith_sandbox::{truncate_output, Platform, RunOptions, ShellAdapter, DEFAULT_OUTPUT_CAP_BYTES};

fn adapter() -> ShellAdapter {
    ShellAdapter::new(Platform::current())
}

pub struct RunCommandTool;
#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &'static str {
        "run_command"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Shell
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[
            ArgSpec::required("command", ArgType::String),
            ArgSpec::optional("args", ArgType::Array),
            ArgSpec::optional("cwd", ArgType::String),
        ]
    }
    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let command = args["command"].as_str().unwrap();
        ctx.check_command_allowed(command)?;

        let extra_args: Vec<String> = args
            .get("args")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();

        let cwd = match args.get("cwd").and_then(Value::as_str) {
            Some(c) => Some(ctx.guarded_path(c, false)?),
            None => Some(ctx.sandbox_dir.clone()),
        };

        let opts = RunOptions {
            cwd,
            timeout: Some(std::time::Duration::from_millis(ctx.effective_timeout_ms(&args))),
            env: Default::default(),
        };

        let result = adapter().run(command, &extra_args, opts).await;
        Ok(json!({
            "exit_code": result.exit_code,
            "stdout": truncate_output(&result.stdout, DEFAULT_OUTPUT_CAP_BYTES),
            "stderr": truncate_output(&result.stderr, DEFAULT_OUTPUT_CAP_BYTES),
            "timed_out": result.timed_out,
        }))
    }
}

pub struct RunScriptTool;
#[async_trait]
impl Tool for RunScriptTool {
    fn name(&self) -> &'static str {
        "run_script"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Shell
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[
            ArgSpec::required("content", ArgType::String),
            ArgSpec::optional("runtime", ArgType::String),
        ]
    }
    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let content = args["content"].as_str().unwrap();
        let runtime = args
            .get("runtime")
            .and_then(Value::as_str)
            .unwrap_or("bash");
        ctx.check_command_allowed(runtime)?;

        let (extension, interpreter) = match runtime {
            "node" => (".js", "node"),
            "python3" | "python" => (".py", "python3"),
            "sh" => (".sh", "sh"),
            _ => (".sh", "bash"),
        };

        let script_path = std::env::temp_dir().join(format!("smith-script-{}{}", Uuid::new_v4(), extension));
        tokio::fs::write(&script_path, content)
            .await
            .map_err(|e| ToolError::ToolFailure(format!("failed to write script: {e}")))?;

        let opts = RunOptions {
            cwd: Some(ctx.sandbox_dir.clone()),
            timeout: Some(std::time::Duration::from_millis(ctx.effective_timeout_ms(&args))),
            env: Default::default(),
        };

        let result = adapter()
            .run(interpreter, &[script_path.to_string_lossy().into_owned()], opts)
            .await;

        // Removed on every exit path, including errors.
        let _ = tokio::fs::remove_file(&script_path).await;

        Ok(json!({
            "exit_code": result.exit_code,
            "stdout": truncate_output(&result.stdout, DEFAULT_OUTPUT_CAP_BYTES),
            "stderr": truncate_output(&result.stderr, DEFAULT_OUTPUT_CAP_BYTES),
            "timed_out": result.timed_out,
        }))
    }
}

pub struct WhichTool;
#[async_trait]
impl Tool for WhichTool {
    fn name(&self) -> &'static str {
        "which"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Shell
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[ArgSpec::required("bin", ArgType::String)]
    }
    async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let bin = args["bin"].as_str().unwrap();
        let path = adapter().which(bin).await;
        Ok(json!({ "path": path }))
    }
}
