//! System category: notify, clipboard read/write, open_url, open_file
//! (spec.md §4.4). OS-branched implementations; clipboard write is
//! destructive under read-only mode.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::schema::{ArgSpec, ArgType};
use crate::tool::{Tool, ToolCategory};
use smith_sandbox::{Platform, RunOptions, ShellAdapter};

async fn run_fire_and_forget(bin: &str, args: &[String]) -> Result<(), ToolError> {
    let adapter = ShellAdapter::new(Platform::current());
    let result = adapter.run(bin, args, RunOptions::default()).await;
    if result.exit_code != 0 {
        return Err(ToolError::ToolFailure(format!(
            "{bin} exited with code {}: {}",
            result.exit_code, result.stderr
        )));
    }
    Ok(())
}

pub struct NotifyTool;
#[async_trait]
impl Tool for NotifyTool {
    fn name(&self) -> &'static str {
        "notify"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::System
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[
            ArgSpec::required("title", ArgType::String),
            ArgSpec::required("message", ArgType::String),
        ]
    }
    async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let title = args["title"].as_str().unwrap();
        let message = args["message"].as_str().unwrap();

        if cfg!(target_os = "macos") {
            let script = format!("display notification \"{message}\" with title \"{title}\"");
            run_fire_and_forget("osascript", &["-e".to_string(), script]).await?;
        } else if cfg!(target_os = "windows") {
            let script = format!(
                "[System.Reflection.Assembly]::LoadWithPartialName('System.Windows.Forms') | Out-Null; [System.Windows.Forms.MessageBox]::Show('{message}', '{title}')"
            );
            run_fire_and_forget("powershell", &["-Command".to_string(), script]).await?;
        } else {
            run_fire_and_forget(
                "notify-send",
                &[title.to_string(), message.to_string()],
            )
            .await?;
        }
        Ok(json!({ "sent": true }))
    }
}

pub struct ClipboardReadTool;
#[async_trait]
impl Tool for ClipboardReadTool {
    fn name(&self) -> &'static str {
        "clipboard_read"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::System
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[]
    }
    async fn call(&self, _args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let text = tokio::task::spawn_blocking(|| {
            arboard::Clipboard::new()
                .and_then(|mut c| c.get_text())
                .map_err(|e| ToolError::ToolFailure(format!("clipboard read failed: {e}")))
        })
        .await
        .map_err(|e| ToolError::Internal(e.to_string()))??;
        Ok(json!({ "text": text }))
    }
}

pub struct ClipboardWriteTool;
#[async_trait]
impl Tool for ClipboardWriteTool {
    fn name(&self) -> &'static str {
        "clipboard_write"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::System
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[ArgSpec::required("text", ArgType::String)]
    }
    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        ctx.check_not_readonly("clipboard_write")?;
        let text = args["text"].as_str().unwrap().to_string();
        tokio::task::spawn_blocking(move || {
            arboard::Clipboard::new()
                .and_then(|mut c| c.set_text(text))
                .map_err(|e| ToolError::ToolFailure(format!("clipboard write failed: {e}")))
        })
        .await
        .map_err(|e| ToolError::Internal(e.to_string()))??;
        Ok(json!({ "written": true }))
    }
}

pub struct OpenUrlTool;
#[async_trait]
impl Tool for OpenUrlTool {
    fn name(&self) -> &'static str {
        "open_url"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::System
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[ArgSpec::required("url", ArgType::String)]
    }
    async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let url = args["url"].as_str().unwrap().to_string();
        open_with_platform_handler(&url).await?;
        Ok(json!({ "opened": true }))
    }
}

pub struct OpenFileTool;
#[async_trait]
impl Tool for OpenFileTool {
    fn name(&self) -> &'static str {
        "open_file"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::System
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[ArgSpec::required("file_path", ArgType::String)]
    }
    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let path = ctx.guarded_path(args["file_path"].as_str().unwrap(), false)?;
        open_with_platform_handler(&path.to_string_lossy()).await?;
        Ok(json!({ "opened": true }))
    }
}

async fn open_with_platform_handler(target: &str) -> Result<(), ToolError> {
    if cfg!(target_os = "macos") {
        run_fire_and_forget("open", &[target.to_string()]).await
    } else if cfg!(target_os = "windows") {
        run_fire_and_forget("cmd", &["/C".to_string(), "start".to_string(), target.to_string()])
            .await
    } else {
        run_fire_and_forget("xdg-open", &[target.to_string()]).await
    }
}
