//! Network category: http_request, ping (TCP connect), port_check,
//! dns_lookup, download_file (spec.md §4.4).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::schema::{ArgSpec, ArgType};
use crate::tool::{Tool, ToolCategory};
use smith_sandbox::{truncate_output, DEFAULT_OUTPUT_CAP_BYTES};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const PING_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_PING_PORT: u16 = 80;

pub struct HttpRequestTool;
#[async_trait]
impl Tool for HttpRequestTool {
    fn name(&self) -> &'static str {
        "http_request"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Network
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[
            ArgSpec::required("url", ArgType::String),
            ArgSpec::optional("method", ArgType::String),
            ArgSpec::optional("body", ArgType::String),
        ]
    }
    async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let url = args["url"].as_str().unwrap();
        let method = args.get("method").and_then(Value::as_str).unwrap_or("GET");
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| ToolError::Internal(e.to_string()))?;

        let method = reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|_| ToolError::BadArguments(format!("invalid HTTP method: {method}")))?;

        let mut request = client.request(method, url);
        if let Some(body) = args.get("body").and_then(Value::as_str) {
            request = request.body(body.to_string());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ToolError::ToolFailure(format!("request failed: {e}")))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::ToolFailure(format!("reading body failed: {e}")))?;

        Ok(json!({
            "status": status,
            "body": truncate_output(&body, DEFAULT_OUTPUT_CAP_BYTES),
        }))
    }
}

pub struct PingTool;
#[async_trait]
impl Tool for PingTool {
    fn name(&self) -> &'static str {
        "ping"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Network
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[
            ArgSpec::required("host", ArgType::String),
            ArgSpec::optional("port", ArgType::Integer),
        ]
    }
    async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let host = args["host"].as_str().unwrap();
        let port = args
            .get("port")
            .and_then(Value::as_u64)
            .map(|v| v as u16)
            .unwrap_or(DEFAULT_PING_PORT);

        let reachable = tcp_connect(host, port, PING_TIMEOUT).await;
        Ok(json!({ "reachable": reachable }))
    }
}

pub struct PortCheckTool;
#[async_trait]
impl Tool for PortCheckTool {
    fn name(&self) -> &'static str {
        "port_check"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Network
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[
            ArgSpec::required("host", ArgType::String),
            ArgSpec::required("port", ArgType::Integer),
        ]
    }
    async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let host = args["host"].as_str().unwrap();
        let port = args["port"].as_u64().unwrap() as u16;
        let open = tcp_connect(host, port, PING_TIMEOUT).await;
        Ok(json!({ "open": open }))
    }
}

async fn tcp_connect(host: &str, port: u16, timeout: Duration) -> bool {
    tokio::time::timeout(timeout, tokio::net::TcpStream::connect((host, port)))
        .await
        .map(|res| res.is_ok())
        .unwrap_or(false)
}

pub struct DnsLookupTool;
#[async_trait]
impl Tool for DnsLookupTool {
    fn name(&self) -> &'static str {
        "dns_lookup"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Network
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[ArgSpec::required("host", ArgType::String)]
    }
    async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let host = args["host"].as_str().unwrap();
        let addrs: Vec<String> = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| ToolError::ToolFailure(format!("dns lookup failed: {e}")))?
            .map(|addr| addr.ip().to_string())
            .collect();
        Ok(json!({ "addresses": addrs }))
    }
}

pub struct DownloadFileTool;
#[async_trait]
impl Tool for DownloadFileTool {
    fn name(&self) -> &'static str {
        "download_file"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Network
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[
            ArgSpec::required("url", ArgType::String),
            ArgSpec::required("destination", ArgType::String),
        ]
    }
    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let url = args["url"].as_str().unwrap();
        let destination = ctx.guarded_path(args["destination"].as_str().unwrap(), true)?;

        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| ToolError::Internal(e.to_string()))?;
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| ToolError::ToolFailure(format!("download failed: {e}")))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ToolError::ToolFailure(format!("download failed: {e}")))?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        tokio::fs::write(&destination, &bytes)
            .await
            .map_err(|e| ToolError::ToolFailure(format!("write failed: {e}")))?;

        Ok(json!({ "bytes_written": bytes.len() }))
    }
}
