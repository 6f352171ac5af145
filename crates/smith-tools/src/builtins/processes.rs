//! Processes category: list, get, kill, system_info, env_read (spec.md
//! §4.4). This category always loads regardless of category enables.

use async_trait::async_trait;
use serde_json::{json, Value};
use sysinfo::{Pid, System};

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::schema::{ArgSpec, ArgType};
use crate::tool::{Tool, ToolCategory};

const SENSITIVE_MARKERS: &[&str] = &["key", "token", "secret", "password"];

fn is_sensitive(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SENSITIVE_MARKERS.iter().any(|m| lower.contains(m))
}

pub struct ListProcessesTool;
#[async_trait]
impl Tool for ListProcessesTool {
    fn name(&self) -> &'static str {
        "list_processes"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Processes
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[]
    }
    async fn call(&self, _args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let mut sys = System::new();
        sys.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
        let processes: Vec<Value> = sys
            .processes()
            .iter()
            .map(|(pid, proc)| {
                json!({
                    "pid": pid.as_u32(),
                    "name": proc.name().to_string_lossy(),
                })
            })
            .collect();
        Ok(json!({ "processes": processes }))
    }
}

pub struct GetProcessTool;
#[async_trait]
impl Tool for GetProcessTool {
    fn name(&self) -> &'static str {
        "get_process"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Processes
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[ArgSpec::required("pid", ArgType::Integer)]
    }
    async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let pid = Pid::from_u32(args["pid"].as_u64().unwrap() as u32);
        let mut sys = System::new();
        sys.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[pid]), true);
        match sys.process(pid) {
            Some(proc) => Ok(json!({
                "pid": pid.as_u32(),
                "name": proc.name().to_string_lossy(),
                "cpu_usage": proc.cpu_usage(),
                "memory_bytes": proc.memory(),
            })),
            None => Err(ToolError::ToolFailure(format!("no such process: {pid}"))),
        }
    }
}

pub struct KillProcessTool;
#[async_trait]
impl Tool for KillProcessTool {
    fn name(&self) -> &'static str {
        "kill_process"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Processes
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[ArgSpec::required("pid", ArgType::Integer)]
    }
    async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let pid = Pid::from_u32(args["pid"].as_u64().unwrap() as u32);
        let mut sys = System::new();
        sys.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[pid]), true);
        match sys.process(pid) {
            Some(proc) => {
                let killed = proc.kill();
                Ok(json!({ "killed": killed }))
            }
            None => Err(ToolError::ToolFailure(format!("no such process: {pid}"))),
        }
    }
}

pub struct SystemInfoTool;
#[async_trait]
impl Tool for SystemInfoTool {
    fn name(&self) -> &'static str {
        "system_info"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Processes
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[]
    }
    async fn call(&self, _args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        Ok(json!({
            "os": System::long_os_version().unwrap_or_else(|| "unknown".to_string()),
            "hostname": System::host_name().unwrap_or_else(|| "unknown".to_string()),
            "cpu_count": System::physical_core_count().unwrap_or(0),
        }))
    }
}

pub struct EnvReadTool;
#[async_trait]
impl Tool for EnvReadTool {
    fn name(&self) -> &'static str {
        "env_read"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Processes
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[ArgSpec::optional("all", ArgType::Boolean)]
    }
    async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let show_all = args.get("all").and_then(Value::as_bool).unwrap_or(false);
        let vars: serde_json::Map<String, Value> = std::env::vars()
            .filter(|(k, _)| show_all || !is_sensitive(k))
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        Ok(json!({ "env": vars }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryEnables;

    fn ctx() -> ToolContext {
        ToolContext {
            sandbox_dir: std::env::temp_dir(),
            allowed_shell_commands: vec![],
            timeout_ms: 5000,
            readonly_mode: false,
            categories: CategoryEnables::default(),
        }
    }

    #[test]
    fn sensitive_marker_detection() {
        assert!(is_sensitive("API_KEY"));
        assert!(is_sensitive("my_secret_value"));
        assert!(is_sensitive("AUTH_TOKEN"));
        assert!(is_sensitive("DB_PASSWORD"));
        assert!(!is_sensitive("PATH"));
    }

    #[tokio::test]
    async fn env_read_filters_by_default() {
        unsafe {
            std::env::set_var("SMITH_TEST_SECRET_VALUE", "shh");
            std::env::set_var("SMITH_TEST_PLAIN_VALUE", "ok");
        }
        let c = ctx();
        let result = EnvReadTool.call(json!({}), &c).await.unwrap();
        let env = result["env"].as_object().unwrap();
        assert!(!env.contains_key("SMITH_TEST_SECRET_VALUE"));
        assert!(env.contains_key("SMITH_TEST_PLAIN_VALUE"));
    }

    #[tokio::test]
    async fn env_read_all_bypasses_filter() {
        unsafe {
            std::env::set_var("SMITH_TEST_SECRET_VALUE2", "shh");
        }
        let c = ctx();
        let result = EnvReadTool.call(json!({"all": true}), &c).await.unwrap();
        let env = result["env"].as_object().unwrap();
        assert!(env.contains_key("SMITH_TEST_SECRET_VALUE2"));
    }

    #[tokio::test]
    async fn list_processes_returns_current_process() {
        let c = ctx();
        let result = ListProcessesTool.call(json!({}), &c).await.unwrap();
        assert!(!result["processes"].as_array().unwrap().is_empty());
    }
}
