//! Sandbox enforcement primitives: path confinement and command allowlist
//! predicates, output truncation, and an OS-abstracting shell adapter.

pub mod guards;
pub mod shell;

pub use guards::{is_command_allowed, is_within_dir, truncate_output, DEFAULT_OUTPUT_CAP_BYTES};
pub use shell::{Platform, RunOptions, RunResult, ShellAdapter};
