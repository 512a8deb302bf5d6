//! stdio helpers for rmcp-backed MCP clients.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, Command};

use crate::config::StdioParams;
use crate::logging::Diagnostics;

/// Build a configured `tokio::process::Command` for stdio transport. Nothing is spawned.
pub(crate) fn build_stdio_command(params: &StdioParams) -> Command {
    let mut cmd = Command::new(&params.command);
    if let Some(args) = &params.args {
        cmd.args(args);
    }
    if let Some(env) = &params.env {
        for (key, value) in env {
            cmd.env(key, value);
        }
    }
    cmd.kill_on_drop(true);
    cmd
}

/// Spawn a background task that forwards stderr lines to the diagnostics sink.
pub(crate) fn spawn_stderr_logger(server_name: String, diagnostics: Diagnostics, stderr: ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            diagnostics.debug(&server_name, &format!("stderr: {line}"));
        }
    });
}
