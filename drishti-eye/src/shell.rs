//! Interactive command shell for toggling detectors

use crate::config::ShellConfig;
use crate::error::VisionError;
use crate::plugin::Toggle;
use crate::registry::DetectorRegistry;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Enable(u32),
    Disable(u32),
    Exit,
}

/// Why the shell stopped reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellExit {
    ExitToken,
    EndOfInput,
}

/// Parse one input line. Matching is case-insensitive and ignores
/// surrounding whitespace; ids must name a registered plugin.
pub fn parse_command(line: &str, exit_token: &str, registry: &DetectorRegistry) -> Option<Command> {
    let line = line.trim().to_lowercase();
    if line.is_empty() {
        return None;
    }
    if line == exit_token.trim().to_lowercase() {
        return Some(Command::Exit);
    }

    let parts: Vec<&str> = line.split_whitespace().collect();
    let [verb, id] = parts.as_slice() else {
        return None;
    };
    let id: u32 = id.parse().ok()?;
    if !registry.contains(id) {
        return None;
    }

    match *verb {
        "enable" => Some(Command::Enable(id)),
        "disable" => Some(Command::Disable(id)),
        _ => None,
    }
}

pub struct CommandShell {
    registry: Arc<DetectorRegistry>,
    config: ShellConfig,
}

impl CommandShell {
    pub fn new(registry: Arc<DetectorRegistry>, config: ShellConfig) -> Self {
        Self { registry, config }
    }

    /// Status table shown before every prompt
    pub fn status_table(&self) -> String {
        let rule = "-".repeat(50);
        let mut table = format!("\n{}\nCurrent Detection Status:\n", rule);
        for status in self.registry.list() {
            let state = if status.enabled { "On" } else { "Off" };
            table.push_str(&format!("   {} - {} -- {}\n", status.id, status.name, state));
        }
        table.push_str(&rule);
        table.push('\n');
        table
    }

    /// Read and apply commands until the exit token or end of input
    pub async fn run<R, W>(&self, input: R, output: &mut W) -> Result<ShellExit, VisionError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();

        loop {
            let banner = format!("{}{}", self.status_table(), self.config.prompt);
            output.write_all(banner.as_bytes()).await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                debug!("Command input closed");
                return Ok(ShellExit::EndOfInput);
            };

            let reply = match parse_command(&line, &self.config.exit_token, &self.registry) {
                Some(Command::Exit) => return Ok(ShellExit::ExitToken),
                Some(Command::Enable(id)) => self.toggle(id, true),
                Some(Command::Disable(id)) => self.toggle(id, false),
                None => self.config.invalid_command_message.clone(),
            };
            output.write_all(format!("{}\n", reply).as_bytes()).await?;
        }
    }

    fn toggle(&self, id: u32, enable: bool) -> String {
        let Some(plugin) = self.registry.resolve(id) else {
            return self.config.invalid_command_message.clone();
        };
        let outcome = if enable { plugin.enable() } else { plugin.disable() };
        match outcome {
            Toggle::Enabled => format!("{} enabled", plugin.name()),
            Toggle::Disabled => format!("{} disabled", plugin.name()),
            Toggle::Unavailable => format!(
                "{} cannot be enabled (model missing/failed to load)",
                plugin.name()
            ),
        }
    }
}
