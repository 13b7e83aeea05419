use crate::error::IntegrationError;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
    process::{Child, ChildStdin, ChildStdout, Command},
};
use tracing::debug;

/// Configuration of an external tool provider process: a command and argument vector.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToolProcessConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolProcessConfig {
    pub fn new<Cmd, Arg>(command: Cmd, args: impl IntoIterator<Item = Arg>) -> Self
    where
        Cmd: Into<String>,
        Arg: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Spawned tool provider subprocess with piped stdio.
///
/// The child is spawned with `kill_on_drop`, so dropping the handle tears the provider down
/// even if the owning task aborts mid-call.
#[derive(Debug)]
pub struct ToolProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl ToolProcess {
    /// Spawn the configured provider with piped stdio under a scoped context.
    pub fn spawn(config: &ToolProcessConfig) -> Result<Self, IntegrationError> {
        let mut child = Command::new(&config.command)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(IntegrationError::Spawn)?;

        debug!(command = %config.command, "spawned tool provider");

        let stdin = child
            .stdin
            .take()
            .ok_or(IntegrationError::Stdio("stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or(IntegrationError::Stdio("stdout"))?;

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        })
    }

    /// Write one framed request line to the provider.
    pub async fn write_line(&mut self, line: &str) -> Result<(), IntegrationError> {
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Read the next framed response line from the provider.
    pub async fn read_line(&mut self) -> Result<String, IntegrationError> {
        self.stdout
            .next_line()
            .await?
            .ok_or(IntegrationError::Closed)
    }

    /// Terminate the provider explicitly rather than waiting for drop.
    pub async fn shutdown(mut self) -> Result<(), IntegrationError> {
        self.child.start_kill().map_err(IntegrationError::Transport)?;
        self.child.wait().await?;
        Ok(())
    }
}
