//! Provider that shells out to an external recognizer.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::RecognitionProvider;
use crate::config::ServiceConfig;
use crate::error::{ConfigError, TransportError};

/// Runs `program args... <segment>` and takes trimmed stdout as the text.
///
/// The child is killed if the future is dropped, so aborting the scheduler
/// task also stops the process.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    name: String,
    program: String,
    args: Vec<String>,
}

impl CommandProvider {
    pub fn new(
        name: impl Into<String>,
        program: impl Into<String>,
        args: Vec<String>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let program = program.into();
        if program.trim().is_empty() {
            return Err(ConfigError::EmptyCommand(name));
        }
        Ok(Self {
            name,
            program,
            args,
        })
    }

    pub fn from_config(cfg: &ServiceConfig) -> Result<Self, ConfigError> {
        Self::new(cfg.name.clone(), cfg.command.clone(), cfg.args.clone())
    }
}

#[async_trait]
impl RecognitionProvider for CommandProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn recognize(&self, segment: &Path) -> Result<Option<String>, TransportError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(segment)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(TransportError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(TransportError::Exit {
                status: output.status.to_string(),
                stderr,
            });
        }
        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if text.is_empty() { None } else { Some(text) })
    }
}
