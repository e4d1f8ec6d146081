use crate::error::UpdateError;
use crate::update::{UpdateAction, UpdateHandle};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Keep the tail of stderr; pulls print a progress line per chunk
const STDERR_TAIL_CHARS: usize = 400;

/// Updates a model by running `<tool> pull <model>`
///
/// The tool's own progress output is discarded. Stderr is captured so a
/// failed pull can say why.
#[derive(Debug, Clone)]
pub struct CommandUpdateAction {
    program: PathBuf,
    label: String,
}

impl CommandUpdateAction {
    /// Resolve `command` on `PATH`
    ///
    /// # Errors
    /// - Returns `ToolNotFound` if the binary is not in PATH
    pub fn new(command: &str) -> Result<Self, UpdateError> {
        let program =
            which::which(command).map_err(|_| UpdateError::ToolNotFound(command.to_string()))?;

        Ok(Self {
            program,
            label: command.to_string(),
        })
    }

    /// Use an explicit program path without a PATH lookup (for testing)
    #[must_use]
    pub fn with_program(program: PathBuf) -> Self {
        let label = program.display().to_string();
        Self { program, label }
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let skip = text.chars().count().saturating_sub(STDERR_TAIL_CHARS);
    text.chars().skip(skip).collect()
}

#[async_trait]
impl UpdateAction for CommandUpdateAction {
    async fn start(&self, model_name: &str) -> Result<UpdateHandle, UpdateError> {
        tracing::debug!("Running {} pull {model_name}", self.program.display());

        let child = Command::new(&self.program)
            .arg("pull")
            .arg(model_name)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| UpdateError::Spawn(format!("{}: {e}", self.program.display())))?;

        let task = tokio::spawn(async move {
            let output = child
                .wait_with_output()
                .await
                .map_err(|e| UpdateError::Spawn(e.to_string()))?;

            if output.status.success() {
                Ok(())
            } else {
                Err(UpdateError::ExitStatus {
                    code: output.status.code(),
                    stderr: stderr_tail(&output.stderr),
                })
            }
        });

        Ok(UpdateHandle::new(task))
    }

    fn name(&self) -> &str {
        &self.label
    }
}
