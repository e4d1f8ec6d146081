use thiserror::Error;

/// Main error type for modelsync
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Local registry error: {0}\n\nTroubleshooting:\n- Is the ollama server running? Start with: ollama serve\n- Check OLLAMA_HOST or [local] host in config\n- Run with RUST_LOG=debug for more details")]
    LocalRegistry(String),

    #[error("Config error: {0}\n\nTroubleshooting:\n- Check config file: ~/.config/modelsync/config.toml\n- Unknown keys are rejected, check for typos\n- Run with RUST_LOG=debug for more details")]
    Config(String),

    #[error("Prompt error: {0}\n\nTroubleshooting:\n- Confirmation needs an interactive terminal\n- Drop --confirm when running from cron or a pipe")]
    Prompt(String),

    #[error("Update error: {0}")]
    Update(#[from] UpdateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Per-model check failures, reported as `check_failed` outcomes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    #[error("registry returned HTTP {0}")]
    Status(u16),

    #[error("registry unreachable: {0}")]
    Network(String),

    #[error("manifest could not be hashed: {0}")]
    Malformed(String),
}

/// Per-model update failures, reported as failed update results
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    #[error("'{0}' not found in PATH\n\nTroubleshooting:\n- Install ollama or set [update] command in config\n- Or switch to the streaming method: --method stream")]
    ToolNotFound(String),

    #[error("failed to start update: {0}")]
    Spawn(String),

    #[error("pull exited with {}: {stderr}", describe_exit(.code))]
    ExitStatus { code: Option<i32>, stderr: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("pull stream error: {0}")]
    Stream(String),

    #[error("update task aborted")]
    Aborted,
}

fn describe_exit(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| format!("status {c}"))
}

pub type Result<T> = std::result::Result<T, SyncError>;
