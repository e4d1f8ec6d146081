use crate::error::UpdateError;
use crate::update::{PullProgress, UpdateAction, UpdateHandle};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;

/// Samples buffered per pull before new ones are dropped
const PROGRESS_BUFFER: usize = 64;

/// Updates a model through the local server's streaming pull endpoint
///
/// `POST /api/pull` answers with newline-delimited JSON status chunks.
/// Chunks carrying `total` become progress samples, an `error` chunk fails
/// the pull, and the pull only succeeds once a `success` status arrives.
#[derive(Debug, Clone)]
pub struct StreamingUpdateAction {
    client: reqwest::Client,
    host: String,
}

/// One line of the pull stream
#[derive(Debug, Deserialize, PartialEq, Eq)]
struct PullChunk {
    #[serde(default)]
    status: String,
    digest: Option<String>,
    total: Option<u64>,
    completed: Option<u64>,
    error: Option<String>,
}

/// What a single stream line means for the pull
#[derive(Debug, PartialEq, Eq)]
enum ChunkEvent {
    Progress(PullProgress),
    Status(String),
    Success,
}

impl StreamingUpdateAction {
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: host.into().trim_end_matches('/').to_string(),
        }
    }

    fn pull_url(&self) -> String {
        format!("{}/api/pull", self.host)
    }
}

fn parse_line(line: &[u8]) -> Result<Option<ChunkEvent>, UpdateError> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let chunk: PullChunk = serde_json::from_str(line)
        .map_err(|e| UpdateError::Stream(format!("invalid chunk {line:?}: {e}")))?;

    if let Some(error) = chunk.error {
        return Err(UpdateError::Stream(error));
    }

    let event = match (chunk.total, chunk.status.as_str()) {
        (Some(total), _) => ChunkEvent::Progress(PullProgress {
            completed: chunk.completed.unwrap_or(0),
            total,
            digest: chunk.digest,
        }),
        (None, "success") => ChunkEvent::Success,
        (None, status) => ChunkEvent::Status(status.to_string()),
    };

    Ok(Some(event))
}

async fn drive_pull(
    model: String,
    response: reqwest::Response,
    progress: mpsc::Sender<PullProgress>,
) -> Result<(), UpdateError> {
    let mut body = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();
    let mut succeeded = false;

    let mut handle = |line: &[u8]| -> Result<(), UpdateError> {
        match parse_line(line)? {
            Some(ChunkEvent::Progress(sample)) => {
                // progress is best effort; a full or closed channel drops the sample
                progress.try_send(sample).ok();
            }
            Some(ChunkEvent::Status(status)) => tracing::debug!("{model}: {status}"),
            Some(ChunkEvent::Success) => succeeded = true,
            None => {}
        }
        Ok(())
    };

    while let Some(bytes) = body.next().await {
        let bytes = bytes.map_err(|e| UpdateError::Network(e.to_string()))?;
        buffer.extend_from_slice(&bytes);

        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            handle(&line)?;
        }
    }
    handle(&buffer)?;

    if succeeded {
        Ok(())
    } else {
        Err(UpdateError::Stream(
            "stream ended before the pull reported success".to_string(),
        ))
    }
}

#[async_trait]
impl UpdateAction for StreamingUpdateAction {
    async fn start(&self, model_name: &str) -> Result<UpdateHandle, UpdateError> {
        let url = self.pull_url();
        tracing::debug!("Pulling {model_name} via {url}");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "model": model_name, "stream": true }))
            .send()
            .await
            .map_err(|e| UpdateError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpdateError::Stream(format!("HTTP {status}: {}", body.trim())));
        }

        let (tx, rx) = mpsc::channel(PROGRESS_BUFFER);
        let task = tokio::spawn(drive_pull(model_name.to_string(), response, tx));

        Ok(UpdateHandle::new(task).with_progress(rx))
    }

    fn name(&self) -> &str {
        "stream"
    }
}
