//! Client for the experiment import server: upload an experiment, then
//! follow the progress events of the channel the server assigns.

use anyhow::{Context, Result};
use log::{debug, info};
use reqwest::multipart::{Form, Part};
use std::path::Path;
use tokio::fs::File;
use tokio_util::sync::CancellationToken;

use crate::{
    error::ClientError,
    event::EventLine,
    experiment::{ExperimentMetadata, UploadResponse},
    http::HttpClient,
};

pub const DEFAULT_API_URL: &str = "http://localhost:8888";

/// How an event stream finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The server closed the connection.
    Closed,
    /// The caller's cancellation token fired.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    /// Number of lines handed to the sink.
    pub lines: u64,
    pub end: StreamEnd,
}

pub struct ExperimentClient {
    http: HttpClient,
    base_url: String,
}

impl ExperimentClient {
    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Uploads the experiment descriptor with its samples and alarms files
    /// and returns the channel carrying the import progress.
    ///
    /// Both files are opened before anything is sent, so a missing file
    /// never reaches the server.
    #[tracing::instrument(skip(self, metadata))]
    pub async fn submit_experiment(
        &self,
        metadata: &ExperimentMetadata,
        samples_path: &Path,
        alarms_path: &Path,
    ) -> Result<String> {
        let samples = file_part(samples_path, "samples").await?;
        let alarms = file_part(alarms_path, "alarms").await?;

        let experiment =
            serde_json::to_string(metadata).context("Failed to encode experiment metadata")?;
        debug!("Experiment part: {}", experiment);

        let form = Form::new()
            .text("experiment", experiment)
            .part("samples", samples)
            .part("alarms", alarms);

        let url = format!("{}/upload", self.base_url);
        info!("Uploading experiment {} to {}...", metadata.reference, url);

        let response: UploadResponse = self
            .http
            .post_multipart_json(&url, form)
            .await
            .context("Failed to upload experiment")?;

        if response.channel.is_empty() {
            return Err(ClientError::Protocol("upload response has an empty channel".to_string()).into());
        }

        info!("Upload accepted, channel {}", response.channel);
        Ok(response.channel)
    }

    /// Follows the event stream of `channel`, handing each non-empty line to
    /// `sink` in arrival order.
    ///
    /// Returns when the server closes the stream or `cancel` fires. A dropped
    /// connection is an error; there is no reconnection. An error returned by
    /// the sink stops the stream and is propagated.
    #[tracing::instrument(skip(self, cancel, sink))]
    pub async fn stream_events<F>(
        &self,
        channel: &str,
        cancel: &CancellationToken,
        mut sink: F,
    ) -> Result<StreamSummary>
    where
        F: FnMut(EventLine) -> Result<()>,
    {
        let url = format!("{}/events", self.base_url);
        info!("Following events on channel {}...", channel);

        let query = [("channel", channel)];
        let mut lines = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Cancelled before the stream was opened");
                return Ok(StreamSummary { lines: 0, end: StreamEnd::Cancelled });
            }
            opened = self.http.get_lines(&url, &query) => {
                opened.context("Failed to open event stream")?
            }
        };

        let mut delivered = 0;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Event stream cancelled after {} lines", delivered);
                    return Ok(StreamSummary { lines: delivered, end: StreamEnd::Cancelled });
                }
                next = lines.next_line() => next.context("Event stream interrupted")?,
            };

            match next {
                Some(line) if line.is_empty() => continue,
                Some(line) => {
                    delivered += 1;
                    sink(EventLine::new(line))?;
                }
                None => {
                    info!("Event stream closed by server after {} lines", delivered);
                    return Ok(StreamSummary {
                        lines: delivered,
                        end: StreamEnd::Closed,
                    });
                }
            }
        }
    }
}

/// Opens `path` as a streamed multipart file part named `name`.
async fn file_part(path: &Path, name: &str) -> Result<Part> {
    let file = File::open(path)
        .await
        .map_err(|e| ClientError::file_access(path, e))?;
    let metadata = file
        .metadata()
        .await
        .map_err(|e| ClientError::file_access(path, e))?;

    if !metadata.is_file() {
        let e = std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file");
        return Err(ClientError::file_access(path, e).into());
    }

    debug!("Attaching {:?} as {} ({} bytes)", path, name, metadata.len());
    let part = Part::stream_with_length(file, metadata.len())
        .file_name(name.to_string())
        .mime_str("application/octet-stream")
        .context("Invalid media type for file part")?;
    Ok(part)
}
