use anyhow::{Context, Result};
use log::{debug, info};
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::{
    client::{StreamEnd, StreamSummary},
    experiment::ExperimentMetadata,
};

pub mod config;
mod output;

pub use config::Config;
pub use output::{OutputFormat, line_writer};

/// Options for following an event stream from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct FollowOptions {
    pub format: OutputFormat,
    /// Stop following after this long.
    pub timeout: Option<Duration>,
}

/// Upload an experiment, print its channel, then follow its events unless
/// `follow` is `None`.
#[tracing::instrument(skip(config, metadata))]
pub async fn upload(
    config: &Config,
    metadata: &ExperimentMetadata,
    samples: &Path,
    alarms: &Path,
    follow: Option<FollowOptions>,
) -> Result<()> {
    let client = config.client()?;
    let channel = client.submit_experiment(metadata, samples, alarms).await?;
    print_channel(io::stdout(), &channel)?;

    match follow {
        Some(options) => follow_channel(config, &channel, options).await,
        None => {
            debug!("Not following channel {}", channel);
            Ok(())
        }
    }
}

/// Follow the events of an existing channel.
#[tracing::instrument(skip(config))]
pub async fn events(config: &Config, channel: &str, options: FollowOptions) -> Result<()> {
    follow_channel(config, channel, options).await
}

async fn follow_channel(config: &Config, channel: &str, options: FollowOptions) -> Result<()> {
    let client = config.client()?;
    let cancel = cancel_on_interrupt(options.timeout);
    let sink = line_writer(options.format, io::stdout());

    let summary = client.stream_events(channel, &cancel, sink).await;
    cancel.cancel();
    report_end(summary?);
    Ok(())
}

fn print_channel<W: Write>(mut out: W, channel: &str) -> Result<()> {
    writeln!(out, "{}", channel).context("Failed to write channel")?;
    out.flush().context("Failed to flush output")
}

fn report_end(summary: StreamSummary) {
    match summary.end {
        StreamEnd::Closed => info!("Stream closed after {} lines", summary.lines),
        StreamEnd::Cancelled => info!("Stopped following after {} lines", summary.lines),
    }
}

/// Returns a token cancelled on Ctrl-C or once `timeout` elapses. The
/// watcher task exits when the token is cancelled by anyone.
fn cancel_on_interrupt(timeout: Option<Duration>) -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    tokio::spawn(async move {
        let deadline = async {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, closing event stream");
                token.cancel();
            }
            _ = deadline => {
                info!("Timeout reached, closing event stream");
                token.cancel();
            }
        }
    });

    cancel
}
