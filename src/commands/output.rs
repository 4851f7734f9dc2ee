use anyhow::{Context, Result};
use std::io::Write;

use crate::event::EventLine;

/// How received event lines are written out.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Every line as received
    #[default]
    Raw,
    /// Only the payload of `data:` lines
    Data,
    /// `data:` payloads rendered as one-line progress reports
    Report,
}

impl OutputFormat {
    /// Renders a line for output; `None` means the line is not shown.
    pub fn render(self, line: &EventLine) -> Option<String> {
        match self {
            OutputFormat::Raw => Some(line.as_str().to_string()),
            OutputFormat::Data => line.data().map(str::to_string),
            OutputFormat::Report => {
                let payload = line.data()?;
                Some(match line.report() {
                    Some(report) => report.summary(),
                    None => payload.to_string(),
                })
            }
        }
    }
}

/// Returns a sink writing rendered lines to `out`, flushing after each one
/// so progress shows up while the stream is still open.
pub fn line_writer<W: Write>(
    format: OutputFormat,
    mut out: W,
) -> impl FnMut(EventLine) -> Result<()> {
    move |line| {
        if let Some(text) = format.render(&line) {
            writeln!(out, "{}", text).context("Failed to write event")?;
            out.flush().context("Failed to flush output")?;
        }
        Ok(())
    }
}
