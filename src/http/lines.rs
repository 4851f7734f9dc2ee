use anyhow::Result;
use futures_util::TryStreamExt;
use reqwest::Response;
use std::io::ErrorKind;
use std::pin::Pin;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio_util::io::StreamReader;

use crate::error::ClientError;

/// Response body read incrementally as UTF-8 lines.
///
/// Lines end at `\n` or `\r\n`; the terminator is stripped. A final line
/// without terminator is still returned before end of stream.
pub struct ResponseLines {
    lines: Lines<Pin<Box<dyn AsyncBufRead + Send>>>,
}

impl std::fmt::Debug for ResponseLines {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseLines").finish_non_exhaustive()
    }
}

impl ResponseLines {
    pub fn new(response: Response) -> Self {
        let body = response.bytes_stream().map_err(std::io::Error::other);
        let reader: Pin<Box<dyn AsyncBufRead + Send>> = Box::pin(StreamReader::new(body));
        Self {
            lines: reader.lines(),
        }
    }

    /// Waits for the next line. `Ok(None)` means the server closed the body.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        match self.lines.next_line().await {
            Ok(line) => Ok(line),
            Err(e) => Err(classify_read_error(e).into()),
        }
    }
}

fn classify_read_error(error: std::io::Error) -> ClientError {
    let from_transport = error
        .get_ref()
        .is_some_and(|inner| inner.is::<reqwest::Error>());

    if !from_transport {
        return match error.kind() {
            ErrorKind::InvalidData => {
                ClientError::Protocol(format!("event stream is not valid UTF-8: {}", error))
            }
            _ => ClientError::Network(error.to_string()),
        };
    }

    match error.into_inner().map(|inner| inner.downcast::<reqwest::Error>()) {
        Some(Ok(e)) => ClientError::from(*e),
        _ => ClientError::Network("connection lost while reading stream".to_string()),
    }
}
