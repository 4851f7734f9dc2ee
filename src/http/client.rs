//! HTTP client with status checking and error classification.

use anyhow::{Context, Result};
use log::debug;
use reqwest::multipart::Form;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::lines::ResponseLines;
use crate::error::ClientError;

/// Build an HTTP client. Only the connect phase is bounded: a total request
/// timeout would cut long-lived event streams.
pub fn build_http_client(connect_timeout: Option<Duration>) -> Result<HttpClient> {
    let mut builder = Client::builder().user_agent("safran-cli");
    if let Some(timeout) = connect_timeout {
        debug!("HTTP client connect timeout: {:?}", timeout);
        builder = builder.connect_timeout(timeout);
    }
    let client = builder.build().context("Failed to build HTTP client")?;
    Ok(HttpClient::new(client))
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Posts a multipart form and deserializes the JSON reply.
    #[tracing::instrument(skip(self, form))]
    pub async fn post_multipart_json<T: DeserializeOwned>(&self, url: &str, form: Form) -> Result<T> {
        debug!("POST multipart to {}...", url);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(ClientError::from)
            .context("Failed to send request")?;

        let response = check_status(response).await?;

        let body = response
            .text()
            .await
            .map_err(ClientError::from)
            .context("Failed to read response body")?;

        let result = serde_json::from_str::<T>(&body).map_err(|e| {
            ClientError::Protocol(format!("unexpected JSON response ({}): {}", e, body.trim()))
        })?;

        Ok(result)
    }

    /// Opens a GET request and hands back its body as a line reader. The
    /// body is consumed lazily as the caller asks for lines.
    #[tracing::instrument(skip(self, query))]
    pub async fn get_lines(&self, url: &str, query: &[(&str, &str)]) -> Result<ResponseLines> {
        debug!("GET stream from {} with query {:?}...", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(ClientError::from)
            .context("Failed to open stream")?;

        let response = check_status(response).await?;
        Ok(ResponseLines::new(response))
    }
}

/// Turns a non-success status into a protocol error, keeping the start of
/// the body for diagnostics.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!("HTTP {} with body: {}", status, body);
    Err(ClientError::status(status, &body).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::multipart::Part;

    fn category(err: &anyhow::Error) -> &'static str {
        err.downcast_ref::<ClientError>().unwrap().category()
    }

    #[tokio::test]
    async fn test_post_multipart_json_success() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("POST", "/form")
            .match_header(
                "content-type",
                mockito::Matcher::Regex("^multipart/form-data; boundary=".to_string()),
            )
            .match_body(mockito::Matcher::Regex(
                "name=\"field\"\r\n\r\nvalue".to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name": "test", "value": 42}"#)
            .create_async()
            .await;

        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct TestResponse {
            name: String,
            value: i32,
        }

        let client = HttpClient::new(Client::new());
        let form = Form::new().part("field", Part::text("value"));
        let result: TestResponse = client
            .post_multipart_json(&format!("{}/form", url), form)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.name, "test");
        assert_eq!(result.value, 42);
    }

    #[tokio::test]
    async fn test_post_multipart_json_error_status() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("POST", "/form")
            .with_status(500)
            .with_body("import failed")
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let err = client
            .post_multipart_json::<serde_json::Value>(&format!("{}/form", url), Form::new())
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(category(&err), "protocol");
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("import failed"));
    }

    #[tokio::test]
    async fn test_post_multipart_json_invalid_json() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let _mock = server
            .mock("POST", "/form")
            .with_status(200)
            .with_body("toto\n")
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let err = client
            .post_multipart_json::<serde_json::Value>(&format!("{}/form", url), Form::new())
            .await
            .unwrap_err();

        assert_eq!(category(&err), "protocol");
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpClient::new(Client::new());
        let err = client
            .get_lines(&format!("http://{}/events", addr), &[])
            .await
            .unwrap_err();

        assert_eq!(category(&err), "network");
    }

    #[tokio::test]
    async fn test_get_lines_error_status() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let _mock = server
            .mock("GET", "/events?channel=x")
            .with_status(404)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let err = client
            .get_lines(&format!("{}/events", url), &[("channel", "x")])
            .await
            .unwrap_err();

        assert_eq!(category(&err), "protocol");
    }

    #[tokio::test]
    async fn test_truncated_upload_reply_is_network_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 50\r\n\r\n{\"chan")
                .await;
            let _ = socket.shutdown().await;
        });

        let client = HttpClient::new(Client::new());
        let err = client
            .post_multipart_json::<serde_json::Value>(
                &format!("http://{}/upload", addr),
                Form::new().text("experiment", "{}"),
            )
            .await
            .unwrap_err();

        assert_eq!(category(&err), "network");
    }

    #[test]
    fn test_build_http_client_with_timeout() {
        assert!(build_http_client(Some(Duration::from_secs(3))).is_ok());
        assert!(build_http_client(None).is_ok());
    }
}
