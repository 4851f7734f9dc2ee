//! HTTP plumbing: request helpers, status checking and line-oriented
//! response bodies.

mod client;
mod lines;

pub use client::{HttpClient, build_http_client};
pub use lines::ResponseLines;
