pub mod client;
pub mod commands;
pub mod error;
pub mod event;
pub mod experiment;
pub mod http;

pub use client::{ExperimentClient, StreamEnd, StreamSummary};
pub use error::ClientError;
pub use event::EventLine;
pub use experiment::{ExperimentMetadata, Report, UploadResponse};
