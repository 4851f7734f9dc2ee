//! Records exchanged with the import server.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Descriptive fields sent as the `experiment` part of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentMetadata {
    pub reference: String,
    pub name: String,
    pub bench: String,
    pub campaign: String,
}

impl ExperimentMetadata {
    pub fn new(
        reference: impl Into<String>,
        name: impl Into<String>,
        bench: impl Into<String>,
        campaign: impl Into<String>,
    ) -> Self {
        Self {
            reference: reference.into(),
            name: name.into(),
            bench: bench.into(),
            campaign: campaign.into(),
        }
    }
}

/// Reply to `POST /upload`. Only the channel is consumed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadResponse {
    pub channel: String,
}

pub const REPORT_STATUS_PENDING: &str = "pending";
pub const REPORT_STATUS_SUCCESS: &str = "success";
pub const REPORT_STATUS_FAILURE: &str = "failure";

/// Import progress report pushed by the server on the event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Report {
    pub id: u64,
    pub title: String,
    pub status: String,
    #[serde(rename = "experimentID")]
    pub experiment_id: String,
    #[serde(rename = "hasAlarms")]
    pub has_alarms: bool,
    pub progress: i64,
    pub errors: BTreeMap<String, String>,
    pub steps: BTreeMap<String, bool>,
}

impl Report {
    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.status == REPORT_STATUS_SUCCESS || self.status == REPORT_STATUS_FAILURE
    }

    /// One-line rendering, e.g. `#3 [pending] 40% import (experiment 42)`.
    pub fn summary(&self) -> String {
        let status = if self.status.is_empty() {
            REPORT_STATUS_PENDING
        } else {
            self.status.as_str()
        };

        let mut line = format!("#{} [{}] {}%", self.id, status, self.progress);
        if !self.title.is_empty() {
            line.push(' ');
            line.push_str(&self.title);
        }
        if !self.experiment_id.is_empty() {
            line.push_str(&format!(" (experiment {})", self.experiment_id));
        }
        for (step, message) in &self.errors {
            line.push_str(&format!("; {}: {}", step, message));
        }
        line
    }
}
