//! Lines received on the event stream.

use crate::experiment::Report;

/// A single non-empty line of the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLine(String);

/// Server-sent events view of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineField<'a> {
    Comment(&'a str),
    Field { name: &'a str, value: &'a str },
}

impl EventLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn field(&self) -> LineField<'_> {
        if let Some(comment) = self.0.strip_prefix(':') {
            return LineField::Comment(comment);
        }
        match self.0.split_once(':') {
            Some((name, value)) => LineField::Field {
                name,
                value: value.strip_prefix(' ').unwrap_or(value),
            },
            None => LineField::Field {
                name: &self.0,
                value: "",
            },
        }
    }

    /// Payload of a `data:` line.
    pub fn data(&self) -> Option<&str> {
        match self.field() {
            LineField::Field {
                name: "data",
                value,
            } => Some(value),
            _ => None,
        }
    }

    /// Decodes a `data:` payload as an import report.
    pub fn report(&self) -> Option<Report> {
        self.data()
            .and_then(|payload| serde_json::from_str(payload).ok())
    }
}

impl std::fmt::Display for EventLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
