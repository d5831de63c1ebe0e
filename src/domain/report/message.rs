//! Wire payload handed to the rendering workers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::foundation::{DomainError, ErrorCode, ReportId, TemplateId};

use super::{Report, ReportFilters};

/// Artifact format a worker renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pdf,
    Html,
    Csv,
    Xml,
    Txt,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Pdf,
        OutputFormat::Html,
        OutputFormat::Csv,
        OutputFormat::Xml,
        OutputFormat::Txt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Html => "html",
            OutputFormat::Csv => "csv",
            OutputFormat::Xml => "xml",
            OutputFormat::Txt => "txt",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == wanted)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::InvalidOutputFormat,
                    format!("Unsupported output format: {}", s),
                )
                .with_field("outputFormat", "must be one of pdf, html, csv, xml, txt")
            })
    }
}

/// Top-level keys owned by [`ReportMessage`]; `extra` never carries them.
pub const RESERVED_FIELDS: [&str; 4] = ["reportId", "templateId", "outputFormat", "filters"];

pub fn is_reserved_field(key: &str) -> bool {
    RESERVED_FIELDS.contains(&key)
}

/// Message published for every report request.
///
/// Fields the service does not know about are kept in `extra` so they
/// survive a decode/encode cycle. Extra keys are serialized after the core
/// fields, so a reserved key there would shadow the real value for most
/// JSON readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMessage {
    pub report_id: ReportId,
    pub template_id: TemplateId,
    pub output_format: OutputFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<ReportFilters>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReportMessage {
    /// Builds the message announcing `report`.
    pub fn for_report(report: &Report, output_format: OutputFormat) -> Self {
        Self {
            report_id: *report.id(),
            template_id: *report.template_id(),
            output_format,
            filters: report.filters().cloned(),
            extra: Map::new(),
        }
    }

    /// Adds a field outside the core schema. Reserved keys are dropped.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if !is_reserved_field(&key) {
            self.extra.insert(key, value);
        }
        self
    }

    /// Attaches caller-supplied fields.
    ///
    /// # Errors
    ///
    /// `UnexpectedFields` naming every key that collides with a core field.
    pub fn with_extras(mut self, extra: Map<String, Value>) -> Result<Self, DomainError> {
        let reserved: Vec<&str> = extra
            .keys()
            .map(String::as_str)
            .filter(|key| is_reserved_field(key))
            .collect();
        if !reserved.is_empty() {
            return Err(reserved.into_iter().fold(
                DomainError::new(
                    ErrorCode::UnexpectedFields,
                    "Extra fields may not replace core message fields",
                ),
                |err, key| err.with_field(key, "reserved message field"),
            ));
        }

        self.extra.extend(extra);
        Ok(self)
    }
}
