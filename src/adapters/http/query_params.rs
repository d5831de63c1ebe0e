//! Query-string parsing for the report list endpoint.
//!
//! Accepts snake_case and camelCase spellings; when both are present the
//! snake_case value wins. `metadata.<key>` parameters become metadata
//! equality conditions. Any other parameter is rejected.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::domain::foundation::{DomainError, ErrorCode, TemplateId};
use crate::domain::report::{
    Cursor, OutputFormat, ReportQuery, SortOrder, MAX_METADATA_KEY_LENGTH,
};

const METADATA_PREFIX: &str = "metadata.";

/// `(snake_case, camelCase)` spellings of every known parameter.
const KNOWN: [(&str, &str); 8] = [
    ("limit", "limit"),
    ("page", "page"),
    ("sort_order", "sortOrder"),
    ("cursor", "cursor"),
    ("status", "status"),
    ("template_id", "templateId"),
    ("created_at", "createdAt"),
    ("output_format", "outputFormat"),
];

fn lookup<'a>(params: &'a HashMap<String, String>, snake: &str, camel: &str) -> Option<&'a str> {
    params
        .get(snake)
        .or_else(|| params.get(camel))
        .map(String::as_str)
        .filter(|value| !value.trim().is_empty())
}

fn positive(name: &str, raw: &str) -> Result<u32, DomainError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| {
            DomainError::new(
                ErrorCode::InvalidPagination,
                format!("{} must be a positive integer", name),
            )
            .with_field(name, "must be a positive integer")
        })
}

fn unexpected_fields(params: &HashMap<String, String>) -> Option<DomainError> {
    let known: BTreeSet<&str> = KNOWN.iter().flat_map(|(snake, camel)| [*snake, *camel]).collect();
    let unexpected: BTreeSet<&str> = params
        .keys()
        .map(String::as_str)
        .filter(|name| !known.contains(name) && !name.starts_with(METADATA_PREFIX))
        .collect();

    if unexpected.is_empty() {
        return None;
    }
    let err = DomainError::new(
        ErrorCode::UnexpectedFields,
        format!(
            "Unexpected query parameters: {}",
            unexpected.iter().copied().collect::<Vec<_>>().join(", ")
        ),
    );
    Some(
        unexpected
            .into_iter()
            .fold(err, |err, name| err.with_field(name, "unexpected")),
    )
}

/// Builds and validates a [`ReportQuery`] from raw query parameters.
pub fn parse_report_query(
    params: &HashMap<String, String>,
    max_limit: u32,
) -> Result<ReportQuery, DomainError> {
    if let Some(err) = unexpected_fields(params) {
        return Err(err);
    }

    let mut query = ReportQuery::default();

    if let Some(raw) = lookup(params, "limit", "limit") {
        query.limit = positive("limit", raw)?;
    }
    if let Some(raw) = lookup(params, "page", "page") {
        query.page = positive("page", raw)?;
    }
    if let Some(raw) = lookup(params, "sort_order", "sortOrder") {
        query.sort_order = raw.parse::<SortOrder>()?;
    }
    if let Some(raw) = lookup(params, "cursor", "cursor") {
        query.cursor = Some(Cursor::decode(raw)?);
    }
    if let Some(raw) = lookup(params, "status", "status") {
        query.status = Some(raw.to_string());
    }
    if let Some(raw) = lookup(params, "template_id", "templateId") {
        let template_id = raw.trim().parse::<TemplateId>().map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidIdentifier,
                format!("Invalid template id: {}", raw),
            )
            .with_field("templateId", "must be a UUID")
        })?;
        query.template_id = Some(template_id);
    }
    if let Some(raw) = lookup(params, "created_at", "createdAt") {
        let day = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidDateFormat,
                format!("Invalid date: {}", raw),
            )
            .with_field("createdAt", "expected YYYY-MM-DD")
        })?;
        query.created_at = Some(day);
    }
    if let Some(raw) = lookup(params, "output_format", "outputFormat") {
        query.output_format = Some(raw.parse::<OutputFormat>()?);
    }

    for (name, value) in params {
        let Some(key) = name.strip_prefix(METADATA_PREFIX) else {
            continue;
        };
        if key.is_empty() || key.len() > MAX_METADATA_KEY_LENGTH {
            return Err(DomainError::new(
                ErrorCode::InvalidMetadata,
                format!("Invalid metadata key: {}", name),
            )
            .with_field(name.clone(), "invalid key"));
        }
        query.metadata.insert(key.to_string(), value.clone());
    }

    query.validate(max_limit)?;
    Ok(query)
}
