use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::DashboardError;
use crate::models::DailyRecord;
use crate::source::{is_date_shaped, parse_date};

pub const SCORE_FIELD: &str = "score";
pub const TIME_FIELD: &str = "time spent (minutes)";
pub const BOUNTY_FIELD: &str = "bounty earned (usd)";
pub const NOTES_FIELD: &str = "notes";

/// Reads an issue-form body into lowercase field names.
///
/// Accepts a JSON object (first element of list values) or the rendered
/// markdown form, where each `### Heading` introduces a field.
pub fn parse_issue_form(body: &str) -> HashMap<String, String> {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        return map
            .into_iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    serde_json::Value::String(text) => text,
                    serde_json::Value::Number(number) => number.to_string(),
                    serde_json::Value::Array(items) => match items.into_iter().next() {
                        Some(serde_json::Value::String(text)) => text,
                        Some(other) => other.to_string(),
                        None => return None,
                    },
                    _ => return None,
                };
                Some((key.to_lowercase(), text))
            })
            .collect();
    }

    let body = body
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .map(|inner| inner.replace("\\n", "\n"))
        .unwrap_or_else(|| body.to_string());

    let mut fields: Vec<(String, Vec<String>)> = Vec::new();
    for line in body.lines() {
        if let Some(heading) = line.strip_prefix("### ") {
            fields.push((heading.trim().to_lowercase(), Vec::new()));
        } else if let Some((_, lines)) = fields.last_mut() {
            let trimmed = line.trim();
            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                lines.push(trimmed.to_string());
            }
        }
    }

    fields
        .into_iter()
        .map(|(key, lines)| (key, lines.join("\n").trim().to_string()))
        .collect()
}

/// Date from the first `YYYY-MM-DD`-shaped token in `text`.
///
/// `Ok(None)` only when no such token exists; a shaped token that is not a
/// calendar date is an error rather than a silent fallback.
pub fn find_date(text: &str) -> Result<Option<NaiveDate>, DashboardError> {
    let token = (0..text.len().saturating_sub(9))
        .filter_map(|start| text.get(start..start + 10))
        .find(|candidate| is_date_shaped(candidate));

    match token {
        Some(token) => parse_date(token).map(Some).map_err(|_| {
            DashboardError::MalformedData(format!("issue title has invalid date {token:?}"))
        }),
        None => Ok(None),
    }
}

fn form_amount(fields: &HashMap<String, String>, key: &str) -> Result<f64, DashboardError> {
    match fields.get(key).map(|v| v.trim()) {
        None | Some("") | Some("_No response_") => Ok(0.0),
        Some(text) => {
            let value: f64 = text.parse().map_err(|_| {
                DashboardError::MalformedData(format!("form field {key:?} is not a number: {text:?}"))
            })?;
            if !value.is_finite() || value < 0.0 {
                return Err(DashboardError::MalformedData(format!(
                    "form field {key:?} must be non-negative, got {text}"
                )));
            }
            Ok(value)
        }
    }
}

/// Builds a record from a submitted issue; the title's date wins over `today`.
///
/// `today` is used only when the title carries no date at all.
pub fn record_from_issue(
    title: &str,
    body: &str,
    today: NaiveDate,
) -> Result<DailyRecord, DashboardError> {
    let fields = parse_issue_form(body);
    let notes = fields
        .get(NOTES_FIELD)
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty() && n.as_str() != "_No response_");

    Ok(DailyRecord {
        date: find_date(title)?.unwrap_or(today),
        score: form_amount(&fields, SCORE_FIELD)?,
        time_spent: form_amount(&fields, TIME_FIELD)?,
        bounty: form_amount(&fields, BOUNTY_FIELD)?,
        notes,
    })
}
