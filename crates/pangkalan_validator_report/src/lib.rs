use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use pangkalan_core::{query, NoticeContainer, NoticeSeverity, ValidationNotice};
use pangkalan_model::LocationDocument;

pub mod html;

pub use html::{render_html, write_html_report, HtmlReportContext};

/// Per-code sample cap in the JSON and HTML reports.
pub const SAMPLE_NOTICE_LIMIT: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCounts {
    pub locations: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl ReportCounts {
    pub fn from_notices(notices: &NoticeContainer, locations: usize) -> Self {
        Self {
            locations,
            errors: notices.count(NoticeSeverity::Error),
            warnings: notices.count(NoticeSeverity::Warning),
            infos: notices.count(NoticeSeverity::Info),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_time_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<ReportCounts>,
    /// Categories present in an accepted document, first-seen order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

pub struct ReportSummaryContext<'a> {
    pub source: Option<String>,
    pub validator_version: Option<String>,
    pub validation_time_seconds: Option<f64>,
    pub notices: &'a NoticeContainer,
    /// Number of records seen, accepted or not.
    pub location_count: usize,
    /// Present only when the document passed validation.
    pub document: Option<&'a LocationDocument>,
}

impl ReportSummary {
    pub fn from_context(context: ReportSummaryContext<'_>) -> Self {
        let categories = context.document.map(|document| {
            query::unique_categories(document)
                .into_iter()
                .map(|category| category.as_str().to_string())
                .collect()
        });
        Self {
            validator_version: context.validator_version,
            validated_at: Some(Local::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
            source: context.source,
            validation_time_seconds: context.validation_time_seconds,
            counts: Some(ReportCounts::from_notices(
                context.notices,
                context.location_count,
            )),
            categories,
        }
    }
}

/// All notices sharing one code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeReport {
    pub code: String,
    pub severity: NoticeSeverity,
    pub total_notices: usize,
    pub sample_notices: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub summary: ReportSummary,
    pub is_valid: bool,
    pub notices: Vec<NoticeReport>,
}

impl ValidationReport {
    pub fn empty() -> Self {
        Self {
            summary: ReportSummary::default(),
            is_valid: true,
            notices: Vec::new(),
        }
    }

    pub fn from_container(container: &NoticeContainer) -> Self {
        Self::from_container_with_summary(container, ReportSummary::default())
    }

    /// Groups notices by code, in the order each code first appears.
    pub fn from_container_with_summary(
        container: &NoticeContainer,
        summary: ReportSummary,
    ) -> Self {
        let mut notices: Vec<NoticeReport> = Vec::new();
        for notice in container.iter() {
            let position = notices
                .iter()
                .position(|report| report.code == notice.code);
            let report = match position {
                Some(position) => &mut notices[position],
                None => {
                    notices.push(NoticeReport {
                        code: notice.code.clone(),
                        severity: notice.severity,
                        total_notices: 0,
                        sample_notices: Vec::new(),
                    });
                    let last = notices.len() - 1;
                    &mut notices[last]
                }
            };
            report.total_notices += 1;
            if report.sample_notices.len() < SAMPLE_NOTICE_LIMIT {
                report.sample_notices.push(sample_notice(notice));
            }
        }

        Self {
            summary,
            is_valid: !container.has_errors(),
            notices,
        }
    }

    pub fn to_json_string(&self, pretty: bool) -> anyhow::Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        json.context("serialize validation report")
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        self.write_json_with_format(path, false)
    }

    pub fn write_json_with_format<P: AsRef<Path>>(
        &self,
        path: P,
        pretty: bool,
    ) -> anyhow::Result<()> {
        let json = self.to_json_string(pretty)?;
        fs::write(&path, json)
            .with_context(|| format!("write report to {}", path.as_ref().display()))?;
        Ok(())
    }
}

fn sample_notice(notice: &ValidationNotice) -> Map<String, Value> {
    let mut sample = Map::new();
    sample.insert("message".to_string(), Value::from(notice.message.clone()));
    if let Some(index) = notice.feature_index {
        sample.insert("featureIndex".to_string(), Value::from(index));
    }
    if let Some(field) = notice.field.as_ref() {
        sample.insert("fieldName".to_string(), Value::from(field.clone()));
    }
    for (key, value) in &notice.context {
        sample.insert(key.clone(), value.clone());
    }
    sample
}
