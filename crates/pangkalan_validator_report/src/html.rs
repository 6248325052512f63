use std::collections::BTreeMap;
use std::fmt::Write;
use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::{Local, SecondsFormat};
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Number, Value};

use pangkalan_core::{NoticeContainer, NoticeSeverity, ValidationNotice};

use crate::{ReportCounts, ReportSummary, SAMPLE_NOTICE_LIMIT};

pub struct HtmlReportContext {
    pub source: String,
    pub validated_at: String,
    pub validator_version: Option<String>,
}

impl HtmlReportContext {
    pub fn from_summary(summary: &ReportSummary, source: impl Into<String>) -> Self {
        let validated_at = summary
            .validated_at
            .clone()
            .unwrap_or_else(|| Local::now().to_rfc3339_opts(SecondsFormat::Secs, true));

        Self {
            source: source.into(),
            validated_at,
            validator_version: summary.validator_version.clone(),
        }
    }
}

pub fn write_html_report<P: AsRef<Path>>(
    path: P,
    notices: &NoticeContainer,
    summary: &ReportSummary,
    context: HtmlReportContext,
) -> anyhow::Result<()> {
    let html = render_html(notices, summary, &context);
    fs::write(&path, html)
        .with_context(|| format!("write html report to {}", path.as_ref().display()))?;
    Ok(())
}

pub fn render_html(
    notices: &NoticeContainer,
    summary: &ReportSummary,
    context: &HtmlReportContext,
) -> String {
    let mut out = String::new();
    out.push_str(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Pangkalan Ojek Validation Report</title>
    <meta name="robots" content="noindex, nofollow">
    <meta http-equiv="Content-Type" content="text/html; charset=UTF-8; width=device-width, initial-scale=1"/>
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" integrity="sha256-p4NxAoJBhIIN+hmNHrzRCf9tD/miZyoHS5obTRR9BMY=" crossorigin=""/>
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js" integrity="sha256-20nQCchB9co0qIjJZRGuk2/Z9VM+kNiyxNV1lvTlZBo=" crossorigin=""></script>
    <style>
    body {
        font-family: Helvetica, Arial, sans-serif;
        font-size: 14px;
        min-width: 800px;
        padding: 1em 2em;
    }

    .error:before {
        content: "\1F534  ";
    }

    .warning:before {
        content: "\1F7E0  ";
    }

    .info:before {
        content: "\26AA  ";
    }

    table {
        width: 100%;
    }

    table th {
        text-align: left;
        border-bottom: 2px solid #000;
        padding: 0.5em;
        white-space: nowrap;
    }

    table td {
        border-bottom: 1px solid #ddd;
        padding: 0.5em;
    }

    .desc-content {
        padding: 0.5em;
        border-bottom: 5px solid #000;
        border-top: 5px solid #000;
    }

    .desc-content h3 {
        margin-top: 0;
    }

    .summary dd {
        font-weight: bold;
        display: inline-block;
        width: 160px;
        margin-inline-start: 0;
    }

    .summary dt {
        display: inline-block;
    }

    .category {
        background-color: #d4d4d4;
        padding: 2px 5px;
        margin-right: 2px;
    }

    #map-modal {
        display: none;
        position: fixed;
        inset: 5%;
        background: #fff;
        border: 2px solid #000;
        z-index: 1000;
    }

    #map-container {
        width: 100%;
        height: 100%;
    }
    </style>
</head>
<body>
    <h1>Pangkalan Ojek Validation Report</h1>
"#,
    );

    render_summary(&mut out, summary, context);

    let notice_counts = NoticeCounts::from_container(notices);
    if notice_counts.errors == 0 {
        out.push_str("    <p><b>The file passed validation and can be imported.</b></p>\n");
    } else {
        out.push_str("    <p><b>The file was rejected. Fix the errors below and upload it again.</b></p>\n");
    }

    out.push_str("    <h3><span>");
    write!(&mut out, "{}", notice_counts.total).ok();
    out.push_str("</span> notices reported\n        (<span>");
    write!(&mut out, "{}", notice_counts.errors).ok();
    out.push_str("</span> errors,\n        <span>");
    write!(&mut out, "{}", notice_counts.warnings).ok();
    out.push_str("</span> warnings,\n        <span>");
    write!(&mut out, "{}", notice_counts.infos).ok();
    out.push_str("</span> infos)\n    </h3>\n\n");
    out.push_str("    <table class=\"accordion\">\n        <thead>\n        <tr>\n            <th>Notice Code</th>\n            <th>Severity</th>\n            <th>Total</th>\n        </tr>\n        </thead>\n        <tbody>\n");
    render_notice_groups(&mut out, notices);
    out.push_str("        </tbody>\n    </table>\n\n");
    out.push_str(
        r#"    <div id="map-modal"><div id="map-container"></div></div>
</body>
    <script>
        document.querySelectorAll(".view-map-btn").forEach(function (button) {
            button.addEventListener("click", function () {
                var lat = parseFloat(button.dataset.lat);
                var lng = parseFloat(button.dataset.lng);
                var modal = document.getElementById("map-modal");
                modal.style.display = "block";
                var container = document.getElementById("map-container");
                if (container._map) {
                    container._map.remove();
                }
                var map = L.map(container).setView([lat, lng], 5);
                L.tileLayer("https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png").addTo(map);
                L.marker([lat, lng]).addTo(map).bindPopup(button.dataset.label).openPopup();
                container._map = map;
            });
        });
        document.getElementById("map-modal").addEventListener("dblclick", function () {
            this.style.display = "none";
        });
    </script>
</html>
"#,
    );
    out
}

fn render_summary(out: &mut String, summary: &ReportSummary, context: &HtmlReportContext) {
    out.push_str("    <div class=\"summary\">\n        <dl>\n");
    let mut entries = vec![
        ("Source".to_string(), context.source.clone()),
        ("Validated at".to_string(), context.validated_at.clone()),
    ];
    if let Some(version) = context.validator_version.as_ref() {
        entries.push(("Validator version".to_string(), version.clone()));
    }
    if let Some(seconds) = summary.validation_time_seconds {
        entries.push(("Validation time".to_string(), format!("{seconds:.3} s")));
    }
    if let Some(counts) = summary.counts.as_ref() {
        entries.extend(build_counts_entries(counts));
    }
    for (key, value) in entries {
        out.push_str("            <dd>");
        push_escaped(out, &format!("{key}:"));
        out.push_str("</dd>\n            <dt>");
        if value.trim().is_empty() {
            out.push_str("N/A");
        } else {
            push_escaped(out, &value);
        }
        out.push_str("</dt><br>\n");
    }
    out.push_str("        </dl>\n");

    if let Some(categories) = summary.categories.as_ref().filter(|c| !c.is_empty()) {
        out.push_str("        <h4>Location categories</h4>\n        <div>\n");
        for category in categories {
            out.push_str("            <span class=\"category\">");
            push_escaped(out, category);
            out.push_str("</span>\n");
        }
        out.push_str("        </div>\n");
    }
    out.push_str("    </div>\n\n");
}

fn build_counts_entries(counts: &ReportCounts) -> Vec<(String, String)> {
    vec![
        ("Locations".to_string(), counts.locations.to_string()),
        ("Errors".to_string(), counts.errors.to_string()),
        ("Warnings".to_string(), counts.warnings.to_string()),
    ]
}

struct NoticeCounts {
    total: usize,
    errors: usize,
    warnings: usize,
    infos: usize,
}

impl NoticeCounts {
    fn from_container(container: &NoticeContainer) -> Self {
        let mut counts = Self {
            total: 0,
            errors: 0,
            warnings: 0,
            infos: 0,
        };
        for notice in container.iter() {
            counts.total += 1;
            match notice.severity {
                NoticeSeverity::Error => counts.errors += 1,
                NoticeSeverity::Warning => counts.warnings += 1,
                NoticeSeverity::Info => counts.infos += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum HtmlSeverity {
    Error,
    Warning,
    Info,
}

impl HtmlSeverity {
    fn from_notice(severity: NoticeSeverity) -> Self {
        match severity {
            NoticeSeverity::Error => HtmlSeverity::Error,
            NoticeSeverity::Warning => HtmlSeverity::Warning,
            NoticeSeverity::Info => HtmlSeverity::Info,
        }
    }

    fn label(self) -> &'static str {
        match self {
            HtmlSeverity::Error => "ERROR",
            HtmlSeverity::Warning => "WARNING",
            HtmlSeverity::Info => "INFO",
        }
    }

    fn css_class(self) -> &'static str {
        match self {
            HtmlSeverity::Error => "error",
            HtmlSeverity::Warning => "warning",
            HtmlSeverity::Info => "info",
        }
    }
}

fn render_notice_groups(out: &mut String, notices: &NoticeContainer) {
    let grouped = group_notices(notices);
    for severity in [
        HtmlSeverity::Error,
        HtmlSeverity::Warning,
        HtmlSeverity::Info,
    ] {
        if let Some(code_map) = grouped.get(&severity) {
            for (code, notices) in code_map {
                render_notice_group(out, severity, code, notices);
            }
        }
    }
}

fn group_notices(
    notices: &NoticeContainer,
) -> FxHashMap<HtmlSeverity, BTreeMap<String, Vec<&ValidationNotice>>> {
    let mut grouped: FxHashMap<HtmlSeverity, BTreeMap<String, Vec<&ValidationNotice>>> =
        FxHashMap::default();
    for notice in notices.iter() {
        grouped
            .entry(HtmlSeverity::from_notice(notice.severity))
            .or_default()
            .entry(notice.code.clone())
            .or_default()
            .push(notice);
    }
    grouped
}

fn render_notice_group(
    out: &mut String,
    severity: HtmlSeverity,
    code: &str,
    notices: &[&ValidationNotice],
) {
    let fields = notice_fields(notices);
    let has_map_data = notices.iter().any(|notice| notice_position(notice).is_some());

    out.push_str("            <tr class=\"notice\">\n                <td>");
    push_escaped(out, code);
    out.push_str("</td>\n                <td class=\"");
    out.push_str(severity.css_class());
    out.push_str("\">");
    out.push_str(severity.label());
    out.push_str("</td>\n                <td>");
    write!(out, "{}", notices.len()).ok();
    out.push_str("</td>\n            </tr>\n            <tr class=\"description\">\n                <td colspan=\"3\">\n                    <div class=\"desc-content\">\n                        <h3>");
    push_escaped(out, code);
    out.push_str("</h3>\n");
    if notices.len() > SAMPLE_NOTICE_LIMIT {
        out.push_str("                        <p>Only the first ");
        write!(out, "{}", SAMPLE_NOTICE_LIMIT).ok();
        out.push_str(" of ");
        write!(out, "{}", notices.len()).ok();
        out.push_str(" notices are displayed below.</p>\n");
    }

    out.push_str("                        <table>\n                            <thead>\n                                <tr>\n                                    <th>message</th>\n");
    for field in &fields {
        out.push_str("                                    <th>");
        push_escaped(out, field);
        out.push_str("</th>\n");
    }
    if has_map_data {
        out.push_str("                                    <th>Map</th>\n");
    }
    out.push_str("                                </tr>\n                            </thead>\n                            <tbody>\n");
    for notice in notices.iter().take(SAMPLE_NOTICE_LIMIT) {
        out.push_str("                                <tr>\n                                    <td>");
        push_escaped(out, &notice.message);
        out.push_str("</td>\n");
        for field in &fields {
            out.push_str("                                    <td>");
            render_notice_field_value(out, notice, field);
            out.push_str("</td>\n");
        }
        if has_map_data {
            render_map_button(out, notice);
        }
        out.push_str("                                </tr>\n");
    }
    out.push_str("                            </tbody>\n                        </table>\n");
    out.push_str("                    </div>\n                </td>\n            </tr>\n");
}

fn notice_position(notice: &ValidationNotice) -> Option<(f64, f64)> {
    let lat = notice.context.get("latitude").and_then(Value::as_f64)?;
    let lng = notice.context.get("longitude").and_then(Value::as_f64)?;
    Some((lat, lng))
}

fn render_map_button(out: &mut String, notice: &ValidationNotice) {
    let Some((lat, lng)) = notice_position(notice) else {
        out.push_str("                                    <td>-</td>\n");
        return;
    };
    out.push_str("                                    <td><button class=\"view-map-btn\" data-label=\"");
    push_escaped(out, &notice.message);
    write!(out, "\" data-lat=\"{}\" data-lng=\"{}\">View</button></td>\n", lat, lng).ok();
}

fn notice_fields(notices: &[&ValidationNotice]) -> Vec<String> {
    let mut union = FxHashSet::default();
    for notice in notices {
        for key in notice.context.keys() {
            union.insert(key.clone());
        }
        if notice.feature_index.is_some() {
            union.insert("feature".to_string());
        }
        if notice.field.is_some() {
            union.insert("fieldName".to_string());
        }
    }

    let mut ordered = Vec::new();
    for field in ["feature", "fieldName"] {
        if union.remove(field) {
            ordered.push(field.to_string());
        }
    }
    if let Some(first) = notices.first() {
        for field in &first.field_order {
            if union.remove(field) {
                ordered.push(field.clone());
            }
        }
    }
    let mut rest: Vec<String> = union.into_iter().collect();
    rest.sort();
    ordered.extend(rest);
    ordered
}

fn render_notice_field_value(out: &mut String, notice: &ValidationNotice, field: &str) {
    if let Some(value) = notice_field_value(notice, field) {
        render_json_value(out, &value);
    } else {
        out.push_str("N/A");
    }
}

fn notice_field_value(notice: &ValidationNotice, field: &str) -> Option<Value> {
    match field {
        // Shown one-based, the way messages number features.
        "feature" => notice
            .feature_index
            .map(|index| Value::Number(Number::from(index + 1))),
        "fieldName" => notice.field.as_ref().map(|value| Value::String(value.clone())),
        _ => notice.context.get(field).cloned(),
    }
}

fn render_json_value(out: &mut String, value: &Value) {
    match value {
        Value::String(text) => push_escaped(out, text),
        Value::Number(num) => {
            if let Some(text) = num.as_i64().map(|v| v.to_string()) {
                out.push_str(&text);
            } else if let Some(text) = num.as_f64().map(|v| v.to_string()) {
                out.push_str(&text);
            } else {
                out.push_str("N/A");
            }
        }
        Value::Bool(flag) => {
            out.push_str(if *flag { "true" } else { "false" });
        }
        Value::Null => out.push_str("N/A"),
        Value::Array(items) => {
            let joined = items
                .iter()
                .map(|item| match item {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            push_escaped(out, &joined);
        }
        other => push_escaped(out, &other.to_string()),
    }
}

fn push_escaped(out: &mut String, value: &str) {
    out.push_str(&escape_html(value));
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::new();
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use pangkalan_core::{default_runner, validate_text};
    use serde_json::json;

    fn context() -> HtmlReportContext {
        HtmlReportContext {
            source: "upload <1>.geojson".to_string(),
            validated_at: "2026-01-01T00:00:00Z".to_string(),
            validator_version: Some("0.3.0".to_string()),
        }
    }

    #[test]
    fn renders_groups_and_map_buttons() {
        let text = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"nama_lokasi": "<b>A</b>"},
                "geometry": {"type": "Point", "coordinates": [2.35, 48.85]}
            }]
        })
        .to_string();
        let outcome = validate_text(&text, &default_runner());
        let html = render_html(&outcome.notices, &ReportSummary::default(), &context());

        assert!(html.contains("<td>coordinates_outside_region</td>"));
        assert!(html.contains("data-lat=\"48.85\" data-lng=\"2.35\""));
        assert!(html.contains("upload &lt;1&gt;.geojson"));
        assert!(html.contains("The file was rejected"));
        assert!(!html.contains("<b>A</b>"));
    }

    #[test]
    fn clean_report_says_so() {
        let html = render_html(&NoticeContainer::new(), &ReportSummary::default(), &context());
        assert!(html.contains("The file passed validation"));
        assert!(html.contains("<span>0</span> notices reported"));
    }

    #[test]
    fn escapes_html() {
        assert_eq!(escape_html("a<b>&\"'"), "a&lt;b&gt;&amp;&quot;&#39;");
    }
}
