/// Built-in pipeline tools
///
/// The standard pipeline passes data between steps through files in the
/// working directory:
///
/// ```text
/// ingest_data      -> raw.json       (array of records)
/// clean_data       -> clean.json     (objects only, nulls dropped, strings trimmed)
/// analyze          -> analysis.json  (record count and per-field summary)
/// generate_report  -> report.md
/// send_payload        posts report.md to DELIVERY_URL, if configured
/// ```
///
/// `health_check` is not a pipeline step; it verifies the working directory
/// is writable and the configured data source is reachable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use tokio::fs;

use super::tool_trait::{report, StatusCode, Tool, ToolContext, ToolError, ToolResult};
use crate::config::DataSource;

pub const RAW_FILE: &str = "raw.json";
pub const CLEAN_FILE: &str = "clean.json";
pub const ANALYSIS_FILE: &str = "analysis.json";
pub const REPORT_FILE: &str = "report.md";

async fn read_input(context: &ToolContext, file_name: &str) -> ToolResult<String> {
    match fs::read_to_string(context.path(file_name)).await {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(ToolError::MissingInput(
            context.path(file_name).display().to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

async fn write_output(context: &ToolContext, file_name: &str, contents: &str) -> ToolResult<()> {
    fs::create_dir_all(context.tmp_dir()).await?;
    fs::write(context.path(file_name), contents).await?;
    Ok(())
}

fn expect_records(value: JsonValue) -> ToolResult<Vec<JsonValue>> {
    match value {
        JsonValue::Array(records) => Ok(records),
        JsonValue::Object(mut map) => match map.remove("records") {
            Some(JsonValue::Array(records)) => Ok(records),
            _ => Err(ToolError::InvalidData(
                "expected an array or an object with a records array".to_string(),
            )),
        },
        _ => Err(ToolError::InvalidData("expected an array of records".to_string())),
    }
}

/// Fetches the configured data source into `raw.json`
///
/// Without a configured source, `payload.records` is ingested instead (an
/// empty array if absent).
pub struct IngestData {
    source: DataSource,
    client: Client,
}

impl IngestData {
    pub fn new(source: DataSource, client: Client) -> Self {
        Self { source, client }
    }

    async fn fetch(&self, context: &ToolContext) -> ToolResult<Vec<JsonValue>> {
        match &self.source {
            DataSource::Path(path) => {
                let contents = match fs::read_to_string(path).await {
                    Ok(contents) => contents,
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        return Err(ToolError::MissingInput(path.display().to_string()))
                    }
                    Err(e) => return Err(e.into()),
                };
                expect_records(serde_json::from_str(&contents)?)
            }
            DataSource::Url(url) => {
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| ToolError::Upstream(e.to_string()))?;

                if !response.status().is_success() {
                    return Err(ToolError::Upstream(format!(
                        "data source returned {}",
                        response.status()
                    )));
                }

                let body: JsonValue = response
                    .json()
                    .await
                    .map_err(|e| ToolError::InvalidData(e.to_string()))?;
                expect_records(body)
            }
            DataSource::None => match context.payload.get("records") {
                Some(records) => expect_records(records.clone()),
                None => Ok(Vec::new()),
            },
        }
    }

    async fn execute(&self, context: &ToolContext) -> ToolResult<()> {
        let records = self.fetch(context).await?;
        tracing::info!(source = self.source.kind(), records = records.len(), "Ingested data");
        write_output(context, RAW_FILE, &serde_json::to_string_pretty(&records)?).await
    }
}

#[async_trait]
impl Tool for IngestData {
    fn name(&self) -> &str {
        "ingest_data"
    }

    async fn run(&self, context: &ToolContext) -> StatusCode {
        report(self.name(), self.execute(context).await)
    }
}

/// Normalizes `raw.json` into `clean.json`
pub struct CleanData;

impl CleanData {
    fn clean_record(record: JsonValue) -> Option<Map<String, JsonValue>> {
        let JsonValue::Object(fields) = record else {
            return None;
        };

        let cleaned: Map<String, JsonValue> = fields
            .into_iter()
            .filter_map(|(key, value)| match value {
                JsonValue::Null => None,
                JsonValue::String(s) => {
                    let trimmed = s.trim();
                    (!trimmed.is_empty()).then(|| (key, JsonValue::String(trimmed.to_string())))
                }
                other => Some((key, other)),
            })
            .collect();

        (!cleaned.is_empty()).then_some(cleaned)
    }

    async fn execute(&self, context: &ToolContext) -> ToolResult<()> {
        let raw = read_input(context, RAW_FILE).await?;
        let records = expect_records(serde_json::from_str(&raw)?)?;
        let total = records.len();

        let cleaned: Vec<Map<String, JsonValue>> =
            records.into_iter().filter_map(Self::clean_record).collect();

        tracing::info!(kept = cleaned.len(), dropped = total - cleaned.len(), "Cleaned data");
        write_output(context, CLEAN_FILE, &serde_json::to_string_pretty(&cleaned)?).await
    }
}

#[async_trait]
impl Tool for CleanData {
    fn name(&self) -> &str {
        "clean_data"
    }

    async fn run(&self, context: &ToolContext) -> StatusCode {
        report(self.name(), self.execute(context).await)
    }
}

/// Min/max/mean over the numeric values of one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSummary {
    /// Records that carry the field
    pub present: usize,
    pub numeric: Option<NumericSummary>,
}

/// Contents of `analysis.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub record_count: usize,
    pub fields: BTreeMap<String, FieldSummary>,
    pub generated_at: DateTime<Utc>,
}

impl Analysis {
    pub fn of(records: &[Map<String, JsonValue>], generated_at: DateTime<Utc>) -> Self {
        let mut present: BTreeMap<String, usize> = BTreeMap::new();
        let mut numbers: BTreeMap<String, Vec<f64>> = BTreeMap::new();

        for record in records {
            for (key, value) in record {
                *present.entry(key.clone()).or_default() += 1;
                if let Some(n) = value.as_f64() {
                    numbers.entry(key.clone()).or_default().push(n);
                }
            }
        }

        let fields = present
            .into_iter()
            .map(|(key, count)| {
                let numeric = numbers.get(&key).filter(|v| !v.is_empty()).map(|values| {
                    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    let mean = values.iter().sum::<f64>() / values.len() as f64;
                    NumericSummary { min, max, mean }
                });
                (
                    key,
                    FieldSummary {
                        present: count,
                        numeric,
                    },
                )
            })
            .collect();

        Analysis {
            record_count: records.len(),
            fields,
            generated_at,
        }
    }

    /// Markdown rendering used for `report.md`
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# Pipeline Report\n\n");
        out.push_str(&format!("Generated: {}\n\n", self.generated_at.to_rfc3339()));
        out.push_str(&format!("Records: {}\n", self.record_count));

        if self.fields.is_empty() {
            return out;
        }

        out.push_str("\n| Field | Present | Min | Max | Mean |\n");
        out.push_str("|-------|---------|-----|-----|------|\n");
        for (name, field) in &self.fields {
            match &field.numeric {
                Some(n) => out.push_str(&format!(
                    "| {} | {} | {} | {} | {:.2} |\n",
                    name, field.present, n.min, n.max, n.mean
                )),
                None => out.push_str(&format!("| {} | {} | - | - | - |\n", name, field.present)),
            }
        }
        out
    }
}

/// Summarizes `clean.json` into `analysis.json`
pub struct Analyze;

impl Analyze {
    async fn execute(&self, context: &ToolContext) -> ToolResult<()> {
        let clean = read_input(context, CLEAN_FILE).await?;
        let records: Vec<Map<String, JsonValue>> = serde_json::from_str(&clean)?;
        let analysis = Analysis::of(&records, Utc::now());

        tracing::info!(
            records = analysis.record_count,
            fields = analysis.fields.len(),
            "Analyzed data"
        );
        write_output(context, ANALYSIS_FILE, &serde_json::to_string_pretty(&analysis)?).await
    }
}

#[async_trait]
impl Tool for Analyze {
    fn name(&self) -> &str {
        "analyze"
    }

    async fn run(&self, context: &ToolContext) -> StatusCode {
        report(self.name(), self.execute(context).await)
    }
}

/// Renders `analysis.json` as `report.md`
pub struct GenerateReport;

impl GenerateReport {
    async fn execute(&self, context: &ToolContext) -> ToolResult<()> {
        let raw = read_input(context, ANALYSIS_FILE).await?;
        let analysis: Analysis = serde_json::from_str(&raw)?;
        write_output(context, REPORT_FILE, &analysis.to_markdown()).await
    }
}

#[async_trait]
impl Tool for GenerateReport {
    fn name(&self) -> &str {
        "generate_report"
    }

    async fn run(&self, context: &ToolContext) -> StatusCode {
        report(self.name(), self.execute(context).await)
    }
}

#[derive(Debug, Serialize)]
struct Delivery<'a> {
    report: &'a str,
    sent_at: DateTime<Utc>,
}

/// Delivers `report.md`
///
/// With no delivery URL configured the report stays in the working
/// directory and the step succeeds.
pub struct SendPayload {
    delivery_url: Option<String>,
    client: Client,
}

impl SendPayload {
    pub fn new(delivery_url: Option<String>, client: Client) -> Self {
        Self {
            delivery_url,
            client,
        }
    }

    async fn execute(&self, context: &ToolContext) -> ToolResult<()> {
        let report_text = read_input(context, REPORT_FILE).await?;

        let Some(url) = self.delivery_url.as_deref() else {
            tracing::info!(
                path = %context.path(REPORT_FILE).display(),
                "No delivery target configured, report kept locally"
            );
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .json(&Delivery {
                report: &report_text,
                sent_at: Utc::now(),
            })
            .send()
            .await
            .map_err(|e| ToolError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ToolError::Upstream(format!(
                "delivery target returned {}",
                response.status()
            )));
        }

        tracing::info!(bytes = report_text.len(), "Report delivered");
        Ok(())
    }
}

#[async_trait]
impl Tool for SendPayload {
    fn name(&self) -> &str {
        "send_payload"
    }

    async fn run(&self, context: &ToolContext) -> StatusCode {
        report(self.name(), self.execute(context).await)
    }
}

/// Verifies the working directory and the data source
pub struct HealthCheck {
    source: DataSource,
}

impl HealthCheck {
    pub fn new(source: DataSource) -> Self {
        Self { source }
    }

    async fn execute(&self, context: &ToolContext) -> ToolResult<()> {
        fs::create_dir_all(context.tmp_dir()).await?;

        let marker = context.path(".health");
        fs::write(&marker, b"ok").await?;
        fs::remove_file(&marker).await?;

        if let DataSource::Path(path) = &self.source {
            if fs::metadata(path).await.is_err() {
                return Err(ToolError::MissingInput(path.display().to_string()));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Tool for HealthCheck {
    fn name(&self) -> &str {
        "health_check"
    }

    async fn run(&self, context: &ToolContext) -> StatusCode {
        report(self.name(), self.execute(context).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: JsonValue) -> Map<String, JsonValue> {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_clean_record() {
        let cleaned = CleanData::clean_record(json!({"name": "  Ada ", "age": 36, "note": null, "blank": " "}))
            .unwrap();
        assert_eq!(JsonValue::Object(cleaned), json!({"name": "Ada", "age": 36}));

        assert!(CleanData::clean_record(json!(42)).is_none());
        assert!(CleanData::clean_record(json!({"only": null})).is_none());
    }

    #[test]
    fn test_expect_records() {
        assert_eq!(expect_records(json!([1, 2])).unwrap().len(), 2);
        assert_eq!(expect_records(json!({"records": [{}]})).unwrap().len(), 1);
        assert!(expect_records(json!("nope")).is_err());
    }

    #[test]
    fn test_analysis() {
        let records = vec![
            record(json!({"name": "a", "score": 2})),
            record(json!({"name": "b", "score": 4})),
            record(json!({"name": "c"})),
        ];
        let analysis = Analysis::of(&records, Utc::now());

        assert_eq!(analysis.record_count, 3);
        assert_eq!(analysis.fields["name"].present, 3);
        assert!(analysis.fields["name"].numeric.is_none());

        let score = analysis.fields["score"].numeric.as_ref().unwrap();
        assert_eq!((score.min, score.max, score.mean), (2.0, 4.0, 3.0));

        let markdown = analysis.to_markdown();
        assert!(markdown.contains("Records: 3"));
        assert!(markdown.contains("| score | 2 | 2 | 4 | 3.00 |"));
    }

    #[test]
    fn test_empty_analysis_markdown() {
        let analysis = Analysis::of(&[], Utc::now());
        let markdown = analysis.to_markdown();
        assert!(markdown.contains("Records: 0"));
        assert!(!markdown.contains("| Field |"));
    }
}
