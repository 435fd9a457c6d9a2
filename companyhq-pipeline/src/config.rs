/// Pipeline configuration
///
/// # Environment Variables
///
/// - `PIPELINE_TMP_DIR`: working directory for intermediate files (default: `.tmp`)
/// - `DATA_SOURCE_PATH`: local file to ingest
/// - `DATA_SOURCE_URL`: URL to ingest when no path is set
/// - `DELIVERY_URL`: where `send_payload` posts the report (optional)

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Default working directory
pub const DEFAULT_TMP_DIR: &str = ".tmp";

/// Where ingested data comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "location")]
pub enum DataSource {
    Path(PathBuf),
    Url(String),
    None,
}

impl DataSource {
    /// `path`, `url` or `none`
    pub fn kind(&self) -> &'static str {
        match self {
            DataSource::Path(_) => "path",
            DataSource::Url(_) => "url",
            DataSource::None => "none",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub tmp_dir: PathBuf,
    pub data_source: DataSource,
    pub delivery_url: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tmp_dir: PathBuf::from(DEFAULT_TMP_DIR),
            data_source: DataSource::None,
            delivery_url: None,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl PipelineConfig {
    /// Reads the pipeline settings from the environment
    ///
    /// A path source wins over a URL source when both are set.
    pub fn from_env() -> anyhow::Result<Self> {
        let tmp_dir = non_empty_var("PIPELINE_TMP_DIR").unwrap_or_else(|| DEFAULT_TMP_DIR.to_string());

        let data_source = match (non_empty_var("DATA_SOURCE_PATH"), non_empty_var("DATA_SOURCE_URL")) {
            (Some(path), _) => DataSource::Path(PathBuf::from(path)),
            (None, Some(url)) => {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    anyhow::bail!("DATA_SOURCE_URL must be an http(s) URL");
                }
                DataSource::Url(url)
            }
            (None, None) => DataSource::None,
        };

        Ok(Self {
            tmp_dir: PathBuf::from(tmp_dir),
            data_source,
            delivery_url: non_empty_var("DELIVERY_URL"),
        })
    }

    /// Same configuration rooted at another working directory
    pub fn with_tmp_dir(mut self, tmp_dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = tmp_dir.into();
        self
    }

    pub fn with_data_source(mut self, data_source: DataSource) -> Self {
        self.data_source = data_source;
        self
    }
}
