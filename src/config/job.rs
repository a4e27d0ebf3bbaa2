use serde::Deserialize;

use crate::pdf::region::Region;

#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub input: String,
    pub output: String,
    pub region: Option<Region>,
    pub min_sku_length: Option<usize>,
    pub output_format: Option<OutputFormat>,
    pub unidentified_name: Option<String>,
    pub write_manifest: Option<bool>,
}

/// 分割結果の書き出し形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `output` をディレクトリとみなし、グループごとに1ファイル書き出す。
    Directory,
    /// `output` をZIPアーカイブのパスとみなし、全グループを1ファイルにまとめる。
    Zip,
}

impl JobFile {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yml::from_str(yaml).map_err(|e| {
            crate::error::SkuSplitError::config(format!("Failed to parse job YAML: {e}"))
        })
    }
}
