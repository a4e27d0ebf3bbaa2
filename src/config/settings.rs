use std::path::Path;

use serde::Deserialize;

use super::job::OutputFormat;
use crate::pdf::region::Region;
use crate::sku::classifier::DEFAULT_MIN_SKU_LENGTH;

/// File stem used for the bucket of pages that never saw a SKU.
pub const DEFAULT_UNIDENTIFIED_NAME: &str = "unidentified_pages";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub region: Region,
    pub min_sku_length: usize,
    pub output_format: OutputFormat,
    pub unidentified_name: String,
    pub parallel_workers: usize,
    pub write_manifest: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            region: Region::default(),
            min_sku_length: DEFAULT_MIN_SKU_LENGTH,
            output_format: OutputFormat::Directory,
            unidentified_name: DEFAULT_UNIDENTIFIED_NAME.to_string(),
            parallel_workers: 0,
            write_manifest: true,
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yml::from_str(yaml).map_err(|e| {
            crate::error::SkuSplitError::config(format!("Failed to parse settings YAML: {e}"))
        })
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}
