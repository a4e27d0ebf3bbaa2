use super::job::{Job, OutputFormat};
use super::settings::Settings;
use crate::error::SkuSplitError;
use crate::pdf::region::Region;

#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub region: Region,
    pub min_sku_length: usize,
    pub output_format: OutputFormat,
    pub unidentified_name: String,
    pub parallel_workers: usize,
    pub write_manifest: bool,
}

impl MergedConfig {
    /// JobのOption値がSomeならJobの値を、NoneならSettingsの値を使用する。
    pub fn new(settings: &Settings, job: &Job) -> Self {
        MergedConfig {
            region: job.region.unwrap_or(settings.region),
            min_sku_length: job.min_sku_length.unwrap_or(settings.min_sku_length),
            output_format: job.output_format.unwrap_or(settings.output_format),
            unidentified_name: job
                .unidentified_name
                .clone()
                .unwrap_or_else(|| settings.unidentified_name.clone()),
            parallel_workers: settings.parallel_workers,
            write_manifest: job.write_manifest.unwrap_or(settings.write_manifest),
        }
    }

    /// マージ後の値が実行可能な組み合わせか検証する。
    pub fn validate(&self) -> crate::error::Result<()> {
        self.region.validate()?;
        if self.min_sku_length == 0 {
            return Err(SkuSplitError::config("min_sku_length must be >= 1"));
        }
        if self.unidentified_name.trim().is_empty() {
            return Err(SkuSplitError::config("unidentified_name cannot be empty"));
        }
        Ok(())
    }
}
