// Phase 7: ジョブ単位: PDF読込 -> SKU分類 -> グループ毎のPDF組立 -> 出力

use std::path::PathBuf;

use rayon::prelude::*;

use crate::config::job::OutputFormat;
use crate::config::merged::MergedConfig;
use crate::error::SkuSplitError;
use crate::output::OutputDocument;
use crate::output::manifest::Manifest;
use crate::output::packager::{assign_file_names, package};
use crate::pdf::reader::PdfReader;
use crate::pdf::region::Region;
use crate::pdf::writer::{AssembledPdf, assemble};
use crate::sku::GroupKey;
use crate::sku::classifier::SkuClassifier;
use crate::sku::grouping::{PageGroups, group_document};

/// Configuration for a single job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub region: Region,
    pub min_sku_length: usize,
    pub output_format: OutputFormat,
    pub unidentified_name: String,
    /// 0 = rayon default pool.
    pub parallel_workers: usize,
    pub write_manifest: bool,
}

impl JobConfig {
    pub fn from_merged(input_path: PathBuf, output_path: PathBuf, merged: &MergedConfig) -> Self {
        JobConfig {
            input_path,
            output_path,
            region: merged.region,
            min_sku_length: merged.min_sku_length,
            output_format: merged.output_format,
            unidentified_name: merged.unidentified_name.clone(),
            parallel_workers: merged.parallel_workers,
            write_manifest: merged.write_manifest,
        }
    }
}

/// A group whose document could not be assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupFailure {
    pub key: GroupKey,
    pub pages: Vec<u32>,
    pub error: String,
}

/// In-memory result of splitting one document.
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub page_count: u32,
    pub groups: PageGroups,
    /// Assembled documents in group order.
    pub documents: Vec<OutputDocument>,
    pub failures: Vec<GroupFailure>,
}

/// Result of processing a single job.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub page_count: u32,
    pub documents_written: usize,
    pub written_paths: Vec<PathBuf>,
    pub failures: Vec<GroupFailure>,
}

impl JobResult {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Classify every page, group by SKU and assemble one document per group.
///
/// Classification runs strictly in page order. Assembly runs in parallel
/// per group; a failing group is recorded and the others still complete.
pub fn split_document(reader: &PdfReader, config: &JobConfig) -> crate::error::Result<SplitOutcome> {
    let page_count = reader.page_count();
    let classifier = SkuClassifier::new(config.min_sku_length);
    let groups = group_document(reader, &config.region, &classifier);

    tracing::info!(
        pages = page_count,
        skus = groups.sku_count(),
        unidentified = groups.unidentified().len(),
        "pages grouped"
    );

    let keyed: Vec<(GroupKey, &[u32])> = groups.iter().collect();
    let file_names = assign_file_names(keyed.iter().map(|(key, _)| key), &config.unidentified_name);

    let doc = reader.document();
    let assemble_all = || -> Vec<crate::error::Result<Vec<u8>>> {
        keyed
            .par_iter()
            .map(|(_, pages)| assemble(doc, pages).and_then(AssembledPdf::into_bytes))
            .collect()
    };
    let assembled = if config.parallel_workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_workers)
            .build()
            .map_err(|e| SkuSplitError::config(format!("failed to build thread pool: {e}")))?
            .install(assemble_all)
    } else {
        assemble_all()
    };

    let (documents, failures) = collect_group_results(keyed, file_names, assembled);

    Ok(SplitOutcome {
        page_count,
        groups,
        documents,
        failures,
    })
}

/// Pairs each group with its assembly result, in group order.
///
/// Successful groups become output documents; failed ones are logged and
/// kept as [`GroupFailure`]s so the remaining groups can still be written.
pub fn collect_group_results(
    keyed: Vec<(GroupKey, &[u32])>,
    file_names: Vec<String>,
    assembled: Vec<crate::error::Result<Vec<u8>>>,
) -> (Vec<OutputDocument>, Vec<GroupFailure>) {
    let mut documents = Vec::with_capacity(keyed.len());
    let mut failures = Vec::new();
    for (((key, pages), file_name), result) in keyed.into_iter().zip(file_names).zip(assembled) {
        match result {
            Ok(bytes) => {
                tracing::info!(group = %key, pages = pages.len(), file = %file_name, "group assembled");
                documents.push(OutputDocument {
                    key,
                    file_name,
                    pages: pages.to_vec(),
                    bytes,
                });
            }
            Err(e) => {
                tracing::warn!(group = %key, error = %e, "group assembly failed");
                failures.push(GroupFailure {
                    key,
                    pages: pages.to_vec(),
                    error: e.to_string(),
                });
            }
        }
    }
    (documents, failures)
}

/// Run a single split job: open, split, then write the outputs.
///
/// An unreadable source fails the whole job before anything is written.
pub fn run_job(config: &JobConfig) -> crate::error::Result<JobResult> {
    tracing::info!(input = %config.input_path.display(), "job started");
    let reader = PdfReader::open(&config.input_path)?;
    let outcome = split_document(&reader, config)?;

    write_outcome(config, outcome)
}

/// Writes the documents of a split (and the manifest, when enabled) and
/// summarizes the job. Failed groups are listed in the manifest and carried
/// into the [`JobResult`].
pub fn write_outcome(config: &JobConfig, outcome: SplitOutcome) -> crate::error::Result<JobResult> {
    let manifest = config.write_manifest.then(|| {
        let mut manifest = Manifest::new(
            config.input_path.display().to_string(),
            outcome.page_count,
        );
        for doc in &outcome.documents {
            manifest.record_document(doc);
        }
        for failure in &outcome.failures {
            manifest.record_failure(&failure.key, &failure.pages, &failure.error);
        }
        manifest
    });

    let written_paths = package(
        config.output_format,
        &config.output_path,
        &outcome.documents,
        manifest.as_ref(),
    )?;

    Ok(JobResult {
        input_path: config.input_path.clone(),
        output_path: config.output_path.clone(),
        page_count: outcome.page_count,
        documents_written: outcome.documents.len(),
        written_paths,
        failures: outcome.failures,
    })
}
