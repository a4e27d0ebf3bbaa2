use std::path::{Path, PathBuf};
use std::process::ExitCode;

use sku_splitter::config::job::JobFile;
use sku_splitter::config::merged::MergedConfig;
use sku_splitter::config::{self};
use sku_splitter::pipeline::job_runner::JobConfig;
use sku_splitter::pipeline::orchestrator::{any_failed, run_all_jobs};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("Usage: sku_splitter <jobs.yaml>...");
        eprintln!("  Split shipping-label PDFs into one PDF per SKU.");
        eprintln!("  Set RUST_LOG=info for progress output.");
        return if args.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("sku_splitter {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    init_logging();

    let mut job_configs: Vec<JobConfig> = Vec::new();

    for job_file_arg in &args {
        let job_file_path = Path::new(job_file_arg);

        // Load settings from the same directory as the job file.
        let settings = match config::load_settings_for_job(job_file_path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("ERROR: Failed to load settings for {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        let yaml_content = match std::fs::read_to_string(job_file_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("ERROR: Failed to read job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        let job_file = match JobFile::from_yaml(&yaml_content) {
            Ok(jf) => jf,
            Err(e) => {
                eprintln!("ERROR: Failed to parse job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        // Resolve job file directory for relative paths.
        let job_dir = job_file_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        for job in &job_file.jobs {
            let merged = MergedConfig::new(&settings, job);
            if let Err(e) = merged.validate() {
                eprintln!("ERROR: Invalid job for {}: {e}", job.input);
                return ExitCode::FAILURE;
            }

            job_configs.push(JobConfig::from_merged(
                resolve_path(&job_dir, &job.input),
                resolve_path(&job_dir, &job.output),
                &merged,
            ));
        }
    }

    let results = run_all_jobs(&job_configs);

    for (config, result) in job_configs.iter().zip(&results) {
        match result {
            Ok(job_result) => {
                eprintln!(
                    "OK: {} -> {} ({} groups, {} pages)",
                    job_result.input_path.display(),
                    job_result.output_path.display(),
                    job_result.documents_written,
                    job_result.page_count
                );
                for failure in &job_result.failures {
                    eprintln!(
                        "ERROR: {}: group {} (pages {:?}) failed: {}",
                        job_result.input_path.display(),
                        failure.key,
                        failure.pages,
                        failure.error
                    );
                }
            }
            Err(e) => {
                eprintln!(
                    "ERROR: {} -> {}: {e}",
                    config.input_path.display(),
                    config.output_path.display()
                );
            }
        }
    }

    if any_failed(&results) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default: warn).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve a potentially relative path against a base directory.
/// If the path is already absolute, return it as-is.
fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}
