// Phase 7: 全ジョブ実行

use crate::pipeline::job_runner::{JobConfig, JobResult, run_job};

/// Run multiple jobs, collecting results.
/// One job failure does NOT prevent other jobs from running.
pub fn run_all_jobs(jobs: &[JobConfig]) -> Vec<crate::error::Result<JobResult>> {
    jobs.iter().map(run_job).collect()
}

/// True when any job failed outright or wrote only part of its groups.
pub fn any_failed(results: &[crate::error::Result<JobResult>]) -> bool {
    results
        .iter()
        .any(|r| r.as_ref().map_or(true, JobResult::has_failures))
}
