use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use valuable::Valuable;

use crate::{
    db::{
        Tables, error,
        model::{FetchAll, Write, WriteContext, utc_now},
    },
    export::{self, PrsPackage, PrsSampleRow},
    lifecycle::genotype_qc_flag,
};

#[derive(Serialize, Deserialize, Valuable, Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum PrsJobStatus {
    Processing,
    Completed,
}

#[derive(Serialize, Valuable, Clone, Debug)]
pub struct PrsJob {
    pub id: String,
    pub run_id: String,
    pub job_name: String,
    pub status: PrsJobStatus,
    #[valuable(skip)]
    pub output_path: Option<Utf8PathBuf>,
    #[serde(skip_serializing)]
    #[valuable(skip)]
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Validate, Valuable, Debug)]
pub struct NewPrsJob {
    #[garde(length(min = 1))]
    pub job_name: String,
}

/// A PRS package request for one run, assembled by the transport layer from
/// the path and body.
#[derive(Debug)]
pub struct PrsPackageRequest {
    pub run_id: String,
    pub job: NewPrsJob,
}

impl Write for PrsPackageRequest {
    type Returns = PrsJob;

    fn write(self, db: &mut Tables, ctx: &WriteContext<'_>) -> error::Result<PrsJob> {
        db.run(&self.run_id)?;

        // Eligibility re-derives the flag from the raw measurements with the
        // same banding function the ingest path uses; the stored sample
        // status is not consulted.
        let total_samples = db.metrics_of_run(&self.run_id).count();
        let eligible: Vec<(&_, _)> = db
            .metrics_of_run(&self.run_id)
            .map(|m| {
                (
                    m,
                    genotype_qc_flag(ctx.thresholds, m.call_rate, m.dish_qc),
                )
            })
            .filter(|(_, flag)| flag.is_eligible())
            .collect();

        if eligible.is_empty() {
            return Err(error::Error::validation(vec![
                "no Pass/Warn samples available for PRS".to_string(),
            ]));
        }

        let rows: Vec<PrsSampleRow> = eligible
            .into_iter()
            .map(|(metrics, flag)| {
                let sample = db.sample(&metrics.sample_id)?;
                Ok(PrsSampleRow {
                    sample_id: sample.id.clone(),
                    subject_pseudoid: sample.subject_pseudoid.clone(),
                    status: sample.status,
                    call_rate: metrics.call_rate,
                    dish_qc: metrics.dish_qc,
                    heterozygosity: metrics.heterozygosity,
                    sex_call: metrics.sex_call.clone(),
                    final_qc_flag: flag,
                })
            })
            .collect::<error::Result<_>>()?;

        let job_id = db.next_prs_job_id();
        let package = PrsPackage {
            job_id: job_id.clone(),
            run_id: self.run_id.clone(),
            created_at: utc_now(),
            total_samples,
            rows,
        };

        // Artifacts are written before the job record is committed, so a
        // filesystem failure leaves no half-created job behind.
        let output_path = export::write_prs_package(ctx.prs_output_dir, &package)?;

        let job = PrsJob {
            id: job_id.clone(),
            run_id: self.run_id,
            job_name: self.job.job_name,
            status: PrsJobStatus::Completed,
            output_path: Some(output_path),
            created_at: utc_now(),
        };
        db.prs_jobs.insert(job_id, job.clone());

        Ok(job)
    }
}

impl FetchAll for PrsJob {
    fn fetch_all(db: &Tables) -> Vec<Self> {
        db.prs_jobs.values().cloned().collect()
    }
}
