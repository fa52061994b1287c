use chrono::{DateTime, Utc};
use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use valuable::Valuable;

use crate::{
    db::{
        Tables, error,
        model::{FetchAll, Write, WriteContext, utc_now},
    },
    lifecycle::{QcFlag, SampleStatus, genotype_qc_flag},
};

#[derive(Serialize, Deserialize, Valuable, Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum RunStatus {
    Created,
    Completed,
}

#[derive(Clone, Debug)]
pub struct Run {
    pub id: String,
    pub run_name: String,
    pub run_date: DateTime<Utc>,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct BeadChip {
    pub id: String,
    pub run_id: String,
    pub barcode: String,
    pub created_at: DateTime<Utc>,
}

/// One genotyping-instrument metrics record per (run, sample) upload.
#[derive(Clone, Debug)]
pub struct GenotypeMetrics {
    pub id: u64,
    pub run_id: String,
    pub sample_id: String,
    pub call_rate: f64,
    pub dish_qc: f64,
    pub heterozygosity: Option<f64>,
    pub sex_call: Option<String>,
    pub sex_concordance: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Validate, Valuable, Debug)]
pub struct NewRun {
    #[garde(length(min = 1))]
    pub run_name: String,
    #[garde(skip)]
    #[valuable(skip)]
    #[serde(default = "utc_now")]
    pub run_date: DateTime<Utc>,
    #[garde(inner(length(min = 1)))]
    pub beadchip_barcodes: Vec<String>,
}

#[derive(Serialize, Valuable, Clone, Debug)]
pub struct RunSummary {
    pub id: String,
    pub run_name: String,
    #[valuable(skip)]
    pub run_date: DateTime<Utc>,
    pub status: RunStatus,
    pub beadchip_count: usize,
}

impl Write for NewRun {
    type Returns = RunSummary;

    fn write(self, db: &mut Tables, _ctx: &WriteContext<'_>) -> error::Result<RunSummary> {
        // Beadchip barcodes are globally unique, checked against existing
        // chips and within this request.
        let mut duplicates: Vec<_> = self
            .beadchip_barcodes
            .iter()
            .filter(|b| db.beadchips.values().any(|chip| chip.barcode == **b))
            .cloned()
            .collect();
        duplicates.extend(self.beadchip_barcodes.iter().duplicates().cloned());

        if !duplicates.is_empty() {
            return Err(error::Error::DuplicateRecord {
                entity: "beadchip",
                field: "barcode",
                value: duplicates.into_iter().unique().join(", "),
            });
        }

        let run_id = db.next_run_id();
        db.runs.insert(
            run_id.clone(),
            Run {
                id: run_id.clone(),
                run_name: self.run_name.clone(),
                run_date: self.run_date,
                status: RunStatus::Created,
                created_at: utc_now(),
            },
        );

        let beadchip_count = self.beadchip_barcodes.len();
        for barcode in self.beadchip_barcodes {
            let id = db.next_beadchip_id();
            db.beadchips.insert(
                id.clone(),
                BeadChip {
                    id,
                    run_id: run_id.clone(),
                    barcode,
                    created_at: utc_now(),
                },
            );
        }

        Ok(RunSummary {
            id: run_id,
            run_name: self.run_name,
            run_date: self.run_date,
            status: RunStatus::Created,
            beadchip_count,
        })
    }
}

impl FetchAll for RunSummary {
    fn fetch_all(db: &Tables) -> Vec<Self> {
        db.runs
            .values()
            .map(|r| Self {
                id: r.id.clone(),
                run_name: r.run_name.clone(),
                run_date: r.run_date,
                status: r.status,
                beadchip_count: db.beadchips.values().filter(|c| c.run_id == r.id).count(),
            })
            .collect()
    }
}

#[derive(Deserialize, Validate, Valuable, Debug)]
pub struct MetricsEntry {
    #[garde(length(min = 1))]
    pub sample_id: String,
    #[garde(skip)]
    pub call_rate: f64,
    #[garde(skip)]
    pub dish_qc: f64,
    #[garde(skip)]
    pub heterozygosity: Option<f64>,
    #[garde(skip)]
    pub sex_call: Option<String>,
    #[garde(skip)]
    pub sex_concordance: Option<String>,
}

/// A metrics batch for one run, assembled by the transport layer from the
/// path and body.
#[derive(Debug)]
pub struct MetricsUpload {
    pub run_id: String,
    pub entries: Vec<MetricsEntry>,
}

#[derive(Serialize, Valuable, Clone, Debug)]
pub struct MetricsQcResult {
    pub sample_id: String,
    pub qc_flag: QcFlag,
    pub call_rate: f64,
    pub dish_qc: f64,
}

#[derive(Serialize, Valuable, Debug)]
pub struct MetricsReport {
    pub run_id: String,
    pub metrics_processed: usize,
    pub qc_results: Vec<MetricsQcResult>,
}

impl Write for MetricsUpload {
    type Returns = MetricsReport;

    fn write(self, db: &mut Tables, ctx: &WriteContext<'_>) -> error::Result<MetricsReport> {
        db.run(&self.run_id)?;

        let unknown: Vec<_> = self
            .entries
            .iter()
            .map(|e| &e.sample_id)
            .filter(|id| !db.samples.contains_key(*id))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(error::Error::not_found("sample", unknown.join(", ")));
        }

        let mut qc_results = Vec::with_capacity(self.entries.len());
        for entry in self.entries {
            let qc_flag = genotype_qc_flag(ctx.thresholds, entry.call_rate, entry.dish_qc);

            let id = db.next_metrics_seq();
            db.genotype_metrics.insert(
                id,
                GenotypeMetrics {
                    id,
                    run_id: self.run_id.clone(),
                    sample_id: entry.sample_id.clone(),
                    call_rate: entry.call_rate,
                    dish_qc: entry.dish_qc,
                    heterozygosity: entry.heterozygosity,
                    sex_call: entry.sex_call,
                    sex_concordance: entry.sex_concordance,
                    created_at: utc_now(),
                },
            );

            db.sample_mut(&entry.sample_id)?.status = SampleStatus::after_genotyping(qc_flag);

            qc_results.push(MetricsQcResult {
                sample_id: entry.sample_id,
                qc_flag,
                call_rate: entry.call_rate,
                dish_qc: entry.dish_qc,
            });
        }

        // The run completes even when individual samples failed QC; those
        // samples are held instead.
        db.run_mut(&self.run_id)?.status = RunStatus::Completed;

        Ok(MetricsReport {
            run_id: self.run_id,
            metrics_processed: qc_results.len(),
            qc_results,
        })
    }
}
