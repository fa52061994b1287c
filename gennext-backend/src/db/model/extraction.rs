use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use valuable::Valuable;

use crate::{
    db::{
        Tables, error,
        model::{FetchAll, Write, WriteContext, utc_now},
    },
    lifecycle::{QcFlag, SampleStatus},
};

#[derive(Clone, Debug)]
pub struct ExtractionBatch {
    pub id: String,
    pub batch_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A sub-portion of an extracted sample, tracked independently for QC and
/// plating.
#[derive(Clone, Debug)]
pub struct Aliquot {
    pub id: String,
    pub sample_id: String,
    pub extraction_batch_id: String,
    pub label: String,
    /// Set once DNA QC has been evaluated; never before.
    pub qc_flag: Option<QcFlag>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Validate, Valuable, Debug)]
pub struct NewExtraction {
    #[garde(length(min = 1), inner(length(min = 1)))]
    pub sample_ids: Vec<String>,
}

#[derive(Serialize, Valuable, Clone, Debug)]
pub struct AliquotSummary {
    pub id: String,
    pub sample_id: String,
    pub label: String,
    pub qc_flag: Option<QcFlag>,
}

impl From<&Aliquot> for AliquotSummary {
    fn from(aliquot: &Aliquot) -> Self {
        Self {
            id: aliquot.id.clone(),
            sample_id: aliquot.sample_id.clone(),
            label: aliquot.label.clone(),
            qc_flag: aliquot.qc_flag,
        }
    }
}

#[derive(Serialize, Valuable, Debug)]
pub struct ExtractionSummary {
    pub batch_id: String,
    pub aliquots: Vec<AliquotSummary>,
}

impl Write for NewExtraction {
    type Returns = ExtractionSummary;

    fn write(self, db: &mut Tables, _ctx: &WriteContext<'_>) -> error::Result<ExtractionSummary> {
        let unknown: Vec<_> = self
            .sample_ids
            .iter()
            .filter(|id| !db.samples.contains_key(*id))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(error::Error::not_found("sample", unknown.join(", ")));
        }

        // Consent gate over the whole batch. Partial extraction is forbidden,
        // so one unconsented sample rejects everything.
        let missing = db.samples_missing_consent(&self.sample_ids);
        if !missing.is_empty() {
            return Err(error::Error::validation(
                missing
                    .into_iter()
                    .map(|id| format!("sample {id} has no consent record"))
                    .collect(),
            ));
        }

        let batch_id = db.next_extraction_batch_id();
        db.extraction_batches.insert(
            batch_id.clone(),
            ExtractionBatch {
                id: batch_id.clone(),
                batch_date: utc_now(),
                created_at: utc_now(),
            },
        );

        let mut aliquots = Vec::with_capacity(self.sample_ids.len());
        for sample_id in self.sample_ids {
            let sample = db.sample_mut(&sample_id)?;
            sample.status = SampleStatus::Extraction;
            sample.aliquot_seq += 1;
            let seq = sample.aliquot_seq;

            let aliquot = Aliquot {
                id: format!("{sample_id}-A{seq:02}"),
                sample_id,
                extraction_batch_id: batch_id.clone(),
                label: format!("Aliquot {seq}"),
                qc_flag: None,
                created_at: utc_now(),
            };
            aliquots.push(AliquotSummary::from(&aliquot));
            db.aliquots.insert(aliquot.id.clone(), aliquot);
        }

        Ok(ExtractionSummary { batch_id, aliquots })
    }
}

impl FetchAll for AliquotSummary {
    fn fetch_all(db: &Tables) -> Vec<Self> {
        db.aliquots.values().map(Self::from).collect()
    }
}
