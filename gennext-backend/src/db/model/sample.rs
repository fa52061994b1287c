use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use valuable::Valuable;

use crate::{
    db::{
        Tables, error,
        model::{FetchAll, Write, WriteContext, utc_now},
    },
    lifecycle::SampleStatus,
};

#[derive(Clone, Debug)]
pub struct Sample {
    pub id: String,
    pub kit_qr: String,
    pub sample_type: String,
    /// Pseudonymous subject reference. Direct identity never enters the
    /// system.
    pub subject_pseudoid: String,
    pub collection_datetime: DateTime<Utc>,
    pub status: SampleStatus,
    /// Per-sample aliquot counter; drives the 1-based `-Ann` suffix.
    pub aliquot_seq: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Validate, Valuable, Debug)]
pub struct NewSample {
    #[garde(length(min = 1))]
    pub kit_qr: String,
    #[garde(length(min = 1))]
    pub sample_type: String,
    #[garde(length(min = 1))]
    pub subject_pseudoid: String,
    #[garde(skip)]
    #[valuable(skip)]
    pub collection_datetime: DateTime<Utc>,
}

#[derive(Serialize, Valuable, Clone, Debug)]
pub struct SampleSummary {
    pub id: String,
    pub kit_qr: String,
    pub sample_type: String,
    pub subject_pseudoid: String,
    #[valuable(skip)]
    pub collection_datetime: DateTime<Utc>,
    pub status: SampleStatus,
    pub has_consent: bool,
}

impl SampleSummary {
    pub(in crate::db) fn new(sample: &Sample, db: &Tables) -> Self {
        Self {
            id: sample.id.clone(),
            kit_qr: sample.kit_qr.clone(),
            sample_type: sample.sample_type.clone(),
            subject_pseudoid: sample.subject_pseudoid.clone(),
            collection_datetime: sample.collection_datetime,
            status: sample.status,
            has_consent: db.has_consent(&sample.id),
        }
    }
}

impl Write for NewSample {
    type Returns = SampleSummary;

    fn write(self, db: &mut Tables, _ctx: &WriteContext<'_>) -> error::Result<SampleSummary> {
        if db.kit_by_qr(&self.kit_qr).is_none() {
            return Err(error::Error::not_found("kit", self.kit_qr));
        }

        let id = db.next_sample_id();
        let sample = Sample {
            id: id.clone(),
            kit_qr: self.kit_qr,
            sample_type: self.sample_type,
            subject_pseudoid: self.subject_pseudoid,
            collection_datetime: self.collection_datetime,
            status: SampleStatus::Received,
            aliquot_seq: 0,
            created_at: utc_now(),
        };

        let summary = SampleSummary::new(&sample, db);
        db.samples.insert(id, sample);

        Ok(summary)
    }
}

impl FetchAll for SampleSummary {
    fn fetch_all(db: &Tables) -> Vec<Self> {
        db.samples.values().map(|s| Self::new(s, db)).collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::db::{model::consent::NewConsent, test_util::TestDb};

    #[test]
    fn registration_requires_a_resolvable_kit() {
        let mut db = TestDb::new();

        let err = db
            .write(NewSample {
                kit_qr: "QR-9999".to_string(),
                sample_type: "EDTA blood".to_string(),
                subject_pseudoid: "SUBJ-001".to_string(),
                collection_datetime: utc_now(),
            })
            .unwrap_err();

        assert!(matches!(
            err,
            error::Error::RecordNotFound { entity: "kit", .. }
        ));
        assert!(db.tables().samples.is_empty());
    }

    #[test]
    fn new_sample_starts_received_without_consent() {
        let mut db = TestDb::new();
        let qr = db.seed_kit();

        let sample = db
            .write(NewSample {
                kit_qr: qr,
                sample_type: "EDTA blood".to_string(),
                subject_pseudoid: "SUBJ-001".to_string(),
                collection_datetime: utc_now(),
            })
            .unwrap();

        assert_eq!(sample.id, "SAMP-00001");
        assert_eq!(sample.status, SampleStatus::Received);
        assert!(!sample.has_consent);
    }

    #[test]
    fn consent_flips_summary_and_status() {
        let mut db = TestDb::new();
        let sample_id = db.seed_sample(false);

        db.write(NewConsent {
            sample_id: sample_id.clone(),
            consent_type: "General".to_string(),
            consent_date: utc_now(),
        })
        .unwrap();

        let summaries = SampleSummary::fetch_all(db.tables());
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].has_consent);
        assert_eq!(summaries[0].status, SampleStatus::Accessioned);
        assert_eq!(summaries[0].id, sample_id);
    }
}
