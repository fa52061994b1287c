use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use valuable::Valuable;

use crate::{
    db::{
        Tables, error,
        model::{Write, WriteContext, utc_now},
    },
    lifecycle::SampleStatus,
};

/// A consent record is a binary gate: its presence is what the extraction and
/// plating paths check. At most one per sample.
#[derive(Serialize, Clone, Debug)]
pub struct Consent {
    pub id: String,
    pub sample_id: String,
    pub consent_type: String,
    pub consent_date: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Validate, Valuable, Debug)]
pub struct NewConsent {
    #[garde(length(min = 1))]
    pub sample_id: String,
    #[garde(length(min = 1))]
    #[serde(default = "default_consent_type")]
    pub consent_type: String,
    #[garde(skip)]
    #[valuable(skip)]
    #[serde(default = "utc_now")]
    pub consent_date: DateTime<Utc>,
}

fn default_consent_type() -> String {
    "General".to_string()
}

impl Write for NewConsent {
    type Returns = Consent;

    fn write(self, db: &mut Tables, _ctx: &WriteContext<'_>) -> error::Result<Consent> {
        db.sample(&self.sample_id)?;

        if db.has_consent(&self.sample_id) {
            return Err(error::Error::DuplicateRecord {
                entity: "consent",
                field: "sample_id",
                value: self.sample_id,
            });
        }

        let id = db.next_consent_id();
        let consent = Consent {
            id: id.clone(),
            sample_id: self.sample_id,
            consent_type: self.consent_type,
            consent_date: self.consent_date,
            created_at: utc_now(),
        };

        db.sample_mut(&consent.sample_id)?.status = SampleStatus::Accessioned;
        db.consents.insert(id, consent.clone());

        Ok(consent)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::db::test_util::TestDb;

    fn new_consent(sample_id: &str) -> NewConsent {
        NewConsent {
            sample_id: sample_id.to_string(),
            consent_type: "General".to_string(),
            consent_date: utc_now(),
        }
    }

    #[test]
    fn consent_accessions_the_sample() {
        let mut db = TestDb::new();
        let sample_id = db.seed_sample(false);

        let consent = db.write(new_consent(&sample_id)).unwrap();

        assert_eq!(consent.id, "CONS-0001");
        assert_eq!(consent.sample_id, sample_id);
        assert_eq!(
            db.tables().samples[&sample_id].status,
            SampleStatus::Accessioned
        );
    }

    #[test]
    fn unknown_sample_is_rejected() {
        let mut db = TestDb::new();

        let err = db.write(new_consent("SAMP-00042")).unwrap_err();

        assert!(matches!(
            err,
            error::Error::RecordNotFound {
                entity: "sample",
                ..
            }
        ));
        assert!(db.tables().consents.is_empty());
    }

    #[test]
    fn second_consent_for_a_sample_conflicts() {
        let mut db = TestDb::new();
        let sample_id = db.seed_sample(true);

        let err = db.write(new_consent(&sample_id)).unwrap_err();

        assert!(matches!(err, error::Error::DuplicateRecord { .. }));
        assert_eq!(db.tables().consents.len(), 1);
    }
}
