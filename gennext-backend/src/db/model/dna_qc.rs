use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use valuable::Valuable;

use crate::{
    db::{
        Tables, error,
        model::{Write, WriteContext, utc_now},
    },
    lifecycle::{QcFlag, SampleStatus, dna_qc_flag},
};

/// A spectrophotometry measurement for one aliquot. The flag is derived from
/// the measurements at ingest time and is never directly settable.
#[derive(Clone, Debug)]
pub struct DnaQc {
    pub id: String,
    pub aliquot_id: String,
    pub concentration: f64,
    pub a260_280: f64,
    pub a260_230: f64,
    pub qc_flag: QcFlag,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Validate, Valuable, Debug)]
pub struct DnaQcMeasurement {
    #[garde(length(min = 1))]
    pub aliquot_id: String,
    #[garde(skip)]
    pub concentration: f64,
    #[garde(skip)]
    pub a260_280: f64,
    #[garde(skip)]
    pub a260_230: f64,
}

#[derive(Serialize, Valuable, Clone, Debug)]
pub struct DnaQcResult {
    pub aliquot_id: String,
    pub qc_flag: QcFlag,
}

impl Write for Vec<DnaQcMeasurement> {
    type Returns = Vec<DnaQcResult>;

    fn write(self, db: &mut Tables, ctx: &WriteContext<'_>) -> error::Result<Vec<DnaQcResult>> {
        let unknown: Vec<_> = self
            .iter()
            .map(|m| &m.aliquot_id)
            .filter(|id| !db.aliquots.contains_key(*id))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(error::Error::not_found("aliquot", unknown.join(", ")));
        }

        let mut results = Vec::with_capacity(self.len());
        for measurement in self {
            let qc_flag = dna_qc_flag(
                ctx.thresholds,
                measurement.concentration,
                measurement.a260_280,
                measurement.a260_230,
            );

            let id = db.next_dna_qc_id();
            db.dna_qc.insert(
                id.clone(),
                DnaQc {
                    id,
                    aliquot_id: measurement.aliquot_id.clone(),
                    concentration: measurement.concentration,
                    a260_280: measurement.a260_280,
                    a260_230: measurement.a260_230,
                    qc_flag,
                    created_at: utc_now(),
                },
            );

            let sample_id = {
                let aliquot = db
                    .aliquots
                    .get_mut(&measurement.aliquot_id)
                    .ok_or_else(|| error::Error::not_found("aliquot", &*measurement.aliquot_id))?;
                aliquot.qc_flag = Some(qc_flag);
                aliquot.sample_id.clone()
            };
            db.sample_mut(&sample_id)?.status = SampleStatus::after_dna_qc(qc_flag);

            results.push(DnaQcResult {
                aliquot_id: measurement.aliquot_id,
                qc_flag,
            });
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::db::test_util::TestDb;

    fn measurement(aliquot_id: &str, concentration: f64) -> DnaQcMeasurement {
        DnaQcMeasurement {
            aliquot_id: aliquot_id.to_string(),
            concentration,
            a260_280: 1.85,
            a260_230: 2.0,
        }
    }

    #[test]
    fn passing_measurement_moves_sample_to_dna_ready() {
        let mut db = TestDb::new();
        let (sample_id, aliquot_id) = db.seed_extracted();

        let results = db.write(vec![measurement(&aliquot_id, 35.0)]).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].qc_flag, QcFlag::Pass);
        assert_eq!(
            db.tables().aliquots[&aliquot_id].qc_flag,
            Some(QcFlag::Pass)
        );
        assert_eq!(db.tables().samples[&sample_id].status, SampleStatus::DnaReady);
        assert_eq!(db.tables().dna_qc.len(), 1);
    }

    #[test]
    fn warn_still_counts_as_dna_ready_but_fail_holds() {
        let mut db = TestDb::new();
        let (warn_sample, warn_aliquot) = db.seed_extracted();
        let (fail_sample, fail_aliquot) = db.seed_extracted();

        let results = db
            .write(vec![
                measurement(&warn_aliquot, 15.0),
                measurement(&fail_aliquot, 5.0),
            ])
            .unwrap();

        assert_eq!(results[0].qc_flag, QcFlag::Warn);
        assert_eq!(results[1].qc_flag, QcFlag::Fail);
        assert_eq!(db.tables().samples[&warn_sample].status, SampleStatus::DnaReady);
        assert_eq!(
            db.tables().samples[&fail_sample].status,
            SampleStatus::HoldForQa
        );
    }

    #[test]
    fn unknown_aliquot_rejects_the_batch_without_records() {
        let mut db = TestDb::new();
        let (_, aliquot_id) = db.seed_extracted();

        let err = db
            .write(vec![
                measurement(&aliquot_id, 35.0),
                measurement("SAMP-00099-A01", 35.0),
            ])
            .unwrap_err();

        assert!(matches!(
            err,
            error::Error::RecordNotFound {
                entity: "aliquot",
                ..
            }
        ));
        assert!(db.tables().dna_qc.is_empty());
        assert_eq!(db.tables().aliquots[&aliquot_id].qc_flag, None);
    }
}
