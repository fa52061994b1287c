use camino::Utf8PathBuf;
use chrono::Utc;

use crate::{
    config::QcThresholds,
    db::{
        Tables, error,
        model::{
            Write, WriteContext,
            consent::NewConsent,
            extraction::NewExtraction,
            kit::NewKit,
            sample::NewSample,
        },
    },
};

/// A store plus the startup settings a write needs, with shorthand for the
/// early lifecycle steps most tests start from.
pub(crate) struct TestDb {
    tables: Tables,
    thresholds: QcThresholds,
    output_dir: Utf8PathBuf,
}

impl TestDb {
    pub(crate) fn new() -> Self {
        Self {
            tables: Tables::default(),
            thresholds: QcThresholds::default(),
            output_dir: Self::scratch_dir(),
        }
    }

    /// A unique writable directory for exporter output.
    pub(crate) fn scratch_dir() -> Utf8PathBuf {
        let dir = std::env::temp_dir().join(format!("gennext-test-{}", uuid::Uuid::now_v7()));
        Utf8PathBuf::from_path_buf(dir).expect("temp dir should be valid UTF-8")
    }

    pub(crate) fn tables(&self) -> &Tables {
        &self.tables
    }

    pub(crate) fn tables_mut(&mut self) -> &mut Tables {
        &mut self.tables
    }

    pub(crate) fn write<Data: Write>(&mut self, data: Data) -> error::Result<Data::Returns> {
        let ctx = WriteContext {
            thresholds: &self.thresholds,
            prs_output_dir: &self.output_dir,
        };

        data.write(&mut self.tables, &ctx)
    }

    /// Allocate a kit and return its QR code.
    pub(crate) fn seed_kit(&mut self) -> String {
        self.write(NewKit { clinic_id: None })
            .expect("kit allocation should not fail")
            .qr_code
    }

    /// Register a sample (consented or not) and return its id.
    pub(crate) fn seed_sample(&mut self, with_consent: bool) -> String {
        let kit_qr = self.seed_kit();
        let sample = self
            .write(NewSample {
                kit_qr,
                sample_type: "EDTA blood".to_string(),
                subject_pseudoid: format!("SUBJ-{:03}", self.tables.samples.len() + 1),
                collection_datetime: Utc::now(),
            })
            .expect("sample registration should not fail");

        if with_consent {
            self.write(NewConsent {
                sample_id: sample.id.clone(),
                consent_type: "General".to_string(),
                consent_date: Utc::now(),
            })
            .expect("consent recording should not fail");
        }

        sample.id
    }

    /// A consented sample with one extracted aliquot; returns (sample id,
    /// aliquot id).
    pub(crate) fn seed_extracted(&mut self) -> (String, String) {
        let sample_id = self.seed_sample(true);
        let summary = self
            .write(NewExtraction {
                sample_ids: vec![sample_id.clone()],
            })
            .expect("extraction should not fail");

        (sample_id, summary.aliquots[0].id.clone())
    }
}
