use camino::Utf8Path;
use chrono::{DateTime, Utc};

use crate::{
    config::QcThresholds,
    db::{Tables, error},
};

pub mod consent;
pub mod dna_qc;
pub mod extraction;
pub mod kit;
pub mod plate;
pub mod prs;
pub mod run;
pub mod sample;

/// Startup-time settings a write may need. Thresholds are injected here so
/// rule evaluation never reads the ambient environment.
pub struct WriteContext<'a> {
    pub thresholds: &'a QcThresholds,
    pub prs_output_dir: &'a Utf8Path,
}

/// One atomic lifecycle operation. Implementations must validate the entire
/// request before the first mutation of `db` - the store has no rollback, so
/// "validate-then-commit" is the contract, not an optimization.
pub trait Write {
    type Returns;

    fn write(self, db: &mut Tables, ctx: &WriteContext<'_>) -> error::Result<Self::Returns>;
}

pub trait FetchAll: Sized {
    fn fetch_all(db: &Tables) -> Vec<Self>;
}

pub(crate) fn utc_now() -> DateTime<Utc> {
    Utc::now()
}
