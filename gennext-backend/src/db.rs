//! In-memory entity store.
//!
//! All entities live in one [`Tables`] struct behind a single `RwLock`. Each
//! mutating request takes the exclusive write guard for its whole duration,
//! so a batch operation is atomic: writers validate everything first and only
//! then touch the tables, and no other request can observe an intermediate
//! state. Display identifiers come from dedicated monotonic counters rather
//! than row counts.

use std::{collections::BTreeMap, sync::Arc};

use itertools::Itertools;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub mod error;
pub mod model;
#[cfg(test)]
pub(crate) mod test_util;

use error::Result;
use model::{
    consent::Consent,
    dna_qc::DnaQc,
    extraction::{Aliquot, ExtractionBatch},
    kit::Kit,
    plate::{Plate, PlateWell},
    prs::PrsJob,
    run::{BeadChip, GenotypeMetrics, Run},
    sample::Sample,
};

#[derive(Clone, Default)]
pub struct Store(Arc<RwLock<Tables>>);

impl Store {
    pub async fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.0.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.0.write().await
    }
}

/// Identifiers are zero-padded, so `BTreeMap` key order matches insertion
/// order and list endpoints are stable.
#[derive(Default)]
pub struct Tables {
    pub(crate) kits: BTreeMap<String, Kit>,
    pub(crate) samples: BTreeMap<String, Sample>,
    pub(crate) consents: BTreeMap<String, Consent>,
    pub(crate) extraction_batches: BTreeMap<String, ExtractionBatch>,
    pub(crate) aliquots: BTreeMap<String, Aliquot>,
    pub(crate) dna_qc: BTreeMap<String, DnaQc>,
    pub(crate) plates: BTreeMap<String, Plate>,
    pub(crate) plate_wells: BTreeMap<String, PlateWell>,
    pub(crate) runs: BTreeMap<String, Run>,
    pub(crate) beadchips: BTreeMap<String, BeadChip>,
    pub(crate) genotype_metrics: BTreeMap<u64, GenotypeMetrics>,
    pub(crate) prs_jobs: BTreeMap<String, PrsJob>,
    counters: IdCounters,
}

#[derive(Default)]
struct IdCounters {
    kits: u64,
    samples: u64,
    consents: u64,
    extraction_batches: u64,
    dna_qc: u64,
    plates: u64,
    plate_wells: u64,
    runs: u64,
    beadchips: u64,
    genotype_metrics: u64,
    prs_jobs: u64,
}

impl Tables {
    // Lookups. Missing references surface as `RecordNotFound` before any
    // mutation happens.

    pub(crate) fn kit_by_qr(&self, qr_code: &str) -> Option<&Kit> {
        self.kits.values().find(|k| k.qr_code == qr_code)
    }

    pub(crate) fn sample(&self, id: &str) -> Result<&Sample> {
        self.samples
            .get(id)
            .ok_or_else(|| error::Error::not_found("sample", id))
    }

    pub(crate) fn sample_mut(&mut self, id: &str) -> Result<&mut Sample> {
        self.samples
            .get_mut(id)
            .ok_or_else(|| error::Error::not_found("sample", id))
    }

    pub(crate) fn aliquot(&self, id: &str) -> Result<&Aliquot> {
        self.aliquots
            .get(id)
            .ok_or_else(|| error::Error::not_found("aliquot", id))
    }

    pub(crate) fn run(&self, id: &str) -> Result<&Run> {
        self.runs
            .get(id)
            .ok_or_else(|| error::Error::not_found("run", id))
    }

    pub(crate) fn run_mut(&mut self, id: &str) -> Result<&mut Run> {
        self.runs
            .get_mut(id)
            .ok_or_else(|| error::Error::not_found("run", id))
    }

    pub(crate) fn plate(&self, id: &str) -> Result<&Plate> {
        self.plates
            .get(id)
            .ok_or_else(|| error::Error::not_found("plate", id))
    }

    pub(crate) fn wells_of_plate<'a>(
        &'a self,
        plate_id: &'a str,
    ) -> impl Iterator<Item = &'a PlateWell> {
        self.plate_wells
            .values()
            .filter(move |w| w.plate_id == plate_id)
    }

    pub(crate) fn metrics_of_run<'a>(
        &'a self,
        run_id: &'a str,
    ) -> impl Iterator<Item = &'a GenotypeMetrics> {
        self.genotype_metrics
            .values()
            .filter(move |m| m.run_id == run_id)
    }

    // Consent gate.

    pub(crate) fn has_consent(&self, sample_id: &str) -> bool {
        self.consents.values().any(|c| c.sample_id == sample_id)
    }

    /// Samples among `ids` with no consent record, deduplicated, in first-seen
    /// order. The whole batch is inspected so a violation report names every
    /// offending sample.
    pub(crate) fn samples_missing_consent<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a String>,
    ) -> Vec<String> {
        ids.into_iter()
            .unique()
            .filter(|id| !self.has_consent(id))
            .cloned()
            .collect()
    }

    // Identifier allocation.

    pub(crate) fn next_kit_ids(&mut self) -> (String, String) {
        self.counters.kits += 1;
        let n = self.counters.kits;
        (format!("KIT-{n:04}"), format!("QR-{n:04}"))
    }

    pub(crate) fn next_sample_id(&mut self) -> String {
        self.counters.samples += 1;
        format!("SAMP-{:05}", self.counters.samples)
    }

    pub(crate) fn next_consent_id(&mut self) -> String {
        self.counters.consents += 1;
        format!("CONS-{:04}", self.counters.consents)
    }

    pub(crate) fn next_extraction_batch_id(&mut self) -> String {
        self.counters.extraction_batches += 1;
        format!("EXT-{:04}", self.counters.extraction_batches)
    }

    pub(crate) fn next_dna_qc_id(&mut self) -> String {
        self.counters.dna_qc += 1;
        format!("QC-{:05}", self.counters.dna_qc)
    }

    pub(crate) fn next_plate_id(&mut self) -> String {
        self.counters.plates += 1;
        format!("PLT-{:04}", self.counters.plates)
    }

    pub(crate) fn next_well_id(&mut self) -> String {
        self.counters.plate_wells += 1;
        format!("WELL-{:05}", self.counters.plate_wells)
    }

    pub(crate) fn next_run_id(&mut self) -> String {
        self.counters.runs += 1;
        format!("RUN-{:04}", self.counters.runs)
    }

    pub(crate) fn next_beadchip_id(&mut self) -> String {
        self.counters.beadchips += 1;
        format!("CHIP-{:04}", self.counters.beadchips)
    }

    pub(crate) fn next_metrics_seq(&mut self) -> u64 {
        self.counters.genotype_metrics += 1;
        self.counters.genotype_metrics
    }

    pub(crate) fn next_prs_job_id(&mut self) -> String {
        self.counters.prs_jobs += 1;
        format!("PRS-{:04}", self.counters.prs_jobs)
    }
}
