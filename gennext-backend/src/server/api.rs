use axum::{
    Router,
    routing::{get, post},
};

use crate::db::model::{
    consent::NewConsent,
    dna_qc::DnaQcMeasurement,
    extraction::{AliquotSummary, NewExtraction},
    kit::{Kit, NewKit},
    plate::{NewPlate, PlateSummary},
    prs::PrsJob,
    run::{NewRun, RunSummary},
    sample::{NewSample, SampleSummary},
};
use crate::server::api::handler::{
    create_prs_package, health, list, samplesheet, settings, upload_metrics, write,
};

use super::AppState;

mod error;
mod handler;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/settings", get(settings))
        .route("/kits", post(write::<NewKit>).get(list::<Kit>))
        .route("/samples", post(write::<NewSample>).get(list::<SampleSummary>))
        .route("/consents", post(write::<NewConsent>))
        .route("/extractions", post(write::<NewExtraction>))
        .route("/extractions/qc", post(write::<Vec<DnaQcMeasurement>>))
        .route("/aliquots", get(list::<AliquotSummary>))
        .route("/plates", post(write::<NewPlate>).get(list::<PlateSummary>))
        .route("/plates/{plate_id}/samplesheet", get(samplesheet))
        .route("/runs", post(write::<NewRun>).get(list::<RunSummary>))
        .route("/runs/{run_id}/metrics", post(upload_metrics))
        .route("/runs/{run_id}/prs_package", post(create_prs_package))
        .route("/prs_jobs", get(list::<PrsJob>))
}
