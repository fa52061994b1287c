use axum::{
    Json,
    extract::{FromRequest, Path, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use garde::Validate;
use serde::Serialize;
use valuable::Valuable;

use crate::{
    config::QcThresholds,
    db::model::{
        FetchAll, Write,
        prs::{NewPrsJob, PrsJob, PrsPackageRequest},
        run::{MetricsEntry, MetricsReport, MetricsUpload},
    },
    export,
    server::AppState,
};

use super::error::{Error, Result};

/// JSON extractor that also runs `garde` validation on the payload.
pub(super) struct ValidJson<T>(T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
    T: Validate,
    <T as Validate>::Context: std::default::Default,
{
    type Rejection = Error;

    async fn from_request(
        req: axum::extract::Request,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let axum::Json(data) = axum::Json::<T>::from_request(req, state).await?;
        data.validate()?;

        Ok(Self(data))
    }
}

impl<T: Serialize> IntoResponse for ValidJson<T> {
    fn into_response(self) -> Response {
        let Self(inner) = self;

        axum::Json(inner).into_response()
    }
}

pub(super) async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "time": Utc::now().to_rfc3339() }))
}

pub(super) async fn settings(State(app_state): State<AppState>) -> Json<QcThresholds> {
    Json(*app_state.thresholds())
}

pub(super) async fn write<Data>(
    State(app_state): State<AppState>,
    ValidJson(data): ValidJson<Data>,
) -> Result<Json<Data::Returns>>
where
    Data: Write + Valuable,
    Data::Returns: Serialize,
{
    tracing::info!(deserialized_data = data.as_value());

    let mut db = app_state.db().write().await;
    let item = data.write(&mut db, &app_state.write_context())?;

    Ok(Json(item))
}

pub(super) async fn list<Resource>(State(app_state): State<AppState>) -> Json<Vec<Resource>>
where
    Resource: FetchAll + Serialize,
{
    let db = app_state.db().read().await;

    Json(Resource::fetch_all(&db))
}

pub(super) async fn samplesheet(
    State(app_state): State<AppState>,
    Path(plate_id): Path<String>,
) -> Result<String> {
    let db = app_state.db().read().await;

    Ok(export::samplesheet(&db, &plate_id)?)
}

pub(super) async fn upload_metrics(
    State(app_state): State<AppState>,
    Path(run_id): Path<String>,
    ValidJson(entries): ValidJson<Vec<MetricsEntry>>,
) -> Result<Json<MetricsReport>> {
    tracing::info!(run_id, deserialized_entries = entries.as_value());

    let mut db = app_state.db().write().await;
    let report = MetricsUpload { run_id, entries }.write(&mut db, &app_state.write_context())?;

    Ok(Json(report))
}

pub(super) async fn create_prs_package(
    State(app_state): State<AppState>,
    Path(run_id): Path<String>,
    ValidJson(job): ValidJson<NewPrsJob>,
) -> Result<Json<PrsJob>> {
    tracing::info!(run_id, deserialized_job = job.as_value());

    let mut db = app_state.db().write().await;
    let job = PrsPackageRequest { run_id, job }.write(&mut db, &app_state.write_context())?;

    Ok(Json(job))
}
