use actix_web::web::{self, ReqData};
use actix_web::HttpResponse;
use anyhow::Context;
use sqlx::PgPool;

use super::{
    format_date, get_patient_id, patient_not_found, PrescriptionRecord,
    SELECT_PRESCRIPTIONS,
};
use crate::authentication::AuthenticatedUser;
use crate::domain::{required, FieldErrors, IdentityEmail, Role};
use crate::routes::ApiError;

#[derive(serde::Deserialize)]
pub struct ListParameters {
    patient_username: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct PrescriptionSummary {
    pub id: i64,
    pub patient_username: String,
    pub doctor_username: String,
    pub date_prescribed: String,
}

impl From<PrescriptionRecord> for PrescriptionSummary {
    fn from(record: PrescriptionRecord) -> Self {
        Self {
            id: record.id,
            patient_username: record.patient_username,
            doctor_username: record.doctor_username,
            date_prescribed: format_date(record.date_prescribed),
        }
    }
}

/// Patients only ever see their own prescriptions, whatever they asked for.
fn resolve_target(
    caller: &AuthenticatedUser,
    requested: Option<String>,
) -> Option<String> {
    match caller.role {
        Role::Patient => Some(caller.username.clone()),
        Role::Doctor => requested,
    }
}

#[tracing::instrument(
    name = "List prescriptions",
    skip(parameters, pool, caller),
    fields(caller = %caller.username, patient_username = tracing::field::Empty)
)]
pub async fn list_prescriptions(
    parameters: web::Query<ListParameters>,
    caller: ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let target = resolve_target(&caller, parameters.into_inner().patient_username);
    let username = required(target)
        .and_then(IdentityEmail::parse)
        .map_err(|e| {
            ApiError::ValidationError(FieldErrors::single("patient_username", e))
        })?;
    tracing::Span::current()
        .record("patient_username", &tracing::field::display(&username));

    let patient_id = get_patient_id(&pool, &username)
        .await
        .context("Failed to look up the patient whose prescriptions are listed.")?
        .ok_or_else(|| patient_not_found(&username))?;

    let prescriptions: Vec<PrescriptionSummary> =
        get_prescriptions_of(&pool, patient_id)
            .await
            .context("Failed to fetch the prescriptions of a patient.")?
            .into_iter()
            .map(PrescriptionSummary::from)
            .collect();
    Ok(HttpResponse::Ok().json(prescriptions))
}

#[tracing::instrument(skip(pool))]
async fn get_prescriptions_of(
    pool: &PgPool,
    patient_id: i64,
) -> Result<Vec<PrescriptionRecord>, sqlx::Error> {
    let query = format!("{} WHERE pr.patient_id = $1 ORDER BY pr.id", SELECT_PRESCRIPTIONS);
    sqlx::query_as::<_, PrescriptionRecord>(&query)
        .bind(patient_id)
        .fetch_all(pool)
        .await
}
