use actix_web::web::{self, ReqData};
use actix_web::HttpResponse;
use anyhow::Context;
use sqlx::PgPool;

use super::{format_date, PrescriptionRecord, SELECT_PRESCRIPTIONS};
use crate::authentication::AuthenticatedUser;
use crate::routes::ApiError;

#[derive(Debug, serde::Serialize)]
pub struct PrescriptionDetail {
    pub id: i64,
    pub patient_username: String,
    pub doctor_username: String,
    pub medication: String,
    pub dosage: String,
    pub instructions: String,
    pub date_prescribed: String,
}

impl From<PrescriptionRecord> for PrescriptionDetail {
    fn from(record: PrescriptionRecord) -> Self {
        Self {
            id: record.id,
            patient_username: record.patient_username,
            doctor_username: record.doctor_username,
            medication: record.medication,
            dosage: record.dosage,
            instructions: record.instructions,
            date_prescribed: format_date(record.date_prescribed),
        }
    }
}

// Any authenticated caller may read any prescription, no ownership filter.
#[tracing::instrument(
    name = "Get prescription detail",
    skip(pool, caller),
    fields(caller = %caller.username)
)]
pub async fn prescription_detail(
    prescription_id: web::Path<i64>,
    caller: ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let prescription_id = prescription_id.into_inner();
    let record = get_prescription(&pool, prescription_id)
        .await
        .context("Failed to fetch a prescription.")?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "Prescription does not exist with id {}",
                prescription_id
            ))
        })?;
    Ok(HttpResponse::Ok().json(PrescriptionDetail::from(record)))
}

#[tracing::instrument(skip(pool))]
async fn get_prescription(
    pool: &PgPool,
    prescription_id: i64,
) -> Result<Option<PrescriptionRecord>, sqlx::Error> {
    let query = format!("{} WHERE pr.id = $1", SELECT_PRESCRIPTIONS);
    sqlx::query_as::<_, PrescriptionRecord>(&query)
        .bind(prescription_id)
        .fetch_optional(pool)
        .await
}
