use actix_web::web::{self, ReqData};
use actix_web::HttpResponse;
use anyhow::Context;
use sqlx::PgPool;

use crate::authentication::AuthenticatedUser;
use crate::domain::Role;
use crate::routes::ApiError;

#[derive(Debug, serde::Serialize, sqlx::FromRow)]
pub struct PatientSummary {
    pub id: i64,
    pub patient_email: String,
}

#[tracing::instrument(
    name = "List patients",
    skip(pool, caller),
    fields(doctor = %caller.username)
)]
pub async fn list_patients(
    caller: ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    caller.require_role(Role::Doctor, "Only doctors can see patients")?;

    let patients = get_patients(&pool)
        .await
        .context("Failed to fetch the list of patients.")?;
    Ok(HttpResponse::Ok().json(patients))
}

#[tracing::instrument(skip_all)]
async fn get_patients(pool: &PgPool) -> Result<Vec<PatientSummary>, sqlx::Error> {
    sqlx::query_as::<_, PatientSummary>(
        r#"
        SELECT p.id, u.email AS patient_email
        FROM patients p
        JOIN users u ON u.user_id = p.user_id
        ORDER BY p.id
        "#,
    )
    .fetch_all(pool)
    .await
}
