use actix_web::web::{self, ReqData};
use actix_web::HttpResponse;
use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::authentication::AuthenticatedUser;
use crate::domain::{
    optional, required, FieldErrors, IdentityEmail, NewPatient, Role,
};
use crate::routes::{is_unique_violation, ApiError};

#[derive(serde::Deserialize)]
pub struct PatientData {
    patient: Option<String>,
    medical_history: Option<String>,
}

impl TryFrom<PatientData> for NewPatient {
    type Error = FieldErrors;

    fn try_from(value: PatientData) -> Result<Self, Self::Error> {
        let mut errors = FieldErrors::default();
        let email = errors.check(
            "patient",
            required(value.patient).and_then(IdentityEmail::parse),
        );
        let medical_history =
            errors.check("medical_history", optional(value.medical_history));

        match (email, medical_history) {
            (Some(email), Some(medical_history)) => Ok(Self {
                email,
                medical_history,
            }),
            _ => Err(errors),
        }
    }
}

#[tracing::instrument(
    name = "Create a patient",
    skip(body, pool, caller),
    fields(doctor = %caller.username)
)]
pub async fn create_patient(
    body: web::Json<PatientData>,
    caller: ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    caller.require_role(Role::Doctor, "Only doctors can create patients")?;

    let new_patient: NewPatient =
        body.into_inner().try_into().map_err(ApiError::ValidationError)?;

    // Any identity may become a patient, doctors included.
    let user_id = get_user_id(&pool, &new_patient.email)
        .await
        .context("Failed to look up the user behind a new patient.")?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    insert_patient(&pool, user_id, &new_patient)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::DuplicateIdentity(format!(
                    "Patient already exist with email {}",
                    new_patient.email
                ))
            } else {
                ApiError::UnexpectedError(
                    anyhow::Error::new(e).context("Failed to insert a new patient."),
                )
            }
        })?;

    Ok(HttpResponse::Created()
        .json(serde_json::json!({ "message": "Patient created successfully" })))
}

#[tracing::instrument(name = "Get user id by username", skip(pool))]
async fn get_user_id(
    pool: &PgPool,
    username: &IdentityEmail,
) -> Result<Option<Uuid>, sqlx::Error> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT user_id
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(username.as_ref())
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(user_id,)| user_id))
}

#[tracing::instrument(name = "Saving new patient in the database", skip_all)]
async fn insert_patient(
    pool: &PgPool,
    user_id: Uuid,
    new_patient: &NewPatient,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO patients (user_id, medical_history)
        VALUES ($1, $2)
        "#,
    )
    .bind(user_id)
    .bind(new_patient.medical_history.as_deref())
    .execute(pool)
    .await?;
    Ok(())
}
