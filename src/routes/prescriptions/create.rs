use actix_web::web::{self, ReqData};
use actix_web::HttpResponse;
use anyhow::Context;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{get_patient_id, patient_not_found};
use crate::authentication::AuthenticatedUser;
use crate::domain::{
    required, FieldErrors, IdentityEmail, NewPrescription, Role, ShortText,
};
use crate::routes::ApiError;

#[derive(serde::Deserialize)]
pub struct PrescriptionData {
    patient_username: Option<String>,
    medication: Option<String>,
    dosage: Option<String>,
    instruction: Option<String>,
}

impl TryFrom<PrescriptionData> for NewPrescription {
    type Error = FieldErrors;

    fn try_from(value: PrescriptionData) -> Result<Self, Self::Error> {
        let mut errors = FieldErrors::default();
        let patient_username = errors.check(
            "patient_username",
            required(value.patient_username).and_then(IdentityEmail::parse),
        );
        let medication = errors.check(
            "medication",
            required(value.medication).and_then(ShortText::parse),
        );
        let dosage =
            errors.check("dosage", required(value.dosage).and_then(ShortText::parse));
        let instructions = errors.check("instruction", required(value.instruction));

        match (patient_username, medication, dosage, instructions) {
            (
                Some(patient_username),
                Some(medication),
                Some(dosage),
                Some(instructions),
            ) => Ok(Self {
                patient_username,
                medication,
                dosage,
                instructions,
            }),
            _ => Err(errors),
        }
    }
}

#[tracing::instrument(
    name = "Create a prescription",
    skip(body, pool, caller),
    fields(doctor = %caller.username)
)]
pub async fn create_prescription(
    body: web::Json<PrescriptionData>,
    caller: ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    caller.require_role(Role::Doctor, "Only doctors can prescribe medications")?;

    let new_prescription: NewPrescription =
        body.into_inner().try_into().map_err(ApiError::ValidationError)?;

    let patient_id = get_patient_id(&pool, &new_prescription.patient_username)
        .await
        .context("Failed to look up the patient of a new prescription.")?
        .ok_or_else(|| patient_not_found(&new_prescription.patient_username))?;

    insert_prescription(&pool, patient_id, caller.user_id, &new_prescription)
        .await
        .context("Failed to insert a new prescription.")?;

    Ok(HttpResponse::Created().json(
        serde_json::json!({ "message": "Prescription created successfully" }),
    ))
}

#[tracing::instrument(name = "Saving new prescription in the database", skip_all)]
async fn insert_prescription(
    pool: &PgPool,
    patient_id: i64,
    doctor_id: Uuid,
    new_prescription: &NewPrescription,
) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO prescriptions (
            patient_id,
            doctor_id,
            medication,
            dosage,
            instructions,
            date_prescribed
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(patient_id)
    .bind(doctor_id)
    .bind(new_prescription.medication.as_ref())
    .bind(new_prescription.dosage.as_ref())
    .bind(&new_prescription.instructions)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    tracing::info!(prescription_id = id, "Prescription stored");
    Ok(id)
}
