mod create;
mod detail;
mod list;

pub use create::*;
pub use detail::*;
pub use list::*;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::IdentityEmail;
use crate::routes::ApiError;

/// A prescription joined with the usernames of both parties.
#[derive(Debug, sqlx::FromRow)]
pub struct PrescriptionRecord {
    id: i64,
    patient_username: String,
    doctor_username: String,
    medication: String,
    dosage: String,
    instructions: String,
    date_prescribed: DateTime<Utc>,
}

const SELECT_PRESCRIPTIONS: &str = r#"
    SELECT
        pr.id,
        pu.username AS patient_username,
        du.username AS doctor_username,
        pr.medication,
        pr.dosage,
        pr.instructions,
        pr.date_prescribed
    FROM prescriptions pr
    JOIN patients p ON p.id = pr.patient_id
    JOIN users pu ON pu.user_id = p.user_id
    JOIN users du ON du.user_id = pr.doctor_id
"#;

/// Day-month-year, e.g. `16-10-2026`.
fn format_date(date: DateTime<Utc>) -> String {
    date.format("%d-%m-%Y").to_string()
}

fn patient_not_found(username: &IdentityEmail) -> ApiError {
    ApiError::NotFound(format!(
        "Patient does not exist with username {}",
        username
    ))
}

#[tracing::instrument(name = "Get patient id by username", skip(pool))]
async fn get_patient_id(
    pool: &PgPool,
    username: &IdentityEmail,
) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT p.id
        FROM patients p
        JOIN users u ON u.user_id = p.user_id
        WHERE u.username = $1
        "#,
    )
    .bind(username.as_ref())
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(id,)| id))
}
