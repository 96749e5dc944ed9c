use actix_web::{web, HttpResponse};
use anyhow::Context;
use secrecy::{ExposeSecret, Secret};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::authentication::compute_password_hash;
use crate::domain::{
    required, required_secret, FieldErrors, IdentityEmail, NewIdentity, Role,
};
use crate::routes::{is_unique_violation, ApiError};
use crate::telemetry::spawn_blocking_with_tracing;

#[derive(serde::Deserialize)]
pub struct RegistrationData {
    email: Option<String>,
    password: Option<Secret<String>>,
    role: Option<String>,
}

impl TryFrom<RegistrationData> for NewIdentity {
    type Error = FieldErrors;

    fn try_from(value: RegistrationData) -> Result<Self, Self::Error> {
        let mut errors = FieldErrors::default();
        let email = errors.check(
            "email",
            required(value.email).and_then(IdentityEmail::parse),
        );
        let password = errors.check("password", required_secret(value.password));
        let role = errors.check("role", required(value.role).and_then(Role::parse));

        match (email, password, role) {
            (Some(email), Some(password), Some(role)) => Ok(Self {
                email,
                password,
                role,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(serde::Serialize)]
struct RegistrationResponse {
    message: &'static str,
    role: Role,
}

#[tracing::instrument(
    name = "Registering a new user",
    skip(body, pool),
    fields(user_email = tracing::field::Empty, user_role = tracing::field::Empty)
)]
pub async fn register_user(
    body: web::Json<RegistrationData>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let new_identity: NewIdentity =
        body.into_inner().try_into().map_err(ApiError::ValidationError)?;
    let span = tracing::Span::current();
    span.record("user_email", &tracing::field::display(&new_identity.email));
    span.record("user_role", &tracing::field::display(&new_identity.role));

    let NewIdentity {
        email,
        password,
        role,
    } = new_identity;

    let password_hash =
        spawn_blocking_with_tracing(move || compute_password_hash(password))
            .await
            .context("Failed to spawn blocking task.")??;

    let mut transaction = pool
        .begin()
        .await
        .context("Failed to acquire a Postgres connection from the pool")?;

    let user_id = insert_user(&mut transaction, &email, password_hash)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::DuplicateIdentity(format!(
                    "User already exist with email {}",
                    email
                ))
            } else {
                ApiError::UnexpectedError(
                    anyhow::Error::new(e)
                        .context("Failed to insert a new user in the database."),
                )
            }
        })?;

    assign_role(&mut transaction, user_id, role)
        .await
        .context("Failed to assign a role to the new user.")?;

    transaction
        .commit()
        .await
        .context("Failed to commit SQL transaction to store a new user.")?;

    Ok(HttpResponse::Created().json(RegistrationResponse {
        message: "User created successfully",
        role,
    }))
}

/// The email is stored as the login name too.
#[tracing::instrument(name = "Saving new user details in the database", skip_all)]
async fn insert_user(
    transaction: &mut Transaction<'_, Postgres>,
    email: &IdentityEmail,
    password_hash: Secret<String>,
) -> Result<Uuid, sqlx::Error> {
    let user_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO users (user_id, username, email, password_hash)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(user_id)
    .bind(email.as_ref())
    .bind(email.as_ref())
    .bind(password_hash.expose_secret())
    .execute(&mut **transaction)
    .await?;
    Ok(user_id)
}

/// Creates the role row, or overwrites the role already assigned.
#[tracing::instrument(name = "Assign a role", skip(transaction))]
async fn assign_role(
    transaction: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    role: Role,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO user_roles (user_id, role)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET role = EXCLUDED.role
        "#,
    )
    .bind(user_id)
    .bind(role.as_str())
    .execute(&mut **transaction)
    .await?;
    Ok(())
}
