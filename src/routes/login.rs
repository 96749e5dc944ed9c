use actix_web::{web, HttpResponse};
use anyhow::Context;
use secrecy::{ExposeSecret, Secret};
use sqlx::PgPool;
use uuid::Uuid;

use crate::authentication::{
    issue_token, validate_credentials, AuthError, Credentials,
};
use crate::domain::{
    required, required_secret, FieldErrors, IdentityEmail, Role,
};
use crate::routes::ApiError;

#[derive(serde::Deserialize)]
pub struct LoginData {
    email: Option<String>,
    password: Option<Secret<String>>,
}

impl TryFrom<LoginData> for Credentials {
    type Error = FieldErrors;

    fn try_from(value: LoginData) -> Result<Self, Self::Error> {
        let mut errors = FieldErrors::default();
        let email = errors.check(
            "email",
            required(value.email).and_then(IdentityEmail::parse),
        );
        let password = errors.check("password", required_secret(value.password));

        match (email, password) {
            (Some(email), Some(password)) => Ok(Credentials {
                username: email.as_ref().to_string(),
                password,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(serde::Serialize)]
struct LoginResponse<'a> {
    token: &'a str,
    role: Role,
}

#[tracing::instrument(
    skip(body, pool),
    fields(username = tracing::field::Empty, user_id = tracing::field::Empty)
)]
pub async fn login(
    body: web::Json<LoginData>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let credentials: Credentials =
        body.into_inner().try_into().map_err(ApiError::ValidationError)?;
    tracing::Span::current()
        .record("username", &tracing::field::display(&credentials.username));

    let user_id = validate_credentials(credentials, &pool)
        .await
        .map_err(|e| match e {
            AuthError::InvalidCredentials(_) => {
                ApiError::Unauthorized("Invalid credentials".into())
            }
            AuthError::UnexpectedError(e) => ApiError::UnexpectedError(e),
        })?;
    tracing::Span::current()
        .record("user_id", &tracing::field::display(&user_id));

    let role = get_role(&pool, user_id).await?;
    let token = issue_token(&pool, user_id).await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        token: token.expose_secret(),
        role,
    }))
}

#[tracing::instrument(name = "Get the role of a user", skip(pool))]
async fn get_role(pool: &PgPool, user_id: Uuid) -> Result<Role, anyhow::Error> {
    let (role,): (String,) = sqlx::query_as(
        r#"
        SELECT role
        FROM user_roles
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .context("Failed to perform a query to retrieve the role of a user.")?;
    Role::parse(role).map_err(anyhow::Error::msg)
}
