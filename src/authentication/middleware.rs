use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{HeaderMap, AUTHORIZATION};
use actix_web::{web, HttpMessage};
use actix_web_lab::middleware::Next;
use anyhow::Context;
use secrecy::Secret;
use sqlx::PgPool;
use uuid::Uuid;

use crate::authentication::hash_token;
use crate::domain::Role;
use crate::routes::ApiError;

/// Identity and role of the caller, resolved from the bearer token and
/// handed to protected handlers through `ReqData<AuthenticatedUser>`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn require_role(&self, role: Role, reason: &str) -> Result<(), ApiError> {
        if self.role == role {
            Ok(())
        } else {
            Err(ApiError::Forbidden(reason.to_string()))
        }
    }
}

pub async fn reject_anonymous_users(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let token = bearer_token(req.headers()).map_err(ApiError::Unauthorized)?;
    let pool = req
        .app_data::<web::Data<PgPool>>()
        .cloned()
        .context("The connection pool was not registered as application data.")
        .map_err(ApiError::UnexpectedError)?;

    match get_token_owner(&pool, &token)
        .await
        .map_err(ApiError::UnexpectedError)?
    {
        Some(user) => {
            req.extensions_mut().insert(user);
            next.call(req).await
        }
        None => Err(ApiError::Unauthorized("Invalid token.".into()).into()),
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<Secret<String>, String> {
    let header_value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| "Authentication credentials were not provided.".to_string())?
        .to_str()
        .map_err(|_| "Invalid token header. Token string should not contain invalid characters.".to_string())?;

    let token = header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty() && !token.contains(' '))
        .ok_or_else(|| "Invalid token header. Expected 'Bearer <token>'.".to_string())?;

    Ok(Secret::new(token.to_string()))
}

#[tracing::instrument(name = "Resolve bearer token owner", skip_all)]
async fn get_token_owner(
    pool: &PgPool,
    token: &Secret<String>,
) -> Result<Option<AuthenticatedUser>, anyhow::Error> {
    let row: Option<(Uuid, String, String)> = sqlx::query_as(
        r#"
        SELECT u.user_id, u.username, r.role
        FROM auth_tokens t
        JOIN users u ON u.user_id = t.user_id
        JOIN user_roles r ON r.user_id = u.user_id
        WHERE t.token_hash = $1
        "#,
    )
    .bind(hash_token(token))
    .fetch_optional(pool)
    .await
    .context("Failed to perform a query to resolve a bearer token.")?;

    row.map(|(user_id, username, role)| -> Result<_, anyhow::Error> {
        let role = Role::parse(role).map_err(anyhow::Error::msg)?;
        Ok(AuthenticatedUser {
            user_id,
            username,
            role,
        })
    })
    .transpose()
}
