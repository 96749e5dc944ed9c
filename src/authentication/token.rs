use anyhow::Context;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use secrecy::{ExposeSecret, Secret};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

const TOKEN_LENGTH: usize = 40;

/// Generate a random 40-characters-long case-sensitive bearer token.
pub fn generate_token() -> Secret<String> {
    let mut rng = thread_rng();
    let token = std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(TOKEN_LENGTH)
        .collect();
    Secret::new(token)
}

/// Hex encoded SHA-256 digest: the only form a token is stored in.
pub fn hash_token(token: &Secret<String>) -> String {
    hex::encode(Sha256::digest(token.expose_secret().as_bytes()))
}

#[tracing::instrument(name = "Issue a bearer token", skip(pool))]
pub async fn issue_token(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Secret<String>, anyhow::Error> {
    let token = generate_token();
    sqlx::query(
        r#"
        INSERT INTO auth_tokens (token_hash, user_id, created_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(hash_token(&token))
    .bind(user_id)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to store a new bearer token.")?;
    Ok(token)
}
