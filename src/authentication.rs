mod middleware;
mod password;
mod token;

pub use middleware::{reject_anonymous_users, AuthenticatedUser};
pub use password::{compute_password_hash, validate_credentials, AuthError, Credentials};
pub use token::{generate_token, hash_token, issue_token};
