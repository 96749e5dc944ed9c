use secrecy::Secret;

use crate::domain::IdentityEmail;
use crate::domain::Role;

/// A validated registration request. The email is both login name and
/// contact address.
#[derive(Debug)]
pub struct NewIdentity {
    pub email: IdentityEmail,
    pub password: Secret<String>,
    pub role: Role,
}
