use crate::domain::IdentityEmail;

#[derive(Debug)]
pub struct NewPatient {
    /// Email of an already registered identity.
    pub email: IdentityEmail,
    pub medical_history: Option<String>,
}
