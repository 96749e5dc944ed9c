mod field_errors;
mod identity_email;
mod new_identity;
mod new_patient;
mod new_prescription;
mod role;
mod short_text;

pub use field_errors::*;
pub use identity_email::IdentityEmail;
pub use new_identity::NewIdentity;
pub use new_patient::NewPatient;
pub use new_prescription::NewPrescription;
pub use role::Role;
pub use short_text::ShortText;
