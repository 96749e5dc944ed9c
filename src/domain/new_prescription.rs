use crate::domain::IdentityEmail;
use crate::domain::ShortText;

#[derive(Debug)]
pub struct NewPrescription {
    pub patient_username: IdentityEmail,
    pub medication: ShortText,
    pub dosage: ShortText,
    pub instructions: String,
}
