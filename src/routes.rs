mod errors;
mod health_check;
mod login;
pub mod patients;
pub mod prescriptions;
mod registration;

pub use errors::*;
pub use health_check::*;
pub use login::*;
pub use registration::*;
