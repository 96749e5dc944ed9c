use validator::validate_email;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IdentityEmail(String);

impl IdentityEmail {
    pub fn parse(s: String) -> Result<IdentityEmail, String> {
        let s = s.trim();
        if validate_email(s) {
            Ok(Self(s.to_string()))
        } else {
            Err("Enter a valid email address.".to_string())
        }
    }
}

impl AsRef<str> for IdentityEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdentityEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
