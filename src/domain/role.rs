/// Classification attached to every registered identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Doctor,
    #[default]
    Patient,
}

impl Role {
    pub fn parse(s: String) -> Result<Role, String> {
        match s.as_str() {
            "doctor" => Ok(Self::Doctor),
            "patient" => Ok(Self::Patient),
            _ => Err("Invalid role".to_string()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::Patient => "patient",
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
