use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub iat: Option<u64>,
}

/// The role a verified caller acts under. Authorization decisions in the
/// cells branch on this; everything else about the caller is out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Patient => write!(f, "patient"),
            Role::Doctor => write!(f, "doctor"),
        }
    }
}

/// Verified request identity, produced by the auth middleware and trusted
/// downstream. `subject_id` is the patient or doctor id depending on role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub subject_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn is_patient(&self) -> bool {
        self.role == Role::Patient
    }

    pub fn is_doctor(&self) -> bool {
        self.role == Role::Doctor
    }
}
