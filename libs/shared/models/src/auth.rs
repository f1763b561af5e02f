use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "patient" => Some(Role::Patient),
            "doctor" => Some(Role::Doctor),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Who is making the call. Built once at the HTTP boundary and passed
/// explicitly into every service operation.
#[derive(Debug, Clone, Copy)]
pub struct CallerContext {
    pub actor_id: Uuid,
    pub role: Role,
}

impl CallerContext {
    pub fn new(actor_id: Uuid, role: Role) -> Self {
        Self { actor_id, role }
    }

    /// Derive the context from an authenticated user. Users without a
    /// recognised role default to patient (least privilege).
    pub fn from_user(user: &User) -> Result<Self, String> {
        let actor_id = Uuid::parse_str(&user.id)
            .map_err(|_| format!("Invalid user id in token: {}", user.id))?;
        let role = user
            .role
            .as_deref()
            .and_then(Role::parse)
            .unwrap_or(Role::Patient);
        Ok(Self { actor_id, role })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
