use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for both `/register` and `/login`. Fields are optional so a
/// missing one surfaces as a 400 instead of a deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Credentials {
    /// Both fields, present and non-empty.
    pub fn into_parts(self) -> Option<(String, String)> {
        let username = self.username.filter(|u| !u.is_empty())?;
        let password = self.password.filter(|p| !p.is_empty())?;
        Some((username, password))
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
}
