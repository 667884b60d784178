//! Authentication DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Profile;

/// Request body for `POST /auth/signup`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    /// Display name.
    pub name: String,
    /// Login email; unique.
    pub email: String,
    /// Requested role; `admin` cannot be self-assigned.
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "student".to_string()
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Login email.
    pub email: String,
}

/// Profile representation.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    /// Profile identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Role.
    pub role: String,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id.into(),
            name: profile.name,
            email: profile.email,
            role: profile.role.to_string(),
        }
    }
}

/// Response body for login and signup.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Signed session token to present as `Authorization: Bearer`.
    pub token: String,
    /// The authenticated profile.
    pub profile: ProfileResponse,
}
