use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Trainer,
    Admin,
}

/// Identity produced by the (external) auth layer. Only `user`-role
/// profiles receive a trial subscription at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub company_code: Option<String>,
    pub company_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewUserProfile {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,
    pub role: UserRole,
    pub company_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserProfile {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub company_code: Option<String>,
    pub company_name: Option<String>,
}

impl UserProfile {
    pub fn from_new(new: NewUserProfile, company_name: Option<String>, now: OffsetDateTime) -> Self {
        UserProfile {
            id: Uuid::new_v4(),
            email: new.email.to_lowercase(),
            name: new.name,
            role: new.role,
            company_code: new.company_code,
            company_name,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: UpdateUserProfile, now: OffsetDateTime) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(company_code) = patch.company_code {
            self.company_code = Some(company_code);
        }
        if let Some(company_name) = patch.company_name {
            self.company_name = Some(company_name);
        }
        self.updated_at = now;
    }
}
