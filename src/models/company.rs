use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

/// Company access code: the token a company distributes to its
/// learners. Removing an address from `authorized_emails` triggers
/// best-effort removal of the matching user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyCode {
    pub id: Uuid,
    pub code: String,
    pub company_name: String,
    pub admin_email: String,
    pub max_users: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub is_active: bool,
    pub authorized_emails: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewCompanyCode {
    #[validate(length(min = 4, message = "Code must be at least 4 characters"))]
    pub code: String,
    #[validate(length(min = 1, message = "Company name must not be empty"))]
    pub company_name: String,
    #[validate(email)]
    pub admin_email: String,
    #[validate(range(min = 1, message = "Seat count must be positive"))]
    pub max_users: i32,
    pub expires_at: OffsetDateTime,
    pub authorized_emails: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCompanyCode {
    #[validate(length(min = 1, message = "Company name must not be empty"))]
    pub company_name: Option<String>,
    #[validate(email)]
    pub admin_email: Option<String>,
    #[validate(range(min = 1, message = "Seat count must be positive"))]
    pub max_users: Option<i32>,
    pub expires_at: Option<OffsetDateTime>,
    pub is_active: Option<bool>,
    pub authorized_emails: Option<Vec<String>>,
}

impl CompanyCode {
    pub fn from_new(new: NewCompanyCode, now: OffsetDateTime) -> Self {
        CompanyCode {
            id: Uuid::new_v4(),
            code: new.code,
            company_name: new.company_name,
            admin_email: new.admin_email,
            max_users: new.max_users,
            expires_at: new.expires_at,
            is_active: true,
            authorized_emails: new.authorized_emails,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: UpdateCompanyCode, now: OffsetDateTime) {
        if let Some(company_name) = patch.company_name {
            self.company_name = company_name;
        }
        if let Some(admin_email) = patch.admin_email {
            self.admin_email = admin_email;
        }
        if let Some(max_users) = patch.max_users {
            self.max_users = max_users;
        }
        if let Some(expires_at) = patch.expires_at {
            self.expires_at = expires_at;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        if let Some(authorized_emails) = patch.authorized_emails {
            self.authorized_emails = authorized_emails;
        }
        self.updated_at = now;
    }

    /// Registration access check: the code must be active and unexpired,
    /// the email must be on the authorized list, and a seat must be free.
    pub fn admits(&self, email: &str, current_users: usize, now: OffsetDateTime) -> bool {
        self.is_active
            && self.expires_at > now
            && current_users < self.max_users as usize
            && self
                .authorized_emails
                .iter()
                .any(|e| e.eq_ignore_ascii_case(email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn code(now: OffsetDateTime) -> CompanyCode {
        CompanyCode {
            id: Uuid::new_v4(),
            code: "ACME2026".to_string(),
            company_name: "Acme Consulting".to_string(),
            admin_email: "admin@acme.example".to_string(),
            max_users: 2,
            expires_at: now + Duration::days(30),
            is_active: true,
            authorized_emails: vec!["jo@acme.example".to_string()],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn admits_authorized_email_with_free_seat() {
        let now = OffsetDateTime::now_utc();
        let code = code(now);
        assert!(code.admits("jo@acme.example", 0, now));
        assert!(code.admits("JO@ACME.EXAMPLE", 1, now));
    }

    #[test]
    fn rejects_unknown_email_full_roster_and_expired_code() {
        let now = OffsetDateTime::now_utc();
        let mut code = code(now);
        assert!(!code.admits("sam@acme.example", 0, now));
        assert!(!code.admits("jo@acme.example", 2, now));

        code.expires_at = now - Duration::days(1);
        assert!(!code.admits("jo@acme.example", 0, now));

        code.expires_at = now + Duration::days(1);
        code.is_active = false;
        assert!(!code.admits("jo@acme.example", 0, now));
    }
}
