use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

/// An open-ended exam question. `connected_kpis` is the forward side of
/// the many-to-many link with [`crate::models::Kpi`]; both sides are
/// kept symmetric by the engine's connect/disconnect operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub subtopic_id: Uuid,
    pub prompt: String,
    pub is_active: bool,
    pub connected_kpis: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewQuestion {
    pub topic_id: Uuid,
    pub subtopic_id: Uuid,
    #[validate(length(min = 10, message = "Prompt must be at least 10 characters"))]
    pub prompt: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestion {
    #[validate(length(min = 10, message = "Prompt must be at least 10 characters"))]
    pub prompt: Option<String>,
    pub is_active: Option<bool>,
}

impl Question {
    pub fn from_new(new: NewQuestion, now: OffsetDateTime) -> Self {
        Question {
            id: Uuid::new_v4(),
            topic_id: new.topic_id,
            subtopic_id: new.subtopic_id,
            prompt: new.prompt,
            is_active: true,
            connected_kpis: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: UpdateQuestion, now: OffsetDateTime) {
        if let Some(prompt) = patch.prompt {
            self.prompt = prompt;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        self.updated_at = now;
    }
}
