use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

/// Key Performance Indicator: a gradable competency marker. A KPI must
/// belong to a subtopic; the engine rejects a nil `subtopic_id` at
/// creation. `connected_questions` is the inverse of
/// `Question.connected_kpis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpi {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub subtopic_id: Uuid,
    pub name: String,
    pub is_essential: bool,
    pub connected_questions: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewKpi {
    pub topic_id: Uuid,
    pub subtopic_id: Uuid,
    #[validate(length(min = 3, message = "Name must be at least 3 characters"))]
    pub name: String,
    pub is_essential: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateKpi {
    #[validate(length(min = 3, message = "Name must be at least 3 characters"))]
    pub name: Option<String>,
    pub is_essential: Option<bool>,
}

impl Kpi {
    pub fn from_new(new: NewKpi, now: OffsetDateTime) -> Self {
        Kpi {
            id: Uuid::new_v4(),
            topic_id: new.topic_id,
            subtopic_id: new.subtopic_id,
            name: new.name,
            is_essential: new.is_essential,
            connected_questions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: UpdateKpi, now: OffsetDateTime) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(is_essential) = patch.is_essential {
            self.is_essential = is_essential;
        }
        self.updated_at = now;
    }
}
