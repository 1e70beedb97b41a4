use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use super::ITEM_MAX_SCORE;

/// Model answer shown to learners after evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleAnswer {
    pub id: Uuid,
    pub question_id: Uuid,
    pub answer_text: String,
    pub kpis_covered: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Graded exemplar used to calibrate the external evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingExample {
    pub id: Uuid,
    pub question_id: Uuid,
    pub answer_text: String,
    pub kpis_detected: Vec<Uuid>,
    pub score: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewSampleAnswer {
    pub question_id: Uuid,
    #[validate(length(min = 1, message = "Answer text must not be empty"))]
    pub answer_text: String,
    pub kpis_covered: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSampleAnswer {
    #[validate(length(min = 1, message = "Answer text must not be empty"))]
    pub answer_text: Option<String>,
    pub kpis_covered: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewTrainingExample {
    pub question_id: Uuid,
    #[validate(length(min = 1, message = "Answer text must not be empty"))]
    pub answer_text: String,
    pub kpis_detected: Vec<Uuid>,
    #[validate(range(min = 0, max = 3, message = "Score must be between 0 and 3"))]
    pub score: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTrainingExample {
    #[validate(length(min = 1, message = "Answer text must not be empty"))]
    pub answer_text: Option<String>,
    pub kpis_detected: Option<Vec<Uuid>>,
    #[validate(range(min = 0, max = 3, message = "Score must be between 0 and 3"))]
    pub score: Option<i32>,
}

impl SampleAnswer {
    pub fn from_new(new: NewSampleAnswer, now: OffsetDateTime) -> Self {
        SampleAnswer {
            id: Uuid::new_v4(),
            question_id: new.question_id,
            answer_text: new.answer_text,
            kpis_covered: new.kpis_covered,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: UpdateSampleAnswer, now: OffsetDateTime) {
        if let Some(answer_text) = patch.answer_text {
            self.answer_text = answer_text;
        }
        if let Some(kpis_covered) = patch.kpis_covered {
            self.kpis_covered = kpis_covered;
        }
        self.updated_at = now;
    }
}

impl TrainingExample {
    pub fn from_new(new: NewTrainingExample, now: OffsetDateTime) -> Self {
        debug_assert!(new.score <= ITEM_MAX_SCORE);
        TrainingExample {
            id: Uuid::new_v4(),
            question_id: new.question_id,
            answer_text: new.answer_text,
            kpis_detected: new.kpis_detected,
            score: new.score,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: UpdateTrainingExample, now: OffsetDateTime) {
        if let Some(answer_text) = patch.answer_text {
            self.answer_text = answer_text;
        }
        if let Some(kpis_detected) = patch.kpis_detected {
            self.kpis_detected = kpis_detected;
        }
        if let Some(score) = patch.score {
            self.score = score;
        }
        self.updated_at = now;
    }
}
