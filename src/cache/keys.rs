//! Local persistence key registry. One key per mirrored collection,
//! plus per-user keys for attempt history.

use uuid::Uuid;

pub const TOPICS: &str = "examprep:v1:topics";
pub const SUBTOPICS: &str = "examprep:v1:subtopics";
pub const QUESTIONS: &str = "examprep:v1:questions";
pub const KPIS: &str = "examprep:v1:kpis";
pub const COMPANY_CODES: &str = "examprep:v1:companyCodes";
pub const SAMPLE_ANSWERS: &str = "examprep:v1:sampleAnswers";
pub const TRAINING_EXAMPLES: &str = "examprep:v1:trainingExamples";
pub const USERS: &str = "examprep:v1:users";
pub const SUBSCRIPTIONS: &str = "examprep:v1:subscriptions";

/// Reserved for the external auth layer; this crate never reads or
/// writes it.
pub const SESSIONS: &str = "examprep:v1:sessions";

pub fn attempts_for(user_id: Uuid) -> String {
    format!("examprep:v1:attempts:{user_id}")
}

pub fn attempt_items_for(user_id: Uuid) -> String {
    format!("examprep:v1:attemptItems:{user_id}")
}
