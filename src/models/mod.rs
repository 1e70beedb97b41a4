mod attempt;
mod company;
mod kpi;
mod question;
mod sample;
mod subscription;
mod topic;
mod user;

pub use attempt::{
    Attempt, AttemptItem, AttemptStatus, ExamResult, UpdateAttempt, UpdateAttemptItem,
    ITEM_MAX_SCORE, MINUTES_PER_QUESTION,
};
pub use company::{CompanyCode, NewCompanyCode, UpdateCompanyCode};
pub use kpi::{Kpi, NewKpi, UpdateKpi};
pub use question::{NewQuestion, Question, UpdateQuestion};
pub use sample::{
    NewSampleAnswer, NewTrainingExample, SampleAnswer, TrainingExample, UpdateSampleAnswer,
    UpdateTrainingExample,
};
pub use subscription::{PlanType, ReminderSent, Subscription};
pub use topic::{NewSubtopic, NewTopic, Subtopic, Topic, UpdateSubtopic, UpdateTopic};
pub use user::{NewUserProfile, UpdateUserProfile, UserProfile, UserRole};

use time::OffsetDateTime;
use uuid::Uuid;

/// Common surface over every persisted entity, used by the
/// timestamp-based merge in the reconciliation engine.
pub trait Record {
    fn record_id(&self) -> Uuid;
    fn record_updated_at(&self) -> OffsetDateTime;
}

macro_rules! impl_record {
    ($($ty:ty),+ $(,)?) => {
        $(impl Record for $ty {
            fn record_id(&self) -> Uuid {
                self.id
            }

            fn record_updated_at(&self) -> OffsetDateTime {
                self.updated_at
            }
        })+
    };
}

impl_record!(
    Topic,
    Subtopic,
    Question,
    Kpi,
    CompanyCode,
    SampleAnswer,
    TrainingExample,
    UserProfile,
    Subscription,
    Attempt,
    AttemptItem,
);
