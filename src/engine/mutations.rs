//! Optimistic content mutations. Every mutator follows the same shape:
//! validate synchronously, apply to the in-memory collections under the
//! write lock, enqueue the remote write on the outbox, and re-mirror
//! the touched collections into the local cache. The only errors a
//! caller can see are validation, not-found and conflict; remote
//! failures stay inside the outbox.

use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::cache::keys;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    CompanyCode, Kpi, NewCompanyCode, NewKpi, NewQuestion, NewSampleAnswer, NewSubtopic, NewTopic,
    NewTrainingExample, NewUserProfile, Question, SampleAnswer, Subscription, Subtopic, Topic,
    TrainingExample, UpdateCompanyCode, UpdateKpi, UpdateQuestion, UpdateSampleAnswer,
    UpdateSubtopic, UpdateTopic, UpdateTrainingExample, UpdateUserProfile, UserProfile,
};

use super::{ReconciliationEngine, SyncOp};

impl ReconciliationEngine {
    // ----- topics -----

    pub fn add_topic(&self, new: NewTopic) -> EngineResult<Topic> {
        new.validate()?;
        let topic = Topic::from_new(new, OffsetDateTime::now_utc());
        self.write().topics.push(topic.clone());
        self.enqueue(SyncOp::UpsertTopic(topic.clone()));
        self.mirror_topics();
        Ok(topic)
    }

    pub fn update_topic(&self, id: Uuid, patch: UpdateTopic) -> EngineResult<Topic> {
        patch.validate()?;
        let topic = {
            let mut collections = self.write();
            let topic = collections
                .topics
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| EngineError::NotFound(format!("topic {id}")))?;
            topic.apply(patch, OffsetDateTime::now_utc());
            topic.clone()
        };
        self.enqueue(SyncOp::UpsertTopic(topic.clone()));
        self.mirror_topics();
        Ok(topic)
    }

    /// Deleting a topic removes its whole subtree: subtopics, questions
    /// and KPIs go with it, each with its own remote delete.
    pub fn delete_topic(&self, id: Uuid) -> EngineResult<()> {
        let (subtopic_ids, question_ids, kpi_ids) = {
            let mut collections = self.write();
            if !collections.topics.iter().any(|t| t.id == id) {
                return Err(EngineError::NotFound(format!("topic {id}")));
            }
            collections.topics.retain(|t| t.id != id);

            let subtopic_ids: Vec<Uuid> = collections
                .subtopics
                .iter()
                .filter(|s| s.topic_id == id)
                .map(|s| s.id)
                .collect();
            let question_ids: Vec<Uuid> = collections
                .questions
                .iter()
                .filter(|q| q.topic_id == id)
                .map(|q| q.id)
                .collect();
            let kpi_ids: Vec<Uuid> = collections
                .kpis
                .iter()
                .filter(|k| k.topic_id == id)
                .map(|k| k.id)
                .collect();

            collections.subtopics.retain(|s| s.topic_id != id);
            collections.questions.retain(|q| q.topic_id != id);
            collections.kpis.retain(|k| k.topic_id != id);
            (subtopic_ids, question_ids, kpi_ids)
        };

        self.enqueue(SyncOp::DeleteTopic(id));
        for sid in subtopic_ids {
            self.enqueue(SyncOp::DeleteSubtopic(sid));
        }
        for qid in question_ids {
            self.enqueue(SyncOp::DeleteQuestion(qid));
        }
        for kid in kpi_ids {
            self.enqueue(SyncOp::DeleteKpi(kid));
        }
        self.mirror_topics();
        self.mirror_subtopics();
        self.mirror_questions();
        self.mirror_kpis();
        Ok(())
    }

    // ----- subtopics -----

    pub fn add_subtopic(&self, new: NewSubtopic) -> EngineResult<Subtopic> {
        new.validate()?;
        let now = OffsetDateTime::now_utc();
        let (subtopic, parent) = {
            let mut collections = self.write();
            let parent = collections
                .topics
                .iter_mut()
                .find(|t| t.id == new.topic_id)
                .ok_or_else(|| EngineError::NotFound(format!("topic {}", new.topic_id)))?;
            let subtopic = Subtopic::from_new(new, now);
            parent.subtopic_ids.push(subtopic.id);
            parent.updated_at = now;
            let parent = parent.clone();
            collections.subtopics.push(subtopic.clone());
            (subtopic, parent)
        };
        self.enqueue(SyncOp::UpsertSubtopic(subtopic.clone()));
        self.enqueue(SyncOp::UpsertTopic(parent));
        self.mirror_subtopics();
        self.mirror_topics();
        Ok(subtopic)
    }

    pub fn update_subtopic(&self, id: Uuid, patch: UpdateSubtopic) -> EngineResult<Subtopic> {
        patch.validate()?;
        let subtopic = {
            let mut collections = self.write();
            let subtopic = collections
                .subtopics
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(|| EngineError::NotFound(format!("subtopic {id}")))?;
            subtopic.apply(patch, OffsetDateTime::now_utc());
            subtopic.clone()
        };
        self.enqueue(SyncOp::UpsertSubtopic(subtopic.clone()));
        self.mirror_subtopics();
        Ok(subtopic)
    }

    /// Removes the subtopic, its questions and KPIs, and the link from
    /// the parent topic.
    pub fn delete_subtopic(&self, id: Uuid) -> EngineResult<()> {
        let now = OffsetDateTime::now_utc();
        let (parent, question_ids, kpi_ids) = {
            let mut collections = self.write();
            let subtopic = collections
                .subtopics
                .iter()
                .find(|s| s.id == id)
                .cloned()
                .ok_or_else(|| EngineError::NotFound(format!("subtopic {id}")))?;
            collections.subtopics.retain(|s| s.id != id);

            let parent = collections
                .topics
                .iter_mut()
                .find(|t| t.id == subtopic.topic_id)
                .map(|t| {
                    t.subtopic_ids.retain(|sid| *sid != id);
                    t.updated_at = now;
                    t.clone()
                });

            let question_ids: Vec<Uuid> = collections
                .questions
                .iter()
                .filter(|q| q.subtopic_id == id)
                .map(|q| q.id)
                .collect();
            let kpi_ids: Vec<Uuid> = collections
                .kpis
                .iter()
                .filter(|k| k.subtopic_id == id)
                .map(|k| k.id)
                .collect();
            collections.questions.retain(|q| q.subtopic_id != id);
            collections.kpis.retain(|k| k.subtopic_id != id);
            (parent, question_ids, kpi_ids)
        };

        self.enqueue(SyncOp::DeleteSubtopic(id));
        if let Some(parent) = parent {
            self.enqueue(SyncOp::UpsertTopic(parent));
        }
        for qid in question_ids {
            self.enqueue(SyncOp::DeleteQuestion(qid));
        }
        for kid in kpi_ids {
            self.enqueue(SyncOp::DeleteKpi(kid));
        }
        self.mirror_subtopics();
        self.mirror_topics();
        self.mirror_questions();
        self.mirror_kpis();
        Ok(())
    }

    // ----- questions -----

    pub fn add_question(&self, new: NewQuestion) -> EngineResult<Question> {
        new.validate()?;
        let question = {
            let mut collections = self.write();
            if !collections.topics.iter().any(|t| t.id == new.topic_id) {
                return Err(EngineError::NotFound(format!("topic {}", new.topic_id)));
            }
            if !collections
                .subtopics
                .iter()
                .any(|s| s.id == new.subtopic_id)
            {
                return Err(EngineError::NotFound(format!(
                    "subtopic {}",
                    new.subtopic_id
                )));
            }
            let question = Question::from_new(new, OffsetDateTime::now_utc());
            collections.questions.push(question.clone());
            question
        };
        self.enqueue(SyncOp::UpsertQuestion(question.clone()));
        self.mirror_questions();
        Ok(question)
    }

    pub fn update_question(&self, id: Uuid, patch: UpdateQuestion) -> EngineResult<Question> {
        patch.validate()?;
        let question = {
            let mut collections = self.write();
            let question = collections
                .questions
                .iter_mut()
                .find(|q| q.id == id)
                .ok_or_else(|| EngineError::NotFound(format!("question {id}")))?;
            question.apply(patch, OffsetDateTime::now_utc());
            question.clone()
        };
        self.enqueue(SyncOp::UpsertQuestion(question.clone()));
        self.mirror_questions();
        Ok(question)
    }

    /// Removes the question and scrubs it from every KPI's
    /// `connected_questions` list, keeping the link symmetric.
    pub fn delete_question(&self, id: Uuid) -> EngineResult<()> {
        let now = OffsetDateTime::now_utc();
        let touched_kpis = {
            let mut collections = self.write();
            if !collections.questions.iter().any(|q| q.id == id) {
                return Err(EngineError::NotFound(format!("question {id}")));
            }
            collections.questions.retain(|q| q.id != id);

            let mut touched = Vec::new();
            for kpi in &mut collections.kpis {
                if kpi.connected_questions.contains(&id) {
                    kpi.connected_questions.retain(|qid| *qid != id);
                    kpi.updated_at = now;
                    touched.push(kpi.clone());
                }
            }
            touched
        };

        self.enqueue(SyncOp::DeleteQuestion(id));
        for kpi in touched_kpis {
            self.enqueue(SyncOp::UpsertKpi(kpi));
        }
        self.mirror_questions();
        self.mirror_kpis();
        Ok(())
    }

    // ----- KPIs -----

    pub fn add_kpi(&self, new: NewKpi) -> EngineResult<Kpi> {
        new.validate()?;
        if new.subtopic_id.is_nil() {
            return Err(EngineError::Validation(
                "KPI must belong to a subtopic".to_string(),
            ));
        }
        let kpi = {
            let mut collections = self.write();
            if !collections
                .subtopics
                .iter()
                .any(|s| s.id == new.subtopic_id)
            {
                return Err(EngineError::NotFound(format!(
                    "subtopic {}",
                    new.subtopic_id
                )));
            }
            let kpi = Kpi::from_new(new, OffsetDateTime::now_utc());
            collections.kpis.push(kpi.clone());
            kpi
        };
        self.enqueue(SyncOp::UpsertKpi(kpi.clone()));
        self.mirror_kpis();
        Ok(kpi)
    }

    pub fn update_kpi(&self, id: Uuid, patch: UpdateKpi) -> EngineResult<Kpi> {
        patch.validate()?;
        let kpi = {
            let mut collections = self.write();
            let kpi = collections
                .kpis
                .iter_mut()
                .find(|k| k.id == id)
                .ok_or_else(|| EngineError::NotFound(format!("KPI {id}")))?;
            kpi.apply(patch, OffsetDateTime::now_utc());
            kpi.clone()
        };
        self.enqueue(SyncOp::UpsertKpi(kpi.clone()));
        self.mirror_kpis();
        Ok(kpi)
    }

    /// Removes the KPI and scrubs it from every question's
    /// `connected_kpis` list.
    pub fn delete_kpi(&self, id: Uuid) -> EngineResult<()> {
        let now = OffsetDateTime::now_utc();
        let touched_questions = {
            let mut collections = self.write();
            if !collections.kpis.iter().any(|k| k.id == id) {
                return Err(EngineError::NotFound(format!("KPI {id}")));
            }
            collections.kpis.retain(|k| k.id != id);

            let mut touched = Vec::new();
            for question in &mut collections.questions {
                if question.connected_kpis.contains(&id) {
                    question.connected_kpis.retain(|kid| *kid != id);
                    question.updated_at = now;
                    touched.push(question.clone());
                }
            }
            touched
        };

        self.enqueue(SyncOp::DeleteKpi(id));
        for question in touched_questions {
            self.enqueue(SyncOp::UpsertQuestion(question));
        }
        self.mirror_kpis();
        self.mirror_questions();
        Ok(())
    }

    /// Create the symmetric KPI↔question link. Idempotent: an existing
    /// link is left untouched without enqueuing anything.
    pub fn connect_kpi_question(&self, kpi_id: Uuid, question_id: Uuid) -> EngineResult<()> {
        let now = OffsetDateTime::now_utc();
        let pair = {
            let mut collections = self.write();
            if !collections.kpis.iter().any(|k| k.id == kpi_id) {
                return Err(EngineError::NotFound(format!("KPI {kpi_id}")));
            }
            if !collections.questions.iter().any(|q| q.id == question_id) {
                return Err(EngineError::NotFound(format!("question {question_id}")));
            }

            let kpi = collections
                .kpis
                .iter_mut()
                .find(|k| k.id == kpi_id)
                .ok_or_else(|| EngineError::NotFound(format!("KPI {kpi_id}")))?;
            if kpi.connected_questions.contains(&question_id) {
                None
            } else {
                kpi.connected_questions.push(question_id);
                kpi.updated_at = now;
                let kpi = kpi.clone();

                let question = collections
                    .questions
                    .iter_mut()
                    .find(|q| q.id == question_id)
                    .ok_or_else(|| EngineError::NotFound(format!("question {question_id}")))?;
                if !question.connected_kpis.contains(&kpi_id) {
                    question.connected_kpis.push(kpi_id);
                }
                question.updated_at = now;
                Some((kpi, question.clone()))
            }
        };

        if let Some((kpi, question)) = pair {
            self.enqueue(SyncOp::UpsertKpi(kpi));
            self.enqueue(SyncOp::UpsertQuestion(question));
            self.mirror_kpis();
            self.mirror_questions();
        }
        Ok(())
    }

    /// Remove the symmetric link. Also idempotent.
    pub fn disconnect_kpi_question(&self, kpi_id: Uuid, question_id: Uuid) -> EngineResult<()> {
        let now = OffsetDateTime::now_utc();
        let pair = {
            let mut collections = self.write();
            if !collections.kpis.iter().any(|k| k.id == kpi_id) {
                return Err(EngineError::NotFound(format!("KPI {kpi_id}")));
            }
            if !collections.questions.iter().any(|q| q.id == question_id) {
                return Err(EngineError::NotFound(format!("question {question_id}")));
            }

            let kpi = collections
                .kpis
                .iter_mut()
                .find(|k| k.id == kpi_id)
                .ok_or_else(|| EngineError::NotFound(format!("KPI {kpi_id}")))?;
            if !kpi.connected_questions.contains(&question_id) {
                None
            } else {
                kpi.connected_questions.retain(|qid| *qid != question_id);
                kpi.updated_at = now;
                let kpi = kpi.clone();

                let question = collections
                    .questions
                    .iter_mut()
                    .find(|q| q.id == question_id)
                    .ok_or_else(|| EngineError::NotFound(format!("question {question_id}")))?;
                question.connected_kpis.retain(|kid| *kid != kpi_id);
                question.updated_at = now;
                Some((kpi, question.clone()))
            }
        };

        if let Some((kpi, question)) = pair {
            self.enqueue(SyncOp::UpsertKpi(kpi));
            self.enqueue(SyncOp::UpsertQuestion(question));
            self.mirror_kpis();
            self.mirror_questions();
        }
        Ok(())
    }

    // ----- company codes -----

    pub fn add_company_code(&self, new: NewCompanyCode) -> EngineResult<CompanyCode> {
        new.validate()?;
        let code = {
            let mut collections = self.write();
            if collections
                .company_codes
                .iter()
                .any(|c| c.code.eq_ignore_ascii_case(&new.code))
            {
                return Err(EngineError::Conflict(format!(
                    "company code {} already exists",
                    new.code
                )));
            }
            let code = CompanyCode::from_new(new, OffsetDateTime::now_utc());
            collections.company_codes.push(code.clone());
            code
        };
        self.enqueue(SyncOp::UpsertCompanyCode(code.clone()));
        self.mirror_company_codes();
        Ok(code)
    }

    /// Updating a code's authorized list also retires the accounts whose
    /// address was removed, best effort: a failed account removal is
    /// logged, the code update itself stands.
    pub fn update_company_code(
        &self,
        id: Uuid,
        patch: UpdateCompanyCode,
    ) -> EngineResult<CompanyCode> {
        patch.validate()?;
        let (code, removed_emails) = {
            let mut collections = self.write();
            let code = collections
                .company_codes
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| EngineError::NotFound(format!("company code {id}")))?;
            let before = code.authorized_emails.clone();
            code.apply(patch, OffsetDateTime::now_utc());
            let removed: Vec<String> = before
                .into_iter()
                .filter(|old| {
                    !code
                        .authorized_emails
                        .iter()
                        .any(|new| new.eq_ignore_ascii_case(old))
                })
                .collect();
            (code.clone(), removed)
        };

        self.enqueue(SyncOp::UpsertCompanyCode(code.clone()));
        self.mirror_company_codes();

        for email in removed_emails {
            match self.remove_user_by_email(&email) {
                Ok(()) | Err(EngineError::NotFound(_)) => {}
                Err(e) => {
                    let inconsistency = EngineError::CascadeInconsistency(format!(
                        "account for deauthorized email {email} not removed: {e}"
                    ));
                    warn!(error = %inconsistency, "Company code update left a dangling account");
                }
            }
        }
        Ok(code)
    }

    pub fn delete_company_code(&self, id: Uuid) -> EngineResult<()> {
        {
            let mut collections = self.write();
            if !collections.company_codes.iter().any(|c| c.id == id) {
                return Err(EngineError::NotFound(format!("company code {id}")));
            }
            collections.company_codes.retain(|c| c.id != id);
        }
        self.enqueue(SyncOp::DeleteCompanyCode(id));
        self.mirror_company_codes();
        Ok(())
    }

    // ----- sample answers and training examples -----

    pub fn add_sample_answer(&self, new: NewSampleAnswer) -> EngineResult<SampleAnswer> {
        new.validate()?;
        let sample = {
            let mut collections = self.write();
            if !collections
                .questions
                .iter()
                .any(|q| q.id == new.question_id)
            {
                return Err(EngineError::NotFound(format!(
                    "question {}",
                    new.question_id
                )));
            }
            let sample = SampleAnswer::from_new(new, OffsetDateTime::now_utc());
            collections.sample_answers.push(sample.clone());
            sample
        };
        self.enqueue(SyncOp::UpsertSampleAnswer(sample.clone()));
        self.mirror_sample_answers();
        Ok(sample)
    }

    pub fn update_sample_answer(
        &self,
        id: Uuid,
        patch: UpdateSampleAnswer,
    ) -> EngineResult<SampleAnswer> {
        patch.validate()?;
        let sample = {
            let mut collections = self.write();
            let sample = collections
                .sample_answers
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(|| EngineError::NotFound(format!("sample answer {id}")))?;
            sample.apply(patch, OffsetDateTime::now_utc());
            sample.clone()
        };
        self.enqueue(SyncOp::UpsertSampleAnswer(sample.clone()));
        self.mirror_sample_answers();
        Ok(sample)
    }

    pub fn delete_sample_answer(&self, id: Uuid) -> EngineResult<()> {
        {
            let mut collections = self.write();
            if !collections.sample_answers.iter().any(|s| s.id == id) {
                return Err(EngineError::NotFound(format!("sample answer {id}")));
            }
            collections.sample_answers.retain(|s| s.id != id);
        }
        self.enqueue(SyncOp::DeleteSampleAnswer(id));
        self.mirror_sample_answers();
        Ok(())
    }

    pub fn add_training_example(&self, new: NewTrainingExample) -> EngineResult<TrainingExample> {
        new.validate()?;
        let example = {
            let mut collections = self.write();
            if !collections
                .questions
                .iter()
                .any(|q| q.id == new.question_id)
            {
                return Err(EngineError::NotFound(format!(
                    "question {}",
                    new.question_id
                )));
            }
            let example = TrainingExample::from_new(new, OffsetDateTime::now_utc());
            collections.training_examples.push(example.clone());
            example
        };
        self.enqueue(SyncOp::UpsertTrainingExample(example.clone()));
        self.mirror_training_examples();
        Ok(example)
    }

    pub fn update_training_example(
        &self,
        id: Uuid,
        patch: UpdateTrainingExample,
    ) -> EngineResult<TrainingExample> {
        patch.validate()?;
        let example = {
            let mut collections = self.write();
            let example = collections
                .training_examples
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or_else(|| EngineError::NotFound(format!("training example {id}")))?;
            example.apply(patch, OffsetDateTime::now_utc());
            example.clone()
        };
        self.enqueue(SyncOp::UpsertTrainingExample(example.clone()));
        self.mirror_training_examples();
        Ok(example)
    }

    pub fn delete_training_example(&self, id: Uuid) -> EngineResult<()> {
        {
            let mut collections = self.write();
            if !collections.training_examples.iter().any(|e| e.id == id) {
                return Err(EngineError::NotFound(format!("training example {id}")));
            }
            collections.training_examples.retain(|e| e.id != id);
        }
        self.enqueue(SyncOp::DeleteTrainingExample(id));
        self.mirror_training_examples();
        Ok(())
    }

    // ----- users -----

    /// Create a user profile. If the profile carries a company code, the
    /// code must exist and admit the email (active, unexpired, email on
    /// the list, a seat free).
    pub fn add_user(&self, new: NewUserProfile) -> EngineResult<UserProfile> {
        new.validate()?;
        let now = OffsetDateTime::now_utc();
        let user = {
            let mut collections = self.write();
            if collections
                .users
                .iter()
                .any(|u| u.email.eq_ignore_ascii_case(&new.email))
            {
                return Err(EngineError::Conflict(format!(
                    "email {} is already registered",
                    new.email
                )));
            }

            let company_name = match &new.company_code {
                Some(code_value) => {
                    let code = collections
                        .company_codes
                        .iter()
                        .find(|c| c.code.eq_ignore_ascii_case(code_value))
                        .ok_or_else(|| {
                            EngineError::NotFound(format!("company code {code_value}"))
                        })?;
                    let seats_taken = collections
                        .users
                        .iter()
                        .filter(|u| {
                            u.company_code
                                .as_deref()
                                .is_some_and(|c| c.eq_ignore_ascii_case(&code.code))
                        })
                        .count();
                    if !code.admits(&new.email, seats_taken, now) {
                        return Err(EngineError::Validation(format!(
                            "company code {} does not admit {}",
                            code.code, new.email
                        )));
                    }
                    Some(code.company_name.clone())
                }
                None => None,
            };

            let user = UserProfile::from_new(new, company_name, now);
            collections.users.push(user.clone());
            user
        };
        self.enqueue(SyncOp::UpsertUser(user.clone()));
        self.mirror_users();
        Ok(user)
    }

    pub fn update_user(&self, id: Uuid, patch: UpdateUserProfile) -> EngineResult<UserProfile> {
        patch.validate()?;
        let user = {
            let mut collections = self.write();
            let user = collections
                .users
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or_else(|| EngineError::NotFound(format!("user {id}")))?;
            user.apply(patch, OffsetDateTime::now_utc());
            user.clone()
        };
        self.enqueue(SyncOp::UpsertUser(user.clone()));
        self.mirror_users();
        Ok(user)
    }

    /// Removes the account and any subscription attached to it.
    pub fn delete_user(&self, id: Uuid) -> EngineResult<()> {
        let subscription_ids = {
            let mut collections = self.write();
            if !collections.users.iter().any(|u| u.id == id) {
                return Err(EngineError::NotFound(format!("user {id}")));
            }
            collections.users.retain(|u| u.id != id);

            let subscription_ids: Vec<Uuid> = collections
                .subscriptions
                .iter()
                .filter(|s| s.user_id == id)
                .map(|s| s.id)
                .collect();
            collections.subscriptions.retain(|s| s.user_id != id);
            subscription_ids
        };

        self.enqueue(SyncOp::DeleteUser(id));
        for sid in subscription_ids {
            self.enqueue(SyncOp::DeleteSubscription(sid));
        }
        self.mirror_users();
        self.mirror_subscriptions();
        Ok(())
    }

    pub(crate) fn remove_user_by_email(&self, email: &str) -> EngineResult<()> {
        let id = self
            .read()
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(|u| u.id)
            .ok_or_else(|| EngineError::NotFound(format!("user {email}")))?;
        self.delete_user(id)
    }

    // ----- subscriptions -----

    /// One subscription per user; registering a second is a conflict.
    pub fn add_subscription(&self, subscription: Subscription) -> EngineResult<Subscription> {
        {
            let mut collections = self.write();
            if collections
                .subscriptions
                .iter()
                .any(|s| s.user_id == subscription.user_id)
            {
                return Err(EngineError::Conflict(format!(
                    "user {} already has a subscription",
                    subscription.user_id
                )));
            }
            collections.subscriptions.push(subscription.clone());
        }
        self.enqueue(SyncOp::UpsertSubscription(subscription.clone()));
        self.mirror_subscriptions();
        Ok(subscription)
    }

    /// Apply an in-place edit to a user's subscription and persist it.
    /// The subscription lifecycle layer funnels every extension, expiry
    /// flip and reminder flag through here.
    pub fn mutate_subscription(
        &self,
        user_id: Uuid,
        edit: impl FnOnce(&mut Subscription),
    ) -> EngineResult<Subscription> {
        let subscription = {
            let mut collections = self.write();
            let subscription = collections
                .subscriptions
                .iter_mut()
                .find(|s| s.user_id == user_id)
                .ok_or_else(|| {
                    EngineError::NotFound(format!("subscription for user {user_id}"))
                })?;
            edit(subscription);
            subscription.updated_at = OffsetDateTime::now_utc();
            subscription.clone()
        };
        self.enqueue(SyncOp::UpsertSubscription(subscription.clone()));
        self.mirror_subscriptions();
        Ok(subscription)
    }

    pub fn subscription_for_user(&self, user_id: Uuid) -> Option<Subscription> {
        self.read()
            .subscriptions
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned()
    }

    // ----- cache mirroring -----

    fn mirror_topics(&self) {
        let snapshot = self.read().topics.clone();
        self.cache().save(keys::TOPICS, &snapshot);
    }

    fn mirror_subtopics(&self) {
        let snapshot = self.read().subtopics.clone();
        self.cache().save(keys::SUBTOPICS, &snapshot);
    }

    fn mirror_questions(&self) {
        let snapshot = self.read().questions.clone();
        self.cache().save(keys::QUESTIONS, &snapshot);
    }

    fn mirror_kpis(&self) {
        let snapshot = self.read().kpis.clone();
        self.cache().save(keys::KPIS, &snapshot);
    }

    fn mirror_company_codes(&self) {
        let snapshot = self.read().company_codes.clone();
        self.cache().save(keys::COMPANY_CODES, &snapshot);
    }

    fn mirror_sample_answers(&self) {
        let snapshot = self.read().sample_answers.clone();
        self.cache().save(keys::SAMPLE_ANSWERS, &snapshot);
    }

    fn mirror_training_examples(&self) {
        let snapshot = self.read().training_examples.clone();
        self.cache().save(keys::TRAINING_EXAMPLES, &snapshot);
    }

    fn mirror_users(&self) {
        let snapshot = self.read().users.clone();
        self.cache().save(keys::USERS, &snapshot);
    }

    fn mirror_subscriptions(&self) {
        let snapshot = self.read().subscriptions.clone();
        self.cache().save(keys::SUBSCRIPTIONS, &snapshot);
    }
}
