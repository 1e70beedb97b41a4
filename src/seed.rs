//! Bundled seed data: the last-resort tier of the startup fallback
//! chain (remote → cache → seed). One realistic IPMA Level C topic tree
//! with symmetric KPI↔question links, plus a demo company code.

use once_cell::sync::Lazy;
use time::macros::datetime;
use time::OffsetDateTime;
use uuid::{uuid, Uuid};

use crate::models::{CompanyCode, Kpi, Question, SampleAnswer, Subtopic, Topic, TrainingExample};

const SEEDED_AT: OffsetDateTime = datetime!(2026-01-05 09:00 UTC);

pub const RISK_TOPIC_ID: Uuid = uuid!("5f0c1a8e-92d4-4b7e-8a3f-1c6d2e9b4a01");
pub const RISK_IDENTIFICATION_ID: Uuid = uuid!("5f0c1a8e-92d4-4b7e-8a3f-1c6d2e9b4a02");
pub const RISK_RESPONSE_ID: Uuid = uuid!("5f0c1a8e-92d4-4b7e-8a3f-1c6d2e9b4a03");

const Q_REGISTER: Uuid = uuid!("5f0c1a8e-92d4-4b7e-8a3f-1c6d2e9b4a11");
const Q_STAKEHOLDER: Uuid = uuid!("5f0c1a8e-92d4-4b7e-8a3f-1c6d2e9b4a12");
const Q_QUALITATIVE: Uuid = uuid!("5f0c1a8e-92d4-4b7e-8a3f-1c6d2e9b4a13");
const Q_STRATEGY: Uuid = uuid!("5f0c1a8e-92d4-4b7e-8a3f-1c6d2e9b4a14");
const Q_CONTINGENCY: Uuid = uuid!("5f0c1a8e-92d4-4b7e-8a3f-1c6d2e9b4a15");
const Q_OPPORTUNITY: Uuid = uuid!("5f0c1a8e-92d4-4b7e-8a3f-1c6d2e9b4a16");

const K_SOURCES: Uuid = uuid!("5f0c1a8e-92d4-4b7e-8a3f-1c6d2e9b4a21");
const K_ASSESSMENT: Uuid = uuid!("5f0c1a8e-92d4-4b7e-8a3f-1c6d2e9b4a22");
const K_RESPONSES: Uuid = uuid!("5f0c1a8e-92d4-4b7e-8a3f-1c6d2e9b4a23");
const K_OWNERSHIP: Uuid = uuid!("5f0c1a8e-92d4-4b7e-8a3f-1c6d2e9b4a24");

static TOPICS: Lazy<Vec<Topic>> = Lazy::new(|| {
    vec![Topic {
        id: RISK_TOPIC_ID,
        title: "Risk and Opportunity Management".to_string(),
        description: Some(
            "Identifying, assessing and responding to project risks and opportunities"
                .to_string(),
        ),
        is_active: true,
        subtopic_ids: vec![RISK_IDENTIFICATION_ID, RISK_RESPONSE_ID],
        created_at: SEEDED_AT,
        updated_at: SEEDED_AT,
    }]
});

static SUBTOPICS: Lazy<Vec<Subtopic>> = Lazy::new(|| {
    vec![
        Subtopic {
            id: RISK_IDENTIFICATION_ID,
            topic_id: RISK_TOPIC_ID,
            title: "Risk Identification and Assessment".to_string(),
            description: Some("Finding risk sources and judging their weight".to_string()),
            is_active: true,
            created_at: SEEDED_AT,
            updated_at: SEEDED_AT,
        },
        Subtopic {
            id: RISK_RESPONSE_ID,
            topic_id: RISK_TOPIC_ID,
            title: "Risk Response Planning".to_string(),
            description: Some("Choosing and owning treatment strategies".to_string()),
            is_active: true,
            created_at: SEEDED_AT,
            updated_at: SEEDED_AT,
        },
    ]
});

static QUESTIONS: Lazy<Vec<Question>> = Lazy::new(|| {
    let question = |id, subtopic_id, prompt: &str, kpis: Vec<Uuid>| Question {
        id,
        topic_id: RISK_TOPIC_ID,
        subtopic_id,
        prompt: prompt.to_string(),
        is_active: true,
        connected_kpis: kpis,
        created_at: SEEDED_AT,
        updated_at: SEEDED_AT,
    };

    vec![
        question(
            Q_REGISTER,
            RISK_IDENTIFICATION_ID,
            "Describe how you would build and maintain a risk register for a \
             mid-sized infrastructure project.",
            vec![K_SOURCES, K_ASSESSMENT],
        ),
        question(
            Q_STAKEHOLDER,
            RISK_IDENTIFICATION_ID,
            "Which stakeholders would you involve in a risk identification \
             workshop, and why?",
            vec![K_SOURCES],
        ),
        question(
            Q_QUALITATIVE,
            RISK_IDENTIFICATION_ID,
            "Explain qualitative risk assessment and when you would prefer it \
             over a quantitative analysis.",
            vec![K_ASSESSMENT],
        ),
        question(
            Q_STRATEGY,
            RISK_RESPONSE_ID,
            "Compare the avoid, transfer, mitigate and accept strategies using \
             an example from your own practice.",
            vec![K_RESPONSES],
        ),
        question(
            Q_CONTINGENCY,
            RISK_RESPONSE_ID,
            "How do you size a contingency reserve, and who should control its \
             release?",
            vec![K_RESPONSES, K_OWNERSHIP],
        ),
        question(
            Q_OPPORTUNITY,
            RISK_RESPONSE_ID,
            "Give an example of an opportunity response plan and how you would \
             track its realisation.",
            vec![K_OWNERSHIP],
        ),
    ]
});

static KPIS: Lazy<Vec<Kpi>> = Lazy::new(|| {
    let kpi = |id, subtopic_id, name: &str, is_essential, questions: Vec<Uuid>| Kpi {
        id,
        topic_id: RISK_TOPIC_ID,
        subtopic_id,
        name: name.to_string(),
        is_essential,
        connected_questions: questions,
        created_at: SEEDED_AT,
        updated_at: SEEDED_AT,
    };

    // connected_questions mirrors Question.connected_kpis exactly.
    vec![
        kpi(
            K_SOURCES,
            RISK_IDENTIFICATION_ID,
            "Identifies risk sources systematically",
            true,
            vec![Q_REGISTER, Q_STAKEHOLDER],
        ),
        kpi(
            K_ASSESSMENT,
            RISK_IDENTIFICATION_ID,
            "Assesses probability and impact",
            true,
            vec![Q_REGISTER, Q_QUALITATIVE],
        ),
        kpi(
            K_RESPONSES,
            RISK_RESPONSE_ID,
            "Selects appropriate response strategies",
            true,
            vec![Q_STRATEGY, Q_CONTINGENCY],
        ),
        kpi(
            K_OWNERSHIP,
            RISK_RESPONSE_ID,
            "Assigns ownership and follows up",
            false,
            vec![Q_CONTINGENCY, Q_OPPORTUNITY],
        ),
    ]
});

static COMPANY_CODES: Lazy<Vec<CompanyCode>> = Lazy::new(|| {
    vec![CompanyCode {
        id: uuid!("5f0c1a8e-92d4-4b7e-8a3f-1c6d2e9b4a31"),
        code: "DEMO2026".to_string(),
        company_name: "ExamPrep Demo".to_string(),
        admin_email: "demo-admin@examprep.example".to_string(),
        max_users: 25,
        expires_at: datetime!(2026-12-31 23:59 UTC),
        is_active: true,
        authorized_emails: vec!["demo-learner@examprep.example".to_string()],
        created_at: SEEDED_AT,
        updated_at: SEEDED_AT,
    }]
});

static SAMPLE_ANSWERS: Lazy<Vec<SampleAnswer>> = Lazy::new(|| {
    vec![SampleAnswer {
        id: uuid!("5f0c1a8e-92d4-4b7e-8a3f-1c6d2e9b4a41"),
        question_id: Q_REGISTER,
        answer_text: "A risk register starts from a structured identification pass \
                      (checklists, lessons learned, stakeholder workshops), records \
                      each risk with owner, probability, impact and response, and is \
                      reviewed at every steering cadence."
            .to_string(),
        kpis_covered: vec![K_SOURCES, K_ASSESSMENT],
        created_at: SEEDED_AT,
        updated_at: SEEDED_AT,
    }]
});

static TRAINING_EXAMPLES: Lazy<Vec<TrainingExample>> = Lazy::new(|| {
    vec![TrainingExample {
        id: uuid!("5f0c1a8e-92d4-4b7e-8a3f-1c6d2e9b4a51"),
        question_id: Q_REGISTER,
        answer_text: "I would write down the risks I can think of in a spreadsheet."
            .to_string(),
        kpis_detected: vec![K_SOURCES],
        score: 1,
        created_at: SEEDED_AT,
        updated_at: SEEDED_AT,
    }]
});

pub fn topics() -> Vec<Topic> {
    TOPICS.clone()
}

pub fn subtopics() -> Vec<Subtopic> {
    SUBTOPICS.clone()
}

pub fn questions() -> Vec<Question> {
    QUESTIONS.clone()
}

pub fn kpis() -> Vec<Kpi> {
    KPIS.clone()
}

pub fn company_codes() -> Vec<CompanyCode> {
    COMPANY_CODES.clone()
}

pub fn sample_answers() -> Vec<SampleAnswer> {
    SAMPLE_ANSWERS.clone()
}

pub fn training_examples() -> Vec<TrainingExample> {
    TRAINING_EXAMPLES.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kpi_question_links_are_symmetric() {
        for kpi in kpis() {
            for qid in &kpi.connected_questions {
                let question = questions().into_iter().find(|q| q.id == *qid).unwrap();
                assert!(question.connected_kpis.contains(&kpi.id));
            }
        }
        for question in questions() {
            for kid in &question.connected_kpis {
                let kpi = kpis().into_iter().find(|k| k.id == *kid).unwrap();
                assert!(kpi.connected_questions.contains(&question.id));
            }
        }
    }

    #[test]
    fn every_subtopic_belongs_to_a_seed_topic() {
        for subtopic in subtopics() {
            assert!(topics().iter().any(|t| t.id == subtopic.topic_id));
        }
    }
}
