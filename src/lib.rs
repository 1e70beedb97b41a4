//! Offline-first core for an IPMA Level C exam preparation platform:
//! a client-side data synchronization engine plus a timed exam-attempt
//! state machine.
//!
//! The crate owns no UI and no transport. Embedders provide three
//! collaborators (a [`store::RemoteStore`], a [`cache::KeyValueStore`]
//! and an [`email::EmailSender`]) and get back an
//! [`AppState`](app_state::AppState) whose content snapshot is always
//! readable: startup falls back from the remote store to the local
//! cache to bundled seed data, and content edits apply in memory first
//! with remote persistence retried in the background. Exam attempts are
//! the exception and persist strictly, so a graded attempt is never
//! silently lost.

pub mod app_state;
pub mod cache;
pub mod config;
pub mod email;
pub mod engine;
pub mod error;
pub mod exam;
pub mod models;
pub mod seed;
pub mod store;
pub mod subscriptions;
pub mod telemetry;

pub use app_state::AppState;
pub use config::Config;
pub use error::{EngineError, EngineResult};
