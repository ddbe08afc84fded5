//! The study engine: session lifecycle, review recording, speed batch
//! reconciliation, due card selection and analytics.

mod analytics;
mod due;
mod engine;
pub mod error;
pub mod memory;
pub mod model;
pub mod pg;
mod review;
pub mod routes;
mod sessions;
mod speed;
pub mod store;

pub use analytics::{DeckAnalytics, UserStats, WeeklyActivity};
pub use engine::StudyEngine;
pub use error::{Resource, StoreError, StudyError};
pub use memory::MemoryStudyStore;
pub use pg::PgStudyStore;
pub use routes::routes;
pub use sessions::{FinalCounters, SessionEnded, SessionStarted};
pub use speed::{CardOutcome, SpeedAck, SpeedSubmission};
pub use store::{StudyStore, StudyTx};
