//! # forge_core
//!
//! The orchestration core: job state machine, fixed five-stage generation
//! pipeline, log/progress event hub, and the trait seams for the external
//! agent executor and prompt analyzer.
//!
//! A submitted prompt becomes a [`job::Job`] in `analyzing` state with a
//! background task driving it through the [`stage::Stage`] pipeline. Stage
//! outputs are normalized (`forge_normalize`), merged, validated
//! (`forge_validate`) with one bounded auto-fix cycle, post-processed, and
//! stored as results. Jobs always end terminal: `completed` or `failed`.

pub mod error;
pub mod events;
pub mod executor;
pub mod job;
pub mod orchestrator;
pub mod requirements;
pub mod stage;
pub mod store;

pub use error::{AgentError, CoreError, CoreResult};
pub use events::{
    ClientMessage, ClientReply, EventHub, JobEvent, LogEntry, LogStatus, ProgressSnapshot,
};
pub use executor::{AgentExecutor, PromptAnalyzer};
pub use job::{Job, JobId, JobResults, JobStatus};
pub use orchestrator::{FixOutcome, Orchestrator};
pub use requirements::Requirements;
pub use stage::{Stage, StageContext, StageTask};
pub use store::JobStore;
