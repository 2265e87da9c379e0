pub mod batching;
pub mod builder;
pub mod classifier;
pub mod config;
pub mod error;
pub mod fees;
pub mod orchestrator;
pub mod params;
pub mod signer;
pub mod types;
pub mod utils;

pub use config::EngineConfig;
pub use error::ClaimError;
pub use orchestrator::ClaimEngine;
pub use types::{Batch, CandidateAccount, ClaimProgress, ClaimSession, FeePreview, SessionState};
