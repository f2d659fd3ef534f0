//! Form analysis pipeline.
//!
//! Every step is a pure function over immutable inputs; [`Pipeline`] runs
//! them in order for one scan.

pub mod checkbox;
pub mod classify;
pub mod flatten;
pub mod labels;
pub mod matching;
pub mod orchestrator;
pub mod spatial;

use thiserror::Error;

pub use flatten::{FlattenError, PatientData};
pub use matching::{FuzzyMatcher, MatchResult};
pub use orchestrator::{AnalysisOutput, Pipeline};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Background analysis failed: {0}")]
    Background(#[from] tokio::task::JoinError),
}
