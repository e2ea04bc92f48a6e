//! Analysis session: user selections plus the three-step remote pipeline.

pub mod controller;
pub mod state;

pub use controller::AnalysisSession;
pub use state::PipelineStep;
