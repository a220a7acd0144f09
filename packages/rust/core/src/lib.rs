//! Pipeline orchestration for CourseBuilder.
//!
//! A [`Pipeline`] runs an ordered list of [`Stage`]s against one
//! [`PipelineContext`]. Stages see the context read-only and hand back a
//! [`StageOutput`]; the pipeline stores it, enforcing that each context slot
//! is written once by its owning stage.

pub mod context;
pub mod pipeline;
pub mod stages;

pub use context::{PipelineContext, Produced, Slot, StageOutput};
pub use pipeline::{Pipeline, PipelineRun, PipelineState, ProgressReporter, SilentProgress};
pub use stages::{Stage, StageContext, StageId, standard_stages};
