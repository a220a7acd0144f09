//! Stage orchestration: config → context → twelve stages → finished site.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, instrument};

use coursebuilder_generation::Generator;
use coursebuilder_shared::{
    ArtifactMeta, CourseBuilderError, PipelineConfig, Result, StageTiming,
};
use coursebuilder_site::SiteLayout;

use crate::context::PipelineContext;
use crate::stages::{Stage, StageContext, StageId, standard_stages};

/// Where a run is in its linear stage chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    NotStarted,
    Running(StageId),
    Completed(StageId),
    AllDone,
    Failed(StageId),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AllDone | Self::Failed(_))
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called before a stage runs. `index` is 1-based.
    fn stage_started(&self, stage: StageId, index: usize, total: usize);
    /// Called after a stage's output has been stored.
    fn stage_finished(&self, stage: StageId, elapsed: Duration);
    /// Called when a stage fails; no further stages run.
    fn stage_failed(&self, stage: StageId, error: &CourseBuilderError);
    /// Called once after the last stage succeeds.
    fn done(&self, run: &PipelineRun);
    /// Every state transition, in order.
    fn state_changed(&self, _state: PipelineState) {}
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage_started(&self, _stage: StageId, _index: usize, _total: usize) {}
    fn stage_finished(&self, _stage: StageId, _elapsed: Duration) {}
    fn stage_failed(&self, _stage: StageId, _error: &CourseBuilderError) {}
    fn done(&self, _run: &PipelineRun) {}
}

/// Result of a successful run.
#[derive(Debug)]
pub struct PipelineRun {
    /// Final context with every slot filled.
    pub context: PipelineContext,
    /// Per-stage wall-clock time, in stage order.
    pub timings: Vec<StageTiming>,
    /// Every file written, in write order.
    pub artifacts: Vec<ArtifactMeta>,
    pub elapsed: Duration,
}

/// A fixed, ordered list of stages.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// The twelve standard stages.
    pub fn standard() -> Self {
        Self::with_stages(standard_stages())
    }

    /// A custom stage list, run in the given order.
    pub fn with_stages(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    pub fn stage_ids(&self) -> Vec<StageId> {
        self.stages.iter().map(|s| s.id()).collect()
    }

    /// Run every stage once, in order, stopping at the first failure.
    ///
    /// The configuration is validated before any stage starts. Files written
    /// by completed stages are left in place when a later stage fails.
    #[instrument(skip_all, fields(topic = %config.topic, chapters = config.chapters, stages = self.stages.len()))]
    pub async fn run(
        &self,
        config: PipelineConfig,
        generator: Arc<dyn Generator>,
        progress: &dyn ProgressReporter,
    ) -> Result<PipelineRun> {
        config.validate()?;

        let start = Instant::now();
        let layout = SiteLayout::new(config.output_dir.clone());
        let mut context = PipelineContext::new(config);
        let mut timings = Vec::with_capacity(self.stages.len());
        let total = self.stages.len();

        progress.state_changed(PipelineState::NotStarted);
        info!(output = %layout.root().display(), "starting pipeline");

        for (i, stage) in self.stages.iter().enumerate() {
            let id = stage.id();
            progress.state_changed(PipelineState::Running(id));
            progress.stage_started(id, i + 1, total);

            let stage_start = Instant::now();
            let outcome = {
                let cx = StageContext::new(&context, generator.clone(), &layout);
                stage.run(&cx).await
            };
            let outcome = outcome.and_then(|output| context.apply(id, output));

            if let Err(e) = outcome {
                error!(stage = %id, error = %e, "stage failed");
                progress.state_changed(PipelineState::Failed(id));
                progress.stage_failed(id, &e);
                return Err(CourseBuilderError::in_stage(id.name(), e));
            }

            let elapsed = stage_start.elapsed();
            info!(stage = %id, elapsed_ms = elapsed.as_millis() as u64, "stage complete");
            timings.push(StageTiming {
                stage: id.name().to_string(),
                elapsed_ms: elapsed.as_millis() as u64,
            });
            progress.state_changed(PipelineState::Completed(id));
            progress.stage_finished(id, elapsed);
        }

        let run = PipelineRun {
            artifacts: context.artifacts().to_vec(),
            context,
            timings,
            elapsed: start.elapsed(),
        };

        info!(
            artifacts = run.artifacts.len(),
            elapsed_ms = run.elapsed.as_millis() as u64,
            "pipeline complete"
        );
        progress.state_changed(PipelineState::AllDone);
        progress.done(&run);

        Ok(run)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}
