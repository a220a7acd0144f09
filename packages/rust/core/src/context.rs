//! Shared pipeline context.
//!
//! Stages only ever see `&PipelineContext`. What a stage produces comes back
//! as a [`StageOutput`], and the orchestrator stores it via
//! [`PipelineContext::apply`], which checks that each slot is written once and
//! only by the stage that owns it.

use std::path::Path;

use coursebuilder_shared::{
    ArtifactMeta, ChapterOutline, Concept, CourseBuilderError, CourseDescription, PipelineConfig,
    Result, Simulation,
};

use crate::stages::StageId;

/// A context slot and the one stage allowed to fill it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Course,
    Concepts,
    Outlines,
    Simulations,
}

impl Slot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Course => "course description",
            Self::Concepts => "concepts",
            Self::Outlines => "chapter outlines",
            Self::Simulations => "simulations",
        }
    }

    /// The designated writer of this slot.
    pub fn writer(&self) -> StageId {
        match self {
            Self::Course => StageId::CourseDescription,
            Self::Concepts => StageId::LearningGraph,
            Self::Outlines => StageId::ChapterStructure,
            Self::Simulations => StageId::Simulations,
        }
    }
}

/// A value destined for one context slot.
#[derive(Debug, Clone)]
pub enum Produced {
    Course(CourseDescription),
    Concepts(Vec<Concept>),
    Outlines(Vec<ChapterOutline>),
    Simulations(Vec<Simulation>),
}

impl Produced {
    pub fn slot(&self) -> Slot {
        match self {
            Self::Course(_) => Slot::Course,
            Self::Concepts(_) => Slot::Concepts,
            Self::Outlines(_) => Slot::Outlines,
            Self::Simulations(_) => Slot::Simulations,
        }
    }
}

/// What a stage hands back to the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct StageOutput {
    pub produced: Vec<Produced>,
    pub artifacts: Vec<ArtifactMeta>,
}

impl StageOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, produced: Produced) -> Self {
        self.produced.push(produced);
        self
    }

    pub fn artifact(&mut self, meta: ArtifactMeta) {
        self.artifacts.push(meta);
    }
}

/// Record threaded through all stages of one run.
#[derive(Debug)]
pub struct PipelineContext {
    config: PipelineConfig,
    course: Option<CourseDescription>,
    concepts: Option<Vec<Concept>>,
    outlines: Option<Vec<ChapterOutline>>,
    simulations: Option<Vec<Simulation>>,
    artifacts: Vec<ArtifactMeta>,
}

impl PipelineContext {
    /// Fresh context with every slot empty.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            course: None,
            concepts: None,
            outlines: None,
            simulations: None,
            artifacts: Vec::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    pub fn course(&self) -> Option<&CourseDescription> {
        self.course.as_ref()
    }

    pub fn concepts(&self) -> Option<&[Concept]> {
        self.concepts.as_deref()
    }

    pub fn outlines(&self) -> Option<&[ChapterOutline]> {
        self.outlines.as_deref()
    }

    pub fn simulations(&self) -> Option<&[Simulation]> {
        self.simulations.as_deref()
    }

    /// Every file written so far, in write order.
    pub fn artifacts(&self) -> &[ArtifactMeta] {
        &self.artifacts
    }

    pub fn require_course(&self) -> Result<&CourseDescription> {
        self.course().ok_or_else(|| missing(Slot::Course))
    }

    pub fn require_concepts(&self) -> Result<&[Concept]> {
        self.concepts().ok_or_else(|| missing(Slot::Concepts))
    }

    pub fn require_outlines(&self) -> Result<&[ChapterOutline]> {
        self.outlines().ok_or_else(|| missing(Slot::Outlines))
    }

    /// Store a stage's output.
    ///
    /// Nothing is applied if any produced value targets a slot the stage
    /// does not own, a slot that is already filled, or a slot produced twice
    /// in the same output.
    pub fn apply(&mut self, stage: StageId, output: StageOutput) -> Result<()> {
        let mut seen: Vec<Slot> = Vec::with_capacity(output.produced.len());
        for produced in &output.produced {
            let slot = produced.slot();
            if slot.writer() != stage {
                return Err(CourseBuilderError::validation(format!(
                    "stage '{}' may not write the {} slot (owned by '{}')",
                    stage,
                    slot.name(),
                    slot.writer()
                )));
            }
            if self.is_filled(slot) || seen.contains(&slot) {
                return Err(CourseBuilderError::validation(format!(
                    "{} slot already written",
                    slot.name()
                )));
            }
            seen.push(slot);
        }

        for produced in output.produced {
            match produced {
                Produced::Course(v) => self.course = Some(v),
                Produced::Concepts(v) => self.concepts = Some(v),
                Produced::Outlines(v) => self.outlines = Some(v),
                Produced::Simulations(v) => self.simulations = Some(v),
            }
        }
        self.artifacts.extend(output.artifacts);
        Ok(())
    }

    fn is_filled(&self, slot: Slot) -> bool {
        match slot {
            Slot::Course => self.course.is_some(),
            Slot::Concepts => self.concepts.is_some(),
            Slot::Outlines => self.outlines.is_some(),
            Slot::Simulations => self.simulations.is_some(),
        }
    }
}

fn missing(slot: Slot) -> CourseBuilderError {
    CourseBuilderError::validation(format!(
        "{} not available; '{}' must run first",
        slot.name(),
        slot.writer()
    ))
}
