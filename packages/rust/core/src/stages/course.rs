use async_trait::async_trait;
use tracing::{info, instrument};

use coursebuilder_extract::parse_course_description;
use coursebuilder_shared::Result;
use coursebuilder_site::layout::COURSE_DESCRIPTION;

use super::{Stage, StageContext, StageId};
use crate::context::{Produced, StageOutput};

/// Stage 1: generate the course description and pull out its main topics.
pub struct CourseDescriptionStage;

#[async_trait]
impl Stage for CourseDescriptionStage {
    fn id(&self) -> StageId {
        StageId::CourseDescription
    }

    #[instrument(skip_all, fields(stage = %self.id()))]
    async fn run(&self, cx: &StageContext<'_>) -> Result<StageOutput> {
        let config = cx.config();
        let prompt = format!(
            "Write a course description for an intelligent textbook on \"{topic}\".\n\n\
             Use exactly this structure:\n\n\
             # <Course Title>\n\n\
             <one or two paragraphs describing the course and its audience>\n\n\
             ## Prerequisites\n\n<bulleted list>\n\n\
             ## Main Topics Covered\n\n\
             A numbered list of exactly {chapters} topics, one per chapter, in teaching order, \
             each written as `N. Topic: one-line description`.\n\n\
             ## Learning Outcomes\n\n\
             Bulleted outcomes grouped by the six levels of the revised Bloom's taxonomy \
             (Remember, Understand, Apply, Analyze, Evaluate, Create).",
            topic = config.topic,
            chapters = config.chapters,
        );

        let text = cx.generate(prompt).await?;
        let course = parse_course_description(&text, &config.topic);

        info!(title = %course.title, topics = course.topics.len(), "course description parsed");

        let mut output = StageOutput::new();
        output.artifact(cx.write(COURSE_DESCRIPTION, &format!("{}\n", course.body))?);
        Ok(output.with(Produced::Course(course)))
    }
}
