use async_trait::async_trait;
use tracing::{info, instrument};

use coursebuilder_shared::{DeployTarget, Result};
use coursebuilder_site::layout::{DEPLOY_WORKFLOW, MKDOCS};
use coursebuilder_site::{MkdocsOptions, render_mkdocs, render_pages_workflow};

use super::{Stage, StageContext, StageId, first_paragraph};
use crate::context::StageOutput;

/// Stage 10: `mkdocs.yml` and, for GitHub Pages, the deploy workflow.
/// No generation calls.
pub struct SiteConfigStage;

#[async_trait]
impl Stage for SiteConfigStage {
    fn id(&self) -> StageId {
        StageId::SiteConfiguration
    }

    #[instrument(skip_all, fields(stage = %self.id()))]
    async fn run(&self, cx: &StageContext<'_>) -> Result<StageOutput> {
        let config = cx.config();
        let course = cx.context().require_course()?;
        let outlines = cx.context().require_outlines()?;
        let simulations = cx.context().simulations().unwrap_or_default();

        let description = first_paragraph(&course.body);
        let yaml = render_mkdocs(
            cx.layout(),
            &MkdocsOptions {
                site_name: &course.title,
                description: &description,
                repo_name: config.repo_name.as_deref(),
                outlines,
                simulations,
            },
        );

        let mut output = StageOutput::new();
        output.artifact(cx.write(MKDOCS, &yaml)?);

        if config.deploy == DeployTarget::GithubPages {
            output.artifact(cx.write(DEPLOY_WORKFLOW, &render_pages_workflow())?);
            info!("GitHub Pages workflow written");
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::context::PipelineContext;
    use crate::stages::testing::{ScriptedGenerator, populated_context};
    use coursebuilder_site::SiteLayout;

    async fn run_with(ctx: &PipelineContext) -> (StageOutput, usize) {
        let layout = SiteLayout::new(ctx.output_dir().to_path_buf());
        let generator = Arc::new(ScriptedGenerator::new("unused"));
        let cx = StageContext::new(ctx, generator.clone(), &layout);
        let output = SiteConfigStage.run(&cx).await.unwrap();
        (output, generator.prompt_count())
    }

    #[tokio::test]
    async fn writes_mkdocs_without_generation() {
        let ctx = populated_context("site-config");
        let (output, prompts) = run_with(&ctx).await;

        assert_eq!(prompts, 0);
        let paths: Vec<&str> = output.artifacts.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(paths, vec![MKDOCS]);

        let yaml = std::fs::read_to_string(ctx.output_dir().join("mkdocs.yml")).unwrap();
        assert!(yaml.starts_with("site_name: Widgets\nsite_description: All about widgets.\n"));
        assert!(yaml.contains("chapters/02-building-widgets/index.md"));

        let _ = std::fs::remove_dir_all(ctx.output_dir());
    }

    #[tokio::test]
    async fn github_pages_adds_workflow() {
        let base = populated_context("site-config-gh");
        let mut config = base.config().clone();
        config.deploy = DeployTarget::GithubPages;
        config.repo_name = Some("acme/widgets".into());

        let mut ctx = PipelineContext::new(config);
        ctx.apply(
            StageId::CourseDescription,
            StageOutput::new().with(crate::context::Produced::Course(base.course().unwrap().clone())),
        )
        .unwrap();
        ctx.apply(
            StageId::ChapterStructure,
            StageOutput::new().with(crate::context::Produced::Outlines(
                base.outlines().unwrap().to_vec(),
            )),
        )
        .unwrap();

        let (output, _) = run_with(&ctx).await;

        let paths: Vec<&str> = output.artifacts.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(paths, vec![MKDOCS, DEPLOY_WORKFLOW]);
        assert!(ctx.output_dir().join(".github/workflows/deploy.yml").exists());

        let _ = std::fs::remove_dir_all(ctx.output_dir());
    }
}
