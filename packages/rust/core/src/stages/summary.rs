use std::fmt::Write as _;

use async_trait::async_trait;
use tracing::instrument;

use coursebuilder_shared::{ChapterOutline, CourseDescription, DeployTarget, PipelineConfig, Result};
use coursebuilder_site::layout::{HOME, README};
use coursebuilder_site::{SiteLayout, nav_path};

use super::{Stage, StageContext, StageId, ensure_title, first_paragraph};
use crate::context::StageOutput;

/// Stage 12: the site home page (generated) and the repository README.
pub struct SummaryStage;

#[async_trait]
impl Stage for SummaryStage {
    fn id(&self) -> StageId {
        StageId::Summary
    }

    #[instrument(skip_all, fields(stage = %self.id()))]
    async fn run(&self, cx: &StageContext<'_>) -> Result<StageOutput> {
        let course = cx.context().require_course()?;
        let outlines = cx.context().require_outlines()?;
        let concepts = cx.context().concepts().map_or(0, <[_]>::len);
        let simulations = cx.context().simulations().map_or(0, <[_]>::len);

        let chapters = outlines
            .iter()
            .map(|o| format!("{}. {}: {}", o.number, o.title, o.summary))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Write the home page of the intelligent textbook \"{title}\".\n\n\
             Course description:\n{body}\n\n\
             Chapters:\n{chapters}\n\n\
             The book has {concepts} concepts in its learning graph and {simulations} \
             interactive simulations. Start with `# {title}`. Write a welcoming introduction, \
             a short \"How to Use This Book\" section and a \"What You Will Learn\" section. \
             Keep it under 600 words.",
            title = course.title,
            body = course.body,
        );

        let text = cx.generate(prompt).await?;

        let mut output = StageOutput::new();
        output.artifact(cx.write(HOME, &ensure_title(&text, &course.title))?);
        output.artifact(cx.write(
            README,
            &render_readme(cx.config(), cx.layout(), course, outlines),
        )?);
        Ok(output)
    }
}

fn render_readme(
    config: &PipelineConfig,
    layout: &SiteLayout,
    course: &CourseDescription,
    outlines: &[ChapterOutline],
) -> String {
    let mut out = format!("# {}\n\n", course.title);

    let intro = first_paragraph(&course.body);
    if !intro.is_empty() {
        let _ = writeln!(out, "{intro}\n");
    }

    out.push_str("## Chapters\n\n");
    for outline in outlines {
        let _ = writeln!(
            out,
            "{}. [{}]({})",
            outline.number,
            outline.title,
            layout.chapter_page(outline)
        );
    }

    out.push_str(
        "\n## Building the Site\n\n```sh\npip install mkdocs-material\nmkdocs serve\n```\n",
    );

    if config.deploy == DeployTarget::GithubPages {
        out.push_str(
            "\nPushing to `main` publishes the site to GitHub Pages via `.github/workflows/deploy.yml`.\n",
        );
        if let Some(repo) = config.repo_name.as_deref().filter(|r| r.contains('/')) {
            let (owner, name) = repo.split_once('/').unwrap_or((repo, repo));
            let _ = writeln!(out, "\nLive site: https://{owner}.github.io/{name}/");
        }
    }

    let _ = writeln!(
        out,
        "\n---\n\nGenerated by CourseBuilder from the topic \"{}\". Start reading at [{}]({}).",
        config.topic,
        nav_path(HOME),
        HOME
    );
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::stages::testing::{ScriptedGenerator, populated_context};

    #[tokio::test]
    async fn writes_home_page_and_readme() {
        let ctx = populated_context("summary");
        let layout = SiteLayout::new(ctx.output_dir().to_path_buf());
        let generator = Arc::new(ScriptedGenerator::new("Welcome to widgets."));

        let cx = StageContext::new(&ctx, generator.clone(), &layout);
        let output = SummaryStage.run(&cx).await.unwrap();

        let paths: Vec<&str> = output.artifacts.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(paths, vec![HOME, README]);
        assert_eq!(generator.prompt_count(), 1);

        let home = std::fs::read_to_string(layout.resolve(HOME)).unwrap();
        assert_eq!(home, "# Widgets\n\nWelcome to widgets.\n");

        let readme = std::fs::read_to_string(layout.resolve(README)).unwrap();
        assert!(readme.starts_with("# Widgets\n\nAll about widgets.\n"));
        assert!(readme.contains("2. [Building Widgets](docs/chapters/02-building-widgets/index.md)"));
        assert!(!readme.contains("GitHub Pages"));

        let _ = std::fs::remove_dir_all(layout.root());
    }

    #[test]
    fn readme_links_pages_site() {
        let ctx = populated_context("summary-gh");
        let mut config = ctx.config().clone();
        config.deploy = DeployTarget::GithubPages;
        config.repo_name = Some("acme/widgets".into());

        let readme = render_readme(
            &config,
            &SiteLayout::new("/tmp/x"),
            ctx.course().unwrap(),
            ctx.outlines().unwrap(),
        );
        assert!(readme.contains("https://acme.github.io/widgets/"));
    }
}
