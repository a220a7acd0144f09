use std::collections::HashSet;
use std::fmt::Write as _;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use coursebuilder_extract::{NumberedItem, parse_numbered_items, strip_code_fence};
use coursebuilder_shared::{Result, Simulation};
use coursebuilder_site::layout::SIMS_INDEX;
use coursebuilder_site::slugify;

use super::{Stage, StageContext, StageId};
use crate::context::{Produced, StageOutput};

/// Stage 5: plan interactive simulations, then generate each one as a
/// standalone HTML page with a markdown wrapper.
pub struct SimulationsStage;

#[async_trait]
impl Stage for SimulationsStage {
    fn id(&self) -> StageId {
        StageId::Simulations
    }

    #[instrument(skip_all, fields(stage = %self.id()))]
    async fn run(&self, cx: &StageContext<'_>) -> Result<StageOutput> {
        let count = cx.config().simulations as usize;
        if count == 0 {
            info!("no simulations requested, skipping");
            return Ok(StageOutput::new().with(Produced::Simulations(Vec::new())));
        }

        let course = cx.context().require_course()?;
        let outlines = cx.context().require_outlines()?;

        let chapter_list = outlines
            .iter()
            .map(|o| format!("{}. {}: {}", o.number, o.title, o.summary))
            .collect::<Vec<_>>()
            .join("\n");

        let plan_prompt = format!(
            "Propose {count} interactive browser simulations for the course \"{title}\".\n\n\
             Chapters:\n{chapter_list}\n\n\
             Return a numbered list, one simulation per line, formatted as \
             `N. Simulation Name: what the learner manipulates and observes`.",
            title = course.title,
        );

        let plan = cx.generate(plan_prompt).await?;
        let mut items = parse_numbered_items(&plan);
        if items.len() < count {
            warn!(requested = count, planned = items.len(), "fewer simulations planned than requested");
        }
        items.truncate(count);
        let sims = plan_simulations(items);

        let prompts: Vec<String> = sims
            .iter()
            .map(|sim| {
                format!(
                    "Write a self-contained interactive simulation for the course \"{course}\".\n\n\
                     Simulation: {title}\n\
                     Description: {description}\n\n\
                     Return one complete HTML document in a single ```html code block. Use only \
                     inline CSS and JavaScript (p5.js from a CDN is allowed). Provide labelled \
                     sliders or buttons for every parameter and keep the canvas responsive.",
                    course = course.title,
                    title = sim.title,
                    description = sim.description,
                )
            })
            .collect();

        let pages = cx.generate_all(prompts).await?;

        let mut output = StageOutput::new();
        for (sim, page) in sims.iter().zip(&pages) {
            let html = strip_code_fence(page);
            output.artifact(cx.write(&cx.layout().sim_html(sim), &format!("{html}\n"))?);
            output.artifact(cx.write(&cx.layout().sim_page(sim), &render_sim_page(sim))?);
        }
        output.artifact(cx.write(SIMS_INDEX, &render_sims_index(&sims))?);

        info!(simulations = sims.len(), "simulations written");
        Ok(output.with(Produced::Simulations(sims)))
    }
}

/// Turn planned items into simulations with unique slugs.
fn plan_simulations(items: Vec<NumberedItem>) -> Vec<Simulation> {
    let mut used = HashSet::new();
    items
        .into_iter()
        .map(|item| {
            let base = slugify(&item.title);
            let mut slug = base.clone();
            let mut n = 2;
            while !used.insert(slug.clone()) {
                slug = format!("{base}-{n}");
                n += 1;
            }
            Simulation {
                title: item.title,
                slug,
                description: item.detail,
            }
        })
        .collect()
}

fn render_sim_page(sim: &Simulation) -> String {
    let mut out = format!("# {}\n\n", sim.title);
    if !sim.description.is_empty() {
        let _ = writeln!(out, "{}\n", sim.description);
    }
    out.push_str(
        "<iframe src=\"main.html\" width=\"100%\" height=\"600\" style=\"border: none;\"></iframe>\n\n",
    );
    out.push_str("[Open the simulation in full screen](main.html){ .md-button }\n");
    out
}

fn render_sims_index(sims: &[Simulation]) -> String {
    let mut out = String::from("# Simulations\n\n");
    for sim in sims {
        let _ = write!(out, "- [{}]({}/index.md)", sim.title, sim.slug);
        if !sim.description.is_empty() {
            let _ = write!(out, ": {}", sim.description);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::context::PipelineContext;
    use crate::stages::testing::{ScriptedGenerator, populated_context, temp_config};
    use coursebuilder_site::SiteLayout;

    #[tokio::test]
    async fn zero_count_skips_generation() {
        let ctx = PipelineContext::new(temp_config("sims-skip"));
        let layout = SiteLayout::new(ctx.output_dir().to_path_buf());
        let generator = Arc::new(ScriptedGenerator::new("unused"));

        let cx = StageContext::new(&ctx, generator.clone(), &layout);
        let output = SimulationsStage.run(&cx).await.unwrap();

        assert_eq!(generator.prompt_count(), 0);
        assert!(output.artifacts.is_empty());
        assert!(matches!(&output.produced[..], [Produced::Simulations(s)] if s.is_empty()));
    }

    #[tokio::test]
    async fn plans_and_writes_each_simulation() {
        let mut config = temp_config("sims");
        config.simulations = 2;
        let base = populated_context("sims-base");
        let mut ctx = PipelineContext::new(config);
        ctx.apply(
            StageId::CourseDescription,
            StageOutput::new().with(Produced::Course(base.course().unwrap().clone())),
        )
        .unwrap();
        ctx.apply(
            StageId::ChapterStructure,
            StageOutput::new().with(Produced::Outlines(base.outlines().unwrap().to_vec())),
        )
        .unwrap();

        let layout = SiteLayout::new(ctx.output_dir().to_path_buf());
        let generator = Arc::new(
            ScriptedGenerator::new("```html\n<html><body>sim</body></html>\n```")
                .on(
                    "Propose 2",
                    "1. Gear Train: change gear ratios\n2. Spring Tester: stretch springs\n3. Extra: ignored",
                ),
        );

        let cx = StageContext::new(&ctx, generator.clone(), &layout);
        let output = SimulationsStage.run(&cx).await.unwrap();

        assert_eq!(generator.prompt_count(), 3);
        assert_eq!(output.artifacts.len(), 5);

        let html = std::fs::read_to_string(layout.resolve("docs/sims/gear-train/main.html")).unwrap();
        assert_eq!(html, "<html><body>sim</body></html>\n");

        let index = std::fs::read_to_string(layout.resolve(SIMS_INDEX)).unwrap();
        assert!(index.contains("- [Spring Tester](spring-tester/index.md): stretch springs"));
        assert!(!index.contains("Extra"));

        let _ = std::fs::remove_dir_all(layout.root());
    }

    #[test]
    fn duplicate_titles_get_unique_slugs() {
        let items = vec![
            NumberedItem { title: "Orbit".into(), detail: String::new() },
            NumberedItem { title: "orbit".into(), detail: String::new() },
            NumberedItem { title: "Orbit!".into(), detail: String::new() },
        ];
        let slugs: Vec<String> = plan_simulations(items).into_iter().map(|s| s.slug).collect();
        assert_eq!(slugs, vec!["orbit", "orbit-2", "orbit-3"]);
    }

    #[test]
    fn sim_page_embeds_html() {
        let page = render_sim_page(&Simulation {
            title: "Gear Train".into(),
            slug: "gear-train".into(),
            description: "Change ratios.".into(),
        });
        assert!(page.starts_with("# Gear Train\n\nChange ratios.\n"));
        assert!(page.contains("<iframe src=\"main.html\""));
    }
}
