//! Handlers behind the `blogflow` subcommands.

use std::path::Path;

use anyhow::Context as _;

use crate::cli::{
    CacheArgs, CacheCommand, ContentArgs, ElaborateArgs, OutlineAddArgs, OutlineCommand,
    OutlineCustomizeArgs, OutlineFileArgs, OutlineGenerateArgs, OutlineRemoveArgs,
    OutlineReorderArgs, OutlineShowArgs, OutlineUpdateArgs, SearchArgs, TopicsArgs,
};
use crate::config::AppConfig;
use crate::formats::{BlogContent, HeadingLevel, Outline, OutlineSection, TopicIdea};
use crate::generation::{
    BlogContentGenerationParams, Customization, ElaborateRequest, OutlineGenerationParams,
    TopicGenerationParams,
};
use crate::outline::{MissingTarget, OutlineEdit, SectionPatch};
use crate::search::SearchConfig;
use crate::state_store::{read_json, write_json_atomic};

pub async fn outline(command: OutlineCommand, config: &AppConfig) -> anyhow::Result<()> {
    match command {
        OutlineCommand::Show(args) => show(args).await,
        OutlineCommand::Add(args) => add(args).await,
        OutlineCommand::Remove(args) => remove(args).await,
        OutlineCommand::Update(args) => update(args).await,
        OutlineCommand::Reorder(args) => reorder(args).await,
        OutlineCommand::Generate(args) => generate_outline(args, config).await,
        OutlineCommand::Customize(args) => customize_outline(args, config).await,
    }
}

async fn load_outline(path: &Path) -> anyhow::Result<Outline> {
    read_json(path)
        .await
        .with_context(|| format!("read outline: {}", path.display()))?
        .ok_or_else(|| anyhow::anyhow!("outline file not found: {}", path.display()))
}

async fn show(args: OutlineShowArgs) -> anyhow::Result<()> {
    let outline = load_outline(&args.file).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&outline).context("serialize outline")?);
    } else {
        print!("{}", outline.to_markdown());
    }
    Ok(())
}

/// Loads the outline, applies one edit, and writes the result back in place.
async fn edit_file(target: &OutlineFileArgs, edit: OutlineEdit) -> anyhow::Result<Outline> {
    let outline = load_outline(&target.file).await?;
    let missing = if target.strict {
        outline.check_target(&edit)?;
        MissingTarget::Report
    } else {
        MissingTarget::Ignore
    };
    let edited = outline.apply(&edit, missing)?;
    if edited == outline {
        tracing::warn!(file = %target.file.display(), "edit left the outline unchanged");
    }
    write_json_atomic(&target.file, &edited)
        .await
        .with_context(|| format!("write outline: {}", target.file.display()))?;
    tracing::info!(
        file = %target.file.display(),
        sections = edited.section_ids().len(),
        "outline saved"
    );
    Ok(edited)
}

async fn add(args: OutlineAddArgs) -> anyhow::Result<()> {
    let outline = load_outline(&args.target.file).await?;
    let level = args.level.unwrap_or_else(|| {
        args.parent
            .as_deref()
            .and_then(|id| outline.find_section(id))
            .map(|parent| parent.level.child())
            .unwrap_or(HeadingLevel::H2)
    });
    let mut section = OutlineSection::new(args.title, level);
    section.content = args.content.unwrap_or_default();
    section.recommended_word_count = args.words.unwrap_or_default();
    let id = section.id.clone();

    edit_file(
        &args.target,
        OutlineEdit::Add {
            parent_id: args.parent,
            section,
        },
    )
    .await?;
    println!("{id}");
    Ok(())
}

async fn remove(args: OutlineRemoveArgs) -> anyhow::Result<()> {
    edit_file(&args.target, OutlineEdit::Remove { section_id: args.id }).await?;
    Ok(())
}

async fn update(args: OutlineUpdateArgs) -> anyhow::Result<()> {
    let patch = SectionPatch {
        title: args.title,
        level: args.level,
        content: args.content,
        key_points: (!args.key_points.is_empty()).then_some(args.key_points),
        recommended_word_count: args.words,
        ..SectionPatch::default()
    };
    if patch == SectionPatch::default() {
        anyhow::bail!("nothing to update: pass at least one of --title, --level, --content, --words, --key-point");
    }
    edit_file(
        &args.target,
        OutlineEdit::Modify {
            section_id: args.id,
            section: patch,
        },
    )
    .await?;
    Ok(())
}

async fn reorder(args: OutlineReorderArgs) -> anyhow::Result<()> {
    edit_file(
        &args.target,
        OutlineEdit::Reorder {
            section_id: args.id,
            new_index: args.index,
        },
    )
    .await?;
    Ok(())
}

async fn generate_outline(args: OutlineGenerateArgs, config: &AppConfig) -> anyhow::Result<()> {
    let topic: TopicIdea = read_json(&args.topic)
        .await
        .with_context(|| format!("read topic: {}", args.topic.display()))?
        .ok_or_else(|| anyhow::anyhow!("topic file not found: {}", args.topic.display()))?;
    let generator = config.generator(reqwest::Client::new())?;
    let outline = generator
        .generate_outline(&OutlineGenerationParams {
            selected_topic: topic,
            style: args.style,
            depth: args.depth,
            include_intro_conclusion: Some(!args.no_intro_conclusion),
            include_faq: Some(!args.no_faq),
            keyword_strategy: args.keyword_strategy,
        })
        .await
        .context("generate outline")?;
    write_json_atomic(&args.out, &outline)
        .await
        .with_context(|| format!("write outline: {}", args.out.display()))?;
    Ok(())
}

async fn customize_outline(args: OutlineCustomizeArgs, config: &AppConfig) -> anyhow::Result<()> {
    let outline = load_outline(&args.file).await?;
    let generator = config.generator(reqwest::Client::new())?;
    let customized = generator
        .customize_outline(&outline, &Customization::Instruction(args.instruction))
        .await
        .context("customize outline")?;
    write_json_atomic(&args.file, &customized)
        .await
        .with_context(|| format!("write outline: {}", args.file.display()))?;
    Ok(())
}

pub fn cache(command: CacheCommand, config: &AppConfig) -> anyhow::Result<()> {
    let open = |args: &CacheArgs| config.search_cache(args.cache_config.as_deref());
    match command {
        CacheCommand::Stats(args) => {
            let stats = open(&args)?.stats();
            println!("{}", serde_json::to_string_pretty(&stats).context("serialize stats")?);
        }
        CacheCommand::Clear(args) => {
            open(&args)?.clear();
            tracing::info!("cache cleared");
        }
        CacheCommand::ClearExpired(args) => {
            open(&args)?.clear_expired();
            tracing::info!("expired cache entries cleared");
        }
    }
    Ok(())
}

pub async fn search(args: SearchArgs, config: &AppConfig) -> anyhow::Result<()> {
    let search = config.cached_search(reqwest::Client::new(), args.cache.cache_config.as_deref())?;
    let options = SearchConfig {
        country: args.country,
        language: args.language,
        site_search: args.site,
        ..SearchConfig::default()
    };
    let data = search
        .search(&args.query, &options)
        .await
        .with_context(|| format!("search {:?}", args.query))?;
    println!("{}", serde_json::to_string_pretty(&data).context("serialize results")?);
    Ok(())
}

pub async fn topics(args: TopicsArgs, config: &AppConfig) -> anyhow::Result<()> {
    let generator = config.generator(reqwest::Client::new())?;
    let topics = generator
        .generate_topics(&TopicGenerationParams {
            main_topic: args.main_topic,
            niche: args.niche,
            target_audience: args.audience,
            content_length: args.length,
            difficulty: args.difficulty,
            include_serp_data: args.serp,
        })
        .await
        .context("generate topics")?;
    match args.out {
        Some(path) => write_json_atomic(&path, &topics)
            .await
            .with_context(|| format!("write topics: {}", path.display()))?,
        None => println!("{}", serde_json::to_string_pretty(&topics).context("serialize topics")?),
    }
    Ok(())
}

pub async fn content(args: ContentArgs, config: &AppConfig) -> anyhow::Result<()> {
    let outline = load_outline(&args.outline).await?;
    let generator = config.generator(reqwest::Client::new())?;
    let content = generator
        .generate_content(&BlogContentGenerationParams {
            outline: outline.clone(),
            section: args.section,
            style: args.style,
            tone: args.tone,
            readability_level: args.readability,
            max_tokens: args.max_tokens,
        })
        .await
        .context("generate content")?;
    write_json_atomic(&args.out, &content)
        .await
        .with_context(|| format!("write content: {}", args.out.display()))?;

    if let Some(path) = args.markdown {
        tokio::fs::write(&path, article_markdown(&outline, &content))
            .await
            .with_context(|| format!("write markdown: {}", path.display()))?;
    }
    Ok(())
}

pub async fn elaborate(args: ElaborateArgs, config: &AppConfig) -> anyhow::Result<()> {
    let original_content = match &args.original {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("read section: {}", path.display()))?,
        None => String::new(),
    };
    let generator = config.generator(reqwest::Client::new())?;
    let response = generator
        .elaborate(&ElaborateRequest {
            prompt: args.prompt,
            original_content,
            target_word_count: args.target_words,
        })
        .await
        .context("elaborate")?;
    println!("{}", response.content);
    tracing::info!(word_count = response.word_count, "elaboration written");
    Ok(())
}

/// Article body in outline order, headed by each section's title.
fn article_markdown(outline: &Outline, content: &BlogContent) -> String {
    let mut out = String::new();
    for (_, section) in outline.walk() {
        let Some(body) = content.sections.iter().find(|s| s.id == section.id) else {
            continue;
        };
        out.push_str(&"#".repeat(section.level.depth()));
        out.push(' ');
        out.push_str(section.title.trim());
        out.push_str("\n\n");
        out.push_str(body.content.trim());
        out.push_str("\n\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::BlogContentSection;

    #[test]
    fn article_markdown_follows_outline_order_and_skips_unwritten_sections() {
        let mut intro = OutlineSection::new("Intro", HeadingLevel::H2);
        intro.id = "a".to_owned();
        let mut setup = OutlineSection::new("Setup", HeadingLevel::H3);
        setup.id = "b".to_owned();
        let mut faq = OutlineSection::new("FAQ", HeadingLevel::H2);
        faq.id = "c".to_owned();
        intro.children = Some(vec![setup]);
        let outline = Outline::new(vec![intro, faq]);

        let content = BlogContent {
            sections: vec![
                BlogContentSection {
                    id: "b".to_owned(),
                    content: "Install it.".to_owned(),
                    ..BlogContentSection::default()
                },
                BlogContentSection {
                    id: "a".to_owned(),
                    content: "Hello.".to_owned(),
                    ..BlogContentSection::default()
                },
            ],
            ..BlogContent::default()
        };

        assert_eq!(
            article_markdown(&outline, &content),
            "## Intro\n\nHello.\n\n### Setup\n\nInstall it.\n\n"
        );
    }
}
