//! newsdesk CLI
//!
//! Command-line interface for judging news bias from three viewpoints and
//! for writing, researching and managing articles.
//!
//! Copyright (c) 2025 Michael A Wright

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use llm_bridge::Providers;
use news_core::config::Settings;
use news_core::generator::{ArticleGenerator, ArticleRequest, DEFAULT_LENGTH};
use news_core::judge::{BackendOverride, BiasJudge};
use news_core::pipeline::DeepResearchGenerator;
use news_core::research::ResearchLoop;
use news_core::selector::BackendSelector;
use news_core::store::{ArticleRecord, ArticleStore, ArticleUpdate};
use news_core::{ArticleId, ArticleType, BackendKind, BiasJudgment, Tone};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\nbuilt:  ",
    env!("BUILT_TIME_UTC"),
    "\nhost:   ",
    env!("BUILT_HOST"),
    "\ncommit: ",
    env!("BUILT_GIT_COMMIT_HASH"),
);

/// File extensions `judge --input <dir>` picks up
const ARTICLE_EXTENSIONS: [&str; 3] = ["md", "markdown", "txt"];

#[derive(Parser)]
#[command(name = "newsdesk")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "Judge news bias, then write and research articles", long_about = None)]
struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the active bias backend and what every backend can serve
    Status {
        /// Also make a minimal call to each configured writer to check its API key
        #[arg(long)]
        check_writers: bool,
    },

    /// Check that a backend/model is usable for judging
    Switch {
        /// ollama or transformers
        #[arg(short, long)]
        backend: BackendKind,

        /// Model name (default: the backend's configured model)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Judge an article from liberal, conservative and neutral viewpoints
    Judge {
        /// Article file, or a directory of .md/.txt articles
        #[arg(short, long, conflicts_with = "text", required_unless_present = "text")]
        input: Option<PathBuf>,

        /// Article text given inline
        #[arg(short, long)]
        text: Option<String>,

        /// Use this backend for this run only
        #[arg(short, long)]
        backend: Option<BackendKind>,

        /// Use this model for this run only
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Write an article
    Generate {
        #[command(flatten)]
        article: ArticleArgs,

        /// Research the topic on the web first
        #[arg(long)]
        deep: bool,

        /// Subtopic the research must cover (repeatable)
        #[arg(long = "subtopic")]
        subtopics: Vec<String>,

        /// openai or gemini (default: configured generator)
        #[arg(long)]
        provider: Option<String>,

        /// Save the article to the store
        #[arg(long)]
        save: bool,

        /// Also write the Markdown to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Research a topic and print the findings
    Research {
        #[arg(short, long)]
        topic: String,

        /// Subtopic the research must cover (repeatable)
        #[arg(long = "subtopic")]
        subtopics: Vec<String>,
    },

    /// Suggest five titles for a topic
    Titles {
        #[arg(short, long)]
        topic: String,

        #[arg(long = "type", default_value = "blog")]
        article_type: ArticleType,

        #[arg(long)]
        provider: Option<String>,
    },

    /// Draft an outline for a topic
    Outline {
        #[arg(short, long)]
        topic: String,

        #[arg(long = "type", default_value = "blog")]
        article_type: ArticleType,

        #[arg(long, default_value = "informative")]
        tone: Tone,

        #[arg(long)]
        provider: Option<String>,
    },

    /// Manage saved articles
    Articles {
        #[command(subcommand)]
        command: ArticleCommands,
    },
}

#[derive(Args)]
struct ArticleArgs {
    #[arg(short, long)]
    topic: String,

    /// blog, news, explainer, review, how_to, interview, column, press_release
    #[arg(long = "type", default_value = "blog")]
    article_type: ArticleType,

    /// formal, casual, technical, friendly, persuasive, informative, entertaining
    #[arg(long, default_value = "informative")]
    tone: Tone,

    /// Maximum length in characters (300-3000)
    #[arg(short, long, default_value_t = DEFAULT_LENGTH)]
    length: usize,

    /// Ask for SEO elements
    #[arg(long)]
    seo: bool,
}

impl ArticleArgs {
    fn request(&self) -> ArticleRequest {
        let mut request = ArticleRequest::new(self.topic.clone(), self.article_type, self.tone)
            .with_length(self.length);
        request.include_seo = self.seo;
        request
    }
}

#[derive(Subcommand)]
enum ArticleCommands {
    /// List saved articles, newest first
    List {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Print one article
    Show { id: ArticleId },

    /// Find articles containing every keyword
    Search { query: String },

    /// Replace an article's title and/or body
    Update {
        id: ArticleId,

        #[arg(long)]
        title: Option<String>,

        /// File holding the new Markdown body
        #[arg(long)]
        body_file: Option<PathBuf>,
    },

    /// Delete an article
    Delete { id: ArticleId },

    /// Counts by type and month
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    tracing::debug!(
        "newsdesk {} ({}, {})",
        built_info::PKG_VERSION,
        built_info::TARGET,
        built_info::PROFILE
    );

    match cli.command {
        Commands::Status { check_writers } => {
            let judge = connect_judge(&settings).await?;
            let status = judge.selector().status().await;
            let writers = if check_writers {
                check_writer_keys(&settings).await?
            } else {
                Vec::new()
            };
            if cli.json {
                return print_json(&serde_json::json!({ "bias": status, "writers": writers }));
            }

            println!(
                "Active: {} ({}) at {}",
                status.current.backend, status.current.model, status.current.endpoint
            );
            for backend in &status.backends {
                if backend.reachable {
                    println!(
                        "  {:<13} {}  models: {}",
                        backend.backend.as_str(),
                        backend.endpoint,
                        backend.models.join(", ")
                    );
                } else {
                    println!(
                        "  {:<13} {}  unreachable: {}",
                        backend.backend.as_str(),
                        backend.endpoint,
                        backend.error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
            for (writer, result) in &writers {
                match result {
                    Ok(()) => println!("Writer {}: OK", writer),
                    Err(e) => println!("Writer {}: {}", writer, e),
                }
            }
            Ok(())
        }
        Commands::Switch { backend, model } => {
            let judge = connect_judge(&settings).await?;
            let config = judge.selector().switch_backend(backend, model).await?;
            if cli.json {
                return print_json(&config);
            }
            println!("{} ({}) is usable at {}", config.backend, config.model, config.endpoint);
            println!(
                "Set BIAS_BACKEND={} to make it the default for newsdesk and newsdesk-server.",
                config.backend
            );
            Ok(())
        }
        Commands::Judge {
            input,
            text,
            backend,
            model,
        } => {
            let judge = connect_judge(&settings).await?;
            let backend_override = (backend.is_some() || model.is_some()).then(|| BackendOverride {
                backend,
                model,
            });

            let articles = match (input, text) {
                (_, Some(text)) => vec![("<inline>".to_string(), text)],
                (Some(path), None) => read_articles(&path)?,
                (None, None) => bail!("Provide --input or --text"),
            };

            let mut judgments = Vec::with_capacity(articles.len());
            for (name, body) in articles {
                let judgment = judge
                    .judge(&body, backend_override.clone())
                    .await
                    .with_context(|| format!("Failed to judge {}", name))?;
                if !cli.json {
                    print_judgment(&name, &judgment);
                }
                judgments.push(serde_json::json!({ "source": name, "judgment": judgment }));
            }
            if cli.json {
                print_json(&judgments)?;
            }
            Ok(())
        }
        Commands::Generate {
            article,
            deep,
            subtopics,
            provider,
            save,
            output,
        } => {
            let providers = Providers::from_settings(&settings)?;
            let writer = writer(&providers, provider.as_deref())?;
            let request = article.request();

            let (generated, research) = if deep {
                let research = research_loop(&providers, &settings)?;
                let pipeline = DeepResearchGenerator::new(research, writer);
                let researched = pipeline.generate(&request, subtopics).await?;
                (researched.article, Some(researched.research))
            } else {
                (writer.generate(&request, None).await?, None)
            };

            if let Some(path) = &output {
                std::fs::write(path, &generated.text)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                tracing::info!("Wrote {}", path.display());
            }

            let saved_id = if save {
                let store = open_store(&settings)?;
                Some(store.save(&generated.clone().into_article(&request))?)
            } else {
                None
            };

            if cli.json {
                return print_json(&serde_json::json!({
                    "article": generated,
                    "research": research,
                    "saved_id": saved_id,
                }));
            }

            if let Some(research) = &research {
                println!("{}", research.summary_markdown());
            }
            println!("{}", generated.text);
            println!();
            println!(
                "({} chars{}, {})",
                generated.text.chars().count(),
                if generated.trimmed { ", trimmed" } else { "" },
                generated.generated_by
            );
            if let Some(id) = saved_id {
                println!("Saved as {}", id);
            }
            Ok(())
        }
        Commands::Research { topic, subtopics } => {
            let providers = Providers::from_settings(&settings)?;
            let outcome = research_loop(&providers, &settings)?
                .run(&topic, subtopics)
                .await?;
            if cli.json {
                return print_json(&outcome);
            }
            println!("{}", outcome.summary_markdown());
            Ok(())
        }
        Commands::Titles {
            topic,
            article_type,
            provider,
        } => {
            let providers = Providers::from_settings(&settings)?;
            let text = writer(&providers, provider.as_deref())?
                .generate_titles(&topic, article_type)
                .await?;
            print_text(cli.json, &text)
        }
        Commands::Outline {
            topic,
            article_type,
            tone,
            provider,
        } => {
            let providers = Providers::from_settings(&settings)?;
            let text = writer(&providers, provider.as_deref())?
                .generate_outline(&topic, article_type, tone)
                .await?;
            print_text(cli.json, &text)
        }
        Commands::Articles { command } => run_articles(command, &open_store(&settings)?, cli.json),
    }
}

fn run_articles(command: ArticleCommands, store: &ArticleStore, json: bool) -> Result<()> {
    match command {
        ArticleCommands::List { limit } => print_records(&store.list(limit)?, json),
        ArticleCommands::Search { query } => print_records(&store.search(&query)?, json),
        ArticleCommands::Show { id } => {
            let article = store.load(id)?;
            if json {
                return print_json(&article);
            }
            println!("{}", article.body);
            Ok(())
        }
        ArticleCommands::Update {
            id,
            title,
            body_file,
        } => {
            let body = match body_file {
                Some(path) => Some(
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                ),
                None => None,
            };
            if title.is_none() && body.is_none() {
                bail!("Nothing to update; pass --title and/or --body-file");
            }
            let article = store.update(id, ArticleUpdate { title, body })?;
            if json {
                return print_json(&article);
            }
            println!("Updated {} ({})", article.id, article.title);
            Ok(())
        }
        ArticleCommands::Delete { id } => {
            store.delete(id)?;
            println!("Deleted {}", id);
            Ok(())
        }
        ArticleCommands::Stats => {
            let stats = store.statistics()?;
            if json {
                return print_json(&stats);
            }
            println!("Articles:      {}", stats.total_articles);
            println!("Total chars:   {}", stats.total_chars);
            println!("Average chars: {}", stats.average_chars);
            for (article_type, count) in &stats.by_type {
                println!("  {:<14} {}", article_type.label(), count);
            }
            for (month, count) in &stats.by_month {
                println!("  {:<14} {}", month, count);
            }
            Ok(())
        }
    }
}

async fn connect_judge(settings: &Settings) -> Result<BiasJudge> {
    let providers = Providers::from_settings(settings)?;
    let selector =
        BackendSelector::connect(providers.backends, Some((settings.bias_backend, None))).await?;
    Ok(BiasJudge::new(Arc::new(selector)))
}

/// Result of a minimal call to each configured writer
async fn check_writer_keys(settings: &Settings) -> Result<Vec<(String, Result<(), String>)>> {
    let providers = Providers::from_settings(settings)?;
    let mut results = Vec::with_capacity(providers.generators.len());
    for provider in &providers.generators {
        let generator = ArticleGenerator::new(provider.clone());
        let outcome = generator.validate().await.map_err(|e| e.to_string());
        results.push((generator.provider_label(), outcome));
    }
    Ok(results)
}

fn writer(providers: &Providers, name: Option<&str>) -> Result<Arc<ArticleGenerator>> {
    let provider = match name {
        Some(name) => providers
            .generators
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
            .with_context(|| format!("Generator '{}' is not configured", name))?,
        None => providers
            .generator()
            .context("No generator configured; set OPENAI_API_KEY or GEMINI_API_KEY")?,
    };
    Ok(Arc::new(ArticleGenerator::new(provider.clone())))
}

fn research_loop(providers: &Providers, settings: &Settings) -> Result<Arc<ResearchLoop>> {
    let search = providers
        .search
        .clone()
        .context("No search provider configured; set TAVILY_API_KEY or GEMINI_API_KEY")?;
    Ok(Arc::new(ResearchLoop::new(search, settings.research.clone())))
}

fn open_store(settings: &Settings) -> Result<ArticleStore> {
    ArticleStore::open(settings.articles_dir.clone()).with_context(|| {
        format!(
            "Failed to open article store at {}",
            settings.articles_dir.display()
        )
    })
}

/// Load one article file, or every article file under a directory
fn read_articles(path: &Path) -> Result<Vec<(String, String)>> {
    if path.is_file() {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        return Ok(vec![(path.display().to_string(), body)]);
    }

    let mut articles = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
        let is_article = entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ARTICLE_EXTENSIONS.contains(&ext.to_lowercase().as_str()));
        if !is_article {
            continue;
        }
        let body = std::fs::read_to_string(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        articles.push((entry.path().display().to_string(), body));
    }

    if articles.is_empty() {
        bail!("No .md or .txt articles found in {}", path.display());
    }
    Ok(articles)
}

fn print_judgment(name: &str, judgment: &BiasJudgment) {
    println!("== {} ==", name);
    println!(
        "Bias score: {:.1}/100 ({})  [{} / {}, {} ms]",
        judgment.score,
        judgment.label.as_str(),
        judgment.backend.backend,
        judgment.backend.model,
        judgment.elapsed_ms
    );
    for assessment in &judgment.assessments {
        println!(
            "  {:<13} {:>5.1}  {}",
            assessment.viewpoint.as_str(),
            assessment.score,
            assessment.summary.lines().next().unwrap_or_default()
        );
    }
    println!();
}

fn print_records(records: &[ArticleRecord], json: bool) -> Result<()> {
    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No articles.");
        return Ok(());
    }
    for record in records {
        println!(
            "{}  {}  {:<14} {:>5}  {}",
            record.id,
            record.created_at.format("%Y-%m-%d %H:%M"),
            record.article_type.label(),
            record.char_count,
            record.title
        );
    }
    Ok(())
}

fn print_text(json: bool, text: &str) -> Result<()> {
    if json {
        return print_json(&serde_json::json!({ "text": text }));
    }
    println!("{}", text);
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_generate_arguments() {
        let cli = Cli::try_parse_from([
            "newsdesk",
            "generate",
            "--topic",
            "Night trains",
            "--type",
            "how-to",
            "--tone",
            "casual",
            "--length",
            "1200",
            "--deep",
            "--subtopic",
            "prices",
            "--subtopic",
            "routes",
        ])
        .unwrap();

        let Commands::Generate {
            article,
            deep,
            subtopics,
            ..
        } = cli.command
        else {
            panic!("expected generate");
        };
        let request = article.request();
        assert_eq!(request.article_type, ArticleType::HowTo);
        assert_eq!(request.tone, Tone::Casual);
        assert_eq!(request.length, 1200);
        assert!(deep);
        assert_eq!(subtopics, vec!["prices", "routes"]);
    }

    #[test]
    fn test_judge_requires_input_or_text() {
        assert!(Cli::try_parse_from(["newsdesk", "judge"]).is_err());
        assert!(Cli::try_parse_from(["newsdesk", "judge", "--text", "x", "--input", "a.md"]).is_err());
        assert!(Cli::try_parse_from(["newsdesk", "judge", "--text", "x", "--backend", "ollama"]).is_ok());
    }

    #[test]
    fn test_read_articles_walks_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.md"), "second").unwrap();
        std::fs::write(dir.path().join("a.txt"), "first").unwrap();
        std::fs::write(dir.path().join("notes.json"), "{}").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.MD"), "third").unwrap();

        let bodies: Vec<String> = read_articles(dir.path())
            .unwrap()
            .into_iter()
            .map(|(_, body)| body)
            .collect();
        assert_eq!(bodies, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_read_articles_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_articles(dir.path()).is_err());
    }
}
