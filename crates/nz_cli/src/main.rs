use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use nz_core::{NewsCategory, NotificationStorage};
use nz_inference::create_model;
use nz_scrapers::scrapers::{naver, ContentExtractor, ExtractorConfig, HtmlExtractor, NaverSearch, SearchConfig};
use nz_scrapers::{run_periodic, Collector, CollectorConfig, ScheduleConfig};
use nz_storage::{create_storage, Storage, StorageBackend};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

mod duration;
mod logging;

use duration::{non_zero_duration, HumanDuration};

#[derive(Parser, Debug)]
#[command(name = "nuzip", author, version, about = "Collects, enriches and stores news by category", long_about = None)]
pub struct Cli {
    /// Storage backend: sqlite or memory
    #[arg(long, env = "NUZIP_STORAGE", default_value = "sqlite", global = true)]
    storage: String,
    #[arg(long, env = "NUZIP_DATABASE", default_value = "nuzip.db", global = true)]
    database: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug)]
struct CollectArgs {
    /// Run a single collection and exit
    #[arg(long)]
    once: bool,
    #[arg(long, default_value = "30m", value_parser = non_zero_duration)]
    interval: HumanDuration,
    #[arg(long, default_value = "10s")]
    initial_delay: HumanDuration,
    /// Wall-clock bound for one run
    #[arg(long, default_value = "25m")]
    deadline: HumanDuration,
    /// Candidates requested per category
    #[arg(long, default_value_t = 10)]
    candidates: usize,
    #[arg(long, default_value_t = 16)]
    concurrency: usize,
    #[arg(long, default_value_t = 10)]
    min_chars: usize,
    /// Analysis model: gemini or dummy
    #[arg(long, env = "NUZIP_MODEL", default_value = "gemini")]
    model: String,
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,
    #[arg(long, env = "GEMINI_MODEL")]
    gemini_model: Option<String>,
    #[arg(long, env = "NAVER_CLIENT_ID")]
    naver_client_id: Option<String>,
    #[arg(long, env = "NAVER_CLIENT_SECRET", hide_env_values = true)]
    naver_client_secret: Option<String>,
    #[arg(long, env = "NAVER_BASE_URL", default_value = naver::DEFAULT_BASE_URL)]
    naver_base_url: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the collection pipeline, periodically unless --once is given
    Collect(CollectArgs),
    /// Extract one page and print what the pipeline would analyze
    Extract { url: String },
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Subscribe a user to a collection category
    Subscribe { user_id: String, category: String },
    /// List a user's unread notifications
    Notifications { user_id: String },
}

#[derive(Subcommand, Debug)]
enum CategoryCommands {
    Add { name: String },
    List,
    Deactivate { name: String },
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("🛑 Ctrl-C received, shutting down"),
        Err(e) => {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}

/// A memory store starts empty, so give it the standard categories.
async fn seed_memory_categories(storage: &Storage) -> anyhow::Result<()> {
    if let Storage::Memory(_) = storage {
        let admin = storage.admin();
        for category in NewsCategory::ALL {
            admin.add_category(category.label()).await?;
        }
        warn!("memory storage selected; nothing will outlive this process");
    }
    Ok(())
}

async fn collect(storage: Storage, args: CollectArgs) -> anyhow::Result<()> {
    seed_memory_categories(&storage).await?;

    let mut search_config = SearchConfig::new(
        args.naver_client_id.unwrap_or_default(),
        args.naver_client_secret.unwrap_or_default(),
    );
    search_config.base_url = args.naver_base_url;
    let search = NaverSearch::new(search_config).context("configuring Naver search")?;
    let extractor = HtmlExtractor::new(ExtractorConfig::default())?;

    let inference_config = nz_inference::Config {
        api_key: args.gemini_api_key,
        model_name: args.gemini_model,
        ..Default::default()
    };
    let model = create_model(&args.model, inference_config).context("configuring analysis model")?;
    info!("🧠 Analysis model initialized (using {})", model.name());

    let collector = Arc::new(Collector::new(
        Arc::new(search),
        Arc::new(extractor),
        model,
        storage.datastore(),
        CollectorConfig {
            candidates_per_category: args.candidates,
            deadline: args.deadline.0,
            min_content_chars: args.min_chars,
            max_concurrent_tasks: args.concurrency,
        },
    ));

    if args.once {
        let report = collector.run().await;
        println!(
            "persisted {} of {} candidates across {} categories ({} notifications, {} skipped, {} abandoned, quota tripped: {})",
            report.persisted,
            report.candidates,
            report.categories,
            report.notifications,
            report.total_skipped(),
            report.abandoned,
            report.quota_tripped
        );
        return Ok(());
    }

    info!(
        "⏱️ Running every {}s after a {}s delay",
        args.interval.0.as_secs(),
        args.initial_delay.0.as_secs()
    );
    let schedule = ScheduleConfig {
        initial_delay: args.initial_delay.0,
        interval: args.interval.0,
    };
    let runs = run_periodic(collector, schedule, shutdown_signal()).await;
    info!(runs, "collector stopped");
    Ok(())
}

async fn extract(url: &str) -> anyhow::Result<()> {
    let extractor = HtmlExtractor::new(ExtractorConfig::default())?;
    let content = extractor.extract(url).await?;
    let preview: String = content.text.chars().take(300).collect();
    println!("chars:     {}", content.char_len());
    println!("thumbnail: {}", content.thumbnail_url.as_deref().unwrap_or("-"));
    println!("preview:   {}", preview);
    Ok(())
}

async fn category(storage: &Storage, command: CategoryCommands) -> anyhow::Result<()> {
    let admin = storage.admin();
    match command {
        CategoryCommands::Add { name } => {
            let id = admin.add_category(&name).await?;
            println!("{}\t{}", id, name.trim());
        }
        CategoryCommands::List => {
            for category in admin.list_categories().await? {
                let state = if category.active_for_collection { "active" } else { "inactive" };
                println!("{}\t{}\t{}", category.id, category.name, state);
            }
        }
        CategoryCommands::Deactivate { name } => {
            if !admin.set_category_active(&name, false).await? {
                bail!("no category named {:?}", name);
            }
            println!("deactivated {}", name.trim());
        }
    }
    Ok(())
}

async fn subscribe(storage: &Storage, user_id: &str, category: &str) -> anyhow::Result<()> {
    let admin = storage.admin();
    let category = category.trim();
    let Some(found) = admin
        .list_categories()
        .await?
        .into_iter()
        .find(|c| c.name == category)
    else {
        bail!("no category named {:?}", category);
    };
    admin.subscribe(user_id, found.id).await?;
    println!("{} subscribed to {}", user_id, found.name);
    Ok(())
}

async fn notifications(storage: &Storage, user_id: &str) -> anyhow::Result<()> {
    let store = storage.datastore();
    let unread = store.unread_notifications(user_id).await?;
    if unread.is_empty() {
        println!("no unread notifications for {}", user_id);
    }
    for n in unread {
        println!("{}\t{}\t{}", n.created_at.format("%Y-%m-%d %H:%M"), n.article_id, n.message);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("failed to load .env: {}", e);
        }
    }
    logging::init_logging();
    let cli = Cli::parse();

    let storage = create_storage(&cli.storage, &cli.database)
        .await
        .with_context(|| format!("opening {} storage", cli.storage))?;
    info!("💾 Storage initialized (using {})", storage.admin().backend_name());

    match cli.command {
        Commands::Collect(args) => collect(storage, args).await,
        Commands::Extract { url } => extract(&url).await,
        Commands::Category { command } => category(&storage, command).await,
        Commands::Subscribe { user_id, category } => subscribe(&storage, &user_id, &category).await,
        Commands::Notifications { user_id } => notifications(&storage, &user_id).await,
    }
}
