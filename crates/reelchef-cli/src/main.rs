use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

use reelchef::db::recipe_repo;
use reelchef::job::{JobQuery, JobStore};
use reelchef::telemetry::{self, LogFormat};
use reelchef::{
    Config, ExtractionRequest, ExtractionService, JobProgressBroadcaster, JobStatus, Recipe,
    TargetLanguage,
};

#[derive(Parser)]
#[command(name = "reelchef")]
#[command(about = "Extract recipes from short-form cooking videos", long_about = None)]
struct Cli {
    /// Path to a reelchef.json config file
    #[arg(long, short, env = "REELCHEF_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log output: pretty or json
    #[arg(long, default_value = "pretty", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a link points at a single supported video
    Classify { url: String },
    /// Extract a recipe from a video link
    Extract {
        url: String,
        #[arg(long, default_value = "local")]
        user: String,
        /// Output language code, or "original" to keep the video's language
        #[arg(long, default_value = "original")]
        language: TargetLanguage,
        /// Notification channel (Telegram chat id)
        #[arg(long)]
        notify: Option<String>,
        /// Seconds to wait for the job to finish. A job still running
        /// after that is stopped and marked failed.
        #[arg(long, default_value_t = 300)]
        timeout: u64,
    },
    /// Show a job
    Job { id: String },
    /// List a user's jobs, newest first
    Jobs {
        #[arg(long, default_value = "local")]
        user: String,
        #[arg(long)]
        status: Option<JobStatus>,
        #[arg(long, default_value_t = 20)]
        limit: u64,
        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
    /// Show a recipe
    Recipe { id: String },
    /// Find the user's recipe previously extracted from a link
    Existing {
        url: String,
        #[arg(long, default_value = "local")]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.log_format);

    let config = match &cli.config {
        Some(path) => reelchef::load_config(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::with_defaults(),
    };

    match cli.command {
        Commands::Classify { url } => classify(&url),
        Commands::Extract {
            url,
            user,
            language,
            notify,
            timeout,
        } => {
            let mut request = ExtractionRequest::new(&user, &url).with_target(language);
            if let Some(channel) = notify.as_deref() {
                request = request.with_notify_channel(channel);
            }
            extract(&config, request, Duration::from_secs(timeout)).await
        }
        Commands::Job { id } => {
            let jobs = JobStore::new(
                ExtractionService::open_database(&config)?,
                JobProgressBroadcaster::default(),
            );
            match jobs.get(&id)? {
                Some(job) => print_json(&job),
                None => bail!("Job {} not found", id),
            }
        }
        Commands::Jobs {
            user,
            status,
            limit,
            offset,
        } => {
            let jobs = JobStore::new(
                ExtractionService::open_database(&config)?,
                JobProgressBroadcaster::default(),
            );
            let page = jobs.list(&JobQuery {
                user_id: Some(user),
                status,
                limit: Some(limit),
                offset: Some(offset),
            })?;
            print_json(&json!({ "total": page.total, "jobs": page.jobs }))
        }
        Commands::Recipe { id } => {
            let db = ExtractionService::open_database(&config)?;
            match recipe_repo::find_by_id(&db, &id)? {
                Some(row) => print_json(&Recipe::from_row(row)?),
                None => bail!("Recipe {} not found", id),
            }
        }
        Commands::Existing { url, user } => {
            let service = ExtractionService::from_config(&config)?;
            match service.existing_recipe(&user, &url).await? {
                Some(recipe) => print_json(&recipe),
                None => bail!("No recipe from this video yet"),
            }
        }
    }
}

fn classify(url: &str) -> Result<()> {
    let classification = reelchef::classify(url);
    print_json(&json!({
        "platform": classification.platform,
        "isValid": classification.is_valid,
        "error": classification.error,
        "normalizedUrl": reelchef::normalize(url),
    }))
}

async fn extract(config: &Config, request: ExtractionRequest, timeout: Duration) -> Result<()> {
    let service = ExtractionService::from_config(config)?;
    let job = service.submit(request).await?;

    let mut events = service.subscribe();
    let job_id = job.id.clone();
    let progress = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if event.job_id != job_id {
                continue;
            }
            log::info!(
                "[{:>3}%] {}",
                event.progress,
                event.message.as_deref().unwrap_or(event.status.as_str())
            );
            if event.is_terminal() {
                break;
            }
        }
    });

    let waited = tokio::select! {
        waited = service.wait_for_terminal(&job.id, timeout) => Some(waited),
        _ = tokio::signal::ctrl_c() => None,
    };
    progress.abort();

    // The job runs inside this process; whatever has not finished by now
    // never will, so it is failed rather than left pending.
    for abandoned in service.shutdown(Duration::ZERO).await {
        log::warn!("Job {} was stopped before it finished", abandoned.id);
    }

    let Some(waited) = waited else {
        bail!("Interrupted; job {} was stopped", job.id);
    };
    let job = waited?;
    match job.status {
        JobStatus::Completed => {
            let recipe_id = job.recipe_id.as_deref().context("completed job has no recipe")?;
            match service.recipe(recipe_id)? {
                Some(recipe) => print_json(&recipe),
                None => bail!("Recipe {} not found", recipe_id),
            }
        }
        _ => bail!(
            "{}",
            job.error.as_deref().unwrap_or("Extraction failed")
        ),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
