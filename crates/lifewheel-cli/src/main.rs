mod display;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use lifewheel_ai::{AiBackend, AiConfig, OpenAiBackend, OpenAiConfig, WheelAi};
use lifewheel_core::MAX_SERIES_DAYS;
use lifewheel_session::{FeedbackDraft, Session};
use lifewheel_store::{DuckStore, MemoryStore, StoreError, StoreMode, WheelStore};
use lifewheel_sync::FunctionsClient;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lifewheel")]
#[command(about = "Wheel of Life scores driven by peer feedback", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// DuckDB database file
    #[arg(long, env = "LIFEWHEEL_DB", global = true)]
    db: Option<PathBuf>,

    /// Use the seeded in-memory store; nothing is persisted
    #[arg(long, env = "LIFEWHEEL_MOCK", global = true)]
    mock: bool,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    openai_key: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = lifewheel_ai::openai::DEFAULT_BASE_URL, global = true)]
    openai_base_url: String,

    #[arg(long, env = "LIFEWHEEL_MODEL", default_value = lifewheel_ai::openai::DEFAULT_MODEL, global = true)]
    model: String,

    /// Base URL of the hosted functions; takes precedence over OpenAI
    #[arg(long, env = "LIFEWHEEL_FUNCTIONS_URL", global = true)]
    functions_url: Option<String>,

    #[arg(long, env = "LIFEWHEEL_FUNCTIONS_KEY", hide_env_values = true, global = true)]
    functions_key: Option<String>,

    /// Timeout for each AI call, in seconds
    #[arg(long, env = "LIFEWHEEL_TIMEOUT_SECS", default_value = "8", global = true)]
    timeout_secs: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the tables and default users
    Init,
    /// List users and their latest average score
    Users,
    /// Show a user's wheel and feedback
    Show {
        #[arg(short, long)]
        user: String,
        /// Date to show (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Show a user's scores day by day
    History {
        #[arg(short, long)]
        user: String,
        /// Number of days to show, at most ten years
        #[arg(
            long,
            default_value = "7",
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_SERIES_DAYS))
        )]
        days: u32,
        /// Last day of the series, defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Submit feedback and update the recipient's wheel
    Submit {
        /// Sender user id
        #[arg(long)]
        from: String,
        /// Recipient user id
        #[arg(long)]
        to: String,
        #[arg(short, long)]
        text: String,
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Narrative analysis of a user's wheel
    Analyze {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Classify a piece of text into wheel categories
    Classify { text: String },
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Open the configured store, degrading to the mock store when the database
/// cannot be opened or is not set up.
async fn open_store(cli: &Cli) -> Arc<dyn WheelStore> {
    let Some(path) = cli.db.as_deref().filter(|_| !cli.mock) else {
        return Arc::new(MemoryStore::mock());
    };
    let store: Arc<dyn WheelStore> = match open_database(path).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "database unavailable, using mock data");
            Arc::new(MemoryStore::mock())
        }
    };
    store
}

async fn open_database(path: &Path) -> Result<DuckStore, StoreError> {
    let store = DuckStore::open_persistent(path)?;
    store.check_setup().await?;
    Ok(store)
}

/// Hosted functions if configured, else OpenAI if a key is set, else offline.
fn build_backend(cli: &Cli) -> Option<Arc<dyn AiBackend>> {
    if let Some(url) = &cli.functions_url {
        let key = cli.functions_key.clone().unwrap_or_default();
        let client: Arc<dyn AiBackend> = Arc::new(FunctionsClient::new(url.clone(), key));
        return Some(client);
    }
    let api_key = cli.openai_key.clone()?;
    let backend: Arc<dyn AiBackend> = Arc::new(OpenAiBackend::new(OpenAiConfig {
        api_key,
        base_url: cli.openai_base_url.clone(),
        model: cli.model.clone(),
    }));
    Some(backend)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("lifewheel v{}", env!("CARGO_PKG_VERSION"));

    let store = open_store(&cli).await;
    let config = AiConfig::with_timeout(Duration::from_secs(cli.timeout_secs));
    let ai = Arc::new(WheelAi::new(build_backend(&cli), &config));

    if let Commands::Init = cli.command {
        store.check_setup().await.context("checking store setup")?;
        store
            .ensure_default_users()
            .await
            .context("creating default users")?;
        let users = store.users().await.context("listing users")?;
        println!("Store ready ({}), {} users", mode_label(store.mode()), users.len());
        return Ok(());
    }

    let session = Session::open(store, ai)
        .await
        .context("opening session")?;
    if session.store_mode() == StoreMode::Mock {
        eprintln!("note: running on mock data, changes are not saved");
    }

    match cli.command {
        Commands::Init => {}
        Commands::Users => {
            let mut views = Vec::new();
            for user in session.users().await {
                views.extend(session.view(&user.id).await);
            }
            display::print_users(&views, today());
        }
        Commands::Show { user, date } => {
            let date = date.unwrap_or_else(today);
            let view = session
                .view(&user)
                .await
                .with_context(|| format!("unknown user {user}"))?;
            display::print_wheel_card(&view, date);
            display::print_feedback(&view, &session.users().await);
        }
        Commands::History { user, days, date } => {
            let view = session
                .view(&user)
                .await
                .with_context(|| format!("unknown user {user}"))?;
            display::print_history(&view, date.unwrap_or_else(today), days);
        }
        Commands::Submit {
            from,
            to,
            text,
            date,
        } => {
            let date = date.unwrap_or_else(today);
            session.login(&from, today()).await.context("logging in")?;
            let outcome = session
                .submit_feedback(FeedbackDraft::new(to.clone(), text, date))
                .await;
            session.close().await;
            match outcome {
                Ok(report) => {
                    display::print_notices(&report.notices);
                    if let Some(view) = session.view(&to).await {
                        display::print_wheel_card(&view, date);
                    }
                }
                Err(e) => {
                    display::print_notices(&[e.notice()]);
                    return Err(e).context("submitting feedback");
                }
            }
        }
        Commands::Analyze { user, date } => {
            let analysis = session
                .analyze(&user, date.unwrap_or_else(today))
                .await
                .context("analysing wheel")?;
            display::print_notices(analysis.notice.as_slice());
            println!("{}", analysis.text);
        }
        Commands::Classify { text } => {
            let translation = session.ai().translator.translate(&text).await;
            let classification = session.ai().classifier.classify(&translation.text).await;
            let notices: Vec<_> = translation
                .notice
                .into_iter()
                .chain(classification.notice.clone())
                .collect();
            display::print_notices(&notices);
            display::print_classification(&translation.text, &classification);
        }
    }

    Ok(())
}

fn mode_label(mode: StoreMode) -> &'static str {
    match mode {
        StoreMode::Live => "live",
        StoreMode::Mock => "mock",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_days(args: &[&str]) -> Result<u32, clap::Error> {
        let cli = Cli::try_parse_from(["lifewheel", "history", "--user", "2"].iter().chain(args))?;
        match cli.command {
            Commands::History { days, .. } => Ok(days),
            _ => unreachable!("parsed a history command"),
        }
    }

    #[test]
    fn history_days_defaults_to_a_week() {
        assert_eq!(history_days(&[]).unwrap(), 7);
        assert_eq!(history_days(&["--days", "30"]).unwrap(), 30);
    }

    #[test]
    fn history_days_is_bounded() {
        assert!(history_days(&["--days", "0"]).is_err());
        assert!(history_days(&["--days", "4000000000"]).is_err());
        assert_eq!(
            history_days(&["--days", MAX_SERIES_DAYS.to_string().as_str()]).unwrap(),
            MAX_SERIES_DAYS
        );
    }
}
