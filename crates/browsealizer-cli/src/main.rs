mod browse;
mod render;

use anyhow::Context;
use browsealizer_core::{
    Browser, Category, Command, Config, DateRange, GitHubProvider, JsonFileStorage, Preferences,
    SearchFilters, SortKey, UiEvent, ViewMode,
};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "browsealizer")]
#[command(version, about = "Browse and discover GitHub repositories from the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Args, Debug, Clone)]
struct FilterArgs {
    /// Only repositories written in this language
    #[arg(short, long)]
    language: Option<String>,

    /// Minimum number of stars
    #[arg(long, default_value_t = 0)]
    min_stars: u32,

    /// Only repositories created recently (daily, weekly, monthly, yearly)
    #[arg(long)]
    since: Option<DateRange>,

    /// Sort by stars, forks, updated or help-wanted-issues
    #[arg(long, default_value = "stars")]
    sort: SortKey,
}

impl From<FilterArgs> for SearchFilters {
    fn from(args: FilterArgs) -> Self {
        SearchFilters {
            language: args.language,
            min_stars: args.min_stars,
            date_range: args.since,
            sort: args.sort,
        }
    }
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Search for repositories
    Search {
        /// Search query
        query: String,

        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Browse a category (trending, stars, recent, recommendations)
    Category {
        category: Category,

        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Repositories tagged with a topic
    Topic {
        topic: String,

        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Show repository details
    Show {
        /// Repository name (owner/repo)
        name: String,
    },
    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        action: Option<FavoritesAction>,
    },
    /// Show or change preferences
    Settings {
        #[arg(long)]
        dark_mode: Option<bool>,

        /// Show recommendation popups while browsing
        #[arg(long)]
        recommendations: Option<bool>,

        /// Seconds each recommendation stays up
        #[arg(long)]
        interval: Option<u64>,

        /// grid or list
        #[arg(long)]
        view: Option<ViewMode>,
    },
    /// Show the current GitHub API quota
    RateLimit,
    /// Interactive session with recommendations (the default)
    Browse,
}

#[derive(clap::Subcommand)]
enum FavoritesAction {
    /// List favorites (the default)
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a repository (owner/repo)
    Add { name: String },
    /// Remove a repository (owner/repo)
    Remove { name: String },
}

fn build_browser(config: &Config) -> anyhow::Result<(Browser, Arc<GitHubProvider>)> {
    let github = Arc::new(GitHubProvider::from_config(config)?);

    let state_path = config.state_path()?;
    tracing::debug!("Preferences at {}", state_path.display());
    let preferences = Preferences::load(
        Box::new(JsonFileStorage::new(state_path)),
        Duration::from_millis(config.recommendations.default_interval_ms),
    );

    let browser = Browser::new(github.clone(), preferences, config);
    Ok((browser, github))
}

fn flush(browser: &mut Browser) {
    for event in browser.drain_events() {
        // One-shot commands have no use for spinners or popups
        if matches!(
            event,
            UiEvent::Loading { .. } | UiEvent::RecommendationShown(_) | UiEvent::RecommendationHidden
        ) {
            continue;
        }
        render::event(&event, browser.preferences());
    }
}

async fn list(browser: &mut Browser, command: Command, filters: FilterArgs) -> anyhow::Result<()> {
    let now = Instant::now();
    // Filters first; that search is superseded before it ever runs
    browser.dispatch(Command::ApplyFilters(filters.into()), now)?;
    browser.execute(command, now).await?;
    flush(browser);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - helps when things go sideways
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "browsealizer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load config")?;
    let (mut browser, github) = build_browser(&config)?;

    match cli.command.unwrap_or(Commands::Browse) {
        Commands::Search { query, filters } => {
            tracing::info!("Searching for: {}", query);
            list(&mut browser, Command::Search(query), filters).await?;
        }
        Commands::Category { category, filters } => {
            list(&mut browser, Command::SelectCategory(category), filters).await?;
        }
        Commands::Topic { topic, filters } => {
            list(&mut browser, Command::SelectTopic(topic), filters).await?;
        }
        Commands::Show { name } => {
            tracing::info!("Showing repository: {}", name);
            browser.open_by_name(&name, Instant::now()).await?;
            flush(&mut browser);
        }
        Commands::Favorites { action } => {
            match action.unwrap_or(FavoritesAction::List { json: false }) {
                FavoritesAction::List { json: true } => {
                    let entries = browser.preferences().favorites().list();
                    println!("{}", serde_json::to_string_pretty(entries)?);
                }
                FavoritesAction::List { json: false } => {
                    render::favorites(browser.preferences().favorites().list());
                }
                FavoritesAction::Add { name } => {
                    let id = browser.lookup(&name).await?;
                    browser.dispatch(Command::AddFavorite(id), Instant::now())?;
                }
                FavoritesAction::Remove { name } => {
                    let id = browser
                        .preferences()
                        .favorites()
                        .find_by_name(&name)
                        .map(|entry| entry.id);
                    match id {
                        Some(id) => {
                            browser.dispatch(Command::RemoveFavorite(id), Instant::now())?;
                            println!("Removed {} from favorites", name);
                        }
                        None => println!("{} is not in your favorites", name),
                    }
                }
            }
            flush(&mut browser);
        }
        Commands::Settings {
            dark_mode,
            recommendations,
            interval,
            view,
        } => {
            let now = Instant::now();
            let mut changes = Vec::new();
            if let Some(on) = dark_mode {
                changes.push(Command::SetDarkMode(on));
            }
            if let Some(on) = recommendations {
                changes.push(Command::SetRecommendations(on));
            }
            if let Some(secs) = interval {
                changes.push(Command::SetRecommendationInterval(Duration::from_secs(secs)));
            }
            if let Some(view) = view {
                changes.push(Command::SetView(view));
            }

            for change in changes {
                browser.dispatch(change, now)?;
            }
            // Print the final state once rather than after every change
            browser.drain_events();
            render::settings(browser.preferences());
        }
        Commands::RateLimit => {
            let client = github.client();
            if let Err(e) = client.check_rate_limit().await {
                eprintln!("Error fetching rate limit: {}", e);
            }
            render::rate_limit(
                &client.rate_limit_state(),
                client.time_until_reset(),
                &client.request_log(),
            );
        }
        Commands::Browse => browse::run(browser, github).await?,
    }

    Ok(())
}
