/*
newsreel - main.rs
Command-line surface over the feed pipeline and the article store: `sync`
runs fetch -> parse -> store against the configured feed; the remaining
subcommands are the manual CRUD operations.
*/

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use common::Config;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use newsreel::fetch;
use newsreel::images::FsImageStore;
use newsreel::model::INPUT_DATE_FORMAT;
use newsreel::parser::{self, DateErrorPolicy};
use newsreel::repository;

#[derive(Parser, Debug)]
#[command(name = "newsreel", about = "RSS article ingestion and management")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the configured feed and store new articles
    Sync,
    /// List stored articles
    List,
    /// Show every field of one article
    Show { id: i64 },
    /// Add an article by hand
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        link: String,
        #[arg(long)]
        description: String,
        /// Publish date, e.g. "01.01.2024. 10:00"
        #[arg(long)]
        date: String,
        /// Local image file to copy into the assets directory
        #[arg(long)]
        picture: Option<PathBuf>,
    },
    /// Update fields of an existing article
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        link: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Publish date, e.g. "01.01.2024. 10:00"
        #[arg(long)]
        date: Option<String>,
        /// Replacement image; the previously stored file is removed
        #[arg(long)]
        picture: Option<PathBuf>,
    },
    /// Delete an article and its stored picture
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() {
            Some(p)
        } else {
            None
        }
    };

    // Load configuration with defaults
    let config = Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await
    .context("failed to load configuration")?;

    let pool = common::init_db_pool(&config.database.path)
        .await
        .context("failed to initialize database pool")?;
    common::run_migrations(&pool).await?;

    let assets_dir = config
        .images
        .as_ref()
        .and_then(|i| i.dir.clone())
        .unwrap_or_else(|| "assets".to_string());
    let images = FsImageStore::new(&assets_dir)?;

    match args.command {
        Command::Sync => {
            let timeout = config
                .feed
                .timeout_seconds
                .unwrap_or(fetch::DEFAULT_TIMEOUT_SECS);
            let policy = match config.feed.date_error_policy.as_deref() {
                Some("skip") => DateErrorPolicy::SkipField,
                Some("abort") | None => DateErrorPolicy::Abort,
                Some(other) => bail!("unknown date_error_policy {other:?} (expected \"abort\" or \"skip\")"),
            };

            info!(url = %config.feed.url, "fetching feed");
            let body = fetch::fetch_feed(&config.feed.url, timeout).await?;
            let articles = parser::parse_feed(&body, &images, policy).await?;
            info!(fetched = articles.len(), "feed parsed");

            let new_ids = repository::store_articles(&pool, &articles).await?;
            info!(stored = new_ids.len(), "sync complete");
            println!("fetched {} articles, stored {} new", articles.len(), new_ids.len());
        }

        Command::List => {
            let articles = repository::list_articles(&pool).await?;
            for article in &articles {
                println!(
                    "{:>5}  {}  {}",
                    article.id,
                    article.published_at.format(INPUT_DATE_FORMAT),
                    article.title
                );
            }
            println!("{} article(s)", articles.len());
        }

        Command::Show { id } => {
            let Some(article) = repository::get_article(&pool, id).await? else {
                bail!("no article with id {id}");
            };
            println!("id:          {}", article.id);
            println!("title:       {}", article.title);
            println!("link:        {}", article.link);
            println!("description: {}", article.description);
            println!("published:   {}", article.published_at.format(INPUT_DATE_FORMAT));
            println!(
                "picture:     {}",
                article.picture_path.as_deref().unwrap_or("(none)")
            );
        }

        Command::Add {
            title,
            link,
            description,
            date,
            picture,
        } => {
            require_non_empty("title", &title)?;
            require_non_empty("link", &link)?;
            require_non_empty("description", &description)?;
            let published_at = parse_input_date(&date)?;

            let picture_path = match picture {
                Some(path) => Some(
                    images
                        .import(&path)
                        .await?
                        .to_string_lossy()
                        .into_owned(),
                ),
                None => None,
            };

            let id = repository::insert_article(
                &pool,
                title.trim(),
                link.trim(),
                description.trim(),
                published_at,
                picture_path.as_deref(),
            )
            .await?;
            println!("created article {id}");
        }

        Command::Update {
            id,
            title,
            link,
            description,
            date,
            picture,
        } => {
            let Some(mut article) = repository::get_article(&pool, id).await? else {
                bail!("no article with id {id}");
            };

            if let Some(title) = title {
                require_non_empty("title", &title)?;
                article.title = title.trim().to_string();
            }
            if let Some(link) = link {
                require_non_empty("link", &link)?;
                article.link = link.trim().to_string();
            }
            if let Some(description) = description {
                require_non_empty("description", &description)?;
                article.description = description.trim().to_string();
            }
            if let Some(date) = date {
                article.published_at = parse_input_date(&date)?;
            }
            if let Some(path) = picture {
                remove_picture_file(article.picture_path.as_deref()).await;
                article.picture_path = Some(
                    images
                        .import(&path)
                        .await?
                        .to_string_lossy()
                        .into_owned(),
                );
            }

            if !repository::update_article(&pool, &article).await? {
                bail!("article {id} disappeared during update");
            }
            println!("updated article {id}");
        }

        Command::Delete { id } => {
            let Some(article) = repository::get_article(&pool, id).await? else {
                bail!("no article with id {id}");
            };
            remove_picture_file(article.picture_path.as_deref()).await;

            repository::delete_article(&pool, id).await?;
            println!("deleted article {id}");
        }
    }

    Ok(())
}

fn require_non_empty(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{name} must not be empty");
    }
    Ok(())
}

/// Parses a user-entered date in the form format (not the feed format).
fn parse_input_date(text: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), INPUT_DATE_FORMAT)
        .with_context(|| format!("invalid date {text:?}, expected format {INPUT_DATE_FORMAT}"))?;
    Ok(naive.and_utc())
}

/// Best-effort removal of an article's stored picture; a leftover file is
/// not worth failing the command over.
async fn remove_picture_file(path: Option<&str>) {
    let Some(path) = path else { return };
    if let Err(e) = tokio::fs::remove_file(Path::new(path)).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path, error = %e, "failed to remove stored picture");
        }
    }
}
