use anyhow::{Context, Result};
use bookfinder::catalog::{BookCollection, BookCursor, RecordConsumer};
use bookfinder::config::{find_config_file, get_config, load_config, Config};
use bookfinder::models::BookRecord;
use bookfinder::sources::{SourceCapabilities, SourceKind, SourceRegistry};
use bookfinder::store::{BookStore, JsonFileStore};
use bookfinder::utils::{books_table, records_table};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// bookfinder - Search Google Books and Open Library from one place
#[derive(Parser, Debug)]
#[command(name = "bookfinder")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search several book catalogs at once and import the results", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds (overrides configuration)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Disable the lookup cache for this command
    #[arg(long, global = true, default_value_t = false)]
    no_cache: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Table on a terminal, JSON otherwise
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
}

impl OutputFormat {
    fn resolve(self) -> OutputFormat {
        match self {
            OutputFormat::Auto if std::io::stdout().is_terminal() => OutputFormat::Table,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search every configured source and merge the results
    #[command(alias = "s")]
    Search {
        /// Search query (title, author, subject...)
        query: String,

        /// Sources to search, in order (default: configured list)
        #[arg(long, short, value_delimiter = ',')]
        source: Vec<String>,

        /// Results per source
        #[arg(long, short)]
        limit: Option<usize>,

        /// Keep records whose ISBN an earlier source already returned
        #[arg(long)]
        no_dedup: bool,

        /// Print results grouped by source
        #[arg(long)]
        group: bool,
    },

    /// Look up a book by ISBN, trying sources in order
    Isbn {
        isbn: String,

        #[arg(long, short, value_delimiter = ',')]
        source: Vec<String>,
    },

    /// Fetch a book by a source's own identifier
    Get {
        id: String,

        /// Source that issued the identifier
        #[arg(long, short, default_value = "google_books")]
        source: String,
    },

    /// Page lazily through one source's results
    Browse {
        query: String,

        #[arg(long, short, default_value = "google_books")]
        source: String,

        #[arg(long)]
        page_size: Option<usize>,

        #[arg(long)]
        max_pages: Option<usize>,

        /// Stop after this many records
        #[arg(long, short)]
        take: Option<usize>,
    },

    /// Search, then store the results in the local library
    Import {
        query: String,

        #[arg(long, short, value_delimiter = ',')]
        source: Vec<String>,

        #[arg(long, short)]
        limit: Option<usize>,

        /// Store at most this many books
        #[arg(long, short = 'n')]
        count: Option<usize>,

        /// Store books even when their ISBN is already in the library
        #[arg(long)]
        include_existing: bool,

        /// Library file (default: configured path)
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// List books in the local library
    #[command(alias = "ls")]
    Library {
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// List available sources
    Sources,

    /// Print the effective configuration
    Config,
}

fn init_logging(cli: &Cli) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("bookfinder={}", level)));

    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(path) = &cli.config {
        load_config(Some(path.as_path()))
            .with_context(|| format!("Failed to load {}", path.display()))?
    } else if let Some(path) = find_config_file() {
        tracing::info!("Using config file: {}", path.display());
        load_config(Some(path.as_path()))?
    } else {
        let config = get_config();
        config.validate()?;
        config
    };

    if let Some(timeout) = cli.timeout {
        config.http.timeout_secs = timeout.max(1);
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }
    Ok(config)
}

/// Replace the configured source list when the user named sources
fn select_sources(config: &Config, sources: &[String]) -> Result<Config> {
    let mut config = config.clone();
    if !sources.is_empty() {
        for id in sources {
            id.parse::<SourceKind>()?;
        }
        config.search.sources = sources.to_vec();
    }
    Ok(config)
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, finishing current source");
            child.cancel();
        }
    });
    token
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_records(records: &[BookRecord], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(records),
        _ => {
            if records.is_empty() {
                println!("No results.");
            } else {
                println!("{}", records_table(records));
            }
            Ok(())
        }
    }
}

fn print_record(record: Option<BookRecord>, format: OutputFormat) -> Result<()> {
    match (record, format) {
        (record, OutputFormat::Json) => print_json(&record),
        (Some(record), _) => {
            println!("{}", records_table(std::slice::from_ref(&record)));
            if let Some(description) = &record.description {
                println!("\n{}", description);
            }
            Ok(())
        }
        (None, _) => {
            println!("Not found.");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = resolve_config(&cli)?;
    let format = cli.output.resolve();

    match cli.command {
        Commands::Search {
            query,
            source,
            limit,
            no_dedup,
            group,
        } => {
            let config = select_sources(&config, &source)?;
            let collection = BookCollection::from_registry(&SourceRegistry::from_config(&config)?);
            let limit = limit.unwrap_or(config.search.limit_per_source);
            let dedupe = config.search.deduplicate && !no_dedup;

            let results = collection
                .multi_source_with_cancel(&query, limit, dedupe, &cancel_on_ctrl_c())
                .await?;

            for outcome in results.outcomes() {
                tracing::info!(
                    source = %outcome.source,
                    fetched = outcome.fetched,
                    kept = outcome.kept,
                    "source done"
                );
            }

            match (format, group) {
                (OutputFormat::Json, true) => print_json(&results.group_by_source())?,
                (OutputFormat::Json, false) => print_json(&results)?,
                (_, true) => {
                    for group in results.group_by_source() {
                        println!("{} ({} results)", group.source, group.records.len());
                        println!("{}", records_table(&group.records));
                    }
                }
                (_, false) => print_records(results.records(), format)?,
            }

            if results.is_cancelled() && !cli.quiet {
                eprintln!("Search interrupted; showing partial results.");
            }
        }

        Commands::Isbn { isbn, source } => {
            let config = select_sources(&config, &source)?;
            let collection = BookCollection::from_registry(&SourceRegistry::from_config(&config)?);
            let record = collection.find_by_isbn(isbn.trim()).await?;
            print_record(record, format)?;
        }

        Commands::Get { id, source } => {
            let config = select_sources(&config, std::slice::from_ref(&source))?;
            let registry = SourceRegistry::from_config(&config)?;
            let adapter = registry.get_required(&source)?;
            if !adapter.capabilities().contains(SourceCapabilities::ID_LOOKUP) {
                anyhow::bail!("{} does not support lookup by identifier", adapter.name());
            }
            print_record(adapter.fetch_by_id(&id).await, format)?;
        }

        Commands::Browse {
            query,
            source,
            page_size,
            max_pages,
            take,
        } => {
            let config = select_sources(&config, std::slice::from_ref(&source))?;
            let collection = BookCollection::from_registry(&SourceRegistry::from_config(&config)?);
            let mut pager = collection
                .lazy(
                    &query,
                    0,
                    page_size.unwrap_or(config.search.page_size),
                    max_pages.unwrap_or(config.search.max_pages),
                )
                .await?;

            let cancel = cancel_on_ctrl_c();
            let take = take.unwrap_or(usize::MAX);
            let mut records = Vec::new();
            while records.len() < take && !cancel.is_cancelled() {
                match pager.next_record().await {
                    Some(record) => records.push(record),
                    None => break,
                }
            }
            tracing::info!(pages = pager.pages_loaded(), records = records.len(), "browse finished");
            print_records(&records, format)?;
        }

        Commands::Import {
            query,
            source,
            limit,
            count,
            include_existing,
            store,
        } => {
            let config = select_sources(&config, &source)?;
            let collection = BookCollection::from_registry(&SourceRegistry::from_config(&config)?);
            let limit = limit.unwrap_or(config.search.limit_per_source);

            let results = collection
                .multi_source_with_cancel(
                    &query,
                    limit,
                    config.search.deduplicate,
                    &cancel_on_ctrl_c(),
                )
                .await?;

            let path = store.unwrap_or_else(|| config.store.path.clone());
            let store = Arc::new(JsonFileStore::open(&path).await?);
            let consumer = RecordConsumer::new(store.clone());
            let skip_existing = !include_existing;

            let mut cursor = results.into_cursor();
            let books = match count {
                Some(n) => consumer.materialize_batch(&mut cursor, n, skip_existing).await,
                None => consumer.materialize_remaining(&mut cursor, skip_existing).await,
            };

            if format == OutputFormat::Json {
                print_json(&books)?;
            } else if !cli.quiet {
                println!(
                    "Imported {} book(s) into {} ({} total).",
                    books.len(),
                    path.display(),
                    store.count().await?
                );
                if !books.is_empty() {
                    println!("{}", books_table(&books));
                }
            }
        }

        Commands::Library { store } => {
            let path = store.unwrap_or_else(|| config.store.path.clone());
            let books = JsonFileStore::open(&path).await?.list().await?;
            match format {
                OutputFormat::Json => print_json(&books)?,
                _ if books.is_empty() => println!("Library at {} is empty.", path.display()),
                _ => println!("{}", books_table(&books)),
            }
        }

        Commands::Sources => {
            let mut all = config.clone();
            all.search.sources = SourceKind::ALL.iter().map(|k| k.id().to_string()).collect();
            let registry = SourceRegistry::from_config(&all)?;

            let rows: Vec<_> = registry
                .all()
                .map(|s| {
                    serde_json::json!({
                        "id": s.id(),
                        "name": s.name(),
                        "enabled": config.search.sources.iter().any(|id| id == s.id()),
                        "isbn_lookup": s.capabilities().contains(SourceCapabilities::ISBN_LOOKUP),
                        "id_lookup": s.capabilities().contains(SourceCapabilities::ID_LOOKUP),
                    })
                })
                .collect();

            if format == OutputFormat::Json {
                print_json(&rows)?;
            } else {
                for row in &rows {
                    println!(
                        "{:<14} {:<14} enabled={} isbn={} id={}",
                        row["id"].as_str().unwrap_or_default(),
                        row["name"].as_str().unwrap_or_default(),
                        row["enabled"],
                        row["isbn_lookup"],
                        row["id_lookup"]
                    );
                }
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
