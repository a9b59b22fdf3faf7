//! Command-line front end for the feed scrapers
//!
//! Records stream to one output file per invocation. A URL or post id
//! that fails is logged and skipped; the rest of the batch still runs.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

use feed_scraper::config::ScrapeConfig;
use feed_scraper::driver::Driver;
use feed_scraper::extract::{Extractor, PostExtractor, TweetExtractor, TweetOptions};
use feed_scraper::feed::SnapshotFeed;
use feed_scraper::fetch::{search_url, Fetcher};
use feed_scraper::record::Record;
use feed_scraper::sink::{CsvSink, JsonLinesSink, Sink};
use feed_scraper::thread::{parse_thread, thread_url};

#[derive(Parser)]
#[command(name = "feed_scraper", version)]
#[command(about = "Scrape Reddit posts and X tweets from rendered feeds")]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape Reddit search result posts
    Reddit {
        #[command(flatten)]
        source: Source,
        #[arg(long)]
        target: Option<usize>,
        #[arg(long, default_value = "raw_reddit_posts.csv")]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
    },

    /// Scrape tweets from an X timeline or search
    X {
        #[command(flatten)]
        source: Source,
        /// Search query, fetched as an X search URL
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        target: Option<usize>,
        /// Hover each author for user id and follow counts
        #[arg(long)]
        poster_details: bool,
        #[arg(long, default_value = "tweets")]
        out_dir: PathBuf,
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
    },

    /// Print post, comments and replies of Reddit threads as JSON
    Thread {
        #[arg(required = true)]
        post_ids: Vec<String>,
        #[arg(long, default_value = "https://reddit.com")]
        base: String,
    },
}

#[derive(Args)]
struct Source {
    /// Saved snapshots of one scrolling page, in scroll order
    #[arg(long, num_args = 1..)]
    snapshot: Vec<PathBuf>,

    /// Pages to fetch, each scraped on its own
    #[arg(long, num_args = 1..)]
    url: Vec<String>,

    /// Base URL for resolving relative links in snapshots
    #[arg(long)]
    base_url: Option<Url>,
}

impl Source {
    fn is_empty(&self) -> bool {
        self.snapshot.is_empty() && self.url.is_empty()
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Jsonl,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Jsonl => "jsonl",
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => ScrapeConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ScrapeConfig::default(),
    };
    let fetcher = Fetcher::new(&config.fetch);

    match cli.command {
        Commands::Reddit {
            source,
            target,
            out,
            format,
        } => {
            if source.is_empty() {
                bail!("Nothing to scrape: pass --snapshot or --url");
            }
            if let Some(target) = target {
                config.driver.target = target;
            }
            let extractor = PostExtractor::new().context("Failed to compile post locators")?;
            let mut sink = open_sink(&out, format)?;
            let emitted = scrape(&fetcher, extractor, &config, &source, &[], &mut sink)?;
            info!(emitted, out = %out.display(), "reddit scrape done");
        }
        Commands::X {
            source,
            query,
            target,
            poster_details,
            out_dir,
            format,
        } => {
            if source.is_empty() && query.is_none() {
                bail!("Nothing to scrape: pass --snapshot, --url or --query");
            }
            if let Some(target) = target {
                config.driver.target = target;
            }
            let extractor = TweetExtractor::new(TweetOptions {
                poster_details,
                hover: config.hover.retry_policy(),
            })
            .context("Failed to compile tweet locators")?;

            let queries = match &query {
                Some(q) => vec![search_url(q)?],
                None => Vec::new(),
            };

            fs::create_dir_all(&out_dir)
                .with_context(|| format!("Failed to create {}", out_dir.display()))?;
            let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
            let ext = format.extension();
            let partial = out_dir.join(format!("{stamp}_tweets.{ext}"));

            let mut sink = open_sink(&partial, format)?;
            let emitted = scrape(&fetcher, extractor, &config, &source, &queries, &mut sink)?;
            drop(sink);

            let out = out_dir.join(format!("{stamp}_tweets_1-{emitted}.{ext}"));
            fs::rename(&partial, &out)
                .with_context(|| format!("Failed to rename output to {}", out.display()))?;
            info!(emitted, out = %out.display(), "x scrape done");
        }
        Commands::Thread { post_ids, base } => {
            for post_id in &post_ids {
                let info = thread_url(&base, post_id)
                    .and_then(|url| fetcher.fetch_text(&url))
                    .and_then(|json| parse_thread(&json));
                match info {
                    Ok(info) => println!("{}", serde_json::to_string_pretty(&info)?),
                    Err(e) => warn!(post_id = %post_id, error = %e, "skipping thread"),
                }
            }
        }
    }

    Ok(())
}

fn open_sink<R: Record + 'static>(path: &Path, format: Format) -> Result<Box<dyn Sink<R>>> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let out = BufWriter::new(file);
    let sink: Box<dyn Sink<R>> = match format {
        Format::Csv => Box::new(CsvSink::new(out)?),
        Format::Jsonl => Box::new(JsonLinesSink::new(out)),
    };
    Ok(sink)
}

/// Run the driver over the snapshot sequence, then over every URL.
/// Returns the number of records written.
fn scrape<E: Extractor>(
    fetcher: &Fetcher,
    extractor: E,
    config: &ScrapeConfig,
    source: &Source,
    extra_urls: &[String],
    sink: &mut Box<dyn Sink<E::Output>>,
) -> Result<usize> {
    let driver = Driver::new(extractor, config.driver.drive_options());
    let mut emitted = 0;

    if !source.snapshot.is_empty() {
        let mut feed = SnapshotFeed::open(source.snapshot.clone(), source.base_url.clone())
            .context("Failed to open snapshots")?;
        emitted += driver.run(&mut feed, sink)?.emitted;
    }

    for url in source.url.iter().chain(extra_urls) {
        let mut page = match fetcher.fetch_page(url) {
            Ok(page) => page,
            Err(e) => {
                warn!(url = %url, error = %e, "skipping url");
                continue;
            }
        };
        emitted += driver.run(&mut page, sink)?.emitted;
    }

    Ok(emitted)
}
