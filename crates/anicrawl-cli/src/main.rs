//! anicrawl: crawl anime catalogs into JSON files
//!
//! Loads the crawl configuration, applies command-line overrides and crawls
//! every selected source one after another.

use std::path::PathBuf;
use std::process::ExitCode;

use anicrawl_core::{
    CrawlConfig, CrawlError, Crawler, JsonFileSink, RecordSink, Result, SourceProfile,
};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "anicrawl")]
#[command(about = "Crawl AnimeVost and AniDub into structured JSON records")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML); built-in defaults are used if it does not exist
    #[arg(short, long, default_value = "anicrawl.toml")]
    config: PathBuf,

    /// Source to crawl, repeatable (default: every configured source)
    #[arg(short, long = "source")]
    sources: Vec<String>,

    /// Output directory
    #[arg(short, long, default_value = "data")]
    out_dir: PathBuf,

    /// Maximum listing pages per section
    #[arg(long)]
    max_pages: Option<u32>,

    /// Delay after each listing page in milliseconds
    #[arg(long)]
    page_delay_ms: Option<u64>,

    /// Delay after each detail page in milliseconds
    #[arg(long)]
    item_delay_ms: Option<u64>,

    /// Resolve at most this many items per source
    #[arg(long)]
    limit: Option<usize>,

    /// Only collect listings, skip detail pages
    #[arg(long)]
    listing_only: bool,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Configuration from file or defaults, with flag overrides applied
    fn load_config(&self) -> Result<CrawlConfig> {
        let mut config = if self.config.exists() {
            CrawlConfig::load(&self.config)?
        } else {
            CrawlConfig::default()
        };

        let crawl = &mut config.crawl;
        if let Some(max_pages) = self.max_pages {
            crawl.max_pages = Some(max_pages);
        }
        if let Some(delay) = self.page_delay_ms {
            crawl.page_delay_ms = delay;
        }
        if let Some(delay) = self.item_delay_ms {
            crawl.item_delay_ms = delay;
        }
        if let Some(limit) = self.limit {
            crawl.item_limit = Some(limit);
        }

        config.validate()?;
        Ok(config)
    }

    /// Profiles named on the command line, in the given order
    fn selected_sources(&self, config: &CrawlConfig) -> Result<Vec<SourceProfile>> {
        if self.sources.is_empty() {
            return Ok(config.sources.clone());
        }

        self.sources
            .iter()
            .map(|name| {
                config
                    .source(name)
                    .cloned()
                    .ok_or_else(|| CrawlError::Config(format!("unknown source {:?}", name)))
            })
            .collect()
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "anicrawl=info,anicrawl_core=info",
        1 => "anicrawl=debug,anicrawl_core=debug",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn crawl_source(
    profile: SourceProfile,
    config: &CrawlConfig,
    listing_only: bool,
    sink: &mut dyn RecordSink,
) -> Result<()> {
    let crawler = Crawler::with_config(profile, config.crawl.clone(), &config.client)?;
    let name = crawler.profile().name.clone();

    if listing_only {
        let entries = crawler.crawl_listing().await?;
        sink.write_listing(&name, &entries)?;
        info!(source = %name, entries = entries.len(), "Listing written");
        return Ok(());
    }

    let summary = crawler.run(sink).await?;
    info!(
        source = %summary.source,
        listed = summary.listed,
        resolved = summary.resolved,
        failed = summary.failed,
        "Source done"
    );
    Ok(())
}

async fn run(cli: &Cli) -> Result<()> {
    let config = cli.load_config()?;
    let sources = cli.selected_sources(&config)?;
    let mut sink = JsonFileSink::new(&cli.out_dir)?;

    info!(
        sources = sources.len(),
        out_dir = %sink.dir().display(),
        "Starting crawl"
    );

    for profile in sources {
        crawl_source(profile, &config, cli.listing_only, &mut sink).await?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Crawl aborted");
            ExitCode::FAILURE
        }
    }
}
