//! wpharvest CLI
//!
//! Two-stage harvester: `download` pulls a site's REST content into JSON
//! batches, `extract` cross-links those batches offline.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use wpharvest::{
    config::{BasicAuth, Config, SessionConfig},
    error::Result,
    models::EntityKind,
    parse::MirrorMap,
    pipeline::{DownloadOptions, WpDownloader, WpExtractor},
    services::RequestSession,
};

/// wpharvest - WordPress REST API harvester
#[derive(Parser, Debug)]
#[command(name = "wpharvest", version, about = "WordPress site harvester")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download a site's content through its REST API
    Download(DownloadArgs),

    /// Cross-link downloaded batches and export the enriched records
    Extract(ExtractArgs),
}

#[derive(Args, Debug)]
struct DownloadArgs {
    /// Site to harvest; the scheme may be omitted
    target: String,

    /// Directory for the downloaded JSON batches
    out_dir: PathBuf,

    /// Directory for media files; they are not downloaded when unset
    #[arg(long)]
    media_dest: Option<PathBuf>,

    /// Prefix for the batch file names
    #[arg(short = 'P', long)]
    json_prefix: Option<String>,

    /// Entity types to leave out (repeatable)
    #[arg(long = "skip-type", value_name = "TYPE")]
    skip_type: Vec<EntityKind>,

    /// Session settings file (TOML); flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Proxy for all requests
    #[arg(long)]
    proxy: Option<String>,

    /// Basic auth credentials as user:password
    #[arg(long)]
    auth: Option<BasicAuth>,

    /// Cookie header to send with every request
    #[arg(long)]
    cookies: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Seconds to pause after each successful request
    #[arg(short, long)]
    wait: Option<f64>,

    /// Scale each pause by a random factor between 0.5 and 1.5
    #[arg(long, requires = "wait")]
    random_wait: bool,

    /// Retries per request before giving up
    #[arg(long)]
    max_retries: Option<usize>,

    /// Base delay of the exponential retry backoff, in seconds
    #[arg(long)]
    backoff_factor: Option<f64>,

    /// Redirects to follow before treating a URL as a loop
    #[arg(long)]
    max_redirects: Option<usize>,

    /// User-Agent header override
    #[arg(long)]
    user_agent: Option<String>,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Directory holding the downloaded JSON batches
    json_dir: PathBuf,

    /// Directory for the enriched output
    out_dir: PathBuf,

    /// Root of an HTML mirror of the site, used for translation pickers
    #[arg(short = 'S', long)]
    scrape_root: Option<PathBuf>,

    /// Prefix of the batch file names
    #[arg(short = 'P', long)]
    json_prefix: Option<String>,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Overlay command line flags on top of the loaded session settings.
fn apply_session_flags(session: &mut SessionConfig, args: &DownloadArgs) {
    if let Some(user_agent) = &args.user_agent {
        session.user_agent = user_agent.clone();
    }
    if let Some(timeout) = args.timeout {
        session.timeout = timeout;
    }
    if let Some(max_retries) = args.max_retries {
        session.max_retries = max_retries;
    }
    if let Some(backoff_factor) = args.backoff_factor {
        session.backoff_factor = backoff_factor;
    }
    if let Some(max_redirects) = args.max_redirects {
        session.max_redirects = max_redirects;
    }
    if args.wait.is_some() {
        session.wait = args.wait;
    }
    if args.random_wait {
        session.random_wait = true;
    }
    if args.proxy.is_some() {
        session.proxy = args.proxy.clone();
    }
    if args.cookies.is_some() {
        session.cookies = args.cookies.clone();
    }
    if args.auth.is_some() {
        session.auth = args.auth.clone();
    }
}

async fn run_download(args: DownloadArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    apply_session_flags(&mut config.session, &args);
    config.validate()?;

    let session = Arc::new(RequestSession::new(config.session)?);
    let downloader = WpDownloader::new(
        DownloadOptions {
            target: args.target,
            out_dir: args.out_dir,
            media_dest: args.media_dest,
            prefix: args.json_prefix,
            skip: args.skip_type,
        },
        session,
    );

    let summary = downloader.download().await?;
    log::info!(
        "Downloaded {} entity types ({} entries) from {}",
        summary.kinds.len(),
        summary.kinds.iter().map(|k| k.entries).sum::<usize>(),
        summary.target
    );
    Ok(())
}

async fn run_extract(args: ExtractArgs) -> Result<()> {
    let mirror = match &args.scrape_root {
        Some(root) => {
            let map = MirrorMap::build(root)?;
            log::info!("Mapped {} mirrored pages under {}", map.len(), root.display());
            Some(map)
        }
        None => None,
    };

    let extractor = WpExtractor::new(args.json_dir, args.out_dir, args.json_prefix, mirror);
    extractor.extract().await
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Download(args) => run_download(args).await?,
        Command::Extract(args) => run_extract(args).await?,
    }

    log::info!("Done!");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_random_wait_requires_wait() {
        let bare = Cli::try_parse_from([
            "wpharvest",
            "download",
            "https://example.org",
            "out",
            "--random-wait",
        ]);
        assert!(bare.is_err());

        let with_wait = Cli::try_parse_from([
            "wpharvest",
            "download",
            "https://example.org",
            "out",
            "--wait",
            "1.5",
            "--random-wait",
        ]);
        assert!(with_wait.is_ok());
    }

    #[test]
    fn test_skip_type_parses_kinds() {
        let cli = Cli::try_parse_from([
            "wpharvest",
            "download",
            "https://example.org",
            "out",
            "--skip-type",
            "posts",
            "--skip-type",
            "media",
        ])
        .unwrap();

        let Command::Download(args) = cli.command else {
            panic!("expected the download command");
        };
        assert_eq!(args.skip_type, vec![EntityKind::Post, EntityKind::Media]);
    }

    #[test]
    fn test_bad_auth_is_rejected() {
        let result = Cli::try_parse_from([
            "wpharvest",
            "download",
            "https://example.org",
            "out",
            "--auth",
            "no-colon",
        ]);
        assert!(result.is_err());
    }
}
