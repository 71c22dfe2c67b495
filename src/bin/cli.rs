//! list-export command line
//!
//! Scans a page for repeating lists and exports one of them as a CSV index
//! plus one cropped screenshot per item.

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use list_export::{
    ArchiveSink, BrowserSession, CaptureConfig, CapturePipeline, Channel, ConnectionOptions, ContentAgent,
    ContentClient, DirectorySink, DomTree, ExportStatus, LaunchOptions, LocalChannel, Page, StaticPage, ZipSink,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "list-export")]
#[command(version)]
#[command(about = "Detect repeating lists on a web page and export their items", long_about = None)]
struct Cli {
    #[command(flatten)]
    browser: BrowserArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct BrowserArgs {
    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H', global = true)]
    headed: bool,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH", global = true)]
    chrome: Option<PathBuf>,

    /// WebSocket endpoint of a running browser to connect to instead of launching one
    #[arg(long, value_name = "URL", global = true)]
    ws: Option<String>,

    /// Disable the Chrome sandbox (needed in some containers)
    #[arg(long, global = true)]
    no_sandbox: bool,
}

#[derive(Args)]
struct Target {
    /// Page to open
    #[arg(required_unless_present = "dom", conflicts_with = "dom")]
    url: Option<String>,

    /// Read a serialized DOM snapshot instead of opening a page
    #[arg(long, value_name = "FILE")]
    dom: Option<PathBuf>,
}

#[derive(Args)]
struct CaptureArgs {
    /// Pause after scrolling an item into view, in milliseconds
    #[arg(long, default_value = "200")]
    settle_ms: u64,

    /// Pause between items, in milliseconds
    #[arg(long, default_value = "200")]
    throttle_ms: u64,

    /// Retries after a failed screenshot
    #[arg(long, default_value = "3")]
    retries: u32,

    /// Backoff after a rate-limited screenshot, in milliseconds
    #[arg(long, default_value = "1500")]
    rate_limit_backoff_ms: u64,

    /// Backoff after any other failed screenshot, in milliseconds
    #[arg(long, default_value = "500")]
    transient_backoff_ms: u64,

    /// JPEG quality of the cropped images (1-100)
    #[arg(long, default_value = "90")]
    quality: u8,
}

impl CaptureArgs {
    fn config(&self) -> CaptureConfig {
        CaptureConfig::new()
            .settle(Duration::from_millis(self.settle_ms))
            .throttle(Duration::from_millis(self.throttle_ms))
            .max_retries(self.retries)
            .backoff(
                Duration::from_millis(self.rate_limit_backoff_ms),
                Duration::from_millis(self.transient_backoff_ms),
            )
            .jpeg_quality(self.quality)
    }
}

#[derive(Subcommand)]
enum Command {
    /// List the repeating groups found on a page, largest first
    Scan {
        #[command(flatten)]
        target: Target,
    },

    /// Print the fields of every item in a group as JSON lines
    Harvest {
        #[command(flatten)]
        target: Target,

        /// Group id as printed by `scan`
        #[arg(long)]
        group: usize,
    },

    /// Capture every item of a group into a zip file or directory
    Export {
        /// Page to open
        url: String,

        /// Group id as printed by `scan`
        #[arg(long)]
        group: usize,

        /// Zip file to create; any path without a `.zip` extension becomes a directory
        #[arg(long, value_name = "PATH", default_value = "list_export.zip")]
        out: PathBuf,

        #[command(flatten)]
        capture: CaptureArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Scan { target } => {
            let (_session, client) = open_target(&cli.browser, &target, CaptureConfig::default())?;
            print_groups(&client).await
        }
        Command::Harvest { target, group } => {
            let (_session, client) = open_target(&cli.browser, &target, CaptureConfig::default())?;
            client.scan().await?;
            let harvest = client.harvest_group(group).await?;
            log::info!("Fields: {}", harvest.fields.join(", "));
            for record in &harvest.records {
                println!("{}", serde_json::to_string(record)?);
            }
            Ok(())
        }
        Command::Export {
            url,
            group,
            out,
            capture,
        } => export(&cli.browser, &url, group, out, capture.config()).await,
    }
}

/// Client over whichever page `target` names
///
/// The returned session, if any, owns the browser and must outlive the client.
fn open_target(
    browser: &BrowserArgs,
    target: &Target,
    config: CaptureConfig,
) -> anyhow::Result<(Option<BrowserSession>, ContentClient<Box<dyn Channel>>)> {
    let (session, channel) = match (&target.dom, &target.url) {
        (Some(path), _) => {
            let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
            let tree = DomTree::from_json(&json)?;
            (None, local_channel(StaticPage::new(tree.root), config))
        }
        (None, Some(url)) => {
            let session = open_browser(browser)?;
            session.open(url)?;
            let channel = local_channel(session.page(), config);
            (Some(session), channel)
        }
        (None, None) => bail!("either a URL or --dom is required"),
    };
    Ok((session, ContentClient::new(channel)))
}

fn local_channel<P: Page + 'static>(page: P, config: CaptureConfig) -> Box<dyn Channel> {
    Box::new(LocalChannel::new(Arc::new(ContentAgent::new(page, config))))
}

fn open_browser(args: &BrowserArgs) -> anyhow::Result<BrowserSession> {
    if let Some(ws) = &args.ws {
        return Ok(BrowserSession::connect(ConnectionOptions::new(ws.clone()))?);
    }

    let mut options = LaunchOptions::new().headless(!args.headed).sandbox(!args.no_sandbox);
    if let Some(path) = &args.chrome {
        options = options.chrome_path(path);
    }
    Ok(BrowserSession::launch(options)?)
}

async fn print_groups<C: Channel>(client: &ContentClient<C>) -> anyhow::Result<()> {
    let groups = client.scan().await?;
    if groups.is_empty() {
        println!("No repeating groups found");
        return Ok(());
    }

    println!("{:>4}  {:>6}  {:<24}  SAMPLE", "ID", "ITEMS", "KIND");
    for group in &groups {
        println!("{:>4}  {:>6}  {:<24}  {}", group.id, group.count, group.kind, group.sample_text);
    }
    Ok(())
}

fn sink_for(out: &Path) -> Box<dyn ArchiveSink> {
    if out.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("zip")) {
        Box::new(ZipSink::new(out))
    } else {
        Box::new(DirectorySink::new(out))
    }
}

async fn export(
    browser: &BrowserArgs,
    url: &str,
    group: usize,
    out: PathBuf,
    config: CaptureConfig,
) -> anyhow::Result<()> {
    let session = open_browser(browser)?;
    session.open(url)?;

    let page = session.page();
    let capture = page.capture_resource();
    let agent = Arc::new(ContentAgent::new(page, config.clone()));
    let client = ContentClient::new(LocalChannel::new(agent));
    client.scan().await?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, finishing the export with the items captured so far");
            on_signal.cancel();
        }
    });

    let mut pipeline = CapturePipeline::new(client, capture, config).with_cancellation(cancel);
    let mut sink = sink_for(&out);
    let report = pipeline
        .run(group, sink.as_mut(), |progress| {
            log::info!("Capturing item {}/{}", progress.current, progress.total)
        })
        .await
        .with_context(|| format!("Export of group {} failed", group))?;

    println!(
        "{} rows written to {} ({} captured, {} empty, {} failed)",
        report.rows(),
        out.display(),
        report.captured,
        report.empty,
        report.failed
    );
    if report.status == ExportStatus::Cancelled {
        println!("Export was cancelled before all {} items were processed", report.total);
    }
    Ok(())
}
