use clap::{Parser, Subcommand};
use reelreply::channels::InstagramInbox;
use reelreply::config::Config;
use reelreply::scraper::ApifyClient;
use reelreply::seen_store::SeenStore;
use reelreply::{doctor, llm, logging, runtime};
use tracing::{error, info};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const LONG_ABOUT: &str = concat!(
    "ReelReply v",
    env!("CARGO_PKG_VERSION"),
    "\n",
    "Replies to reels shared in Instagram direct messages when their comments are funny.\n",
    "\n",
    "Required environment: GOOGLE_API_KEY, APIFY_KEY, INSTA_USERNAME, INSTA_PASSWORD",
);

#[derive(Debug, Parser)]
#[command(name = "reelreply", version = VERSION, about = LONG_ABOUT)]
struct Cli {
    #[command(subcommand)]
    command: Option<MainCommand>,
}

#[derive(Debug, Subcommand)]
enum MainCommand {
    /// Log in and start polling the inbox (default)
    Start,
    /// Preflight diagnostics for configuration and state
    Doctor {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show version
    Version,
}

fn print_version() {
    println!("reelreply {VERSION}");
}

async fn start() -> anyhow::Result<()> {
    let config = Config::load()?;
    let llm = llm::create_provider(&config)?;
    let store = SeenStore::load(config.state_path.as_str())?;
    info!(
        "Loaded {} replied messages for: {}",
        store.len(),
        config.insta_username
    );

    let inbox = InstagramInbox::new(&config)?;
    let scraper = ApifyClient::new(&config)?;

    let state = runtime::AppState {
        config,
        inbox: Box::new(inbox),
        scraper: Box::new(scraper),
        llm,
        store,
    };
    runtime::run(state).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(MainCommand::Start) | None => {}
        Some(MainCommand::Doctor { json }) => {
            doctor::run_cli(json)?;
            return Ok(());
        }
        Some(MainCommand::Version) => {
            print_version();
            return Ok(());
        }
    }

    logging::init_console_logging();
    if let Err(e) = start().await {
        error!("{e:#}");
        std::process::exit(1);
    }
    Ok(())
}
