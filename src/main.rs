use anyhow::Result;
use clap::Parser;
use safran_client::commands::{self, Config, FollowOptions, OutputFormat};
use safran_client::error::category_of;
use safran_client::experiment::ExperimentMetadata;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// safran - experiment import client
///
/// Upload an experiment descriptor with its samples and alarms CSV files to
/// the import server, then follow the import progress events.
///
/// Examples:
///   safran upload --reference R1 --name run --bench B --campaign C samples.csv alarms.csv
///   safran events 1f9c2e
#[derive(Parser, Debug)]
#[command(author, version = env!("SAFRAN_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Import server URL (defaults to http://localhost:8888)
    #[arg(
        long = "api-url",
        env = "SAFRAN_API_URL",
        value_name = "URL",
        global = true
    )]
    pub api_url: Option<String>,

    /// Give up connecting to the server after this many seconds
    #[arg(long = "connect-timeout", value_name = "SECS", global = true)]
    pub connect_timeout: Option<u64>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Upload an experiment and follow its import events
    Upload(UploadArgs),

    /// Follow the events of an existing channel
    Events(EventsArgs),
}

#[derive(clap::Args, Debug)]
pub struct UploadArgs {
    /// Experiment reference
    #[arg(long)]
    pub reference: String,

    /// Experiment name
    #[arg(long)]
    pub name: String,

    /// Test bench
    #[arg(long)]
    pub bench: String,

    /// Test campaign
    #[arg(long)]
    pub campaign: String,

    /// Samples CSV file
    #[arg(value_name = "SAMPLES")]
    pub samples: PathBuf,

    /// Alarms CSV file
    #[arg(value_name = "ALARMS")]
    pub alarms: PathBuf,

    /// Print the channel and exit without following events
    #[arg(long)]
    pub no_follow: bool,

    #[command(flatten)]
    pub follow: FollowArgs,
}

#[derive(clap::Args, Debug)]
pub struct EventsArgs {
    /// Channel returned by a previous upload
    #[arg(value_name = "CHANNEL")]
    pub channel: String,

    #[command(flatten)]
    pub follow: FollowArgs,
}

#[derive(clap::Args, Debug)]
pub struct FollowArgs {
    /// How to print received events
    #[arg(long, value_enum, default_value_t = OutputFormat::Raw)]
    pub format: OutputFormat,

    /// Stop following events after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl From<FollowArgs> for FollowOptions {
    fn from(args: FollowArgs) -> Self {
        FollowOptions {
            format: args.format,
            timeout: args.timeout.map(Duration::from_secs),
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::new(cli.api_url, cli.connect_timeout);

    match cli.command {
        Commands::Upload(args) => {
            let metadata =
                ExperimentMetadata::new(args.reference, args.name, args.bench, args.campaign);
            let follow = (!args.no_follow).then(|| FollowOptions::from(args.follow));
            commands::upload(&config, &metadata, &args.samples, &args.alarms, follow).await
        }
        Commands::Events(args) => {
            commands::events(&config, &args.channel, args.follow.into()).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match category_of(&e) {
                Some(category) => eprintln!("error [{}]: {:#}", category, e),
                None => eprintln!("error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}
