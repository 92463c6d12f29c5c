use clap::Parser;
use hostwatch::{
    actors::monitor::{MonitorHandle, Start},
    config::Config,
};
use tracing::{info, trace};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Health and resource monitor for services and their host")]
struct Args {
    /// Config file (built-in defaults are used when missing or invalid)
    #[arg(short, long, env = "HOSTWATCH_CONFIG")]
    file: Option<String>,

    /// Run a single cycle, print the report as JSON and exit
    #[arg(long)]
    once: bool,
}

fn init() {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hostwatch=info"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(path) => Config::load_or_default(path),
        None => Config::default(),
    };

    let start = if args.once {
        Start::OnDemand
    } else {
        Start::Immediately
    };
    let monitor = MonitorHandle::spawn(config, start)?;

    if args.once {
        monitor.cycle_now().await?;
        let report = monitor.report().await;
        monitor.shutdown().await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    tokio::signal::ctrl_c().await?;
    info!("Monitoring stopped by user");
    monitor.shutdown().await;

    let report = monitor.report().await;
    info!("Final report: {}", serde_json::to_string(&report)?);

    Ok(())
}
