use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use ringlet_node::client::HttpGateway;
use ringlet_node::config::Config;
use ringlet_node::config::PeerAddress;
use ringlet_node::config::DEFAULT_CONFIG_PATH;
use ringlet_node::config::DEFAULT_HOST;
use ringlet_node::config::DEFAULT_PORT;
use ringlet_node::logging::init_logging;
use ringlet_node::logging::LogLevel;
use ringlet_node::processor::ProcessorBuilder;
use ringlet_node::ringlet_core::dht::Did;
use ringlet_node::ringlet_core::gateway::Operation;
use ringlet_node::ringlet_core::gateway::RemoteGateway;
use ringlet_node::util::parse_peer;
use serde_json::json;
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(about, version, author)]
struct Cli {
    #[arg(long, default_value_t = LogLevel::Info, value_enum, env)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Command {
    /// Write a default config file.
    Init(InitArgs),
    /// Serve a ring node until Ctrl-C, then leave the ring.
    Run(RunArgs),
    /// Send one operation to a running node and print the answer.
    Query(QueryArgs),
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    location: String,

    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(long = "well-known", help = "well-known peer as host:port, repeatable")]
    well_known: Vec<String>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long, short = 'c', default_value = DEFAULT_CONFIG_PATH, env = "RINGLET_CONFIG")]
    config: String,

    #[arg(long, short = 'b', env = "RINGLET_BOOTSTRAP", help = "peer to join as host:port")]
    bootstrap: Option<String>,
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[arg(long, short = 'e', default_value = "127.0.0.1:50000", env = "RINGLET_ENDPOINT")]
    endpoint: String,

    #[arg(help = "operation name, e.g. status, find-successor, handle/echo")]
    operation: String,

    #[arg(long, short = 'k', help = "key to hash into the request id")]
    key: Option<String>,

    #[arg(long, conflicts_with = "key", help = "hexadecimal request id")]
    id: Option<String>,

    #[arg(long, short = 'p', help = "raw JSON payload")]
    payload: Option<String>,

    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,
}

fn init(args: InitArgs) -> anyhow::Result<()> {
    let mut config = Config::new(args.host, args.port);
    for address in args.well_known {
        let peer = parse_peer(&address)?;
        config.well_known_peers.push(PeerAddress {
            host: peer.host().to_string(),
            port: peer.port(),
        });
    }
    let path = config.write_fs(&args.location)?;
    println!("Your config file has saved to: {path}");
    Ok(())
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = Config::read_fs(&args.config)
        .with_context(|| format!("cannot load config {}, try `ringlet init`", args.config))?;
    let bootstrap = args.bootstrap.as_deref().map(parse_peer).transpose()?;

    let processor = ProcessorBuilder::from_config(&config).build()?;
    let handle = processor.listen()?;
    tracing::info!("node {} ({}) started", processor.peer(), processor.did());

    match processor.join(bootstrap).await {
        Ok(true) => tracing::info!("joined the ring"),
        Ok(false) => tracing::info!("no peer to join, starting a new ring"),
        Err(e) => tracing::warn!("join failed, running alone: {}", e),
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    processor.shutdown().await?;
    handle.await?;
    Ok(())
}

async fn query(args: QueryArgs) -> anyhow::Result<()> {
    let target = parse_peer(&args.endpoint)?;
    let operation = Operation::from_str(&args.operation)?;
    let payload: Value = match (args.payload, args.key, args.id) {
        (Some(raw), _, _) => serde_json::from_str(&raw).context("payload is not JSON")?,
        (None, Some(key), _) => json!({ "id": Did::from_key(&key) }),
        (None, None, Some(id)) => json!({ "id": Did::from_str(&id)? }),
        (None, None, None) => json!({}),
    };

    let gateway = HttpGateway::new(Duration::from_millis(args.timeout_ms))?;
    let value = gateway
        .call(&target, &operation, payload)
        .await
        .with_context(|| format!("{operation} on {target} failed"))?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_level);

    match cli.command {
        Command::Init(args) => init(args),
        Command::Run(args) => run(args).await,
        Command::Query(args) => query(args).await,
    }
}
