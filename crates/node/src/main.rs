// node/src/main.rs
use clap::{Args, Parser, Subcommand};
use ledger_core::{Amount, CallContext, Receipt, Timestamp};
use ledger_crypto::Address;
use node::{resolve_account, unix_timestamp, Node, NodeConfig};
use registry::{EventConfig, WelfareConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "signup-node")]
#[command(about = "Signup & redemption ledger node", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "./data/config.toml")]
    config: String,

    /// Override the wall clock (unix seconds or RFC 3339)
    #[arg(long, global = true)]
    at: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new data directory with a default config
    Init {
        /// Data directory
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },

    /// Show ledger status
    Status,

    /// Reward token operations
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Event registry operations
    Event {
        #[command(subcommand)]
        command: EventCommands,
    },

    /// Welfare registry operations
    Welfare {
        #[command(subcommand)]
        command: WelfareCommands,
    },

    /// Print committed log records
    Log {
        /// First sequence number to print
        #[arg(long, default_value = "0")]
        since: u64,
    },
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Show balance and lifetime received volume
    Balance { account: String },
    Mint {
        #[arg(long)]
        from: String,
        to: String,
        amount: u64,
    },
    Burn {
        #[arg(long)]
        from: String,
        account: String,
        amount: u64,
    },
    Transfer {
        #[arg(long)]
        from: String,
        to: String,
        amount: u64,
    },
    Approve {
        #[arg(long)]
        from: String,
        spender: String,
        amount: u64,
    },
    Pause {
        #[arg(long)]
        from: String,
    },
    Unpause {
        #[arg(long)]
        from: String,
    },
}

/// Fields shared by both registry variants
#[derive(Args)]
struct RegistryArgs {
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long)]
    capacity: u32,
    #[arg(long)]
    signup_start: String,
    #[arg(long)]
    signup_end: String,
    /// Deploy outside the factory, owned by the caller
    #[arg(long)]
    direct: bool,
}

#[derive(Subcommand)]
enum EventCommands {
    Create {
        #[arg(long)]
        from: String,
        #[command(flatten)]
        registry: RegistryArgs,
        #[arg(long)]
        event_start: String,
        #[arg(long)]
        event_end: String,
        #[arg(long)]
        reward: u64,
    },
    SignUp {
        #[arg(long)]
        from: String,
        registry: String,
        #[arg(long, default_value = "")]
        metadata: String,
    },
    CheckIn {
        #[arg(long)]
        from: String,
        registry: String,
    },
    Deactivate {
        #[arg(long)]
        from: String,
        registry: String,
    },
    Archive {
        #[arg(long)]
        from: String,
        registry: String,
    },
    Show {
        registry: String,
        /// Also print metadata visible to this account
        #[arg(long)]
        viewer: Option<String>,
    },
    List,
}

#[derive(Subcommand)]
enum WelfareCommands {
    Create {
        #[arg(long)]
        from: String,
        #[command(flatten)]
        registry: RegistryArgs,
        #[arg(long)]
        redemption_end: String,
        #[arg(long)]
        cost: u64,
    },
    SignUp {
        #[arg(long)]
        from: String,
        registry: String,
    },
    Redeem {
        #[arg(long)]
        from: String,
        registry: String,
    },
    Deactivate {
        #[arg(long)]
        from: String,
        registry: String,
    },
    Archive {
        #[arg(long)]
        from: String,
        registry: String,
    },
    Show { registry: String },
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(log_level).into())
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Init { data_dir } => init_node(&data_dir)?,
        command => {
            let now = match &cli.at {
                Some(at) => parse_time(at)?,
                None => unix_timestamp(),
            };
            let node = Node::open(load_config(&cli.config)?)?;
            run_command(&node, command, now).await?;
        }
    }

    Ok(())
}

/// Filter used when `RUST_LOG` is unset: every workspace crate at `level`,
/// storage internals at warn.
fn default_filter(level: &str) -> String {
    ["signup_node", "node", "registry", "token", "ledger_core"]
        .iter()
        .map(|target| format!("{}={}", target, level))
        .chain(std::iter::once("storage=warn".to_string()))
        .collect::<Vec<_>>()
        .join(",")
}

async fn run_command(node: &Node, command: Commands, now: Timestamp) -> anyhow::Result<()> {
    match command {
        Commands::Init { data_dir } => init_node(&data_dir)?,
        Commands::Status => show_status(node).await?,
        Commands::Token { command } => handle_token_command(node, command, now).await?,
        Commands::Event { command } => handle_event_command(node, command, now).await?,
        Commands::Welfare { command } => handle_welfare_command(node, command, now).await?,
        Commands::Log { since } => {
            for record in node.database().load_logs_since(since)? {
                println!(
                    "#{} t={} caller={} {} {:?}",
                    record.sequence,
                    record.timestamp,
                    record.caller,
                    record.log.address,
                    record.log.event
                );
            }
        }
    }
    Ok(())
}

fn init_node(data_dir: &str) -> anyhow::Result<()> {
    tracing::info!("Initializing node at {}", data_dir);

    std::fs::create_dir_all(data_dir)?;
    std::fs::create_dir_all(format!("{}/db", data_dir))?;

    let config = NodeConfig {
        data_dir: data_dir.to_string(),
        ..Default::default()
    };
    config.to_file(&format!("{}/config.toml", data_dir))?;

    tracing::info!("Node initialized successfully at {}", data_dir);
    tracing::info!("Edit {}/config.toml before the first call; genesis runs on first open", data_dir);

    Ok(())
}

fn load_config(path: &str) -> anyhow::Result<NodeConfig> {
    if std::path::Path::new(path).exists() {
        tracing::debug!("Loading configuration from {}", path);
        NodeConfig::from_file(path)
    } else {
        tracing::warn!("No configuration at {}, using defaults", path);
        Ok(NodeConfig::default())
    }
}

/// Unix seconds, or an RFC 3339 date-time
fn parse_time(value: &str) -> anyhow::Result<Timestamp> {
    if let Ok(seconds) = value.parse::<Timestamp>() {
        return Ok(seconds);
    }
    let parsed = chrono::DateTime::parse_from_rfc3339(value)
        .map_err(|e| anyhow::anyhow!("invalid time '{}': {}", value, e))?;
    let seconds = parsed.timestamp();
    if seconds < 0 {
        anyhow::bail!("time '{}' is before the unix epoch", value);
    }
    Ok(seconds as Timestamp)
}

fn context(from: &str, now: Timestamp) -> anyhow::Result<CallContext> {
    Ok(CallContext::new(resolve_account(from)?, now))
}

fn print_receipt(receipt: &Receipt) {
    if let Some(address) = receipt.contract_address {
        println!("contract: {}", address);
    }
    for record in &receipt.logs {
        println!("#{} {} {:?}", record.sequence, record.log.address, record.log.event);
    }
}

async fn show_status(node: &Node) -> anyhow::Result<()> {
    let stats = node.database().stats()?;
    node.query(|ledger| {
        let token = ledger.token();
        println!("token:              {} ({}) at {}", token.name(), token.symbol(), token.address());
        println!("treasury:           {}", token.treasury());
        println!("total supply:       {}", token.total_supply());
        println!("circulating supply: {}", token.circulating_supply());
        println!("paused:             {}", token.is_paused());
        println!("event factory:      {} ({} active)", ledger.event_factory().address(), ledger.active_events().len());
        println!("welfare factory:    {} ({} active)", ledger.welfare_factory().address(), ledger.active_welfares().len());
        println!("log records:        {}", ledger.log().len());
    })
    .await;
    println!("database:           {} events, {} welfares on disk", stats.events, stats.welfares);
    Ok(())
}

async fn handle_token_command(node: &Node, command: TokenCommands, now: Timestamp) -> anyhow::Result<()> {
    let receipt = match command {
        TokenCommands::Balance { account } => {
            let account = resolve_account(&account)?;
            let (balance, received) = node
                .query(|ledger| (ledger.token().balance_of(&account), ledger.token().received_volume(&account)))
                .await;
            println!("{}: balance {}, received {}", account, balance, received);
            return Ok(());
        }
        TokenCommands::Mint { from, to, amount } => {
            let (ctx, to) = (context(&from, now)?, resolve_account(&to)?);
            node.execute(|ledger| ledger.mint(&ctx, to, &Amount::from_u64(amount))).await?
        }
        TokenCommands::Burn { from, account, amount } => {
            let (ctx, account) = (context(&from, now)?, resolve_account(&account)?);
            node.execute(|ledger| ledger.burn(&ctx, account, &Amount::from_u64(amount))).await?
        }
        TokenCommands::Transfer { from, to, amount } => {
            let (ctx, to) = (context(&from, now)?, resolve_account(&to)?);
            node.execute(|ledger| ledger.transfer(&ctx, to, &Amount::from_u64(amount))).await?
        }
        TokenCommands::Approve { from, spender, amount } => {
            let (ctx, spender) = (context(&from, now)?, resolve_account(&spender)?);
            node.execute(|ledger| ledger.approve(&ctx, spender, &Amount::from_u64(amount))).await?
        }
        TokenCommands::Pause { from } => {
            let ctx = context(&from, now)?;
            node.execute(|ledger| ledger.pause(&ctx)).await?
        }
        TokenCommands::Unpause { from } => {
            let ctx = context(&from, now)?;
            node.execute(|ledger| ledger.unpause(&ctx)).await?
        }
    };
    print_receipt(&receipt);
    Ok(())
}

async fn handle_event_command(node: &Node, command: EventCommands, now: Timestamp) -> anyhow::Result<()> {
    let receipt = match command {
        EventCommands::Create { from, registry, event_start, event_end, reward } => {
            let ctx = context(&from, now)?;
            let direct = registry.direct;
            let config = EventConfig {
                name: registry.name,
                description: registry.description,
                max_capacity: registry.capacity,
                signup_start_time: parse_time(&registry.signup_start)?,
                signup_end_time: parse_time(&registry.signup_end)?,
                event_start_time: parse_time(&event_start)?,
                event_end_time: parse_time(&event_end)?,
                reward_cost: Amount::from_u64(reward),
            };
            if direct {
                node.execute(|ledger| ledger.deploy_event(&ctx, config)).await?
            } else {
                node.execute(|ledger| ledger.create_event(&ctx, config)).await?
            }
        }
        EventCommands::SignUp { from, registry, metadata } => {
            let (ctx, registry) = (context(&from, now)?, resolve_account(&registry)?);
            node.execute(|ledger| ledger.sign_up_event(&ctx, &registry, metadata)).await?
        }
        EventCommands::CheckIn { from, registry } => {
            let (ctx, registry) = (context(&from, now)?, resolve_account(&registry)?);
            node.execute(|ledger| ledger.check_in(&ctx, &registry)).await?
        }
        EventCommands::Deactivate { from, registry } => {
            let (ctx, registry) = (context(&from, now)?, resolve_account(&registry)?);
            node.execute(|ledger| ledger.deactivate_event(&ctx, &registry)).await?
        }
        EventCommands::Archive { from, registry } => {
            let (ctx, registry) = (context(&from, now)?, resolve_account(&registry)?);
            node.execute(|ledger| ledger.archive_event(&ctx, &registry)).await?
        }
        EventCommands::Show { registry, viewer } => {
            let registry = resolve_account(&registry)?;
            let viewer = viewer.as_deref().map(resolve_account).transpose()?;
            return show_event(node, registry, viewer, now).await;
        }
        EventCommands::List => {
            let (active, inactive) = node.query(|l| (l.active_events(), l.inactive_events())).await;
            print_partition(&active, &inactive);
            return Ok(());
        }
    };
    print_receipt(&receipt);
    Ok(())
}

async fn show_event(node: &Node, registry: Address, viewer: Option<Address>, now: Timestamp) -> anyhow::Result<()> {
    node.query(|ledger| -> anyhow::Result<()> {
        let event = ledger.event(&registry)?;
        let details = event.details();
        println!("{} '{}' ({})", details.address, details.name, event.phase(now));
        println!("  creator:   {}", details.creator);
        println!("  signup:    {} .. {}", details.signup_start_time, details.signup_end_time);
        println!("  event:     {} .. {}", details.event_start_time, details.event_end_time);
        println!("  reward:    {} ({:?})", details.reward_cost, details.reward_source);
        println!("  attendees: {}/{} ({} checked in)", details.attendee_count, details.max_capacity, details.checked_in_count);
        println!("  active:    {}", details.is_active);

        if let Some(viewer) = viewer {
            let ctx = CallContext::new(viewer, now);
            if viewer == details.creator {
                for (attendee, metadata) in event.attendees().iter().zip(event.all_metadata(&ctx)?) {
                    println!("  {} {:?}", attendee, metadata);
                }
            } else {
                println!("  {} {:?}", viewer, ledger.event_metadata(&ctx, &registry, &viewer)?);
            }
        }
        Ok(())
    })
    .await
}

async fn handle_welfare_command(node: &Node, command: WelfareCommands, now: Timestamp) -> anyhow::Result<()> {
    let receipt = match command {
        WelfareCommands::Create { from, registry, redemption_end, cost } => {
            let ctx = context(&from, now)?;
            let direct = registry.direct;
            let config = WelfareConfig {
                name: registry.name,
                description: registry.description,
                max_capacity: registry.capacity,
                signup_start_time: parse_time(&registry.signup_start)?,
                signup_end_time: parse_time(&registry.signup_end)?,
                redemption_end_time: parse_time(&redemption_end)?,
                redemption_cost: Amount::from_u64(cost),
            };
            if direct {
                node.execute(|ledger| ledger.deploy_welfare(&ctx, config)).await?
            } else {
                node.execute(|ledger| ledger.create_welfare(&ctx, config)).await?
            }
        }
        WelfareCommands::SignUp { from, registry } => {
            let (ctx, registry) = (context(&from, now)?, resolve_account(&registry)?);
            node.execute(|ledger| ledger.sign_up_welfare(&ctx, &registry)).await?
        }
        WelfareCommands::Redeem { from, registry } => {
            let (ctx, registry) = (context(&from, now)?, resolve_account(&registry)?);
            node.execute(|ledger| ledger.redeem(&ctx, &registry)).await?
        }
        WelfareCommands::Deactivate { from, registry } => {
            let (ctx, registry) = (context(&from, now)?, resolve_account(&registry)?);
            node.execute(|ledger| ledger.deactivate_welfare(&ctx, &registry)).await?
        }
        WelfareCommands::Archive { from, registry } => {
            let (ctx, registry) = (context(&from, now)?, resolve_account(&registry)?);
            node.execute(|ledger| ledger.archive_welfare(&ctx, &registry)).await?
        }
        WelfareCommands::Show { registry } => {
            let registry = resolve_account(&registry)?;
            return node
                .query(|ledger| -> anyhow::Result<()> {
                    let welfare = ledger.welfare(&registry)?;
                    let details = welfare.details();
                    println!("{} '{}' ({})", details.address, details.name, welfare.phase(now));
                    println!("  creator:    {}", details.creator);
                    println!("  signup:     {} .. {}", details.signup_start_time, details.signup_end_time);
                    println!("  redeem by:  {}", details.redemption_end_time);
                    println!("  cost:       {}", details.redemption_cost);
                    println!("  attendees:  {}/{} ({} redeemed)", details.attendee_count, details.max_capacity, details.redeemed_count);
                    println!("  active:     {}", details.is_active);
                    Ok(())
                })
                .await;
        }
        WelfareCommands::List => {
            let (active, inactive) = node.query(|l| (l.active_welfares(), l.inactive_welfares())).await;
            print_partition(&active, &inactive);
            return Ok(());
        }
    };
    print_receipt(&receipt);
    Ok(())
}

fn print_partition(active: &[Address], inactive: &[Address]) {
    println!("active ({}):", active.len());
    for address in active {
        println!("  {}", address);
    }
    println!("archived ({}):", inactive.len());
    for address in inactive {
        println!("  {}", address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_covers_workspace_targets() {
        let filter = default_filter("debug");
        for target in ["signup_node", "node", "registry", "token", "ledger_core"] {
            assert!(filter.contains(&format!("{}=debug", target)), "{} missing", target);
        }
        assert!(filter.contains("storage=warn"));
        assert!(tracing_subscriber::EnvFilter::try_new(&filter).is_ok());
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("1700000000").unwrap(), 1_700_000_000);
        assert_eq!(parse_time("1970-01-01T00:01:40Z").unwrap(), 100);
        assert!(parse_time("yesterday").is_err());
    }
}
