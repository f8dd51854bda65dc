use std::panic;
use std::path::PathBuf;

use anyhow::Context;
use backtrace::Backtrace;
use chrono::Utc;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use ethers::signers::Signer;
use teenet_cli::code;
use teenet_cli::config::Config;
use teenet_cli::node;
use teenet_cli::Console;
use teenet_cli::StatusFilter;
use teenet_cli::TaskCache;
use teenet_cli::TaskLifecycle;
use teenet_cli::Wallets;
use teenet_registry::Connection;
use teenet_registry::EthCodeRegistry;
use teenet_registry::EthNodeRegistry;
use teenet_registry::EthTaskRegistry;
use tracing::debug;
use tracing::error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(name = "teenet", version, about = "Client of the TEENet code, node and task registries")]
struct Cli {
    /// Path to the configuration file.
    #[clap(short, long, env = "TEENET_CONFIG")]
    config: Option<String>,

    /// If set, output logs in JSON format.
    #[clap(short, long, action)]
    json: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Commands that handle task info
    #[clap(subcommand)]
    Task(TaskCommand),
    /// Commands that handle code info
    #[clap(subcommand)]
    Code(CodeCommand),
    /// Commands that handle TEE node info
    #[clap(subcommand)]
    Node(NodeCommand),
    /// Wallet related commands
    #[clap(subcommand)]
    Wallet(WalletCommand),
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    /// Download all task info from the registry
    Update,
    /// List task info including id, reward, expiry date and node participation
    List {
        #[clap(long, value_enum, default_value_t)]
        status: StatusFilter,
    },
    /// Get details of a task
    Get { id: String },
    /// Add a task
    Add(SignerFile),
    /// Join a task
    Join {
        /// Wallet index or address
        signer: String,
        id: String,
        pk: String,
    },
    /// Get withdraw balance
    Balance(SignerOnly),
    /// Withdraw balance
    Withdraw(SignerOnly),
    /// Distribute reward
    Reward(SignerFile),
    /// Get the deposit locked for a task
    Deposit { id: String },
}

#[derive(Subcommand, Debug)]
enum CodeCommand {
    /// Get code info by hash
    Get { hash: String },
    /// Add or update code info
    AddOrUpdate(SignerFile),
    /// Remove code info by hash
    Remove {
        /// Wallet index or address
        signer: String,
        hash: String,
    },
}

#[derive(Subcommand, Debug)]
enum NodeCommand {
    /// Get TEE node info by public key
    Get { pk: String },
    /// Add or update TEE node info
    AddOrUpdate(SignerFile),
    /// Remove TEE node info by public key
    Remove {
        /// Wallet index or address
        signer: String,
        pk: String,
    },
}

#[derive(Subcommand, Debug)]
enum WalletCommand {
    /// List all available wallets
    List,
}

#[derive(Args, Debug)]
struct SignerOnly {
    /// Wallet index or address
    signer: String,
}

#[derive(Args, Debug)]
struct SignerFile {
    /// Wallet index or address
    signer: String,
    /// JSON input file
    file: PathBuf,
}

fn setup_logging(json: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_target(true)
        .with_env_filter(filter);
    let result = if json {
        tracing::subscriber::set_global_default(
            builder
                .json()
                .with_file(true)
                .with_line_number(true)
                .finish(),
        )
    } else {
        tracing::subscriber::set_global_default(
            builder
                .compact()
                .finish(),
        )
    };
    if let Err(e) = result {
        eprintln!("Setting up logging failed: {e}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.json);

    panic::set_hook(Box::new(|panic_info| {
        let msg = match panic_info
            .payload()
            .downcast_ref::<&'static str>()
        {
            Some(s) => *s,
            None => {
                match panic_info
                    .payload()
                    .downcast_ref::<String>()
                {
                    Some(s) => &s[..],
                    None => "Box<dyn Any>",
                }
            },
        };
        let (file, lineno, col) = match panic_info.location() {
            Some(l) => (l.file(), l.line(), l.column()),
            None => ("<unknown>", 0, 0),
        };

        error!(
            msg,
            file,
            lineno,
            col,
            "Panic occurred: {:?}",
            Backtrace::new(),
        );
    }));

    let config = Config::load(cli.config)?;
    config.validate()?;
    debug!("Loaded configuration: {:?}", config);

    run(&config, cli.command).await
}

async fn run(
    config: &Config,
    command: Command,
) -> anyhow::Result<()> {
    let out = Console;
    let connection = Connection::new(&config.chain.rpc_url, config.chain.chain_id)?;

    match command {
        Command::Task(command) => {
            let registry = EthTaskRegistry::new(
                connection,
                config
                    .contracts
                    .task_address()?,
            );
            let cache = TaskCache::new(
                config
                    .data
                    .task_cache_path(),
            );
            let tasks = TaskLifecycle::new(&registry, &cache, &out);
            run_task(config, &tasks, command).await
        },
        Command::Code(command) => {
            let registry = EthCodeRegistry::new(
                connection,
                config
                    .contracts
                    .code_address()?,
            );
            match command {
                CodeCommand::Get { hash } => {
                    code::get(&registry, &out, &hash).await?;
                },
                CodeCommand::AddOrUpdate(args) => {
                    let wallets = Wallets::load(&config.wallet)?;
                    let signer = wallets.resolve(&args.signer)?;
                    code::add_or_update(&registry, &out, signer, &args.file).await?;
                },
                CodeCommand::Remove { signer, hash } => {
                    let wallets = Wallets::load(&config.wallet)?;
                    let signer = wallets.resolve(&signer)?;
                    code::remove(&registry, &out, signer, &hash).await?;
                },
            }
            Ok(())
        },
        Command::Node(command) => {
            let registry = EthNodeRegistry::new(
                connection,
                config
                    .contracts
                    .node_address()?,
            );
            match command {
                NodeCommand::Get { pk } => {
                    node::get(&registry, &out, &pk).await?;
                },
                NodeCommand::AddOrUpdate(args) => {
                    let wallets = Wallets::load(&config.wallet)?;
                    let signer = wallets.resolve(&args.signer)?;
                    node::add_or_update(&registry, &out, signer, &args.file).await?;
                },
                NodeCommand::Remove { signer, pk } => {
                    let wallets = Wallets::load(&config.wallet)?;
                    let signer = wallets.resolve(&signer)?;
                    node::remove(&registry, &out, signer, &pk).await?;
                },
            }
            Ok(())
        },
        Command::Wallet(WalletCommand::List) => {
            Wallets::load(&config.wallet)?.print(&out);
            Ok(())
        },
    }
}

async fn run_task(
    config: &Config,
    tasks: &TaskLifecycle<'_, EthTaskRegistry>,
    command: TaskCommand,
) -> anyhow::Result<()> {
    match command {
        TaskCommand::Update => {
            tasks
                .update()
                .await?;
        },
        TaskCommand::List { status } => {
            let now = u64::try_from(
                Utc::now().timestamp(),
            )
            .context("system clock is before the epoch")?;
            tasks.list(status, now)?;
        },
        TaskCommand::Get { id } => {
            tasks.get(&id)?;
        },
        TaskCommand::Add(args) => {
            let wallets = Wallets::load(&config.wallet)?;
            let signer = wallets.resolve(&args.signer)?;
            tasks
                .add(signer, &args.file)
                .await?;
        },
        TaskCommand::Join { signer, id, pk } => {
            let wallets = Wallets::load(&config.wallet)?;
            let signer = wallets.resolve(&signer)?;
            tasks
                .join(signer, &id, &pk)
                .await?;
        },
        TaskCommand::Balance(args) => {
            let wallets = Wallets::load(&config.wallet)?;
            let signer = wallets.resolve(&args.signer)?;
            tasks
                .balance(signer.address())
                .await?;
        },
        TaskCommand::Withdraw(args) => {
            let wallets = Wallets::load(&config.wallet)?;
            let signer = wallets.resolve(&args.signer)?;
            tasks
                .withdraw(signer)
                .await?;
        },
        TaskCommand::Reward(args) => {
            let wallets = Wallets::load(&config.wallet)?;
            let signer = wallets.resolve(&args.signer)?;
            tasks
                .reward(signer, &args.file)
                .await?;
        },
        TaskCommand::Deposit { id } => {
            tasks
                .deposit(&id)
                .await?;
        },
    }
    Ok(())
}
