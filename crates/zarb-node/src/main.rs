//! Thin CLI binary wiring the zarb state-machine core together: key
//! generation, genesis authoring, and a `run` command that bootstraps or
//! restores the core and idles, ready for the networking and consensus
//! voting collaborators (§1, out of scope here) to drive it by calling
//! into `zarb-state`/`zarb-pool` directly.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use rand::rngs::OsRng;

use zarb_crypto::{Address, Keyfile, SecretKey, VrfKeypair};
use zarb_pool::TransactionPool;
use zarb_state::checker::StateChecker;
use zarb_store::MemoryStore;
use zarb_types::{Genesis, GenesisAccount, GenesisValidator};

#[derive(Parser)]
#[command(name = "zarb-node")]
#[command(about = "Zarb BFT state-machine core node")]
struct Cli {
    /// Minimum log level printed to stderr and, unless disabled, to the log file.
    #[clap(long, value_enum, default_value = "info")]
    log_level: LogLevelArg,

    /// Disable the rotating log file, logging to stderr only.
    #[clap(long)]
    disable_file_logging: bool,

    /// Disable ANSI colors in terminal log output.
    #[clap(long)]
    disable_log_color: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Error => LevelFilter::Error,
            LogLevelArg::Warn => LevelFilter::Warn,
            LogLevelArg::Info => LevelFilter::Info,
            LogLevelArg::Debug => LevelFilter::Debug,
            LogLevelArg::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Generate a fresh BLS signing key and VRF sortition key, print the
    /// derived address, and save both passphrase-protected under `--out`.
    Keygen {
        /// Destination file for the encrypted keyfile.
        #[clap(long)]
        out: PathBuf,
        /// Human-readable label stored alongside the ciphertext.
        #[clap(long, default_value = "validator")]
        label: String,
        /// Passphrase the keyfile is encrypted under.
        #[clap(long)]
        passphrase: String,
    },
    /// Write a sample genesis document: one treasury-funded account and
    /// one bonded validator generated from a fresh keypair, for use by
    /// `run` on a fresh chain.
    Genesis {
        /// Destination file for the genesis document.
        #[clap(long)]
        out: PathBuf,
        /// Chain name; `zarb-mainnet`/`zarb-testnet` are reserved (§6),
        /// anything else is treated as a test chain.
        #[clap(long, default_value = "zarb-testnet")]
        chain_name: String,
        /// Starting balance credited to the sample account.
        #[clap(long, default_value_t = 1_000_000)]
        balance: i64,
        /// Starting stake bonded to the sample validator.
        #[clap(long, default_value_t = 100)]
        stake: i64,
    },
    /// Bootstrap (first launch) or restore (subsequent launches) the
    /// state core under `--datadir` and report its status.
    Run {
        /// Genesis document to bootstrap from, if `--datadir` has no
        /// persisted `last_info.json` yet.
        #[clap(long)]
        genesis: PathBuf,
        /// Directory holding `last_info.json` across restarts (§6).
        #[clap(long)]
        datadir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.log_level.into(), !cli.disable_file_logging, !cli.disable_log_color)?;

    match cli.command {
        Command::Keygen { out, label, passphrase } => keygen(out, label, passphrase),
        Command::Genesis {
            out,
            chain_name,
            balance,
            stake,
        } => write_sample_genesis(out, chain_name, balance, stake),
        Command::Run { genesis, datadir } => run(genesis, datadir).await,
    }
}

fn init_logger(level: LevelFilter, file_logging: bool, colored: bool) -> Result<()> {
    let colors = fern::colors::ColoredLevelConfig::new()
        .error(fern::colors::Color::Red)
        .warn(fern::colors::Color::Yellow)
        .info(fern::colors::Color::Green)
        .debug(fern::colors::Color::Blue)
        .trace(fern::colors::Color::Magenta);

    let mut dispatch = fern::Dispatch::new()
        .format(move |out, message, record| {
            let level = if colored {
                colors.color(record.level()).to_string()
            } else {
                record.level().to_string()
            };
            out.finish(format_args!(
                "[{} {} {}] {}",
                Utc::now().format("%Y-%m-%d %H:%M:%S"),
                level,
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    if file_logging {
        dispatch = dispatch.chain(fern::log_file("zarb-node.log").context("opening log file")?);
    }

    dispatch.apply().context("installing logger")?;
    Ok(())
}

fn keygen(out: PathBuf, label: String, passphrase: String) -> Result<()> {
    let secret_key = SecretKey::generate(&mut OsRng);
    let public_key = secret_key.public_key();
    let address = Address::from_public_key(&public_key);
    let vrf_keypair = VrfKeypair::generate(&mut OsRng);

    // The BLS secret and the VRF secret are concatenated into one blob so
    // a single keyfile carries both keys a validator needs (§3): the
    // commit-signing key and the sortition key.
    let mut secret = secret_key.to_bytes().to_vec();
    secret.extend_from_slice(&vrf_keypair.secret().to_bytes());

    let keyfile = Keyfile::encrypt(&label, &secret, &passphrase).context("encrypting keyfile")?;
    std::fs::write(&out, keyfile.to_json()?).with_context(|| format!("writing keyfile to {}", out.display()))?;

    log::info!("generated validator key, address {address}, vrf public key {}", vrf_keypair.public().to_hex());
    println!("address: {address}");
    println!("public_key: {}", public_key.to_hex());
    println!("vrf_public_key: {}", vrf_keypair.public().to_hex());
    println!("keyfile written to {}", out.display());
    Ok(())
}

fn write_sample_genesis(out: PathBuf, chain_name: String, balance: i64, stake: i64) -> Result<()> {
    let account_key = SecretKey::generate(&mut OsRng);
    let account_address = Address::from_public_key(&account_key.public_key());

    let validator_key = SecretKey::generate(&mut OsRng);
    let validator_address = Address::from_public_key(&validator_key.public_key());

    let genesis = Genesis {
        chain_name,
        genesis_time: Utc::now(),
        accounts: vec![GenesisAccount {
            address: account_address,
            balance,
        }],
        validators: vec![GenesisValidator {
            address: validator_address,
            stake,
            public_key: validator_key.public_key(),
        }],
    };

    genesis
        .save_to_file(&out)
        .with_context(|| format!("writing genesis to {}", out.display()))?;

    log::info!("wrote genesis document for chain_id {}", genesis.chain_id()?);
    println!("chain_id: {}", genesis.chain_id()?);
    println!("account {account_address} funded with {balance}");
    println!("validator {validator_address} bonded with stake {stake}");
    println!("genesis written to {}", out.display());
    Ok(())
}

async fn run(genesis_path: PathBuf, datadir: PathBuf) -> Result<()> {
    tokio::fs::create_dir_all(&datadir)
        .await
        .with_context(|| format!("creating datadir {}", datadir.display()))?;

    let store = Arc::new(MemoryStore::new());
    let last_info_path = zarb_state::restore::last_info_path(&datadir);

    let machine = if tokio::fs::try_exists(&last_info_path).await.unwrap_or(false) {
        log::info!("restoring state core from {}", datadir.display());
        zarb_state::restore(
            Arc::clone(&store),
            datadir.clone(),
            zarb_state::config::DEFAULT_COMMITTEE_SIZE,
            zarb_state::config::DEFAULT_JOIN_LIMIT,
            zarb_state::config::MIN_TENURE_BLOCKS,
        )
        .await
        .context("restoring state core")?
    } else {
        let genesis = Genesis::load_from_file(&genesis_path).with_context(|| format!("loading genesis {}", genesis_path.display()))?;
        log::info!("bootstrapping fresh chain {}", genesis.chain_id()?);
        let (committee, last_info) = zarb_state::bootstrap(&*store, &genesis, zarb_state::config::DEFAULT_COMMITTEE_SIZE)
            .await
            .context("bootstrapping genesis")?;
        zarb_state::StateMachine::new(Arc::clone(&store), datadir.clone(), committee, last_info, genesis.validators.len() as u32)
    };

    let committee = machine.committee().await;
    let last_info = machine.last_info().await;
    log::info!(
        "state core ready at height {}, committee size {}, total stake {}",
        last_info.last_height,
        committee.members.len(),
        committee.total_stake(),
    );

    let checker = StateChecker::new(
        Arc::clone(&store),
        last_info.last_sortition_seed,
        committee.total_stake(),
        machine.next_validator_number().await,
        last_info.last_height,
    );
    let (broadcast_tx, mut broadcast_rx) = tokio::sync::mpsc::unbounded_channel();
    let pool = Arc::new(TransactionPool::new(checker, broadcast_tx));

    // The networking task that would drain `broadcast_rx` and feed
    // `pool.append_tx`/`machine.apply_block` from peer messages is an
    // external collaborator (§1); this binary only proves the core is
    // wired correctly and idles until interrupted.
    tokio::spawn(async move { while broadcast_rx.recv().await.is_some() {} });

    log::info!("pool ready, {} pending transactions", pool.size().await);
    log::info!("zarb-node core is wired and idle; awaiting ctrl-c");

    tokio::signal::ctrl_c().await.context("waiting on ctrl-c")?;
    log::info!("shutting down");
    Ok(())
}
