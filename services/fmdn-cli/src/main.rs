//! Command-line front end for FMDN key handling and location selection.
//!
//! Every command works on data that has already been fetched: a vault
//! response on disk, an identity key on the command line, a dump of
//! location history. Nothing here talks to the network.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fmdn_core::{logging, unix_now, EpochPolicy, FmdnConfig, UnixSeconds};
use fmdn_crypto::{calculate_hmac_sha256, IdentityKey, SharedKey, VaultKeyExtractor, VaultResponse};
use fmdn_location::{
    observations_in_window, HistoryRecord, LocationObservation, LocationSelector,
};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "fmdn")]
#[command(version, about = "Find My Device Network key and location tools", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the recovery, ringing and tracking owner keys
    DeriveKeys {
        /// Identity key as hex
        #[arg(short, long)]
        identity_key: String,
    },

    /// Extract the shared key from a vault response
    SharedKey {
        /// File holding the vault response JSON
        #[arg(short, long)]
        vault: PathBuf,

        /// Which entry of the domain to use
        #[arg(short, long, value_enum)]
        epoch_policy: Option<PolicyArg>,

        /// Security domain name
        #[arg(short, long)]
        domain: Option<String>,
    },

    /// Normalise a cached shared key (hex, base64 or PEM) to hex
    NormalizeSharedKey {
        /// Encoded shared key
        #[arg(required_unless_present = "der")]
        value: Option<String>,

        /// DER-encoded private key file; the last 32 bytes are the key
        #[arg(long, conflicts_with = "value")]
        der: Option<PathBuf>,
    },

    /// Pick the best current location
    BestLocation {
        /// JSON array of history records
        #[arg(long, conflicts_with = "observations", required_unless_present = "observations")]
        history: Option<PathBuf>,

        /// JSON array of already filtered observations
        #[arg(long)]
        observations: Option<PathBuf>,

        /// Reference time in seconds since the Unix epoch (default: now)
        #[arg(long)]
        now: Option<f64>,
    },

    /// HMAC-SHA256 of a message, printed as hex
    Hmac {
        /// Key as hex
        #[arg(short, long)]
        key: String,

        /// Message text
        #[arg(short, long)]
        message: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    FirstEntry,
    HighestEpoch,
}

impl From<PolicyArg> for EpochPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::FirstEntry => EpochPolicy::FirstEntry,
            PolicyArg::HighestEpoch => EpochPolicy::HighestEpoch,
        }
    }
}

#[derive(Serialize)]
struct OwnerKeysOutput {
    recovery_key: String,
    ringing_key: String,
    tracking_key: String,
}

#[derive(Serialize)]
struct SharedKeyOutput {
    domain: String,
    position: usize,
    epoch: Option<i64>,
    shared_key: String,
}

#[derive(Serialize)]
struct BestLocationOutput<'a> {
    score: f64,
    candidates: usize,
    location: &'a LocationObservation,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.log_json {
        logging::init_json();
    } else {
        logging::init();
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::DeriveKeys { identity_key } => derive_keys(&identity_key, cli.json),
        Commands::SharedKey {
            vault,
            epoch_policy,
            domain,
        } => {
            let mut extractor = VaultKeyExtractor::from_config(&config.vault);
            if let Some(domain) = domain {
                extractor = extractor.with_domain(domain);
            }
            if let Some(policy) = epoch_policy {
                extractor = extractor.with_policy(policy.into());
            }
            shared_key(&extractor, &vault, cli.json)
        }
        Commands::NormalizeSharedKey { value, der } => {
            normalize_shared_key(value.as_deref(), der.as_deref(), cli.json)
        }
        Commands::BestLocation {
            history,
            observations,
            now,
        } => {
            let now = now.unwrap_or_else(unix_now);
            best_location(&config, history.as_deref(), observations.as_deref(), now, cli.json)
        }
        Commands::Hmac { key, message } => hmac(&key, &message, cli.json),
    }
}

fn load_config(path: Option<&Path>) -> Result<FmdnConfig> {
    match path {
        Some(path) => {
            let config = FmdnConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            info!(path = %path.display(), "Loaded configuration");
            Ok(config)
        }
        None => Ok(FmdnConfig::default_config()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn derive_keys(identity_key: &str, json: bool) -> Result<()> {
    let identity_key = IdentityKey::from_hex(identity_key).context("Invalid identity key")?;
    let keys = identity_key.derive_owner_keys();

    let output = OwnerKeysOutput {
        recovery_key: keys.recovery_key.to_hex(),
        ringing_key: keys.ringing_key.to_hex(),
        tracking_key: keys.tracking_key.to_hex(),
    };

    if json {
        return print_json(&output);
    }
    println!("recovery: {}", output.recovery_key);
    println!("ringing:  {}", output.ringing_key);
    println!("tracking: {}", output.tracking_key);
    Ok(())
}

fn shared_key(extractor: &VaultKeyExtractor, vault: &Path, json: bool) -> Result<()> {
    let raw = fs::read(vault)
        .with_context(|| format!("Failed to read vault response {}", vault.display()))?;
    let response = VaultResponse::from_slice(&raw).context("Invalid vault response")?;
    let candidate = extractor.extract_entry(&response)?;

    debug!(
        domain = extractor.domain(),
        position = candidate.position,
        epoch = ?candidate.epoch,
        "Extracted shared key"
    );

    if json {
        return print_json(&SharedKeyOutput {
            domain: extractor.domain().to_string(),
            position: candidate.position,
            epoch: candidate.epoch,
            shared_key: candidate.key.to_hex(),
        });
    }
    println!("{}", candidate.key.to_hex());
    Ok(())
}

fn normalize_shared_key(value: Option<&str>, der: Option<&Path>, json: bool) -> Result<()> {
    let key = match (value, der) {
        (_, Some(path)) => {
            let bytes = fs::read(path)
                .with_context(|| format!("Failed to read private key {}", path.display()))?;
            SharedKey::from_private_key_der(&bytes)?
        }
        (Some(value), None) => SharedKey::from_encoded(value)?,
        (None, None) => bail!("either a key value or --der is required"),
    };

    if json {
        return print_json(&serde_json::json!({ "shared_key": key.to_hex() }));
    }
    println!("{}", key.to_hex());
    Ok(())
}

fn best_location(
    config: &FmdnConfig,
    history: Option<&Path>,
    observations: Option<&Path>,
    now: UnixSeconds,
    json: bool,
) -> Result<()> {
    let observations: Vec<LocationObservation> = match (history, observations) {
        (Some(path), _) => {
            let records: Vec<HistoryRecord> = read_json(path)?;
            observations_in_window(&records, now, config.location.history_hours)
        }
        (None, Some(path)) => read_json(path)?,
        (None, None) => bail!("either --history or --observations is required"),
    };

    let selector = LocationSelector::from_config(&config.location);
    let Some(best) = selector.best_scored_at(&observations, now) else {
        if json {
            return print_json(&serde_json::Value::Null);
        }
        println!("no usable location");
        return Ok(());
    };

    let output = BestLocationOutput {
        score: best.score,
        candidates: observations.len(),
        location: best.observation,
    };
    if json {
        return print_json(&output);
    }

    let location = output.location;
    print!("{:.6}, {:.6}", location.latitude, location.longitude);
    if let Some(accuracy) = location.accuracy {
        print!(" ±{accuracy:.0}m");
    }
    if let Some(name) = location.place_name() {
        print!(" ({name})");
    }
    println!();
    println!(
        "age {:.1} min, score {:.2}, {} candidates",
        location.age_secs(now) / 60.0,
        output.score,
        output.candidates
    );
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn hmac(key_hex: &str, message: &str, json: bool) -> Result<()> {
    let key = hex::decode(key_hex.trim()).context("HMAC key must be hex")?;
    let digest = calculate_hmac_sha256(&key, message.as_bytes());

    if json {
        return print_json(&serde_json::json!({ "hmac_sha256": digest }));
    }
    println!("{digest}");
    Ok(())
}
