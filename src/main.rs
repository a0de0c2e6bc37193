//! mtree CLI - Command line interface for mtree_index
//!
//! Runs the root publication service and lets auditors fetch signed roots
//! and check inclusion proofs from the command line.

use clap::{Parser, Subcommand};
use mtree_index::{
    verify_merkle_path, Config, Content, Hash, HashAlgorithm, Height, KeyStore, MerklePathEntry,
    PublisherGuard, RootPublisher, RootSigner, TreeRegistry, UpdateBatch,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mtree")]
#[command(about = "Authenticated key/value index with signed merkle roots")]
#[command(version)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, default_value = "mtree.json")]
    config: PathBuf,

    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a signing key
    Keygen {
        /// Where to write the key (defaults to the config's key path)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Replace an existing key
        #[arg(long)]
        force: bool,
    },

    /// Serve signed roots for the namespaces in a seed file
    Serve {
        /// JSON file of {namespace: {key: value}}
        #[arg(short, long)]
        seed: PathBuf,
    },

    /// Fetch a namespace's signed root from a running service
    Root {
        /// Service base URL
        #[arg(short, long, default_value = "http://localhost:8051")]
        url: String,
        /// The namespace
        #[arg(short, long)]
        namespace: String,
        /// Hex public key the root must be signed with
        #[arg(short, long)]
        public_key: Option<String>,
    },

    /// Print a value with its merkle path from a seed file
    Prove {
        #[arg(short, long)]
        seed: PathBuf,
        #[arg(short, long)]
        namespace: String,
        #[arg(short, long)]
        key: String,
    },

    /// Print a namespace's trie
    Show {
        #[arg(short, long)]
        seed: PathBuf,
        #[arg(short, long)]
        namespace: String,
    },

    /// Check a key/value against a merkle path and a trusted root
    Verify {
        #[arg(short, long)]
        key: String,
        #[arg(short, long)]
        value: String,
        /// JSON file holding the merkle path
        #[arg(short, long)]
        path: PathBuf,
        /// Trusted root (hex)
        #[arg(short, long)]
        root: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env(Some(&cli.config))?;

    match cli.command {
        Commands::Keygen { out, force } => {
            let store = key_store(out, &config)?;
            if store.path().exists() && !force {
                anyhow::bail!(
                    "Signing key already exists at {} (use --force to replace)",
                    store.path().display()
                );
            }
            let signer = mtree_index::Ed25519Signer::generate();
            store.save(&signer)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "path": store.path().display().to_string(),
                    "scheme": signer.scheme(),
                    "public_key": hex::encode(signer.public_key())
                }),
            );
        }

        Commands::Serve { seed } => {
            let registry = Arc::new(load_seed(&seed, config.hash_algorithm)?);
            let signer = key_store(None, &config)?.load_or_create()?;
            let public_key = hex::encode(signer.public_key());

            let guard = PublisherGuard::new();
            let publisher = RootPublisher::new(registry.clone(), Arc::new(signer));
            let handle = guard.start(publisher, config.publication_address()?)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "url": handle.url(),
                    "public_key": public_key,
                    "namespaces": registry.namespaces()
                }),
            );

            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?
                .block_on(tokio::signal::ctrl_c())?;
            handle.shutdown()?;
        }

        Commands::Root {
            url,
            namespace,
            public_key,
        } => {
            let timeout = std::time::Duration::from_secs(config.request_timeout_secs);
            let mut client = mtree_index::RootClient::new(&url, timeout)?;
            if let Some(key) = &public_key {
                client = client.with_public_key(hex::decode(key)?);
            }
            let root = client.fetch_root(&namespace)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "namespace": namespace,
                    "root": root.map(|h| h.to_hex()),
                    "signature_checked": public_key.is_some()
                }),
            );
        }

        Commands::Prove {
            seed,
            namespace,
            key,
        } => {
            let values = read_seed(&seed)?;
            let registry = load_seed(&seed, config.hash_algorithm)?;
            let value = values
                .get(&namespace)
                .and_then(|kvs| kvs.get(&key))
                .ok_or_else(|| anyhow::anyhow!("Key not found: {}/{}", namespace, key))?;

            match registry.prove_state(&namespace, &key, value.as_bytes())? {
                Some(proven) => output(
                    &cli.format,
                    &serde_json::json!({
                        "namespace": namespace,
                        "key": key,
                        "value": value,
                        "merkle_path": proven.merkle_path,
                        "root": registry.get_merkle_root(&namespace).map(|h| h.to_hex())
                    }),
                ),
                None => anyhow::bail!("Key not found: {}/{}", namespace, key),
            }
        }

        Commands::Show { seed, namespace } => {
            let values = read_seed(&seed)?;
            let contents = values
                .get(&namespace)
                .ok_or_else(|| anyhow::anyhow!("Namespace not found: {}", namespace))?
                .iter()
                .map(|(k, v)| Content::new(k.as_str(), v.as_bytes()));
            let trie = mtree_index::MerkleTrie::from_contents(config.hash_algorithm, contents)?;
            match cli.format {
                OutputFormat::Text => print!("{}", trie),
                OutputFormat::Json => output(
                    &cli.format,
                    &serde_json::json!({
                        "namespace": namespace,
                        "root": trie.root_hash().to_hex(),
                        "keys": trie.len(),
                        "tree": trie.to_string()
                    }),
                ),
            }
        }

        Commands::Verify {
            key,
            value,
            path,
            root,
        } => {
            let merkle_path: Vec<MerklePathEntry> =
                serde_json::from_str(&std::fs::read_to_string(&path)?)?;
            let root = Hash::from_hex(&root)
                .map_err(|_| anyhow::anyhow!("Invalid root hash: {}", root))?;
            let content = Content::new(key, value);
            let valid = verify_merkle_path(config.hash_algorithm, &content, &merkle_path, &root);
            output(
                &cli.format,
                &serde_json::json!({
                    "valid": valid,
                    "algorithm": config.hash_algorithm.name()
                }),
            );
            if !valid {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn key_store(out: Option<PathBuf>, config: &Config) -> anyhow::Result<KeyStore> {
    match out.or_else(|| config.signing_key_path.clone()) {
        Some(path) => Ok(KeyStore::at(path)),
        None => Ok(KeyStore::new()?),
    }
}

fn read_seed(path: &Path) -> anyhow::Result<BTreeMap<String, BTreeMap<String, String>>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn load_seed(path: &Path, algorithm: HashAlgorithm) -> anyhow::Result<TreeRegistry> {
    let mut batch = UpdateBatch::new();
    for (namespace, kvs) in read_seed(path)? {
        for (key, value) in kvs {
            batch.put(&namespace, &key, value.into_bytes());
        }
    }
    if batch.is_empty() {
        anyhow::bail!("Seed file {} has no entries", path.display());
    }
    let registry = TreeRegistry::new(algorithm);
    registry.apply_updates(&batch, Height::new(0, 0))?;
    Ok(registry)
}

fn output(format: &OutputFormat, value: &serde_json::Value) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(value).unwrap());
        }
        OutputFormat::Text => {
            println!("{}", serde_json::to_string_pretty(value).unwrap());
        }
    }
}
