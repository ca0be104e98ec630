// crates/mith-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mith_sig::{
    keygen, sign, verify_bytes, Backend, Instance, ParamSet, PublicKey, SecretKey,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "mith-cli",
    about = "MPC-in-the-head signature tool",
    long_about = "MPC-in-the-head signature tool.\n\nGenerate keypairs, sign message files, and verify signatures.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ParamOpt {
    L1,
    L1c,
    L3,
    L5,
}

impl From<ParamOpt> for ParamSet {
    fn from(p: ParamOpt) -> Self {
        match p {
            ParamOpt::L1 => ParamSet::L1,
            ParamOpt::L1c => ParamSet::L1c,
            ParamOpt::L3 => ParamSet::L3,
            ParamOpt::L5 => ParamSet::L5,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendOpt {
    Auto,
    Scalar,
    Sse2,
    Avx2,
    Neon,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Generate a keypair and write both halves as JSON
    Keygen {
        /// Parameter set
        #[arg(value_enum, long, default_value_t = ParamOpt::L1)]
        param_set: ParamOpt,

        /// Output path for the secret key
        #[arg(long, default_value = "mith_sk.json")]
        out_secret: PathBuf,

        /// Output path for the public key
        #[arg(long, default_value = "mith_pk.json")]
        out_public: PathBuf,
    },

    /// Sign a message file; writes the raw signature bytes
    Sign {
        /// Secret key (JSON, from `keygen`)
        #[arg(long)]
        secret: PathBuf,

        /// Message file to sign
        #[arg(long)]
        message: PathBuf,

        /// Output path for the signature
        #[arg(long, default_value = "mith.sig")]
        out: PathBuf,

        /// Kernel backend override (testing / benchmarking)
        #[arg(value_enum, long, default_value_t = BackendOpt::Auto)]
        backend: BackendOpt,
    },

    /// Verify a signature against a public key and message file
    Verify {
        /// Public key (JSON, from `keygen`)
        #[arg(long)]
        public: PathBuf,

        /// Message file
        #[arg(long)]
        message: PathBuf,

        /// Signature file
        #[arg(long)]
        signature: PathBuf,
    },
}

/* ------------------------------ key files ------------------------------- */

#[derive(Serialize, Deserialize)]
struct PublicKeyFile {
    param_set: String,
    plaintext: String,
    ciphertext: String,
}

#[derive(Serialize, Deserialize)]
struct SecretKeyFile {
    param_set: String,
    key: String,
    plaintext: String,
    ciphertext: String,
}

fn parse_set(name: &str) -> Result<ParamSet> {
    ParamSet::from_name(name).with_context(|| format!("unknown parameter set {name:?}"))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

fn decode_field(name: &str, hex_str: &str, want: usize) -> Result<Vec<u8>> {
    let bytes = hex::decode(hex_str).with_context(|| format!("{name} hex"))?;
    if bytes.len() != want {
        bail!("{name} must be {want} bytes, got {}", bytes.len());
    }
    Ok(bytes)
}

fn read_public(path: &Path) -> Result<PublicKey> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let file: PublicKeyFile = serde_json::from_str(&raw).context("parsing public key JSON")?;
    let set = parse_set(&file.param_set)?;
    let len = set.params().input_size();
    Ok(PublicKey {
        set,
        plaintext: decode_field("plaintext", &file.plaintext, len)?,
        ciphertext: decode_field("ciphertext", &file.ciphertext, len)?,
    })
}

fn read_secret(path: &Path) -> Result<SecretKey> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let file: SecretKeyFile = serde_json::from_str(&raw).context("parsing secret key JSON")?;
    let set = parse_set(&file.param_set)?;
    let len = set.params().input_size();
    Ok(SecretKey {
        set,
        key: decode_field("key", &file.key, len)?,
        public: PublicKey {
            set,
            plaintext: decode_field("plaintext", &file.plaintext, len)?,
            ciphertext: decode_field("ciphertext", &file.ciphertext, len)?,
        },
    })
}

fn instance_for(set: ParamSet, backend: BackendOpt) -> Result<Instance> {
    let inst = match backend {
        BackendOpt::Auto => Some(Instance::new(set)),
        BackendOpt::Scalar => Instance::with_backend(set, Backend::Scalar),
        BackendOpt::Sse2 => Instance::with_backend(set, Backend::Sse2),
        BackendOpt::Avx2 => Instance::with_backend(set, Backend::Avx2),
        BackendOpt::Neon => Instance::with_backend(set, Backend::Neon),
    };
    match inst {
        Some(inst) => {
            info!(backend = ?inst.backend(), set = set.name(), "instance ready");
            Ok(inst)
        }
        None => bail!("backend {backend:?} is not available on this CPU"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().compact())
        .init();

    match Cli::parse().cmd {
        Cmd::Keygen {
            param_set,
            out_secret,
            out_public,
        } => {
            let set: ParamSet = param_set.into();
            let inst = Instance::new(set);
            let sk = keygen(&inst);

            write_json(
                &out_secret,
                &SecretKeyFile {
                    param_set: set.name().to_owned(),
                    key: hex::encode(&sk.key),
                    plaintext: hex::encode(&sk.public.plaintext),
                    ciphertext: hex::encode(&sk.public.ciphertext),
                },
            )?;
            write_json(
                &out_public,
                &PublicKeyFile {
                    param_set: set.name().to_owned(),
                    plaintext: hex::encode(&sk.public.plaintext),
                    ciphertext: hex::encode(&sk.public.ciphertext),
                },
            )?;
            info!(
                secret = %out_secret.display(),
                public = %out_public.display(),
                "keypair written"
            );
        }

        Cmd::Sign {
            secret,
            message,
            out,
            backend,
        } => {
            let sk = read_secret(&secret)?;
            let inst = instance_for(sk.set, backend)?;
            let msg =
                fs::read(&message).with_context(|| format!("reading {}", message.display()))?;
            let sig = sign(&inst, &sk, &msg).map_err(|e| anyhow::anyhow!("signing failed: {e}"))?;
            let bytes = sig.to_bytes(inst.params);
            fs::write(&out, &bytes).with_context(|| format!("writing {}", out.display()))?;
            info!(bytes = bytes.len(), out = %out.display(), "signature written");
        }

        Cmd::Verify {
            public,
            message,
            signature,
        } => {
            let pk = read_public(&public)?;
            let inst = Instance::new(pk.set);
            let msg =
                fs::read(&message).with_context(|| format!("reading {}", message.display()))?;
            let sig =
                fs::read(&signature).with_context(|| format!("reading {}", signature.display()))?;
            match verify_bytes(&inst, &pk, &msg, &sig) {
                Ok(()) => info!("signature valid"),
                Err(e) => bail!("signature invalid: {e}"),
            }
        }
    }

    Ok(())
}
