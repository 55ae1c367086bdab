//! `relic` subcommands.

pub mod hash;
pub mod keygen;
pub mod mint;
pub mod transfer;
pub mod verify;
pub mod verify_transfer;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use relic_core::{import_private_key, Addon, PrivateKeyHandle, ProvenanceChain, RelicError};

use crate::exit_codes;

#[derive(Parser, Debug)]
#[command(
    name = "relic",
    version,
    about = "Mint, verify and transfer signed addons"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a P-256 keypair
    Keygen(keygen::KeygenArgs),

    /// Mint a signed addon from a draft
    Mint(mint::MintArgs),

    /// Verify an addon or provenance chain
    Verify(verify::VerifyArgs),

    /// Sign an addon over to another key
    Transfer(transfer::TransferArgs),

    /// Verify a transfer signature
    VerifyTransfer(verify_transfer::VerifyTransferArgs),

    /// Print the content hash of an addon
    Hash(hash::HashArgs),
}

pub fn dispatch(cli: Cli) -> i32 {
    match cli.cmd {
        Command::Keygen(args) => keygen::cmd_keygen(args),
        Command::Mint(args) => mint::cmd_mint(args),
        Command::Verify(args) => verify::cmd_verify(args),
        Command::Transfer(args) => transfer::cmd_transfer(args),
        Command::VerifyTransfer(args) => verify_transfer::cmd_verify_transfer(args),
        Command::Hash(args) => hash::cmd_hash(args),
    }
}

/// Print `e` and map it to an exit code.
pub(crate) fn report(e: &anyhow::Error) -> i32 {
    eprintln!("error: {e:#}");
    e.downcast_ref::<RelicError>()
        .map_or(exit_codes::INPUT_ERROR, RelicError::exit_code)
}

/// A bare addon or a provenance chain (`{"addon": .., "transfers": [..]}`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum AddonInput {
    Chain(ProvenanceChain),
    Addon(Box<Addon>),
}

impl AddonInput {
    pub(crate) fn into_chain(self) -> ProvenanceChain {
        match self {
            Self::Chain(chain) => chain,
            Self::Addon(addon) => ProvenanceChain::new(*addon),
        }
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {what} JSON: {}", path.display()))
}

/// Load a base64 PKCS#8 private key file as written by `relic keygen`.
pub(crate) fn read_private_key(path: &Path) -> Result<PrivateKeyHandle> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read private key: {}", path.display()))?;
    Ok(import_private_key(content.trim())?)
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize output")?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relic_core::{
        create_transfer, generate_keypair, mint_addon, AddonCategory, AddonDraft, AddonMetadata,
        AddonRarity, MintOptions,
    };
    use std::path::PathBuf;

    struct Fixture {
        dir: tempfile::TempDir,
        owner: PrivateKeyHandle,
        addon: Addon,
    }

    impl Fixture {
        fn new() -> Self {
            let owner = import_private_key(&generate_keypair().unwrap().private_key).unwrap();
            let issuer = import_private_key(&generate_keypair().unwrap().private_key).unwrap();
            let draft = AddonDraft {
                id: "crown-1".into(),
                name: "Crown".into(),
                description: String::new(),
                category: AddonCategory::Headwear,
                rarity: AddonRarity::Legendary,
                attachment: serde_json::Value::Null,
                visual: serde_json::Value::Null,
                modifiers: serde_json::Value::Null,
                metadata: AddonMetadata {
                    creator: "studio".into(),
                    created_at: 0,
                    edition: None,
                    max_editions: None,
                },
            };
            let addon = mint_addon(draft, &owner, &issuer, &MintOptions::default()).unwrap();
            Self {
                dir: tempfile::tempdir().unwrap(),
                owner,
                addon,
            }
        }

        fn write<T: serde::Serialize>(&self, name: &str, value: &T) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
            path
        }
    }

    fn verify_args(addon: PathBuf) -> verify::VerifyArgs {
        verify::VerifyArgs {
            addon,
            json: false,
            trusted_issuers: Vec::new(),
            quiet: true,
        }
    }

    #[test]
    fn test_verify_exit_codes() {
        let fx = Fixture::new();
        let valid = fx.write("addon.json", &fx.addon);
        assert_eq!(verify::cmd_verify(verify_args(valid)), exit_codes::SUCCESS);

        let mut tampered = fx.addon.clone();
        tampered.rarity = AddonRarity::Mythic;
        let tampered = fx.write("tampered.json", &tampered);
        assert_eq!(verify::cmd_verify(verify_args(tampered)), exit_codes::REJECTED);

        let missing = fx.dir.path().join("missing.json");
        assert_eq!(verify::cmd_verify(verify_args(missing)), exit_codes::INPUT_ERROR);
    }

    #[test]
    fn test_verify_accepts_provenance_chain() {
        let fx = Fixture::new();
        let receiver = generate_keypair().unwrap().public_key;
        let mut chain = ProvenanceChain::new(fx.addon.clone());
        chain
            .extend(create_transfer("crown-1", &fx.owner, receiver).unwrap())
            .unwrap();

        let path = fx.write("chain.json", &chain);
        assert_eq!(verify::cmd_verify(verify_args(path)), exit_codes::SUCCESS);
    }

    #[test]
    fn test_verify_bad_trusted_issuer_is_input_error() {
        let fx = Fixture::new();
        let mut args = verify_args(fx.write("addon.json", &fx.addon));
        args.trusted_issuers.push("garbage".into());
        assert_eq!(verify::cmd_verify(args), exit_codes::INPUT_ERROR);
    }

    #[test]
    fn test_verify_transfer_exit_codes() {
        let fx = Fixture::new();
        let receiver = generate_keypair().unwrap().public_key;
        let mut transfer = create_transfer("crown-1", &fx.owner, receiver).unwrap();

        let path = fx.write("transfer.json", &transfer);
        let args = |transfer| verify_transfer::VerifyTransferArgs {
            transfer,
            quiet: true,
        };
        assert_eq!(
            verify_transfer::cmd_verify_transfer(args(path)),
            exit_codes::SUCCESS
        );

        transfer.timestamp += 1;
        let path = fx.write("forged.json", &transfer);
        assert_eq!(
            verify_transfer::cmd_verify_transfer(args(path)),
            exit_codes::REJECTED
        );
    }

    #[test]
    fn test_transfer_with_wrong_key_is_key_mismatch() {
        let fx = Fixture::new();
        let addon = fx.write("addon.json", &fx.addon);
        let stranger = fx.dir.path().join("stranger.b64");
        fs::write(&stranger, generate_keypair().unwrap().private_key).unwrap();

        let code = transfer::cmd_transfer(transfer::TransferArgs {
            addon,
            from_key: stranger,
            to: generate_keypair().unwrap().public_key,
            offer: false,
        });
        assert_eq!(code, 2);
    }

    #[test]
    fn test_hash_command() {
        let fx = Fixture::new();
        let path = fx.write("addon.json", &fx.addon);
        assert_eq!(
            hash::cmd_hash(hash::HashArgs { addon: path }),
            exit_codes::SUCCESS
        );
    }
}
