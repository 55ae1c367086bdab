//! `relic mint` - Mint a signed addon from a draft.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::Args;
use std::fs;
use std::path::PathBuf;

use relic_core::{mint_addon, AddonDraft, MintOptions, RelicConfig};

use super::{print_json, read_json, read_private_key, report};
use crate::exit_codes;

#[derive(Args, Debug)]
pub struct MintArgs {
    /// Addon draft (JSON, an addon without `ownership`)
    #[arg(long)]
    pub draft: PathBuf,

    /// Owner private key file (base64 PKCS#8)
    #[arg(long)]
    pub owner_key: PathBuf,

    /// Issuer private key file (base64 PKCS#8)
    #[arg(long)]
    pub issuer_key: PathBuf,

    /// Expire the addon this many seconds from now
    #[arg(long)]
    pub expires_in: Option<i64>,

    /// Use this nonce instead of a random one
    #[arg(long)]
    pub nonce: Option<String>,

    /// Write the signed addon here instead of stdout
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

pub fn cmd_mint(args: MintArgs) -> i32 {
    match run_mint(args) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => report(&e),
    }
}

fn run_mint(args: MintArgs) -> Result<()> {
    let draft: AddonDraft = read_json(&args.draft, "draft")?;
    let owner_key = read_private_key(&args.owner_key)?;
    let issuer_key = read_private_key(&args.issuer_key)?;
    let config = RelicConfig::from_env();

    let now = Utc::now();
    let mut options = MintOptions::default()
        .issued_at(now.timestamp_millis())
        .nonce_bytes(config.nonce_bytes);
    if let Some(secs) = args.expires_in {
        let expires = Duration::try_seconds(secs)
            .and_then(|d| now.checked_add_signed(d))
            .with_context(|| format!("--expires-in out of range: {secs}"))?;
        options = options.expires_at(expires.timestamp_millis());
    }
    if let Some(nonce) = args.nonce {
        options = options.nonce(nonce);
    }

    let addon = mint_addon(draft, &owner_key, &issuer_key, &options)?;

    match &args.out {
        Some(path) => {
            let json = serde_json::to_string_pretty(&addon).context("failed to serialize addon")?;
            fs::write(path, json)
                .with_context(|| format!("failed to write addon: {}", path.display()))?;
            eprintln!("Minted {} -> {}", addon.id, path.display());
        }
        None => print_json(&addon)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relic_core::{generate_keypair, verify_addon, Addon};

    fn write_key(dir: &std::path::Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, generate_keypair().unwrap().private_key).unwrap();
        path
    }

    #[test]
    fn test_mint_writes_valid_addon() {
        let dir = tempfile::tempdir().unwrap();
        let draft = dir.path().join("draft.json");
        fs::write(
            &draft,
            r#"{
                "id": "crown-1",
                "name": "Crown",
                "category": "headwear",
                "rarity": "legendary",
                "modifiers": {"charm": 5},
                "metadata": {"creator": "studio", "createdAt": 0}
            }"#,
        )
        .unwrap();
        let out = dir.path().join("addon.json");

        let code = cmd_mint(MintArgs {
            draft,
            owner_key: write_key(dir.path(), "owner.b64"),
            issuer_key: write_key(dir.path(), "issuer.b64"),
            expires_in: Some(3600),
            nonce: Some("n1".into()),
            out: Some(out.clone()),
        });
        assert_eq!(code, exit_codes::SUCCESS);

        let addon: Addon = serde_json::from_str(&fs::read_to_string(out).unwrap()).unwrap();
        assert_eq!(addon.ownership.nonce, "n1");
        assert!(addon.ownership.expires_at.is_some());
        assert!(verify_addon(&addon).valid);
    }

    #[test]
    fn test_mint_bad_key_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.b64");
        fs::write(&bad, "not a key").unwrap();
        let draft = dir.path().join("draft.json");
        fs::write(
            &draft,
            r#"{"id":"x","name":"X","category":"aura","rarity":"common","metadata":{"creator":"c","createdAt":0}}"#,
        )
        .unwrap();

        let code = cmd_mint(MintArgs {
            draft,
            owner_key: bad.clone(),
            issuer_key: bad,
            expires_in: None,
            nonce: None,
            out: None,
        });
        assert_eq!(code, exit_codes::INPUT_ERROR);
    }
}
