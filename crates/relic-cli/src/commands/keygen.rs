//! `relic keygen` - Generate a P-256 keypair.

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;

use relic_core::{generate_keypair, import_public_key};

use super::report;
use crate::exit_codes;

pub const PRIVATE_KEY_FILE: &str = "private_key.b64";
pub const PUBLIC_KEY_FILE: &str = "public_key.b64";

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Output directory for keypair files
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Force overwrite existing files
    #[arg(long, short)]
    pub force: bool,
}

pub fn cmd_keygen(args: KeygenArgs) -> i32 {
    match run_keygen(args) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => report(&e),
    }
}

fn run_keygen(args: KeygenArgs) -> Result<()> {
    if !args.out.exists() {
        fs::create_dir_all(&args.out)
            .with_context(|| format!("failed to create directory: {}", args.out.display()))?;
    }

    let private_path = args.out.join(PRIVATE_KEY_FILE);
    let public_path = args.out.join(PUBLIC_KEY_FILE);

    if !args.force {
        for path in [&private_path, &public_path] {
            if path.exists() {
                anyhow::bail!(
                    "key file already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
        }
    }

    let keypair = generate_keypair()?;
    let key_id = import_public_key(&keypair.public_key)?.key_id();

    fs::write(&private_path, format!("{}\n", keypair.private_key))
        .with_context(|| format!("failed to write private key: {}", private_path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(&private_path, perms)
            .with_context(|| format!("failed to set permissions on: {}", private_path.display()))?;
    }

    fs::write(&public_path, format!("{}\n", keypair.public_key))
        .with_context(|| format!("failed to write public key: {}", public_path.display()))?;

    println!("Generated P-256 keypair:");
    println!(
        "  Private key: {} (PKCS#8 DER, base64, mode 0600)",
        private_path.display()
    );
    println!("  Public key:  {} (SPKI DER, base64)", public_path.display());
    println!();
    println!("key_id: {key_id}");

    Ok(())
}
