//! `relic transfer` - Sign an addon over to another key.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use relic_core::{RelicConfig, TransferOffer, UnsignedTransfer};

use super::{print_json, read_json, read_private_key, report, AddonInput};
use crate::exit_codes;

#[derive(Args, Debug)]
pub struct TransferArgs {
    /// Addon or provenance chain being transferred (JSON)
    #[arg(long)]
    pub addon: PathBuf,

    /// Current owner's private key file (base64 PKCS#8)
    #[arg(long)]
    pub from_key: PathBuf,

    /// Receiver public key (base64 SPKI)
    #[arg(long)]
    pub to: String,

    /// Print the chain together with the transfer, ready for the receiver
    #[arg(long)]
    pub offer: bool,
}

pub fn cmd_transfer(args: TransferArgs) -> i32 {
    match run_transfer(args) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => report(&e),
    }
}

fn run_transfer(args: TransferArgs) -> Result<()> {
    let chain = read_json::<AddonInput>(&args.addon, "addon")?.into_chain();
    let from_key = read_private_key(&args.from_key)?;

    let config = RelicConfig::from_env();

    let transfer = UnsignedTransfer::for_chain(&chain, args.to.trim())
        .with_nonce_bytes(config.nonce_bytes)
        .sign(&from_key)?;

    if args.offer {
        print_json(&TransferOffer { chain, transfer })
    } else {
        print_json(&transfer)
    }
}
