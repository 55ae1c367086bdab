//! `relic verify-transfer` - Verify a transfer signature.
//!
//! Only the signature is checked. Whether the sender owned the addon is up
//! to whoever honors the transfer.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use relic_core::{check_transfer, AddonTransfer};

use super::{read_json, report};
use crate::exit_codes;

#[derive(Args, Debug)]
pub struct VerifyTransferArgs {
    /// Transfer file (JSON)
    pub transfer: PathBuf,

    /// Quiet mode - only exit code, no output
    #[arg(long, short)]
    pub quiet: bool,
}

pub fn cmd_verify_transfer(args: VerifyTransferArgs) -> i32 {
    match run_verify_transfer(&args) {
        Ok(code) => code,
        Err(e) => report(&e),
    }
}

fn run_verify_transfer(args: &VerifyTransferArgs) -> Result<i32> {
    let transfer: AddonTransfer = read_json(&args.transfer, "transfer")?;

    match check_transfer(&transfer) {
        Ok(()) => {
            if !args.quiet {
                println!("{}: transfer signature VALID", transfer.addon_id);
            }
            Ok(exit_codes::SUCCESS)
        }
        Err(rejection) => {
            if !args.quiet {
                println!("{}: {rejection}", transfer.addon_id);
            }
            Ok(exit_codes::REJECTED)
        }
    }
}
