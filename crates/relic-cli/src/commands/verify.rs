//! `relic verify` - Verify an addon or a provenance chain.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use relic_core::{RelicConfig, Verifier};

use super::{print_json, read_json, report, AddonInput};
use crate::exit_codes;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Addon or provenance chain file (JSON)
    pub addon: PathBuf,

    /// Print the full verification result as JSON
    #[arg(long)]
    pub json: bool,

    /// Only accept addons co-signed by this issuer key (base64 SPKI).
    /// Repeatable; adds to RELIC_TRUSTED_ISSUERS.
    #[arg(long = "trusted-issuer")]
    pub trusted_issuers: Vec<String>,

    /// Quiet mode - only exit code, no output
    #[arg(long, short)]
    pub quiet: bool,
}

pub fn cmd_verify(args: VerifyArgs) -> i32 {
    match run_verify(&args) {
        Ok(code) => code,
        Err(e) => report(&e),
    }
}

fn run_verify(args: &VerifyArgs) -> Result<i32> {
    let chain = read_json::<AddonInput>(&args.addon, "addon")?.into_chain();

    let mut config = RelicConfig::from_env();
    for issuer in &args.trusted_issuers {
        config = config.with_trusted_issuer(issuer.clone());
    }
    let verifier = Verifier::from_config(&config)?;

    let result = chain.verify(&verifier);

    if args.json {
        print_json(&result)?;
    } else if !args.quiet {
        let details = &result.addon.details;
        println!(
            "{}: {}",
            chain.addon_id(),
            if result.valid { "VALID" } else { "INVALID" }
        );
        println!("  ownership:   {}", mark(details.ownership_valid));
        println!("  issuer:      {}", mark(details.issuer_valid));
        println!("  not expired: {}", mark(details.not_expired));
        if !chain.transfers.is_empty() {
            println!("  transfers:   {}", chain.transfers.len());
        }
        for error in &result.addon.errors {
            println!("  error: {error}");
        }
        for fault in &result.faults {
            println!("  error: {fault}");
        }
        for warning in &result.addon.warnings {
            println!("  warning: {warning}");
        }
    }

    Ok(if result.valid {
        exit_codes::SUCCESS
    } else {
        exit_codes::REJECTED
    })
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "FAILED"
    }
}
