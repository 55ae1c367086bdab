//! `relic hash` - Print the content hash of an addon.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use relic_core::hash_addon;

use super::{read_json, report, AddonInput};
use crate::exit_codes;

#[derive(Args, Debug)]
pub struct HashArgs {
    /// Addon or provenance chain file (JSON)
    pub addon: PathBuf,
}

pub fn cmd_hash(args: HashArgs) -> i32 {
    match run_hash(&args) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => report(&e),
    }
}

fn run_hash(args: &HashArgs) -> Result<()> {
    let chain = read_json::<AddonInput>(&args.addon, "addon")?.into_chain();
    println!("{}", hash_addon(&chain.addon)?);
    Ok(())
}
