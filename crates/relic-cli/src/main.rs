use clap::Parser;

mod commands;
pub mod exit_codes;

use commands::{dispatch, Cli};

fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();
    let cli = Cli::parse();
    std::process::exit(dispatch(cli));
}
