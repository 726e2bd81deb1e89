use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use skipgram::{train, Config};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    if let Err(err) = config.validate() {
        eprintln!("{err}");
        process::exit(2);
    }
    if let Err(err) = train::run(&config) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}
