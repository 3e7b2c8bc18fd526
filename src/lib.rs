pub mod cli;
pub mod compare;
pub mod config;
pub mod data;
pub mod dataset;
pub mod error;
pub mod io_utils;
pub mod loader;
pub mod pdf;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod table;
pub mod xlsx;

mod compare_cmd;
mod preview;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

pub use crate::{
    compare::{Comparison, MismatchMatrix, MismatchRecord, compare},
    data::Value,
    dataset::Dataset,
    error::CompareError,
    report::{Report, build_report},
    schema::validate,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("cellcheck", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Compare(args) => compare_cmd::execute(&args),
        Commands::Preview(args) => preview::execute(&args),
    }
}
