// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(elided_lifetimes_in_paths)]
#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    anonymous_parameters,
    deprecated_in_future,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    missing_doc_code_examples,
    private_doc_tests,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::unseparated_literal_suffix,
    clippy::decimal_literal_representation,
    clippy::single_char_lifetime_names,
    clippy::fallible_impl_from,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::wildcard_enum_match_arm,
    clippy::deref_by_slicing,
    clippy::default_numeric_fallback,
    clippy::shadow_reuse,
    clippy::clone_on_ref_ptr,
    clippy::todo,
    clippy::string_add,
    clippy::use_debug,
    clippy::future_not_send
)]
#![cfg_attr(not(test), warn(clippy::panic_in_result_fn))]

mod command;
mod creds;
mod error;
mod keys;
mod metadata;
mod model;
mod orchestrator;
mod rotation;
mod service;
mod signing;
#[cfg(test)]
mod testing;

use std::process;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use error::Result;
use log::error;
use url::Url;

#[derive(Debug, Subcommand)]
enum Command {
    RotateOfflineKey(command::rotate_offline_key::Command),
}

#[async_trait]
impl command::Command for Command {
    async fn execute(self, context: command::Context) -> Result<()> {
        match self {
            Self::RotateOfflineKey(cmd) => cmd.execute(context).await,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// The factory whose TUF root is being updated.
    #[arg(short, long, env = "TUF_ROTATE_FACTORY")]
    factory: String,

    /// The URL of the transaction service. A file URL names a directory with
    /// one subdirectory per factory.
    #[arg(long, env = "TUF_ROTATE_URL", value_parser = Url::parse)]
    url: Url,

    #[clap(subcommand)]
    command: Command,
}

async fn run(args: Args) -> Result<()> {
    let context = command::Context {
        factory: args.factory,
        service: service::connect(&args.url)?,
    };
    command::Command::execute(args.command, context).await
}

#[tokio::main]
async fn main() {
    let logger_env = env_logger::Env::new()
        .filter_or("TUF_ROTATE_LOG", "info")
        .write_style("TUF_ROTATE_LOG_STYLE");
    env_logger::Builder::from_env(logger_env).init();

    if let Err(e) = run(Args::parse()).await {
        error!("We encountered an error: {}", e);
        process::exit(1);
    };
}
