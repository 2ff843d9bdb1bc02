// CLI modules
mod cli;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Batch, Daemon, Health, Submit, Version};

command_enum! {
    (Batch, Batch),
    (Daemon, Daemon),
    (Health, Health),
    (Submit, Submit),
    (Version, Version),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let ctx = cli::op::OpContext::new(args.remote).context("failed to create API client")?;

    let output = args.command.execute(&ctx).await?;
    println!("{}", output);
    Ok(())
}
