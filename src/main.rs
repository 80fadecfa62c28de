// Everything but the config and logging is driven from the Windows window loop
#![cfg_attr(not(windows), allow(dead_code))]

mod color;
mod config;
#[cfg(windows)]
mod dx12;
mod gamepad;
mod geometry;
mod input;
mod layout;
mod logging;
mod patterns;
mod text;
#[cfg(windows)]
mod window;

use anyhow::Result;
use clap::Parser;
use config::{Args, Config};

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = Config::try_from(args)?;
    run(config)
}

#[cfg(windows)]
fn run(config: Config) -> Result<()> {
    window::run(config)
}

#[cfg(not(windows))]
fn run(_config: Config) -> Result<()> {
    anyhow::bail!("hdrcalib presents through Direct3D 12 and only runs on Windows")
}
