//! # Protection CLI
//!
//! Command-line front end for coordination studies: runs the discrimination
//! analysis on a saved study, dumps sampled curves and chart ranges, and
//! lists the bundled fuse curves.

use clap::Parser;

mod cli;

fn main() -> anyhow::Result<()> {
    cli::Cli::parse().run()
}
