// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: CLI entry point for inspecting and materializing the hawk dataset.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! CLI entry point for the hawk dataset tool.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hawk_store::{Dataset, HawkConfig, LookupTable, Node};

// Samples printed by `read` before eliding the rest.
const PREVIEW_SAMPLES: usize = 8;

#[derive(Debug, Parser)]
#[command(author, version, about = "Hawk dataset inspection tool")]
struct Cli {
    /// TOML config file (defaults plus HAWK_* environment overrides when absent).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the merged attribute description of a node.
    Describe {
        /// Node path (empty for the root).
        #[arg(default_value = "")]
        path: String,
    },
    /// Print a depth-bounded summary without downloading anything.
    Explore {
        /// Group path (empty for the root).
        #[arg(default_value = "")]
        path: String,
        /// Number of levels to expand.
        #[arg(long, default_value_t = 2)]
        depth: usize,
    },
    /// Print the shape, units and first samples of a leaf.
    Read {
        /// Leaf path.
        path: String,
    },
    /// Materialize one shard by key.
    Fetch {
        /// Shard key from the lookup table.
        key: String,
    },
    /// Re-check the digest of a materialized shard.
    Verify {
        /// Shard key from the lookup table.
        key: String,
    },
    /// List every shard key in the lookup table.
    Keys,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    match cli.command {
        Command::Describe { path } => describe(&config, &path),
        Command::Explore { path, depth } => explore(&config, &path, depth),
        Command::Read { path } => read(&config, &path),
        Command::Fetch { key } => fetch(&config, &key),
        Command::Verify { key } => verify(&config, &key),
        Command::Keys => keys(&config),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<HawkConfig> {
    match path {
        Some(path) => HawkConfig::load(path)
            .with_context(|| format!("load config {}", path.display())),
        None => Ok(HawkConfig::from_env()),
    }
}

fn open(config: &HawkConfig) -> Result<Dataset> {
    Dataset::open(config)
        .with_context(|| format!("open dataset in {}", config.data_dir.display()))
}

fn describe(config: &HawkConfig, path: &str) -> Result<()> {
    let data = open(config)?;
    let node = data.get(path).with_context(|| format!("navigate to {path:?}"))?;
    for (key, value) in hawk_store::describe(&node)? {
        println!("{key}: {value}");
    }
    Ok(())
}

fn explore(config: &HawkConfig, path: &str, depth: usize) -> Result<()> {
    let data = open(config)?;
    let group = data
        .group(path)
        .with_context(|| format!("navigate to group {path:?}"))?;
    print!("{}", group.explore(depth)?);
    Ok(())
}

fn read(config: &HawkConfig, path: &str) -> Result<()> {
    let data = open(config)?;
    let node = data.get(path).with_context(|| format!("navigate to {path:?}"))?;
    let Node::Leaf(leaf) = node else {
        anyhow::bail!("{path:?} is a group; use explore");
    };
    let series = leaf.read()?;
    let measurement = leaf.measurement()?.unwrap_or_else(|| "?".to_string());
    let units = leaf.units()?.unwrap_or_else(|| "?".to_string());
    println!("{}: {measurement} ({units}) shape {:?}", leaf.path(), series.shape());
    let preview: Vec<String> = series
        .values()
        .iter()
        .take(PREVIEW_SAMPLES)
        .map(f64::to_string)
        .collect();
    let more = if series.len() > PREVIEW_SAMPLES { ", ..." } else { "" };
    println!("[{}{more}]", preview.join(", "));
    Ok(())
}

fn fetch(config: &HawkConfig, key: &str) -> Result<()> {
    let data = open(config)?;
    let path = data
        .fetcher()
        .ensure(key, data.cache_dir())
        .with_context(|| format!("materialize shard {key}"))?;
    println!("hawk: shard {key} at {}", path.display());
    Ok(())
}

fn verify(config: &HawkConfig, key: &str) -> Result<()> {
    let data = open(config)?;
    data.fetcher()
        .verify(key, data.cache_dir())
        .with_context(|| format!("verify shard {key}"))?;
    println!("hawk: shard {key} ok");
    Ok(())
}

fn keys(config: &HawkConfig) -> Result<()> {
    let table = LookupTable::from_path(&config.lookup_table)
        .with_context(|| format!("load lookup table {}", config.lookup_table.display()))?;
    for key in table.keys() {
        println!("{key}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explore_defaults_to_root_and_two_levels() {
        let cli = Cli::try_parse_from(["hawk", "explore"]).expect("parse");
        match cli.command {
            Command::Explore { path, depth } => {
                assert_eq!(path, "");
                assert_eq!(depth, 2);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_config_flag_follows_subcommand() {
        let cli = Cli::try_parse_from(["hawk", "read", "LMS/xData/freq", "--config", "hawk.toml"])
            .expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("hawk.toml")));
        assert!(matches!(cli.command, Command::Read { ref path } if path == "LMS/xData/freq"));
    }

    #[test]
    fn fetch_requires_a_key() {
        assert!(Cli::try_parse_from(["hawk", "fetch"]).is_err());
    }
}
