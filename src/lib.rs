//! Least-cost hourly dispatch of regional power systems.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod error;
pub mod export;
pub mod generator;
pub mod graph;
pub mod id;
pub mod input;
pub mod link;
pub mod log;
pub mod lp;
pub mod model;
pub mod network;
pub mod optimisation;
pub mod output;
pub mod region;
pub mod results;
pub mod settings;
pub mod simulation;
pub mod snapshot;
pub mod solver;
pub mod storage;
pub mod topology;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the directory in which the program's configuration files are stored
pub fn get_powerdispatch_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // No config dir on this platform, so fall back to the working directory
        return PathBuf::default();
    };
    config_dir.push("powerdispatch");
    config_dir
}
