//! Harmonisation of life-cycle inventories with the outputs of TIMES energy-system models.
//!
//! Inventory activities are edited through the [`inventory::InventoryStore`] trait: flows are
//! located by name ([`flow`]), rescaled or re-sourced ([`mutate`]), merged ([`aggregate`]) and
//! every change is recorded on the activity ([`harmonisation`]). TIMES results are reduced to
//! CO2-equivalent emissions per process ([`times`]) and screened for the processes driving the
//! change between two scenarios ([`screening`]).
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod aggregate;
pub mod cli;
pub mod flow;
pub mod harmonisation;
pub mod id;
pub mod input;
pub mod inventory;
pub mod log;
pub mod metrics;
pub mod mutate;
pub mod output;
pub mod plan;
pub mod screening;
pub mod settings;
pub mod times;

#[cfg(test)]
mod fixture;

/// Get config dir for program.
///
/// This will be `times2lca` in the user's config directory (e.g. `~/.config/times2lca` on Linux).
pub fn get_times2lca_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // No user config dir, so use the current directory
        return PathBuf::new();
    };
    config_dir.push("times2lca");

    config_dir
}
