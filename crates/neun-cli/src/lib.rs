//! Neun CLI crate
//!
//! Library view of the `neun` binary: the clap command tree and the TOML
//! simulation description, exposed so integration tests and scripts can
//! drive them without spawning a process.
//!
//! Commands (see [commands]):
//! - run: load a simulation file, build the network, write the probe table.
//! - demo: the same for one of the bundled descriptions in `demos/`.
//! - models / info: registry introspection.

pub mod commands;
pub mod config;
pub mod error;

pub use commands::NeunCli;
pub use config::SimulationConfig;
pub use error::{CliError, CliResult};
