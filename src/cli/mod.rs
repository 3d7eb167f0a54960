pub mod commands;
pub mod connection;
pub mod display;
pub mod k3s;

pub use commands::{CliArgs, Commands};
