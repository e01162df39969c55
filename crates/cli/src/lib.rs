pub mod commands;
pub mod config;
pub mod render;

pub use commands::{run, Cli};
pub use config::Config;
