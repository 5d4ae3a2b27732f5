pub mod cli;
pub mod commands;
pub mod error;
pub mod flamegraph;
pub mod storage;
pub mod tui;

pub use error::{Error, Result};
