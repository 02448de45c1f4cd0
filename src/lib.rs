pub mod common;
pub mod config;
pub mod window;
pub mod execution;

pub use common::*;
