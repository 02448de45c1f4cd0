mod tally;
mod flush;
mod handler;
pub mod application;

pub use tally::*;
pub use flush::*;
pub use handler::*;
