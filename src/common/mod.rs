pub mod datetime_utils;
pub mod clock;

use std::result;

pub type Result<T, E = String> = result::Result<T, E>;
