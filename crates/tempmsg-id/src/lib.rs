#![doc = include_str!("../README.md")]

mod error;
#[cfg(feature = "async-tokio")]
mod futures;
mod generator;
mod id;
mod machine;
mod status;
mod time;

pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::machine::*;
pub use crate::status::*;
pub use crate::time::*;
