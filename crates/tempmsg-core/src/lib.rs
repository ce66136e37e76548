#![doc = include_str!("../README.md")]

mod error;
pub mod lifecycle;
pub mod storage;

pub use error::*;
// Public re-export so downstream crates can reach the ID types via
// `tempmsg_core::tempmsg_id`
pub use tempmsg_id;
