#![doc = include_str!("../README.md")]

mod error;
mod snapshot;
mod statistician;

pub use crate::error::NoLookups;
pub use crate::snapshot::Snapshot;
pub use crate::statistician::{LookupTimer, Statistician};
