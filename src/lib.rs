//! Find and remove media files in a secondary directory tree that
//! duplicate files in a primary tree.

pub mod config;
pub mod core;
pub mod database;

pub use crate::config::RunConfig;
pub use crate::core::matcher::{MatchField, MatchMap, find_matching};
pub use crate::core::remover::{
    AutomaticRemoval, ConfirmRemoval, DuplicateRemover, RemovalPolicy, RemoveError, RunSummary,
};
pub use crate::database::{FingerprintStore, StoreLocation};
