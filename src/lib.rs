//! marksync: a bookmark sidebar engine with optimistic edits and undo.
//!
//! This library crate exposes all modules for use by the binary and integration tests.

pub mod app;
pub mod backend;
pub mod database;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod tree;
pub mod types;
