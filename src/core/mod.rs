//! Core modules shared by every form subsystem.
//!
//! Errors, SQLite access, the mutation broker and its audit log, schema
//! definitions, configuration and the store handle live here.

pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod output;
pub mod schemas;
pub mod store;
pub mod time;
