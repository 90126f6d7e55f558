//! updatery - winget upgrade discovery and orchestration library
//!
//! This library provides the core functionality for upgrading packages
//! reported by a machine-local package manager:
//! - Parsing fixed-width listings into package records
//! - Filtering them into an upgrade catalog and tracking the selection
//! - Running upgrades one at a time as supervised, cancellable processes
//! - An interactive controller that owns catalog and selection state

pub mod backend;
pub mod cli;
pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod interactive;
pub mod orchestrator;
pub mod output;
pub mod parser;
pub mod process;
pub mod progress;
pub mod runner;
pub mod scan;
pub mod update;
