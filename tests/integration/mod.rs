//! Integration tests for the Articast podcast pipeline

mod cli_integration;
mod config_integration;
mod tracker_persistence;
