//! Articast: Batch Podcast Generation and Publishing
//!
//! Turns board-curated articles into published podcast episodes: candidates
//! are fetched from the work-item board, narrated through an external
//! generation service under a rolling rate limit, transcoded to MP3, and
//! uploaded to the hosting platform with results written back to the board.

pub mod adapter;
pub mod batch;
pub mod candidate;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod partition;
pub mod podcast;
pub mod tracker;
