//! Integration tests for flightbox
//!
//! These tests verify that recording, storage and narration work together.

#[path = "../common/mod.rs"]
pub mod common;

pub mod cli;
pub mod record_replay;
pub mod store_flow;
