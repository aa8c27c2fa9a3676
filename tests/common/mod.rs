//! Shared test utilities for flightbox
//!
//! - Scripted sample programs for the recorder
//! - Temporary recordings directories

pub mod fixtures;
