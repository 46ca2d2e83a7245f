//! Core data structures for the locallens application.
//!
//! This module contains shared types used throughout the application,
//! including the Result alias, geographic coordinates, and the CLI
//! command surface.

use clap::Subcommand;
use serde::{Deserialize, Serialize};

use crate::LensError;

/// A specialized Result type for locallens operations.
pub type Result<T> = std::result::Result<T, LensError>;

/// A geographic coordinate pair.
///
/// Callers that have no real position send a zero-value placeholder; the
/// store keeps whatever it was given without normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

/// Available subcommands for the locallens application
#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default when no subcommand is given)
    Serve,

    /// Create a snapshot of the article store and exit
    Snapshot,

    /// Configuration management
    Config {
        /// Show current configuration
        #[clap(short = 'S', long)]
        show: bool,
    },
}
