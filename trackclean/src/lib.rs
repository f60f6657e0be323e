//! TrackClean - copper track cleanup for KiCad boards
//!
//! This library removes redundant and broken routing from a PCB: zero-length
//! segments, stacked vias, duplicated segments, intermediate points on
//! straight runs, tracks shorting two nets and dangling stubs. Connectivity
//! to pads, vias and filled zones is preserved.
//!
//! # Quick Start
//!
//! ```no_run
//! use trackclean::{CleanupOptions, TrackCleanCore};
//! use std::path::Path;
//!
//! let options = CleanupOptions::default();
//! let report = TrackCleanCore::clean_pcb_to(
//!     Path::new("board.kicad_pcb"),
//!     Path::new("board.cleaned.kicad_pcb"),
//!     &options,
//! ).unwrap();
//!
//! for item in &report.removed {
//!     println!("{} {}: {}", item.kind, item.uuid, item.reason.describe());
//! }
//! ```
//!
//! # Features
//!
//! - **Board model**: integer-coordinate tracks, vias, pads and zones with a
//!   commit log that can be reverted
//! - **Cleanup passes**: duplicates, collinear merge, mis-connections,
//!   dangling tracks, each selectable
//! - **File round trip**: untouched parts of a `.kicad_pcb` are written back
//!   as they were read
//! - **Connectivity report**: per-net copper islands before and after

pub mod board;
pub mod cleanup;
pub mod core;
pub mod parser;

// Re-export main types
pub use board::{Board, BoardCommit, CommitLog, RemovalReason, Track, TrackId};
pub use cleanup::{CleanupOptions, CleanupStats, TrackDecorations, TracksCleaner};
pub use core::{
    discover_pcb_files, load_options, BoardStats, CleanupReport, RemovedItem, TrackCleanCore,
    TrackCleanError,
};
pub use parser::pcb::PcbParser;
pub use parser::pcb_schema::PcbDesign;
pub use parser::writer::PcbDocument;

/// Parse a PCB file (convenience wrapper).
pub fn parse_pcb(path: &std::path::Path) -> Result<PcbDesign, TrackCleanError> {
    PcbParser::parse_pcb(path).map_err(TrackCleanError::from)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Board, BoardCommit, CleanupOptions, CleanupReport, CleanupStats, RemovalReason,
        TrackCleanCore, TrackCleanError, TracksCleaner,
    };
}
