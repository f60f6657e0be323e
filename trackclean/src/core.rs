//! File-level cleanup API used by the CLI.
//! Loads board files, runs the cleaner, writes results and builds reports.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::board::islands::{count_islands, total_unrouted};
use crate::board::{
    nm_to_mm, Board, BoardCommit, BoardSummary, CommitEntry, RemovalReason, Track,
};
use crate::cleanup::{CleanupOptions, CleanupStats, TracksCleaner};
use crate::parser::pcb::PcbParseError;
use crate::parser::pcb_schema::PcbDesign;
use crate::parser::writer::PcbDocument;

#[derive(Debug, thiserror::Error)]
pub enum TrackCleanError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("{0}")]
    Other(String),
}

impl From<PcbParseError> for TrackCleanError {
    fn from(e: PcbParseError) -> Self {
        match e {
            PcbParseError::Io(io) => TrackCleanError::Io(io),
            other => TrackCleanError::Parse(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for TrackCleanError {
    fn from(e: serde_json::Error) -> Self {
        TrackCleanError::Config(e.to_string())
    }
}

/// Read cleanup options from a JSON file. Missing keys keep their defaults.
pub fn load_options(path: &Path) -> Result<CleanupOptions, TrackCleanError> {
    let content = std::fs::read_to_string(path)?;
    let options = serde_json::from_str(&content)?;
    Ok(options)
}

/// One item deleted by a cleanup run, in file units.
#[derive(Debug, Clone, Serialize)]
pub struct RemovedItem {
    pub uuid: String,
    pub kind: &'static str,
    pub net: u32,
    pub net_name: Option<String>,
    pub layer: String,
    pub start: [f64; 2],
    pub end: [f64; 2],
    pub reason: RemovalReason,
}

impl RemovedItem {
    fn new(track: &Track, reason: RemovalReason, design: &PcbDesign) -> Self {
        Self {
            uuid: track.uuid.clone(),
            kind: track.kind_name(),
            net: track.net,
            net_name: design.net_name(track.net).map(str::to_string),
            layer: track.layer.name(),
            start: [nm_to_mm(track.start.x), nm_to_mm(track.start.y)],
            end: [nm_to_mm(track.end.x), nm_to_mm(track.end.y)],
            reason,
        }
    }
}

/// Outcome of cleaning one board file.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    pub file: PathBuf,
    pub modified: bool,
    /// Where the cleaned board was saved, if it was.
    pub written: Option<PathBuf>,
    pub options: CleanupOptions,
    pub stats: CleanupStats,
    pub removed: Vec<RemovedItem>,
    /// Tracks edited in place (merged or normalized).
    pub modified_tracks: usize,
    pub before: BoardSummary,
    pub after: BoardSummary,
    /// Missing connections over all nets, before and after.
    pub unrouted_before: usize,
    pub unrouted_after: usize,
}

/// Routed length of one net.
#[derive(Debug, Clone, Serialize)]
pub struct NetLength {
    pub net: u32,
    pub name: String,
    pub length_mm: f64,
    pub islands: usize,
}

/// Copper statistics of one board file.
#[derive(Debug, Clone, Serialize)]
pub struct BoardStats {
    pub file: PathBuf,
    pub summary: BoardSummary,
    pub unrouted: usize,
    pub nets: Vec<NetLength>,
}

/// Recursively discover KiCad board files in a directory.
pub fn discover_pcb_files(dir: &Path) -> Result<Vec<PathBuf>, TrackCleanError> {
    let mut files = Vec::new();
    walk_dir(dir, &mut files, 0)?;
    files.sort();
    Ok(files)
}

fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>, depth: usize) -> Result<(), TrackCleanError> {
    if depth > 20 {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.starts_with('.') || name == "target" || name.ends_with("-backups") {
                continue;
            }
            walk_dir(&path, files, depth + 1)?;
        } else if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("kicad_pcb") {
            files.push(path);
        }
    }
    Ok(())
}

/// Core cleanup API used by the CLI.
pub struct TrackCleanCore;

impl TrackCleanCore {
    /// Clean a board in memory and report what would change. Nothing is written.
    pub fn clean_pcb(path: &Path, options: &CleanupOptions) -> Result<CleanupReport, TrackCleanError> {
        let (report, _) = Self::run(path, options)?;
        Ok(report)
    }

    /// Clean a board and save the result to `output`.
    ///
    /// When `output` is the input file it is only rewritten if the cleanup
    /// changed something.
    pub fn clean_pcb_to(
        path: &Path,
        output: &Path,
        options: &CleanupOptions,
    ) -> Result<CleanupReport, TrackCleanError> {
        let (mut report, document) = Self::run(path, options)?;

        if report.modified || output != path {
            document.save(output)?;
            tracing::info!("Wrote {}", output.display());
            report.written = Some(output.to_path_buf());
        }
        Ok(report)
    }

    /// Clean every board file below `dir`. With `write`, files are cleaned in place.
    pub fn clean_project(
        dir: &Path,
        options: &CleanupOptions,
        write: bool,
    ) -> Result<Vec<CleanupReport>, TrackCleanError> {
        let files = discover_pcb_files(dir)?;
        tracing::info!("Found {} board files in {}", files.len(), dir.display());

        let mut reports = Vec::with_capacity(files.len());
        for path in files {
            let report = if write {
                Self::clean_pcb_to(&path, &path, options)?
            } else {
                Self::clean_pcb(&path, options)?
            };
            reports.push(report);
        }
        Ok(reports)
    }

    /// Item counts, net lengths and island counts of a board file.
    pub fn board_stats(path: &Path) -> Result<BoardStats, TrackCleanError> {
        let document = PcbDocument::load(path)?;
        let board = document.to_board().board;
        let islands = count_islands(&board);

        let nets = board
            .nets()
            .into_iter()
            .map(|net| NetLength {
                net,
                name: document.design().net_name(net).unwrap_or("").to_string(),
                length_mm: board.net_length(net) / crate::board::NM_PER_MM,
                islands: islands.get(&net).map_or(0, |i| i.islands),
            })
            .collect();

        Ok(BoardStats {
            file: path.to_path_buf(),
            summary: board.summary(),
            unrouted: total_unrouted(&islands),
            nets,
        })
    }

    /// Clean an in-memory board. Returns the modified flag, the commit and
    /// the run counters.
    pub fn clean_board(board: &mut Board, options: &CleanupOptions) -> (bool, BoardCommit, CleanupStats) {
        let mut commit = BoardCommit::new();
        let mut cleaner = TracksCleaner::new(board, &mut commit);
        let modified = cleaner.cleanup_board(options);
        let stats = cleaner.into_stats();
        (modified, commit, stats)
    }

    fn run(path: &Path, options: &CleanupOptions) -> Result<(CleanupReport, PcbDocument), TrackCleanError> {
        let mut document = PcbDocument::load(path)?;
        let mut loaded = document.to_board();

        let before = loaded.board.summary();
        let unrouted_before = total_unrouted(&count_islands(&loaded.board));

        let (modified, commit, stats) = Self::clean_board(&mut loaded.board, options);

        let design = document.design();
        let mut removed = Vec::new();
        let mut modified_tracks = 0;
        for entry in commit.entries() {
            match entry {
                CommitEntry::Removed { track, reason, .. } => {
                    removed.push(RemovedItem::new(track, *reason, design))
                }
                CommitEntry::Modified { .. } => modified_tracks += 1,
            }
        }

        let after = loaded.board.summary();
        let unrouted_after = total_unrouted(&count_islands(&loaded.board));

        if modified {
            document.apply(&loaded)?;
        }

        tracing::info!(
            "{}: {} items removed, {} tracks modified",
            path.display(),
            removed.len(),
            modified_tracks
        );

        let report = CleanupReport {
            file: path.to_path_buf(),
            modified,
            written: None,
            options: *options,
            stats,
            removed,
            modified_tracks,
            before,
            after,
            unrouted_before,
            unrouted_after,
        };
        Ok((report, document))
    }
}
