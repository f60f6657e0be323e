//! Example: drive `TracksCleaner` directly and follow every removal.
//!
//! Hosts that attach extra data to tracks (teardrops, tuning patterns) get a
//! callback before each removal and another when a duplicate or merged
//! segment folds into a survivor.
//! Run with: cargo run --example custom_decorations [path/to/file.kicad_pcb]

use std::path::Path;
use trackclean::board::Track;
use trackclean::{BoardCommit, CleanupOptions, PcbDocument, TrackDecorations, TracksCleaner};

#[derive(Default)]
struct DecorationLog {
    dropped: Vec<String>,
    moved: Vec<(String, String)>,
}

impl TrackDecorations for DecorationLog {
    fn before_remove(&mut self, track: &Track) {
        self.dropped.push(track.uuid.clone());
    }

    fn reattach(&mut self, survivor: &Track, removed: &Track) {
        self.moved.push((removed.uuid.clone(), survivor.uuid.clone()));
    }
}

fn main() -> Result<(), trackclean::TrackCleanError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/messy_board.kicad_pcb".to_string());
    let document = PcbDocument::load(Path::new(&path))?;
    let mut loaded = document.to_board();

    let mut commit = BoardCommit::new();
    let mut log = DecorationLog::default();
    let stats = {
        let mut cleaner = TracksCleaner::new(&mut loaded.board, &mut commit).with_decorations(&mut log);
        cleaner.cleanup_board(&CleanupOptions::default());
        cleaner.into_stats()
    };

    println!("Removed {} items", stats.total_removed());
    for uuid in &log.dropped {
        println!("  dropped decorations of {}", uuid);
    }
    for (from, to) in &log.moved {
        println!("  moved decorations {} -> {}", from, to);
    }

    match commit.push("Board cleanup") {
        Some(undo) => println!("{} changes recorded at {}", undo.entries.len(), undo.timestamp),
        None => println!("Nothing to undo"),
    }
    Ok(())
}
