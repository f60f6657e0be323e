//! Example: clean a board file with the default passes.
//! Run with: cargo run --example clean_board [path/to/file.kicad_pcb] [output.kicad_pcb]

use std::path::Path;
use trackclean::{CleanupOptions, TrackCleanCore};

fn main() -> Result<(), trackclean::TrackCleanError> {
    let mut args = std::env::args().skip(1);
    let input = args
        .next()
        .unwrap_or_else(|| "tests/fixtures/messy_board.kicad_pcb".to_string());
    let input = Path::new(&input);

    if !input.exists() {
        eprintln!("File not found: {}", input.display());
        eprintln!("Usage: cargo run --example clean_board [path/to/file.kicad_pcb] [output]");
        std::process::exit(1);
    }

    let options = CleanupOptions::default();
    let report = match args.next() {
        Some(output) => TrackCleanCore::clean_pcb_to(input, Path::new(&output), &options)?,
        None => TrackCleanCore::clean_pcb(input, &options)?,
    };

    println!(
        "{}: {} items removed, {} tracks edited",
        input.display(),
        report.removed.len(),
        report.modified_tracks
    );
    for item in &report.removed {
        println!(
            "  {:<8} {:<12} {:>8} -> {}",
            item.kind,
            item.uuid,
            item.net_name.as_deref().unwrap_or("?"),
            item.reason.describe()
        );
    }
    if let Some(path) = &report.written {
        println!("Written to {}", path.display());
    }
    Ok(())
}
