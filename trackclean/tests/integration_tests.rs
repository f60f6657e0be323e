//! Integration tests for the TrackClean library

use std::path::PathBuf;
use trackclean::board::islands::{count_islands, total_unrouted};
use trackclean::prelude::*;
use trackclean::{discover_pcb_files, load_options, PcbDocument};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn removed_uuids(report: &CleanupReport, reason: RemovalReason) -> Vec<&str> {
    report
        .removed
        .iter()
        .filter(|item| item.reason == reason)
        .map(|item| item.uuid.as_str())
        .collect()
}

#[test]
fn test_clean_messy_board() {
    let report = TrackCleanCore::clean_pcb(
        &fixture_path("messy_board.kicad_pcb"),
        &CleanupOptions::default(),
    )
    .expect("Should clean");

    assert!(report.modified, "Messy board should need cleaning");
    assert!(report.written.is_none(), "Dry run should not write");

    assert_eq!(removed_uuids(&report, RemovalReason::NullSegment), vec!["sig-null"]);
    assert_eq!(removed_uuids(&report, RemovalReason::DuplicateVia), vec!["gnd-via-dup"]);
    assert_eq!(removed_uuids(&report, RemovalReason::ViaOnThroughPad), vec!["sig-via-pad"]);
    assert_eq!(removed_uuids(&report, RemovalReason::DuplicateTrack), vec!["sig-dup"]);
    assert_eq!(removed_uuids(&report, RemovalReason::MisConnected), vec!["vcc-short"]);
    assert_eq!(removed_uuids(&report, RemovalReason::Dangling), vec!["sig-stub"]);

    let mut merged = removed_uuids(&report, RemovalReason::MergedCollinear);
    merged.sort();
    assert_eq!(merged, vec!["sig-2", "sig-3"]);

    assert_eq!(report.stats.total_removed(), 8);
    assert_eq!(report.after.traces, 2, "GND stub and one SIG run should remain");
    assert_eq!(report.after.vias, 1, "The zone-anchored GND via should remain");
}

#[test]
fn test_removed_items_carry_net_names() {
    let report = TrackCleanCore::clean_pcb(
        &fixture_path("messy_board.kicad_pcb"),
        &CleanupOptions::default(),
    )
    .expect("Should clean");

    let short = report
        .removed
        .iter()
        .find(|item| item.uuid == "vcc-short")
        .expect("VCC short should be removed");
    assert_eq!(short.net_name.as_deref(), Some("VCC"));
    assert_eq!(short.kind, "segment");
    assert_eq!(short.layer, "F.Cu");
    assert_eq!(short.start, [60.0, 40.0]);
}

#[test]
fn test_clean_board_is_left_alone() {
    let report = TrackCleanCore::clean_pcb(
        &fixture_path("clean_board.kicad_pcb"),
        &CleanupOptions::default(),
    )
    .expect("Should clean");

    assert!(!report.modified, "Clean board should not change");
    assert!(report.removed.is_empty());
    assert_eq!(report.modified_tracks, 0);
    assert_eq!(report.before, report.after);
}

#[test]
fn test_clean_to_writes_merged_segment() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("cleaned.kicad_pcb");

    let report = TrackCleanCore::clean_pcb_to(
        &fixture_path("messy_board.kicad_pcb"),
        &output,
        &CleanupOptions::default(),
    )
    .expect("Should clean");
    assert_eq!(report.written.as_deref(), Some(output.as_path()));

    let cleaned = PcbDocument::load(&output).expect("Output should parse");
    let design = cleaned.design();
    let sig: Vec<_> = design.traces.iter().filter(|t| t.net == 2).collect();
    assert_eq!(sig.len(), 1, "SIG run should be a single segment");
    assert_eq!(sig[0].uuid, "sig-1");
    assert_eq!((sig[0].start.x, sig[0].end.x), (10.0, 40.0));

    // Non-copper content is kept
    assert!(cleaned.root().child("gr_line").is_some());
    assert_eq!(design.zones.len(), 1);
}

#[test]
fn test_cleaning_twice_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("cleaned.kicad_pcb");
    let options = CleanupOptions::default();

    TrackCleanCore::clean_pcb_to(&fixture_path("messy_board.kicad_pcb"), &output, &options)
        .expect("First run should clean");
    let second = TrackCleanCore::clean_pcb(&output, &options).expect("Second run should clean");

    assert!(!second.modified, "Second run should find nothing to do");
    assert!(second.removed.is_empty());
}

#[test]
fn test_in_place_clean_of_unchanged_board_does_not_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("board.kicad_pcb");
    std::fs::copy(fixture_path("clean_board.kicad_pcb"), &path).unwrap();
    let before = std::fs::read_to_string(&path).unwrap();

    let report = TrackCleanCore::clean_pcb_to(&path, &path, &CleanupOptions::default())
        .expect("Should clean");

    assert!(report.written.is_none());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn test_cleanup_never_adds_unrouted_connections() {
    let options = CleanupOptions {
        remove_misconnected: false,
        ..CleanupOptions::default()
    };
    let document = PcbDocument::load(&fixture_path("messy_board.kicad_pcb")).unwrap();
    let mut board = document.to_board().board;

    let before = count_islands(&board);
    let (modified, _, _) = TrackCleanCore::clean_board(&mut board, &options);
    let after = count_islands(&board);

    assert!(modified);
    for (net, islands) in &after {
        let was = before.get(net).map_or(0, |i| i.islands);
        assert!(
            islands.islands <= was,
            "Net {} went from {} to {} islands",
            net,
            was,
            islands.islands
        );
    }
    assert!(total_unrouted(&after) <= total_unrouted(&before));
}

#[test]
fn test_commit_revert_restores_board() {
    let document = PcbDocument::load(&fixture_path("messy_board.kicad_pcb")).unwrap();
    let mut board = document.to_board().board;
    let original = board.summary();
    let original_tracks: Vec<_> = board.tracks().map(|(id, t)| (id, t.clone())).collect();

    let (modified, commit, _) = TrackCleanCore::clean_board(&mut board, &CleanupOptions::default());
    assert!(modified);
    assert_ne!(board.summary(), original);

    let undo = commit.push("Board cleanup").expect("Cleanup should record changes");
    assert!(!undo.message.is_empty());
    undo.revert(&mut board);
    let restored: Vec<_> = board.tracks().map(|(id, t)| (id, t.clone())).collect();
    assert_eq!(restored, original_tracks, "Revert should restore every track");
}

#[test]
fn test_options_limit_the_passes() {
    let options = CleanupOptions {
        delete_dangling: false,
        remove_misconnected: false,
        ..CleanupOptions::default()
    };
    let report = TrackCleanCore::clean_pcb(&fixture_path("messy_board.kicad_pcb"), &options)
        .expect("Should clean");

    assert_eq!(report.stats.dangling, 0);
    assert_eq!(report.stats.misconnected, 0);
    assert!(report.removed.iter().all(|item| item.uuid != "sig-stub"));
    assert_eq!(report.stats.duplicate_vias, 1);
}

#[test]
fn test_load_options_from_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("options.json");
    std::fs::write(&path, r#"{ "delete_dangling": false }"#).unwrap();

    let options = load_options(&path).expect("Should read options");
    assert!(!options.delete_dangling);
    assert!(options.merge_segments, "Missing keys keep their defaults");

    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(load_options(&path), Err(TrackCleanError::Config(_))));
}

#[test]
fn test_project_discovery_and_clean() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("boards");
    let backups = dir.path().join("proj-backups");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::create_dir_all(&backups).unwrap();
    std::fs::copy(fixture_path("messy_board.kicad_pcb"), nested.join("messy.kicad_pcb")).unwrap();
    std::fs::copy(fixture_path("clean_board.kicad_pcb"), dir.path().join("clean.kicad_pcb")).unwrap();
    std::fs::copy(fixture_path("clean_board.kicad_pcb"), backups.join("old.kicad_pcb")).unwrap();

    let files = discover_pcb_files(dir.path()).expect("Should walk directory");
    assert_eq!(files.len(), 2, "Backup folders should be skipped: {:?}", files);

    let reports = TrackCleanCore::clean_project(dir.path(), &CleanupOptions::default(), true)
        .expect("Should clean project");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports.iter().filter(|r| r.modified).count(), 1);

    let again = TrackCleanCore::clean_pcb(&nested.join("messy.kicad_pcb"), &CleanupOptions::default())
        .expect("Should clean");
    assert!(!again.modified, "Written board should already be clean");
}

#[test]
fn test_board_stats() {
    let stats = TrackCleanCore::board_stats(&fixture_path("clean_board.kicad_pcb")).expect("Should read");
    assert_eq!(stats.summary.traces, 3);
    assert_eq!(stats.unrouted, 0);
    assert_eq!(stats.nets.len(), 1);
    assert_eq!(stats.nets[0].name, "SIG");
    assert_eq!(stats.nets[0].islands, 1);
    assert!(stats.nets[0].length_mm > 20.0);
}

#[test]
fn test_arc_chain_is_left_alone() {
    let report = TrackCleanCore::clean_pcb(&fixture_path("arc_chain.kicad_pcb"), &CleanupOptions::default())
        .expect("Should clean");

    assert!(!report.modified, "Removed: {:?}", report.removed);
    assert!(report.removed.is_empty());
    assert_eq!(report.before.arcs, 1);
    assert_eq!(report.after.arcs, 1);
    assert_eq!(report.after.traces, 2);
    assert_eq!(report.unrouted_after, 0);
}

#[test]
fn test_arc_chain_stats() {
    let stats = TrackCleanCore::board_stats(&fixture_path("arc_chain.kicad_pcb")).expect("Should read");
    assert_eq!(stats.summary.arcs, 1);
    assert_eq!(stats.nets[0].islands, 1, "Arc joins both segments into one island");
    // 10 + quarter circle of radius 10 + 10
    let expected = 20.0 + std::f64::consts::FRAC_PI_2 * 10.0;
    assert!((stats.nets[0].length_mm - expected).abs() < 1e-3, "got {}", stats.nets[0].length_mm);
}

#[test]
fn test_dangling_arc_is_dropped_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("open_arc.kicad_pcb");
    let content = std::fs::read_to_string(fixture_path("arc_chain.kicad_pcb")).unwrap();
    let open: Vec<&str> = content.lines().filter(|line| !line.contains("arc-s2")).collect();
    std::fs::write(&path, open.join("\n")).unwrap();

    let report = TrackCleanCore::clean_pcb_to(&path, &path, &CleanupOptions::default()).expect("Should clean");

    let mut dangling = removed_uuids(&report, RemovalReason::Dangling);
    dangling.sort();
    assert_eq!(dangling, vec!["arc-bend", "arc-s1"]);
    let arc = report.removed.iter().find(|item| item.uuid == "arc-bend").unwrap();
    assert_eq!(arc.kind, "arc");

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(!written.contains("arc-bend"), "Removed arc node should be gone");
    assert!(!written.contains("(arc"));
}

#[test]
fn test_out_of_range_coordinates_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("huge.kicad_pcb");
    std::fs::write(
        &path,
        r#"(kicad_pcb (version 20221018) (net 0 "") (net 1 "SIG")
  (segment (start -1e13 0) (end 0 0) (width 0.25) (layer "F.Cu") (net 1) (uuid "a"))
  (segment (start 0 0) (end 1e13 0) (width 0.25) (layer "F.Cu") (net 1) (uuid "b")))"#,
    )
    .unwrap();

    let result = TrackCleanCore::clean_pcb(&path, &CleanupOptions::default());
    assert!(
        matches!(result, Err(TrackCleanError::Parse(ref message)) if message.contains("out of range")),
        "got {:?}",
        result.map(|r| r.modified)
    );
}
