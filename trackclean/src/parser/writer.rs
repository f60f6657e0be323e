//! Writing a cleaned board back to its file
//!
//! A [`PcbDocument`] keeps the complete S-expression tree of a board file.
//! After a cleanup run, [`PcbDocument::apply`] drops the nodes of removed
//! tracks and rewrites the endpoints of stretched segments; every other node,
//! arcs included, is written back exactly as it was read.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::board::convert::{board_from_design, LoadedBoard};
use crate::board::{mm_to_nm, nm_to_mm, Point, Track};
use crate::parser::pcb::{PcbParseError, PcbParser};
use crate::parser::pcb_schema::PcbDesign;
use crate::parser::sexp::SExp;

/// A parsed board file that can be written back.
#[derive(Debug, Clone)]
pub struct PcbDocument {
    root: SExp,
    design: PcbDesign,
    path: Option<PathBuf>,
}

/// What [`PcbDocument::apply`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedChanges {
    pub removed: usize,
    pub rewritten: usize,
}

impl AppliedChanges {
    pub fn is_empty(&self) -> bool {
        self.removed == 0 && self.rewritten == 0
    }
}

impl PcbDocument {
    pub fn load(path: &Path) -> Result<Self, PcbParseError> {
        let content = std::fs::read_to_string(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string();
        let mut doc = Self::parse_str(&content, &filename)?;
        doc.path = Some(path.to_path_buf());
        Ok(doc)
    }

    pub fn parse_str(content: &str, filename: &str) -> Result<Self, PcbParseError> {
        let root = PcbParser::parse_root(content)?;
        let design = PcbParser::extract_design(&root, filename)?;
        Ok(Self {
            root,
            design,
            path: None,
        })
    }

    pub fn design(&self) -> &PcbDesign {
        &self.design
    }

    pub fn root(&self) -> &SExp {
        &self.root
    }

    /// File this document was loaded from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Net-sorted board of the document's copper.
    pub fn to_board(&self) -> LoadedBoard {
        board_from_design(&self.design)
    }

    /// Bring the document in line with `loaded`, a board obtained from
    /// [`to_board`](Self::to_board) on this same document.
    ///
    /// Node indices shift once nodes are dropped, so the document's design is
    /// re-extracted and any earlier [`LoadedBoard`] must not be applied again.
    pub fn apply(&mut self, loaded: &LoadedBoard) -> Result<AppliedChanges, PcbParseError> {
        let mut changes = AppliedChanges::default();
        let mut dropped = HashSet::new();

        let items = self
            .root
            .as_list_mut()
            .ok_or_else(|| PcbParseError::InvalidFormat("Root must be a list".to_string()))?;

        for (&id, &node) in &loaded.sources {
            let Some(sexp) = items.get_mut(node) else {
                return Err(PcbParseError::InvalidFormat(format!(
                    "Track {} points outside the document",
                    id
                )));
            };

            match loaded.board.track(id) {
                None => {
                    dropped.insert(node);
                }
                Some(track) if track.is_trace() => {
                    if rewrite_segment(sexp, track) {
                        changes.rewritten += 1;
                    }
                }
                Some(_) => {}
            }
        }

        if !dropped.is_empty() {
            let kept: Vec<SExp> = std::mem::take(items)
                .into_iter()
                .enumerate()
                .filter(|(i, _)| !dropped.contains(i))
                .map(|(_, item)| item)
                .collect();
            *items = kept;
            changes.removed = dropped.len();
        }

        if !changes.is_empty() {
            tracing::debug!(
                "Applied cleanup to {}: {} nodes removed, {} segments rewritten",
                self.design.filename,
                changes.removed,
                changes.rewritten
            );
            self.design = PcbParser::extract_design(&self.root, &self.design.filename)?;
        }
        Ok(changes)
    }

    /// Serialized document.
    pub fn to_sexp_string(&self) -> String {
        self.root.to_pretty_string()
    }

    pub fn save(&self, path: &Path) -> Result<(), PcbParseError> {
        std::fs::write(path, self.to_sexp_string())?;
        Ok(())
    }
}

/// Update `(start ..)`/`(end ..)` of a segment node. Returns `true` if a
/// coordinate actually changed.
fn rewrite_segment(sexp: &mut SExp, track: &Track) -> bool {
    let mut changed = false;
    for (key, point) in [("start", track.start), ("end", track.end)] {
        if read_point(sexp, key) == Some(point) {
            continue;
        }
        if let Some(node) = sexp.child_mut(key) {
            *node = SExp::node(key, &[&format_mm(point.x), &format_mm(point.y)]);
            changed = true;
        }
    }
    changed
}

fn read_point(sexp: &SExp, key: &str) -> Option<Point> {
    let x: f64 = sexp.value(key, 0)?.parse().ok()?;
    let y: f64 = sexp.value(key, 1)?.parse().ok()?;
    Some(Point::new(mm_to_nm(x), mm_to_nm(y)))
}

/// Millimetres without trailing zeros, the way KiCad writes coordinates.
pub fn format_mm(nm: i64) -> String {
    let text = format!("{:.6}", nm_to_mm(nm));
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}
