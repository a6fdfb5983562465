//! Native modal file dialogs.
//!
//! Stateless: one dialog per call, blocking until the user responds.
//! Cancellation yields `None`, which the bridge converts to the empty
//! string sentinel. Filter strings use the original host's
//! `*.ext;;*.ext` segment syntax.

use std::path::PathBuf;

/// Seam for the dialog surface, so cancellation and selection are
/// simulable in tests without a desktop session.
pub trait DialogProvider {
    fn open_file(&self, filter: &str, initial_dir: &str) -> Option<PathBuf>;
    fn save_file(&self, filter: &str, initial_dir: &str) -> Option<PathBuf>;
}

/// One parsed filter segment: display name plus bare extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSegment {
    pub name: String,
    pub extensions: Vec<String>,
}

/// Parse a `*.gravit;;*.pdf`-style filter string. Segments without a
/// concrete extension (`*`, `*.*`, empty) are dropped; an empty result
/// means "no filtering".
pub fn parse_filter(filter: &str) -> Vec<FilterSegment> {
    filter
        .split(";;")
        .filter_map(|segment| {
            let segment = segment.trim();
            let extensions: Vec<String> = segment
                .split_whitespace()
                .filter_map(|token| {
                    let ext = token.trim_start_matches('*').trim_start_matches('.');
                    (!ext.is_empty() && ext != "*").then(|| ext.to_string())
                })
                .collect();
            (!extensions.is_empty()).then(|| FilterSegment {
                name: segment.to_string(),
                extensions,
            })
        })
        .collect()
}

/// Production dialogs over rfd.
pub struct RfdDialogs;

impl RfdDialogs {
    fn build(filter: &str, initial_dir: &str) -> rfd::FileDialog {
        let mut dialog = rfd::FileDialog::new();
        if !initial_dir.is_empty() {
            dialog = dialog.set_directory(initial_dir);
        }
        for segment in parse_filter(filter) {
            let exts: Vec<&str> = segment.extensions.iter().map(|s| s.as_str()).collect();
            dialog = dialog.add_filter(&segment.name, &exts);
        }
        dialog
    }
}

impl DialogProvider for RfdDialogs {
    fn open_file(&self, filter: &str, initial_dir: &str) -> Option<PathBuf> {
        Self::build(filter, initial_dir).pick_file()
    }

    fn save_file(&self, filter: &str, initial_dir: &str) -> Option<PathBuf> {
        Self::build(filter, initial_dir).save_file()
    }
}
