// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Rendering of text-edit groups.
//!
//! A handful of edits is shown one by one. Past [`SEPARATE_EDIT_LIMIT`],
//! edits are sorted by line and adjacent ones are merged so that a file
//! rewritten in many small steps reads as a few contiguous hunks.

use crate::markdown::{fenced, language_for_extension};
use crate::parser::{TextEdit, TextEditGroup};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Largest number of edits rendered as separate blocks.
const SEPARATE_EDIT_LIMIT: usize = 5;

/// Edits starting within this many lines of the previous edit's end merge.
const MERGE_GAP: u32 = 2;

/// Two or more blank lines in a row.
static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n+").expect("valid blank run regex"));

/// Renders a text-edit group as a collapsible block.
///
/// Returns an empty string when no edit carries text.
pub(crate) fn format_text_edit_group(group: &TextEditGroup) -> String {
    let edits: Vec<&TextEdit> = group.edits().collect();
    if edits.is_empty() {
        return String::new();
    }

    let file_name = group.file_name();
    let lang = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(language_for_extension)
        .unwrap_or_default();

    let mut lines = vec![
        "<details>".to_owned(),
        format!("  <summary>🛠️ File Edit: {file_name}</summary>"),
    ];

    match edits.as_slice() {
        [edit] => {
            if let Some(span) = edit.line_span() {
                lines.push(format!(
                    "  <p><strong>Modified {}:</strong></p>",
                    span_label(span, "line", "lines")
                ));
                lines.push(String::new());
            }
            lines.push(fenced(edit.text().trim_end(), lang));
        }
        edits if edits.len() <= SEPARATE_EDIT_LIMIT => {
            for (i, edit) in edits.iter().enumerate() {
                if i > 0 {
                    lines.push(String::new());
                }
                if let Some(span) = edit.line_span() {
                    lines.push(format!(
                        "  <p><strong>{}:</strong></p>",
                        span_label(span, "Line", "Lines")
                    ));
                    lines.push(String::new());
                }
                lines.push(fenced(edit.text().trim_end(), lang));
            }
        }
        edits => {
            lines.push(format!(
                "  <p><strong>Multiple file changes ({} edits)</strong></p>",
                edits.len()
            ));
            lines.push(String::new());
            lines.push(fenced(&consolidate(edits), lang));
        }
    }

    lines.push(String::new());
    lines.push("</details>".to_owned());
    lines.join("\n")
}

/// Merges runs of adjacent edits into headed sections of one listing.
fn consolidate(edits: &[&TextEdit]) -> String {
    let mut sorted = edits.to_vec();
    sorted.sort_by_key(|edit| edit.start_line());

    let mut sections: Vec<String> = Vec::new();
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i + 1;
        while j < sorted.len() && continues_run(sorted[j - 1], sorted[j]) {
            j += 1;
        }

        match &sorted[i..j] {
            [edit] => {
                let heading = edit.line_span().map_or_else(
                    || format!("# Edit {}:", i + 1),
                    |span| format!("# {}:", span_label(span, "Line", "Lines")),
                );
                sections.push(heading);
                sections.push(edit.text().trim_end().to_owned());
            }
            run => {
                let first = run[0].start_line();
                let last = run[run.len() - 1].end_line();
                if first != 0 && last != 0 {
                    sections.push(format!("# Lines {first}-{last}:"));
                }
                let joined = run
                    .iter()
                    .map(|edit| edit.text().trim())
                    .collect::<Vec<_>>()
                    .join("\n");
                let joined = BLANK_RUN.replace_all(&joined, "\n\n");
                let joined = joined.trim();
                if !joined.is_empty() {
                    sections.push(joined.to_owned());
                }
            }
        }

        i = j;
        if i < sorted.len() {
            sections.push(String::new());
        }
    }

    sections.join("\n")
}

fn continues_run(prev: &TextEdit, next: &TextEdit) -> bool {
    let prev_end = prev.end_line();
    let next_start = next.start_line();
    next_start != 0 && prev_end != 0 && next_start <= prev_end.saturating_add(MERGE_GAP)
}

fn span_label((start, end): (u32, u32), singular: &str, plural: &str) -> String {
    if start == end {
        format!("{singular} {start}")
    } else {
        format!("{plural} {start}-{end}")
    }
}
