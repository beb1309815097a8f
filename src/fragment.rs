// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Render nodes for the parts of one response.
//!
//! Response parts first become [`Node`]s: text to be cleaned, or deferred
//! blocks that still need the turn's tool-call tables. [`render_nodes`]
//! resolves the deferred blocks and stitches everything into Markdown.
//! Resolved blocks are inserted as-is, so text cleanup never touches the
//! fenced content inside them.

use crate::edits::format_text_edit_group;
use crate::markdown::clean_message;
use crate::parser::{
    Deferred, ProgressTask, ResponsePart, TextEditGroup, ToolInvocation, TurnResult,
};
use crate::tools::{format_progress_task, format_tool_invocation};
use std::borrow::Cow;

/// A piece of a response awaiting rendering.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node<'a> {
    /// Markdown text, joined with neighbouring text before cleanup.
    Text(Cow<'a, str>),
    /// A block that is rendered once the turn's tables are known.
    Deferred(DeferredBlock<'a>),
}

/// A structured part that renders into a block of its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum DeferredBlock<'a> {
    TextEditGroup(&'a Deferred<TextEditGroup>),
    ToolInvocation(&'a Deferred<ToolInvocation>),
    ProgressTask(&'a Deferred<ProgressTask>),
}

impl<'a> Node<'a> {
    /// Maps a response part to its node, or `None` for parts with nothing
    /// to show.
    pub(crate) fn from_part(part: &'a ResponsePart) -> Option<Self> {
        match part {
            ResponsePart::Text(text) | ResponsePart::Unknown(text) if !text.trim().is_empty() => {
                Some(Self::Text(Cow::Borrowed(text)))
            }
            ResponsePart::Status(status) if !status.trim().is_empty() => {
                Some(Self::Text(Cow::Owned(format!("*{status}*"))))
            }
            ResponsePart::TextEditGroup(group) => {
                Some(Self::Deferred(DeferredBlock::TextEditGroup(group)))
            }
            ResponsePart::ToolInvocation(invocation) => {
                Some(Self::Deferred(DeferredBlock::ToolInvocation(invocation)))
            }
            ResponsePart::ProgressTask(task) => {
                Some(Self::Deferred(DeferredBlock::ProgressTask(task)))
            }
            ResponsePart::Text(_)
            | ResponsePart::Unknown(_)
            | ResponsePart::Status(_)
            | ResponsePart::Internal => None,
        }
    }

    /// Whether this node carries tool or edit detail that the consolidated
    /// round responses lack.
    pub(crate) const fn carries_detail(&self) -> bool {
        matches!(
            self,
            Self::Deferred(DeferredBlock::TextEditGroup(_) | DeferredBlock::ToolInvocation(_))
        )
    }
}

impl DeferredBlock<'_> {
    /// Renders the block. Malformed payloads render as an empty string.
    pub(crate) fn resolve(self, result: &TurnResult) -> String {
        match self {
            Self::TextEditGroup(Ok(group)) => format_text_edit_group(group),
            Self::ToolInvocation(Ok(invocation)) => format_tool_invocation(invocation, result),
            Self::ProgressTask(Ok(task)) => format_progress_task(task),
            Self::TextEditGroup(Err(_)) | Self::ToolInvocation(Err(_)) | Self::ProgressTask(Err(_)) => {
                String::new()
            }
        }
    }
}

/// Resolves and joins nodes into Markdown.
///
/// Consecutive text nodes are joined with newlines and cleaned as one run.
/// Runs and blocks are separated by a blank line; empty ones are dropped.
pub(crate) fn render_nodes(nodes: &[Node<'_>], result: &TurnResult) -> String {
    let mut pieces: Vec<String> = Vec::new();
    let mut run: Vec<&str> = Vec::new();

    for node in nodes {
        match node {
            Node::Text(text) => run.push(text),
            Node::Deferred(block) => {
                flush_text(&mut run, &mut pieces);
                let rendered = block.resolve(result);
                let rendered = rendered.trim_matches('\n');
                if !rendered.trim().is_empty() {
                    pieces.push(rendered.to_owned());
                }
            }
        }
    }
    flush_text(&mut run, &mut pieces);

    pieces.join("\n\n")
}

fn flush_text(run: &mut Vec<&str>, pieces: &mut Vec<String>) {
    if run.is_empty() {
        return;
    }
    let cleaned = clean_message(&run.join("\n"));
    run.clear();
    let cleaned = cleaned.trim_start_matches('\n');
    if !cleaned.is_empty() {
        pieces.push(cleaned.to_owned());
    }
}
