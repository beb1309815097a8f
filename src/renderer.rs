// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Markdown rendering for parsed Copilot chat logs.
//!
//! This module transforms a [`ChatLog`] into a navigable Markdown document.
//!
//! # Output Format
//!
//! The rendered Markdown includes:
//! - A `# GitHub Copilot Chat Log` heading with the participant names
//! - A table of contents when the log has more than one request
//! - One `## Request N` section per turn, with links back to the contents
//!   and to the neighbouring requests
//! - `### Participant` and `### Assistant` subsections
//! - Collapsible `<details>` blocks for references, tool invocations, and
//!   file edits
//! - A metadata blockquote with the response time and model
//!
//! # Example
//!
//! ```
//! use chat2md::parser::{ChatLog, Message, ResponsePart, Turn};
//! use chat2md::renderer::{render_chat, RenderOptions};
//!
//! let chat = ChatLog {
//!     requester_username: "octocat".into(),
//!     responder_username: "GitHub Copilot".into(),
//!     requests: vec![Turn {
//!         message: Message {
//!             text: Some("Hello!".into()),
//!             parts: vec![],
//!         },
//!         response: vec![ResponsePart::Text("Hi there!".into())],
//!         ..Turn::default()
//!     }],
//! };
//!
//! let markdown = render_chat(&chat, &RenderOptions::default());
//!
//! assert!(markdown.starts_with("# GitHub Copilot Chat Log"));
//! assert!(markdown.contains("Hello!"));
//! assert!(markdown.contains("Hi there!"));
//! ```

use crate::fragment::{Node, render_nodes};
use crate::markdown::{clean_message, format_error, format_references};
use crate::parser::{ChatLog, Turn};
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// Anchor of the table of contents.
const CONTENTS_ANCHOR: &str = "table-of-contents";

/// Configuration options for Markdown rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Whether to include the request time in each turn's metadata.
    ///
    /// Times are shown in UTC.
    pub show_timestamps: bool,

    /// Maximum length, in characters, of a message preview in the table of
    /// contents. Longer previews are cut and end with "...".
    pub preview_width: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_timestamps: false,
            preview_width: 80,
        }
    }
}

/// Renders a parsed chat log as Markdown.
///
/// This is the main entry point for rendering. The document consists of a
/// header, a table of contents when there is more than one turn, and one
/// section per turn separated by horizontal rules.
///
/// # Arguments
///
/// * `chat` - The parsed chat log to render
/// * `opts` - Configuration options controlling the output format
///
/// # Returns
///
/// A `String` containing the complete Markdown document, ending in a single
/// newline.
#[must_use]
pub fn render_chat(chat: &ChatLog, opts: &RenderOptions) -> String {
    let mut out = String::new();
    render_header(&mut out, chat);

    let total = chat.requests.len();
    if total > 1 {
        render_contents(&mut out, chat, opts);
    }
    if total > 0 {
        writeln!(out, "---\n").unwrap();
    }

    for (i, turn) in chat.requests.iter().enumerate() {
        render_turn(&mut out, turn, i + 1, total, opts);
        if i + 1 < total {
            writeln!(out, "---\n").unwrap();
        }
    }

    out.truncate(out.trim_end().len());
    out.push('\n');
    out
}

fn render_header(out: &mut String, chat: &ChatLog) {
    writeln!(out, "# GitHub Copilot Chat Log\n").unwrap();
    writeln!(out, "**Participant:** {}", chat.requester_username).unwrap();
    writeln!(out, "<br>**Assistant:** {}\n", chat.responder_username).unwrap();
}

fn render_contents(out: &mut String, chat: &ChatLog, opts: &RenderOptions) {
    writeln!(out, "<a name=\"{CONTENTS_ANCHOR}\"></a>").unwrap();
    writeln!(out, "## Table of Contents\n").unwrap();
    for (i, turn) in chat.requests.iter().enumerate() {
        let n = i + 1;
        writeln!(
            out,
            "- [Request {n}](#{}): {}",
            turn_anchor(n),
            preview(turn.message.preview(), opts.preview_width)
        )
        .unwrap();
    }
    out.push('\n');
}

fn render_turn(out: &mut String, turn: &Turn, n: usize, total: usize, opts: &RenderOptions) {
    let prev = if n > 1 {
        format!("[<](#{})", turn_anchor(n - 1))
    } else {
        "<".to_owned()
    };
    let next = if n < total {
        format!("[>](#{})", turn_anchor(n + 1))
    } else {
        ">".to_owned()
    };

    writeln!(out, "<a name=\"{}\"></a>", turn_anchor(n)).unwrap();
    writeln!(out, "## Request {n} [^](#{CONTENTS_ANCHOR}) {prev} {next}\n").unwrap();

    let message = clean_message(&turn.message.full_text());
    if !message.trim().is_empty() {
        writeln!(out, "### Participant\n").unwrap();
        writeln!(out, "{message}\n").unwrap();
    }

    if !turn.response.is_empty() || turn.result.error.is_some() {
        writeln!(out, "### Assistant\n").unwrap();

        let references = format_references(&turn.variables);
        if !references.is_empty() {
            writeln!(out, "{references}\n").unwrap();
        }

        let response = render_response(turn);
        if !response.trim().is_empty() {
            writeln!(out, "{response}\n").unwrap();
        }

        if let Some(error) = &turn.result.error {
            let error = format_error(error);
            if !error.is_empty() {
                writeln!(out, "{error}\n").unwrap();
            }
        }
    }

    let metadata = metadata_lines(turn, opts);
    if !metadata.is_empty() {
        for (i, line) in metadata.iter().enumerate() {
            let prefix = if i == 0 { "> " } else { "> <br>" };
            writeln!(out, "{prefix}{line}").unwrap();
        }
        out.push('\n');
    }
}

/// Renders the assistant's response content.
///
/// The round responses recorded alongside the tool calls form a cleaner
/// transcript than the incremental response stream, so they are preferred,
/// unless the stream carries tool or edit detail they lack.
fn render_response(turn: &Turn) -> String {
    if turn.response.is_empty() {
        return String::new();
    }

    let nodes: Vec<Node> = turn.response.iter().filter_map(Node::from_part).collect();
    let consolidated = turn.result.consolidated_response();

    if consolidated.trim().is_empty() || nodes.iter().any(Node::carries_detail) {
        render_nodes(&nodes, &turn.result)
    } else {
        clean_message(&consolidated)
    }
}

fn metadata_lines(turn: &Turn, opts: &RenderOptions) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(elapsed_ms) = turn.result.elapsed_ms {
        lines.push(format!("*Response time: {:.2} seconds*", elapsed_ms / 1000.0));
    }

    if let Some(model) = model_info(turn) {
        lines.push(format!("*Model: {model}*"));
    }

    if opts.show_timestamps
        && let Some(time) = turn.timestamp.and_then(DateTime::<Utc>::from_timestamp_millis)
    {
        lines.push(format!(
            "*Requested: {}*",
            time.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }

    lines
}

/// Returns the model identifier without its `copilot/` prefix, followed by
/// the model details when they add something.
fn model_info(turn: &Turn) -> Option<String> {
    let model = turn
        .model_id
        .as_deref()
        .map(|id| id.strip_prefix("copilot/").unwrap_or(id));
    let details = turn.details.as_deref().filter(|d| Some(*d) != model);

    match (model, details) {
        (Some(model), Some(details)) => Some(format!("{model} • {details}")),
        (Some(only), None) | (None, Some(only)) => Some(only.to_owned()),
        (None, None) => None,
    }
}

fn turn_anchor(n: usize) -> String {
    format!("request-{n}")
}

/// Returns the first line of a message, shortened to `width` characters.
fn preview(message: &str, width: usize) -> String {
    if message.is_empty() {
        return "[No message content]".to_owned();
    }

    let first_line = message.split('\n').next().unwrap_or_default();
    if first_line.chars().count() > width {
        let cut: String = first_line.chars().take(width.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        first_line.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{
        ErrorDetails, Message, ResponsePart, ToolCallRound, ToolInvocation, TurnResult, Variable,
    };

    fn make_chat(requests: Vec<Turn>) -> ChatLog {
        ChatLog {
            requester_username: "octocat".into(),
            responder_username: "GitHub Copilot".into(),
            requests,
        }
    }

    fn make_turn(message: &str, response: Vec<ResponsePart>) -> Turn {
        Turn {
            timestamp: Some(1_733_356_800_000), // 2024-12-05 00:00:00 UTC
            model_id: Some("copilot/claude-sonnet-4".into()),
            message: Message {
                text: Some(message.into()),
                parts: vec![],
            },
            response,
            ..Turn::default()
        }
    }

    fn text(s: &str) -> ResponsePart {
        ResponsePart::Text(s.into())
    }

    fn default_opts() -> RenderOptions {
        RenderOptions::default()
    }

    fn tool(message: &str) -> ResponsePart {
        ResponsePart::ToolInvocation(Ok(ToolInvocation {
            invocation_message: Some(crate::parser::MessageText::Plain(message.into())),
            past_tense_message: None,
            result_details: None,
        }))
    }

    fn with_rounds(mut turn: Turn, responses: &[&str]) -> Turn {
        turn.result.tool_call_rounds = responses
            .iter()
            .map(|r| ToolCallRound {
                response: Some((*r).into()),
                tool_calls: vec![],
            })
            .collect();
        turn
    }

    #[test]
    fn renders_header_with_names() {
        let output = render_chat(&make_chat(vec![]), &default_opts());

        assert!(output.starts_with("# GitHub Copilot Chat Log\n\n"));
        assert!(output.contains("**Participant:** octocat\n"));
        assert!(output.contains("<br>**Assistant:** GitHub Copilot\n"));
    }

    #[test]
    fn zero_turns_have_no_contents_or_separators() {
        let output = render_chat(&make_chat(vec![]), &default_opts());

        assert!(!output.contains("Table of Contents"));
        assert!(!output.contains("---"));
        assert!(!output.contains("## Request"));
    }

    #[test]
    fn single_turn_has_no_contents() {
        let output = render_chat(&make_chat(vec![make_turn("Hi", vec![])]), &default_opts());

        assert!(!output.contains("Table of Contents"));
        assert!(output.contains("<a name=\"request-1\"></a>\n## Request 1 [^](#table-of-contents) < >\n"));
        assert_eq!(output.matches("---").count(), 1);
    }

    #[test]
    fn contents_link_every_turn() {
        let turns = (1..=3).map(|i| make_turn(&format!("Question {i}"), vec![])).collect();
        let output = render_chat(&make_chat(turns), &default_opts());

        assert!(output.contains("<a name=\"table-of-contents\"></a>\n## Table of Contents\n"));
        assert_eq!(output.matches("- [Request ").count(), 3);
        for i in 1..=3 {
            assert!(output.contains(&format!("- [Request {i}](#request-{i}): Question {i}\n")));
            assert!(output.contains(&format!("<a name=\"request-{i}\"></a>")));
        }
    }

    #[test]
    fn navigation_links_disable_ends() {
        let turns = (1..=3).map(|i| make_turn(&format!("Q{i}"), vec![])).collect();
        let output = render_chat(&make_chat(turns), &default_opts());

        assert!(output.contains("## Request 1 [^](#table-of-contents) < [>](#request-2)\n"));
        assert!(output.contains("## Request 2 [^](#table-of-contents) [<](#request-1) [>](#request-3)\n"));
        assert!(output.contains("## Request 3 [^](#table-of-contents) [<](#request-2) >\n"));
    }

    #[test]
    fn separators_follow_all_but_last_turn() {
        let turns = (1..=3).map(|i| make_turn(&format!("Q{i}"), vec![])).collect();
        let output = render_chat(&make_chat(turns), &default_opts());

        // One after the header, then one between each pair of turns.
        assert_eq!(output.matches("\n---\n").count(), 3);
        assert!(!output.trim_end().ends_with("---"));
        assert!(output.ends_with('\n') && !output.ends_with("\n\n"));
    }

    #[test]
    fn previews_first_line_and_truncates() {
        assert_eq!(preview("first\nsecond", 80), "first");
        assert_eq!(preview("", 80), "[No message content]");

        let long = "x".repeat(81);
        let cut = preview(&long, 80);
        assert_eq!(cut.chars().count(), 80);
        assert!(cut.ends_with("..."));

        assert_eq!(preview(&"é".repeat(80), 80), "é".repeat(80));
    }

    #[test]
    fn omits_participant_section_for_empty_message() {
        let output = render_chat(
            &make_chat(vec![make_turn("", vec![text("Answer")])]),
            &default_opts(),
        );

        assert!(!output.contains("### Participant"));
        assert!(output.contains("### Assistant\n\nAnswer\n"));
    }

    #[test]
    fn omits_assistant_section_without_response_or_error() {
        let output = render_chat(&make_chat(vec![make_turn("Hi", vec![])]), &default_opts());

        assert!(output.contains("### Participant\n\nHi\n"));
        assert!(!output.contains("### Assistant"));
    }

    #[test]
    fn renders_response_and_error_together() {
        let mut turn = make_turn("Hi", vec![text("Partial answer")]);
        turn.result.error = Some(ErrorDetails {
            message: "Response was cut off.".into(),
        });
        let output = render_chat(&make_chat(vec![turn]), &default_opts());

        let answer = output.find("Partial answer").unwrap();
        let error = output.find("> 🚫 Response was cut off.").unwrap();
        assert!(answer < error);
    }

    #[test]
    fn renders_error_without_response() {
        let mut turn = make_turn("Hi", vec![]);
        turn.result.error = Some(ErrorDetails {
            message: "Quota exceeded".into(),
        });
        let output = render_chat(&make_chat(vec![turn]), &default_opts());

        assert!(output.contains("### Assistant\n\n> 🚫 Quota exceeded\n"));
    }

    #[test]
    fn renders_references_before_response() {
        let mut turn = make_turn("Hi", vec![text("Answer")]);
        turn.variables = vec![Variable {
            name: "file:main.rs".into(),
            kind: Some("file".into()),
            origin_label: None,
        }];
        let output = render_chat(&make_chat(vec![turn]), &default_opts());

        assert!(output.contains("<summary>Used 1 references</summary>"));
        assert!(output.find("</details>").unwrap() < output.find("Answer").unwrap());
    }

    #[test]
    fn prefers_consolidated_round_responses() {
        let turn = with_rounds(
            make_turn("Hi", vec![text("stream fragment")]),
            &["Round one.", "Round two."],
        );
        let output = render_chat(&make_chat(vec![turn]), &default_opts());

        assert!(output.contains("Round one.\nRound two."));
        assert!(!output.contains("stream fragment"));
    }

    #[test]
    fn uses_stream_when_it_carries_tool_detail() {
        let turn = with_rounds(
            make_turn("Hi", vec![text("Looking."), tool("Searched for tests")]),
            &["Round one."],
        );
        let output = render_chat(&make_chat(vec![turn]), &default_opts());

        assert!(output.contains("Looking.\n\n<details>\n  <summary>Searched for tests</summary>"));
        assert!(!output.contains("Round one."));
    }

    #[test]
    fn renders_metadata_lines() {
        let mut turn = make_turn("Hi", vec![]);
        turn.result.elapsed_ms = Some(12_346.0);
        turn.details = Some("Claude Sonnet 4 • 1x".into());
        let output = render_chat(&make_chat(vec![turn]), &default_opts());

        assert!(output.contains(
            "> *Response time: 12.35 seconds*\n> <br>*Model: claude-sonnet-4 • Claude Sonnet 4 • 1x*\n"
        ));
    }

    #[test]
    fn model_line_stands_alone_without_timing() {
        let output = render_chat(&make_chat(vec![make_turn("Hi", vec![])]), &default_opts());
        assert!(output.contains("\n> *Model: claude-sonnet-4*\n"));
    }

    #[test]
    fn model_details_equal_to_model_are_not_repeated() {
        let mut turn = make_turn("Hi", vec![]);
        turn.details = Some("claude-sonnet-4".into());
        assert_eq!(model_info(&turn).as_deref(), Some("claude-sonnet-4"));

        turn.model_id = None;
        assert_eq!(model_info(&turn).as_deref(), Some("claude-sonnet-4"));
    }

    #[test]
    fn renders_timestamp_when_enabled() {
        let opts = RenderOptions {
            show_timestamps: true,
            ..RenderOptions::default()
        };
        let output = render_chat(&make_chat(vec![make_turn("Hi", vec![])]), &opts);

        assert!(output.contains("> <br>*Requested: 2024-12-05 00:00:00 UTC*"));
        assert!(!render_chat(&make_chat(vec![make_turn("Hi", vec![])]), &default_opts())
            .contains("Requested:"));
    }

    #[test]
    fn cleans_participant_message() {
        let output = render_chat(
            &make_chat(vec![make_turn("Plan:\n✅ one\n✅ two\n\n\n\nThanks", vec![])]),
            &default_opts(),
        );

        assert!(output.contains("Plan:\n✅ one\n<br>✅ two\n\nThanks\n"));
    }

    #[test]
    fn empty_turn_result_renders_nothing_extra() {
        let turn = Turn {
            result: TurnResult::default(),
            ..Turn::default()
        };
        let output = render_chat(&make_chat(vec![turn]), &default_opts());

        assert!(output.ends_with("## Request 1 [^](#table-of-contents) < >\n"));
    }
}
