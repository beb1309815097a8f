// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Rendering of tool invocations and progress tasks.
//!
//! Copilot records a tool invocation in the response stream with only a
//! human-readable message. The tool's actual output lives in the request
//! result, keyed by a tool-call identifier that the invocation does not
//! carry. The output is therefore recovered by matching the invocation
//! message against the arguments of the recorded tool calls. The match is a
//! best-effort heuristic: when it fails, the invocation's own declared input
//! and output are shown instead, and failing that a bare completion line.

use crate::markdown::{fenced, language_for_extension};
use crate::parser::{ProgressTask, ToolCallResult, ToolInvocation, TurnResult};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// A markdown link with an empty label pointing at a file URI.
static FILE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\]\(file://([^)]+)\)").expect("valid file link regex"));

/// The first file extension in a message.
static FILE_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(\w+)").expect("valid file extension regex"));

/// Ties a tool to the argument that identifies what it worked on.
struct ResultMatcher {
    /// The tool name recorded in the tool-call rounds.
    tool: &'static str,
    /// A word the invocation message must contain.
    verb: &'static str,
    /// The argument whose value must appear in the invocation message.
    argument: &'static str,
}

const RESULT_MATCHERS: &[ResultMatcher] = &[ResultMatcher {
    tool: "read_file",
    verb: "Read",
    argument: "filePath",
}];

/// Renders a tool invocation as a collapsible block.
pub(crate) fn format_tool_invocation(invocation: &ToolInvocation, result: &TurnResult) -> String {
    let message = invocation.message();
    let summary = display_message(message);

    if let Some(output) = recover_output(message, result) {
        let lang = if output.contains("```") {
            ""
        } else {
            language_for_message(message).unwrap_or_default()
        };
        return format!(
            "<details>\n  <summary>{summary}</summary>\n\n{}\n\n</details>",
            fenced(output.trim_end(), lang)
        );
    }

    format_declared_io(&summary, invocation.result_details.as_ref())
}

/// Renders a completed progress task as a checkmark line.
pub(crate) fn format_progress_task(task: &ProgressTask) -> String {
    task.content
        .as_ref()
        .and_then(|content| content.value.as_deref())
        .filter(|value| !value.is_empty())
        .map(|value| format!("✔️ {value}"))
        .unwrap_or_default()
}

/// Rewrites file links in a tool message into a readable summary.
///
/// `Reading [](file:///src/main.rs), lines 1 to 20` becomes
/// `Read **main.rs**, lines 1 to 20`.
fn display_message(message: &str) -> String {
    let message = match FILE_LINK.captures(message) {
        Some(caps) => {
            let path = &caps[1];
            let name = path.rsplit('/').next().unwrap_or(path);
            let rest = caps
                .get(0)
                .map_or("", |link| &message[link.end()..]);
            if rest.trim().is_empty() {
                format!("Read **{name}**")
            } else {
                format!("Read **{name}**{rest}")
            }
        }
        None => message.to_owned(),
    };
    message.replace("Reading ", "Read ")
}

/// Returns the syntax label for the file a tool message refers to.
fn language_for_message(message: &str) -> Option<&'static str> {
    if !message.contains("file://") {
        return None;
    }
    let caps = FILE_EXTENSION.captures(message)?;
    language_for_extension(&caps[1])
}

/// Finds the recorded output of the tool call behind an invocation message.
fn recover_output(message: &str, result: &TurnResult) -> Option<String> {
    if result.tool_call_results.is_empty() {
        return None;
    }

    result
        .tool_call_rounds
        .iter()
        .flat_map(|round| &round.tool_calls)
        .find_map(|call| {
            let matcher = RESULT_MATCHERS
                .iter()
                .find(|m| m.tool == call.name && message.contains(m.verb))?;
            let arguments: Value = serde_json::from_str(call.arguments.as_deref()?).ok()?;
            let target = arguments.get(matcher.argument)?.as_str()?;
            if target.is_empty() || !message.contains(target) {
                return None;
            }
            let output = extract_text(result.tool_call_results.get(&call.id)?);
            (!output.trim().is_empty()).then_some(output)
        })
}

/// Concatenates the text nodes of a tool result.
///
/// A result that is one fenced block as a whole is unwrapped, since the
/// caller fences it again.
fn extract_text(result: &ToolCallResult) -> String {
    let mut pieces = Vec::new();
    for node in &result.content {
        collect_text(node, &mut pieces);
    }
    let text = pieces.concat();
    let text = text.trim();

    if text.starts_with("```") && text.ends_with("```") {
        let lines: Vec<&str> = text.split('\n').collect();
        if let [first, inner @ .., last] = lines.as_slice()
            && first.trim().starts_with("```")
            && last.trim() == "```"
        {
            return inner.join("\n");
        }
    }

    text.to_owned()
}

fn collect_text<'a>(node: &'a Value, pieces: &mut Vec<&'a str>) {
    match node {
        Value::Object(map) => {
            if let Some(text) = map.get("text").and_then(Value::as_str)
                && !text.trim().is_empty()
            {
                pieces.push(text);
            }
            if let Some(Value::Array(children)) = map.get("children") {
                for child in children {
                    collect_text(child, pieces);
                }
            }
            if let Some(value @ Value::Object(_)) = map.get("value") {
                collect_text(value, pieces);
            }
            if let Some(inner) = map.get("node") {
                collect_text(inner, pieces);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_text(item, pieces);
            }
        }
        _ => {}
    }
}

/// Renders the input and output a tool declared about itself.
fn format_declared_io(summary: &str, details: Option<&Value>) -> String {
    let details = details.and_then(Value::as_object);
    let Some(input) = details
        .and_then(|d| d.get("input"))
        .filter(|input| !is_empty_value(input))
    else {
        return format!("<details>\n  <summary>{summary}</summary>\n  <p>Completed</p>\n</details>");
    };

    let input = match input {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(parsed) => parsed,
            Err(_) => {
                return format!(
                    "<details>\n  <summary>{summary}</summary>\n  <p>Completed with input: {raw}</p>\n</details>"
                );
            }
        },
        other => other.clone(),
    };
    let pretty = serde_json::to_string_pretty(&input).unwrap_or_else(|_| input.to_string());

    let mut out = format!(
        "<details>\n  <summary>{summary}</summary>\n  <p>Input</p>\n\n{}\n",
        fenced(&pretty, "json")
    );

    if let Some(first) = details
        .and_then(|d| d.get("output"))
        .and_then(Value::as_array)
        .and_then(|output| output.first())
    {
        let value = match first {
            Value::Object(map) => map.get("value").map(display_value).unwrap_or_default(),
            other => display_value(other),
        };
        out.push_str(&format!("\n  <p>Output</p>\n\n{}\n", fenced(&value, "json")));
    }

    out.push_str("\n</details>");
    out
}

fn display_value(value: &Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_string(), str::to_owned)
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
