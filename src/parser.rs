// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! JSON parsing for GitHub Copilot chat logs.
//!
//! This module decodes the JSON document that Copilot writes for a chat
//! session. The format has no published schema and its records change shape
//! between releases, so most structures are read by navigating a
//! [`serde_json::Value`] and falling back to defaults when a field is absent
//! or has an unexpected type.
//!
//! # Format Overview
//!
//! A chat log contains:
//! - The display names of the participant and the assistant
//! - A list of requests, each pairing a user message with a response
//! - Per request: attached variables, response parts, and a result carrying
//!   timings, error details, and the tool-call rounds and results that the
//!   renderer uses to recover tool output
//!
//! Response parts are classified into the closed [`ResponsePart`] enum.
//! Tool invocations, progress tasks, and text-edit groups keep their typed
//! payload so they can be rendered once the whole turn is known.
//!
//! # Example
//!
//! ```
//! use chat2md::parser::{parse_chat, ResponsePart};
//!
//! let json = r#"{
//!     "requesterUsername": "octocat",
//!     "responderUsername": "GitHub Copilot",
//!     "requests": [{
//!         "message": { "text": "Hello" },
//!         "response": [{ "value": "Hi there!" }]
//!     }]
//! }"#;
//!
//! let chat = parse_chat(json).unwrap();
//! assert_eq!(chat.requests.len(), 1);
//! assert_eq!(chat.requests[0].response[0], ResponsePart::Text("Hi there!".into()));
//! ```

use crate::markdown::{is_only_code_fences, looks_like_object_dump};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use snafu::prelude::*;
use std::collections::HashMap;
use std::path::Path;

/// Response part kinds that carry no user-visible content.
const INTERNAL_KINDS: &[&str] = &[
    "inlineReference",
    "undoStop",
    "codeblockUri",
    "prepareToolInvocation",
];

/// Fields checked, in order, for a status message on parts of other kinds.
const STATUS_FIELDS: &[&str] = &["content", "invocationMessage", "pastTenseMessage"];

/// Error type for JSON parsing failures.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// Failed to parse JSON content.
    #[snafu(display("failed to parse JSON: {source}"))]
    Json {
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },
}

/// The root structure of a Copilot chat log.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatLog {
    /// The display name of the human participant (defaults to "User").
    pub requester_username: String,

    /// The display name of the assistant (defaults to "GitHub Copilot").
    pub responder_username: String,

    /// The conversation turns, in order.
    pub requests: Vec<Turn>,
}

/// One user message and the assistant's response to it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Turn {
    /// Unix timestamp in milliseconds when the request was made.
    pub timestamp: Option<i64>,

    /// The model identifier (e.g., "copilot/gpt-4o").
    pub model_id: Option<String>,

    /// Free-form model details shown next to the model identifier.
    pub details: Option<String>,

    /// The user's message.
    pub message: Message,

    /// Variables (files, prompt files, tools) attached to the request.
    pub variables: Vec<Variable>,

    /// The classified parts of the assistant's response.
    pub response: Vec<ResponsePart>,

    /// The request outcome: errors, timings, and tool-call tables.
    pub result: TurnResult,
}

/// A user message, stored either as one text or as a list of parts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    /// The `text` field, when present.
    pub text: Option<String>,

    /// The `text` of each entry in `parts`, used when `text` is absent.
    pub parts: Vec<String>,
}

impl Message {
    /// Returns the full message text.
    #[must_use]
    pub fn full_text(&self) -> String {
        self.text.clone().unwrap_or_else(|| self.parts.concat())
    }

    /// Returns the text used for a short preview of the message.
    ///
    /// This is the `text` field, or the first part when only parts exist.
    #[must_use]
    pub fn preview(&self) -> &str {
        self.text
            .as_deref()
            .or_else(|| self.parts.first().map(String::as_str))
            .unwrap_or_default()
    }
}

/// A variable attached to a request as a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// The variable name (e.g., "file:main.rs" or "prompt:review.prompt.md").
    pub name: String,

    /// The variable kind (e.g., "file", "promptFile").
    pub kind: Option<String>,

    /// Where the variable came from, for prompt files a settings label.
    pub origin_label: Option<String>,
}

/// The outcome of a request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TurnResult {
    /// Error details when the request failed.
    pub error: Option<ErrorDetails>,

    /// Total elapsed time in milliseconds.
    pub elapsed_ms: Option<f64>,

    /// The rounds of tool calls made while producing the response.
    pub tool_call_rounds: Vec<ToolCallRound>,

    /// Tool call results keyed by tool call identifier.
    pub tool_call_results: HashMap<String, ToolCallResult>,
}

impl TurnResult {
    /// Returns the response text accumulated across the tool-call rounds.
    ///
    /// Each round's non-blank response is trimmed, and the pieces are joined
    /// with newlines.
    #[must_use]
    pub fn consolidated_response(&self) -> String {
        self.tool_call_rounds
            .iter()
            .filter_map(|round| round.response.as_deref())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Details of a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetails {
    /// The error message shown to the user.
    pub message: String,
}

/// One round of model output and the tool calls it requested.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolCallRound {
    /// The model's text response for this round.
    pub response: Option<String>,

    /// The tool calls requested in this round.
    pub tool_calls: Vec<ToolCall>,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    /// Opaque identifier, the key into [`TurnResult::tool_call_results`].
    pub id: String,

    /// The tool name (e.g., "`read_file`").
    pub name: String,

    /// The arguments as a JSON-encoded string.
    pub arguments: Option<String>,
}

/// The result of a tool call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolCallResult {
    /// The result content: a list of arbitrarily nested node trees.
    pub content: Vec<Value>,
}

/// A classified element of an assistant response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePart {
    /// Human-readable Markdown text.
    Text(String),

    /// A status message of an otherwise unrecognized kind.
    Status(String),

    /// A tool invocation performed by the assistant.
    ToolInvocation(Deferred<ToolInvocation>),

    /// A progress task that completed during the response.
    ProgressTask(Deferred<ProgressTask>),

    /// A group of text edits applied to one file.
    TextEditGroup(Deferred<TextEditGroup>),

    /// Internal metadata with nothing to show.
    Internal,

    /// An unrecognized record, kept as compact JSON.
    Unknown(String),
}

/// A structured payload, or the reason it could not be read.
pub type Deferred<T> = Result<T, MalformedPart>;

/// A response part whose payload did not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedPart {
    /// The `kind` of the part.
    pub kind: &'static str,

    /// Why the payload was rejected.
    pub reason: String,
}

/// A Markdown string wrapper, as in `{ "value": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MarkdownText {
    /// The Markdown text.
    #[serde(default)]
    pub value: Option<String>,
}

/// A message that is either a plain string or a [`MarkdownText`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MessageText {
    /// A plain string.
    Plain(String),
    /// A Markdown string wrapper.
    Markdown(MarkdownText),
}

/// A serialized tool invocation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    /// Present-tense description (e.g., "Reading [](file:///src/main.rs)").
    #[serde(default)]
    pub invocation_message: Option<MessageText>,

    /// Past-tense description (e.g., "Read main.rs").
    #[serde(default)]
    pub past_tense_message: Option<MarkdownText>,

    /// Declared input and output of the tool, when the tool reports them.
    #[serde(default)]
    pub result_details: Option<Value>,
}

impl ToolInvocation {
    /// Returns the message describing the invocation.
    ///
    /// Prefers the invocation message, then the past-tense message, and
    /// finally "Ran tool".
    #[must_use]
    pub fn message(&self) -> &str {
        let past_tense = self
            .past_tense_message
            .as_ref()
            .map_or("Ran tool", |m| m.value.as_deref().unwrap_or("Ran tool"));

        let invocation = match &self.invocation_message {
            None => "",
            Some(MessageText::Plain(text)) => text,
            Some(MessageText::Markdown(m)) => m.value.as_deref().unwrap_or("Ran tool"),
        };

        if invocation.is_empty() {
            past_tense
        } else {
            invocation
        }
    }
}

/// A serialized progress task.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProgressTask {
    /// The task description.
    #[serde(default)]
    pub content: Option<MarkdownText>,
}

/// A group of edits applied to one file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TextEditGroup {
    /// The edited file.
    #[serde(default)]
    pub uri: Option<FileUri>,

    /// Edits, nested as a list of batches.
    ///
    /// Batches that are not lists and entries that are not edits are
    /// skipped.
    #[serde(default, deserialize_with = "deserialize_edit_batches")]
    pub edits: Vec<Vec<TextEdit>>,
}

impl TextEditGroup {
    /// Returns the file's base name, or "Unknown file".
    #[must_use]
    pub fn file_name(&self) -> &str {
        let path = self
            .uri
            .as_ref()
            .and_then(|uri| {
                uri.fs_path
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .or(uri.path.as_deref())
            })
            .unwrap_or_default();

        Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("Unknown file")
    }

    /// Returns the edits that carry non-blank text, in order.
    pub fn edits(&self) -> impl Iterator<Item = &TextEdit> {
        self.edits
            .iter()
            .flatten()
            .filter(|edit| !edit.text().trim().is_empty())
    }
}

/// A file location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUri {
    /// The platform file-system path.
    #[serde(default)]
    pub fs_path: Option<String>,

    /// The URI path.
    #[serde(default)]
    pub path: Option<String>,
}

/// A single replacement of a line range.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TextEdit {
    /// The replacement text.
    #[serde(default)]
    pub text: Option<String>,

    /// The replaced line range.
    #[serde(default)]
    pub range: Option<LineRange>,
}

impl TextEdit {
    /// Returns the replacement text, or an empty string.
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    /// Returns the first replaced line, or 0 when unknown.
    #[must_use]
    pub fn start_line(&self) -> u32 {
        self.range
            .as_ref()
            .and_then(|r| r.start_line_number)
            .unwrap_or(0)
    }

    /// Returns the last replaced line, falling back to the start line.
    #[must_use]
    pub fn end_line(&self) -> u32 {
        self.range
            .as_ref()
            .and_then(|r| r.end_line_number)
            .unwrap_or_else(|| self.start_line())
    }

    /// Returns the `(start, end)` lines when the range is fully known.
    #[must_use]
    pub fn line_span(&self) -> Option<(u32, u32)> {
        let range = self.range.as_ref()?;
        match (range.start_line_number?, range.end_line_number?) {
            (0, _) | (_, 0) => None,
            span => Some(span),
        }
    }
}

/// A 1-indexed line range.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRange {
    /// First line of the range.
    #[serde(default)]
    pub start_line_number: Option<u32>,

    /// Last line of the range.
    #[serde(default)]
    pub end_line_number: Option<u32>,
}

impl ResponsePart {
    /// Classifies one raw response record.
    ///
    /// Known deferred kinds keep their typed payload, internal kinds and
    /// records carrying internal identifiers are elided, and human text is
    /// taken from `value`, `content`, or `content.value`. Anything else falls
    /// back to its JSON text, or is elided when empty.
    #[must_use]
    pub fn classify(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::classify_scalar(value);
        };

        if let Some(kind) = object.get("kind") {
            match kind.as_str() {
                Some("textEditGroup") => {
                    return Self::TextEditGroup(deferred("textEditGroup", value));
                }
                Some("toolInvocationSerialized") => {
                    return Self::ToolInvocation(deferred("toolInvocationSerialized", value));
                }
                Some("progressTaskSerialized") => {
                    return Self::ProgressTask(deferred("progressTaskSerialized", value));
                }
                Some(kind) if INTERNAL_KINDS.contains(&kind) => return Self::Internal,
                _ => {}
            }

            if let Some(status) = STATUS_FIELDS
                .iter()
                .find_map(|field| object.get(*field)?.as_object()?.get("value"))
            {
                return Self::Status(display_value(status));
            }
        }

        if object.contains_key("$mid")
            || object.contains_key("inlineReference")
            || (object.contains_key("id") && object.contains_key("kind"))
        {
            return Self::Internal;
        }

        if let Some(text) = object.get("value") {
            return match text.as_str() {
                Some(text)
                    if (text.contains('{') && text.contains("$mid"))
                        || is_only_code_fences(text) =>
                {
                    Self::Internal
                }
                Some(text) => Self::Text(text.to_owned()),
                None => Self::Internal,
            };
        }

        if let Some(content) = object.get("content") {
            let text = content
                .as_str()
                .or_else(|| content.get("value").and_then(Value::as_str));
            if let Some(text) = text {
                return Self::Text(text.to_owned());
            }
        }

        if object.is_empty() {
            Self::Internal
        } else {
            Self::Unknown(value.to_string())
        }
    }

    fn classify_scalar(value: &Value) -> Self {
        match value {
            Value::String(text) if text.is_empty() || looks_like_object_dump(text) => {
                Self::Internal
            }
            Value::String(text) => Self::Text(text.clone()),
            Value::Number(n) => Self::Text(n.to_string()),
            Value::Bool(true) => Self::Text("true".to_owned()),
            Value::Array(items) if !items.is_empty() => Self::Unknown(value.to_string()),
            _ => Self::Internal,
        }
    }
}

impl<'de> Deserialize<'de> for ResponsePart {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::classify(&value))
    }
}

impl<'de> Deserialize<'de> for ChatLog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;

        if !value.is_object() {
            return Err(serde::de::Error::custom(
                "expected a chat log object at the top level",
            ));
        }

        let requests = value
            .get("requests")
            .and_then(Value::as_array)
            .map(|requests| requests.iter().map(Turn::from_value).collect())
            .unwrap_or_default();

        Ok(Self {
            requester_username: get_string(&value, &["requesterUsername"])
                .unwrap_or_else(|| "User".to_owned()),
            responder_username: get_string(&value, &["responderUsername"])
                .unwrap_or_else(|| "GitHub Copilot".to_owned()),
            requests,
        })
    }
}

impl<'de> Deserialize<'de> for Turn {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

impl Turn {
    /// Reads a turn from a raw request record.
    ///
    /// Missing or mistyped fields fall back to empty values.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let response = value
            .get("response")
            .and_then(Value::as_array)
            .map(|parts| parts.iter().map(ResponsePart::classify).collect())
            .unwrap_or_default();

        Self {
            timestamp: value.get("timestamp").and_then(Value::as_i64),
            model_id: get_string(value, &["modelId"]).filter(|s| !s.is_empty()),
            details: get_string(value, &["details"]).filter(|s| !s.is_empty()),
            message: extract_message(value),
            variables: extract_variables(value),
            response,
            result: value.get("result").map(extract_result).unwrap_or_default(),
        }
    }
}

/// Reads a typed payload from a deferred response part.
fn deferred<T: DeserializeOwned>(kind: &'static str, value: &Value) -> Deferred<T> {
    T::deserialize(value).map_err(|source| MalformedPart {
        kind,
        reason: source.to_string(),
    })
}

fn deserialize_edit_batches<'de, D>(deserializer: D) -> Result<Vec<Vec<TextEdit>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;

    Ok(value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_array)
        .map(|batch| {
            batch
                .iter()
                .filter(|edit| edit.is_object())
                .filter_map(|edit| TextEdit::deserialize(edit).ok())
                .collect()
        })
        .collect())
}

/// Renders a JSON value as display text, leaving strings unquoted.
fn display_value(value: &Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_string(), str::to_owned)
}

/// Extracts the user message from `message.text` or `message.parts`.
fn extract_message(value: &Value) -> Message {
    let Some(message) = value.get("message") else {
        return Message::default();
    };

    let parts = message
        .get("parts")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|part| get_string(part, &["text"]))
        .collect();

    Message {
        text: get_string(message, &["text"]),
        parts,
    }
}

/// Extracts attached variables from the variableData.variables array.
fn extract_variables(value: &Value) -> Vec<Variable> {
    value
        .get("variableData")
        .and_then(|v| v.get("variables"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .map(|var| Variable {
            name: get_string(var, &["name"]).unwrap_or_else(|| "Unknown".to_owned()),
            kind: get_string(var, &["kind"]),
            origin_label: get_string(var, &["originLabel"]).filter(|s| !s.is_empty()),
        })
        .collect()
}

/// Extracts errors, timings, and tool-call tables from a request result.
fn extract_result(result: &Value) -> TurnResult {
    let error = get_str(result, &["errorDetails", "message"])
        .filter(|message| !message.is_empty())
        .map(|message| ErrorDetails {
            message: message.to_owned(),
        });

    let elapsed_ms = result
        .get("timings")
        .and_then(|t| t.get("totalElapsed"))
        .and_then(Value::as_f64);

    let metadata = result.get("metadata");

    let tool_call_rounds = metadata
        .and_then(|m| m.get("toolCallRounds"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|round| round.is_object())
        .map(|round| ToolCallRound {
            response: get_string(round, &["response"]),
            tool_calls: round
                .get("toolCalls")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter(|call| call.is_object())
                .map(|call| ToolCall {
                    id: get_string(call, &["id"]).unwrap_or_default(),
                    name: get_string(call, &["name"]).unwrap_or_default(),
                    arguments: get_string(call, &["arguments"]),
                })
                .collect(),
        })
        .collect();

    let tool_call_results = metadata
        .and_then(|m| m.get("toolCallResults"))
        .and_then(Value::as_object)
        .into_iter()
        .flatten()
        .map(|(id, result)| {
            let content = result
                .get("content")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            (id.clone(), ToolCallResult { content })
        })
        .collect();

    TurnResult {
        error,
        elapsed_ms,
        tool_call_rounds,
        tool_call_results,
    }
}

/// Navigates a JSON path and returns the string value at the end.
///
/// # Arguments
///
/// * `value` - The root JSON value to navigate from
/// * `path` - A sequence of keys to follow through the JSON structure
fn get_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    current.as_str()
}

/// Like [`get_str`] but returns an owned `String`.
fn get_string(value: &Value, path: &[&str]) -> Option<String> {
    get_str(value, path).map(str::to_owned)
}

/// Parses a JSON string into a [`ChatLog`] structure.
///
/// This is the main entry point for parsing Copilot chat logs.
///
/// # Arguments
///
/// * `json_str` - The raw JSON content of a chat log file
///
/// # Errors
///
/// Returns an error if the JSON is malformed or its top level is not an
/// object. Missing or differently shaped fields inside the object are not
/// errors.
///
/// # Example
///
/// ```
/// use chat2md::parser::parse_chat;
///
/// let chat = parse_chat(r#"{ "requests": [] }"#).unwrap();
/// assert_eq!(chat.requester_username, "User");
/// assert_eq!(chat.responder_username, "GitHub Copilot");
/// ```
pub fn parse_chat(json_str: &str) -> Result<ChatLog, ParseError> {
    serde_json::from_str(json_str).context(JsonSnafu)
}
