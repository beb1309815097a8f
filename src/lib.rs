// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Convert GitHub Copilot chat logs to Markdown.
//!
//! This crate provides parsing and rendering functionality for transforming
//! the JSON chat logs that GitHub Copilot writes into readable, navigable
//! Markdown documents.
//!
//! # Overview
//!
//! GitHub Copilot stores chat conversations as JSON files. This crate:
//!
//! 1. Parses the JSON structure into typed Rust representations, classifying
//!    every response part into a closed set of kinds
//! 2. Renders the conversations as Markdown with a table of contents,
//!    per-request navigation, and collapsible blocks for references, tool
//!    output, and file edits
//!
//! # Example
//!
//! ```no_run
//! use chat2md::{parser, renderer};
//!
//! let json = std::fs::read_to_string("chat.json").unwrap();
//! let chat = parser::parse_chat(&json).unwrap();
//!
//! let opts = renderer::RenderOptions {
//!     show_timestamps: true,
//!     ..Default::default()
//! };
//!
//! let markdown = renderer::render_chat(&chat, &opts);
//! println!("{markdown}");
//! ```
//!
//! # Modules
//!
//! - [`parser`]: JSON parsing and type definitions for Copilot chat logs
//! - [`renderer`]: Markdown generation with configurable output options

#![deny(missing_docs)]

mod edits;
mod fragment;
mod markdown;
pub mod parser;
pub mod renderer;
mod tools;
