// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for chat2md.
//!
//! This binary provides the `chat2md` command for converting a GitHub Copilot
//! chat log from JSON to Markdown.

use chat2md::{parser, renderer};
use lexopt::prelude::*;
use snafu::prelude::*;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

struct Cli {
    input: PathBuf,
    output: PathBuf,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("input file '{}' not found", path.display()))]
    InputNotFound { path: PathBuf },

    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("invalid JSON in '{}': {source}", path.display()))]
    ParseFile {
        path: PathBuf,
        source: parser::ParseError,
    },

    #[snafu(display("failed to create output directory {}: {source}", path.display()))]
    CreateOutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn print_help() {
    println!(
        "\
{name} {version}
Convert a GitHub Copilot chat log to Markdown

Usage: {name} <INPUT> <OUTPUT>

Arguments:
  <INPUT>   Chat log JSON file
  <OUTPUT>  Markdown file to write

Options:
  -h, --help     Print help
  -V, --version  Print version",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
    );
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    let mut positional: Vec<PathBuf> = Vec::new();

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) if positional.len() < 2 => positional.push(val.parse()?),
            _ => return Err(arg.unexpected()),
        }
    }

    let mut positional = positional.into_iter();
    Ok(Cli {
        input: positional.next().ok_or("missing required argument: <INPUT>")?,
        output: positional.next().ok_or("missing required argument: <OUTPUT>")?,
    })
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Error> {
    let cli = parse_args().context(ParseArgsSnafu)?;
    convert(&cli.input, &cli.output)?;
    eprintln!(
        "Converted {} to {}",
        cli.input.display(),
        cli.output.display()
    );
    Ok(())
}

/// Reads, parses, and renders `input`, then writes the Markdown to `output`.
///
/// Nothing is written unless the whole document rendered.
fn convert(input: &Path, output: &Path) -> Result<(), Error> {
    let json = std::fs::read_to_string(input).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            Error::InputNotFound {
                path: input.to_path_buf(),
            }
        } else {
            Error::ReadFile {
                path: input.to_path_buf(),
                source,
            }
        }
    })?;
    let chat = parser::parse_chat(&json).context(ParseFileSnafu { path: input })?;

    let markdown = renderer::render_chat(&chat, &renderer::RenderOptions::default());

    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context(CreateOutputDirSnafu { path: parent })?;
    }
    std::fs::write(output, &markdown).context(WriteFileSnafu { path: output })?;

    Ok(())
}
