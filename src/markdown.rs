// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Markdown building blocks shared by the renderers.

use crate::parser::{ErrorDetails, Variable};

/// Syntax labels for fenced code blocks, keyed by file extension.
const LANGUAGES: &[(&str, &str)] = &[
    ("md", "markdown"),
    ("py", "python"),
    ("js", "javascript"),
    ("json", "json"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("html", "html"),
    ("css", "css"),
    ("sh", "bash"),
    ("txt", "text"),
];

/// Settings namespace that prompt-file origin labels refer to.
const SETTINGS_NAMESPACE: &str = "github.copilot.chat.";

/// Returns the syntax label for a file extension (without the dot).
pub(crate) fn language_for_extension(ext: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, label)| *label)
}

/// Returns a backtick fence longer than any backtick run in `content`.
///
/// The fence is never shorter than three backticks.
pub(crate) fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in content.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

/// Wraps `content` in a fenced code block with an optional language label.
pub(crate) fn fenced(content: &str, lang: &str) -> String {
    let fence = fence_for(content);
    format!("{fence}{lang}\n{content}\n{fence}")
}

/// Returns `true` if the string contains only code fence markers and whitespace.
///
/// These are streaming artifacts from the Copilot response that shouldn't
/// appear in rendered output.
pub(crate) fn is_only_code_fences(s: &str) -> bool {
    s.lines().all(|line| {
        let trimmed = line.trim();
        trimmed.is_empty() || trimmed == "```"
    })
}

/// Returns `true` if a line looks like a serialized internal object.
pub(crate) fn looks_like_object_dump(s: &str) -> bool {
    s.contains('{') && (s.contains("$mid") || s.contains("kind"))
}

/// Cleans response or message text for display.
///
/// Drops lines that look like serialized internal objects, forces a line
/// break between consecutive ✅ bullets (some renderers merge lines that
/// start with an emoji), strips trailing whitespace, and collapses blank
/// lines.
pub(crate) fn clean_message(text: &str) -> String {
    let mut lines = Vec::new();
    let mut prev_checkmark = false;

    for line in text.lines().filter(|line| !looks_like_object_dump(line)) {
        let checkmark = line.trim_start().starts_with('✅');
        let line = line.trim_end();
        if checkmark && prev_checkmark {
            lines.push(format!("<br>{line}"));
        } else {
            lines.push(line.to_owned());
        }
        prev_checkmark = checkmark;
    }

    collapse_blank_lines(&lines.join("\n"))
}

/// Collapses runs of blank lines into one and drops trailing blank lines.
pub(crate) fn collapse_blank_lines(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut prev_blank = false;

    for line in text.lines() {
        let blank = line.trim().is_empty();
        if blank && prev_blank {
            continue;
        }
        lines.push(if blank { "" } else { line });
        prev_blank = blank;
    }

    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

/// Renders the variables attached to a request as a collapsible list.
///
/// Prompt files whose origin label names a Copilot setting get an extra
/// line for that setting, and the summary counts every emitted line.
pub(crate) fn format_references(variables: &[Variable]) -> String {
    if variables.is_empty() {
        return String::new();
    }

    let mut entries = Vec::new();
    for var in variables {
        match var.name.strip_prefix("prompt:") {
            Some(name) => entries.push(format!("☰ {name}")),
            None => entries.push(format!("📄 {}", var.name)),
        }

        if var.kind.as_deref() == Some("promptFile")
            && let Some(label) = var.origin_label.as_deref()
            && let Some((_, setting)) = label.rsplit_once(SETTINGS_NAMESPACE)
        {
            let setting = setting.split(' ').next().unwrap_or_default();
            entries.push(format!("⚙️ {SETTINGS_NAMESPACE}{setting}"));
        }
    }

    format!(
        "<details>\n  <summary>Used {} references</summary>\n  <p>{}</p>\n</details>",
        entries.len(),
        entries.join("<br>")
    )
}

/// Renders error details as a blockquote, the first line marked with 🚫.
pub(crate) fn format_error(details: &ErrorDetails) -> String {
    details
        .message
        .trim()
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let line = line.trim();
            match (i, line.is_empty()) {
                (_, true) => None,
                (0, false) => Some(format!("> 🚫 {line}")),
                (_, false) => Some(format!("> {line}")),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(name: &str, kind: &str, origin_label: Option<&str>) -> Variable {
        Variable {
            name: name.into(),
            kind: Some(kind.into()),
            origin_label: origin_label.map(Into::into),
        }
    }

    #[test]
    fn maps_known_extensions() {
        assert_eq!(language_for_extension("md"), Some("markdown"));
        assert_eq!(language_for_extension("yml"), Some("yaml"));
        assert_eq!(language_for_extension("sh"), Some("bash"));
        assert_eq!(language_for_extension("rs"), None);
        assert_eq!(language_for_extension(""), None);
    }

    #[test]
    fn fence_defaults_to_three_backticks() {
        assert_eq!(fence_for("plain"), "```");
        assert_eq!(fence_for("inline `code`"), "```");
    }

    #[test]
    fn fence_outgrows_nested_fences() {
        assert_eq!(fence_for("```rust\nfn main() {}\n```"), "````");
        assert_eq!(fence_for("````\nnested\n````"), "`````");
    }

    #[test]
    fn fenced_keeps_inner_fences_intact() {
        let content = "Example:\n```python\nprint('hi')\n```";
        let block = fenced(content, "markdown");

        assert_eq!(block, format!("````markdown\n{content}\n````"));
    }

    #[test]
    fn detects_code_fence_only() {
        assert!(is_only_code_fences("```"));
        assert!(is_only_code_fences("```\n```"));
        assert!(is_only_code_fences("  ```  "));
        assert!(is_only_code_fences("\n```\n\n```\n"));
    }

    #[test]
    fn detects_non_code_fence_content() {
        assert!(!is_only_code_fences("```rust\nfn main() {}\n```"));
        assert!(!is_only_code_fences("some text"));
        assert!(!is_only_code_fences("``` more"));
    }

    #[test]
    fn detects_object_dumps() {
        assert!(looks_like_object_dump(r#"{"$mid": 1}"#));
        assert!(looks_like_object_dump("{ kind: 'markdownContent' }"));
        assert!(!looks_like_object_dump("fn main() {}"));
        assert!(!looks_like_object_dump("what kind of thing"));
    }

    #[test]
    fn clean_message_strips_object_dumps() {
        let text = "Before\n{\"$mid\":1,\"path\":\"/a\"}\nAfter";
        assert_eq!(clean_message(text), "Before\nAfter");
    }

    #[test]
    fn clean_message_breaks_consecutive_checkmarks() {
        let text = "Done:\n✅ first\n✅ second\n  ✅ third";
        assert_eq!(
            clean_message(text),
            "Done:\n✅ first\n<br>✅ second\n<br>  ✅ third"
        );
    }

    #[test]
    fn clean_message_collapses_and_trims() {
        let text = "one   \n\n\n\ntwo\n   \n\nthree\n\n\n";
        assert_eq!(clean_message(text), "one\n\ntwo\n\nthree");
    }

    #[test]
    fn collapse_blank_lines_is_idempotent() {
        let samples = [
            "a\n\n\n\nb",
            "\n\n\nleading",
            "trailing\n \n\t\n",
            "mixed\n  \n\n x \n\n\n\ny",
            "",
        ];
        for sample in samples {
            let once = collapse_blank_lines(sample);
            assert_eq!(collapse_blank_lines(&once), once, "sample {sample:?}");
        }
    }

    #[test]
    fn references_use_icons_and_strip_prefix() {
        let block = format_references(&[
            variable("file:main.rs", "file", None),
            variable("prompt:review.prompt.md", "promptFile", None),
        ]);

        assert!(block.starts_with("<details>\n  <summary>Used 2 references</summary>"));
        assert!(block.contains("📄 file:main.rs<br>☰ review.prompt.md"));
        assert!(block.ends_with("</details>"));
    }

    #[test]
    fn references_count_setting_lines() {
        let block = format_references(&[
            variable("file:main.rs", "file", None),
            variable(
                "prompt:review.prompt.md",
                "promptFile",
                Some("github.copilot.chat.reviewSelection.instructions setting"),
            ),
            variable("file:lib.rs", "file", None),
        ]);

        assert!(block.contains("Used 4 references"));
        assert!(block.contains("⚙️ github.copilot.chat.reviewSelection.instructions"));
        assert_eq!(block.matches("<br>").count(), 3);
    }

    #[test]
    fn references_ignore_unrelated_origin_labels() {
        let block = format_references(&[variable(
            "prompt:local.prompt.md",
            "promptFile",
            Some("workspace prompt"),
        )]);

        assert!(block.contains("<summary>Used 1 references</summary>"));
        assert!(!block.contains("⚙️"));
    }

    #[test]
    fn references_empty_for_no_variables() {
        assert_eq!(format_references(&[]), "");
    }

    #[test]
    fn formats_error_blockquote() {
        let details = ErrorDetails {
            message: "  Request failed.\n\n   Please retry later.  \n".into(),
        };
        assert_eq!(
            format_error(&details),
            "> 🚫 Request failed.\n> Please retry later."
        );
    }
}
