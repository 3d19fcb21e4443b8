//! Output rendering.
//!
//! Transforms a recognition result into one of the supported output
//! representations. Formatting only wraps content: it never truncates,
//! reorders, or substitutes any character of the plain-text rendering.

use crate::engine::RecognitionResult;
use crate::error::OcrError;

/// User-facing message for a recognition run that found no text.
/// Returned verbatim in every format; it is not recognized content, so it
/// is never wrapped in markup.
pub const NO_TEXT_DETECTED: &str = "No text detected.";

/// Output representation selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Trimmed segments joined by newlines
    #[default]
    Plain,
    /// Structured markup: HTML with syntactically significant characters
    /// escaped so the text round-trips losslessly
    Html,
    /// Lightweight markup: paragraphs separated by blank lines, line
    /// breaks otherwise preserved
    Markdown,
}

impl OutputFormat {
    /// Parse a selector string from a request.
    pub fn parse(s: &str) -> Result<Self, OcrError> {
        match s.to_lowercase().as_str() {
            "plain" | "text" => Ok(Self::Plain),
            "html" => Ok(Self::Html),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(OcrError::Format(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Html => "html",
            Self::Markdown => "markdown",
        }
    }

    /// Render a recognition result in this representation.
    pub fn render(&self, result: &RecognitionResult) -> String {
        match self {
            Self::Plain => render_plain(result),
            Self::Html => render_html(result),
            Self::Markdown => render_markdown(result),
        }
    }
}

/// Segments joined by newlines in emitted order, each trimmed.
fn render_plain(result: &RecognitionResult) -> String {
    result
        .segments
        .iter()
        .map(|s| s.text.trim())
        .collect::<Vec<_>>()
        .join("\n")
}

/// The plain rendering wrapped in `<pre>` with HTML-significant characters
/// escaped. Stripping the wrapper and unescaping reproduces the plain
/// rendering exactly.
fn render_html(result: &RecognitionResult) -> String {
    format!("<pre>{}</pre>", escape_html(&render_plain(result)))
}

/// Paragraphs separated by blank lines; line breaks within a paragraph are
/// preserved. Empty segments act as paragraph boundaries.
fn render_markdown(result: &RecognitionResult) -> String {
    let mut paragraphs: Vec<Vec<&str>> = vec![Vec::new()];
    for segment in &result.segments {
        let line = segment.text.trim();
        if line.is_empty() {
            if !paragraphs.last().map(Vec::is_empty).unwrap_or(true) {
                paragraphs.push(Vec::new());
            }
        } else {
            paragraphs.last_mut().expect("non-empty").push(line);
        }
    }

    paragraphs
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| p.join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
