//! Message renderer: response markup to display segments
//!
//! Markup is tokenized in three layers, always in this order:
//!
//! 1. Links `[label](url)`
//! 2. Bold spans `**text**` (non-greedy)
//! 3. Citation markers `[n]`, resolved against the response's citation list
//!
//! Text consumed by an earlier layer is never re-scanned by a later one, so
//! `[Form 2](url)` or `**[2]**` never yields a marker.
//!
//! Rendering never fails. A marker whose id has no citation becomes an
//! unresolved [`DisplaySegment::CitationMarker`].

use civic_domain::{Citation, Message, Response, Role};
use regex::Regex;
use std::fmt::Write;
use std::sync::LazyLock;

static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]*)\)").expect("link pattern"));

static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern"));

static MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(\d+)\]").expect("marker pattern"));

/// One renderable unit of response text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplaySegment {
    /// Unformatted text
    PlainText(String),

    /// Emphasized text
    Bold(String),

    /// Inline hyperlink
    Link {
        /// Visible text
        label: String,
        /// Target
        url: String,
    },

    /// Numeric citation marker
    CitationMarker {
        /// Marker number as written
        id: u32,
        /// Matching citation, if the response lists one
        resolved: Option<Citation>,
    },
}

impl DisplaySegment {
    /// Source label of a resolved marker
    pub fn resolved_source(&self) -> Option<&str> {
        match self {
            DisplaySegment::CitationMarker {
                resolved: Some(citation),
                ..
            } => Some(&citation.source),
            _ => None,
        }
    }

    /// False only for a marker with no matching citation
    pub fn is_resolved(&self) -> bool {
        !matches!(self, DisplaySegment::CitationMarker { resolved: None, .. })
    }
}

/// Tokenize a response into display segments
///
/// # Examples
///
/// ```
/// use civic_assistant::{render, DisplaySegment};
/// use civic_domain::{Citation, Response};
///
/// let response = Response::new(
///     "Gather **W-2s** [1].",
///     vec![Citation::new(1, "IRS Checklist", "https://www.irs.gov")],
/// );
/// let segments = render(&response);
///
/// assert_eq!(segments[1], DisplaySegment::Bold("W-2s".to_string()));
/// assert_eq!(segments[3].resolved_source(), Some("IRS Checklist"));
/// ```
pub fn render(response: &Response) -> Vec<DisplaySegment> {
    let mut segments = Vec::new();
    let text = response.text.as_str();
    let mut last = 0;

    for caps in LINK.captures_iter(text) {
        let (Some(whole), Some(label), Some(url)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        split_bold(&text[last..whole.start()], response, &mut segments);
        segments.push(DisplaySegment::Link {
            label: label.as_str().to_string(),
            url: url.as_str().to_string(),
        });
        last = whole.end();
    }
    split_bold(&text[last..], response, &mut segments);

    segments
}

fn split_bold(text: &str, response: &Response, segments: &mut Vec<DisplaySegment>) {
    let mut last = 0;
    for caps in BOLD.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        split_markers(&text[last..whole.start()], response, segments);
        segments.push(DisplaySegment::Bold(inner.as_str().to_string()));
        last = whole.end();
    }
    split_markers(&text[last..], response, segments);
}

fn split_markers(text: &str, response: &Response, segments: &mut Vec<DisplaySegment>) {
    let mut last = 0;
    for caps in MARKER.captures_iter(text) {
        let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        // Non-canonical digits (leading zeros, overflow, non-ASCII) stay plain
        let Some(id) = canonical_id(digits.as_str()) else {
            continue;
        };
        push_plain(&text[last..whole.start()], segments);
        segments.push(DisplaySegment::CitationMarker {
            id,
            resolved: response.citation(id).cloned(),
        });
        last = whole.end();
    }
    push_plain(&text[last..], segments);
}

fn canonical_id(digits: &str) -> Option<u32> {
    let id = digits.parse::<u32>().ok()?;
    (id.to_string() == digits).then_some(id)
}

fn push_plain(text: &str, segments: &mut Vec<DisplaySegment>) {
    if !text.is_empty() {
        segments.push(DisplaySegment::PlainText(text.to_string()));
    }
}

/// Render a stored message
///
/// Assistant messages carrying a response are tokenized; anything else is a
/// single plain segment, so user input is never read as markup.
pub fn render_message(message: &Message) -> Vec<DisplaySegment> {
    match (&message.role, &message.data) {
        (Role::Assistant, Some(response)) => render(response),
        _ if message.content.is_empty() => Vec::new(),
        _ => vec![DisplaySegment::PlainText(message.content.clone())],
    }
}

/// Re-encode segments as markup; inverse of [`render`]
pub fn to_markup(segments: &[DisplaySegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            DisplaySegment::PlainText(text) => out.push_str(text),
            DisplaySegment::Bold(text) => {
                let _ = write!(out, "**{}**", text);
            }
            DisplaySegment::Link { label, url } => {
                let _ = write!(out, "[{}]({})", label, url);
            }
            DisplaySegment::CitationMarker { id, .. } => {
                let _ = write!(out, "[{}]", id);
            }
        }
    }
    out
}

/// Plain-text projection: bold and links reduced to their text, markers to `[id]`
pub fn plain_text(segments: &[DisplaySegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            DisplaySegment::PlainText(text) | DisplaySegment::Bold(text) => out.push_str(text),
            DisplaySegment::Link { label, .. } => out.push_str(label),
            DisplaySegment::CitationMarker { id, .. } => {
                let _ = write!(out, "[{}]", id);
            }
        }
    }
    out
}

/// Marker ids in the response text with no matching citation, in order of appearance
pub fn unresolved_markers(response: &Response) -> Vec<u32> {
    let mut ids = Vec::new();
    for segment in render(response) {
        if let DisplaySegment::CitationMarker { id, resolved: None } = segment {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}
