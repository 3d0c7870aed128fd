//! Rich-text surface: a markup subtree whose text is derived from it.
//!
//! Writes render one `<p>` per blank-line-delimited block and one `<br>` per
//! internal newline. Reads walk the markup back to text.

use super::{EditingSurface, SurfaceKind, SurfaceSnapshot};
use crate::log_debug;

const EMPTY_PARAGRAPH: &str = "<p><br></p>";
const BLOCK_TAGS: [&str; 2] = ["p", "div"];

/// Escape `& < > " '` for markup text.
#[must_use]
pub fn escape_markup(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Split on runs of two or more newlines.
fn split_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'\n' {
            let run_start = idx;
            while idx < bytes.len() && bytes[idx] == b'\n' {
                idx += 1;
            }
            if idx - run_start >= 2 {
                blocks.push(&text[start..run_start]);
                start = idx;
            }
            continue;
        }
        idx += 1;
    }
    blocks.push(&text[start..]);
    blocks
}

/// Render `value` as paragraph markup. Empty input yields one empty paragraph so
/// the caret still has a target.
#[must_use]
pub fn render_paragraph_markup(value: &str) -> String {
    let normalized = value.replace("\r\n", "\n");
    let mut markup = String::new();
    for block in split_blocks(&normalized) {
        let body = block
            .split('\n')
            .map(|line| {
                if line.is_empty() {
                    "<br>".to_string()
                } else {
                    escape_markup(line)
                }
            })
            .collect::<Vec<_>>()
            .join("<br>");
        markup.push_str("<p>");
        markup.push_str(&body);
        markup.push_str("</p>");
    }
    if markup.is_empty() {
        return EMPTY_PARAGRAPH.to_string();
    }
    markup
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "#39" | "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => None,
    }
}

fn tag_name(raw: &str) -> (bool, String) {
    let trimmed = raw.trim();
    let closing = trimmed.starts_with('/');
    let name = trimmed
        .trim_start_matches('/')
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase();
    (closing, name)
}

/// Text content of paragraph markup.
///
/// Blocks are separated by a blank line and `<br>` becomes a newline, except the
/// placeholder break that closes a block. Other tags are dropped.
#[must_use]
pub fn markup_to_text(markup: &str) -> String {
    let mut out = String::new();
    let mut pending_breaks = 0usize;
    let mut blocks_seen = 0usize;
    let mut chars = markup.char_indices().peekable();

    let flush = |out: &mut String, pending: &mut usize| {
        for _ in 0..*pending {
            out.push('\n');
        }
        *pending = 0;
    };

    while let Some((idx, ch)) = chars.next() {
        match ch {
            '<' => {
                let Some(close) = markup[idx..].find('>') else {
                    flush(&mut out, &mut pending_breaks);
                    out.push_str(&markup[idx..]);
                    break;
                };
                let (closing, name) = tag_name(&markup[idx + 1..idx + close]);
                while chars.peek().is_some_and(|(next, _)| *next <= idx + close) {
                    chars.next();
                }
                if name == "br" {
                    pending_breaks += 1;
                } else if BLOCK_TAGS.contains(&name.as_str()) {
                    if closing {
                        pending_breaks = pending_breaks.saturating_sub(1);
                        flush(&mut out, &mut pending_breaks);
                    } else {
                        flush(&mut out, &mut pending_breaks);
                        if blocks_seen > 0 {
                            out.push_str("\n\n");
                        }
                        blocks_seen += 1;
                    }
                }
            }
            '&' => {
                flush(&mut out, &mut pending_breaks);
                let rest = &markup[idx + 1..];
                let decoded = rest
                    .find(';')
                    .filter(|end| *end <= 6)
                    .and_then(|end| decode_entity(&rest[..end]).map(|ch| (ch, end)));
                match decoded {
                    Some((decoded, end)) => {
                        out.push(decoded);
                        for _ in 0..=end {
                            chars.next();
                        }
                    }
                    None => out.push('&'),
                }
            }
            other => {
                flush(&mut out, &mut pending_breaks);
                out.push(other);
            }
        }
    }
    flush(&mut out, &mut pending_breaks);
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichTextSurface {
    markup: String,
    caret_at_end: bool,
    attached: bool,
    preview_marker: bool,
    change_events: usize,
    tag: Option<String>,
}

impl RichTextSurface {
    /// Attached surface rendered from `text`.
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self::from_markup(render_paragraph_markup(text))
    }

    /// Attached surface holding host-authored `markup` verbatim.
    #[must_use]
    pub fn from_markup(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            caret_at_end: false,
            attached: true,
            preview_marker: false,
            change_events: 0,
            tag: None,
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn markup(&self) -> &str {
        &self.markup
    }

    #[must_use]
    pub fn caret_at_end(&self) -> bool {
        self.caret_at_end
    }

    #[must_use]
    pub fn change_events(&self) -> usize {
        self.change_events
    }

    pub(crate) fn detach(&mut self) {
        self.attached = false;
    }
}

impl EditingSurface for RichTextSurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::RichText
    }

    fn read(&self) -> String {
        markup_to_text(&self.markup)
    }

    fn write(&mut self, value: &str) {
        self.markup = render_paragraph_markup(value);
        self.move_caret_to_end();
    }

    fn move_caret_to_end(&mut self) {
        self.caret_at_end = true;
    }

    fn notify_changed(&mut self) {
        self.change_events += 1;
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn snapshot(&self) -> SurfaceSnapshot {
        SurfaceSnapshot::RichText {
            markup: self.markup.clone(),
        }
    }

    fn show_preview(&mut self, value: &str) {
        self.write(value);
    }

    fn restore(&mut self, snapshot: &SurfaceSnapshot) {
        match snapshot {
            SurfaceSnapshot::RichText { markup } => {
                self.markup.clone_from(markup);
                self.move_caret_to_end();
            }
            SurfaceSnapshot::Field { .. } => {
                log_debug("rich-text surface ignored a field snapshot");
            }
        }
    }

    fn set_preview_marker(&mut self, marked: bool) {
        self.preview_marker = marked;
    }

    fn has_preview_marker(&self) -> bool {
        self.preview_marker
    }

    fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }
}
