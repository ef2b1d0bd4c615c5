//! Section extraction for single-file components.
//!
//! A component source is a sequence of top-level blocks: exactly one `<template>`,
//! exactly one `<script>`, and at most one `<style>` and one `<i18n>`. The scanner is
//! a single pass over the source that only looks at top-level tags:
//!
//! - `script`, `style` and `i18n` hold raw text and end at the first matching close tag.
//! - `template` tracks nested `<template>` elements, so `<template v-if>` blocks inside
//!   the markup never close the section early.
//! - HTML comments are skipped, both at the top level and inside the template.
//! - `{{ ... }}` interpolations inside the template are opaque, so `a<b` in an
//!   expression is never read as a tag.
//! - Unknown top-level blocks are skipped.

/// Localization text used when a component has no `<i18n>` section.
pub const EMPTY_LOCALIZATION: &str = "{}";

/// Kind of a top-level section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Template,
    Script,
    Style,
    Localization,
}

impl SectionKind {
    /// All section kinds, in the order they are reported.
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Template,
        SectionKind::Script,
        SectionKind::Style,
        SectionKind::Localization,
    ];

    /// Tag name of the section.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Script => "script",
            Self::Style => "style",
            Self::Localization => "i18n",
        }
    }

    /// Look up a section kind by (lowercase) tag name.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    fn index(self) -> usize {
        self as usize
    }

    fn is_raw_text(self) -> bool {
        !matches!(self, Self::Template)
    }

    fn is_required(self) -> bool {
        matches!(self, Self::Template | Self::Script)
    }
}

/// The four logical sections of a component, whitespace-trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSections {
    /// Markup template
    pub template: String,

    /// Script block, including its `export default` wrapper
    pub script: String,

    /// Stylesheet, empty when the component has none
    pub style: String,

    /// Localization JSON text, `{}` when the component has none
    pub localization: String,
}

impl ComponentSections {
    /// Object members of the script block with the `export default { ... }` wrapper stripped.
    pub fn script_members(&self) -> Result<&str, SectionError> {
        strip_default_export(&self.script).ok_or(SectionError::MissingDefaultExport)
    }

    /// Whether the component declares a non-empty stylesheet.
    pub fn has_style(&self) -> bool {
        !self.style.is_empty()
    }
}

/// Errors raised for structurally invalid component sources.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SectionError {
    #[error("must contain exactly one <{tag}> root element, found {found}")]
    RequiredCount { tag: &'static str, found: usize },

    #[error("must contain no or one <{tag}> root element, found {found}")]
    OptionalCount { tag: &'static str, found: usize },

    #[error("unclosed <{tag}> element at byte {offset}")]
    Unclosed { tag: String, offset: usize },

    #[error("unterminated comment at byte {offset}")]
    UnterminatedComment { offset: usize },

    #[error("<script> section must be an `export default {{ ... }}` object")]
    MissingDefaultExport,
}

/// Split a component source into its sections.
pub fn extract_sections(source: &str) -> Result<ComponentSections, SectionError> {
    let found = collect_sections(source)?;

    for kind in SectionKind::ALL {
        let count = found[kind.index()].len();
        if kind.is_required() && count != 1 {
            return Err(SectionError::RequiredCount {
                tag: kind.tag(),
                found: count,
            });
        }
        if !kind.is_required() && count > 1 {
            return Err(SectionError::OptionalCount {
                tag: kind.tag(),
                found: count,
            });
        }
    }

    let single = |kind: SectionKind| found[kind.index()].first().map(|s| s.to_string());

    Ok(ComponentSections {
        template: single(SectionKind::Template).unwrap_or_default(),
        script: single(SectionKind::Script).unwrap_or_default(),
        style: single(SectionKind::Style).unwrap_or_default(),
        localization: single(SectionKind::Localization)
            .unwrap_or_else(|| EMPTY_LOCALIZATION.to_string()),
    })
}

/// Extract only the localization section, without requiring template or script.
pub fn extract_localization(source: &str) -> Result<String, SectionError> {
    let found = collect_sections(source)?;
    let sections = &found[SectionKind::Localization.index()];

    match sections.as_slice() {
        [] => Ok(EMPTY_LOCALIZATION.to_string()),
        [single] => Ok(single.to_string()),
        _ => Err(SectionError::OptionalCount {
            tag: SectionKind::Localization.tag(),
            found: sections.len(),
        }),
    }
}

/// Scan the source and group trimmed section contents by kind.
fn collect_sections(source: &str) -> Result<[Vec<&str>; 4], SectionError> {
    let mut found: [Vec<&str>; 4] = Default::default();

    for block in scan_blocks(source)? {
        if let Some(kind) = SectionKind::from_tag(&block.tag) {
            found[kind.index()].push(block.content.trim());
        }
    }

    Ok(found)
}

/// A top-level element.
#[derive(Debug)]
struct Block<'a> {
    tag: String,
    content: &'a str,
}

/// A parsed opening tag.
#[derive(Debug)]
struct OpenTag {
    /// Lowercase tag name
    name: String,
    /// Byte offset just past the closing `>`
    end: usize,
    self_closing: bool,
}

fn scan_blocks(source: &str) -> Result<Vec<Block<'_>>, SectionError> {
    // ASCII lowercasing keeps byte offsets identical to `source`.
    let lower = source.to_ascii_lowercase();
    let mut blocks = Vec::new();
    let mut pos = 0;

    while let Some(rel) = source[pos..].find('<') {
        let start = pos + rel;

        if source[start..].starts_with("<!--") {
            pos = skip_comment(source, start)?;
            continue;
        }

        let Some(open) = parse_open_tag(source, start) else {
            pos = start + 1;
            continue;
        };

        if open.self_closing {
            pos = open.end;
            blocks.push(Block {
                tag: open.name,
                content: "",
            });
            continue;
        }

        let raw_text = SectionKind::from_tag(&open.name).is_some_and(|k| k.is_raw_text());
        let close = if raw_text {
            find_raw_close(&lower, &open.name, open.end)
        } else {
            find_nested_close(source, &lower, &open.name, open.end)?
        };

        let Some((content_end, after_close)) = close else {
            return Err(SectionError::Unclosed {
                tag: open.name,
                offset: start,
            });
        };

        blocks.push(Block {
            content: &source[open.end..content_end],
            tag: open.name,
        });
        pos = after_close;
    }

    Ok(blocks)
}

/// Parse an opening tag at `start` (which points at `<`).
fn parse_open_tag(source: &str, start: usize) -> Option<OpenTag> {
    let bytes = source.as_bytes();
    let name_start = start + 1;

    if !bytes.get(name_start)?.is_ascii_alphabetic() {
        return None;
    }

    let mut i = name_start;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }

    match bytes.get(i) {
        Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/' => {}
        _ => return None,
    }

    let close = find_tag_end(bytes, i)?;
    let self_closing = close > i && bytes[close - 1] == b'/';

    Some(OpenTag {
        name: source[name_start..i].to_ascii_lowercase(),
        end: close + 1,
        self_closing,
    })
}

/// Find the `>` that ends a tag, ignoring any inside quoted attribute values.
fn find_tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;

    for (offset, &b) in bytes[from..].iter().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(from + offset),
            None => {}
        }
    }

    None
}

/// If a close tag `</name>` starts at `at`, return the offset just past it.
fn close_tag_end(lower: &str, at: usize, name: &str) -> Option<usize> {
    let rest = lower[at..].strip_prefix("</")?.strip_prefix(name)?;
    let ws = rest.bytes().take_while(|b| b.is_ascii_whitespace()).count();

    if rest.as_bytes().get(ws) == Some(&b'>') {
        Some(lower.len() - rest.len() + ws + 1)
    } else {
        None
    }
}

/// Find the close tag of a raw-text element. Returns `(content_end, after_close)`.
fn find_raw_close(lower: &str, name: &str, from: usize) -> Option<(usize, usize)> {
    let needle = format!("</{name}");
    let mut pos = from;

    while let Some(rel) = lower[pos..].find(&needle) {
        let at = pos + rel;
        if let Some(end) = close_tag_end(lower, at, name) {
            return Some((at, end));
        }
        pos = at + 1;
    }

    None
}

/// Find the close tag of an element that may contain nested elements of the same name.
fn find_nested_close(
    source: &str,
    lower: &str,
    name: &str,
    from: usize,
) -> Result<Option<(usize, usize)>, SectionError> {
    let close_needle = format!("</{name}");
    let mut depth = 1usize;
    let mut pos = from;

    while let Some(rel) = source[pos..].find(|c: char| c == '<' || c == '{') {
        let at = pos + rel;

        if source[at..].starts_with('{') {
            pos = if source[at..].starts_with("{{") {
                skip_interpolation(source, lower, &close_needle, at)
            } else {
                at + 1
            };
            continue;
        }

        if source[at..].starts_with("<!--") {
            pos = skip_comment(source, at)?;
            continue;
        }

        if let Some(end) = close_tag_end(lower, at, name) {
            depth -= 1;
            if depth == 0 {
                return Ok(Some((at, end)));
            }
            pos = end;
            continue;
        }

        // A tag never spans a close tag of the enclosing element; `a<b` is text.
        if let Some(open) = parse_open_tag(source, at)
            .filter(|open| !lower[at..open.end].contains(&close_needle))
        {
            if open.name == name && !open.self_closing {
                depth += 1;
            }
            pos = open.end;
            continue;
        }

        pos = at + 1;
    }

    Ok(None)
}

/// Skip a `{{ ... }}` interpolation starting at `at`, returning the offset just past `}}`.
///
/// An interpolation is opaque expression text. Braces that are not closed before the
/// next close tag of the enclosing element are plain text.
fn skip_interpolation(source: &str, lower: &str, close_needle: &str, at: usize) -> usize {
    let body = at + 2;
    match source[body..].find("}}") {
        Some(rel) if !lower[body..body + rel].contains(close_needle) => body + rel + 2,
        _ => body,
    }
}

/// Skip an HTML comment starting at `at`, returning the offset just past `-->`.
fn skip_comment(source: &str, at: usize) -> Result<usize, SectionError> {
    source[at + 4..]
        .find("-->")
        .map(|rel| at + 4 + rel + 3)
        .ok_or(SectionError::UnterminatedComment { offset: at })
}

/// Strip `export default { ... }` from a script block, returning the trimmed members.
fn strip_default_export(script: &str) -> Option<&str> {
    let rest = script.trim().strip_prefix("export")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start().strip_prefix("default")?;
    let rest = rest.trim_start().strip_prefix('{')?;
    let rest = rest.trim_end();
    let rest = rest.strip_suffix(';').unwrap_or(rest).trim_end();
    let body = rest.strip_suffix('}')?;

    Some(body.trim())
}
