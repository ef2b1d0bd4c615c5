//! Structured model of a compiled render artifact.
//!
//! The template compiler emits a module of the shape:
//!
//! ```js
//! import { toDisplayString as _toDisplayString, openBlock as _openBlock } from "vue"
//!
//! const _hoisted_1 = { class: "box" }
//!
//! export function render(_ctx, _cache) {
//!   return (_openBlock(), ...)
//! }
//! ```
//!
//! The artifact is split on two markers (`from "vue"` and `export function render`)
//! into the import list, the constant declarations and the render function. Code is
//! then tokenized into plain text and underscore-prefixed identifiers, which are the
//! only places later rewriting may touch. Identifiers inside string literals, regular
//! expression literals, comments, and property accesses (`_ctx._foo`) stay plain text.

use std::sync::LazyLock;

use regex::Regex;

/// Marker ending the import line.
pub const IMPORT_MARKER: &str = "from \"vue\"";

/// Marker starting the render function declaration.
pub const RENDER_MARKER: &str = "export function render";

const DECLARATION_KEYWORDS: [&str; 4] = ["const ", "let ", "var ", "function "];

/// Keywords after which `/` starts a regular expression literal.
const REGEX_KEYWORDS: [&[u8]; 7] = [b"return", b"typeof", b"case", b"in", b"of", b"void", b"throw"];

/// A runtime API function imported by the render artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Exported name (e.g., `toDisplayString`)
    pub imported: String,

    /// Local alias used in the code (e.g., `_toDisplayString`)
    pub local: String,
}

/// A piece of code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Code copied through unchanged
    Text(String),
    /// Underscore-prefixed identifier, a substitution point
    Ident(String),
}

/// Code split into text and substitution points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeFragment {
    segments: Vec<Segment>,
}

impl CodeFragment {
    /// Tokenize JavaScript code.
    pub fn parse(code: &str) -> Self {
        let bytes = code.as_bytes();
        let mut segments = Vec::new();
        let mut text_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'"' | b'\'' | b'`' => i = skip_string(bytes, i),
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    i = code[i..].find('\n').map_or(bytes.len(), |rel| i + rel);
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i = code[i + 2..].find("*/").map_or(bytes.len(), |rel| i + 2 + rel + 2);
                }
                b'/' if starts_regex(bytes, i) => i = skip_regex(bytes, i),
                b if b.is_ascii_digit() => {
                    while i < bytes.len() && is_ident_char(bytes[i]) {
                        i += 1;
                    }
                }
                b if is_ident_start(b) => {
                    let start = i;
                    while i < bytes.len() && is_ident_char(bytes[i]) {
                        i += 1;
                    }

                    let word = &code[start..i];
                    if word.len() > 1 && word.starts_with('_') && !is_property_access(bytes, start)
                    {
                        if text_start < start {
                            segments.push(Segment::Text(code[text_start..start].to_string()));
                        }
                        segments.push(Segment::Ident(word.to_string()));
                        text_start = i;
                    }
                }
                _ => i += 1,
            }
        }

        if text_start < bytes.len() {
            segments.push(Segment::Text(code[text_start..].to_string()));
        }

        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Substitution points in order of appearance.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Ident(name) => Some(name.as_str()),
            Segment::Text(_) => None,
        })
    }

    /// Render back to code, replacing identifiers for which `substitute` returns a value.
    pub fn render(&self, mut substitute: impl FnMut(&str) -> Option<String>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Ident(name) => match substitute(name) {
                    Some(replacement) => out.push_str(&replacement),
                    None => out.push_str(name),
                },
            }
        }
        out
    }

    /// The code without any substitution.
    pub fn source(&self) -> String {
        self.render(|_| None)
    }
}

/// A top-level constant declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Declared name, when the statement declares one
    pub name: Option<String>,

    pub code: CodeFragment,
}

/// A render artifact split into imports, constants and the render function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderArtifact {
    pub imports: Vec<ImportSpec>,

    /// Declarations between the import line and the render function, in order
    pub constants: Vec<Declaration>,

    /// The render function as an object method (`render(_ctx, _cache) { ... }`)
    pub render: CodeFragment,
}

/// Errors that can occur when parsing a render artifact.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArtifactError {
    #[error("render artifact has no `export function render` declaration")]
    MissingRender,

    #[error("malformed import line: {0}")]
    MalformedImport(String),
}

impl RenderArtifact {
    /// Parse the text emitted by the template compiler.
    pub fn parse(code: &str) -> Result<Self, ArtifactError> {
        let render_at = code.find(RENDER_MARKER).ok_or(ArtifactError::MissingRender)?;
        let head = &code[..render_at];
        let render_src = format!("render{}", code[render_at + RENDER_MARKER.len()..].trim_end());

        let (imports, constants_src) = match head.find(IMPORT_MARKER) {
            Some(at) => (
                parse_imports(&head[..at])?,
                &head[at + IMPORT_MARKER.len()..],
            ),
            None => (Vec::new(), head),
        };

        let constants_src = constants_src.trim();
        let constants_src = constants_src.strip_prefix(';').unwrap_or(constants_src);

        Ok(Self {
            imports,
            constants: split_declarations(constants_src),
            render: CodeFragment::parse(&render_src),
        })
    }

    /// Names exported by the runtime that this artifact imports.
    pub fn imported_names(&self) -> impl Iterator<Item = &str> {
        self.imports.iter().map(|spec| spec.imported.as_str())
    }
}

/// Parse `import { a as _a, b as _b } ` into import specs.
fn parse_imports(clause: &str) -> Result<Vec<ImportSpec>, ArtifactError> {
    static SPEC_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^([A-Za-z_$][\w$]*)(?:\s+as\s+([A-Za-z_$][\w$]*))?$")
            .expect("Invalid import specifier regex")
    });

    let malformed = || ArtifactError::MalformedImport(clause.trim().to_string());

    let open = clause.find('{').ok_or_else(malformed)?;
    let close = clause.rfind('}').filter(|c| *c > open).ok_or_else(malformed)?;

    clause[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let caps = SPEC_RE.captures(item).ok_or_else(malformed)?;
            let imported = caps[1].to_string();
            let local = caps
                .get(2)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| imported.clone());
            Ok(ImportSpec { imported, local })
        })
        .collect()
}

/// Split the constants block into statements. A statement starts at every line
/// beginning (unindented) with a declaration keyword.
fn split_declarations(src: &str) -> Vec<Declaration> {
    let mut chunks: Vec<String> = Vec::new();

    for line in src.lines() {
        let starts_declaration = DECLARATION_KEYWORDS.iter().any(|k| line.starts_with(k));
        if !starts_declaration {
            if let Some(chunk) = chunks.last_mut() {
                chunk.push('\n');
                chunk.push_str(line);
                continue;
            }
        }
        chunks.push(line.to_string());
    }

    chunks
        .iter()
        .map(|chunk| chunk.trim())
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| Declaration {
            name: declared_name(chunk),
            code: CodeFragment::parse(chunk),
        })
        .collect()
}

fn declared_name(statement: &str) -> Option<String> {
    static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^(?:const|let|var|function)\s+([A-Za-z_$][\w$]*)")
            .expect("Invalid declaration regex")
    });

    NAME_RE.captures(statement).map(|caps| caps[1].to_string())
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Whether the identifier at `start` follows a member access dot (but not a spread).
fn is_property_access(bytes: &[u8], start: usize) -> bool {
    if start == 0 || bytes[start - 1] != b'.' {
        return false;
    }
    !(start >= 3 && &bytes[start - 3..start] == b"...")
}

/// Skip a string or template literal starting at `start`, returning the offset past it.
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }

    bytes.len()
}

/// Whether the `/` at `at` opens a regular expression literal rather than dividing.
fn starts_regex(bytes: &[u8], at: usize) -> bool {
    let Some(prev) = bytes[..at].iter().rposition(|b| !b.is_ascii_whitespace()) else {
        return true;
    };

    if is_ident_char(bytes[prev]) {
        let word_start = bytes[..prev]
            .iter()
            .rposition(|b| !is_ident_char(*b))
            .map_or(0, |p| p + 1);
        return REGEX_KEYWORDS.contains(&&bytes[word_start..=prev]);
    }

    !matches!(bytes[prev], b')' | b']' | b'"' | b'\'' | b'`')
}

/// Skip a regular expression literal starting at `start`, flags included.
///
/// A literal that does not end on its own line was a division after all; only the
/// slash is skipped then.
fn skip_regex(bytes: &[u8], start: usize) -> usize {
    let mut in_class = false;
    let mut i = start + 1;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => break,
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => {
                i += 1;
                while i < bytes.len() && is_ident_char(bytes[i]) {
                    i += 1;
                }
                return i;
            }
            _ => i += 1,
        }
    }

    start + 1
}
