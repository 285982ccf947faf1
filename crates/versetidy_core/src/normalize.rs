//! Front matter normalization.
//!
//! Rewrites a document's front matter block so it is valid for the site
//! generator: duplicate keys are dropped (first occurrence wins), fields and
//! tables that sections may not carry are removed, keys are re-indented
//! canonically, verbatim repeated lines are collapsed, and the block is closed
//! with the fence that opened it. The body is never touched.
//!
//! Normalization is a fixed point: feeding the output back in reports no
//! change.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{DefectKind, TidyError};
use crate::frontmatter::{self, Delimiter};

/// Leading characters left behind by earlier broken rewrites (e.g. `.key = 1`).
const STRAY_PUNCTUATION: &[char] = &['.', ',', ';', ':', '*', '`'];

/// What the normalizer removes or rewrites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeRules {
    /// Top-level fields section documents may not carry
    pub section_disallowed_fields: Vec<String>,
    /// Tables section documents may not carry (dropped with all their fields)
    pub section_disallowed_tables: Vec<String>,
    /// Table headers to rename, e.g. `extra.oldlist` -> `extra`. Chains are
    /// followed to their end; cycles are ignored.
    pub table_renames: IndexMap<String, String>,
    /// Indentation of fields inside a table
    pub table_indent: usize,
}

impl Default for NormalizeRules {
    fn default() -> Self {
        Self {
            section_disallowed_fields: vec!["date".to_string(), "template".to_string()],
            section_disallowed_tables: vec!["taxonomies".to_string()],
            table_renames: [("extra.oldlist", "extra"), ("extra.__oldlist", "extra")]
                .into_iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            table_indent: 2,
        }
    }
}

/// A single correction applied to a document. Line numbers are 1-based and
/// refer to the input text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "fix", rename_all = "kebab-case")]
pub enum Fix {
    /// A key already defined in the same table was dropped
    DuplicateKey {
        line: usize,
        table: Option<String>,
        key: String,
    },
    /// A field not allowed on sections was dropped
    DisallowedField { line: usize, key: String },
    /// A table not allowed on sections was dropped with its contents
    DroppedTable {
        line: usize,
        table: String,
        lines: usize,
    },
    /// A table header was renamed
    RenamedTable { line: usize, from: String, to: String },
    /// A field line was re-indented or stripped of stray punctuation
    Reindented { line: usize, key: String },
    /// A line repeating the previous one verbatim was removed
    CollapsedLine { line: usize },
    /// Blank lines at the end of the block were removed
    TrimmedBlankLines { count: usize },
    /// The closing fence was missing its line break or used the other token
    ClosingDelimiter { expected: String, found: String },
    /// Line breaks not matching the opening fence's were rewritten
    LineEndings { count: usize },
}

impl fmt::Display for Fix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fix::DuplicateKey { line, table, key } => match table {
                Some(table) => write!(f, "line {line}: dropped duplicate key '{key}' in [{table}]"),
                None => write!(f, "line {line}: dropped duplicate key '{key}'"),
            },
            Fix::DisallowedField { line, key } => {
                write!(f, "line {line}: removed '{key}' (not allowed on sections)")
            }
            Fix::DroppedTable { line, table, lines } => write!(
                f,
                "line {line}: removed [{table}] and {lines} line(s) (not allowed on sections)"
            ),
            Fix::RenamedTable { line, from, to } => {
                write!(f, "line {line}: renamed [{from}] to [{to}]")
            }
            Fix::Reindented { line, key } => write!(f, "line {line}: re-indented '{key}'"),
            Fix::CollapsedLine { line } => write!(f, "line {line}: removed repeated line"),
            Fix::TrimmedBlankLines { count } => {
                write!(f, "removed {count} trailing blank line(s)")
            }
            Fix::ClosingDelimiter { expected, found } => {
                write!(f, "closing fence '{found}' rewritten as '{expected}'")
            }
            Fix::LineEndings { count } => {
                write!(f, "rewrote {count} line ending(s) to match the opening fence")
            }
        }
    }
}

/// Output of a normalization pass.
#[derive(Debug, Clone)]
pub struct Normalized {
    /// The rewritten document
    pub text: String,
    /// Whether `text` differs from the input
    pub changed: bool,
    /// Every correction that was applied
    pub fixes: Vec<Fix>,
}

/// Normalizes front matter according to a set of rules.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    rules: NormalizeRules,
}

impl Normalizer {
    /// Create a normalizer with the given rules
    pub fn new(rules: NormalizeRules) -> Self {
        Self { rules }
    }

    /// Normalize one document.
    ///
    /// Returns `Err(MissingFrontMatter)` when the text does not start with a
    /// fence and `Err(UnterminatedBlock)` when the block is never closed; such
    /// documents must be left untouched.
    pub fn normalize(&self, raw: &str, is_section: bool) -> Result<Normalized, DefectKind> {
        let split = frontmatter::split(raw).map_err(|e| match e {
            TidyError::UnterminatedFrontMatter => DefectKind::UnterminatedBlock,
            _ => DefectKind::MissingFrontMatter,
        })?;

        let mut walker = Walker::new(&self.rules, is_section);
        walker.step(split.opening, LineKind::Delimiter, 1);
        for (idx, line) in split.block.iter().copied().enumerate() {
            walker.feed(line, idx + 2);
        }
        let (mut lines, mut fixes) = walker.finish();

        let trailing = lines
            .iter()
            .rev()
            .take_while(|l| l.trim().is_empty())
            .count();
        // Never trim the opening fence
        let trailing = trailing.min(lines.len().saturating_sub(1));
        if trailing > 0 {
            lines.truncate(lines.len() - trailing);
            fixes.push(Fix::TrimmedBlankLines { count: trailing });
        }

        let expected = split.delimiter.token();
        if split.closing != expected || !split.closing_terminated {
            fixes.push(Fix::ClosingDelimiter {
                expected: expected.to_string(),
                found: split.closing.to_string(),
            });
        }

        let head = &raw[..raw.len() - split.body.len()];
        let mismatched = head
            .split_inclusive('\n')
            .filter(|l| l.ends_with('\n'))
            .filter(|l| &l[l.trim_end_matches(['\r', '\n']).len()..] != split.newline)
            .count();
        if mismatched > 0 {
            fixes.push(Fix::LineEndings { count: mismatched });
        }

        let mut text = String::with_capacity(raw.len());
        for line in &lines {
            text.push_str(line);
            text.push_str(split.newline);
        }
        text.push_str(expected);
        text.push_str(split.newline);
        text.push_str(split.body);

        let changed = text != raw;
        Ok(Normalized {
            text,
            changed,
            fixes,
        })
    }
}

/// Normalize with the default rules.
pub fn normalize(raw: &str, is_section: bool) -> Result<Normalized, DefectKind> {
    Normalizer::default().normalize(raw, is_section)
}

/// Line categories, dispatched in one place by [`Walker::step`].
#[derive(Debug, PartialEq, Eq)]
enum LineKind<'a> {
    Delimiter,
    TableHeader { name: &'a str },
    KeyValue { key: String, field: &'a str },
    Blank,
    Other,
}

fn classify(line: &str) -> LineKind<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if Delimiter::from_line(trimmed).is_some() {
        return LineKind::Delimiter;
    }
    if let Some(name) = table_header_name(trimmed) {
        return LineKind::TableHeader { name };
    }

    let field = line.trim_start_matches(|c: char| c.is_whitespace() || STRAY_PUNCTUATION.contains(&c));
    if let Some((raw_key, _)) = field.split_once('=') {
        let key = raw_key.trim();
        if is_key(key) {
            return LineKind::KeyValue {
                key: key.trim_matches('"').to_string(),
                field,
            };
        }
    }
    LineKind::Other
}

/// `[name]` or `[[name]]` with a plausible TOML table name.
fn table_header_name(trimmed: &str) -> Option<&str> {
    let inner = trimmed.strip_prefix('[')?.strip_suffix(']')?;
    let inner = inner
        .strip_prefix('[')
        .and_then(|i| i.strip_suffix(']'))
        .unwrap_or(inner)
        .trim();
    is_key(inner).then_some(inner)
}

fn is_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ' ' | '"' | '\''))
        && key.matches('"').count() % 2 == 0
        && key.matches('\'').count() % 2 == 0
}

/// Final name for a table header, following chained renames.
fn rename_target<'r>(renames: &'r IndexMap<String, String>, name: &str) -> Option<&'r str> {
    let mut current = renames.get(name)?;
    for _ in 0..renames.len() {
        match renames.get(current.as_str()) {
            Some(next) => current = next,
            None => {
                let usable = current != name && is_key(current) && current.trim() == current;
                return usable.then_some(current.as_str());
            }
        }
    }
    None
}

/// Tracks open strings and brackets across the lines of one value so
/// multi-line arrays and strings are kept (or dropped) as a unit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ValueScanner {
    mode: StringMode,
    depth: i32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum StringMode {
    #[default]
    None,
    Basic,
    Literal,
    MultiBasic,
    MultiLiteral,
}

impl ValueScanner {
    fn feed(&mut self, text: &str) {
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let rest = &bytes[i..];
            match self.mode {
                StringMode::None => match bytes[i] {
                    b'#' => break,
                    b'"' if rest.starts_with(b"\"\"\"") => {
                        self.mode = StringMode::MultiBasic;
                        i += 2;
                    }
                    b'\'' if rest.starts_with(b"'''") => {
                        self.mode = StringMode::MultiLiteral;
                        i += 2;
                    }
                    b'"' => self.mode = StringMode::Basic,
                    b'\'' => self.mode = StringMode::Literal,
                    b'[' | b'{' => self.depth += 1,
                    b']' | b'}' => self.depth -= 1,
                    _ => {}
                },
                StringMode::Basic => match bytes[i] {
                    b'\\' => i += 1,
                    b'"' => self.mode = StringMode::None,
                    _ => {}
                },
                StringMode::Literal => {
                    if bytes[i] == b'\'' {
                        self.mode = StringMode::None;
                    }
                }
                StringMode::MultiBasic => {
                    if bytes[i] == b'\\' {
                        i += 1;
                    } else if rest.starts_with(b"\"\"\"") {
                        self.mode = StringMode::None;
                        i += 2;
                    }
                }
                StringMode::MultiLiteral => {
                    if rest.starts_with(b"'''") {
                        self.mode = StringMode::None;
                        i += 2;
                    }
                }
            }
            i += 1;
        }
        // Single-line strings cannot span lines
        if matches!(self.mode, StringMode::Basic | StringMode::Literal) {
            self.mode = StringMode::None;
        }
    }

    fn in_string(&self) -> bool {
        matches!(self.mode, StringMode::MultiBasic | StringMode::MultiLiteral)
    }

    fn is_open(&self) -> bool {
        self.in_string() || self.depth > 0
    }
}

/// The value of a field spanning several lines, kept or dropped with its key.
#[derive(Debug)]
struct Continuation {
    scanner: ValueScanner,
    keep: bool,
}

/// A disallowed table being skipped.
#[derive(Debug)]
struct Discard {
    table: String,
    line: usize,
    lines: usize,
}

/// State of the walk over one block.
struct Walker<'a> {
    rules: &'a NormalizeRules,
    is_section: bool,
    table: Option<String>,
    seen: HashMap<Option<String>, HashSet<String>>,
    discard: Option<Discard>,
    continuation: Option<Continuation>,
    out: Vec<Cow<'a, str>>,
    fixes: Vec<Fix>,
}

impl<'a> Walker<'a> {
    fn new(rules: &'a NormalizeRules, is_section: bool) -> Self {
        Self {
            rules,
            is_section,
            table: None,
            seen: HashMap::new(),
            discard: None,
            continuation: None,
            out: Vec::new(),
            fixes: Vec::new(),
        }
    }

    fn feed(&mut self, line: &'a str, number: usize) {
        let kind = classify(line);
        if let Some(mut cont) = self.continuation.take() {
            // An unclosed bracket ends at the next header or field
            let interrupted = !cont.scanner.in_string()
                && matches!(kind, LineKind::TableHeader { .. } | LineKind::KeyValue { .. });
            if !interrupted {
                cont.scanner.feed(line);
                if cont.keep {
                    self.out.push(Cow::Borrowed(line));
                }
                if cont.scanner.is_open() {
                    self.continuation = Some(cont);
                }
                return;
            }
        }
        self.step(line, kind, number);
    }

    fn step(&mut self, line: &'a str, kind: LineKind<'a>, number: usize) {
        match kind {
            LineKind::Delimiter => {
                self.close_discard();
                self.table = None;
                self.seen.clear();
                self.out.push(Cow::Borrowed(line));
            }
            LineKind::TableHeader { name } => self.table_header(line, name, number),
            _ if self.discard.is_some() => {
                if let Some(discard) = self.discard.as_mut() {
                    discard.lines += 1;
                }
                if let LineKind::KeyValue { field, .. } = kind {
                    self.open_continuation(field, false);
                }
            }
            LineKind::KeyValue { key, field } => self.key_value(line, key, field, number),
            LineKind::Blank => self.out.push(Cow::Borrowed(line)),
            LineKind::Other => {
                if self.repeats_previous(line) {
                    self.fixes.push(Fix::CollapsedLine { line: number });
                } else {
                    self.out.push(Cow::Borrowed(line));
                }
            }
        }
    }

    fn table_header(&mut self, line: &'a str, name: &'a str, number: usize) {
        self.close_discard();

        let rules = self.rules;
        let renamed = rename_target(&rules.table_renames, name);
        let table = renamed.unwrap_or(name);

        let disallowed = |t: &String| t == name || t == table;
        if self.is_section && rules.section_disallowed_tables.iter().any(disallowed) {
            self.discard = Some(Discard {
                table: name.to_string(),
                line: number,
                lines: 0,
            });
            return;
        }

        let header = match renamed {
            Some(to) => Cow::Owned(line.replacen(name, to, 1)),
            None => Cow::Borrowed(line),
        };
        if self.table.as_deref() == Some(table) && self.repeats_previous(&header) {
            self.fixes.push(Fix::CollapsedLine { line: number });
            return;
        }

        if let Some(to) = renamed {
            self.fixes.push(Fix::RenamedTable {
                line: number,
                from: name.to_string(),
                to: to.to_string(),
            });
        }
        self.out.push(header);
        self.table = Some(table.to_string());
        self.seen.insert(self.table.clone(), HashSet::new());
    }

    fn key_value(&mut self, line: &'a str, key: String, field: &'a str, number: usize) {
        if self.is_section
            && self.table.is_none()
            && self.rules.section_disallowed_fields.contains(&key)
        {
            self.fixes.push(Fix::DisallowedField { line: number, key });
            self.open_continuation(field, false);
            return;
        }

        let seen = self.seen.entry(self.table.clone()).or_default();
        if !seen.insert(key.clone()) {
            self.fixes.push(Fix::DuplicateKey {
                line: number,
                table: self.table.clone(),
                key,
            });
            self.open_continuation(field, false);
            return;
        }

        let indent = if self.table.is_some() {
            self.rules.table_indent
        } else {
            0
        };
        let canonical_matches =
            line.len() == indent + field.len() && line.as_bytes()[..indent].iter().all(|b| *b == b' ');
        if canonical_matches {
            self.out.push(Cow::Borrowed(line));
        } else {
            self.fixes.push(Fix::Reindented {
                line: number,
                key: key.clone(),
            });
            self.out
                .push(Cow::Owned(format!("{}{}", " ".repeat(indent), field)));
        }
        self.open_continuation(field, true);
    }

    fn open_continuation(&mut self, field: &str, keep: bool) {
        let value = field.split_once('=').map(|(_, v)| v).unwrap_or_default();
        let mut scanner = ValueScanner::default();
        scanner.feed(value);
        if scanner.is_open() {
            self.continuation = Some(Continuation { scanner, keep });
        }
    }

    fn repeats_previous(&self, line: &str) -> bool {
        self.out.last().is_some_and(|prev| prev.as_ref() == line)
    }

    fn close_discard(&mut self) {
        if let Some(discard) = self.discard.take() {
            self.fixes.push(Fix::DroppedTable {
                line: discard.line,
                table: discard.table,
                lines: discard.lines,
            });
        }
    }

    fn finish(mut self) -> (Vec<Cow<'a, str>>, Vec<Fix>) {
        self.close_discard();
        (self.out, self.fixes)
    }
}
