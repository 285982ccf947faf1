//! Shared front matter parsing utilities.
//!
//! Content documents open with a metadata block fenced by either `+++`
//! (TOML) or `---` (YAML). This module locates the block boundaries, which
//! the normalizer rewrites line by line, and parses the block into an
//! ordered field map for the search index.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{Result, TidyError};

/// The two recognized front matter fences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// `+++`, a TOML block
    Toml,
    /// `---`, a YAML block
    Yaml,
}

impl Delimiter {
    /// The three-character fence token
    pub fn token(&self) -> &'static str {
        match self {
            Delimiter::Toml => "+++",
            Delimiter::Yaml => "---",
        }
    }

    /// Classify a line as a fence, ignoring surrounding whitespace.
    pub fn from_line(line: &str) -> Option<Self> {
        match line.trim() {
            "+++" => Some(Delimiter::Toml),
            "---" => Some(Delimiter::Yaml),
            _ => None,
        }
    }
}

/// A document cut at its front matter boundaries.
///
/// Lines are stored without their terminators, including any run of `\r`
/// before the line feed.
#[derive(Debug, Clone)]
pub struct Split<'a> {
    /// The fence that opened the block
    pub delimiter: Delimiter,
    /// The opening line as written
    pub opening: &'a str,
    /// Lines between the fences
    pub block: Vec<&'a str>,
    /// The fence that closed the block (may differ from the opening one)
    pub closing_delimiter: Delimiter,
    /// The closing line as written
    pub closing: &'a str,
    /// Whether the closing line was followed by a line break
    pub closing_terminated: bool,
    /// Everything after the closing line, byte for byte
    pub body: &'a str,
    /// Line break used by the block, taken from the opening line
    pub newline: &'static str,
}

/// Locate the front matter block.
///
/// The closing fence may be either token: some documents were edited with
/// mixed styles.
pub fn split(content: &str) -> Result<Split<'_>> {
    let mut lines = content.split_inclusive('\n');

    let first = lines.next().ok_or(TidyError::NoFrontMatter)?;
    let opening = strip_terminator(first);
    let delimiter = Delimiter::from_line(opening)
        .filter(|_| opening.starts_with(['+', '-']))
        .ok_or(TidyError::NoFrontMatter)?;
    let newline = if first.ends_with("\r\n") { "\r\n" } else { "\n" };

    let mut offset = first.len();
    let mut block = Vec::new();
    for raw in lines {
        let line = strip_terminator(raw);
        offset += raw.len();
        if let Some(closing_delimiter) = Delimiter::from_line(line) {
            return Ok(Split {
                delimiter,
                opening,
                block,
                closing_delimiter,
                closing: line,
                closing_terminated: raw.ends_with('\n'),
                body: &content[offset..],
                newline,
            });
        }
        block.push(line);
    }

    Err(TidyError::UnterminatedFrontMatter)
}

fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.trim_end_matches('\r')
}

/// Result of parsing a markdown file with front matter.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// Which fence the file uses
    pub delimiter: Delimiter,
    /// The parsed front matter as an ordered map.
    pub frontmatter: IndexMap<String, Value>,
    /// The body content after the front matter.
    pub body: String,
}

/// Parse front matter and body from markdown content.
///
/// `+++` blocks are read as TOML, `---` blocks as YAML. Both are projected
/// onto JSON values so callers need not care which syntax a page used.
pub fn parse(content: &str) -> Result<ParsedFile> {
    let split = split(content)?;
    let source = split.block.join("\n");

    let frontmatter = match split.delimiter {
        Delimiter::Toml => {
            let table: toml::Table = toml::from_str(&source)?;
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect()
        }
        Delimiter::Yaml if source.trim().is_empty() => IndexMap::new(),
        Delimiter::Yaml => serde_yaml::from_str(&source)?,
    };

    Ok(ParsedFile {
        delimiter: split.delimiter,
        frontmatter,
        body: split.body.to_string(),
    })
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        // Dates keep their literal spelling, e.g. 1995-01-01
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Extract only the body from markdown content, stripping front matter.
///
/// If no (complete) front matter exists, returns the content unchanged.
pub fn extract_body(content: &str) -> &str {
    match split(content) {
        Ok(split) => split.body,
        Err(_) => content,
    }
}

/// Get a string property value.
pub fn get_string<'a>(frontmatter: &'a IndexMap<String, Value>, key: &str) -> Option<&'a str> {
    frontmatter.get(key).and_then(|v| v.as_str())
}

/// Get an integer property value.
pub fn get_i64(frontmatter: &IndexMap<String, Value>, key: &str) -> Option<i64> {
    frontmatter.get(key).and_then(|v| v.as_i64())
}

/// Get a boolean property value.
pub fn get_bool(frontmatter: &IndexMap<String, Value>, key: &str) -> Option<bool> {
    frontmatter.get(key).and_then(|v| v.as_bool())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_toml_block() {
        let content = "+++\ntitle = \"A\"\n+++\n\nBody\n";
        let split = split(content).unwrap();
        assert_eq!(split.delimiter, Delimiter::Toml);
        assert_eq!(split.block, vec!["title = \"A\""]);
        assert_eq!(split.body, "\nBody\n");
        assert!(split.closing_terminated);
    }

    #[test]
    fn test_split_accepts_mixed_closing_fence() {
        let content = "+++\ntitle = \"A\"\n---\nBody";
        let split = split(content).unwrap();
        assert_eq!(split.delimiter, Delimiter::Toml);
        assert_eq!(split.closing_delimiter, Delimiter::Yaml);
        assert_eq!(split.body, "Body");
    }

    #[test]
    fn test_split_crlf() {
        let content = "+++\r\ntitle = \"A\"\r\n+++\r\nBody\r\n";
        let split = split(content).unwrap();
        assert_eq!(split.newline, "\r\n");
        assert_eq!(split.block, vec!["title = \"A\""]);
        assert_eq!(split.body, "Body\r\n");
    }

    #[test]
    fn test_split_errors() {
        assert!(matches!(split("# Poem\n"), Err(TidyError::NoFrontMatter)));
        assert!(matches!(split(""), Err(TidyError::NoFrontMatter)));
        assert!(matches!(split("  +++\n+++\n"), Err(TidyError::NoFrontMatter)));
        assert!(matches!(
            split("+++\ntitle = \"A\"\n"),
            Err(TidyError::UnterminatedFrontMatter)
        ));
    }

    #[test]
    fn test_parse_toml_frontmatter() {
        let content = "+++\ntitle = \"汗血马\"\ndate = 1995-01-01\nweight = 3\n\n[extra]\nauthor = \"李瑜\"\n+++\nBody";
        let parsed = parse(content).unwrap();
        assert_eq!(get_string(&parsed.frontmatter, "title"), Some("汗血马"));
        assert_eq!(get_string(&parsed.frontmatter, "date"), Some("1995-01-01"));
        assert_eq!(get_i64(&parsed.frontmatter, "weight"), Some(3));
        assert_eq!(parsed.frontmatter["extra"]["author"], "李瑜");
        assert_eq!(parsed.body, "Body");
    }

    #[test]
    fn test_parse_yaml_frontmatter() {
        let content = "---\ntitle: Test\ndraft: true\n---\n\nBody content";
        let parsed = parse(content).unwrap();
        assert_eq!(parsed.delimiter, Delimiter::Yaml);
        assert_eq!(get_string(&parsed.frontmatter, "title"), Some("Test"));
        assert_eq!(get_bool(&parsed.frontmatter, "draft"), Some(true));
        assert_eq!(parsed.body.trim(), "Body content");
    }

    #[test]
    fn test_parse_rejects_duplicate_toml_keys() {
        let content = "+++\n[extra]\nfoo = 1\nfoo = 1\n+++\n";
        assert!(matches!(parse(content), Err(TidyError::Toml(_))));
    }

    #[test]
    fn test_extract_body() {
        assert_eq!(extract_body("+++\na = 1\n+++\nBody").trim(), "Body");
        assert_eq!(extract_body("Just body content"), "Just body content");
    }
}
