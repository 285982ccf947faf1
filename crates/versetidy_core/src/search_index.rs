//! Search index generation.
//!
//! Projects every content document onto a flat record (title, url, plain
//! text body, date, weight) and writes the collection as a JSON array that
//! the site's client-side search loads.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::error::{DefectKind, DocumentError, Result, TidyError};
use crate::frontmatter;
use crate::fs::FileSystem;

/// One searchable document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchEntry {
    /// Page title (`"Untitled"` if missing)
    pub title: String,
    /// Site-relative URL, e.g. `/1995hanxuema/野罂粟/`
    pub url: String,
    /// Body as plain text
    pub body: String,
    /// Date as written in the front matter, or empty
    pub date: String,
    /// Sort weight (0 if missing)
    pub weight: i64,
    /// Draft flag; drafts never reach the index
    pub draft: bool,
    /// Path relative to the content directory
    pub file_path: String,
}

/// A problem found in a finished index. Warnings never block writing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexWarning {
    /// No entries at all
    Empty,
    /// An entry has an empty required field
    MissingField {
        /// Position in the sorted index
        index: usize,
        /// Name of the empty field
        field: &'static str,
        /// Title of the entry
        title: String,
    },
    /// Several entries share a URL
    DuplicateUrl(String),
}

impl fmt::Display for IndexWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexWarning::Empty => write!(f, "search index is empty"),
            IndexWarning::MissingField {
                index,
                field,
                title,
            } => write!(f, "item {index} missing field '{field}': {title}"),
            IndexWarning::DuplicateUrl(url) => write!(f, "duplicate URL: {url}"),
        }
    }
}

/// Result of scanning the content directory.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    /// Non-draft entries sorted by `(weight, date, title)`
    pub entries: Vec<SearchEntry>,
    /// Number of Markdown files considered
    pub files_found: usize,
    /// Number of drafts left out
    pub drafts_skipped: usize,
    /// Files that could not be read or parsed
    pub failures: Vec<DocumentError>,
}

impl SearchIndex {
    /// Check the index for empty fields and duplicate URLs.
    pub fn validate(&self) -> Vec<IndexWarning> {
        let mut warnings = Vec::new();
        if self.entries.is_empty() {
            warnings.push(IndexWarning::Empty);
            return warnings;
        }

        for (index, entry) in self.entries.iter().enumerate() {
            for (field, value) in [
                ("title", &entry.title),
                ("url", &entry.url),
                ("body", &entry.body),
            ] {
                if value.is_empty() {
                    warnings.push(IndexWarning::MissingField {
                        index,
                        field,
                        title: entry.title.clone(),
                    });
                }
            }
        }

        let mut seen: IndexMap<&str, usize> = IndexMap::new();
        for entry in &self.entries {
            *seen.entry(entry.url.as_str()).or_default() += 1;
        }
        warnings.extend(
            seen.into_iter()
                .filter(|(_, count)| *count > 1)
                .map(|(url, _)| IndexWarning::DuplicateUrl(url.to_string())),
        );

        warnings
    }

    /// Entry counts keyed by the first URL segment (`home` for `/`).
    pub fn section_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            let section = match entry.url.trim_matches('/') {
                "" => "home".to_string(),
                path => path.split('/').next().unwrap_or("other").to_string(),
            };
            *counts.entry(section).or_insert(0) += 1;
        }
        counts
    }

    /// Serialize the entries as a pretty-printed JSON array.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }
}

/// Builds the search index from a content directory.
pub struct SearchIndexBuilder<FS: FileSystem> {
    fs: FS,
}

impl<FS: FileSystem> SearchIndexBuilder<FS> {
    /// Create a new builder
    pub fn new(fs: FS) -> Self {
        Self { fs }
    }

    /// Scan `content_dir` and build the sorted index.
    ///
    /// Directories whose name starts with `_` are skipped. Files that fail to
    /// parse are recorded in [`SearchIndex::failures`].
    pub fn build(&self, content_dir: &Path) -> Result<SearchIndex> {
        let files = self
            .fs
            .list_md_files(content_dir)
            .map_err(|e| TidyError::FileRead {
                path: content_dir.to_path_buf(),
                source: e,
            })?;

        let mut index = SearchIndex::default();
        for path in files {
            let Ok(relative) = path.strip_prefix(content_dir) else {
                continue;
            };
            if in_hidden_dir(relative) {
                log::debug!("Skipping {} (underscore directory)", path.display());
                continue;
            }
            index.files_found += 1;

            match self.entry_for(&path, relative) {
                Ok(entry) if entry.draft => index.drafts_skipped += 1,
                Ok(entry) => index.entries.push(entry),
                Err(error) => {
                    log::warn!("{}", error);
                    index.failures.push(error);
                }
            }
        }

        index.entries.sort_by(|a, b| {
            a.weight
                .cmp(&b.weight)
                .then_with(|| a.date.cmp(&b.date))
                .then_with(|| a.title.cmp(&b.title))
        });
        Ok(index)
    }

    /// Build and write the index to `output`, creating parent directories.
    /// Returns the number of bytes written alongside the index.
    pub fn build_and_write(
        &self,
        content_dir: &Path,
        output: &Path,
    ) -> Result<(SearchIndex, usize)> {
        let index = self.build(content_dir)?;
        let json = index.to_json()?;

        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
        {
            self.fs.create_dir_all(parent)?;
        }
        self.fs
            .write_file(output, &json)
            .map_err(|e| TidyError::FileWrite {
                path: output.to_path_buf(),
                source: e,
            })?;

        Ok((index, json.len()))
    }

    fn entry_for(
        &self,
        path: &Path,
        relative: &Path,
    ) -> std::result::Result<SearchEntry, DocumentError> {
        let content = self.fs.read_to_string(path).map_err(|e| {
            let kind = if e.kind() == std::io::ErrorKind::InvalidData {
                DefectKind::DecodeError
            } else {
                DefectKind::IoError
            };
            DocumentError::new(path, kind, e.to_string())
        })?;

        let (fields, body) = match frontmatter::parse(&content) {
            Ok(parsed) => (parsed.frontmatter, parsed.body),
            // Pages without (complete) front matter are indexed on their body alone
            Err(TidyError::NoFrontMatter) | Err(TidyError::UnterminatedFrontMatter) => {
                (IndexMap::new(), content.clone())
            }
            Err(e) => {
                return Err(DocumentError::new(
                    path,
                    DefectKind::DecodeError,
                    format!("front matter does not parse: {}", e),
                ));
            }
        };

        Ok(SearchEntry {
            title: frontmatter::get_string(&fields, "title")
                .unwrap_or("Untitled")
                .to_string(),
            url: url_for(relative),
            body: plain_text(&body),
            date: date_string(&fields),
            weight: frontmatter::get_i64(&fields, "weight").unwrap_or(0),
            draft: frontmatter::get_bool(&fields, "draft").unwrap_or(false),
            file_path: slash_path(relative),
        })
    }
}

fn in_hidden_dir(relative: &Path) -> bool {
    relative
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .any(|c| matches!(c, Component::Normal(name) if name.to_string_lossy().starts_with('_')))
}

fn date_string(fields: &IndexMap<String, Value>) -> String {
    match fields.get("date") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn slash_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Site URL of a document, from its path relative to the content directory.
///
/// `_index.md` stands for its directory: `_index.md` -> `/`,
/// `book/_index.md` -> `/book/`, `book/poem.md` -> `/book/poem/`.
pub fn url_for(relative: &Path) -> String {
    let path = slash_path(relative);
    let path = path.strip_suffix(".md").unwrap_or(&path);
    let path = path.strip_suffix("_index").unwrap_or(path);
    let path = path.trim_matches('/');
    if path.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", path)
    }
}

/// Convert a Markdown body to the plain text stored in the index.
pub fn plain_text(markdown: &str) -> String {
    clean_text(&strip_tags(&render(markdown)))
}

#[cfg(feature = "markdown")]
fn render(markdown: &str) -> String {
    use comrak::{Options, markdown_to_html};

    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.render.r#unsafe = true; // Keep inline HTML so its tags can be stripped

    markdown_to_html(markdown, &options)
}

#[cfg(not(feature = "markdown"))]
fn render(markdown: &str) -> String {
    // Without comrak the markup characters are dropped by clean_text instead
    markdown.to_string()
}

/// Remove HTML tags and decode the entities a renderer emits. Style and
/// script elements are dropped with their contents.
fn strip_tags(html: &str) -> String {
    let html = drop_element(&drop_element(html, "style"), "script");
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn drop_element(html: &str, tag: &str) -> String {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(start) = rest.find(&open) {
        out.push_str(&rest[..start]);
        rest = match rest[start..].find(&close) {
            Some(end) => &rest[start + end + close.len()..],
            None => "",
        };
    }
    out.push_str(rest);
    out
}

/// Characters kept besides word characters, whitespace and CJK ideographs.
const KEPT_PUNCTUATION: &str = "，。！？、；：\"'《》【】（）.,!?;:-";

/// Replace everything except words, CJK text and common punctuation with
/// spaces, then collapse whitespace.
fn clean_text(text: &str) -> String {
    let kept: String = text
        .chars()
        .map(|c| {
            let keep = c.is_alphanumeric()
                || c == '_'
                || c.is_whitespace()
                || ('\u{4e00}'..='\u{9fff}').contains(&c)
                || KEPT_PUNCTUATION.contains(c);
            if keep { c } else { ' ' }
        })
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}
