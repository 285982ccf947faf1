//! Chapter and poem page scaffolding.
//!
//! A [`BookManifest`] lists a book's chapters and the titles of their
//! poems. [`Scaffolder::scaffold`] creates the missing chapter index and
//! poem pages under the book directory. Files that already exist are never
//! touched, and the generated front matter is already in normalized form.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Result, TidyError};
use crate::fs::FileSystem;

/// A book and its chapters, read from a TOML manifest.
///
/// ```toml
/// dir = "1995hanxuema"
/// title = "汗血马"
/// author = "李瑜"
/// year = 1995
///
/// [[chapters]]
/// name = "啊-中亚细亚新大陆"
/// display_name = "啊，中亚细亚新大陆"
/// poems = ["那辉煌箭矢一定还在飞驰", "大月氏呀"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookManifest {
    /// Book directory, relative to the content directory
    pub dir: PathBuf,
    /// Book title
    pub title: String,
    /// Author name
    pub author: String,
    /// Publication year, used for poem dates
    pub year: i32,
    /// Chapters in reading order
    #[serde(default)]
    pub chapters: Vec<ChapterManifest>,
}

/// One chapter of a [`BookManifest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterManifest {
    /// Directory name of the chapter
    pub name: String,
    /// Title shown on pages; defaults to `name`
    #[serde(default)]
    pub display_name: Option<String>,
    /// Poem titles in order
    #[serde(default)]
    pub poems: Vec<String>,
}

impl ChapterManifest {
    /// The title shown on pages
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

impl BookManifest {
    /// Load and validate a manifest file.
    pub fn load<FS: FileSystem>(fs: &FS, path: &Path) -> Result<Self> {
        let contents = fs
            .read_to_string(path)
            .map_err(|e| TidyError::FileRead {
                path: path.to_path_buf(),
                source: e,
            })?;
        Self::parse(&contents, path)
    }

    /// Parse and validate manifest text. `path` is only used in errors.
    pub fn parse(contents: &str, path: &Path) -> Result<Self> {
        let manifest: BookManifest =
            toml::from_str(contents).map_err(|e| TidyError::InvalidManifest {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        manifest.validate().map_err(|message| TidyError::InvalidManifest {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(manifest)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if !self.dir.is_relative() || self.dir.as_os_str().is_empty() {
            return Err(format!(
                "dir must be a non-empty relative path, got '{}'",
                self.dir.display()
            ));
        }
        if NaiveDate::from_ymd_opt(self.year, 1, 1).is_none() {
            return Err(format!("year {} is out of range", self.year));
        }

        let mut chapter_names = HashSet::new();
        for chapter in &self.chapters {
            if chapter.name.trim().is_empty() || chapter.name.contains(['/', '\\']) {
                return Err(format!("invalid chapter directory name '{}'", chapter.name));
            }
            if !chapter_names.insert(chapter.name.as_str()) {
                return Err(format!("chapter '{}' is listed twice", chapter.name));
            }

            let mut slugs = HashSet::new();
            for title in &chapter.poems {
                let slug = slugify(title);
                if slug.is_empty() {
                    return Err(format!("poem title '{}' has an empty slug", title));
                }
                if !slugs.insert(slug) {
                    return Err(format!(
                        "two poems in chapter '{}' share the slug of '{}'",
                        chapter.name, title
                    ));
                }
            }
        }
        Ok(())
    }
}

/// File-name slug of a poem title.
///
/// Strips `/ \ " ， 、` and anything that is not a word character,
/// whitespace or `-`, then turns spaces into dashes. CJK text is kept.
pub fn slugify(title: &str) -> String {
    title
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '"' | '，' | '、'))
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect::<String>()
        .replace(' ', "-")
        .replace("---", "-")
}

/// Date of the `index`-th poem (1-based): the book year, with the index as
/// month clamped to 1..=12, day 1.
pub fn poem_date(year: i32, index: usize) -> Option<NaiveDate> {
    let month = index.clamp(1, 12) as u32;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// A TOML string literal for `value`.
fn quoted(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

const CHAPTER_STYLE: &str = r#"<style>
.chapter-navigation {
  margin-top: 2rem;
  padding-top: 2rem;
  border-top: 1px solid #eee;
  font-size: 0.9rem;
  text-align: center;
}
[data-theme="dark"] .chapter-navigation {
  border-top-color: #333;
}
.chapter-navigation a {
  text-decoration: none;
}
.chapter-navigation a:hover {
  text-decoration: underline;
}
</style>
"#;

const POEM_STYLE: &str = r#"<style>
.poem-navigation {
  margin-top: 2rem;
  padding-top: 2rem;
  border-top: 1px solid #eee;
  font-size: 0.9rem;
  text-align: center;
}
[data-theme="dark"] .poem-navigation {
  border-top-color: #333;
}
.poem-navigation a {
  text-decoration: none;
}
.poem-navigation a:hover {
  text-decoration: underline;
}
</style>
"#;

/// Render the `_index.md` of the chapter at `position` (0-based).
///
/// The front matter carries no `date` or `[taxonomies]`, so the page is a
/// valid section document.
pub fn chapter_index(book: &BookManifest, position: usize) -> Option<String> {
    let chapter = book.chapters.get(position)?;
    let display = chapter.display_name();
    let count = chapter.poems.len();

    let mut md = format!(
        "+++\n\
         title = {title}\n\
         weight = {weight}\n\
         sort_by = \"weight\"\n\
         insert_anchor_links = \"left\"\n\
         transparent = true\n\
         \n\
         [extra]\n  \
         chapter_name = {title}\n  \
         poem_count = {count}\n  \
         book_name = {book_name}\n  \
         book_year = {year}\n\
         +++\n\
         \n\
         # {display}\n\
         \n\
         **篇章** | **诗歌数量**: {count}\n\
         \n\
         ---\n\
         \n\
         ## 本篇章诗歌列表\n\
         \n",
        title = quoted(display),
        weight = position + 1,
        book_name = quoted(&book.title),
        year = book.year,
    );

    for (i, poem) in chapter.poems.iter().enumerate() {
        md.push_str(&format!("{}. [{}]({}/)\n", i + 1, poem, slugify(poem)));
    }

    md.push_str(&format!(
        "\n---\n\n\
         <div class=\"chapter-navigation\">\n  \
         <a href=\"../\">← 返回《{book}》</a>\n  \
         <span style=\"margin: 0 1rem;\">|</span>\n  \
         <a href=\"/archive\">← 书籍列表</a>\n  \
         <span style=\"margin: 0 1rem;\">|</span>\n  \
         <a href=\"/\">←→ 返回首页</a>\n\
         </div>\n\n",
        book = book.title,
    ));
    md.push_str(CHAPTER_STYLE);
    Some(md)
}

/// Render the page of poem `index` (1-based) in `chapter`.
pub fn poem_page(
    book: &BookManifest,
    chapter: &ChapterManifest,
    index: usize,
    title: &str,
) -> Result<String> {
    let date = poem_date(book.year, index).ok_or_else(|| TidyError::InvalidManifest {
        path: book.dir.clone(),
        message: format!("year {} is out of range", book.year),
    })?;
    let display = chapter.display_name();

    let mut md = format!(
        "+++\n\
         title = {title}\n\
         date = {date}\n\
         weight = {index}\n\
         insert_anchor_links = \"left\"\n\
         \n\
         [taxonomies]\n  \
         tags = [\"poetry\", {book_name}, {chapter_title}, {author}, \"poem\"]\n  \
         categories = [{book_name}]\n\
         \n\
         [extra]\n  \
         author = {author}\n  \
         year = {year}\n  \
         chapter = {chapter_title}\n  \
         chapter_slug = {chapter_slug}\n  \
         poem_index = {index}\n  \
         source_book = {book_name}\n\
         +++\n\
         \n\
         # {raw_title}\n\
         \n\
         **篇 · {display}** | **作者**: {raw_author} | **出版年份**: {year}\n\
         \n\
         ---\n\
         \n\
         ## 诗歌内容\n\
         \n\
         <p style=\"font-size: 1.1em; line-height: 1.8em; margin: 1.5em 0;\">\n\
         诗歌内容待添加...\n\
         </p>\n\
         \n\
         ---\n\
         \n\
         ## 元数据\n\
         \n\
         - **收录于**: [{raw_book}](../../)\n\
         - **篇章**: [{display}](../)\n\
         - **本篇章第**: {index}/{total} 首\n\
         - **诗人**: {raw_author}\n\
         - **出版年份**: {year}\n\
         \n\
         ---\n\
         \n",
        title = quoted(title),
        date = date.format("%Y-%m-%d"),
        book_name = quoted(&book.title),
        chapter_title = quoted(display),
        author = quoted(&book.author),
        year = book.year,
        chapter_slug = quoted(&chapter.name),
        raw_title = title,
        raw_author = book.author,
        raw_book = book.title,
        total = chapter.poems.len(),
    );

    md.push_str(&format!(
        "<div class=\"poem-navigation\">\n  \
         <a href=\"../\">← 返回本篇章</a>\n  \
         <span style=\"margin: 0 1rem;\">|</span>\n  \
         <a href=\"../../\">← 返回《{book}》</a>\n  \
         <span style=\"margin: 0 1rem;\">|</span>\n  \
         <a href=\"/archive\">← 书籍列表</a>\n  \
         <span style=\"margin: 0 1rem;\">|</span>\n  \
         <a href=\"/\">←→ 返回首页</a>\n\
         </div>\n\n",
        book = book.title,
    ));
    md.push_str(POEM_STYLE);
    Ok(md)
}

/// What a scaffold run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScaffoldSummary {
    /// Chapter indexes written
    pub chapters_created: Vec<PathBuf>,
    /// Chapter indexes that already existed
    pub chapters_existing: Vec<PathBuf>,
    /// Poem pages written
    pub poems_created: Vec<PathBuf>,
    /// Poem pages that already existed
    pub poems_existing: Vec<PathBuf>,
    /// Chapter directories that do not exist (skipped)
    pub missing_chapters: Vec<PathBuf>,
    /// The book's cover image directory, when one was requested
    pub cover_dir: Option<PathBuf>,
}

impl ScaffoldSummary {
    /// Number of files written
    pub fn created(&self) -> usize {
        self.chapters_created.len() + self.poems_created.len()
    }

    /// Number of files left alone because they existed
    pub fn existing(&self) -> usize {
        self.chapters_existing.len() + self.poems_existing.len()
    }
}

/// Creates missing chapter and poem pages for a book.
pub struct Scaffolder<FS: FileSystem> {
    fs: FS,
    section_file: String,
    covers_dir: Option<PathBuf>,
}

enum Created {
    New,
    Existing,
}

impl<FS: FileSystem> Scaffolder<FS> {
    /// Create a scaffolder using the section file name from `config`
    pub fn new(fs: FS, config: &Config) -> Self {
        Self {
            fs,
            section_file: config.section_file.clone(),
            covers_dir: None,
        }
    }

    /// Also create `<covers_dir>/<book dir>/` for the book's cover images
    pub fn with_covers_dir(mut self, covers_dir: impl Into<PathBuf>) -> Self {
        self.covers_dir = Some(covers_dir.into());
        self
    }

    /// Create every missing page of `book` under `content_dir`.
    ///
    /// Chapters whose directory is missing are reported and skipped. A write
    /// failure other than "already exists" aborts the run.
    pub fn scaffold(&self, content_dir: &Path, book: &BookManifest) -> Result<ScaffoldSummary> {
        let book_dir = content_dir.join(&book.dir);
        let mut summary = ScaffoldSummary::default();

        if let Some(covers_dir) = &self.covers_dir {
            let cover_dir = covers_dir.join(&book.dir);
            self.fs
                .create_dir_all(&cover_dir)
                .map_err(|e| TidyError::FileWrite {
                    path: cover_dir.clone(),
                    source: e,
                })?;
            log::debug!("Cover directory ready: {}", cover_dir.display());
            summary.cover_dir = Some(cover_dir);
        }

        for (position, chapter) in book.chapters.iter().enumerate() {
            let chapter_dir = book_dir.join(&chapter.name);
            if !self.fs.is_dir(&chapter_dir) {
                log::warn!("Chapter directory not found: {}", chapter_dir.display());
                summary.missing_chapters.push(chapter_dir);
                continue;
            }

            let index_path = chapter_dir.join(&self.section_file);
            if let Some(content) = chapter_index(book, position) {
                match self.create(&index_path, &content)? {
                    Created::New => summary.chapters_created.push(index_path),
                    Created::Existing => summary.chapters_existing.push(index_path),
                }
            }

            for (i, title) in chapter.poems.iter().enumerate() {
                let poem_path = chapter_dir.join(format!("{}.md", slugify(title)));
                if self.fs.exists(&poem_path) {
                    summary.poems_existing.push(poem_path);
                    continue;
                }
                let content = poem_page(book, chapter, i + 1, title)?;
                match self.create(&poem_path, &content)? {
                    Created::New => summary.poems_created.push(poem_path),
                    Created::Existing => summary.poems_existing.push(poem_path),
                }
            }
        }

        Ok(summary)
    }

    fn create(&self, path: &Path, content: &str) -> Result<Created> {
        if self.fs.exists(path) {
            log::debug!("Exists, leaving alone: {}", path.display());
            return Ok(Created::Existing);
        }
        match self.fs.create_new(path, content) {
            Ok(()) => {
                log::info!("Created {}", path.display());
                Ok(Created::New)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(Created::Existing),
            Err(e) => Err(TidyError::FileWrite {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontmatter;
    use crate::normalize::normalize;
    use crate::test_utils::MockFileSystem;

    const MANIFEST: &str = r#"
dir = "1995hanxuema"
title = "汗血马"
author = "李瑜"
year = 1995

[[chapters]]
name = "野罂粟"
poems = ["奔驰的马蹄下", "七月的夜呀", "她的\"望乡之歌\"的悲怆乐句"]

[[chapters]]
name = "啊-启明星"
display_name = "啊，启明星"
poems = ["啊，1771年"]

[[chapters]]
name = "missing"
poems = ["x"]
"#;

    fn manifest() -> BookManifest {
        BookManifest::parse(MANIFEST, Path::new("book.toml")).unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("啊，1771年"), "啊1771年");
        assert_eq!(slugify("她的\"望乡之歌\"的悲怆乐句"), "她的望乡之歌的悲怆乐句");
        assert_eq!(slugify("沙枣花般的买木热·爱孜木"), "沙枣花般的买木热爱孜木");
        assert_eq!(slugify("a / b"), "a--b");
        assert_eq!(slugify("a - b"), "a-b");
        assert_eq!(slugify("Hello, World!"), "Hello-World");
    }

    #[test]
    fn test_poem_date_clamps_month() {
        assert_eq!(poem_date(1995, 3), NaiveDate::from_ymd_opt(1995, 3, 1));
        assert_eq!(poem_date(1995, 0), NaiveDate::from_ymd_opt(1995, 1, 1));
        assert_eq!(poem_date(1995, 15), NaiveDate::from_ymd_opt(1995, 12, 1));
    }

    #[test]
    fn test_manifest_validation() {
        let err = BookManifest::parse(
            "dir = \"b\"\ntitle = \"t\"\nauthor = \"a\"\nyear = 1995\n[[chapters]]\nname = \"c\"\npoems = [\"a b\", \"a-b\"]\n",
            Path::new("book.toml"),
        );
        assert!(matches!(err, Err(TidyError::InvalidManifest { .. })));

        let err = BookManifest::parse(
            "dir = \"/abs\"\ntitle = \"t\"\nauthor = \"a\"\nyear = 1995\n",
            Path::new("book.toml"),
        );
        assert!(matches!(err, Err(TidyError::InvalidManifest { .. })));

        let err = BookManifest::parse("title = 1", Path::new("book.toml"));
        assert!(matches!(err, Err(TidyError::InvalidManifest { .. })));
    }

    #[test]
    fn test_chapter_index_is_a_clean_section() {
        let book = manifest();
        let md = chapter_index(&book, 1).unwrap();
        let result = normalize(&md, true).unwrap();
        assert!(!result.changed, "fixes: {:?}", result.fixes);

        let parsed = frontmatter::parse(&md).unwrap();
        assert_eq!(frontmatter::get_string(&parsed.frontmatter, "title"), Some("啊，启明星"));
        assert_eq!(frontmatter::get_i64(&parsed.frontmatter, "weight"), Some(2));
        assert!(!parsed.frontmatter.contains_key("date"));
        assert!(!parsed.frontmatter.contains_key("taxonomies"));
        assert!(md.contains("1. [啊，1771年](啊1771年/)\n"));
    }

    #[test]
    fn test_poem_page_is_normalized_page() {
        let book = manifest();
        let chapter = &book.chapters[0];
        let md = poem_page(&book, chapter, 3, &chapter.poems[2]).unwrap();
        let result = normalize(&md, false).unwrap();
        assert!(!result.changed, "fixes: {:?}", result.fixes);

        let parsed = frontmatter::parse(&md).unwrap();
        let fm = &parsed.frontmatter;
        assert_eq!(frontmatter::get_string(fm, "title"), Some("她的\"望乡之歌\"的悲怆乐句"));
        assert_eq!(frontmatter::get_string(fm, "date"), Some("1995-03-01"));
        assert_eq!(frontmatter::get_i64(fm, "weight"), Some(3));
        assert_eq!(fm["taxonomies"]["categories"][0], "汗血马");
        assert_eq!(fm["extra"]["chapter_slug"], "野罂粟");
        assert_eq!(fm["extra"]["poem_index"], 3);
        assert!(parsed.body.contains("**本篇章第**: 3/3 首"));
    }

    #[test]
    fn test_scaffold_creates_missing_pages_only() {
        let fs = MockFileSystem::new()
            .with_file("/site/content/1995hanxuema/野罂粟/七月的夜呀.md", "mine")
            .with_file("/site/content/1995hanxuema/啊-启明星/_index.md", "keep");
        let scaffolder = Scaffolder::new(fs.clone(), &Config::default());
        let summary = scaffolder
            .scaffold(Path::new("/site/content"), &manifest())
            .unwrap();

        let book = PathBuf::from("/site/content/1995hanxuema");
        assert_eq!(summary.chapters_created, vec![book.join("野罂粟/_index.md")]);
        assert_eq!(summary.chapters_existing, vec![book.join("啊-启明星/_index.md")]);
        assert_eq!(
            summary.poems_created,
            vec![
                book.join("野罂粟/奔驰的马蹄下.md"),
                book.join("野罂粟/她的望乡之歌的悲怆乐句.md"),
                book.join("啊-启明星/啊1771年.md"),
            ]
        );
        assert_eq!(summary.poems_existing, vec![book.join("野罂粟/七月的夜呀.md")]);
        assert_eq!(summary.missing_chapters, vec![book.join("missing")]);
        assert_eq!(summary.created(), 4);
        assert_eq!(summary.existing(), 2);

        assert_eq!(
            fs.get_content("/site/content/1995hanxuema/野罂粟/七月的夜呀.md").unwrap(),
            "mine"
        );
        assert_eq!(
            fs.get_content("/site/content/1995hanxuema/啊-启明星/_index.md").unwrap(),
            "keep"
        );
    }

    #[test]
    fn test_scaffold_prepares_cover_dir() {
        let fs = MockFileSystem::new().with_file("/site/content/1995hanxuema/野罂粟/a.md", "x");
        let summary = Scaffolder::new(fs.clone(), &Config::default())
            .with_covers_dir("/site/static/images/covers")
            .scaffold(Path::new("/site/content"), &manifest())
            .unwrap();
        assert_eq!(
            summary.cover_dir,
            Some(PathBuf::from("/site/static/images/covers/1995hanxuema"))
        );

        let summary = Scaffolder::new(fs, &Config::default())
            .scaffold(Path::new("/site/content"), &manifest())
            .unwrap();
        assert_eq!(summary.cover_dir, None);
    }

    #[test]
    fn test_second_scaffold_creates_nothing() {
        let fs = MockFileSystem::new().with_file("/site/content/1995hanxuema/野罂粟/a.md", "x");
        let scaffolder = Scaffolder::new(fs.clone(), &Config::default());
        let book = manifest();
        scaffolder.scaffold(Path::new("/site/content"), &book).unwrap();
        let written = fs.writes().len();

        let again = scaffolder.scaffold(Path::new("/site/content"), &book).unwrap();
        assert_eq!(again.created(), 0);
        assert_eq!(fs.writes().len(), written);
    }

    #[test]
    fn test_write_failure_is_fatal() {
        let fs = MockFileSystem::new()
            .with_file("/site/content/1995hanxuema/野罂粟/a.md", "x")
            .with_failing_write("/site/content/1995hanxuema/野罂粟/_index.md");
        let scaffolder = Scaffolder::new(fs, &Config::default());
        assert!(matches!(
            scaffolder.scaffold(Path::new("/site/content"), &manifest()),
            Err(TidyError::FileWrite { .. })
        ));
    }
}
