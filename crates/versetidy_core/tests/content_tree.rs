//! End-to-end runs against a real content tree on disk.

use std::fs;
use std::path::Path;

use versetidy_core::batch::{BatchRunner, DocumentStatus, RunOptions};
use versetidy_core::error::DefectKind;
use versetidy_core::fs::RealFileSystem;
use versetidy_core::project::Project;
use versetidy_core::scaffold::{BookManifest, Scaffolder};
use versetidy_core::search_index::SearchIndexBuilder;

const SECTION: &str = "+++\ntitle = \"野罂粟\"\ndate = 1999-01-01\nsort_by = \"weight\"\n\n[taxonomies]\ntags = [\"a\"]\n+++\n\n# 野罂粟\n";
const DUPLICATE_EXTRA: &str =
    "+++\ntitle = \"七月的夜呀\"\n\n[extra]\n  foo = 1\n  foo = 1\n+++\n\n七月的夜呀\n";
const CLEAN: &str = "+++\ntitle = \"奔驰的马蹄下\"\ndate = 1995-01-01\nweight = 1\n\n[extra]\n  author = \"李瑜\"\n+++\n\n奔驰的马蹄下\n";
const UNTERMINATED: &str = "+++\ntitle = \"broken\"\nweight = 2\n";

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "config.toml", "base_url = \"https://example.org\"\n");
    write(root, "content/_index.md", "+++\ntitle = \"首页\"\n+++\n");
    write(root, "content/1995hanxuema/野罂粟/_index.md", SECTION);
    write(root, "content/1995hanxuema/野罂粟/七月的夜呀.md", DUPLICATE_EXTRA);
    write(root, "content/1995hanxuema/野罂粟/奔驰的马蹄下.md", CLEAN);
    write(root, "content/1995hanxuema/野罂粟/broken.md", UNTERMINATED);
    dir
}

fn run(project: &Project, dry_run: bool) -> versetidy_core::batch::RunSummary {
    BatchRunner::new(RealFileSystem, project.config())
        .run(
            &project.content_dir(),
            RunOptions {
                dry_run,
                ..RunOptions::default()
            },
        )
        .unwrap()
}

#[test]
fn test_normalize_content_tree() {
    let dir = site();
    let root = dir.path();
    let chapter = root.join("content/1995hanxuema/野罂粟");
    let project = Project::open(&RealFileSystem, root).unwrap();

    let summary = run(&project, false);
    assert_eq!(summary.checked, 5);
    assert_eq!(summary.rewritten, 2);
    assert_eq!(summary.unchanged, 2);
    assert_eq!(summary.errors.len(), 1);

    // Section loses its date and taxonomies
    let section = fs::read_to_string(chapter.join("_index.md")).unwrap();
    assert_eq!(
        section,
        "+++\ntitle = \"野罂粟\"\nsort_by = \"weight\"\n+++\n\n# 野罂粟\n"
    );
    assert_eq!(fs::read(chapter.join("_index.bak")).unwrap(), SECTION.as_bytes());

    // Duplicate key collapses to its first occurrence
    let page = fs::read_to_string(chapter.join("七月的夜呀.md")).unwrap();
    assert_eq!(page.matches("foo = 1").count(), 1);
    assert_eq!(
        fs::read(chapter.join("七月的夜呀.bak")).unwrap(),
        DUPLICATE_EXTRA.as_bytes()
    );

    // Clean page: untouched and no backup
    assert_eq!(fs::read_to_string(chapter.join("奔驰的马蹄下.md")).unwrap(), CLEAN);
    assert!(!chapter.join("奔驰的马蹄下.bak").exists());

    // Unterminated block: reported, untouched, no backup
    let error = &summary.errors[0];
    assert_eq!(error.kind, DefectKind::UnterminatedBlock);
    assert!(error.path.ends_with("broken.md"));
    assert_eq!(fs::read_to_string(chapter.join("broken.md")).unwrap(), UNTERMINATED);
    assert!(!chapter.join("broken.bak").exists());

    // Second run is a fixed point
    let again = run(&project, false);
    assert_eq!(again.rewritten, 0);
    assert_eq!(again.unchanged, 4);
}

#[test]
fn test_dry_run_leaves_tree_alone() {
    let dir = site();
    let root = dir.path();
    let chapter = root.join("content/1995hanxuema/野罂粟");
    let project = Project::open(&RealFileSystem, root).unwrap();

    let summary = run(&project, true);
    assert_eq!(summary.rewritten, 2);
    assert!(
        summary
            .outcomes
            .iter()
            .all(|o| !matches!(o.status, DocumentStatus::Rewritten { .. }))
    );
    assert_eq!(fs::read_to_string(chapter.join("_index.md")).unwrap(), SECTION);
    assert!(!chapter.join("_index.bak").exists());
}

#[test]
fn test_project_config_disables_backups() {
    let dir = site();
    let root = dir.path();
    write(root, "versetidy.toml", "[backup]\nmode = \"disabled\"\n");
    let project = Project::open(&RealFileSystem, root).unwrap();

    let summary = run(&project, false);
    assert_eq!(summary.rewritten, 2);
    assert!(!root.join("content/1995hanxuema/野罂粟/_index.bak").exists());
}

#[test]
fn test_not_a_project_root() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Project::open(&RealFileSystem, dir.path()).is_err());
}

#[test]
fn test_scaffold_then_index() {
    let dir = site();
    let root = dir.path();
    let project = Project::open(&RealFileSystem, root).unwrap();
    // Duplicate keys would make the TOML unparseable for the index
    run(&project, false);

    let book = BookManifest::parse(
        "dir = \"1995hanxuema\"\ntitle = \"汗血马\"\nauthor = \"李瑜\"\nyear = 1995\n\n[[chapters]]\nname = \"野罂粟\"\npoems = [\"奔驰的马蹄下\", \"一枝褐黑的野罂粟凋零了\"]\n",
        Path::new("book.toml"),
    )
    .unwrap();

    let summary = Scaffolder::new(RealFileSystem, project.config())
        .with_covers_dir(root.join("static/images/covers"))
        .scaffold(&project.content_dir(), &book)
        .unwrap();
    assert!(root.join("static/images/covers/1995hanxuema").is_dir());
    assert_eq!(summary.chapters_existing.len(), 1);
    assert_eq!(summary.poems_existing.len(), 1);
    assert_eq!(summary.poems_created.len(), 1);

    let output = root.join("static/search-index.json");
    let (index, _) = SearchIndexBuilder::new(RealFileSystem)
        .build_and_write(&project.content_dir(), &output)
        .unwrap();
    assert_eq!(index.failures.len(), 0);
    assert!(
        index
            .entries
            .iter()
            .any(|e| e.url == "/1995hanxuema/野罂粟/一枝褐黑的野罂粟凋零了/")
    );

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(json.as_array().unwrap().len(), index.entries.len());

    // Scaffolded pages need no normalization
    let summary = run(&project, true);
    assert_eq!(summary.rewritten, 0);
    let created = summary
        .outcomes
        .iter()
        .find(|o| o.path.ends_with("1995hanxuema/野罂粟/一枝褐黑的野罂粟凋零了.md"));
    assert!(matches!(
        created.map(|o| &o.status),
        Some(DocumentStatus::Unchanged)
    ));
}
