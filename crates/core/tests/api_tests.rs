//! Library API integration tests
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use folio_core::*;
use rstest::rstest;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A source tree under `<tmp>/<name>` converted into `<tmp>/site/docs/<out>`,
/// which keeps the default image directory inside the temp dir.
struct Project {
    _tmp: TempDir,
    input: PathBuf,
    output: PathBuf,
    statics: PathBuf,
}

impl Project {
    fn new(name: &str) -> Self {
        init_tracing();
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join(name);
        let project = name.to_lowercase();
        let output = tmp.path().join("site").join("docs").join(&project);
        let statics = tmp.path().join("site").join("static").join("img").join(&project);
        fs::create_dir_all(&input).unwrap();
        Project { _tmp: tmp, input, output, statics }
    }

    fn write(&self, relative: &str, content: impl AsRef<[u8]>) -> &Self {
        let path = self.input.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        self
    }

    fn config(&self) -> ConvertConfigBuilder {
        ConvertConfig::builder().input_dir(&self.input).output_dir(&self.output)
    }

    fn run(&self) -> ConversionReport {
        Converter::new(self.config().overwrite(true).build()).run().unwrap()
    }

    fn markdown(&self, relative: &str) -> String {
        fs::read_to_string(self.output.join(relative)).unwrap()
    }

    fn static_files(&self) -> Vec<String> {
        let mut files: Vec<String> = walkdir::WalkDir::new(&self.statics)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().strip_prefix(&self.statics).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        files.sort();
        files
    }
}

fn page(body: &str) -> String {
    format!("<html><head><title>Page</title></head><body>{}</body></html>", body)
}

#[test]
fn test_identical_content_shares_one_canonical_path() {
    let p = Project::new("Guide");
    p.write("a/shot.png", b"same")
        .write("b/Shot Copy.png", b"same")
        .write("b/other.png", b"other")
        .write("a/one.html", page(r#"<img src="shot.png" alt="A">"#))
        .write("b/two.html", page(r#"<img src="Shot%20Copy.png" alt="B"><img src="other.png" alt="C">"#));

    let report = p.run();
    assert_eq!(report.images.total_references, 3);
    assert_eq!(report.images.unique_images, 2);
    assert_eq!(p.static_files(), vec!["a/shot.png", "b/other.png"]);

    let hashes: HashSet<String> = p
        .static_files()
        .iter()
        .map(|f| ContentHash::of_file(&p.statics.join(f)).unwrap().to_string())
        .collect();
    assert_eq!(hashes.len(), p.static_files().len());

    assert!(p.markdown("a/one.md").contains("![A](/static/img/guide/a/shot.png)"));
    assert!(p.markdown("b/two.md").contains("![B](/static/img/guide/a/shot.png)"));
    assert!(p.markdown("b/two.md").contains("![C](/static/img/guide/b/other.png)"));
}

#[test]
fn test_dedup_stats() {
    let p = Project::new("Stats");
    let mut body = String::new();
    for i in 1..=10 {
        let content = format!("content-{}", (i - 1) % 6);
        p.write(&format!("img/{}.png", i), content);
        body.push_str(&format!(r#"<img src="img/{}.png" alt="{}">"#, i, i));
    }
    p.write("index.html", page(&body));

    let report = p.run();
    assert_eq!(report.images.total_references, 10);
    assert_eq!(report.images.unique_images, 6);
    assert_eq!(report.images.duplicates_removed, 4);
    assert_eq!(report.images.ratio, "40.0%");
    assert_eq!(p.static_files().len(), 6);
}

#[test]
fn test_name_collisions_are_deterministic() {
    let p = Project::new("Guide");
    p.write("a/logo.png", b"first")
        .write("b/logo.png", b"second")
        .write("c/logo.png", b"third")
        .write("index.html", page(r#"<img src="a/logo.png"><img src="b/logo.png"><img src="c/logo.png">"#));

    let report = p.run();
    assert_eq!(p.static_files(), vec!["logo.png", "logo_1.png", "logo_2.png"]);
    assert_eq!(fs::read(p.statics.join("logo.png")).unwrap(), b"first");
    assert_eq!(fs::read(p.statics.join("logo_1.png")).unwrap(), b"second");
    assert_eq!(fs::read(p.statics.join("logo_2.png")).unwrap(), b"third");
    assert_eq!(report.warnings.iter().filter(|w| w.contains("Filename conflict")).count(), 2);
}

#[test]
fn test_rerun_is_idempotent() {
    let p = Project::new("Guide");
    p.write("setup/img/logo.png", b"logo")
        .write("setup/install.html", page(r#"<p>Step</p><img src="img/logo.png" alt="Logo">"#))
        .write("index.html", page(r#"<a href="setup/install.html">Install</a>"#));

    p.run();
    let first = p.markdown("setup/install.md");
    let first_files = p.static_files();

    let report = p.run();
    assert_eq!(p.markdown("setup/install.md"), first);
    assert_eq!(p.static_files(), first_files);
    assert_eq!(report.images_removed, 0);
    assert!(!report.warnings.iter().any(|w| w.contains("Filename conflict")));
}

#[test]
fn test_rewrite_pass_is_idempotent() {
    let p = Project::new("Guide");
    p.write("img/logo.png", b"logo").write("index.html", page(r#"<img src="img/logo.png" alt="Logo">"#));
    p.run();

    let mut store = ImageStore::new(&p.statics, "/static/img/guide");
    let resolver = PathResolver::new(&fs::canonicalize(&p.input).unwrap(), &p.output, "guide");
    let mut index = ReferenceIndex::new();
    index.add_reference("img/logo.png", &resolver.input_dir().join("index.html"));
    store.process_all(&index, &resolver, &mut Diagnostics::new());

    let markdown = p.markdown("index.md");
    let (again, stats) = rewrite_image_paths(&markdown, &store);
    assert_eq!(again, markdown);
    assert_eq!(stats.rewritten, 0);
}

#[rstest]
#[case("Docs", "Docs/guide.html", "guide.md")]
#[case("Docs", "Docs/Setup/Install Notes.html", "setup/install_notes.md")]
#[case("Docs", "Setup/Docs/x.html", "setup/docs/x.md")]
#[case("Docs", "Setup/Setup/x.htm", "setup/x.md")]
#[case("Docs", "index.html", "index.md")]
fn test_output_layout(#[case] root: &str, #[case] source: &str, #[case] expected: &str) {
    let p = Project::new(root);
    p.write(source, page("<p>Body</p>"));
    let report = p.run();
    assert_eq!(report.documents_converted, 1);
    assert!(p.output.join(expected).is_file(), "missing {}", expected);
}

#[test]
fn test_unreferenced_images_removed() {
    let p = Project::new("Guide");
    fs::create_dir_all(p.statics.join("old")).unwrap();
    fs::write(p.statics.join("old").join("stale.png"), b"stale").unwrap();
    p.write("img/logo.png", b"logo").write("index.html", page(r#"<img src="img/logo.png">"#));

    let report = p.run();
    assert_eq!(report.images_removed, 1);
    assert_eq!(p.static_files(), vec!["logo.png"]);
    assert!(!p.statics.join("old").exists());
    assert!(report.directories_removed >= 1);
}

#[test]
fn test_unreferenced_images_kept_on_request() {
    let p = Project::new("Guide");
    fs::create_dir_all(&p.statics).unwrap();
    fs::write(p.statics.join("stale.png"), b"stale").unwrap();
    p.write("index.html", page("<p>No images</p>"));

    let report = Converter::new(p.config().remove_unreferenced(false).build()).run().unwrap();
    assert_eq!(report.images_removed, 0);
    assert!(p.statics.join("stale.png").is_file());
}

#[test]
fn test_external_images_pass_through() {
    let p = Project::new("Guide");
    p.write(
        "index.html",
        page(r#"<img src="https://example.com/x.png" alt="Remote"><a href="http://example.com/page">Ext</a>"#),
    );

    let report = p.run();
    assert_eq!(report.images.total_references, 0);
    assert_eq!(report.images.ratio, "0%");
    assert!(p.static_files().is_empty());

    let markdown = p.markdown("index.md");
    assert!(markdown.contains("![Remote](https://example.com/x.png)"));
    assert!(markdown.contains("[Ext](http://example.com/page)"));
}

#[test]
fn test_links_rewritten_to_markdown_urls() {
    let p = Project::new("Guide");
    p.write("Admin/Roles.html", page(r#"<h2 id="Assign">Assign</h2>"#)).write(
        "Admin/Users.html",
        page(r##"<a href="Roles.html#Assigning_Roles">Assigning Roles</a> <a href="../index.html">Home</a> <a href="#top">Top</a>"##),
    )
    .write("index.html", page("<p>Home</p>"));

    p.run();
    let users = p.markdown("admin/users.md");
    assert!(users.contains("[Assigning Roles](/guide/admin/roles.md#assigning-roles)"));
    assert!(users.contains("[Home](/guide/index.md)"));
    assert!(users.contains("[Top](#top)"));
}

#[test]
fn test_missing_image_is_reported() {
    let p = Project::new("Guide");
    p.write("index.html", page(r#"<img src="img/missing.png" alt="Gone">"#));

    let report = p.run();
    assert_eq!(report.documents_converted, 1);
    assert_eq!(report.unresolved_image_links, 1);
    assert!(report.warnings.iter().any(|w| w.contains("Image not found: img/missing.png")));
}

#[test]
fn test_failed_document_does_not_stop_run() {
    let p = Project::new("Guide");
    p.write("bad.html", [0x3c, 0x70, 0x3e, 0xff, 0xfe]).write("good.html", page("<p>Good</p>"));

    let report = p.run();
    assert_eq!(report.documents_found, 2);
    assert_eq!(report.documents_converted, 1);
    assert_eq!(report.documents_failed, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("bad.html"));
    assert_eq!(report.stage, Stage::Done);
}

#[test]
fn test_assets_copied_with_normalized_names() {
    let p = Project::new("Guide");
    p.write("Downloads/User Manual.PDF", b"%PDF")
        .write("Downloads/chart.png", b"png")
        .write("index.html", page(r#"<a href="Downloads/User%20Manual.PDF">Manual</a>"#));

    let report = p.run();
    assert_eq!(report.assets_copied, 1);
    assert!(p.output.join("downloads").join("user_manual.pdf").is_file());
    assert!(!p.output.join("downloads").join("chart.png").exists());
    assert!(p.markdown("index.md").contains("[Manual](/guide/downloads/user_manual.pdf)"));
}

#[test]
fn test_assets_skipped_when_disabled() {
    let p = Project::new("Guide");
    p.write("notes.txt", "notes").write("index.html", page("<p>Home</p>"));

    let report = Converter::new(p.config().copy_assets(false).build()).run().unwrap();
    assert_eq!(report.assets_copied, 0);
    assert!(!p.output.join("notes.txt").exists());
}

#[test]
fn test_converted_tree_validates() {
    let p = Project::new("Guide");
    p.write("setup/img/flow.png", b"flow")
        .write("files/notes.txt", "notes")
        .write(
            "setup/Install.html",
            page(r##"<img src="img/flow.png" alt="Flow"><a href="../index.html#Intro">Home</a>"##),
        )
        .write(
            "index.html",
            page(r#"<a href="setup/Install.html">Install</a> <a href="files/notes.txt">Notes</a>"#),
        );

    let converter = Converter::new(p.config().build());
    converter.run().unwrap();
    let validation = converter.validate().unwrap();
    assert!(validation.passed(), "{:?}", validation.errors);
    assert_eq!(validation.files_checked, 2);
}

#[test]
fn test_parenthesised_image_name_in_subdirectory() {
    let p = Project::new("Guide");
    p.write("setup/Screenshot (1).png", b"shot")
        .write("setup/page.html", page(r#"<img src="Screenshot%20(1).png" alt="Shot">"#));

    let converter = Converter::new(p.config().build());
    let report = converter.run().unwrap();
    assert_eq!(report.unresolved_image_links, 0);
    assert_eq!(report.images_rewritten, 1);
    assert_eq!(p.static_files(), vec!["setup/screenshot_(1).png"]);

    let markdown = p.markdown("setup/page.md");
    assert!(markdown.contains("/static/img/guide/setup/screenshot_"));
    assert!(!markdown.contains("Screenshot"));

    let validation = converter.validate().unwrap();
    assert!(validation.passed(), "{:?}", validation.errors);
}

#[test]
fn test_linked_image_converts_and_validates() {
    let p = Project::new("Guide");
    p.write("logo.png", b"logo")
        .write("other.html", page("<p>Other</p>"))
        .write("index.html", page(r#"<a href="other.html"><img src="logo.png" alt="Logo"></a>"#));

    let converter = Converter::new(p.config().build());
    converter.run().unwrap();
    let index = p.markdown("index.md");
    assert!(index.contains("![Logo](/static/img/guide/logo.png)"));
    assert!(index.contains("(/guide/other.md)"));

    let validation = converter.validate().unwrap();
    assert!(validation.passed(), "{:?}", validation.errors);
}

#[test]
fn test_report_json() {
    let p = Project::new("Guide");
    p.write("index.html", page("<p>Home</p>"));

    let json = p.run().to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["project_name"], "guide");
    assert_eq!(value["documents_converted"], 1);
    assert_eq!(value["images"]["ratio"], "0%");
}

#[test]
fn test_transform_single_document() {
    let resolver = PathResolver::new(Path::new("/docs/guide"), Path::new("/site/docs/guide"), "guide");
    let transformer = DocumentTransformer::new(&resolver);
    let mut index = ReferenceIndex::new();

    let html = r#"<html><head><title>Intro</title></head><body><div role="main"><p>Hello</p><img src="a.png"></div><nav>Skip</nav></body></html>"#;
    let doc = transformer.transform(Path::new("/docs/guide/intro.html"), html, &mut index).unwrap();

    assert_eq!(doc.metadata.title.as_deref(), Some("Intro"));
    assert!(doc.markdown.starts_with("# Intro\n"));
    assert!(doc.markdown.contains("Hello"));
    assert!(!doc.markdown.contains("Skip"));
    assert_eq!(doc.images, vec!["a.png"]);
    assert_eq!(index.len(), 1);
}
