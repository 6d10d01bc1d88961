use std::fs;
use std::path::Path;
use std::sync::Arc;

use resviz_parse::{ConstExtractor, ConstantIndex};
use tempfile::tempdir;

fn extract(path: &str, source: &str) -> Vec<(String, String, String)> {
    let mut extractor = ConstExtractor::new().expect("extractor");
    extractor
        .extract(path, source)
        .expect("C# extraction")
        .into_iter()
        .map(|entry| (entry.key, entry.qualification, entry.value))
        .collect()
}

#[test]
fn nested_types_are_qualified_outermost_first() {
    let found = extract("tests/fixtures/Keys.cs", include_str!("fixtures/Keys.cs"));

    assert!(found.contains(&(
        "Greeting".to_owned(),
        "App.Localization.Keys".to_owned(),
        "\"Hello\"".to_owned()
    )));
    assert!(found.contains(&(
        "NotFound".to_owned(),
        "App.Localization.Keys.Errors".to_owned(),
        "\"Error_NotFound\"".to_owned()
    )));
    assert!(found.contains(&(
        "Max".to_owned(),
        "App.Localization.Keys.Limits".to_owned(),
        "10".to_owned()
    )));
    assert!(!found.iter().any(|(key, _, _)| key == "Runtime"));
}

#[test]
fn file_scoped_namespaces_qualify_records_and_interfaces() {
    let found = extract(
        "tests/fixtures/FileScoped.cs",
        include_str!("fixtures/FileScoped.cs"),
    );

    assert!(found.contains(&(
        "Title".to_owned(),
        "App.Pages.PageKeys".to_owned(),
        "\"Page_Title\"".to_owned()
    )));
    assert!(found.contains(&(
        "Shared".to_owned(),
        "App.Pages.IKeys".to_owned(),
        "\"Shared_Key\"".to_owned()
    )));
}

fn copy_fixtures(target: &Path) {
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    for name in ["Keys.cs", "FileScoped.cs", "Strings.Designer.cs"] {
        fs::copy(fixtures.join(name), target.join(name)).expect("copy fixture");
    }
}

#[test]
fn full_build_skips_generated_files_and_build_output() {
    let temp = tempdir().expect("tempdir");
    copy_fixtures(temp.path());
    let obj = temp.path().join("obj");
    fs::create_dir_all(&obj).expect("obj dir");
    fs::write(obj.join("Extra.cs"), "class Extra { const string X = \"x\"; }").expect("write obj");

    let index = Arc::new(ConstantIndex::new("cs"));
    let handle = index
        .spawn_full_build(temp.path().to_path_buf())
        .expect("build starts");
    handle.join().expect("build thread");

    assert!(index.is_fully_parsed());
    assert!(!index.is_building());
    assert!(index.get_display_text("ResourceName", "Strings", "").is_none());
    assert!(index.get_display_text("X", "Extra", "").is_none());
    assert_eq!(
        index.get_display_text("Greeting", "Keys", "").as_deref(),
        Some("\"Hello\"")
    );
}

#[test]
fn refresh_after_full_build_updates_only_that_file() {
    let temp = tempdir().expect("tempdir");
    copy_fixtures(temp.path());

    let index = Arc::new(ConstantIndex::new("cs"));
    index.build_full(temp.path()).expect("build");

    let keys = temp.path().join("Keys.cs");
    fs::write(
        &keys,
        "namespace App.Localization { static class Keys { const string Greeting = \"Hi again\"; } }",
    )
    .expect("rewrite keys");

    index.refresh_file(temp.path(), &keys);

    assert_eq!(
        index.get_display_text("Greeting", "Keys", "").as_deref(),
        Some("\"Hi again\"")
    );
    assert!(index.get_display_text("Farewell", "Keys", "").is_none());
    assert_eq!(
        index.get_display_text("Title", "PageKeys", "").as_deref(),
        Some("\"Page_Title\"")
    );
}
