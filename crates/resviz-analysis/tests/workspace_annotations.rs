use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use resviz_analysis::Workspace;
use resviz_config::ResvizConfig;
use tempfile::tempdir;

fn write_resx(path: &Path, pairs: &[(&str, &str)]) {
    let mut body = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<root>\n");
    for (name, value) in pairs {
        body.push_str(&format!(
            "  <data name=\"{name}\" xml:space=\"preserve\">\n    <value>{value}</value>\n  </data>\n"
        ));
    }
    body.push_str("</root>\n");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create resource dir");
    }
    fs::write(path, body).expect("write resx");
}

fn config(preferred_culture: &str) -> ResvizConfig {
    let mut config = ResvizConfig::default();
    config.display.preferred_culture = preferred_culture.to_owned();
    config
}

fn loaded(root: &Path, preferred_culture: &str) -> Workspace {
    let workspace = Workspace::new(root, config(preferred_culture));
    workspace.reload_resources();
    workspace.build_constants();
    workspace
}

fn texts(annotations: &[resviz_core::Annotation]) -> Vec<&str> {
    annotations
        .iter()
        .map(|annotation| annotation.display_text.as_str())
        .collect()
}

#[test]
fn direct_reference_resolves_to_table_value() {
    let temp = tempdir().expect("tempdir");
    write_resx(&temp.path().join("Strings.resx"), &[("Hello", "Hi")]);

    let workspace = loaded(temp.path(), "");
    let annotations = workspace.annotate_line("Page.cs", 4, "var x = Strings.Hello;");

    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].line, 4);
    assert_eq!(annotations[0].start_column, 8);
    assert_eq!(annotations[0].end_column, 21);
    assert_eq!(annotations[0].display_text, "Hi");
}

#[test]
fn preferred_culture_value_wins_over_neutral() {
    let temp = tempdir().expect("tempdir");
    write_resx(&temp.path().join("Strings.resx"), &[("K", "A")]);
    write_resx(&temp.path().join("Strings.fr.resx"), &[("K", "B")]);

    let french = loaded(temp.path(), "fr");
    assert_eq!(texts(&french.annotate_line("Page.cs", 0, "Strings.K")), vec!["B"]);

    let neutral = loaded(temp.path(), "");
    assert_eq!(texts(&neutral.annotate_line("Page.cs", 0, "Strings.K")), vec!["A"]);
}

#[test]
fn neutral_value_is_used_when_culture_table_lacks_key() {
    let temp = tempdir().expect("tempdir");
    write_resx(&temp.path().join("Strings.resx"), &[("OnlyNeutral", "fallback")]);
    write_resx(&temp.path().join("Strings.fr.resx"), &[("Other", "autre")]);

    let workspace = loaded(temp.path(), "fr");
    assert_eq!(
        texts(&workspace.annotate_line("Page.cs", 0, "Strings.OnlyNeutral")),
        vec!["fallback"]
    );
}

#[test]
fn alias_resolves_like_the_base_name() {
    let temp = tempdir().expect("tempdir");
    write_resx(&temp.path().join("Strings.resx"), &[("Greeting", "Welcome")]);

    let workspace = loaded(temp.path(), "");
    let source = "using R = App.Resources.Strings;\n\nclass Page { string A = R.Greeting; string B = Strings.Greeting; }\n";
    let annotations = workspace.annotate_document("Page.cs", source);

    assert_eq!(texts(&annotations), vec!["Welcome", "Welcome"]);
    assert!(annotations.iter().all(|annotation| annotation.line == 2));
}

#[test]
fn deleting_a_trailing_alias_declaration_stops_resolving_it() {
    let temp = tempdir().expect("tempdir");
    write_resx(&temp.path().join("Strings.resx"), &[("Greeting", "Welcome")]);

    let workspace = loaded(temp.path(), "");
    let before =
        workspace.annotate_document("Page.cs", "var a = R.Greeting;\nusing R = App.Strings;\n");
    assert_eq!(texts(&before), vec!["Welcome"]);

    let after = workspace.annotate_document("Page.cs", "var a = R.Greeting;\n");
    assert!(after.is_empty());
}

#[test]
fn aliases_can_be_switched_off() {
    let temp = tempdir().expect("tempdir");
    write_resx(&temp.path().join("Strings.resx"), &[("Greeting", "Welcome")]);

    let mut config = config("");
    config.display.support_namespace_aliases = false;
    let workspace = Workspace::new(temp.path(), config);
    workspace.reload_resources();

    let annotations =
        workspace.annotate_document("Page.cs", "using R = App.Strings;\nvar a = R.Greeting;\n");
    assert!(annotations.is_empty());
}

#[test]
fn constant_keyed_localizer_resolves_through_the_constant() {
    let temp = tempdir().expect("tempdir");
    write_resx(&temp.path().join("Resources/Shared.resx"), &[("Greeting", "Hello there")]);
    fs::write(
        temp.path().join("Keys.cs"),
        "namespace App { public static class Keys { public const string Greeting = \"Greeting\"; } }",
    )
    .expect("write keys");

    let workspace = loaded(temp.path(), "");
    let file = temp.path().join("Keys.cs");
    let annotations = workspace.annotate_line(
        &file.to_string_lossy(),
        0,
        "var text = localizer[Keys.Greeting];",
    );

    assert_eq!(texts(&annotations), vec!["Hello there"]);
}

fn wait_for(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(25));
    }
    check()
}

#[test]
fn opened_workspace_follows_resource_and_constant_edits() {
    let temp = tempdir().expect("tempdir");
    let resources = temp.path().join("Strings.resx");
    write_resx(&resources, &[("Hello", "Hi"), ("Farewell", "Bye")]);
    let keys = temp.path().join("Keys.cs");
    fs::write(
        &keys,
        "namespace App { class Keys { const string Key = \"Hello\"; } }",
    )
    .expect("write keys");

    let mut config = config("");
    config.watch.debounce_ms = 50;
    config.watch.poll_interval_ms = 50;
    let workspace = Workspace::open(temp.path(), config);
    assert!(wait_for(|| workspace.constants().is_fully_parsed()));

    let page = temp.path().join("Page.cs").to_string_lossy().into_owned();
    let direct = || texts(&workspace.annotate_line(&page, 0, "Strings.Hello")).join("|");
    let keyed = || texts(&workspace.annotate_line(&page, 0, "localizer[Keys.Key]")).join("|");
    assert_eq!(direct(), "Hi");
    assert_eq!(keyed(), "Hi");

    let generation = workspace.generation();
    write_resx(&resources, &[("Hello", "Hello again"), ("Farewell", "Bye")]);
    assert!(wait_for(|| direct() == "Hello again"));
    assert_ne!(workspace.generation(), generation);

    fs::write(
        &keys,
        "namespace App { class Keys { const string Key = \"Farewell\"; } }",
    )
    .expect("rewrite keys");
    assert!(wait_for(|| keyed() == "Bye"));

    workspace.close();
}

#[test]
fn literal_localizer_key_prefers_the_nearest_table() {
    let temp = tempdir().expect("tempdir");
    write_resx(
        &temp.path().join("Resources/Controllers/AboutController.resx"),
        &[("Title", "About")],
    );
    write_resx(
        &temp.path().join("Resources/Controllers/HomeController.resx"),
        &[("Title", "Home")],
    );

    let workspace = loaded(temp.path(), "");
    let file = temp.path().join("Controllers/HomeController.cs");
    let annotations = workspace.annotate_line(
        &file.to_string_lossy(),
        0,
        "ViewData[\"Title\"] = _localizer[\"Title\"];",
    );

    assert_eq!(texts(&annotations), vec!["Home"]);
}

#[test]
fn multi_line_values_are_truncated_and_blank_values_hidden() {
    let temp = tempdir().expect("tempdir");
    write_resx(
        &temp.path().join("Strings.resx"),
        &[("Multi", "first line\nsecond line"), ("Blank", "   ")],
    );

    let workspace = loaded(temp.path(), "");
    assert_eq!(
        texts(&workspace.annotate_line("Page.cs", 0, "Strings.Multi")),
        vec!["first line⏎"]
    );
    assert!(workspace.annotate_line("Page.cs", 0, "Strings.Blank").is_empty());
}

#[test]
fn unknown_names_produce_nothing() {
    let temp = tempdir().expect("tempdir");
    write_resx(&temp.path().join("Strings.resx"), &[("Hello", "Hi")]);

    let workspace = loaded(temp.path(), "");
    assert!(workspace
        .annotate_line("Page.cs", 0, "Strings.Missing + Other.Hello")
        .is_empty());
}

#[test]
fn empty_workspace_yields_no_annotations() {
    let temp = tempdir().expect("tempdir");
    let workspace = loaded(temp.path(), "");

    assert!(workspace.store().current().expect("loaded").search_terms().is_empty());
    assert!(workspace
        .annotate_line("Page.cs", 0, "var x = Strings.Hello; localizer[\"Hello\"]")
        .is_empty());
}

#[test]
fn nothing_is_annotated_before_load_or_after_close() {
    let temp = tempdir().expect("tempdir");
    write_resx(&temp.path().join("Strings.resx"), &[("Hello", "Hi")]);

    let workspace = Workspace::new(temp.path(), config(""));
    assert!(workspace.annotate_line("Page.cs", 0, "Strings.Hello").is_empty());

    workspace.reload_resources();
    assert_eq!(workspace.annotate_line("Page.cs", 0, "Strings.Hello").len(), 1);

    workspace.close();
    assert!(workspace.annotate_line("Page.cs", 0, "Strings.Hello").is_empty());
    assert!(workspace.constants().is_empty());
}

#[test]
fn discovery_skips_build_output_and_other_cultures() {
    let temp = tempdir().expect("tempdir");
    write_resx(&temp.path().join("Strings.resx"), &[("K", "A")]);
    write_resx(&temp.path().join("Strings.fr.resx"), &[("K", "B")]);
    write_resx(&temp.path().join("Strings.de.resx"), &[("K", "C")]);
    write_resx(&temp.path().join("obj/Debug/Strings.resx"), &[("K", "D")]);

    let workspace = Workspace::new(temp.path(), config("fr"));
    let found = workspace
        .discover_resource_files()
        .into_iter()
        .map(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>();

    assert_eq!(found, vec!["Strings.fr.resx", "Strings.resx"]);
}
