use std::path::Path;

use anyhow::{Context, Result, anyhow};
use resviz_core::{ConstEntry, normalize_path};
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Parser, Query, QueryCursor};

const FIELD_QUERY: &str = "(field_declaration) @field";

const TYPE_SCOPES: &[&str] = &[
    "class_declaration",
    "struct_declaration",
    "record_declaration",
    "record_struct_declaration",
    "interface_declaration",
];

pub struct ConstExtractor {
    parser: Parser,
    query: Query,
}

impl ConstExtractor {
    pub fn new() -> Result<Self> {
        let language: tree_sitter::Language = tree_sitter_c_sharp::LANGUAGE.into();

        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .context("failed to load C# tree-sitter grammar")?;

        let query = Query::new(&language, FIELD_QUERY).context("failed to compile field query")?;

        Ok(Self { parser, query })
    }

    pub fn extract_from_path(&mut self, path: &Path) -> Result<Vec<ConstEntry>> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        self.extract(&path.to_string_lossy(), &source)
    }

    pub fn extract(&mut self, file_path: &str, source: &str) -> Result<Vec<ConstEntry>> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| anyhow!("tree-sitter parser produced no syntax tree"))?;

        let source_file = normalize_path(file_path);
        let source_bytes = source.as_bytes();
        let root = tree.root_node();

        let mut entries = Vec::new();
        let mut cursor = QueryCursor::new();
        let mut query_matches = cursor.matches(&self.query, root, source_bytes);

        while let Some(matched) = query_matches.next() {
            for capture in matched.captures {
                collect_field(capture.node, root, source_bytes, &source_file, &mut entries);
            }
        }

        Ok(entries)
    }
}

pub fn is_generated_source(path: &str) -> bool {
    let file_name = normalize_path(path)
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    file_name.contains(".g.") || file_name.contains(".designer.")
}

fn collect_field(
    field: Node<'_>,
    root: Node<'_>,
    source: &[u8],
    source_file: &str,
    entries: &mut Vec<ConstEntry>,
) {
    if !is_const(field, source) {
        return;
    }

    let mut walker = field.walk();
    let Some(declaration) = field
        .children(&mut walker)
        .find(|child| child.kind() == "variable_declaration")
    else {
        return;
    };

    let qualification = qualification(field, root, source);

    let mut declarators = declaration.walk();
    for declarator in declaration
        .children(&mut declarators)
        .filter(|child| child.kind() == "variable_declarator")
    {
        let Some(name) = declarator_name(declarator, source) else {
            continue;
        };
        let Some(value) = initializer(declarator) else {
            continue;
        };

        entries.push(ConstEntry {
            key: name,
            qualification: qualification.clone(),
            value: node_text(value, source).replace("\\\"", "\""),
            source_file: source_file.to_owned(),
        });
    }
}

fn is_const(field: Node<'_>, source: &[u8]) -> bool {
    let mut walker = field.walk();
    let is_const = field.children(&mut walker).any(|child| {
        child.kind() == "const"
            || (child.kind() == "modifier" && node_text(child, source).trim() == "const")
    });
    is_const
}

fn declarator_name(declarator: Node<'_>, source: &[u8]) -> Option<String> {
    let node = match declarator.child_by_field_name("name") {
        Some(node) => node,
        None => {
            let mut walker = declarator.walk();
            let first = declarator
                .children(&mut walker)
                .find(|child| child.kind() == "identifier");
            first?
        }
    };

    let name = node_text(node, source).trim().to_owned();
    (!name.is_empty()).then_some(name)
}

fn initializer(declarator: Node<'_>) -> Option<Node<'_>> {
    let mut walker = declarator.walk();
    let mut after_equals = false;

    for child in declarator.children(&mut walker) {
        if child.kind() == "equals_value_clause" {
            let mut inner = child.walk();
            let value = child.named_children(&mut inner).next();
            return value;
        }
        if after_equals && child.is_named() {
            return Some(child);
        }
        if child.kind() == "=" {
            after_equals = true;
        }
    }

    None
}

fn qualification(node: Node<'_>, root: Node<'_>, source: &[u8]) -> String {
    let mut context = Vec::new();
    let mut file_scoped = false;
    let mut current = node.parent();

    while let Some(cursor) = current {
        let kind = cursor.kind();
        if TYPE_SCOPES.contains(&kind) || kind == "namespace_declaration" {
            if let Some(name) = named_child_text(cursor, "name", source) {
                context.push(name);
            }
        } else if kind == "file_scoped_namespace_declaration" {
            file_scoped = true;
            if let Some(name) = named_child_text(cursor, "name", source) {
                context.push(name);
            }
        }

        current = cursor.parent();
    }

    // Newer grammars make a file-scoped namespace a sibling of the types it
    // covers rather than their parent.
    if !file_scoped && let Some(name) = file_scoped_namespace_before(root, node.start_byte(), source)
    {
        context.push(name);
    }

    context.reverse();
    context.join(".")
}

fn file_scoped_namespace_before(root: Node<'_>, offset: usize, source: &[u8]) -> Option<String> {
    let mut walker = root.walk();
    let namespace = root.named_children(&mut walker).find(|child| {
        child.kind() == "file_scoped_namespace_declaration" && child.start_byte() <= offset
    });
    namespace.and_then(|node| named_child_text(node, "name", source))
}

fn named_child_text(node: Node<'_>, field: &str, source: &[u8]) -> Option<String> {
    let text = node_text(node.child_by_field_name(field)?, source)
        .trim()
        .to_owned();
    (!text.is_empty()).then_some(text)
}

fn node_text(node: Node<'_>, source: &[u8]) -> String {
    String::from_utf8_lossy(&source[node.byte_range()]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(source: &str) -> Vec<ConstEntry> {
        let mut extractor = ConstExtractor::new().expect("extractor");
        extractor.extract("src/Keys.cs", source).expect("extract")
    }

    #[test]
    fn grammar_is_compatible_with_the_runtime() {
        let language: tree_sitter::Language = tree_sitter_c_sharp::LANGUAGE.into();
        let version = language.version();
        assert!(
            (tree_sitter::MIN_COMPATIBLE_LANGUAGE_VERSION..=tree_sitter::LANGUAGE_VERSION)
                .contains(&version),
            "C# grammar ABI {version} is not loadable by this tree-sitter"
        );
        assert!(ConstExtractor::new().is_ok());
    }

    #[test]
    fn records_const_fields_with_namespace_and_class() {
        let entries = extract(
            r#"
namespace App
{
    public static class Keys
    {
        public const string Greeting = "Hello";
        public static readonly string NotConst = "ignored";
        private const int Count = 3;
    }
}
"#,
        );

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "Greeting");
        assert_eq!(entries[0].qualification, "App.Keys");
        assert_eq!(entries[0].value, "\"Hello\"");
        assert_eq!(entries[0].source_file, "src/Keys.cs");
        assert_eq!(entries[1].key, "Count");
        assert_eq!(entries[1].value, "3");
    }

    #[test]
    fn multiple_declarators_share_qualification() {
        let entries = extract(
            r#"
class Keys
{
    const string First = "one", Second = "two";
}
"#,
        );

        let keys = entries
            .iter()
            .map(|entry| (entry.key.as_str(), entry.qualification.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(keys, vec![("First", "Keys"), ("Second", "Keys")]);
    }

    #[test]
    fn escaped_quotes_are_unescaped() {
        let entries = extract(
            r#"
class Keys
{
    const string Quoted = "say \"hi\"";
}
"#,
        );

        assert_eq!(entries[0].value, "\"say \"hi\"\"");
    }

    #[test]
    fn generated_sources_are_recognized() {
        assert!(is_generated_source("obj/Debug/App.g.cs"));
        assert!(is_generated_source("obj/Debug/MainPage.g.i.cs"));
        assert!(is_generated_source("Properties\\Resources.Designer.cs"));
        assert!(!is_generated_source("src/Keys.cs"));
        assert!(!is_generated_source("src/g/Keys.cs"));
    }
}
