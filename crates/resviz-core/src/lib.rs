mod culture;
mod display;

use std::path::Path;

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::{Deserialize, Serialize};

pub use culture::{ResourceFileName, is_culture_tag, is_resource_of_interest};
pub use display::{LINE_BREAK_MARKER, format_display_text};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTable {
    pub path: String,
    pub base_name: String,
    pub culture: Option<String>,
    pub entries: IndexMap<String, String>,
    pub content_hash: String,
}

impl ResourceTable {
    pub fn new(
        path: &str,
        pairs: impl IntoIterator<Item = (String, String)>,
        raw_content: &[u8],
    ) -> Self {
        let path = normalize_path(path);
        let file_name = ResourceFileName::parse(&path);

        let mut entries = IndexMap::new();
        for (name, value) in pairs {
            if let Entry::Vacant(slot) = entries.entry(name) {
                slot.insert(value);
            }
        }

        Self {
            path,
            base_name: file_name.base_name,
            culture: file_name.culture,
            entries,
            content_hash: content_hash(raw_content),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn is_neutral(&self) -> bool {
        self.culture.is_none()
    }

    pub fn has_culture(&self, culture: &str) -> bool {
        !culture.is_empty()
            && self
                .culture
                .as_deref()
                .is_some_and(|own| own.eq_ignore_ascii_case(culture))
    }

    pub fn search_term(&self) -> String {
        search_term(&self.base_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    Direct {
        base_name: String,
        resource_name: String,
    },
    LocalizerLiteral {
        key: String,
    },
    LocalizerConstant {
        qualifier: String,
        const_name: String,
    },
}

/// One candidate reference found on a line. `start` and `end` are byte offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceMatch {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub kind: MatchKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstEntry {
    pub key: String,
    pub qualification: String,
    pub value: String,
    pub source_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub line: usize,
    pub start_column: usize,
    pub end_column: usize,
    pub display_text: String,
}

pub fn search_term(base_name: &str) -> String {
    format!("{base_name}.")
}

pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

pub fn path_segments(path: &str) -> Vec<String> {
    normalize_path(path)
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .map(str::to_owned)
        .collect()
}

pub fn content_hash(content: &[u8]) -> String {
    blake3::hash(content).to_hex().to_string()
}

pub fn utf16_column(line: &str, byte_offset: usize) -> u32 {
    let mut end = byte_offset.min(line.len());
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    line[..end].encode_utf16().count() as u32
}

pub fn is_ignored_path(path: &Path) -> bool {
    path.components().any(|component| {
        let part = component.as_os_str().to_string_lossy();
        part == ".git" || part == ".vs" || part == ".resviz" || part == "bin" || part == "obj"
    })
}

pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
}

pub fn first_physical_line(text: &str) -> &str {
    match text.find(['\r', '\n']) {
        Some(index) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_table_keeps_first_duplicate_and_parses_culture() {
        let table = ResourceTable::new(
            "C:\\src\\App\\Strings.fr-FR.resx",
            vec![
                ("Hello".to_owned(), "Bonjour".to_owned()),
                ("Hello".to_owned(), "Salut".to_owned()),
                ("Bye".to_owned(), "Au revoir".to_owned()),
            ],
            b"raw",
        );

        assert_eq!(table.path, "C:/src/App/Strings.fr-FR.resx");
        assert_eq!(table.base_name, "Strings");
        assert_eq!(table.culture.as_deref(), Some("fr-FR"));
        assert_eq!(table.get("Hello"), Some("Bonjour"));
        assert_eq!(table.entries.len(), 2);
        assert!(table.has_culture("fr-fr"));
        assert!(!table.has_culture(""));
        assert_eq!(table.search_term(), "Strings.");
    }

    #[test]
    fn identical_input_produces_equal_tables() {
        let pairs = || vec![("K".to_owned(), "V".to_owned())];
        let a = ResourceTable::new("res/Strings.resx", pairs(), b"<root/>");
        let b = ResourceTable::new("res/Strings.resx", pairs(), b"<root/>");
        assert_eq!(a, b);
    }

    #[test]
    fn path_segments_normalize_separators() {
        assert_eq!(
            path_segments("C:\\repo\\./src//App/File.cs"),
            vec!["C:", "repo", "src", "App", "File.cs"]
        );
        assert_eq!(path_segments("/repo/a"), vec!["repo", "a"]);
    }

    #[test]
    fn utf16_column_counts_code_units() {
        let line = "é = Strings.Hello;";
        let byte_offset = line.find("Strings").expect("token present");
        assert_eq!(byte_offset, 5);
        assert_eq!(utf16_column(line, byte_offset), 4);
        assert_eq!(utf16_column(line, 1), 0);
        assert_eq!(utf16_column(line, 999), line.encode_utf16().count() as u32);
    }

    #[test]
    fn ignored_paths_cover_build_output() {
        assert!(is_ignored_path(Path::new("src/App/obj/Debug/Strings.resx")));
        assert!(is_ignored_path(Path::new(".git/config")));
        assert!(!is_ignored_path(Path::new("src/App/Resources/Strings.resx")));
        assert!(has_extension(Path::new("a/Strings.RESX"), "resx"));
        assert!(!has_extension(Path::new("a/Strings.resx.bak"), "resx"));
    }

    #[test]
    fn first_physical_line_stops_at_any_line_break() {
        assert_eq!(first_physical_line("a = R.X;\r\n b"), "a = R.X;");
        assert_eq!(first_physical_line("only"), "only");
    }
}
