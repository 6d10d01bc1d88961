use std::path::Path;
use std::sync::Arc;

use resviz_core::{ResourceTable, path_segments};

/// Orders `tables` so the one laid out closest to `file_path` comes first.
///
/// Many tables can define the same localizer key. Starting at the scanned
/// file's own directory and walking outwards, each level tries
/// `{dir}/{file_base}/{culture}`, `{dir}/{culture}/{file_base}` and
/// `{dir}/{file_base}` against the end of every table's path. The first table
/// that matches is moved to the front; the rest keep their order.
pub fn order_by_path_similarity(
    file_path: &str,
    tables: Vec<Arc<ResourceTable>>,
    preferred_culture: &str,
) -> Vec<Arc<ResourceTable>> {
    if tables.len() < 2 {
        return tables;
    }

    let file_segments = path_segments(file_path);
    let Some((file_name, file_dirs)) = file_segments.split_last() else {
        return tables;
    };
    let file_base = Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.clone());

    let candidates = tables
        .iter()
        .map(|table| TablePath::new(table))
        .collect::<Vec<_>>();

    let shared = candidates
        .iter()
        .map(|candidate| common_prefix_len(file_dirs, &candidate.full))
        .min()
        .unwrap_or(0);
    let relative_dirs = &file_dirs[shared.min(file_dirs.len())..];

    let Some(best) = closest(relative_dirs, &file_base, preferred_culture, &candidates) else {
        return tables;
    };

    let mut ordered = Vec::with_capacity(tables.len());
    ordered.push(Arc::clone(&tables[best]));
    ordered.extend(
        tables
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != best)
            .map(|(_, table)| Arc::clone(table)),
    );
    ordered
}

struct TablePath {
    full: Vec<String>,
    neutral: Vec<String>,
}

impl TablePath {
    fn new(table: &ResourceTable) -> Self {
        let mut segments = path_segments(&table.path);
        segments.pop();

        let mut neutral = segments.clone();
        neutral.push(table.base_name.clone());

        let mut full = neutral.clone();
        if let Some(culture) = table.culture.as_ref() {
            full.push(culture.clone());
        }

        Self { full, neutral }
    }
}

fn closest(
    relative_dirs: &[String],
    file_base: &str,
    preferred_culture: &str,
    candidates: &[TablePath],
) -> Option<usize> {
    for level in (0..=relative_dirs.len()).rev() {
        let dir = &relative_dirs[relative_dirs.len() - level..];

        let mut forms = Vec::with_capacity(3);
        if !preferred_culture.is_empty() {
            forms.push((form(dir, &[file_base, preferred_culture]), false));
            forms.push((form(dir, &[preferred_culture, file_base]), false));
        }
        forms.push((form(dir, &[file_base]), true));

        for (form, neutral) in &forms {
            let found = candidates.iter().position(|candidate| {
                let path = if *neutral {
                    &candidate.neutral
                } else {
                    &candidate.full
                };
                ends_with_segments(path, form)
            });

            if found.is_some() {
                return found;
            }
        }
    }

    None
}

fn form(dir: &[String], tail: &[&str]) -> Vec<String> {
    dir.iter()
        .cloned()
        .chain(tail.iter().map(|segment| (*segment).to_owned()))
        .collect()
}

fn ends_with_segments(path: &[String], suffix: &[String]) -> bool {
    suffix.len() <= path.len()
        && path[path.len() - suffix.len()..]
            .iter()
            .zip(suffix)
            .all(|(left, right)| left.eq_ignore_ascii_case(right))
}

fn common_prefix_len(left: &[String], right: &[String]) -> usize {
    left.iter()
        .zip(right)
        .take_while(|(a, b)| a.eq_ignore_ascii_case(b))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(path: &str) -> Arc<ResourceTable> {
        Arc::new(ResourceTable::new(
            path,
            vec![("Title".to_owned(), path.to_owned())],
            path.as_bytes(),
        ))
    }

    fn paths(tables: &[Arc<ResourceTable>]) -> Vec<&str> {
        tables.iter().map(|table| table.path.as_str()).collect()
    }

    #[test]
    fn table_named_after_the_file_wins() {
        let ordered = order_by_path_similarity(
            "/repo/Web/Controllers/HomeController.cs",
            vec![
                table("/repo/Web/Resources/Shared.resx"),
                table("/repo/Web/Resources/Controllers/AboutController.resx"),
                table("/repo/Web/Resources/Controllers/HomeController.resx"),
            ],
            "",
        );

        assert_eq!(
            paths(&ordered),
            vec![
                "/repo/Web/Resources/Controllers/HomeController.resx",
                "/repo/Web/Resources/Shared.resx",
                "/repo/Web/Resources/Controllers/AboutController.resx",
            ]
        );
    }

    #[test]
    fn culture_forms_are_tried_before_the_neutral_form() {
        let ordered = order_by_path_similarity(
            "/repo/Web/Controllers/HomeController.cs",
            vec![
                table("/repo/Web/Resources/Controllers/HomeController.resx"),
                table("/repo/Web/Resources/Controllers/fr/HomeController.resx"),
            ],
            "fr",
        );

        assert_eq!(
            ordered[0].path,
            "/repo/Web/Resources/Controllers/fr/HomeController.resx"
        );
    }

    #[test]
    fn dotted_culture_file_matches_file_then_culture_form() {
        let ordered = order_by_path_similarity(
            "/repo/Web/Controllers/HomeController.cs",
            vec![
                table("/repo/Web/Resources/Shared.fr.resx"),
                table("/repo/Web/Resources/Controllers/HomeController.fr.resx"),
            ],
            "fr",
        );

        assert_eq!(
            ordered[0].path,
            "/repo/Web/Resources/Controllers/HomeController.fr.resx"
        );
    }

    #[test]
    fn more_specific_directory_level_wins() {
        let ordered = order_by_path_similarity(
            "/repo/Web/Areas/Admin/Index.cs",
            vec![
                table("/repo/Web/Resources/Index.resx"),
                table("/repo/Web/Resources/Admin/Index.resx"),
            ],
            "",
        );

        assert_eq!(ordered[0].path, "/repo/Web/Resources/Admin/Index.resx");
    }

    #[test]
    fn no_match_keeps_query_order() {
        let tables = vec![table("/repo/A/One.resx"), table("/repo/B/Two.resx")];
        let ordered = order_by_path_similarity("/repo/C/Page.cs", tables, "fr");
        assert_eq!(paths(&ordered), vec!["/repo/A/One.resx", "/repo/B/Two.resx"]);
    }
}
