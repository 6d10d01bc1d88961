use resviz_core::{MatchKind, ReferenceMatch, first_physical_line};

pub const DELIMITERS: [char; 9] = [' ', '.', ',', '"', '(', ')', '{', '}', ';'];

pub const LOCALIZER_MARKER: &str = "localizer[";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub localizer_syntax: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            localizer_syntax: true,
        }
    }
}

pub fn scan_line(
    line: &str,
    search_terms: &[String],
    alias_tokens: &[String],
    options: ScanOptions,
) -> Vec<ReferenceMatch> {
    if search_terms.is_empty() {
        return Vec::new();
    }

    let line = first_physical_line(line);
    let mut matches = token_matches(line, search_terms, alias_tokens);

    if options.localizer_syntax {
        matches.extend(localizer_matches(line));
        matches.sort_by_key(|found| found.start);
    }

    matches
}

fn token_matches(line: &str, search_terms: &[String], alias_tokens: &[String]) -> Vec<ReferenceMatch> {
    let mut matches = Vec::new();

    for (start, _) in line.char_indices() {
        let rest = &line[start..];
        let Some(token) = search_terms
            .iter()
            .chain(alias_tokens)
            .filter(|token| !token.is_empty() && rest.starts_with(token.as_str()))
            .max_by_key(|token| token.len())
        else {
            continue;
        };

        let name_start = start + token.len();
        let end = line[name_start..]
            .find(DELIMITERS)
            .map_or(line.len(), |offset| name_start + offset);

        let resource_name = &line[name_start..end];
        if resource_name.is_empty() {
            continue;
        }

        matches.push(ReferenceMatch {
            start,
            end,
            text: line[start..end].to_owned(),
            kind: MatchKind::Direct {
                base_name: token.trim_end_matches('.').to_owned(),
                resource_name: resource_name.to_owned(),
            },
        });
    }

    matches
}

fn localizer_matches(line: &str) -> Vec<ReferenceMatch> {
    let lowered = line.to_ascii_lowercase();
    let mut matches = Vec::new();
    let mut from = 0;

    while let Some(offset) = lowered[from..].find(LOCALIZER_MARKER) {
        let start = from + offset;
        let content_start = start + LOCALIZER_MARKER.len();
        let (content_end, end) = match line[content_start..].find(']') {
            Some(close) => (content_start + close, content_start + close + 1),
            None => (line.len(), line.len()),
        };

        if let Some(kind) = localizer_kind(&line[content_start..content_end]) {
            matches.push(ReferenceMatch {
                start,
                end,
                text: line[start..end].to_owned(),
                kind,
            });
        }

        from = start + 1;
    }

    matches
}

fn localizer_kind(content: &str) -> Option<MatchKind> {
    let content = content.trim();
    if content.is_empty() {
        return None;
    }

    if let Some(quoted) = content.strip_prefix('"') {
        let key = quoted.split('"').next().unwrap_or_default();
        return (!key.is_empty()).then(|| MatchKind::LocalizerLiteral {
            key: key.to_owned(),
        });
    }

    let (qualifier, const_name) = content.rsplit_once('.').unwrap_or(("", content));
    let const_name = const_name.trim();
    (!const_name.is_empty()).then(|| MatchKind::LocalizerConstant {
        qualifier: qualifier.trim().to_owned(),
        const_name: const_name.to_owned(),
    })
}
