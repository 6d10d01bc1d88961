use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub alias: String,
    pub line: usize,
    pub target: String,
    line_text: String,
}

impl AliasEntry {
    pub fn token(&self) -> String {
        format!("{}.", self.alias)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasUpdate {
    Unchanged,
    Added,
    Cleared,
}

#[derive(Debug, Clone, Default)]
pub struct AliasTracker {
    entries: BTreeMap<usize, AliasEntry>,
}

impl AliasTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_line(
        &mut self,
        line_number: usize,
        text: &str,
        search_terms: &[String],
    ) -> AliasUpdate {
        if let Some(existing) = self.entries.get(&line_number) {
            if existing.line_text == text {
                return AliasUpdate::Unchanged;
            }

            tracing::debug!(line = line_number, "alias declaration edited, clearing aliases");
            self.entries.clear();
            self.record(line_number, text, search_terms);
            return AliasUpdate::Cleared;
        }

        if self.record(line_number, text, search_terms) {
            AliasUpdate::Added
        } else {
            AliasUpdate::Unchanged
        }
    }

    pub fn retain_lines(&mut self, line_count: usize) -> AliasUpdate {
        if self.entries.keys().next_back().is_some_and(|line| *line >= line_count) {
            tracing::debug!(line_count, "alias declaration removed, clearing aliases");
            self.entries.clear();
            return AliasUpdate::Cleared;
        }
        AliasUpdate::Unchanged
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> impl Iterator<Item = &AliasEntry> {
        self.entries.values()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.entries.values().map(AliasEntry::token).collect()
    }

    pub fn target_for(&self, alias: &str) -> Option<&str> {
        self.entries
            .values()
            .find(|entry| entry.alias == alias)
            .map(|entry| entry.target.as_str())
    }

    fn record(&mut self, line_number: usize, text: &str, search_terms: &[String]) -> bool {
        let Some((alias, target)) = parse_alias_declaration(text, search_terms) else {
            return false;
        };

        self.entries.insert(
            line_number,
            AliasEntry {
                alias,
                line: line_number,
                target,
                line_text: text.to_owned(),
            },
        );
        true
    }
}

pub fn parse_alias_declaration(text: &str, search_terms: &[String]) -> Option<(String, String)> {
    let rest = text.trim().strip_prefix("using")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let (alias, target) = rest.split_once('=')?;
    let alias = alias.trim();
    if alias.is_empty() || !alias.chars().all(|ch| ch.is_alphanumeric() || ch == '_') {
        return None;
    }

    let target = target.trim().trim_end_matches(';').trim();
    let base_name = search_terms
        .iter()
        .filter_map(|term| term.strip_suffix('.'))
        .filter(|base| {
            target == *base
                || target
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
        .max_by_key(|base| base.len())?;

    Some((alias.to_owned(), base_name.to_owned()))
}
