use resviz_core::{MatchKind, ReferenceMatch, format_display_text};
use resviz_parse::ConstantIndex;
use resviz_store::StoreSnapshot;

use crate::alias::AliasTracker;
use crate::similarity::order_by_path_similarity;

#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub snapshot: &'a StoreSnapshot,
    pub constants: &'a ConstantIndex,
    pub aliases: Option<&'a AliasTracker>,
    pub file_path: &'a str,
    pub preferred_culture: &'a str,
}

pub fn resolve(found: &ReferenceMatch, context: &ResolveContext<'_>) -> Option<String> {
    let value = match &found.kind {
        MatchKind::Direct {
            base_name,
            resource_name,
        } => resolve_direct(base_name, resource_name, context),
        MatchKind::LocalizerLiteral { key } => resolve_key(key, context),
        MatchKind::LocalizerConstant {
            qualifier,
            const_name,
        } => {
            let literal = context
                .constants
                .get_display_text(const_name, qualifier, context.file_path)?;
            resolve_key(strip_quotes(&literal), context)
        }
    }?;

    if value.trim().is_empty() {
        return None;
    }

    Some(format_display_text(&value))
}

fn resolve_direct(base_name: &str, resource_name: &str, context: &ResolveContext<'_>) -> Option<String> {
    let base_name = context
        .aliases
        .and_then(|aliases| aliases.target_for(base_name))
        .unwrap_or(base_name);

    context
        .snapshot
        .query(&[base_name], context.preferred_culture)
        .iter()
        .find_map(|table| table.get(resource_name).map(str::to_owned))
}

fn resolve_key(key: &str, context: &ResolveContext<'_>) -> Option<String> {
    if key.is_empty() {
        return None;
    }

    let candidates = context
        .snapshot
        .tables_with_key(key, context.preferred_culture);

    order_by_path_similarity(context.file_path, candidates, context.preferred_culture)
        .first()
        .and_then(|table| table.get(key).map(str::to_owned))
}

fn strip_quotes(literal: &str) -> &str {
    let literal = literal.trim();
    let literal = literal.strip_prefix('@').unwrap_or(literal);
    literal
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(literal)
}

#[cfg(test)]
mod tests {
    use resviz_store::ResourceStore;

    use super::*;

    #[test]
    fn strip_quotes_handles_verbatim_and_bare_values() {
        assert_eq!(strip_quotes("\"Greeting\""), "Greeting");
        assert_eq!(strip_quotes(" @\"Greeting\" "), "Greeting");
        assert_eq!(strip_quotes("Greeting"), "Greeting");
    }

    #[test]
    fn unknown_constant_resolves_to_nothing() {
        let store = ResourceStore::new();
        store.load_tables(&[], Default::default());
        let snapshot = store.current().expect("loaded");
        let constants = ConstantIndex::new("cs");

        let context = ResolveContext {
            snapshot: &snapshot,
            constants: &constants,
            aliases: None,
            file_path: "src/Page.cs",
            preferred_culture: "",
        };
        let found = ReferenceMatch {
            start: 0,
            end: 10,
            text: "localizer[Keys.Missing]".to_owned(),
            kind: MatchKind::LocalizerConstant {
                qualifier: "Keys".to_owned(),
                const_name: "Missing".to_owned(),
            },
        };

        assert!(resolve(&found, &context).is_none());
    }
}
