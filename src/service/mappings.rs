//! Mapping resolution — stored override rules, then platform lookup.

use crate::db::mappings::{Mapping, MappingKind, MatchKind, normalize_uid};
use crate::platform::MappingLookup;
use crate::token::Token;

fn pattern_matches(m: &Mapping, value: &str) -> bool {
    match m.match_kind {
        MatchKind::Exact => value == m.pattern,
        MatchKind::Partial => value.contains(&m.pattern),
        MatchKind::Regex => match regex::Regex::new(&m.pattern) {
            Ok(re) => re.is_match(value),
            Err(e) => {
                tracing::error!(pattern = %m.pattern, error = %e, "invalid mapping regex");
                false
            }
        },
    }
}

/// Resolve a token's launch text override.
///
/// Walks `mappings` in persistence order, first match wins; UIDs are
/// normalized before comparison. Falls back to the platform's own
/// lookup. Returns `None` when nothing matched.
pub fn resolve(mappings: &[Mapping], platform: &dyn MappingLookup, token: &Token) -> Option<String> {
    for m in mappings {
        if !m.enabled {
            continue;
        }
        let value = match m.kind {
            MappingKind::Uid => normalize_uid(&token.uid),
            MappingKind::Text => token.text.clone(),
            MappingKind::Data => token.data.clone(),
        };
        if pattern_matches(m, &value) {
            tracing::info!(id = %m.id, label = %m.label, "token matched stored mapping");
            return Some(m.override_text.clone());
        }
    }

    platform.lookup_mapping(token)
}
