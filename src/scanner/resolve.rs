//! Candidate resolution
//!
//! Takes a raw candidate string from a recognizer and pins it to a canonical
//! catalog entry: normalize, try the exact catalog lookup, then fall back to a
//! bidirectional substring scan over the already-loaded summary list. Never
//! fabricates a match.

use tracing::debug;

use crate::catalog::{CatalogError, PokemonDetail, PokemonSummary};

/// Normalize a raw candidate into a lookup token: strip punctuation, trim,
/// lowercase, keep the first whitespace-delimited word.
pub fn normalize_candidate(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();

    let token = cleaned.split_whitespace().next()?.to_lowercase();
    if token.len() < 2 {
        return None;
    }
    Some(token)
}

/// Scan the loaded summary list. An exact name match wins over containment;
/// otherwise the first entry in catalog order with bidirectional substring
/// containment is returned. No scoring, no edit distance.
pub fn resolve_in_memory<'a>(
    candidate: &str,
    summaries: &'a [PokemonSummary],
) -> Option<&'a PokemonSummary> {
    let candidate = candidate.trim().to_lowercase();
    if candidate.is_empty() {
        return None;
    }

    if let Some(exact) = summaries.iter().find(|s| s.name == candidate) {
        return Some(exact);
    }

    summaries
        .iter()
        .find(|s| s.name.contains(&candidate) || candidate.contains(&s.name))
}

/// Resolve a raw candidate against the catalog.
///
/// `lookup` performs the exact catalog fetch (by normalized token); on any
/// lookup failure the in-memory containment fallback runs against the raw
/// candidate. `None` means the candidate matches nothing known.
pub fn resolve_with<L>(
    raw_candidate: &str,
    summaries: &[PokemonSummary],
    lookup: L,
) -> Option<PokemonSummary>
where
    L: Fn(&str) -> Result<PokemonDetail, CatalogError>,
{
    if let Some(token) = normalize_candidate(raw_candidate) {
        match lookup(&token) {
            Ok(detail) => return Some(detail.summary()),
            Err(e) => {
                debug!("Exact lookup for '{}' failed ({}), trying containment", token, e);
            }
        }
    }

    resolve_in_memory(raw_candidate, summaries).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summaries() -> Vec<PokemonSummary> {
        ["pikachu", "raichu", "bulbasaur"]
            .iter()
            .enumerate()
            .map(|(i, name)| PokemonSummary {
                id: i as u32 + 1,
                name: name.to_string(),
                types: vec!["electric".to_string()],
                artwork_url: None,
            })
            .collect()
    }

    fn failing_lookup(_key: &str) -> Result<PokemonDetail, CatalogError> {
        Err(CatalogError::NotFound("stub".to_string()))
    }

    #[test]
    fn test_normalize_strips_and_takes_first_token() {
        assert_eq!(normalize_candidate("Pikachu Card!"), Some("pikachu".to_string()));
        assert_eq!(normalize_candidate("  MewTwo  "), Some("mewtwo".to_string()));
        assert_eq!(normalize_candidate("mr-mime jr"), Some("mr-mime".to_string()));
        assert_eq!(normalize_candidate("!!!"), None);
        assert_eq!(normalize_candidate(""), None);
        assert_eq!(normalize_candidate("x"), None);
    }

    #[test]
    fn test_exact_match_beats_containment() {
        let list = summaries();
        // "raichu" is contained in no other name here, but "pikachu" also
        // contains "chu"; the exact entry must win regardless.
        let found = resolve_in_memory("raichu", &list).unwrap();
        assert_eq!(found.name, "raichu");
    }

    #[test]
    fn test_containment_first_in_catalog_order() {
        let list = summaries();
        // "chu" is a substring of both pikachu (id 1) and raichu (id 2)
        let found = resolve_in_memory("chu", &list).unwrap();
        assert_eq!(found.id, 1);
    }

    #[test]
    fn test_containment_either_direction() {
        let list = summaries();
        // Entry name contained within the candidate
        let found = resolve_in_memory("pikachu card", &list).unwrap();
        assert_eq!(found.name, "pikachu");
        // Candidate contained within the entry name
        let found = resolve_in_memory("bulba", &list).unwrap();
        assert_eq!(found.name, "bulbasaur");
    }

    #[test]
    fn test_no_match_returns_none() {
        let list = summaries();
        assert!(resolve_in_memory("charizard", &list).is_none());
        assert!(resolve_in_memory("", &list).is_none());
    }

    #[test]
    fn test_resolve_with_prefers_exact_lookup() {
        let list = summaries();
        let lookup = |key: &str| -> Result<PokemonDetail, CatalogError> {
            assert_eq!(key, "pikachu");
            Ok(PokemonDetail {
                id: 25,
                name: "pikachu".to_string(),
                height: 4,
                weight: 60,
                types: vec!["electric".to_string()],
                stats: vec![],
                abilities: vec![],
                artwork_url: None,
            })
        };

        let found = resolve_with("Pikachu Card #025", &list, lookup).unwrap();
        assert_eq!(found.id, 25);
    }

    #[test]
    fn test_resolve_with_falls_back_on_lookup_failure() {
        let list = summaries();
        let found = resolve_with("pikachu card", &list, failing_lookup).unwrap();
        assert_eq!(found.name, "pikachu");
    }

    #[test]
    fn test_resolve_with_never_fabricates() {
        let list = summaries();
        assert!(resolve_with("totally unknown", &list, failing_lookup).is_none());
    }
}
