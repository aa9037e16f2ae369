//! Specificity resolution.
//!
//! Collapses credentials sharing a name across overlapping addresses into
//! one effective value per name: the overlay a caller sees when asking
//! for everything visible at a wildcard-bearing address.

use crate::address::Specificity;
use crate::engine::PlaintextCredential;
use crate::graph::CredentialState;

/// Keep at most one credential per name.
///
/// Unset credentials are dropped before comparison. The candidate with
/// the more specific address wins; on equal (or incomparable)
/// specificity the first one encountered is kept. Output is sorted by
/// name.
pub fn resolve(credentials: Vec<PlaintextCredential>) -> Vec<PlaintextCredential> {
    let mut winners: Vec<PlaintextCredential> = Vec::new();

    for candidate in credentials {
        if candidate.state == CredentialState::Unset {
            continue;
        }

        match winners.iter_mut().find(|w| w.name == candidate.name) {
            Some(winner) => {
                if candidate.address.compare_specificity(&winner.address) == Specificity::More {
                    *winner = candidate;
                }
            }
            None => winners.push(candidate),
        }
    }

    winners.sort_by(|a, b| a.name.cmp(&b.name));
    winners
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::crypto::SecretVec;

    fn credential(address: &str, name: &str, value: &str, state: CredentialState) -> PlaintextCredential {
        PlaintextCredential {
            address: Address::parse(address).unwrap(),
            name: name.to_string(),
            value: SecretVec::new(value.as_bytes().to_vec()),
            version: 1,
            state,
        }
    }

    fn set(address: &str, name: &str, value: &str) -> PlaintextCredential {
        credential(address, name, value, CredentialState::Set)
    }

    #[test]
    fn test_more_specific_address_wins() {
        let resolved = resolve(vec![
            set("/acme/api/*/auth/user/1", "DB_PASS", "generic"),
            set("/acme/api/production/auth/user/1", "DB_PASS", "specific"),
        ]);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].value.as_bytes(), b"specific");
    }

    #[test]
    fn test_equal_specificity_keeps_first() {
        let resolved = resolve(vec![
            set("/acme/api/production/auth/user/1", "DB_PASS", "first"),
            set("/acme/api/staging/auth/user/1", "DB_PASS", "second"),
        ]);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].value.as_bytes(), b"first");
    }

    #[test]
    fn test_unset_dropped_before_comparison() {
        let resolved = resolve(vec![
            credential(
                "/acme/api/production/auth/user/1",
                "DB_PASS",
                "",
                CredentialState::Unset,
            ),
            set("/acme/api/*/auth/user/1", "DB_PASS", "survivor"),
        ]);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].value.as_bytes(), b"survivor");
    }

    #[test]
    fn test_only_unset_resolves_to_nothing() {
        let resolved = resolve(vec![credential(
            "/acme/api/production/auth/user/1",
            "DB_PASS",
            "",
            CredentialState::Unset,
        )]);
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_distinct_names_all_kept_sorted() {
        let resolved = resolve(vec![
            set("/acme/api/production/auth/user/1", "ZETA", "z"),
            set("/acme/api/production/auth/user/1", "ALPHA", "a"),
            set("/acme/api/production/auth/user/1", "MID", "m"),
        ]);

        let names: Vec<&str> = resolved.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["ALPHA", "MID", "ZETA"]);
    }

    #[test]
    fn test_later_less_specific_does_not_replace() {
        let resolved = resolve(vec![
            set("/acme/api/production/auth/user/1", "DB_PASS", "specific"),
            set("/acme/api/*/auth/user/1", "DB_PASS", "generic"),
        ]);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].value.as_bytes(), b"specific");
    }
}
