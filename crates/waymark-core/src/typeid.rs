//! Dotted category type ids.
//!
//! A category's type id is its full path from the root joined with `.`:
//! `tekkit.hp.core` is the child `core` of `tekkit.hp`. Type ids are
//! case-insensitive and stored lower-cased.

/// Normalize a raw type id: trim, lower-case, and reject empty segments.
pub fn normalize(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    if lowered.is_empty() || lowered.split('.').any(str::is_empty) {
        return None;
    }
    Some(lowered)
}

/// Parent portion of a type id (everything before the last `.`).
pub fn parent(typeid: &str) -> Option<&str> {
    typeid.rfind('.').map(|idx| &typeid[..idx])
}

/// Last segment of a type id.
pub fn leaf(typeid: &str) -> &str {
    typeid.rfind('.').map_or(typeid, |idx| &typeid[idx + 1..])
}

/// Child type id of `parent` named `name`.
pub fn join(parent: Option<&str>, name: &str) -> String {
    match parent {
        Some(p) => format!("{p}.{name}"),
        None => name.to_owned(),
    }
}

/// Every ancestor of `typeid`, nearest first, excluding itself.
pub fn ancestors(typeid: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(parent(typeid), |t| parent(*t))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_validates() {
        assert_eq!(normalize(" Tekkit.HP ").as_deref(), Some("tekkit.hp"));
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("a..b"), None);
        assert_eq!(normalize(".a"), None);
        assert_eq!(normalize("a."), None);
    }

    #[test]
    fn parent_and_leaf() {
        assert_eq!(parent("a.b.c"), Some("a.b"));
        assert_eq!(parent("a"), None);
        assert_eq!(leaf("a.b.c"), "c");
        assert_eq!(leaf("a"), "a");
    }

    #[test]
    fn join_builds_children() {
        assert_eq!(join(None, "a"), "a");
        assert_eq!(join(Some("a.b"), "c"), "a.b.c");
    }

    #[test]
    fn ancestors_nearest_first() {
        let all: Vec<_> = ancestors("a.b.c").collect();
        assert_eq!(all, vec!["a.b", "a"]);
        assert_eq!(ancestors("root").count(), 0);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        fn segment() -> impl Strategy<Value = String> {
            "[a-z0-9_]{1,6}"
        }

        proptest! {
            #[test]
            fn join_then_split_is_identity(
                segments in proptest::collection::vec(segment(), 1..6),
            ) {
                let mut typeid: Option<String> = None;
                for s in &segments {
                    typeid = Some(join(typeid.as_deref(), s));
                }
                let typeid = typeid.unwrap();

                let normalized = normalize(&typeid);
                prop_assert_eq!(normalized.as_deref(), Some(typeid.as_str()));
                prop_assert_eq!(leaf(&typeid), segments.last().unwrap().as_str());
                prop_assert_eq!(ancestors(&typeid).count(), segments.len() - 1);
                if let Some(p) = parent(&typeid) {
                    prop_assert_eq!(join(Some(p), leaf(&typeid)), typeid.clone());
                }
            }

            #[test]
            fn normalize_is_idempotent(raw in "[A-Za-z.]{0,12}") {
                if let Some(once) = normalize(&raw) {
                    prop_assert_eq!(normalize(&once), Some(once.clone()));
                }
            }
        }
    }
}
