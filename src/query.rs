//! Request URL construction for the Keybase user lookup endpoint.

use std::fmt;

/// Production API base, used unless the caller overrides the endpoint.
pub const DEFAULT_API_BASE: &str = "https://keybase.io";

/// Path of the user lookup endpoint, relative to the API base.
pub const LOOKUP_PATH: &str = "/_/api/1.0/user/lookup.json";

/// Which set of fields a lookup asks the API for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum LookupKind {
    /// Basic identity fields (`fields=basics`).
    Identity,
    /// Public key metadata (`fields=public_keys`).
    PublicKey,
}

impl LookupKind {
    /// The value sent as the `fields` query parameter.
    #[must_use]
    pub fn field_selector(self) -> &'static str {
        match self {
            Self::Identity => "basics",
            Self::PublicKey => "public_keys",
        }
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => write!(f, "user"),
            Self::PublicKey => write!(f, "public key"),
        }
    }
}

/// Build the lookup URL against the production API.
///
/// Identifiers are joined with `,` in the order given; the position of each
/// identifier is what later pairs it with its slot in the response array.
///
/// ```
/// use keybasectl::query::{build, LookupKind};
///
/// let url = build(&["alice", "bob"], LookupKind::Identity);
/// assert!(url.ends_with("usernames=alice,bob&fields=basics"));
/// ```
#[must_use]
pub fn build<S: AsRef<str>>(identifiers: &[S], kind: LookupKind) -> String {
    build_with_base(DEFAULT_API_BASE, identifiers, kind)
}

/// Build the lookup URL against an arbitrary API base.
///
/// A trailing `/` on `base` is ignored. Identifiers are not validated, only
/// percent-encoded so that whatever they contain reaches the API intact; the
/// `,` separating them stays literal.
#[must_use]
pub fn build_with_base<S: AsRef<str>>(base: &str, identifiers: &[S], kind: LookupKind) -> String {
    let usernames = identifiers
        .iter()
        .map(|id| urlencoding::encode(id.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{}{LOOKUP_PATH}?usernames={usernames}&fields={}",
        base.trim_end_matches('/'),
        kind.field_selector()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_query_uses_basics() {
        let url = build(&["alice", "bob"], LookupKind::Identity);
        assert_eq!(
            url,
            "https://keybase.io/_/api/1.0/user/lookup.json?usernames=alice,bob&fields=basics"
        );
    }

    #[test]
    fn public_key_query_uses_public_keys() {
        let url = build(&["alice"], LookupKind::PublicKey);
        assert!(url.contains("usernames=alice&"), "url: {url}");
        assert!(url.ends_with("fields=public_keys"), "url: {url}");
    }

    #[test]
    fn trailing_slash_on_base_is_ignored() {
        let url = build_with_base("http://127.0.0.1:8080/", &["x"], LookupKind::Identity);
        assert_eq!(
            url,
            "http://127.0.0.1:8080/_/api/1.0/user/lookup.json?usernames=x&fields=basics"
        );
    }

    #[test]
    fn identifiers_are_not_validated() {
        let url = build(&["", "bob"], LookupKind::Identity);
        assert!(url.contains("usernames=,bob&"), "url: {url}");
    }

    #[test]
    fn identifiers_are_percent_encoded() {
        let url = build(&["a b", "x#y", "c&fields=d"], LookupKind::Identity);
        assert!(
            url.ends_with("usernames=a%20b,x%23y,c%26fields%3Dd&fields=basics"),
            "url: {url}"
        );
    }

    #[test]
    fn comma_inside_identifier_is_not_a_separator() {
        let url = build(&["a,b"], LookupKind::PublicKey);
        assert!(url.contains("usernames=a%2Cb&"), "url: {url}");
    }

    #[test]
    fn accepts_owned_strings() {
        let ids = vec![String::from("carol"), String::from("dave")];
        assert!(build(&ids, LookupKind::Identity).contains("usernames=carol,dave"));
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn csv_preserves_order(ids in proptest::collection::vec("[a-z0-9_]{1,16}", 1..8)) {
                let url = build(&ids, LookupKind::Identity);
                let expected = format!("usernames={}&", ids.join(","));
                prop_assert!(url.contains(&expected));
            }

            #[test]
            fn selector_matches_kind(ids in proptest::collection::vec("[a-z]{1,8}", 1..4)) {
                prop_assert!(build(&ids, LookupKind::Identity).ends_with("&fields=basics"));
                prop_assert!(build(&ids, LookupKind::PublicKey).ends_with("&fields=public_keys"));
            }
        }
    }
}
