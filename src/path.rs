//! Pure helpers for store paths, environment names and secret selectors.

use crate::{Result, VaultenvError};

/// Separator between store path segments.
pub const PATH_SEPARATOR: char = '/';

/// Separator placed between a role prefix and workload segments.
pub const ROLE_SEPARATOR: char = '-';

/// Splits a custom selector into path and key.
pub const SELECTOR_SEPARATOR: char = '@';

/// Trims leading and trailing separators from a store path.
///
/// ```
/// use vaultenv::path::normalize;
///
/// assert_eq!(normalize("/secrets/team/"), "secrets/team");
/// assert_eq!(normalize("secrets"), "secrets");
/// ```
pub fn normalize(path: &str) -> &str {
    path.trim_matches(PATH_SEPARATOR)
}

/// Joins path fragments, normalizing each and dropping empty ones.
pub fn join<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .filter_map(|p| {
            let p = normalize(p.as_ref());
            (!p.is_empty()).then(|| p.to_string())
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Listing entries ending in a separator are namespaces, not secrets.
pub fn is_directory(entry: &str) -> bool {
    entry.ends_with(PATH_SEPARATOR)
}

/// Splits a workload identifier into its non-empty path segments.
pub fn segments(workload_id: &str) -> Vec<&str> {
    normalize(workload_id)
        .split(PATH_SEPARATOR)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Formats an environment variable name from a secret's parent entry and key.
///
/// The result is uppercase with every non-alphanumeric character replaced by
/// `_`. Distinct inputs may collide; callers insert in order and the last
/// write wins.
///
/// ```
/// use vaultenv::path::env_name;
///
/// assert_eq!(env_name("passwords", "some-secret-key"), "PASSWORDS_SOME_SECRET_KEY");
/// ```
pub fn env_name(prefix: &str, key: &str) -> String {
    format!("{}_{}", prefix, key)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// A custom secret reference of the form `<path>@<key>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector<'a> {
    /// Full store path of the secret
    pub path: &'a str,
    /// Field requested from that secret
    pub key: &'a str,
}

impl<'a> Selector<'a> {
    /// Parses a selector, splitting on the first `@`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultenvError::InvalidSelector`] if there is no `@`.
    ///
    /// ```
    /// use vaultenv::path::Selector;
    ///
    /// let s = Selector::parse("secrets/custom/password@some-secret-key").unwrap();
    /// assert_eq!(s.path, "secrets/custom/password");
    /// assert_eq!(s.key, "some-secret-key");
    /// ```
    pub fn parse(selector: &'a str) -> Result<Self> {
        selector
            .split_once(SELECTOR_SEPARATOR)
            .map(|(path, key)| Selector { path, key })
            .ok_or_else(|| VaultenvError::InvalidSelector(selector.to_string()))
    }
}

/// Builds a role name from a prefix and workload segments.
pub fn role_name(prefix: &str, segments: &[&str]) -> String {
    let body = segments.join(&ROLE_SEPARATOR.to_string());
    if prefix.is_empty() {
        body
    } else {
        format!("{}{}{}", prefix, ROLE_SEPARATOR, body)
    }
}

/// Candidate role names for a workload, most specific first.
///
/// Each candidate pairs the role name with the segments it was built from.
///
/// ```
/// use vaultenv::path::role_candidates;
///
/// let names: Vec<String> = role_candidates("mesos", "/team/app/task")
///     .into_iter()
///     .map(|(name, _)| name)
///     .collect();
///
/// assert_eq!(names, ["mesos-team-app-task", "mesos-team-app", "mesos-team"]);
/// ```
pub fn role_candidates<'a>(prefix: &str, workload_id: &'a str) -> Vec<(String, Vec<&'a str>)> {
    let segments = segments(workload_id);
    (1..=segments.len())
        .rev()
        .map(|n| (role_name(prefix, &segments[..n]), segments[..n].to_vec()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_and_join() {
        assert_eq!(normalize("///a/b///"), "a/b");
        assert_eq!(normalize("/"), "");
        assert_eq!(join(["/secrets_v1/mesos", "team/app/"]), "secrets_v1/mesos/team/app");
        assert_eq!(join(["", "/a", "b"]), "a/b");
    }

    #[test]
    fn test_is_directory() {
        assert!(is_directory("nested/"));
        assert!(!is_directory("passwords"));
    }

    #[test]
    fn test_segments_skip_empty() {
        assert_eq!(segments("/team//app/"), vec!["team", "app"]);
        assert!(segments("/").is_empty());
    }

    #[test]
    fn test_env_name() {
        assert_eq!(env_name("passwords", "some-secret-key"), "PASSWORDS_SOME_SECRET_KEY");
        assert_eq!(env_name("other-passwords", "a.b"), "OTHER_PASSWORDS_A_B");
        assert_eq!(env_name("db", "URL"), "DB_URL");
    }

    #[test]
    fn test_selector_splits_on_first_at() {
        let s = Selector::parse("kv/team@app@key").unwrap();
        assert_eq!(s.path, "kv/team");
        assert_eq!(s.key, "app@key");

        assert!(matches!(
            Selector::parse("kv/team/no-key"),
            Err(VaultenvError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_role_name_prefix_applied_once() {
        assert_eq!(role_name("mesos", &["team", "app"]), "mesos-team-app");
        assert_eq!(role_name("", &["team", "app"]), "team-app");
    }

    #[test]
    fn test_role_candidates_order() {
        let candidates = role_candidates("mesos", "team/app");
        assert_eq!(
            candidates,
            vec![
                ("mesos-team-app".to_string(), vec!["team", "app"]),
                ("mesos-team".to_string(), vec!["team"]),
            ]
        );
        assert!(role_candidates("mesos", "//").is_empty());
    }
}
