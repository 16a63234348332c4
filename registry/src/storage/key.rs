//! Store key layout: `<prefix>/<resource>/<namespace>/<name>`.
//!
//! Namespaces and names are single path segments, so the layout is injective
//! over `(namespace, name)` and every namespace owns a disjoint key range.

use super::error::InvalidIdentity;

pub const DEFAULT_PREFIX: &str = "/registry";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    prefix: String,
    resource: String,
}

impl KeyLayout {
    pub fn new(prefix: impl Into<String>, resource: impl Into<String>) -> Self {
        let prefix = prefix.into().trim_end_matches('/').to_string();
        Self {
            prefix,
            resource: resource.into(),
        }
    }

    /// Derive the key for one object.
    pub fn key_for(&self, namespace: &str, name: &str) -> Result<String, InvalidIdentity> {
        check_segment(namespace, name, namespace, "namespace")?;
        check_segment(namespace, name, name, "name")?;
        Ok(format!("{}{}", self.namespace_prefix_unchecked(namespace), name))
    }

    /// Key prefix covering every object in `namespace`, ending in `/`.
    pub fn namespace_prefix(&self, namespace: &str) -> Result<String, InvalidIdentity> {
        check_segment(namespace, "", namespace, "namespace")?;
        Ok(self.namespace_prefix_unchecked(namespace))
    }

    fn namespace_prefix_unchecked(&self, namespace: &str) -> String {
        if self.prefix.is_empty() {
            format!("{}/{}/", self.resource, namespace)
        } else {
            format!("{}/{}/{}/", self.prefix, self.resource, namespace)
        }
    }
}

fn check_segment(
    namespace: &str,
    name: &str,
    segment: &str,
    what: &str,
) -> Result<(), InvalidIdentity> {
    let reason = if segment.is_empty() {
        format!("{what} is required")
    } else if segment == "." || segment == ".." {
        format!("{what} may not be '.' or '..'")
    } else if let Some(ch) = segment.chars().find(|c| matches!(c, '/' | '%')) {
        format!("{what} may not contain {ch:?}")
    } else {
        return Ok(());
    };

    Err(InvalidIdentity {
        namespace: namespace.to_string(),
        name: name.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_without_prefix() {
        let layout = KeyLayout::new("", "events");
        assert_eq!(layout.key_for("default", "foo").unwrap(), "events/default/foo");
    }

    #[test]
    fn test_key_with_prefix() {
        let layout = KeyLayout::new(DEFAULT_PREFIX, "events");
        assert_eq!(
            layout.key_for("default", "foo").unwrap(),
            "/registry/events/default/foo"
        );

        // Trailing slashes on the prefix are not doubled
        let layout = KeyLayout::new("/registry/", "events");
        assert_eq!(
            layout.key_for("default", "foo").unwrap(),
            "/registry/events/default/foo"
        );
    }

    #[test]
    fn test_key_is_deterministic() {
        let layout = KeyLayout::new(DEFAULT_PREFIX, "events");
        assert_eq!(
            layout.key_for("ns", "a").unwrap(),
            layout.key_for("ns", "a").unwrap()
        );
    }

    #[test]
    fn test_distinct_identities_get_distinct_keys() {
        let layout = KeyLayout::new(DEFAULT_PREFIX, "events");
        let pairs = [
            ("a", "b"),
            ("a", "bc"),
            ("ab", "c"),
            ("b", "a"),
            ("default", "foo"),
            ("default", "foo.bar"),
        ];

        let mut keys: Vec<String> = pairs
            .iter()
            .map(|(ns, name)| layout.key_for(ns, name).unwrap())
            .collect();
        keys.sort();
        keys.dedup();

        assert_eq!(keys.len(), pairs.len());
    }

    #[test]
    fn test_rejects_empty_name() {
        let layout = KeyLayout::new(DEFAULT_PREFIX, "events");
        let err = layout.key_for("default", "").unwrap_err();
        assert_eq!(err.reason, "name is required");
    }

    #[test]
    fn test_rejects_empty_namespace() {
        let layout = KeyLayout::new(DEFAULT_PREFIX, "events");
        let err = layout.key_for("", "foo").unwrap_err();
        assert_eq!(err.reason, "namespace is required");
    }

    #[test]
    fn test_rejects_separator_characters() {
        let layout = KeyLayout::new(DEFAULT_PREFIX, "events");
        assert!(layout.key_for("default", "a/b").is_err());
        assert!(layout.key_for("default", "100%").is_err());
        assert!(layout.key_for("kube/system", "foo").is_err());
    }

    #[test]
    fn test_rejects_dot_segments() {
        let layout = KeyLayout::new(DEFAULT_PREFIX, "events");
        assert!(layout.key_for("default", ".").is_err());
        assert!(layout.key_for("default", "..").is_err());
        assert!(layout.key_for("..", "foo").is_err());
        assert!(layout.key_for("default", ".hidden").is_ok());
    }

    #[test]
    fn test_namespace_prefix_covers_keys() {
        let layout = KeyLayout::new(DEFAULT_PREFIX, "events");
        let prefix = layout.namespace_prefix("default").unwrap();

        assert_eq!(prefix, "/registry/events/default/");
        assert!(layout.key_for("default", "foo").unwrap().starts_with(&prefix));
        assert!(!layout.key_for("defaults", "foo").unwrap().starts_with(&prefix));
    }
}
