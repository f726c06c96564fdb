//! The tag/attribute allow-list applied to note text.

use std::collections::{BTreeMap, BTreeSet};

/// Tags permitted in note text, each with the attributes it may carry.
///
/// Names are stored lowercase; lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedHtml {
    tags: BTreeMap<String, BTreeSet<String>>,
}

impl Default for AllowedHtml {
    fn default() -> Self {
        Self::empty()
            .allow_tag("a", &["href", "title", "target"])
            .allow_tag("br", &[])
            .allow_tag("p", &[])
            .allow_tag("b", &[])
            .allow_tag("strong", &[])
            .allow_tag("i", &[])
            .allow_tag("em", &[])
            .allow_tag("u", &[])
            .allow_tag("hr", &[])
    }
}

impl AllowedHtml {
    /// An allow-list that strips every tag.
    pub fn empty() -> Self {
        Self {
            tags: BTreeMap::new(),
        }
    }

    /// Permit `tag` with `attributes`, merging with any attributes it already has.
    pub fn allow_tag(mut self, tag: &str, attributes: &[&str]) -> Self {
        let entry = self.tags.entry(tag.trim().to_ascii_lowercase()).or_default();
        for attr in attributes {
            entry.insert(attr.trim().to_ascii_lowercase());
        }
        self
    }

    pub fn remove_tag(mut self, tag: &str) -> Self {
        self.tags.remove(&tag.trim().to_ascii_lowercase());
        self
    }

    pub fn allows_tag(&self, tag: &str) -> bool {
        self.tags.contains_key(&tag.to_ascii_lowercase())
    }

    pub fn allows_attribute(&self, tag: &str, attribute: &str) -> bool {
        self.tags
            .get(&tag.to_ascii_lowercase())
            .is_some_and(|attrs| attrs.contains(&attribute.to_ascii_lowercase()))
    }

    /// Allowed tags in name order with their attributes.
    pub fn tags(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.tags.iter().map(|(tag, attrs)| (tag.as_str(), attrs))
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_list_matches_admin_note_tags() {
        let allowed = AllowedHtml::default();
        let names: Vec<&str> = allowed.tags().map(|(tag, _)| tag).collect();
        assert_eq!(
            names,
            vec!["a", "b", "br", "em", "hr", "i", "p", "strong", "u"]
        );
        assert!(allowed.allows_attribute("a", "href"));
        assert!(allowed.allows_attribute("A", "TARGET"));
        assert!(!allowed.allows_attribute("a", "onclick"));
        assert!(!allowed.allows_attribute("p", "class"));
    }

    #[test]
    fn allow_tag_merges_attributes() {
        let allowed = AllowedHtml::default().allow_tag("a", &["rel"]);
        assert!(allowed.allows_attribute("a", "rel"));
        assert!(allowed.allows_attribute("a", "href"));
    }

    #[test]
    fn remove_tag_drops_it() {
        let allowed = AllowedHtml::default().remove_tag("HR");
        assert!(!allowed.allows_tag("hr"));
        assert!(AllowedHtml::empty().is_empty());
    }
}
