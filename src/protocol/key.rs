use std::fmt;

use serde::{Deserialize, Serialize};

/// Which DOM attribute a materialized handle lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    /// `<link>`; patched through `href`.
    Link,
    /// Images, scripts, media; patched through `src`.
    Source,
}

impl ElementKind {
    pub fn from_tag(tag: &str) -> Self {
        if tag.eq_ignore_ascii_case("link") {
            ElementKind::Link
        } else {
            ElementKind::Source
        }
    }

    pub fn attribute(self) -> &'static str {
        match self {
            ElementKind::Link => "href",
            ElementKind::Source => "src",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ElementKind::Link => "link",
            ElementKind::Source => "source",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceKey {
    pub element_kind: ElementKind,
    pub path: String,
}

impl ResourceKey {
    pub fn new(element_kind: ElementKind, path: impl Into<String>) -> Self {
        Self {
            element_kind,
            path: path.into(),
        }
    }

    pub fn link(path: impl Into<String>) -> Self {
        Self::new(ElementKind::Link, path)
    }

    pub fn source(path: impl Into<String>) -> Self {
        Self::new(ElementKind::Source, path)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.element_kind.as_str(), self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_tags_patch_href() {
        assert_eq!(ElementKind::from_tag("LINK"), ElementKind::Link);
        assert_eq!(ElementKind::from_tag("img"), ElementKind::Source);
        assert_eq!(ElementKind::from_tag("audio").attribute(), "src");
        assert_eq!(ElementKind::Link.attribute(), "href");
    }

    #[test]
    fn same_path_different_kind_is_a_different_key() {
        assert_ne!(ResourceKey::link("a.css"), ResourceKey::source("a.css"));
        assert_eq!(ResourceKey::source("a.png").to_string(), "source:a.png");
    }

    #[test]
    fn key_uses_camel_case_on_the_wire() {
        let json = serde_json::to_value(ResourceKey::link("style.css")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "elementKind": "link", "path": "style.css" })
        );
    }
}
