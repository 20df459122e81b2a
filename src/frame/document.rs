use kuchiki::traits::*;
use kuchiki::{parse_html, NodeRef};
use url::Url;

/// Mirrors `document.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

/// The sandboxed card document.
pub struct CardDocument {
    root: NodeRef,
    ready_state: ReadyState,
}

impl CardDocument {
    pub fn parse(html: &str) -> Self {
        Self {
            root: parse_html().one(html),
            ready_state: ReadyState::Loading,
        }
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    pub fn set_ready_state(&mut self, state: ReadyState) {
        self.ready_state = state;
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeRef> {
        self.find_element(|node| attribute(node, "id").as_deref() == Some(id))
    }

    pub fn elements_by_name(&self, name: &str) -> Vec<NodeRef> {
        self.filter_elements(|node| attribute(node, "name").as_deref() == Some(name))
    }

    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeRef> {
        self.filter_elements(|node| {
            tag_name(node)
                .map(|name| name.eq_ignore_ascii_case(tag))
                .unwrap_or(false)
        })
    }

    /// Every element whose `src` (or `href` for `<link>`) is a relative
    /// reference, i.e. something the sandbox cannot load on its own.
    pub fn relative_references(&self) -> Vec<NodeRef> {
        self.filter_elements(|node| {
            let Some(tag) = tag_name(node) else {
                return false;
            };
            let name = if tag.eq_ignore_ascii_case("link") {
                "href"
            } else {
                "src"
            };
            attribute(node, name)
                .map(|value| is_relative_reference(&value))
                .unwrap_or(false)
        })
    }

    pub fn to_html(&self) -> String {
        self.root.to_string()
    }

    fn find_element(&self, predicate: impl Fn(&NodeRef) -> bool) -> Option<NodeRef> {
        self.root
            .descendants()
            .elements()
            .map(|element| element.as_node().clone())
            .find(|node| predicate(node))
    }

    fn filter_elements(&self, predicate: impl Fn(&NodeRef) -> bool) -> Vec<NodeRef> {
        self.root
            .descendants()
            .elements()
            .map(|element| element.as_node().clone())
            .filter(|node| predicate(node))
            .collect()
    }
}

pub fn tag_name(node: &NodeRef) -> Option<String> {
    node.as_element()
        .map(|element| element.name.local.to_string().to_ascii_lowercase())
}

pub fn attribute(node: &NodeRef, name: &str) -> Option<String> {
    let element = node.as_element()?;
    let attributes = element.attributes.borrow();
    attributes.get(name).map(|value| value.to_string())
}

pub fn has_attribute(node: &NodeRef, name: &str) -> bool {
    node.as_element()
        .map(|element| element.attributes.borrow().contains(name))
        .unwrap_or(false)
}

/// Returns false when `node` is not an element.
pub fn set_attribute(node: &NodeRef, name: &str, value: &str) -> bool {
    let Some(element) = node.as_element() else {
        return false;
    };
    element
        .attributes
        .borrow_mut()
        .insert(name, value.to_string());
    true
}

pub fn set_text_content(node: &NodeRef, value: &str) {
    for child in node.children().collect::<Vec<_>>() {
        child.detach();
    }
    if !value.is_empty() {
        node.append(NodeRef::new_text(value));
    }
}

/// Build a detached element. `tag` must be a body-level HTML tag.
pub fn create_element(tag: &str, attributes: &[(&str, &str)]) -> Option<NodeRef> {
    let scratch = parse_html().one(format!("<{tag}>"));
    let element = scratch
        .descendants()
        .elements()
        .map(|element| element.as_node().clone())
        .find(|node| {
            tag_name(node)
                .map(|name| name.eq_ignore_ascii_case(tag))
                .unwrap_or(false)
        })?;
    element.detach();
    for (name, value) in attributes {
        set_attribute(&element, name, value);
    }
    Some(element)
}

pub fn is_relative_reference(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//") {
        return false;
    }
    Url::parse(trimmed).is_err()
}
