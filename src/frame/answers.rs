use std::collections::btree_map::Entry;

use kuchiki::traits::*;
use kuchiki::NodeRef;
use tracing::{debug, warn};

use super::bootstrap::{Face, FrameBootstrap};
use super::document::{attribute, has_attribute, set_attribute, set_text_content, tag_name, CardDocument};
use crate::protocol::{AnswerFields, AnswerValue};

/// Serialize the current state of `form`'s named controls.
///
/// Returns `None` when `form` is not a `<form>` element. File inputs are
/// never included.
pub fn extract_form_values(form: &NodeRef) -> Option<AnswerFields> {
    if tag_name(form).as_deref() != Some("form") {
        return None;
    }

    let mut fields = AnswerFields::new();
    for control in form.descendants().elements() {
        let node = control.as_node();
        let Some(name) = attribute(node, "name").filter(|name| !name.is_empty()) else {
            continue;
        };
        let Some(value) = control_value(node) else {
            continue;
        };
        // First control in document order wins a repeated name.
        if let Entry::Vacant(slot) = fields.entry(name) {
            slot.insert(value);
        }
    }
    Some(fields)
}

fn control_value(node: &NodeRef) -> Option<AnswerValue> {
    let tag = tag_name(node)?;
    match tag.as_str() {
        "input" => {
            let kind = attribute(node, "type")
                .map(|kind| kind.trim().to_ascii_lowercase())
                .unwrap_or_else(|| "text".to_string());
            match kind.as_str() {
                "text" | "hidden" | "password" | "button" | "reset" | "submit" => {
                    Some(AnswerValue::Single(attribute(node, "value").unwrap_or_default()))
                }
                "checkbox" | "radio" => has_attribute(node, "checked").then(|| {
                    AnswerValue::Single(attribute(node, "value").unwrap_or_else(|| "on".into()))
                }),
                _ => None,
            }
        }
        "textarea" => Some(AnswerValue::Single(node.text_contents())),
        "select" => {
            let options: Vec<NodeRef> = node
                .descendants()
                .elements()
                .filter(|element| &*element.name.local == "option")
                .map(|element| element.as_node().clone())
                .collect();
            if has_attribute(node, "multiple") {
                Some(AnswerValue::Multiple(
                    options
                        .iter()
                        .filter(|option| has_attribute(option, "selected"))
                        .map(option_value)
                        .collect(),
                ))
            } else {
                // The last selected option wins, as in `select.value`.
                let chosen = options
                    .iter()
                    .rev()
                    .find(|option| has_attribute(option, "selected"))
                    .or_else(|| options.first());
                Some(AnswerValue::Single(chosen.map(option_value).unwrap_or_default()))
            }
        }
        "button" => {
            let kind = attribute(node, "type")
                .map(|kind| kind.trim().to_ascii_lowercase())
                .unwrap_or_else(|| "submit".to_string());
            matches!(kind.as_str(), "submit" | "reset" | "button")
                .then(|| AnswerValue::Single(attribute(node, "value").unwrap_or_default()))
        }
        _ => None,
    }
}

fn option_value(option: &NodeRef) -> String {
    attribute(option, "value").unwrap_or_else(|| option.text_contents().trim().to_string())
}

/// Write previously typed answers back into their fields on the answer face
/// and lock them. Returns how many fields were restored.
pub fn restore_typed_answers(document: &CardDocument, bootstrap: &FrameBootstrap) -> usize {
    if bootstrap.face != Face::Answer {
        return 0;
    }

    let mut restored = 0;
    for (name, value) in bootstrap.typed_fields() {
        let Some(field) = document.elements_by_name(name).into_iter().next() else {
            warn!(target = "answers", field = name, "typed answer has no matching field; skipped");
            continue;
        };
        if tag_name(&field).as_deref() == Some("textarea") {
            set_text_content(&field, value);
        } else {
            set_attribute(&field, "value", value);
        }
        set_attribute(&field, "disabled", "true");
        restored += 1;
    }
    debug!(target = "answers", restored, "restored typed answers");
    restored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(html: &str) -> NodeRef {
        CardDocument::parse(html)
            .element_by_id("mainform")
            .expect("form")
    }

    #[test]
    fn serializes_the_documented_example() {
        let form = form(
            r#"<form id="mainform">
                <input name="a" value="x">
                <select name="b" multiple>
                    <option value="1" selected>one</option>
                    <option value="2" selected>two</option>
                    <option value="3">three</option>
                </select>
                <input type="checkbox" name="c" value="y" checked>
                <input type="checkbox" name="d" value="z">
                <input type="file" name="upload">
            </form>"#,
        );
        let fields = extract_form_values(&form).unwrap();
        let mut expected = AnswerFields::new();
        expected.insert("a".into(), AnswerValue::from("x"));
        expected.insert("b".into(), AnswerValue::from(vec!["1", "2"]));
        expected.insert("c".into(), AnswerValue::from("y"));
        assert_eq!(fields, expected);
    }

    #[test]
    fn covers_remaining_control_types() {
        let form = form(
            r#"<form id="mainform">
                <input type="hidden" name="h" value="secret">
                <input type="password" name="p">
                <input type="radio" name="r" value="left">
                <input type="radio" name="r" value="right" checked>
                <input type="checkbox" name="bare" checked>
                <textarea name="t">typed text</textarea>
                <select name="s1"><option>first</option><option>second</option></select>
                <select name="s2"><option value="a">A</option><option value="b" selected>B</option></select>
                <button name="go" value="button-r">Next</button>
                <input type="email" name="e" value="x@y">
                <input value="nameless">
            </form>"#,
        );
        let fields = extract_form_values(&form).unwrap();
        assert_eq!(fields["h"], AnswerValue::from("secret"));
        assert_eq!(fields["p"], AnswerValue::from(""));
        assert_eq!(fields["r"], AnswerValue::from("right"));
        assert_eq!(fields["bare"], AnswerValue::from("on"));
        assert_eq!(fields["t"], AnswerValue::from("typed text"));
        assert_eq!(fields["s1"], AnswerValue::from("first"));
        assert_eq!(fields["s2"], AnswerValue::from("b"));
        assert_eq!(fields["go"], AnswerValue::from("button-r"));
        assert!(!fields.contains_key("e"));
        assert_eq!(fields.len(), 8);
    }

    #[test]
    fn single_select_keeps_the_last_selected_option() {
        let form = form(
            r#"<form id="mainform"><select name="s">
                <option value="a" selected>A</option>
                <option value="b">B</option>
                <option value="c" selected>C</option>
            </select></form>"#,
        );
        assert_eq!(extract_form_values(&form).unwrap()["s"], AnswerValue::from("c"));
    }

    #[test]
    fn first_control_wins_repeated_names() {
        let form = form(
            r#"<form id="mainform"><input name="n" value="first"><input name="n" value="second"></form>"#,
        );
        assert_eq!(extract_form_values(&form).unwrap()["n"], AnswerValue::from("first"));
    }

    #[test]
    fn non_form_yields_none() {
        let document = CardDocument::parse(r#"<div id="mainform"></div>"#);
        assert!(extract_form_values(&document.element_by_id("mainform").unwrap()).is_none());
    }

    #[test]
    fn restores_typed_answers_on_answer_face_only() {
        let document = CardDocument::parse(
            r#"<form id="mainform"><input name="type:Front"><textarea name="type:Back"></textarea></form>"#,
        );
        let mut bootstrap = FrameBootstrap::new("card-1", Face::Question);
        bootstrap.typed_answers.insert("type:Front".into(), "hola".into());
        bootstrap.typed_answers.insert("type:Back".into(), "adios".into());
        bootstrap.typed_answers.insert("type:Missing".into(), "nada".into());
        bootstrap.typed_answers.insert("Front".into(), "ignored".into());

        assert_eq!(restore_typed_answers(&document, &bootstrap), 0);

        bootstrap.face = Face::Answer;
        assert_eq!(restore_typed_answers(&document, &bootstrap), 2);
        let front = document.elements_by_name("type:Front").remove(0);
        assert_eq!(attribute(&front, "value").as_deref(), Some("hola"));
        assert!(has_attribute(&front, "disabled"));
        let back = document.elements_by_name("type:Back").remove(0);
        assert_eq!(back.text_contents(), "adios");
    }
}
