//! Characteristic extraction from flat label/value `div` sequences
//!
//! Product pages list characteristics as sibling `div`s: a label is a `div`
//! without a nested `div`, a value is a `div` wrapping one. The markup is not
//! fully regular, so this is a single-pass classifier without lookahead:
//! a label with no value after it is dropped, and a value with no label
//! before it is ignored.

use indexmap::IndexMap;
use scraper::Selector;

use super::{compile_selector, ParsingResult};
use crate::infrastructure::html_node::PageNode;

pub struct CharacteristicsExtractor {
    nested_container: Selector,
}

impl CharacteristicsExtractor {
    pub fn new() -> ParsingResult<Self> {
        Ok(Self {
            nested_container: compile_selector("div")?,
        })
    }

    pub fn extract<N: PageNode>(&self, nodes: &[N]) -> IndexMap<String, String> {
        let mut characteristics = IndexMap::new();
        let mut pending_label: Option<String> = None;

        for node in nodes {
            if node.find_first(&self.nested_container).is_none() {
                pending_label = Some(clean_text(&node.text()));
            } else if let Some(label) = pending_label.take() {
                characteristics.insert(label, clean_text(&node.text()));
            }
        }

        characteristics
    }
}

/// Trim and swap double quotes for single quotes so values embed cleanly in JSON text
pub fn clean_text(text: &str) -> String {
    text.trim().replace('"', "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::html_node::PageDocument;
    use proptest::prelude::*;
    use rstest::rstest;

    fn label(text: &str) -> String {
        format!("<div>{text}</div>")
    }

    fn value(text: &str) -> String {
        format!("<div><div>{text}</div></div>")
    }

    fn extract_from(items: &[String]) -> IndexMap<String, String> {
        let html = format!("<div id='root'>{}</div>", items.concat());
        let doc = PageDocument::parse(&html);
        let root = doc.find_first(&compile_selector("#root").unwrap()).unwrap();
        CharacteristicsExtractor::new().unwrap().extract(&root.children())
    }

    #[test]
    fn test_label_value_pairs_in_order() {
        let result = extract_from(&[
            label(" Диаметр "),
            value(" 1/2\" "),
            label("Материал"),
            value("латунь"),
        ]);

        let entries: Vec<_> = result.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(entries, vec![("Диаметр", "1/2'"), ("Материал", "латунь")]);
    }

    #[rstest]
    #[case::two_labels_drop_first(vec![label("A"), label("B"), value("1")], vec![("B", "1")])]
    #[case::leading_value_ignored(vec![value("0"), label("A"), value("1")], vec![("A", "1")])]
    #[case::value_without_second_label(vec![label("A"), value("1"), value("2")], vec![("A", "1")])]
    #[case::trailing_label_dropped(vec![label("A"), value("1"), label("B")], vec![("A", "1")])]
    #[case::empty(vec![], vec![])]
    fn test_silent_drop_cases(#[case] items: Vec<String>, #[case] expected: Vec<(&str, &str)>) {
        let result = extract_from(&items);
        let entries: Vec<_> = result.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(entries, expected);
    }

    #[test]
    fn test_quotes_replaced_in_labels_and_values() {
        let result = extract_from(&[label("Серия \"Pro\""), value("\"X\"")]);
        assert_eq!(result.get("Серия 'Pro'").map(String::as_str), Some("'X'"));
    }

    proptest! {
        #[test]
        fn prop_every_key_is_a_label_followed_by_a_value(kinds in proptest::collection::vec(any::<bool>(), 0..24)) {
            // true = label node, false = value node
            let items: Vec<String> = kinds
                .iter()
                .enumerate()
                .map(|(i, is_label)| if *is_label { label(&format!("L{i}")) } else { value(&format!("V{i}")) })
                .collect();

            let result = extract_from(&items);

            let expected: Vec<(String, String)> = kinds
                .windows(2)
                .enumerate()
                .filter(|(_, pair)| pair[0] && !pair[1])
                .map(|(i, _)| (format!("L{i}"), format!("V{}", i + 1)))
                .collect();
            let actual: Vec<(String, String)> = result.into_iter().collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
