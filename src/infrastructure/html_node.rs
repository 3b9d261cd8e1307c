//! Node capability interface over the parsed HTML tree
//!
//! Parsers never walk `scraper` types directly; they go through [`PageNode`]
//! so that the extraction rules read the same everywhere and stay testable.

use scraper::{ElementRef, Html, Selector};

/// What the extractors need from a DOM element
pub trait PageNode: Sized {
    /// First matching descendant
    fn find_first(&self, selector: &Selector) -> Option<Self>;

    /// All matching descendants in document order
    fn find_all(&self, selector: &Selector) -> Vec<Self>;

    /// Direct child elements in document order
    fn children(&self) -> Vec<Self>;

    /// Text content with every text fragment trimmed and empty fragments dropped
    fn text(&self) -> String;

    fn attr(&self, name: &str) -> Option<String>;

    /// Tag name, lower case
    fn tag(&self) -> String;
}

impl<'a> PageNode for ElementRef<'a> {
    fn find_first(&self, selector: &Selector) -> Option<Self> {
        self.select(selector).next()
    }

    fn find_all(&self, selector: &Selector) -> Vec<Self> {
        self.select(selector).collect()
    }

    fn children(&self) -> Vec<Self> {
        self.child_elements().collect()
    }

    fn text(&self) -> String {
        stripped_text(ElementRef::text(self))
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.value().attr(name).map(str::to_string)
    }

    fn tag(&self) -> String {
        self.value().name().to_ascii_lowercase()
    }
}

/// Join trimmed, non-empty text fragments without a separator
pub fn stripped_text<'s>(fragments: impl Iterator<Item = &'s str>) -> String {
    fragments
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect()
}

/// Same as [`PageNode::text`], but skips the text inside `excluded`
pub fn text_excluding(element: &ElementRef<'_>, excluded: &ElementRef<'_>) -> String {
    let fragments = element.descendants().filter_map(|node| {
        let inside_excluded = node.ancestors().any(|ancestor| ancestor == **excluded);
        if inside_excluded {
            None
        } else {
            node.value().as_text().map(|text| &**text)
        }
    });
    stripped_text(fragments)
}

/// Owned, parsed page
pub struct PageDocument {
    html: Html,
}

impl PageDocument {
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }

    pub fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    // Selection starts at the root element so detached subtrees stay invisible.
    pub fn find_first(&self, selector: &Selector) -> Option<ElementRef<'_>> {
        self.root().select(selector).next()
    }

    pub fn find_all(&self, selector: &Selector) -> Vec<ElementRef<'_>> {
        self.root().select(selector).collect()
    }

    /// Detach every element matching `selector` from the tree.
    /// Returns the number of detached elements.
    pub fn remove_all(&mut self, selector: &Selector) -> usize {
        let ids: Vec<_> = self.root().select(selector).map(|element| element.id()).collect();
        let mut removed = 0;
        for id in ids {
            if let Some(mut node) = self.html.tree.get_mut(id) {
                node.detach();
                removed += 1;
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector(css: &str) -> Selector {
        Selector::parse(css).unwrap()
    }

    #[test]
    fn test_text_trims_and_joins_fragments() {
        let doc = PageDocument::parse("<p>  Цена —  <b> 1 200 руб. </b>\n</p>");
        let p = doc.find_first(&selector("p")).unwrap();
        assert_eq!(PageNode::text(&p), "Цена —1 200 руб.");
    }

    #[test]
    fn test_find_first_skips_self() {
        let doc = PageDocument::parse("<div id='outer'><span>label</span></div>");
        let outer = doc.find_first(&selector("#outer")).unwrap();
        assert!(outer.find_first(&selector("div")).is_none());
    }

    #[test]
    fn test_remove_all_detaches_matches() {
        let mut doc = PageDocument::parse(
            "<div class='box'>Диаметр<div class='tip a-inline-block'>подсказка</div></div>",
        );
        assert_eq!(doc.remove_all(&selector("div.tip.a-inline-block")), 1);

        let boxed = doc.find_first(&selector("div.box")).unwrap();
        assert_eq!(PageNode::text(&boxed), "Диаметр");
        assert_eq!(doc.remove_all(&selector("div.tip")), 0);
    }

    #[test]
    fn test_text_excluding_link() {
        let doc = PageDocument::parse("<table><tr><td>• Кран <a href='/v/1'>перейти</a></td></tr></table>");
        let td = doc.find_first(&selector("td")).unwrap();
        let link = td.find_first(&selector("a")).unwrap();
        assert_eq!(text_excluding(&td, &link), "• Кран");
    }

    #[test]
    fn test_children_and_attr() {
        let doc = PageDocument::parse("<div id='p'><div>a</div><p class='x'>b</p></div>");
        let parent = doc.find_first(&selector("#p")).unwrap();
        let children = parent.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[1].tag(), "p");
        assert_eq!(PageNode::attr(&children[1], "class").as_deref(), Some("x"));
        assert_eq!(PageNode::attr(&children[0], "class"), None);
    }
}
