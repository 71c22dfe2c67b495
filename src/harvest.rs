//! Field harvesting
//!
//! Flattens everything an item exposes (text, tooltips, `data-*` attributes,
//! accessibility labels, media, links, form values) into one [`FieldRecord`].
//! Missing signals are simply left out of the record.

use crate::detect::ItemGroup;
use crate::dom::{DomTree, ElementNode};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

pub const TEXT: &str = "text";
pub const TITLE: &str = "title";
pub const ARIA_LABEL: &str = "aria_label";
pub const CHILD_TITLES: &str = "child_titles";
pub const IMAGE_ALTS: &str = "image_alts";
pub const IMAGE_SRCS: &str = "image_srcs";
pub const LINKS: &str = "links";
pub const LINK_TITLES: &str = "link_titles";
pub const INPUT_VALUES: &str = "input_values";
pub const ARIA_DESCRIPTION: &str = "aria_description";

/// Prefix for fields taken from `data-*` attributes
pub const DATA_PREFIX: &str = "data_";

/// Separator between values collected from several descendants
pub const JOIN_SEPARATOR: &str = " | ";

/// Flat field-name to value mapping for one item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldRecord(IndexMap<String, String>);

impl FieldRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, key: impl Into<String>, value: String) {
        self.0.insert(key.into(), value);
    }

    fn insert_joined(&mut self, key: &str, values: Vec<String>) {
        if !values.is_empty() {
            self.insert(key, values.join(JOIN_SEPARATOR));
        }
    }
}

/// Double quotes, turn newlines into spaces and trim
///
/// Every harvested value goes through this so it can be embedded in a quoted
/// CSV field as is.
pub fn normalize(value: &str) -> String {
    value
        .replace('"', "\"\"")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

/// Turn a `data-*` attribute suffix into its field name (`data-item-id` -> `data_item_id`)
pub fn data_field_name(attribute_suffix: &str) -> String {
    format!("{}{}", DATA_PREFIX, attribute_suffix.replace('-', "_"))
}

/// Extract the flat record for one item
///
/// `tree` is the whole document, used to resolve `aria-describedby` targets
/// that live outside the item.
pub fn harvest(tree: &DomTree, item: &ElementNode) -> FieldRecord {
    let mut record = FieldRecord::default();

    record.insert(TEXT, normalize(item.text()));

    if let Some(title) = non_empty(item.get_attribute("title")) {
        record.insert(TITLE, normalize(title));
    }

    for (key, value) in item.data_attributes() {
        if !value.is_empty() {
            record.insert(data_field_name(key), normalize(value));
        }
    }

    if let Some(label) = non_empty(item.get_attribute("aria-label")) {
        record.insert(ARIA_LABEL, normalize(label));
    }

    let mut child_titles = Vec::new();
    let mut child_data: IndexMap<String, String> = IndexMap::new();
    let mut image_alts = Vec::new();
    let mut image_srcs = Vec::new();
    let mut links = Vec::new();
    let mut link_titles = Vec::new();
    let mut input_values = Vec::new();

    for node in item.descendants() {
        if let Some(title) = non_blank(node.get_attribute("title")) {
            child_titles.push(normalize(title));
        }

        for (key, value) in node.data_attributes() {
            if !value.is_empty() {
                child_data.entry(data_field_name(key)).or_insert_with(|| normalize(value));
            }
        }

        if node.is_tag("img") {
            if let Some(alt) = non_blank(node.get_attribute("alt")) {
                image_alts.push(normalize(alt));
            }
            if let Some(src) = non_empty(node.get_attribute("src")) {
                image_srcs.push(normalize(src));
            }
        }

        if node.is_tag("a") {
            if let Some(href) = node.get_attribute("href") {
                if !href.is_empty() {
                    links.push(normalize(href));
                }
                if let Some(title) = non_blank(node.get_attribute("title")) {
                    link_titles.push(normalize(title));
                }
            }
        }

        if node.is_tag("input") || node.is_tag("select") || node.is_tag("textarea") {
            let value = node.value.as_ref().filter(|v| !v.is_empty()).or(node.get_attribute("value"));
            if let Some(value) = non_blank(value) {
                input_values.push(normalize(value));
            }
        }
    }

    record.insert_joined(CHILD_TITLES, child_titles);

    // Descendant data-* only fills keys the item itself does not carry
    for (key, value) in child_data {
        if !record.contains_key(&key) {
            record.insert(key, value);
        }
    }

    record.insert_joined(IMAGE_ALTS, image_alts);
    record.insert_joined(IMAGE_SRCS, image_srcs);
    record.insert_joined(LINKS, links);
    record.insert_joined(LINK_TITLES, link_titles);
    record.insert_joined(INPUT_VALUES, input_values);

    if let Some(description) = described_by(tree, item) {
        record.insert(ARIA_DESCRIPTION, description);
    }

    record
}

/// Union of every field name in the group, always including `text`
pub fn harvest_all_keys<'a, I>(tree: &DomTree, items: I) -> IndexSet<String>
where
    I: IntoIterator<Item = &'a ElementNode>,
{
    let mut keys = IndexSet::new();
    keys.insert(TEXT.to_string());
    for item in items {
        keys.extend(harvest(tree, item).keys().map(str::to_string));
    }
    keys
}

/// [`harvest_all_keys`] for a detected group; unresolvable references are skipped
pub fn harvest_group_keys(tree: &DomTree, group: &ItemGroup) -> IndexSet<String> {
    harvest_all_keys(tree, group.items.iter().filter_map(|item| tree.get(item)))
}

/// Text of the elements named by `aria-describedby`, looked up in the whole tree
fn described_by(tree: &DomTree, item: &ElementNode) -> Option<String> {
    let ids = non_empty(item.get_attribute("aria-describedby"))?;

    let texts: Vec<&str> = ids
        .split_whitespace()
        .filter_map(|id| tree.find_by_id(id))
        .filter_map(|target| {
            target
                .text_content
                .as_deref()
                .or(target.inner_text.as_deref())
                .filter(|text| !text.is_empty())
        })
        .collect();

    if texts.is_empty() {
        None
    } else {
        Some(normalize(&texts.join(" ")))
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn harvest_alone(item: &ElementNode) -> FieldRecord {
        let tree = DomTree::new(ElementNode::new("BODY").with_children(vec![item.clone()]));
        harvest(&tree, item)
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  say \"hi\"\nthere "), "say \"\"hi\"\" there");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_plain_item_has_only_text() {
        let record = harvest_alone(&ElementNode::new("LI").with_text("Plain row"));

        assert_eq!(record.len(), 1);
        assert_eq!(record.get(TEXT), Some("Plain row"));
    }

    #[test]
    fn test_item_without_any_text() {
        let record = harvest_alone(&ElementNode::new("LI"));
        assert_eq!(record.len(), 1);
        assert_eq!(record.get(TEXT), Some(""));
    }

    #[test]
    fn test_title_only_item() {
        let record = harvest_alone(&ElementNode::new("LI").with_attribute("title", "Hello"));

        assert_eq!(record.len(), 2);
        assert_eq!(record.get(TEXT), Some(""));
        assert_eq!(record.get(TITLE), Some("Hello"));
    }

    #[test]
    fn test_data_attributes_item_wins_over_descendants() {
        let item = ElementNode::new("LI")
            .with_attribute("data-id", "outer")
            .with_attribute("data-empty", "")
            .with_children(vec![
                ElementNode::new("SPAN")
                    .with_attribute("data-id", "inner")
                    .with_attribute("data-empty", "")
                    .with_attribute("data-sku", "first"),
                ElementNode::new("SPAN")
                    .with_attribute("data-sku", "second")
                    .with_attribute("data-empty", "filled"),
            ]);

        let record = harvest_alone(&item);
        assert_eq!(record.get("data_id"), Some("outer"));
        assert_eq!(record.get("data_sku"), Some("first"));
        assert_eq!(record.get("data_empty"), Some("filled"));
    }

    #[test]
    fn test_descendant_signals() {
        let item = ElementNode::new("DIV")
            .with_attribute("aria-label", "Product card")
            .with_text("Widget\n$5")
            .with_children(vec![
                ElementNode::new("IMG")
                    .with_attribute("alt", "Front")
                    .with_attribute("src", "https://cdn.example/a.png"),
                ElementNode::new("IMG").with_attribute("src", "https://cdn.example/b.png"),
                ElementNode::new("A")
                    .with_attribute("href", "https://example.com/widget")
                    .with_attribute("title", "Open \"widget\""),
                ElementNode::new("A").with_attribute("title", "no href"),
                ElementNode::new("SPAN").with_attribute("title", "  "),
                ElementNode::new("INPUT").with_value("3"),
                ElementNode::new("INPUT").with_attribute("value", "fallback"),
                ElementNode::new("SELECT").with_value(""),
            ]);

        let record = harvest_alone(&item);
        assert_eq!(record.get(TEXT), Some("Widget $5"));
        assert_eq!(record.get(ARIA_LABEL), Some("Product card"));
        assert_eq!(record.get(IMAGE_ALTS), Some("Front"));
        assert_eq!(record.get(IMAGE_SRCS), Some("https://cdn.example/a.png | https://cdn.example/b.png"));
        assert_eq!(record.get(LINKS), Some("https://example.com/widget"));
        assert_eq!(record.get(LINK_TITLES), Some("Open \"\"widget\"\""));
        assert_eq!(record.get(CHILD_TITLES), Some("Open \"\"widget\"\" | no href"));
        assert_eq!(record.get(INPUT_VALUES), Some("3 | fallback"));
        assert!(!record.contains_key(ARIA_DESCRIPTION));
    }

    #[test]
    fn test_aria_description_looked_up_in_whole_tree() {
        let item = ElementNode::new("LI").with_attribute("aria-describedby", "tip-1");
        let tree = DomTree::new(ElementNode::new("BODY").with_children(vec![
            ElementNode::new("UL").with_children(vec![item.clone()]),
            ElementNode::new("DIV")
                .with_attribute("id", "tip-1")
                .with_text_content("Ships\nin 2 days"),
        ]));

        let record = harvest(&tree, &item);
        assert_eq!(record.get(ARIA_DESCRIPTION), Some("Ships in 2 days"));
    }

    #[test]
    fn test_missing_description_target_is_ignored() {
        let item = ElementNode::new("LI").with_attribute("aria-describedby", "nowhere");
        let record = harvest_alone(&item);
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_all_keys_union() {
        let items = vec![
            ElementNode::new("LI").with_attribute("title", "a"),
            ElementNode::new("LI").with_attribute("data-rank", "2"),
            ElementNode::new("LI"),
        ];
        let tree = DomTree::new(ElementNode::new("UL").with_children(items.clone()));

        let keys = harvest_all_keys(&tree, &items);
        let keys: Vec<_> = keys.iter().map(String::as_str).collect();
        assert_eq!(keys, vec![TEXT, TITLE, "data_rank"]);

        for item in &items {
            for key in harvest(&tree, item).keys() {
                assert!(keys.contains(&key));
            }
        }
    }

    #[test]
    fn test_data_field_name() {
        assert_eq!(data_field_name("item-id"), "data_item_id");
        assert_eq!(data_field_name("sku"), "data_sku");
    }
}
