//! Textual persistence of documents and clipboard payloads.
//!
//! The format is JSON: document metadata, then pages, each page an ordered
//! list of items keyed by their variant tag. Image bytes are embedded as
//! base64 so a file is self-contained. Loading is all-or-nothing: the
//! payload is fully checked before a [`Document`] is handed back.

mod remap;

pub use remap::{copy_with_fresh_ids, copy_with_id_map, IdMap};

use crate::document::{Document, FORMAT_VERSION};
use crate::error::{EditorError, EditorResult};
use crate::items::{Item, ItemKind};
use serde_json::Value;

/// Serialize a document to pretty-printed JSON.
pub fn serialize(document: &Document) -> EditorResult<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Parse and validate a document.
pub fn deserialize(text: &str) -> EditorResult<Document> {
    let value: Value = serde_json::from_str(text)?;
    let root = value
        .as_object()
        .ok_or_else(|| EditorError::Format("document root is not an object".to_string()))?;

    let version = root
        .get("format_version")
        .and_then(Value::as_u64)
        .ok_or_else(|| EditorError::Format("missing format_version".to_string()))?;
    if version > u64::from(FORMAT_VERSION) {
        return Err(EditorError::Format(format!(
            "format version {version} is newer than supported version {FORMAT_VERSION}"
        )));
    }

    let pages = root
        .get("pages")
        .and_then(Value::as_array)
        .ok_or_else(|| EditorError::Format("missing pages".to_string()))?;
    if pages.is_empty() {
        return Err(EditorError::Format("document has no pages".to_string()));
    }
    for page in pages {
        if let Some(items) = page.get("items") {
            check_item_tags(items)?;
        }
    }

    let mut document: Document = serde_json::from_value(value)?;
    document.validate()?;
    // Group boxes are derived; a stale cached box is corrected, not trusted.
    let stale = document.refresh_group_bounds();
    if stale > 0 {
        log::debug!("Recomputed {stale} stale group boxes on load");
    }
    Ok(document)
}

/// Serialize a list of items (clipboard payload).
pub fn serialize_items(items: &[Item]) -> EditorResult<String> {
    Ok(serde_json::to_string(items)?)
}

/// Parse a clipboard payload. References are not checked here; pasting
/// remaps them with [`copy_with_fresh_ids`].
pub fn deserialize_items(text: &str) -> EditorResult<Vec<Item>> {
    let value: Value = serde_json::from_str(text)?;
    check_item_tags(&value)?;
    Ok(serde_json::from_value(value)?)
}

/// Every item must be an object with exactly one known variant tag.
fn check_item_tags(items: &Value) -> EditorResult<()> {
    let items = items
        .as_array()
        .ok_or_else(|| EditorError::Format("items is not a list".to_string()))?;
    for item in items {
        let object = item
            .as_object()
            .ok_or_else(|| EditorError::Format("item is not an object".to_string()))?;
        let mut keys = object.keys();
        let (Some(tag), None) = (keys.next(), keys.next()) else {
            return Err(EditorError::Format(
                "item must have exactly one variant tag".to_string(),
            ));
        };
        if ItemKind::from_tag(tag).is_none() {
            return Err(EditorError::UnknownVariant(tag.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Page;
    use crate::items::{Group, Image, ImageFormat, Rectangle, Text};
    use crate::units::{PageSize, Unit};
    use kurbo::Point;

    fn sample() -> Document {
        let mut doc = Document::with_page_size(PageSize::LETTER);
        doc.unit = Unit::Centimeters;
        let a = Item::Rectangle(Rectangle::new(Point::new(10.0, 10.0), 100.0, 50.0));
        let b = Item::Text(Text::new(Point::new(0.0, 200.0), "Caption".to_string()));
        let group = Item::Group(Group::new(vec![a.id(), b.id()]));
        doc.insert_item(0, 0, a).unwrap();
        doc.insert_item(0, 1, b).unwrap();
        doc.insert_item(0, 2, group).unwrap();
        let mut second = Page::new(PageSize::A4);
        second.name = "Back".to_string();
        doc.add_page(None, second).unwrap();
        doc.insert_item(
            1,
            0,
            Item::Image(Image::new(Point::ZERO, vec![0x89, 0x50, 0x4E, 0x47, 1, 2, 3], 2, 2, ImageFormat::Png)),
        )
        .unwrap();
        doc
    }

    #[test]
    fn test_round_trip() {
        let doc = sample();
        let text = serialize(&doc).unwrap();
        let back = deserialize(&text).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_items_are_tagged() {
        let text = serialize(&sample()).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        let first = &value["pages"][0]["items"][0];
        assert!(first.get("Rectangle").is_some());
        assert_eq!(value["unit"], "cm");
    }

    #[test]
    fn test_unknown_variant_rejected() {
        let mut value: Value = serde_json::from_str(&serialize(&sample()).unwrap()).unwrap();
        let item = value["pages"][0]["items"][0]["Rectangle"].take();
        value["pages"][0]["items"][0] = serde_json::json!({ "Star": item });
        let err = deserialize(&value.to_string()).unwrap_err();
        assert!(matches!(err, EditorError::UnknownVariant(tag) if tag == "Star"));
    }

    #[test]
    fn test_dangling_reference_rejected() {
        let mut value: Value = serde_json::from_str(&serialize(&sample()).unwrap()).unwrap();
        // Drop the rectangle, leaving the group pointing at it.
        value["pages"][0]["items"]
            .as_array_mut()
            .unwrap()
            .remove(0);
        let err = deserialize(&value.to_string()).unwrap_err();
        assert!(matches!(err, EditorError::DanglingReference { .. }));
        assert!(err.is_corruption());
    }

    #[test]
    fn test_newer_version_and_empty_pages_rejected() {
        let mut value: Value = serde_json::from_str(&serialize(&sample()).unwrap()).unwrap();
        value["format_version"] = serde_json::json!(FORMAT_VERSION + 1);
        assert!(matches!(deserialize(&value.to_string()), Err(EditorError::Format(_))));

        value["format_version"] = serde_json::json!(FORMAT_VERSION);
        value["pages"] = serde_json::json!([]);
        assert!(matches!(deserialize(&value.to_string()), Err(EditorError::Format(_))));
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let doc = sample();
        let mut value: Value = serde_json::from_str(&serialize(&doc).unwrap()).unwrap();
        value["future_setting"] = serde_json::json!(true);
        value["pages"][0]["items"][0]["Rectangle"]["shadow"] = serde_json::json!({"blur": 4});
        assert_eq!(deserialize(&value.to_string()).unwrap(), doc);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut value: Value = serde_json::from_str(&serialize(&sample()).unwrap()).unwrap();
        let image = value["pages"][1]["items"][0].clone();
        value["pages"][0]["items"].as_array_mut().unwrap().push(image);
        assert!(matches!(deserialize(&value.to_string()), Err(EditorError::InvalidOperation(_))));
    }

    #[test]
    fn test_clipboard_items() {
        let doc = sample();
        let items = doc.pages()[0].items().to_vec();
        let text = serialize_items(&items).unwrap();
        assert_eq!(deserialize_items(&text).unwrap(), items);
        assert!(matches!(
            deserialize_items(r#"[{"Blob": {}}]"#),
            Err(EditorError::UnknownVariant(_))
        ));
    }
}
