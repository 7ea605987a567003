//! Catalog item records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Price sentinel meaning "price intentionally unset, needs attention".
///
/// Any negative `total_value` carries this meaning and is legitimate data.
pub const PRICE_UNKNOWN: f64 = -1.0;

/// A stocked product line with its box/size quantity breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Identifier, may be reassigned by the importing store.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Product code.
    pub code: String,
    /// Warehouse label.
    pub warehouse: String,
    /// Number of boxes.
    pub number_of_boxes: u32,
    /// Per-box/per-size quantities, stored as one JSON cell on export.
    pub box_size_quantities: Value,
    /// Size-type tag (e.g. numeric or lettered sizes).
    pub size_type: String,
    /// Shelf row.
    pub row: Option<String>,
    /// Shelf position.
    pub position: Option<String>,
    /// Shelf side.
    pub side: Option<String>,
    /// Path or URI of the item's image file.
    pub image_uri: Option<String>,
    /// Aggregate quantity.
    pub total_quantity: i64,
    /// Aggregate monetary value; negative means unknown price.
    pub total_value: f64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Creates an item with the given name and empty stock.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            code: String::new(),
            warehouse: String::new(),
            number_of_boxes: 0,
            box_size_quantities: Value::Array(Vec::new()),
            size_type: String::new(),
            row: None,
            position: None,
            side: None,
            image_uri: None,
            total_quantity: 0,
            total_value: 0.0,
            created_at: Utc::now(),
        }
    }

    /// Sets the identifier.
    #[must_use]
    pub const fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    /// Sets the product code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Sets the image reference.
    #[must_use]
    pub fn with_image(mut self, image_uri: impl Into<String>) -> Self {
        self.image_uri = Some(image_uri.into());
        self
    }

    /// Sets the aggregate value.
    #[must_use]
    pub const fn with_total_value(mut self, total_value: f64) -> Self {
        self.total_value = total_value;
        self
    }

    /// Returns true when the price sentinel marks this item as unpriced.
    #[must_use]
    pub fn has_unknown_price(&self) -> bool {
        self.total_value < 0.0
    }

    /// Returns the image reference if it is non-empty.
    #[must_use]
    pub fn image_ref(&self) -> Option<&str> {
        self.image_uri.as_deref().filter(|uri| !uri.trim().is_empty())
    }

    /// Returns the final path component of the image reference.
    ///
    /// Handles plain paths and `file://` style URIs alike.
    #[must_use]
    pub fn image_basename(&self) -> Option<&str> {
        self.image_ref()
            .and_then(|uri| uri.rsplit(['/', '\\']).next())
            .filter(|name| !name.is_empty())
    }

    /// Returns the `<id>_<basename>` name used inside an export's `images/`.
    #[must_use]
    pub fn export_image_name(&self) -> Option<String> {
        self.image_basename()
            .map(|name| format!("{}_{name}", self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_price_sentinel() {
        assert!(Item::new("a").with_total_value(PRICE_UNKNOWN).has_unknown_price());
        assert!(Item::new("a").with_total_value(-0.5).has_unknown_price());
        assert!(!Item::new("a").with_total_value(0.0).has_unknown_price());
    }

    #[test]
    fn test_export_image_name() {
        let item = Item::new("Shoe")
            .with_id(7)
            .with_image("file:///data/user/0/app/files/images/shoe.png");
        assert_eq!(item.image_basename(), Some("shoe.png"));
        assert_eq!(item.export_image_name().as_deref(), Some("7_shoe.png"));
    }

    #[test]
    fn test_blank_image_is_none() {
        let item = Item::new("Shoe").with_image("   ");
        assert!(item.image_ref().is_none());
        assert!(item.export_image_name().is_none());

        let item = Item::new("Shoe").with_image("images/");
        assert!(item.image_basename().is_none());
    }
}
