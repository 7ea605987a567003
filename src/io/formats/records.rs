//! Mapping between domain records and table rows.
//!
//! Column order is fixed. On import, cells are mapped by position; rows
//! shorter than the full column set (older exports) get defaults for the
//! missing trailing columns.

use crate::models::{Item, Transaction, TransactionAction};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;
use thiserror::Error;

/// Item table columns.
pub const ITEM_COLUMNS: &[&str] = &[
    "id",
    "name",
    "code",
    "warehouse",
    "numberOfBoxes",
    "boxSizeQuantities",
    "sizeType",
    "row",
    "position",
    "side",
    "imageFileName",
    "totalQuantity",
    "totalValue",
    "createdAt",
];

/// Transaction table columns.
pub const TRANSACTION_COLUMNS: &[&str] =
    &["id", "action", "itemId", "itemName", "timestamp", "details"];

/// Why a row was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    /// The item name cell is blank.
    #[error("item name is blank")]
    BlankName,
    /// The transaction action cell is blank.
    #[error("action is blank")]
    MissingAction,
    /// The action is not one this store knows.
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    /// The transaction item name cell is blank.
    #[error("item name is blank")]
    MissingItemName,
}

/// An item decoded from a row, before its image is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedItem {
    /// The item, with `image_uri` unset.
    pub item: Item,
    /// The `imageFileName` cell, if any.
    pub image_hint: Option<String>,
    /// Cells that could not be parsed and were defaulted.
    pub notes: Vec<String>,
}

/// Renders an item as table cells.
///
/// The image column holds the item's export image name, not its stored path.
#[must_use]
pub fn item_to_fields(item: &Item) -> Vec<String> {
    vec![
        item.id.to_string(),
        item.name.clone(),
        item.code.clone(),
        item.warehouse.clone(),
        item.number_of_boxes.to_string(),
        item.box_size_quantities.to_string(),
        item.size_type.clone(),
        item.row.clone().unwrap_or_default(),
        item.position.clone().unwrap_or_default(),
        item.side.clone().unwrap_or_default(),
        item.export_image_name().unwrap_or_default(),
        item.total_quantity.to_string(),
        item.total_value.to_string(),
        item.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    ]
}

/// Renders a transaction as table cells.
#[must_use]
pub fn transaction_to_fields(tx: &Transaction) -> Vec<String> {
    vec![
        tx.id.to_string(),
        tx.action.as_str().to_string(),
        tx.item_id.map(|id| id.to_string()).unwrap_or_default(),
        tx.item_name.clone(),
        tx.timestamp.to_string(),
        tx.details.clone(),
    ]
}

/// Decodes an item row.
///
/// Negative values in `totalValue` are kept as they are; they mark an
/// unknown price.
///
/// # Errors
///
/// Returns [`RowError::BlankName`] if the name cell is blank.
pub fn decode_item(fields: &[String]) -> Result<DecodedItem, RowError> {
    let name = text(fields, 1);
    if name.trim().is_empty() {
        return Err(RowError::BlankName);
    }

    let mut notes = Vec::new();
    let mut item = Item::new(name);
    item.id = cell(fields, 0).parse().unwrap_or(0);
    item.code = text(fields, 2).to_string();
    item.warehouse = text(fields, 3).to_string();
    item.number_of_boxes = parse_or(cell(fields, 4), "numberOfBoxes", &mut notes);
    item.box_size_quantities = parse_box_quantities(cell(fields, 5), &mut notes);
    item.size_type = text(fields, 6).to_string();
    item.row = optional(fields, 7);
    item.position = optional(fields, 8);
    item.side = optional(fields, 9);
    item.total_quantity = parse_or(cell(fields, 11), "totalQuantity", &mut notes);
    item.total_value = parse_value(cell(fields, 12), &mut notes);
    item.created_at = parse_created_at(cell(fields, 13), &mut notes);

    Ok(DecodedItem {
        item,
        image_hint: optional(fields, 10).map(|hint| hint.trim().to_string()),
        notes,
    })
}

/// Decodes a transaction row.
///
/// # Errors
///
/// Returns a [`RowError`] when the action or item name is missing, or the
/// action is unknown.
pub fn decode_transaction(fields: &[String]) -> Result<Transaction, RowError> {
    let action = cell(fields, 1);
    if action.is_empty() {
        return Err(RowError::MissingAction);
    }
    let item_name = text(fields, 3);
    if item_name.trim().is_empty() {
        return Err(RowError::MissingItemName);
    }
    let action =
        TransactionAction::parse(action).ok_or_else(|| RowError::UnknownAction(action.to_string()))?;

    let mut tx = Transaction::new(action, item_name);
    tx.id = cell(fields, 0).parse().unwrap_or(0);
    tx.item_id = cell(fields, 2).parse().ok();
    tx.timestamp = cell(fields, 4)
        .parse()
        .unwrap_or_else(|_| crate::current_timestamp());
    tx.details = text(fields, 5).to_string();
    Ok(tx)
}

/// Returns a cell as written, or `""` past the end of a short row.
fn text(fields: &[String], index: usize) -> &str {
    fields.get(index).map_or("", String::as_str)
}

/// Returns a cell with surrounding whitespace removed, for numbers and tags.
fn cell(fields: &[String], index: usize) -> &str {
    text(fields, index).trim()
}

fn optional(fields: &[String], index: usize) -> Option<String> {
    Some(text(fields, index))
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn parse_or<T>(raw: &str, column: &str, notes: &mut Vec<String>) -> T
where
    T: std::str::FromStr + Default,
{
    if raw.is_empty() {
        return T::default();
    }
    raw.parse().unwrap_or_else(|_| {
        notes.push(format!("{column} '{raw}' is not a number, using 0"));
        T::default()
    })
}

fn parse_value(raw: &str, notes: &mut Vec<String>) -> f64 {
    if raw.is_empty() {
        return 0.0;
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            notes.push(format!("totalValue '{raw}' is not a number, using 0"));
            0.0
        },
    }
}

fn parse_box_quantities(raw: &str, notes: &mut Vec<String>) -> Value {
    if raw.is_empty() {
        return Value::Array(Vec::new());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| {
        notes.push("boxSizeQuantities is not valid JSON, using []".to_string());
        Value::Array(Vec::new())
    })
}

fn parse_created_at(raw: &str, notes: &mut Vec<String>) -> DateTime<Utc> {
    if raw.is_empty() {
        return Utc::now();
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Utc);
    }
    if let Some(parsed) = raw
        .parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    {
        return parsed;
    }
    notes.push(format!("createdAt '{raw}' is not a timestamp, using now"));
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PRICE_UNKNOWN;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_item_fields_follow_columns() {
        let mut item = Item::new("Shoe, red")
            .with_id(7)
            .with_code("SH-7")
            .with_image("/data/images/shoe.png")
            .with_total_value(PRICE_UNKNOWN);
        item.box_size_quantities = serde_json::json!([{"40": 2}]);

        let fields = item_to_fields(&item);
        assert_eq!(fields.len(), ITEM_COLUMNS.len());
        assert_eq!(fields[1], "Shoe, red");
        assert_eq!(fields[5], r#"[{"40":2}]"#);
        assert_eq!(fields[7], "");
        assert_eq!(fields[10], "7_shoe.png");
        assert_eq!(fields[12], "-1");
    }

    #[test]
    fn test_decode_full_item_row() {
        let mut item = Item::new("Boot").with_id(3).with_total_value(12.5);
        item.number_of_boxes = 4;
        item.total_quantity = 48;
        item.side = Some("L".to_string());
        let fields = item_to_fields(&item);

        let decoded = decode_item(&fields).unwrap();
        assert!(decoded.notes.is_empty());
        assert_eq!(decoded.item.id, 3);
        assert_eq!(decoded.item.number_of_boxes, 4);
        assert_eq!(decoded.item.total_quantity, 48);
        assert_eq!(decoded.item.side.as_deref(), Some("L"));
        assert!(decoded.image_hint.is_none());
        assert!((decoded.item.total_value - 12.5).abs() < f64::EPSILON);
        assert_eq!(
            decoded.item.created_at.timestamp_millis(),
            item.created_at.timestamp_millis()
        );
    }

    #[test]
    fn test_decode_keeps_price_sentinel() {
        let decoded = decode_item(&row(&["1", "Sandal", "", "", "", "", "", "", "", "", "", "", "-1"]))
            .unwrap();
        assert!(decoded.item.has_unknown_price());
        assert!((decoded.item.total_value - PRICE_UNKNOWN).abs() < f64::EPSILON);
    }

    #[test]
    fn test_decode_short_legacy_row() {
        let decoded = decode_item(&row(&["9", "Clog", "CL-1"])).unwrap();
        assert_eq!(decoded.item.code, "CL-1");
        assert_eq!(decoded.item.box_size_quantities, Value::Array(Vec::new()));
        assert!((decoded.item.total_value).abs() < f64::EPSILON);
        assert!(decoded.notes.is_empty());
    }

    #[test]
    fn test_decode_bad_cells_default_with_notes() {
        let decoded = decode_item(&row(&[
            "x", "Mule", "", "", "many", "{not json", "", "", "", "", "9_mule.jpg", "", "cheap",
            "yesterday",
        ]))
        .unwrap();
        assert_eq!(decoded.item.id, 0);
        assert_eq!(decoded.item.number_of_boxes, 0);
        assert_eq!(decoded.item.box_size_quantities, Value::Array(Vec::new()));
        assert!((decoded.item.total_value).abs() < f64::EPSILON);
        assert_eq!(decoded.image_hint.as_deref(), Some("9_mule.jpg"));
        assert_eq!(decoded.notes.len(), 4);
    }

    #[test]
    fn test_decode_unix_seconds_created_at() {
        let mut fields = row(&["1", "Slipper"]);
        fields.resize(13, String::new());
        fields.push("1700000000".to_string());
        let decoded = decode_item(&fields).unwrap();
        assert_eq!(decoded.item.created_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_blank_name_rejected() {
        assert_eq!(decode_item(&row(&["1", "  "])), Err(RowError::BlankName));
        assert_eq!(decode_item(&[]), Err(RowError::BlankName));
    }

    #[test]
    fn test_transaction_roundtrip_fields() {
        let tx = Transaction::new(TransactionAction::Sale, "Boot")
            .with_item_id(3)
            .with_timestamp(1_700_000_123)
            .with_details("{\"qty\":2,\"note\":\"a, b\"}");
        let fields = transaction_to_fields(&tx);
        assert_eq!(fields.len(), TRANSACTION_COLUMNS.len());

        let decoded = decode_transaction(&fields).unwrap();
        assert_eq!(decoded.action, TransactionAction::Sale);
        assert_eq!(decoded.item_id, Some(3));
        assert_eq!(decoded.timestamp, 1_700_000_123);
        assert_eq!(decoded.details, tx.details);
    }

    #[test]
    fn test_transaction_rejections() {
        assert_eq!(
            decode_transaction(&row(&["1", "", "", "Boot"])).unwrap_err(),
            RowError::MissingAction
        );
        assert_eq!(
            decode_transaction(&row(&["1", "sale", "", ""])).unwrap_err(),
            RowError::MissingItemName
        );
        assert_eq!(
            decode_transaction(&row(&["1", "restock", "", "Boot"])).unwrap_err(),
            RowError::UnknownAction("restock".to_string())
        );
    }

    #[test]
    fn test_transaction_without_item_id() {
        let tx = decode_transaction(&row(&["4", "delete", "", "Boot", "17"])).unwrap();
        assert_eq!(tx.item_id, None);
        assert_eq!(tx.timestamp, 17);
        assert_eq!(tx.details, "");
    }
}
