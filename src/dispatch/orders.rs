//! Production orders exported by the ERP as JSON files.
//!
//! ```json
//! { "orders": [ { "type": 5, "quantity": 2 } ] }
//! ```

use super::recipe::Piece;
use crate::error::Result;
use serde::Deserialize;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

/// One order: a final piece type and how many were requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Order {
    #[serde(rename = "type")]
    pub piece: Piece,
    #[serde(default)]
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
struct OrderFile {
    #[serde(default)]
    orders: Vec<Order>,
}

/// Parse the orders of one file
pub fn parse_orders(contents: &str) -> Result<Vec<Order>> {
    let file: OrderFile = serde_json::from_str(contents)?;
    Ok(file.orders)
}

/// Queue the orders of every `*.json` file in `dir`, files taken by name
pub fn load_orders<P: AsRef<Path>>(dir: P) -> Result<VecDeque<Order>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir.as_ref())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    let mut queue = VecDeque::new();
    for path in files {
        let orders = parse_orders(&fs::read_to_string(&path)?)?;
        log::debug!("{}: {} orders", path.display(), orders.len());
        queue.extend(orders);
    }
    Ok(queue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_orders() {
        let orders =
            parse_orders(r#"{"orders": [{"type": 5, "quantity": 2}, {"type": 9}]}"#).unwrap();
        assert_eq!(
            orders,
            vec![
                Order {
                    piece: 5,
                    quantity: 2
                },
                Order {
                    piece: 9,
                    quantity: 0
                },
            ]
        );
    }

    #[test]
    fn test_missing_orders_key_is_empty() {
        assert!(parse_orders(r#"{"client": "acme"}"#).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(parse_orders("{ not json").is_err());
    }

    #[test]
    fn test_load_orders_sorted_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("b.json"),
            r#"{"orders": [{"type": 7, "quantity": 1}]}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("a.json"),
            r#"{"orders": [{"type": 3, "quantity": 4}, {"type": 4, "quantity": 1}]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let queue = load_orders(dir.path()).unwrap();
        let pieces: Vec<Piece> = queue.iter().map(|o| o.piece).collect();
        assert_eq!(pieces, vec![3, 4, 7]);
    }

    #[test]
    fn test_load_orders_missing_dir() {
        assert!(load_orders("/nonexistent/orders/dir").is_err());
    }
}
