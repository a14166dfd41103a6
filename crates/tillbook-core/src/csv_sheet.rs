//! # CSV Sheets
//!
//! Bulk product import and the report exports.
//!
//! ## Import Shape
//! ```text
//! one CSV row per variant; product columns repeat on every row
//!
//! name,hsn_code,...,variant_size,variant_color,...
//! Classic Black Frame,9001,...,M,Black        ─┐
//! Classic Black Frame,9001,...,L,Black        ─┴─► ProductGroup { product, variants: [M, L] }
//! Kids Blue Frame,9002,...,S,Blue             ───► ProductGroup { product, variants: [S] }
//!
//! group key = (name, hsn_code), first-appearance order
//! first row of a group supplies the product fields
//! ```

use std::collections::HashMap;

use csv::{QuoteStyle, ReaderBuilder, Terminator, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{NewProduct, NewVariant};

/// Downloadable starting point for the import.
pub const PRODUCT_TEMPLATE: &str = "\
name,description,price,offer_price,category,hsn_code,image_urls,stock_quantity,is_active,featured,features,ingredients,offers,variant_size,variant_color,variant_price,variant_stock,variant_image
Classic Black Frame,\"Stylish black frame\",1200,999,eyeglasses,9001,\"https://example.com/img1.jpg|https://example.com/img2.jpg\",50,true,false,\"High quality|Lightweight\",\"Material info\",\"Offer text\",M,Black,999,20,https://example.com/var_img1.jpg
Classic Black Frame,\"Stylish black frame\",1200,999,eyeglasses,9001,\"https://example.com/img1.jpg|https://example.com/img2.jpg\",50,true,false,\"High quality|Lightweight\",\"Material info\",\"Offer text\",L,Black,999,10,https://example.com/var_img2.jpg
Kids Blue Frame,\"Kids frame\",800,700,kids,9002,\"https://example.com/kid1.jpg\",20,true,false,\"Kids safe\",\"Plastic\",\"Offer text\",S,Blue,700,40,https://example.com/kid_var1.jpg
";

const VARIANT_COLUMNS: [&str; 5] = [
    "variant_size",
    "variant_color",
    "variant_price",
    "variant_stock",
    "variant_image",
];

// =============================================================================
// Reading
// =============================================================================

/// One data row, keyed by header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetRow {
    /// 1-based line number in the file.
    pub line: usize,
    values: HashMap<String, String>,
}

impl SheetRow {
    /// The trimmed cell, or `""` when the column or cell is missing.
    pub fn get(&self, column: &str) -> &str {
        self.values.get(column).map(String::as_str).unwrap_or("")
    }
}

/// Reads a CSV with a header row.
///
/// Blank lines are skipped, cells are trimmed, quoted cells may contain
/// commas, and `""` inside quotes is a literal quote. Short rows are padded
/// with empty cells.
pub fn read_rows(text: &str) -> CoreResult<Vec<SheetRow>> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CoreError::Csv {
            line: 1,
            reason: e.to_string(),
        })?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CoreError::Csv {
            line: e.position().map(|p| p.line() as usize).unwrap_or(0),
            reason: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        let values = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), record.get(i).unwrap_or("").to_string()))
            .collect();
        rows.push(SheetRow { line, values });
    }

    Ok(rows)
}

// =============================================================================
// Product Grouping
// =============================================================================

/// A product and the variants listed under it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductGroup {
    pub product: NewProduct,
    pub variants: Vec<NewVariant>,
}

fn optional(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn whole_number(value: &str) -> i64 {
    Money::parse(value)
        .map(|m| m.paise().div_euclid(100))
        .unwrap_or(0)
        .max(0)
}

fn flag(value: &str, default: bool) -> bool {
    if value.is_empty() {
        default
    } else {
        value.eq_ignore_ascii_case("true")
    }
}

fn product_from_row(row: &SheetRow) -> NewProduct {
    let name = row.get("name");
    let mut images = split_list(row.get("image_urls"));
    let image_url = (!images.is_empty()).then(|| images.remove(0));

    NewProduct {
        name: if name.is_empty() {
            "Unnamed Product".to_string()
        } else {
            name.to_string()
        },
        description: optional(row.get("description")),
        price_paise: Money::parse(row.get("price"))
            .unwrap_or_default()
            .non_negative()
            .paise(),
        offer_price_paise: optional(row.get("offer_price"))
            .and_then(|v| Money::parse(&v))
            .map(|m| m.non_negative().paise()),
        category: optional(row.get("category")),
        hsn_code: optional(row.get("hsn_code")),
        image_url,
        extra_image_urls: images,
        features: split_list(row.get("features")),
        ingredients: optional(row.get("ingredients")),
        offers: optional(row.get("offers")),
        stock_quantity: whole_number(row.get("stock_quantity")),
        is_active: flag(row.get("is_active"), true),
        featured: flag(row.get("featured"), false),
    }
}

fn variant_from_row(row: &SheetRow) -> Option<NewVariant> {
    if VARIANT_COLUMNS.iter().all(|c| row.get(c).is_empty()) {
        return None;
    }
    Some(NewVariant {
        size: optional(row.get("variant_size")),
        color: optional(row.get("variant_color")),
        price_paise: optional(row.get("variant_price"))
            .and_then(|v| Money::parse(&v))
            .map(|m| m.non_negative().paise()),
        stock_quantity: whole_number(row.get("variant_stock")),
        image_url: optional(row.get("variant_image")),
    })
}

/// Groups rows into products with nested variants.
pub fn group_products(rows: &[SheetRow]) -> Vec<ProductGroup> {
    let mut order: Vec<(String, String)> = Vec::new();
    let mut groups: HashMap<(String, String), ProductGroup> = HashMap::new();

    for row in rows {
        let key = (row.get("name").to_string(), row.get("hsn_code").to_string());
        let group = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            ProductGroup {
                product: product_from_row(row),
                variants: Vec::new(),
            }
        });
        if let Some(variant) = variant_from_row(row) {
            group.variants.push(variant);
        }
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .collect()
}

/// Reads and groups a product import file.
pub fn parse_product_sheet(text: &str) -> CoreResult<Vec<ProductGroup>> {
    let rows = read_rows(text)?;
    Ok(group_products(&rows))
}

// =============================================================================
// Writing
// =============================================================================

/// A money cell: `1234.50`, no symbol.
pub fn amount_cell(amount: Money) -> String {
    let sign = if amount.is_negative() { "-" } else { "" };
    format!("{}{}.{:02}", sign, amount.rupees().abs(), amount.paise_part())
}

/// Writes a header line plus rows, joined by `\n` with no trailing newline.
///
/// Text cells are quoted with `"` doubled inside; numeric cells are left
/// bare.
pub fn write_sheet(headers: &[&str], rows: &[Vec<String>]) -> CoreResult<String> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::NonNumeric)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for row in rows {
        writer.write_record(row).map_err(|e| CoreError::Csv {
            line: 0,
            reason: e.to_string(),
        })?;
    }

    let body = writer.into_inner().map_err(|e| CoreError::Csv {
        line: 0,
        reason: e.to_string(),
    })?;
    let body = String::from_utf8(body).map_err(|e| CoreError::Csv {
        line: 0,
        reason: e.to_string(),
    })?;

    let mut out = headers.join(",");
    if !body.is_empty() {
        out.push('\n');
        out.push_str(body.trim_end_matches('\n'));
    }
    Ok(out)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_groups_into_two_products() {
        let groups = parse_product_sheet(PRODUCT_TEMPLATE).unwrap();
        assert_eq!(groups.len(), 2);

        let frame = &groups[0];
        assert_eq!(frame.product.name, "Classic Black Frame");
        assert_eq!(frame.product.hsn_code.as_deref(), Some("9001"));
        assert_eq!(frame.product.price_paise, 120_000);
        assert_eq!(frame.product.offer_price_paise, Some(99_900));
        assert_eq!(
            frame.product.image_url.as_deref(),
            Some("https://example.com/img1.jpg")
        );
        assert_eq!(
            frame.product.extra_image_urls,
            vec!["https://example.com/img2.jpg".to_string()]
        );
        assert_eq!(frame.product.features, vec!["High quality", "Lightweight"]);
        assert!(frame.product.is_active);
        assert!(!frame.product.featured);
        assert_eq!(frame.variants.len(), 2);
        assert_eq!(frame.variants[1].size.as_deref(), Some("L"));
        assert_eq!(frame.variants[1].stock_quantity, 10);

        let kids = &groups[1];
        assert_eq!(kids.variants.len(), 1);
        assert!(kids.product.extra_image_urls.is_empty());
    }

    #[test]
    fn test_same_name_different_hsn_splits() {
        let text = "name,hsn_code,price\nFrame,1,10\nFrame,2,20\nFrame,1,30\n";
        let groups = parse_product_sheet(text).unwrap();
        assert_eq!(groups.len(), 2);
        // first row wins
        assert_eq!(groups[0].product.price_paise, 1_000);
        assert!(groups[0].variants.is_empty());
    }

    #[test]
    fn test_quotes_commas_and_blank_lines() {
        let text = "name,description,price\n\n\"Frame, Round\",\"He said \"\"hi\"\"\", 15 \n";
        let rows = read_rows(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), "Frame, Round");
        assert_eq!(rows[0].get("description"), "He said \"hi\"");
        assert_eq!(rows[0].get("price"), "15");
        assert_eq!(rows[0].get("missing"), "");
    }

    #[test]
    fn test_defaults_for_bad_cells() {
        let text = "name,price,offer_price,is_active,featured\n,abc,,no,TRUE\n";
        let groups = parse_product_sheet(text).unwrap();
        let product = &groups[0].product;
        assert_eq!(product.name, "Unnamed Product");
        assert_eq!(product.price_paise, 0);
        assert_eq!(product.offer_price_paise, None);
        assert!(!product.is_active);
        assert!(product.featured);
    }

    #[test]
    fn test_variant_detected_by_any_column() {
        let text = "name,variant_size,variant_stock\nA,,\nA,,5\n";
        let groups = parse_product_sheet(text).unwrap();
        assert_eq!(groups[0].variants.len(), 1);
        assert_eq!(groups[0].variants[0].stock_quantity, 5);
        assert_eq!(groups[0].variants[0].size, None);
    }

    #[test]
    fn test_amount_cell() {
        assert_eq!(amount_cell(Money::from_paise(123_450)), "1234.50");
        assert_eq!(amount_cell(Money::from_paise(-5)), "-0.05");
    }

    #[test]
    fn test_write_sheet_quotes_text() {
        let out = write_sheet(
            &["Invoice", "Amount"],
            &[vec!["INV \"A\"".to_string(), "10.00".to_string()]],
        )
        .unwrap();

        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("Invoice,Amount"));
        assert_eq!(lines.next(), Some("\"INV \"\"A\"\"\",10.00"));
        assert!(!out.ends_with('\n'));
    }

    #[test]
    fn test_write_sheet_header_only() {
        let out = write_sheet(&["A", "B"], &[]).unwrap();
        assert_eq!(out, "A,B");
    }
}
