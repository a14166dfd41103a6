//! Customer codes and lookup.

use crate::error::CoreResult;
use crate::types::{Customer, NewCustomer};
use crate::validation::{validate_customer_name, validate_phone};

/// Prefix of human-readable customer codes.
pub const CUSTOMER_CODE_PREFIX: &str = "CUST";

/// Next code after the highest numeric suffix among `existing`.
///
/// Codes that do not follow the `CUST<digits>` pattern are ignored.
///
/// ## Example
/// ```rust
/// use tillbook_core::customer::next_customer_code;
///
/// assert_eq!(next_customer_code(Vec::<&str>::new()), "CUST001");
/// assert_eq!(next_customer_code(["CUST001", "CUST009", "legacy"]), "CUST010");
/// assert_eq!(next_customer_code(["CUST999"]), "CUST1000");
/// ```
pub fn next_customer_code<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let highest = existing
        .into_iter()
        .filter_map(|code| code.trim().strip_prefix(CUSTOMER_CODE_PREFIX))
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|digits| digits.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{:03}", CUSTOMER_CODE_PREFIX, highest + 1)
}

/// Trims a new customer's fields and checks them.
pub fn normalize_new_customer(input: NewCustomer) -> CoreResult<NewCustomer> {
    validate_customer_name(&input.name)?;
    let clean = |v: Option<String>| {
        v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    };
    let phone = clean(input.phone);
    if let Some(phone) = &phone {
        validate_phone(phone)?;
    }
    Ok(NewCustomer {
        name: input.name.trim().to_string(),
        phone,
        address: clean(input.address),
        state: clean(input.state),
    })
}

/// Case-insensitive substring match on name or phone, first `limit` hits.
///
/// A blank query matches nothing.
pub fn search_customers<'a>(customers: &'a [Customer], query: &str, limit: usize) -> Vec<&'a Customer> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    customers
        .iter()
        .filter(|c| {
            c.name.to_lowercase().contains(&query)
                || c.phone
                    .as_deref()
                    .is_some_and(|p| p.to_lowercase().contains(&query))
        })
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn customer(code: &str, name: &str, phone: Option<&str>) -> Customer {
        Customer {
            id: code.to_lowercase(),
            cust_id: code.to_string(),
            name: name.to_string(),
            phone: phone.map(str::to_string),
            address: None,
            state: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_next_code_skips_malformed() {
        assert_eq!(next_customer_code(["CUST", "CUSTx1", "CUST002"]), "CUST003");
    }

    #[test]
    fn test_normalize_new_customer() {
        let clean = normalize_new_customer(NewCustomer {
            name: "  Asha ".into(),
            phone: Some("  ".into()),
            address: None,
            state: Some(" Kerala ".into()),
        })
        .unwrap();
        assert_eq!(clean.name, "Asha");
        assert_eq!(clean.phone, None);
        assert_eq!(clean.state.as_deref(), Some("Kerala"));

        assert!(normalize_new_customer(NewCustomer::default()).is_err());
    }

    #[test]
    fn test_search_by_name_or_phone() {
        let customers = vec![
            customer("CUST001", "Asha Menon", Some("9847012345")),
            customer("CUST002", "Ravi", None),
            customer("CUST003", "ASHWIN", Some("9000000000")),
        ];

        let hits = search_customers(&customers, "ash", 10);
        assert_eq!(hits.len(), 2);

        let hits = search_customers(&customers, "98470", 10);
        assert_eq!(hits[0].cust_id, "CUST001");

        assert_eq!(search_customers(&customers, "ash", 1).len(), 1);
        assert!(search_customers(&customers, "  ", 10).is_empty());
    }
}
