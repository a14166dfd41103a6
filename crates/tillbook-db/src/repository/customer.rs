//! # Customer Repository
//!
//! Customer records and their `CUST001`-style codes.
//!
//! Codes are issued inside the insert transaction, so two forms saving at
//! once cannot be handed the same code.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tillbook_core::customer::{next_customer_code, normalize_new_customer, CUSTOMER_CODE_PREFIX};
use tillbook_core::validation::validate_search_query;
use tillbook_core::{Customer, NewCustomer};

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Creates a customer with the next free code.
    pub async fn create(&self, input: NewCustomer) -> DbResult<Customer> {
        let input = normalize_new_customer(input)?;

        let mut tx = self.pool.begin().await?;

        let codes: Vec<String> = sqlx::query_scalar("SELECT cust_id FROM customers WHERE cust_id LIKE ?1")
            .bind(format!("{}%", CUSTOMER_CODE_PREFIX))
            .fetch_all(&mut *tx)
            .await?;

        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            cust_id: next_customer_code(codes.iter().map(String::as_str)),
            name: input.name,
            phone: input.phone,
            address: input.address,
            state: input.state,
            created_at: Utc::now(),
        };

        debug!(id = %customer.id, cust_id = %customer.cust_id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, cust_id, name, phone, address, state, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.cust_id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.state)
        .bind(customer.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(customer)
    }

    /// Gets a customer by row ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Lists every customer, newest first.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let customers =
            sqlx::query_as::<_, Customer>("SELECT * FROM customers ORDER BY created_at DESC, cust_id DESC")
                .fetch_all(&self.pool)
                .await?;

        Ok(customers)
    }

    /// Case-insensitive substring match on name or phone.
    ///
    /// A blank query returns nothing.
    pub async fn search(&self, query: &str, limit: usize) -> DbResult<Vec<Customer>> {
        let query = validate_search_query(query)?;
        if query.is_empty() {
            return Ok(Vec::new());
        }

        debug!(query = %query, limit = limit, "Searching customers");

        let pattern = format!("%{}%", query);
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT * FROM customers
            WHERE name LIKE ?1 OR phone LIKE ?1
            ORDER BY name COLLATE NOCASE
            LIMIT ?2
            "#,
        )
        .bind(&pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Updates contact fields. The code never changes.
    pub async fn update(&self, id: &str, input: NewCustomer) -> DbResult<Customer> {
        let input = normalize_new_customer(input)?;

        debug!(id = %id, "Updating customer");

        let result = sqlx::query(
            r#"
            UPDATE customers SET name = ?2, phone = ?3, address = ?4, state = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(&input.state)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use tillbook_core::NewCustomer;

    fn named(name: &str, phone: Option<&str>) -> NewCustomer {
        NewCustomer {
            name: name.to_string(),
            phone: phone.map(str::to_string),
            ..NewCustomer::default()
        }
    }

    #[tokio::test]
    async fn test_codes_are_sequential() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let first = db.customers().create(named("Asha", None)).await.unwrap();
        let second = db.customers().create(named("Ravi", None)).await.unwrap();

        assert_eq!(first.cust_id, "CUST001");
        assert_eq!(second.cust_id, "CUST002");
    }

    #[tokio::test]
    async fn test_search_by_name_or_phone() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.customers()
            .create(named("Asha Menon", Some("9847012345")))
            .await
            .unwrap();
        db.customers().create(named("Ravi", None)).await.unwrap();

        assert_eq!(db.customers().search("asha", 10).await.unwrap().len(), 1);
        assert_eq!(db.customers().search("98470", 10).await.unwrap().len(), 1);
        assert!(db.customers().search("  ", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_code() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let created = db.customers().create(named("Asha", None)).await.unwrap();

        let updated = db
            .customers()
            .update(
                &created.id,
                NewCustomer {
                    state: Some("Kerala".into()),
                    ..named("Asha M", None)
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.cust_id, "CUST001");
        assert_eq!(updated.name, "Asha M");
        assert_eq!(updated.state.as_deref(), Some("Kerala"));
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.customers().create(named(" ", None)).await.is_err());
    }
}
