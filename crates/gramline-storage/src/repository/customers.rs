//! Customer repository

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{CreateCustomer, Customer};

/// Customer repository
#[derive(Clone)]
pub struct CustomerRepository {
    pool: PgPool,
}

impl CustomerRepository {
    /// Create a new customer repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a customer
    pub async fn create(&self, input: CreateCustomer) -> Result<Customer, sqlx::Error> {
        let id = Uuid::new_v4();

        sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (id, name, email, plan)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.plan)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a customer by ID
    pub async fn get(&self, id: Uuid) -> Result<Option<Customer>, sqlx::Error> {
        sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// List customers
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Customer>, sqlx::Error> {
        sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }
}
