//! Gym expenses and per-category totals.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::{ServiceError, activity, clamp_limit, optional_text, positive_amount, required_text};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub category: String,
    pub amount_cents: i64,
    pub spent_on: NaiveDate,
    pub note: Option<String>,
    pub recorded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryTotal {
    pub category: String,
    pub total_cents: i64,
    pub count: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpenseFilter {
    pub category: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct NewExpense {
    pub category: String,
    pub amount_cents: i64,
    pub spent_on: Option<NaiveDate>,
    pub note: Option<String>,
}

/// Categories are free text; compare them case-insensitively.
#[must_use]
pub fn normalize_category(category: &str) -> String {
    category.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

pub async fn list(pool: &PgPool, gym_id: Uuid, filter: &ExpenseFilter) -> Result<Vec<Expense>, ServiceError> {
    let category = optional_text(filter.category.as_deref()).map(|c| normalize_category(&c));
    let rows = sqlx::query_as::<_, Expense>(
        "SELECT id, category, amount_cents, spent_on, note, recorded_by, created_at
         FROM expenses
         WHERE gym_id = $1
           AND ($2::text IS NULL OR category = $2)
           AND ($3::date IS NULL OR spent_on >= $3)
           AND ($4::date IS NULL OR spent_on <= $4)
         ORDER BY spent_on DESC, created_at DESC
         LIMIT $5",
    )
    .bind(gym_id)
    .bind(category)
    .bind(filter.from)
    .bind(filter.to)
    .bind(clamp_limit(filter.limit))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn totals_by_category(
    pool: &PgPool,
    gym_id: Uuid,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<CategoryTotal>, ServiceError> {
    let rows = sqlx::query_as::<_, CategoryTotal>(
        "SELECT category, SUM(amount_cents)::bigint AS total_cents, COUNT(*) AS count
         FROM expenses
         WHERE gym_id = $1
           AND ($2::date IS NULL OR spent_on >= $2)
           AND ($3::date IS NULL OR spent_on <= $3)
         GROUP BY category
         ORDER BY total_cents DESC",
    )
    .bind(gym_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create(pool: &PgPool, gym_id: Uuid, actor: Uuid, input: NewExpense) -> Result<Expense, ServiceError> {
    let category = normalize_category(&required_text("category", &input.category)?);
    let amount = positive_amount("amount_cents", input.amount_cents)?;

    let expense = sqlx::query_as::<_, Expense>(
        "INSERT INTO expenses (gym_id, category, amount_cents, spent_on, note, recorded_by)
         VALUES ($1, $2, $3, COALESCE($4, CURRENT_DATE), $5, $6)
         RETURNING id, category, amount_cents, spent_on, note, recorded_by, created_at",
    )
    .bind(gym_id)
    .bind(&category)
    .bind(amount)
    .bind(input.spent_on)
    .bind(optional_text(input.note.as_deref()))
    .bind(actor)
    .fetch_one(pool)
    .await?;

    activity::record(
        pool,
        gym_id,
        Some(actor),
        "create",
        "expense",
        Some(expense.id),
        serde_json::json!({ "category": category, "amount_cents": amount }),
    )
    .await;
    Ok(expense)
}

pub async fn delete(pool: &PgPool, gym_id: Uuid, actor: Uuid, expense_id: Uuid) -> Result<(), ServiceError> {
    let result = sqlx::query("DELETE FROM expenses WHERE gym_id = $1 AND id = $2")
        .bind(gym_id)
        .bind(expense_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound("expense"));
    }
    activity::record(pool, gym_id, Some(actor), "delete", "expense", Some(expense_id), serde_json::json!({})).await;
    Ok(())
}
