use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::manager::DatabaseError;

/// A bound filter value. Columns are compile-time strings supplied by the
/// model layer; only values are bound.
#[derive(Debug, Clone)]
pub enum FilterValue {
    Uuid(Uuid),
    Text(String),
    Bool(bool),
}

impl From<Uuid> for FilterValue {
    fn from(v: Uuid) -> Self {
        FilterValue::Uuid(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Text(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Text(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

/// Conjunction of equality predicates plus optional ordering
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pairs: Vec<(&'static str, FilterValue)>,
    order_by: Option<(&'static str, bool)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<FilterValue>) -> Self {
        self.pairs.push((column, value.into()));
        self
    }

    pub fn order_desc(mut self, column: &'static str) -> Self {
        self.order_by = Some((column, true));
        self
    }

    pub fn order_asc(mut self, column: &'static str) -> Self {
        self.order_by = Some((column, false));
        self
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        for (column, value) in &self.pairs {
            qb.push(" AND ").push(*column).push(" = ");
            match value {
                FilterValue::Uuid(v) => qb.push_bind(*v),
                FilterValue::Text(v) => qb.push_bind(v.clone()),
                FilterValue::Bool(v) => qb.push_bind(*v),
            };
        }
    }

    fn push_order(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some((column, desc)) = self.order_by {
            qb.push(" ORDER BY ")
                .push(column)
                .push(if desc { " DESC" } else { " ASC" });
        }
    }
}

/// Generic read-side repository over a single table. The write side lives in
/// each model's manager with explicit SQL.
pub struct Repository<T> {
    table_name: &'static str,
    pool: PgPool,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Repository<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(table_name: &'static str, pool: PgPool) -> Self {
        Self {
            table_name,
            pool,
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn select_any(&self, filter: Filter) -> Result<Vec<T>, DatabaseError> {
        let mut qb = QueryBuilder::new(format!("SELECT * FROM {} WHERE 1=1", self.table_name));
        filter.push_where(&mut qb);
        filter.push_order(&mut qb);
        Ok(qb.build_query_as::<T>().fetch_all(&self.pool).await?)
    }

    pub async fn select_one(&self, filter: Filter) -> Result<Option<T>, DatabaseError> {
        let mut qb = QueryBuilder::new(format!("SELECT * FROM {} WHERE 1=1", self.table_name));
        filter.push_where(&mut qb);
        filter.push_order(&mut qb);
        qb.push(" LIMIT 1");
        Ok(qb.build_query_as::<T>().fetch_optional(&self.pool).await?)
    }

    pub async fn select_404(&self, filter: Filter) -> Result<T, DatabaseError> {
        self.select_one(filter)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Record not found".to_string()))
    }

    pub async fn select_by_id(&self, id: Uuid) -> Result<T, DatabaseError> {
        self.select_404(Filter::new().eq("id", id)).await
    }

    pub async fn count(&self, filter: Filter) -> Result<i64, DatabaseError> {
        let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {} WHERE 1=1", self.table_name));
        filter.push_where(&mut qb);
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    pub async fn select_page(
        &self,
        filter: Filter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<T>, DatabaseError> {
        let mut qb = QueryBuilder::new(format!("SELECT * FROM {} WHERE 1=1", self.table_name));
        filter.push_where(&mut qb);
        filter.push_order(&mut qb);
        qb.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);
        Ok(qb.build_query_as::<T>().fetch_all(&self.pool).await?)
    }
}
