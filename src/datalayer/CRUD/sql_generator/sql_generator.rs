use sea_query::{Alias, Asterisk, Expr, Iden, Order, PostgresQueryBuilder, Query, Value};
use sqlx::Postgres;
use sqlx::postgres::PgArguments;

/* ----------------------------- FLUENT BUILDER WRAPPER ----------------------------- */

// --- INSERT ---

pub struct FluentInsert {
    table: Alias,
    values: Vec<(Alias, Value)>,
    returning: Vec<Alias>,
}

impl FluentInsert {
    pub fn into<T: Iden>(table: T) -> Self {
        Self {
            table: Alias::new(table.to_string()),
            values: vec![],
            returning: vec![],
        }
    }

    pub fn value<C: Iden, V: Into<Value>>(mut self, col: C, v: V) -> Self {
        self.values.push((Alias::new(col.to_string()), v.into()));
        self
    }

    /// Adds the column only when a value is present, so the column default applies otherwise
    pub fn value_opt<C: Iden, V: Into<Value>>(self, col: C, v: Option<V>) -> Self {
        match v {
            Some(v) => self.value(col, v),
            None => self,
        }
    }

    pub fn returning<C: Iden>(mut self, col: C) -> Self {
        self.returning.push(Alias::new(col.to_string()));
        self
    }

    pub fn render(self) -> (String, sea_query::Values) {
        let mut query = Query::insert();
        query.into_table(self.table);

        let (cols, vals): (Vec<Alias>, Vec<Value>) = self.values.into_iter().unzip();

        query.columns(cols);
        query.values_panic(vals.into_iter().map(sea_query::SimpleExpr::Value));

        if !self.returning.is_empty() {
            query.returning(Query::returning().columns(self.returning));
        }

        query.build(PostgresQueryBuilder)
    }
}

// --- SELECT ---

pub struct FluentSelect {
    table: Alias,
    columns: Vec<Alias>,
    filters: Vec<(Alias, Value)>,
    limit: Option<u64>,
    order_by: Option<(Alias, Order)>,
}

impl FluentSelect {
    pub fn from<T: Iden>(table: T) -> Self {
        Self {
            table: Alias::new(table.to_string()),
            columns: vec![],
            filters: vec![],
            limit: None,
            order_by: None,
        }
    }

    pub fn column<C: Iden>(mut self, col: C) -> Self {
        self.columns.push(Alias::new(col.to_string()));
        self
    }

    /// Adds an equality condition; conditions are AND-ed
    pub fn filter<C: Iden, V: Into<Value>>(mut self, col: C, v: V) -> Self {
        self.filters.push((Alias::new(col.to_string()), v.into()));
        self
    }

    pub fn filter_opt<C: Iden, V: Into<Value>>(self, col: C, v: Option<V>) -> Self {
        match v {
            Some(v) => self.filter(col, v),
            None => self,
        }
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn order_by<C: Iden>(mut self, col: C, order: Order) -> Self {
        self.order_by = Some((Alias::new(col.to_string()), order));
        self
    }

    /// Whether any filter was applied; an unfiltered single-row read is refused by callers
    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    pub fn render(self) -> (String, sea_query::Values) {
        let mut query = Query::select();
        query.from(self.table);

        if !self.columns.is_empty() {
            query.columns(self.columns);
        } else {
            query.column(Asterisk);
        }

        for (col, val) in self.filters {
            query.and_where(Expr::col(col).eq(val));
        }

        if let Some((col, order)) = self.order_by {
            query.order_by(col, order);
        }

        if let Some(l) = self.limit {
            query.limit(l);
        }

        query.build(PostgresQueryBuilder)
    }
}

/// Binds rendered sea-query values onto a sqlx query in placeholder order
pub fn bind_query<'a>(
    mut query: sqlx::query::Query<'a, Postgres, PgArguments>,
    values: sea_query::Values,
) -> sqlx::query::Query<'a, Postgres, PgArguments> {
    for value in values.0 {
        query = match value {
            Value::Bool(v) => query.bind(v),
            Value::TinyInt(v) => query.bind(v.map(|x| x as i16)),
            Value::SmallInt(v) => query.bind(v),
            Value::Int(v) => query.bind(v),
            Value::BigInt(v) => query.bind(v),
            Value::TinyUnsigned(v) => query.bind(v.map(|x| x as i16)),
            Value::SmallUnsigned(v) => query.bind(v.map(|x| x as i32)),
            Value::Unsigned(v) => query.bind(v.map(|x| x as i64)),
            Value::BigUnsigned(v) => query.bind(v.map(|x| x as i64)),
            Value::Float(v) => query.bind(v),
            Value::Double(v) => query.bind(v),
            Value::String(v) => query.bind(v.map(|s| *s)),
            Value::Char(v) => query.bind(v.map(|c| c.to_string())),
            Value::Bytes(v) => query.bind(v.map(|b| *b)),
            Value::ChronoDate(v) => query.bind(v.map(|d| *d)),
            Value::ChronoTime(v) => query.bind(v.map(|t| *t)),
            Value::ChronoDateTime(v) => query.bind(v.map(|dt| *dt)),
            Value::ChronoDateTimeUtc(v) => query.bind(v.map(|dt| *dt)),
            Value::ChronoDateTimeLocal(v) => query.bind(v.map(|dt| *dt)),
            Value::ChronoDateTimeWithTimeZone(v) => query.bind(v.map(|dt| *dt)),
        };
    }
    query
}
