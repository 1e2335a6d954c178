use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use std::sync::RwLock;
use uuid::Uuid;

use super::error::TicketsError;
use super::filter::TicketFilter;
use super::types::{NewTicket, Ticket, TicketPatch};
use crate::core::shared::schema::tickets::tickets;
use crate::core::shared::utils::DbPool;

/// Ticket store. Every listing is ordered newest-created first.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn insert(&self, ticket: NewTicket) -> Result<Ticket, TicketsError>;

    async fn update(&self, id: Uuid, patch: TicketPatch) -> Result<Ticket, TicketsError>;

    async fn get(&self, id: Uuid) -> Result<Ticket, TicketsError>;

    async fn query_all(&self) -> Result<Vec<Ticket>, TicketsError>;

    async fn filter(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketsError> {
        Ok(filter.apply(self.query_all().await?))
    }
}

fn not_found(id: Uuid) -> TicketsError {
    TicketsError::NotFound(format!("Ticket {id} not found"))
}

/// Process-local store, kept in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryTicketRepository {
    tickets: RwLock<Vec<Ticket>>,
}

impl InMemoryTicketRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<Ticket>>, TicketsError> {
        self.tickets
            .read()
            .map_err(|e| TicketsError::Internal(format!("Ticket store poisoned: {e}")))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<Ticket>>, TicketsError> {
        self.tickets
            .write()
            .map_err(|e| TicketsError::Internal(format!("Ticket store poisoned: {e}")))
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepository {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, ticket: NewTicket) -> Result<Ticket, TicketsError> {
        let mut tickets = self.write()?;
        let now = Utc::now();
        let created_at = match tickets.last() {
            Some(last) if last.created_at > now => last.created_at,
            _ => now,
        };

        let ticket = Ticket {
            id: Uuid::new_v4(),
            title: ticket.title,
            description: ticket.description,
            category: ticket.category,
            priority: ticket.priority,
            status: ticket.status,
            created_at,
        };
        tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn update(&self, id: Uuid, patch: TicketPatch) -> Result<Ticket, TicketsError> {
        let mut tickets = self.write()?;
        let ticket = tickets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found(id))?;
        patch.apply_to(ticket);
        Ok(ticket.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Ticket, TicketsError> {
        self.read()?
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn query_all(&self) -> Result<Vec<Ticket>, TicketsError> {
        Ok(self.read()?.iter().rev().cloned().collect())
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tickets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DbTicket {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Insert row; `created_at` comes from the column default.
#[derive(Debug, Insertable)]
#[diesel(table_name = tickets)]
struct NewDbTicket {
    id: Uuid,
    title: String,
    description: String,
    category: String,
    priority: String,
    status: String,
}

impl From<NewTicket> for NewDbTicket {
    fn from(ticket: NewTicket) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: ticket.title,
            description: ticket.description,
            category: ticket.category.to_string(),
            priority: ticket.priority.to_string(),
            status: ticket.status.to_string(),
        }
    }
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = tickets)]
struct DbTicketChanges {
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    priority: Option<String>,
    status: Option<String>,
}

impl From<TicketPatch> for DbTicketChanges {
    fn from(patch: TicketPatch) -> Self {
        Self {
            title: patch.title,
            description: patch.description,
            category: patch.category.map(|c| c.to_string()),
            priority: patch.priority.map(|p| p.to_string()),
            status: patch.status.map(|s| s.to_string()),
        }
    }
}

impl TryFrom<DbTicket> for Ticket {
    type Error = TicketsError;

    fn try_from(db: DbTicket) -> Result<Self, Self::Error> {
        let id = db.id;
        let corrupt = move |e: String| TicketsError::Storage(format!("Ticket {id}: {e}"));
        Ok(Self {
            id,
            category: db.category.parse().map_err(corrupt)?,
            priority: db.priority.parse().map_err(corrupt)?,
            status: db.status.parse().map_err(corrupt)?,
            title: db.title,
            description: db.description,
            created_at: db.created_at,
        })
    }
}

fn into_tickets(rows: Vec<DbTicket>) -> Result<Vec<Ticket>, TicketsError> {
    rows.into_iter().map(Ticket::try_from).collect()
}

/// Escapes LIKE wildcards so user search text matches literally.
fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Boxed SELECT for a filter, newest first.
fn filtered_query(filter: &TicketFilter) -> tickets::BoxedQuery<'static, Pg> {
    let mut q = tickets::table.into_boxed();

    if let Some(category) = filter.category {
        q = q.filter(tickets::category.eq(category.to_string()));
    }

    if let Some(priority) = filter.priority {
        q = q.filter(tickets::priority.eq(priority.to_string()));
    }

    if let Some(status) = filter.status {
        q = q.filter(tickets::status.eq(status.to_string()));
    }

    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        q = q.filter(
            tickets::title
                .ilike(pattern.clone())
                .or(tickets::description.ilike(pattern)),
        );
    }

    q.order(tickets::created_at.desc())
}

/// PostgreSQL store. Diesel calls are synchronous and run on the blocking
/// pool.
#[derive(Clone)]
pub struct PgTicketRepository {
    pool: DbPool,
}

impl PgTicketRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, TicketsError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, TicketsError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut *conn)
        })
        .await?
    }
}

#[async_trait]
impl TicketRepository for PgTicketRepository {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, ticket: NewTicket) -> Result<Ticket, TicketsError> {
        let row = NewDbTicket::from(ticket);

        self.with_conn(move |conn| {
            let inserted: DbTicket = diesel::insert_into(tickets::table)
                .values(&row)
                .returning(DbTicket::as_returning())
                .get_result(conn)?;
            Ticket::try_from(inserted)
        })
        .await
    }

    async fn update(&self, id: Uuid, patch: TicketPatch) -> Result<Ticket, TicketsError> {
        if patch.is_empty() {
            return self.get(id).await;
        }
        let changes = DbTicketChanges::from(patch);

        self.with_conn(move |conn| {
            let updated: Option<DbTicket> = diesel::update(tickets::table.find(id))
                .set(&changes)
                .returning(DbTicket::as_returning())
                .get_result(conn)
                .optional()?;
            updated.map(Ticket::try_from).unwrap_or_else(|| Err(not_found(id)))
        })
        .await
    }

    async fn get(&self, id: Uuid) -> Result<Ticket, TicketsError> {
        self.with_conn(move |conn| {
            let row: Option<DbTicket> = tickets::table
                .find(id)
                .select(DbTicket::as_select())
                .first(conn)
                .optional()?;
            row.map(Ticket::try_from).unwrap_or_else(|| Err(not_found(id)))
        })
        .await
    }

    async fn query_all(&self) -> Result<Vec<Ticket>, TicketsError> {
        self.filter(&TicketFilter::default()).await
    }

    async fn filter(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketsError> {
        if filter.matches_nothing {
            return Ok(Vec::new());
        }
        let filter = filter.clone();

        self.with_conn(move |conn| {
            let rows: Vec<DbTicket> = filtered_query(&filter).load(conn)?;
            into_tickets(rows)
        })
        .await
    }
}
