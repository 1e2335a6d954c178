pub mod classifier;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod stats;
pub mod storage;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub use classifier::TicketClassifier;
pub use error::TicketsError;
pub use filter::TicketFilter;
pub use handlers::*;
pub use stats::{aggregate, TicketStats};
pub use storage::{InMemoryTicketRepository, PgTicketRepository, TicketRepository};
pub use types::*;

pub fn configure_tickets_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tickets", get(list_tickets).post(create_ticket))
        .route("/api/tickets/stats", get(get_ticket_stats))
        .route("/api/tickets/classify", post(classify_ticket))
        .route("/api/tickets/:id", get(get_ticket).patch(update_ticket))
}
