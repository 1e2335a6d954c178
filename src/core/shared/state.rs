use std::sync::Arc;

use crate::tickets::{TicketClassifier, TicketRepository};

/// Shared, read-only handles for request handlers.
pub struct AppState {
    pub tickets: Arc<dyn TicketRepository>,
    pub classifier: Arc<TicketClassifier>,
}

impl AppState {
    pub fn new(tickets: Arc<dyn TicketRepository>, classifier: Arc<TicketClassifier>) -> Self {
        Self {
            tickets,
            classifier,
        }
    }
}
