//! Wires configuration into repositories and the classifier.

use anyhow::Context;
use log::{info, warn};
use std::sync::Arc;

use crate::core::config::AppConfig;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::{create_conn, run_migrations};
use crate::tickets::{
    InMemoryTicketRepository, PgTicketRepository, TicketClassifier, TicketRepository,
};

pub async fn build_app_state(config: &AppConfig) -> anyhow::Result<Arc<AppState>> {
    let tickets: Arc<dyn TicketRepository> = match &config.database {
        Some(db) => {
            let db = db.clone();
            let pool = tokio::task::spawn_blocking(move || {
                let pool = create_conn(&db).context("Failed to create database pool")?;
                run_migrations(&pool)
                    .map_err(|e| anyhow::anyhow!("Migration error: {e}"))?;
                Ok::<_, anyhow::Error>(pool)
            })
            .await??;
            info!("Using PostgreSQL ticket storage");
            Arc::new(PgTicketRepository::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set - tickets are kept in memory and lost on restart");
            Arc::new(InMemoryTicketRepository::new())
        }
    };

    let classifier = Arc::new(TicketClassifier::from_config(&config.llm));
    Ok(Arc::new(AppState::new(tickets, classifier)))
}
