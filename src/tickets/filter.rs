use serde::Deserialize;
use std::str::FromStr;

use super::types::{Ticket, TicketCategory, TicketPriority, TicketStatus};

/// Raw `GET /api/tickets` query string. Empty values count as absent.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

/// Conjunction of optional criteria over tickets. `search` alone is a
/// case-insensitive OR across title and description. `matches_nothing` is
/// set when a criterion names a label no ticket can carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub category: Option<TicketCategory>,
    pub priority: Option<TicketPriority>,
    pub status: Option<TicketStatus>,
    pub search: Option<String>,
    pub matches_nothing: bool,
}

impl TicketFilter {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.search.is_none()
            && !self.matches_nothing
    }

    pub fn matches(&self, ticket: &Ticket) -> bool {
        if self.matches_nothing {
            return false;
        }
        if self.category.is_some_and(|c| c != ticket.category) {
            return false;
        }
        if self.priority.is_some_and(|p| p != ticket.priority) {
            return false;
        }
        if self.status.is_some_and(|s| s != ticket.status) {
            return false;
        }
        match &self.search {
            Some(needle) => {
                let needle = needle.to_lowercase();
                ticket.title.to_lowercase().contains(&needle)
                    || ticket.description.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }

    /// Retains matching tickets, preserving the input order.
    pub fn apply(&self, tickets: Vec<Ticket>) -> Vec<Ticket> {
        if self.is_empty() {
            return tickets;
        }
        tickets.into_iter().filter(|t| self.matches(t)).collect()
    }
}

impl From<ListQuery> for TicketFilter {
    fn from(query: ListQuery) -> Self {
        let mut matches_nothing = false;
        let category = parse_criterion(query.category, &mut matches_nothing);
        let priority = parse_criterion(query.priority, &mut matches_nothing);
        let status = parse_criterion(query.status, &mut matches_nothing);

        Self {
            category,
            priority,
            status,
            search: query.search.filter(|s| !s.is_empty()),
            matches_nothing,
        }
    }
}

/// Exact label match; a label outside the enum can never match.
fn parse_criterion<T: FromStr>(raw: Option<String>, matches_nothing: &mut bool) -> Option<T> {
    let value = raw.filter(|v| !v.is_empty())?;
    let parsed = value.parse().ok();
    if parsed.is_none() {
        *matches_nothing = true;
    }
    parsed
}
