use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use super::types::{Ticket, TicketCategory, TicketPriority, TicketStatus};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TicketStats {
    pub total_tickets: usize,
    pub open_tickets: usize,
    pub avg_tickets_per_day: f64,
    pub priority_breakdown: BTreeMap<TicketPriority, usize>,
    pub category_breakdown: BTreeMap<TicketCategory, usize>,
}

/// Summary over the whole collection. Calendar days are taken from the UTC
/// timestamps the repository reports; days without tickets do not count.
pub fn aggregate(tickets: &[Ticket]) -> TicketStats {
    let mut priority_breakdown: BTreeMap<TicketPriority, usize> =
        TicketPriority::ALL.iter().map(|p| (*p, 0)).collect();
    let mut category_breakdown: BTreeMap<TicketCategory, usize> =
        TicketCategory::ALL.iter().map(|c| (*c, 0)).collect();
    let mut days = HashSet::new();
    let mut open_tickets = 0;

    for ticket in tickets {
        *priority_breakdown.entry(ticket.priority).or_insert(0) += 1;
        *category_breakdown.entry(ticket.category).or_insert(0) += 1;
        days.insert(ticket.created_at.date_naive());
        if ticket.status == TicketStatus::Open {
            open_tickets += 1;
        }
    }

    TicketStats {
        total_tickets: tickets.len(),
        open_tickets,
        avg_tickets_per_day: average_per_day(tickets.len(), days.len()),
        priority_breakdown,
        category_breakdown,
    }
}

/// One-decimal rounding on the exact binary value, ties to even.
fn average_per_day(total: usize, days: usize) -> f64 {
    if days == 0 {
        return 0.0;
    }
    let average = total as f64 / days as f64;
    format!("{average:.1}").parse().unwrap_or(average)
}
