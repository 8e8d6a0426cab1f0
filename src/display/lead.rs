//! Upsell lead display formatting

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::models::UpsellLead;

use super::format::truncate;

#[derive(Tabled)]
struct LeadRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Cycle")]
    cycle: String,
    #[tabled(rename = "Student")]
    student: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Notes")]
    notes: String,
}

/// Format leads as a table
pub fn format_lead_list(leads: &[UpsellLead]) -> String {
    if leads.is_empty() {
        return "No leads found.\n".to_string();
    }

    let rows = leads.iter().map(|lead| LeadRow {
        id: lead.id.to_string(),
        cycle: lead.cycle_id.to_string(),
        student: lead.student_id.to_string(),
        status: lead.status.to_string(),
        created: lead.created_at.format("%Y-%m-%d").to_string(),
        notes: truncate(&lead.notes, 32),
    });

    let mut output = Table::new(rows).with(Style::psql()).to_string();
    output.push('\n');
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CustomerId, CycleId, LeadStatus, StudentId};

    #[test]
    fn test_lead_table() {
        let mut lead = UpsellLead::new(CycleId::new(), CustomerId::new(), StudentId::new());
        lead.set_status(LeadStatus::Contacted);
        lead.set_notes("Parent asked about the spring cycle and sibling discount");

        let table = format_lead_list(&[lead.clone()]);
        assert!(table.contains(&lead.id.to_string()));
        assert!(table.contains("contacted"));
        assert!(table.contains("..."));
    }
}
