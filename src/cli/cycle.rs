//! Cycle CLI commands
//!
//! Implements CLI commands for creating cycles, scheduling their meetings,
//! enrolling students and inspecting progress.

use chrono::NaiveDate;
use clap::Subcommand;

use crate::display::{format_completion, format_cycle_list};
use crate::error::{CycleError, CycleResult};
use crate::models::{
    ActivityType, Billing, CustomerId, CycleId, Money, RegistrationId, StudentId,
};
use crate::services::{CompletionCoordinator, CreateCycleInput, CycleService};
use crate::storage::Storage;

use super::{print_json, resolve_id};

/// Cycle subcommands
#[derive(Subcommand)]
pub enum CycleCommands {
    /// Create a new cycle
    Create {
        /// Cycle name
        name: String,
        /// Planned number of meetings
        #[arg(short, long)]
        total: u32,
        /// Billing model (private, per-child, fixed)
        #[arg(short, long, default_value = "private")]
        billing: String,
        /// Price per student (per-child) or per meeting (fixed)
        #[arg(short, long)]
        price: Option<String>,
        /// Number of participating students (per-child billing)
        #[arg(short, long)]
        students: Option<u32>,
        /// Activity type (frontal, online, private_lesson)
        #[arg(short, long, default_value = "frontal")]
        activity: ActivityType,
        /// Default instructor ID
        #[arg(short, long)]
        instructor: Option<String>,
        /// Customer ID
        #[arg(long)]
        customer: Option<CustomerId>,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
    },
    /// List all cycles with their progress
    List {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Recount a cycle's completed and remaining meetings
    Sync {
        /// Cycle name or ID
        cycle: String,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change the planned number of meetings
    SetTotal {
        /// Cycle name or ID
        cycle: String,
        /// New total
        total: u32,
    },
    /// Schedule a meeting
    Schedule {
        /// Cycle name or ID
        cycle: String,
        /// Meeting date (YYYY-MM-DD)
        date: NaiveDate,
        /// Duration in minutes
        #[arg(short, long, default_value = "60")]
        minutes: u32,
        /// Instructor ID (defaults to the cycle's instructor)
        #[arg(short, long)]
        instructor: Option<String>,
    },
    /// Enroll a student
    Enroll {
        /// Cycle name or ID
        cycle: String,
        /// Agreed amount for the whole cycle
        amount: String,
        /// Student ID (a new one is generated when omitted)
        #[arg(long)]
        student: Option<StudentId>,
        /// Paying customer ID (a new one is generated when omitted)
        #[arg(long)]
        customer: Option<CustomerId>,
    },
    /// Record a payment on a registration
    Pay {
        /// Registration ID
        registration: RegistrationId,
        /// Amount paid
        amount: String,
    },
}

pub(crate) fn parse_money(value: &str) -> CycleResult<Money> {
    Money::parse(value).map_err(|e| {
        CycleError::Validation(format!(
            "Invalid amount: '{}'. Use format like '450.00' or '450'. Error: {}",
            value, e
        ))
    })
}

fn build_billing(kind: &str, price: Option<&str>, students: Option<u32>) -> CycleResult<Billing> {
    let price = |what: &str| -> CycleResult<Money> {
        let value = price.ok_or_else(|| {
            CycleError::Validation(format!("--price is required for {} billing", what))
        })?;
        parse_money(value)
    };

    match kind.trim().to_lowercase().replace('-', "_").as_str() {
        "private" => Ok(Billing::Private),
        "per_child" | "institutional_per_child" => Ok(Billing::InstitutionalPerChild {
            price_per_student: price("per-child")?,
            student_count: students.ok_or_else(|| {
                CycleError::Validation("--students is required for per-child billing".into())
            })?,
        }),
        "fixed" | "institutional_fixed" => Ok(Billing::InstitutionalFixed {
            meeting_revenue: price("fixed")?,
        }),
        other => Err(CycleError::Validation(format!(
            "Invalid billing: '{}'. Valid values: private, per-child, fixed",
            other
        ))),
    }
}

fn resolve_cycle(service: &CycleService, identifier: &str) -> CycleResult<CycleId> {
    service
        .find(identifier)?
        .map(|c| c.id)
        .ok_or_else(|| CycleError::cycle_not_found(identifier))
}

fn resolve_instructor(storage: &Storage, identifier: &str) -> CycleResult<crate::models::InstructorId> {
    let known = storage.instructors.get_all()?.into_iter().map(|i| i.id);
    resolve_id(identifier, known, "Instructor")
}

/// Handle a cycle command
pub fn handle_cycle_command(storage: &Storage, cmd: CycleCommands) -> CycleResult<()> {
    let service = CycleService::new(storage);

    match cmd {
        CycleCommands::Create {
            name,
            total,
            billing,
            price,
            students,
            activity,
            instructor,
            customer,
            start,
        } => {
            let instructor_id = instructor
                .map(|i| resolve_instructor(storage, &i))
                .transpose()?;
            let cycle = service.create(CreateCycleInput {
                name,
                billing: build_billing(&billing, price.as_deref(), students)?,
                activity_type: activity,
                total_meetings: total,
                customer_id: customer,
                instructor_id,
                start_date: start,
            })?;

            println!("Created cycle: {}", cycle.name);
            println!("  Billing: {}", cycle.billing);
            println!("  Meetings: {}", cycle.total_meetings);
            println!("  ID: {}", cycle.id);
        }

        CycleCommands::List { json } => {
            let cycles = service.list()?;
            if json {
                let rows: Vec<_> = cycles
                    .iter()
                    .map(|s| serde_json::json!({ "cycle": s.cycle, "progress": s.progress }))
                    .collect();
                print_json(&rows)?;
            } else {
                print!("{}", format_cycle_list(&cycles));
            }
        }

        CycleCommands::Sync { cycle, json } => {
            let id = resolve_cycle(&service, &cycle)?;
            let progress = CompletionCoordinator::new(storage).sync_progress(id)?;
            if json {
                print_json(&progress)?;
            } else {
                println!(
                    "Completed: {}  Remaining: {}  Total: {}  In table: {}",
                    progress.completed_meetings,
                    progress.remaining_meetings,
                    progress.total_meetings,
                    progress.meetings_in_table
                );
            }
        }

        CycleCommands::SetTotal { cycle, total } => {
            let id = resolve_cycle(&service, &cycle)?;
            let outcome = service.set_total_meetings(id, total)?;
            print!("{}", format_completion(&outcome));
        }

        CycleCommands::Schedule {
            cycle,
            date,
            minutes,
            instructor,
        } => {
            let id = resolve_cycle(&service, &cycle)?;
            let instructor_id = instructor
                .map(|i| resolve_instructor(storage, &i))
                .transpose()?;
            let meeting = service.schedule_meeting(id, date, minutes, instructor_id)?;
            println!("Scheduled meeting {} on {}", meeting.id, meeting.scheduled_date);
        }

        CycleCommands::Enroll {
            cycle,
            amount,
            student,
            customer,
        } => {
            let id = resolve_cycle(&service, &cycle)?;
            let registration = service.enroll(
                id,
                student.unwrap_or_default(),
                customer.unwrap_or_default(),
                parse_money(&amount)?,
            )?;
            println!("Enrolled student {} ({})", registration.student_id.as_uuid(), registration.amount);
            println!("  Registration: {}", registration.id.as_uuid());
        }

        CycleCommands::Pay {
            registration,
            amount,
        } => {
            let updated = service.record_payment(registration, parse_money(&amount)?)?;
            println!(
                "Recorded payment: {} of {} paid",
                updated.paid_amount, updated.amount
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_billing() {
        assert_eq!(build_billing("private", None, None).unwrap(), Billing::Private);
        assert_eq!(
            build_billing("per-child", Some("40"), Some(12)).unwrap(),
            Billing::InstitutionalPerChild {
                price_per_student: Money::from_units(40),
                student_count: 12,
            }
        );
        assert_eq!(
            build_billing("fixed", Some("450.50"), None).unwrap(),
            Billing::InstitutionalFixed {
                meeting_revenue: Money::from_cents(45050),
            }
        );
        assert!(build_billing("fixed", None, None).unwrap_err().is_validation());
        assert!(build_billing("per-child", Some("40"), None).unwrap_err().is_validation());
        assert!(build_billing("barter", None, None).unwrap_err().is_validation());
    }
}
