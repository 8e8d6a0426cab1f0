//! Expense CLI commands
//!
//! Recording cycle and meeting expenses, and the review actions that need an
//! acting user with a reviewing role.

use clap::{Args, Subcommand};

use crate::config::settings::Settings;
use crate::error::{CycleError, CycleResult};
use crate::models::{
    CycleExpense, CycleExpenseCost, CycleExpenseType, ExpenseId, InstructorId, MeetingExpense,
    MeetingExpenseCost, MeetingExpenseType, RateKind,
};
use crate::services::{Actor, CycleService, ExpenseService, Role};
use crate::storage::Storage;

use super::cycle::parse_money;
use super::resolve_id;

/// The user performing a review action
#[derive(Args)]
pub struct ActorArgs {
    /// Name of the acting user
    #[arg(long)]
    actor: String,
    /// Role of the acting user (admin, coordinator, instructor)
    #[arg(long)]
    role: Role,
}

impl From<ActorArgs> for Actor {
    fn from(args: ActorArgs) -> Self {
        Actor::new(args.actor, args.role)
    }
}

/// How an expense is costed
#[derive(Args)]
pub struct CostArgs {
    /// Fixed amount
    #[arg(short, long)]
    amount: Option<String>,
    /// Instructor ID for hour-based costs
    #[arg(short, long)]
    instructor: Option<String>,
    /// Hours of the instructor's time
    #[arg(long)]
    hours: Option<f64>,
    /// Rate applied to the hours (frontal, online, private_lesson)
    #[arg(long, default_value = "frontal")]
    rate: RateKind,
}

/// Expense subcommands
#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record an expense on a meeting (pending review)
    Add {
        /// Meeting ID
        meeting: String,
        /// Expense type (travel, taxi, extra_instructor, materials, other)
        expense_type: MeetingExpenseType,
        #[command(flatten)]
        cost: CostArgs,
        /// Description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Record an expense on a whole cycle
    AddCycle {
        /// Cycle name or ID
        cycle: String,
        /// Expense type (materials, wraparound_hours, equipment, travel_fixed, additional_instructor, other)
        expense_type: CycleExpenseType,
        #[command(flatten)]
        cost: CostArgs,
        /// Percentage of the cycle's projected revenue
        #[arg(short, long, conflicts_with_all = ["amount", "instructor"])]
        percent: Option<f64>,
        /// Description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Approve a pending meeting expense
    Approve {
        /// Expense ID
        expense: String,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Reject a pending meeting expense
    Reject {
        /// Expense ID
        expense: String,
        /// Reason for the rejection
        #[arg(short, long)]
        reason: String,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Delete a meeting or cycle expense
    Delete {
        /// Expense ID
        expense: String,
        #[command(flatten)]
        actor: ActorArgs,
    },
}

fn resolve_expense(storage: &Storage, identifier: &str) -> CycleResult<ExpenseId> {
    let mut known: Vec<ExpenseId> = storage
        .expenses
        .all_meeting_expenses()?
        .into_iter()
        .map(|e| e.id)
        .collect();
    for cycle in storage.cycles.get_all()? {
        known.extend(storage.expenses.cycle_expenses_for(cycle.id)?.into_iter().map(|e| e.id));
    }
    resolve_id(identifier, known, "Expense")
}

fn resolve_instructor(storage: &Storage, identifier: &str) -> CycleResult<InstructorId> {
    let known = storage.instructors.get_all()?.into_iter().map(|i| i.id);
    resolve_id(identifier, known, "Instructor")
}

fn hourly(storage: &Storage, cost: &CostArgs) -> CycleResult<Option<(InstructorId, RateKind, f64)>> {
    let Some(instructor) = &cost.instructor else {
        return Ok(None);
    };
    let hours = cost
        .hours
        .ok_or_else(|| CycleError::Validation("--hours is required with --instructor".into()))?;
    Ok(Some((resolve_instructor(storage, instructor)?, cost.rate, hours)))
}

fn fixed_amount(cost: &CostArgs) -> CycleResult<crate::models::Money> {
    let amount = cost.amount.as_deref().ok_or_else(|| {
        CycleError::Validation("Give --amount, or --instructor with --hours".into())
    })?;
    parse_money(amount)
}

/// Handle an expense command
pub fn handle_expense_command(
    storage: &Storage,
    settings: &Settings,
    cmd: ExpenseCommands,
) -> CycleResult<()> {
    let service = ExpenseService::new(storage, settings);

    match cmd {
        ExpenseCommands::Add {
            meeting,
            expense_type,
            cost,
            description,
        } => {
            let known = storage.meetings.get_all()?.into_iter().map(|m| m.id);
            let meeting_id = resolve_id(&meeting, known, "Meeting")?;
            let cost = match hourly(storage, &cost)? {
                Some((instructor_id, rate_kind, hours)) => MeetingExpenseCost::ExtraInstructor {
                    instructor_id,
                    rate_kind,
                    hours,
                },
                None => MeetingExpenseCost::Amount {
                    amount: fixed_amount(&cost)?,
                },
            };

            let mut expense = MeetingExpense::new(meeting_id, expense_type, cost);
            expense.description = description.unwrap_or_default();
            let expense = service.add_meeting_expense(expense)?;
            println!("Recorded {} expense {} (pending review)", expense.expense_type, expense.id);
        }

        ExpenseCommands::AddCycle {
            cycle,
            expense_type,
            cost,
            percent,
            description,
        } => {
            let cycle_id = CycleService::new(storage)
                .find(&cycle)?
                .ok_or_else(|| CycleError::cycle_not_found(&cycle))?
                .id;
            let cost = match (percent, hourly(storage, &cost)?) {
                (Some(percent), _) => CycleExpenseCost::PercentOfRevenue { percent },
                (None, Some((instructor_id, rate_kind, hours))) => CycleExpenseCost::Hourly {
                    instructor_id,
                    rate_kind,
                    hours,
                },
                (None, None) => CycleExpenseCost::Fixed {
                    amount: fixed_amount(&cost)?,
                },
            };

            let mut expense = CycleExpense::new(cycle_id, expense_type, cost);
            expense.description = description.unwrap_or_default();
            let expense = service.add_cycle_expense(expense)?;
            println!("Recorded {} cycle expense {}", expense.expense_type, expense.id);
        }

        ExpenseCommands::Approve { expense, actor } => {
            let id = resolve_expense(storage, &expense)?;
            let approved = service.approve(id, &actor.into())?;
            println!("Approved expense {}", approved.id);
        }

        ExpenseCommands::Reject {
            expense,
            reason,
            actor,
        } => {
            let id = resolve_expense(storage, &expense)?;
            let rejected = service.reject(id, &actor.into(), &reason)?;
            println!("Rejected expense {}: {}", rejected.id, reason);
        }

        ExpenseCommands::Delete { expense, actor } => {
            let id = resolve_expense(storage, &expense)?;
            service.delete(id, &actor.into())?;
            println!("Deleted expense {}", id);
        }
    }

    Ok(())
}
