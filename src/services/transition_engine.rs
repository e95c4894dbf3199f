//! The application state machine.
//!
//! Every status change, whether requested by a reviewer, produced by the
//! scorer callback or by scheduling an interview, is checked against
//! [`RULES`] before it is written.

use crate::error::{Error, Result};
use crate::models::actor::ActorRole;
use crate::models::application::{ApplicationStatus, InterviewType};

use ActorRole::{HeadHr, Manager, StaffHr};
use ApplicationStatus::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Manual,
    Ingestion,
    Scheduling(InterviewType),
}

struct Rule {
    from: ApplicationStatus,
    to: &'static [ApplicationStatus],
    trigger: Trigger,
    /// Roles allowed to request the change; only consulted for manual rules.
    roles: &'static [ActorRole],
}

const RULES: &[Rule] = &[
    Rule {
        from: Submitted,
        to: &[Reviewed],
        trigger: Trigger::Ingestion,
        roles: &[],
    },
    Rule {
        from: Reviewed,
        to: &[StaffApproved, StaffRejected],
        trigger: Trigger::Manual,
        roles: &[HeadHr, StaffHr],
    },
    Rule {
        from: StaffApproved,
        to: &[InterviewScheduled],
        trigger: Trigger::Scheduling(InterviewType::Technical),
        roles: &[],
    },
    Rule {
        from: InterviewScheduled,
        to: &[PendingFinalDecision],
        trigger: Trigger::Manual,
        roles: &[HeadHr, StaffHr, Manager],
    },
    Rule {
        from: PendingFinalDecision,
        to: &[FinalInterviewScheduled],
        trigger: Trigger::Scheduling(InterviewType::Final),
        roles: &[],
    },
    Rule {
        from: FinalInterviewScheduled,
        to: &[Hired, NotHired],
        trigger: Trigger::Manual,
        roles: &[HeadHr],
    },
    Rule {
        from: Hired,
        to: &[Onboarding],
        trigger: Trigger::Scheduling(InterviewType::Onboarding),
        roles: &[],
    },
];

/// Roles allowed to book interview slots.
pub const SCHEDULING_ROLES: &[ActorRole] = &[HeadHr, StaffHr];

fn find_rule(from: ApplicationStatus, to: ApplicationStatus, trigger: Trigger) -> Option<&'static Rule> {
    RULES
        .iter()
        .find(|rule| rule.from == from && rule.trigger == trigger && rule.to.contains(&to))
}

pub fn allowed_targets(from: ApplicationStatus, trigger: Trigger) -> Vec<ApplicationStatus> {
    RULES
        .iter()
        .filter(|rule| rule.from == from && rule.trigger == trigger)
        .flat_map(|rule| rule.to.iter().copied())
        .collect()
}

pub fn check(from: ApplicationStatus, to: ApplicationStatus, trigger: Trigger) -> Result<()> {
    match find_rule(from, to, trigger) {
        Some(_) => Ok(()),
        None => Err(illegal(from, to, trigger)),
    }
}

/// Validates a reviewer-requested change, including the role gate.
pub fn check_manual(from: ApplicationStatus, to: ApplicationStatus, role: ActorRole) -> Result<()> {
    let rule = find_rule(from, to, Trigger::Manual).ok_or_else(|| illegal(from, to, Trigger::Manual))?;
    if !rule.roles.contains(&role) {
        return Err(Error::Forbidden(format!(
            "role {} may not move an application from {} to {}",
            role, from, to
        )));
    }
    Ok(())
}

pub fn ensure_can_schedule(role: ActorRole) -> Result<()> {
    if SCHEDULING_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(Error::Forbidden(format!("role {} may not schedule interviews", role)))
    }
}

/// Status an application must be in for a stage to be booked, and the status
/// it moves to once the booking is made.
pub fn stage_statuses(interview_type: InterviewType) -> (ApplicationStatus, ApplicationStatus) {
    match interview_type {
        InterviewType::Technical => (StaffApproved, InterviewScheduled),
        InterviewType::Final => (PendingFinalDecision, FinalInterviewScheduled),
        InterviewType::Onboarding => (Hired, Onboarding),
    }
}

/// Entering the decision stage makes the previous interview's slot stale.
pub fn clears_booking_slot(to: ApplicationStatus) -> bool {
    to == PendingFinalDecision
}

fn illegal(from: ApplicationStatus, to: ApplicationStatus, trigger: Trigger) -> Error {
    let allowed = allowed_targets(from, trigger);
    let how = match trigger {
        Trigger::Manual => "manually".to_string(),
        Trigger::Ingestion => "by analysis ingestion".to_string(),
        Trigger::Scheduling(kind) => format!("by scheduling a {} interview", kind),
    };
    if allowed.is_empty() {
        Error::IllegalTransition(format!(
            "status {} cannot be changed {} (requested {})",
            from, how, to
        ))
    } else {
        let names: Vec<&str> = allowed.iter().map(|s| s.as_str()).collect();
        Error::IllegalTransition(format!(
            "cannot move from {} to {} {}; allowed: {}",
            from,
            to,
            how,
            names.join(", ")
        ))
    }
}
