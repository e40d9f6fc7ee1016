//! Report lifecycle rules.
//!
//! Allowed status moves:
//!
//! | From | To |
//! |------|----|
//! | `new` | `in_progress` |
//! | `new`, `in_progress` | `rescued` |
//! | any | `resolved` |
//! | `rescued` | `adopted` |
//!
//! Re-applying the current status is accepted. Welfare flags are independent
//! of status and may be toggled at any time; a report can be `resolved` and
//! not rescued.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::report::{
  AnimalReport, ChangeAction, NgoActor, ReportAction, ReportStatus, StatusChangeDraft,
  WelfareFlag,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot move report from {from} to {to}")]
pub struct TransitionError {
  pub from: ReportStatus,
  pub to:   ReportStatus,
}

pub fn can_transition(from: ReportStatus, to: ReportStatus) -> bool {
  use ReportStatus::*;
  from == to
    || matches!(
      (from, to),
      (New, InProgress) | (New | InProgress, Rescued) | (_, Resolved) | (Rescued, Adopted)
    )
}

/// Apply `action` to `report` in place and describe the change for the audit
/// log. On error the report is left untouched.
pub fn apply(
  report: &mut AnimalReport,
  action: &ReportAction,
  actor: &NgoActor,
  now: DateTime<Utc>,
) -> Result<StatusChangeDraft, TransitionError> {
  let draft = match action {
    ReportAction::SetStatus { status, notes } => {
      let from = report.status;
      if !can_transition(from, *status) {
        return Err(TransitionError { from, to: *status });
      }
      report.status = *status;
      if *status == ReportStatus::Resolved && report.resolved_at.is_none() {
        report.resolved_at = Some(now);
      }
      StatusChangeDraft {
        old_status: Some(from.to_string()),
        new_status: status.to_string(),
        action:     ChangeAction::StatusChange,
        notes:      notes.clone(),
      }
    }

    ReportAction::Assign => {
      let from = report.status;
      report.assigned_ngo_id = Some(actor.ngo_id.clone());
      report.assigned_ngo_name = Some(actor.ngo_name.clone());
      if from == ReportStatus::New {
        report.status = ReportStatus::InProgress;
      }
      StatusChangeDraft {
        old_status: Some(from.to_string()),
        new_status: report.status.to_string(),
        action:     ChangeAction::Assignment,
        notes:      Some(format!("Assigned to {}", actor.ngo_name)),
      }
    }

    ReportAction::SetWelfare { flag, value, notes } => {
      apply_welfare(report, *flag, *value, notes.as_deref(), now)
    }

    ReportAction::SetOutcome { outcome } => {
      let old = report.rescue_outcome.map(|o| o.to_string());
      report.rescue_outcome = Some(*outcome);
      StatusChangeDraft {
        old_status: old,
        new_status: outcome.to_string(),
        action:     ChangeAction::Outcome,
        notes:      None,
      }
    }

    ReportAction::SetNotes { notes } => {
      let trimmed = notes.trim();
      report.ngo_notes = (!trimmed.is_empty()).then(|| trimmed.to_owned());
      // The notes themselves stay private; the log only records the edit.
      StatusChangeDraft {
        old_status: None,
        new_status: "notes_updated".to_owned(),
        action:     ChangeAction::Notes,
        notes:      None,
      }
    }
  };

  report.updated_at = now;
  Ok(draft)
}

fn apply_welfare(
  report: &mut AnimalReport,
  flag: WelfareFlag,
  value: bool,
  notes: Option<&str>,
  now: DateTime<Utc>,
) -> StatusChangeDraft {
  let date = value.then(|| now.date_naive());
  let (action, label) = match flag {
    WelfareFlag::Vaccinated => {
      report.is_vaccinated = value;
      report.vaccination_date = date;
      if let Some(n) = notes {
        report.vaccination_notes = Some(n.to_owned());
      }
      (ChangeAction::Vaccination, "vaccinated")
    }
    WelfareFlag::Neutered => {
      report.is_neutered = value;
      report.neutered_date = date;
      (ChangeAction::Neutering, "neutered")
    }
    WelfareFlag::Rescued => {
      report.is_rescued = value;
      report.rescue_date = date;
      if let Some(n) = notes {
        report.rescue_notes = Some(n.to_owned());
      }
      if value
        && !matches!(report.status, ReportStatus::Resolved | ReportStatus::Adopted)
      {
        report.status = ReportStatus::Rescued;
      }
      (ChangeAction::Rescue, "rescued")
    }
  };

  StatusChangeDraft {
    old_status: None,
    new_status: if value {
      label.to_owned()
    } else {
      format!("not_{label}")
    },
    action,
    notes: notes.map(str::to_owned),
  }
}
