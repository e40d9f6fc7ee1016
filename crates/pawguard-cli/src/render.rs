//! Plain-text rendering of API results.

use pawguard_core::{
  animal::AnimalIdentity,
  identification::{Identification, IdentificationSource},
  report::{AnimalReport, StatusChange},
};

pub fn animal_line(a: &AnimalIdentity) -> String {
  format!(
    "{}  {:<4} {:<10} {} / {}  last seen {} at {}  [{}]",
    a.system_id,
    a.species,
    a.status,
    a.breed,
    a.color,
    a.last_seen_at.format("%Y-%m-%d %H:%M"),
    a.last_seen_location,
    a.id,
  )
}

pub fn report_line(r: &AnimalReport) -> String {
  let mut flags = Vec::new();
  if r.is_emergency {
    flags.push("EMERGENCY");
  }
  if r.disaster_mode {
    flags.push("disaster");
  }
  if r.is_vaccinated {
    flags.push("vaccinated");
  }
  if r.is_neutered {
    flags.push("neutered");
  }
  if r.is_rescued {
    flags.push("rescued");
  }
  let flags = if flags.is_empty() {
    String::new()
  } else {
    format!(" ({})", flags.join(", "))
  };
  format!(
    "{}  {:<11} {:<4} {}  by {}{}  [{}]",
    r.report_id,
    r.status,
    r.species,
    r.address,
    r.reporter_name,
    flags,
    r.id,
  )
}

pub fn change_line(c: &StatusChange) -> String {
  let old = c.old_status.as_deref().unwrap_or("-");
  let notes = c
    .notes
    .as_deref()
    .map(|n| format!("  \"{n}\""))
    .unwrap_or_default();
  format!(
    "{}  {:<13} {} → {}  by {}{}",
    c.recorded_at.format("%Y-%m-%d %H:%M"),
    c.action,
    old,
    c.new_status,
    c.changed_by_name,
    notes,
  )
}

pub fn identification(id: &Identification) -> String {
  let source = match &id.source {
    IdentificationSource::CloudVision => "cloud vision".to_owned(),
    IdentificationSource::Yolo { detections, .. } => {
      format!("yolo, {} detection(s)", detections.len())
    }
    IdentificationSource::LocalFallback { label } => {
      format!("offline fallback from label {label:?}; verify manually")
    }
  };
  let mut out = format!(
    "{} ({}, {})  confidence {:.0}%  via {}",
    id.species,
    id.breed,
    id.color,
    id.confidence * 100.0,
    source
  );
  if !id.distinctive_features.is_empty() {
    out.push_str(&format!("\n  features: {}", id.distinctive_features.join(", ")));
  }
  if let Some(notes) = &id.health_notes {
    out.push_str(&format!("\n  health: {notes}"));
  }
  if id.is_emergency {
    out.push_str("\n  EMERGENCY: needs immediate help");
  }
  out
}

#[cfg(test)]
mod tests {
  use pawguard_core::animal::Species;

  use super::*;

  fn ident(source: IdentificationSource) -> Identification {
    Identification {
      species: Species::Cat,
      breed: "Persian".into(),
      color: "white".into(),
      distinctive_features: vec!["blue eyes".into()],
      confidence: 0.874,
      is_emergency: false,
      health_notes: None,
      source,
    }
  }

  #[test]
  fn cloud_identification() {
    let text = identification(&ident(IdentificationSource::CloudVision));
    assert!(text.starts_with("cat (Persian, white)  confidence 87%  via cloud vision"));
    assert!(text.contains("features: blue eyes"));
    assert!(!text.contains("EMERGENCY"));
  }

  #[test]
  fn fallback_is_called_out() {
    let text = identification(&ident(IdentificationSource::LocalFallback {
      label: "Persian cat".into(),
    }));
    assert!(text.contains("offline fallback"));
    assert!(text.contains("verify manually"));
  }
}
