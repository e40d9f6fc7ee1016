//! [`ReportStore`] implementation for [`SqliteStore`].

use chrono::{Datelike, Utc};
use pawguard_core::{
  ids::{next_report_id, report_id_prefix},
  lifecycle,
  report::{AnimalReport, NewReport, NgoActor, ReportAction, StatusChange},
  store::{ActionOutcome, ReportQuery, ReportStore},
};
use rusqlite::{Connection, OptionalExtension as _};
use uuid::Uuid;

use crate::{
  Result, SqliteStore,
  encode::{
    RawStatusChange, ReportRow, call_error, decode_report, encode_dt, encode_uuid,
  },
};

// ─── Connection-thread helpers ───────────────────────────────────────────────

fn load_report(conn: &Connection, id: &str) -> tokio_rusqlite::Result<Option<AnimalReport>> {
  let body: Option<String> = conn
    .query_row(
      "SELECT body_json FROM reports WHERE id = ?1",
      rusqlite::params![id],
      |row| row.get(0),
    )
    .optional()?;
  body
    .map(|b| decode_report(&b).map_err(call_error))
    .transpose()
}

fn write_report(conn: &Connection, report: &AnimalReport) -> tokio_rusqlite::Result<()> {
  let row = ReportRow::encode(report).map_err(call_error)?;
  conn.execute(
    "UPDATE reports SET
       animal_id = ?2, status = ?3, disaster_mode = ?4,
       latitude = ?5, longitude = ?6, updated_at = ?7, body_json = ?8
     WHERE id = ?1",
    rusqlite::params![
      row.id,
      row.animal_id,
      row.status,
      row.disaster_mode,
      row.latitude,
      row.longitude,
      row.updated_at,
      row.body_json,
    ],
  )?;
  Ok(())
}

fn select_bodies(
  conn: &Connection,
  sql: &str,
  params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt
    .query_map(params, |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

// ─── ReportStore impl ────────────────────────────────────────────────────────

impl ReportStore for SqliteStore {
  async fn insert_report(&self, input: NewReport) -> Result<AnimalReport> {
    let now = Utc::now();
    let year = now.year();
    let id = Uuid::new_v4();

    let report = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let pattern = format!("{}-%", report_id_prefix(year));
        let existing: i64 = tx.query_row(
          "SELECT COUNT(*) FROM reports WHERE report_id LIKE ?1",
          rusqlite::params![pattern],
          |row| row.get(0),
        )?;

        let report = input.into_report(id, next_report_id(year, existing as u64), now);
        let row = ReportRow::encode(&report).map_err(call_error)?;
        tx.execute(
          "INSERT INTO reports (
             id, report_id, animal_id, reporter_id, status, disaster_mode,
             latitude, longitude, created_at, updated_at, body_json
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            row.id,
            row.report_id,
            row.animal_id,
            row.reporter_id,
            row.status,
            row.disaster_mode,
            row.latitude,
            row.longitude,
            row.created_at,
            row.updated_at,
            row.body_json,
          ],
        )?;
        tx.commit()?;
        Ok(report)
      })
      .await?;

    Ok(report)
  }

  async fn get_report(&self, id: Uuid) -> Result<Option<AnimalReport>> {
    let id_str = encode_uuid(id);
    let body: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT body_json FROM reports WHERE id = ?1",
              rusqlite::params![id_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    body.as_deref().map(decode_report).transpose()
  }

  async fn list_reports(&self, query: &ReportQuery) -> Result<Vec<AnimalReport>> {
    let status = query.status.map(|s| s.as_ref().to_owned());
    let disaster_mode = query.disaster_mode;
    let reporter_id = query.reporter_id.clone();
    let limit = query.limit.map_or(-1, |l| l as i64);

    let bodies = self
      .conn
      .call(move |conn| {
        Ok(select_bodies(
          conn,
          "SELECT body_json FROM reports
           WHERE (?1 IS NULL OR status = ?1)
             AND (?2 IS NULL OR disaster_mode = ?2)
             AND (?3 IS NULL OR reporter_id = ?3)
           ORDER BY created_at DESC, rowid DESC
           LIMIT ?4",
          rusqlite::params![status, disaster_mode, reporter_id, limit],
        )?)
      })
      .await?;

    bodies.iter().map(|b| decode_report(b)).collect()
  }

  async fn apply_action(
    &self,
    id: Uuid,
    action: ReportAction,
    actor: NgoActor,
  ) -> Result<ActionOutcome> {
    let id_str = encode_uuid(id);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(mut report) = load_report(&tx, &id_str)? else {
          return Ok(ActionOutcome::NotFound);
        };

        let now = Utc::now();
        let draft = match lifecycle::apply(&mut report, &action, &actor, now) {
          Ok(draft) => draft,
          Err(e) => return Ok(ActionOutcome::Rejected(e)),
        };

        write_report(&tx, &report)?;
        tx.execute(
          "INSERT INTO status_history (
             report_id, old_status, new_status, action,
             changed_by, changed_by_name, notes, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            draft.old_status,
            draft.new_status,
            draft.action.as_ref(),
            actor.ngo_id,
            actor.ngo_name,
            draft.notes,
            encode_dt(now),
          ],
        )?;
        let seq = tx.last_insert_rowid();
        tx.commit()?;

        let change = StatusChange {
          seq,
          report_id: id,
          old_status: draft.old_status,
          new_status: draft.new_status,
          action: draft.action,
          changed_by: actor.ngo_id,
          changed_by_name: actor.ngo_name,
          notes: draft.notes,
          recorded_at: now,
        };
        Ok(ActionOutcome::Applied { report, change })
      })
      .await?;

    Ok(outcome)
  }

  async fn status_history(&self, id: Uuid) -> Result<Vec<StatusChange>> {
    let id_str = encode_uuid(id);
    let raws: Vec<RawStatusChange> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT seq, report_id, old_status, new_status, action,
                  changed_by, changed_by_name, notes, recorded_at
           FROM status_history WHERE report_id = ?1
           ORDER BY seq DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawStatusChange::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStatusChange::into_change).collect()
  }

  async fn reports_with_coordinates(&self, disaster_only: bool) -> Result<Vec<AnimalReport>> {
    let bodies = self
      .conn
      .call(move |conn| {
        Ok(select_bodies(
          conn,
          "SELECT body_json FROM reports
           WHERE latitude IS NOT NULL AND longitude IS NOT NULL
             AND (?1 = 0 OR disaster_mode = 1)
           ORDER BY created_at DESC, rowid DESC",
          rusqlite::params![disaster_only],
        )?)
      })
      .await?;

    bodies.iter().map(|b| decode_report(b)).collect()
  }

  async fn set_disaster_mode(&self, ids: Vec<Uuid>, enabled: bool) -> Result<usize> {
    let id_strs: Vec<String> = ids.into_iter().map(encode_uuid).collect();

    let updated = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let now = Utc::now();
        let mut updated = 0;
        for id in &id_strs {
          let Some(mut report) = load_report(&tx, id)? else {
            continue;
          };
          if report.disaster_mode == enabled {
            continue;
          }
          report.disaster_mode = enabled;
          report.updated_at = now;
          write_report(&tx, &report)?;
          updated += 1;
        }
        tx.commit()?;
        Ok(updated)
      })
      .await?;

    Ok(updated)
  }
}
