//! [`SqliteStore`] and its [`AnimalStore`] implementation.

use std::path::Path;

use chrono::Utc;
use pawguard_core::{
  animal::{
    AnimalIdentity, AnimalUpdate, CareEntryInput, NewAnimal, ReportEntryInput, Species,
  },
  store::{AnimalQuery, AnimalStore},
};
use rusqlite::{Connection, OptionalExtension as _};
use tracing::debug;
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    AnimalRow, RawAnimal, RawCareEntry, RawReportEntry, call_error, decode_uuid, encode_dt,
    encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A PawGuard store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    debug!(path = %path.display(), "opening sqlite store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Connection-thread helpers ───────────────────────────────────────────────

/// Read one animal with both histories, in sequence order.
pub(crate) fn load_raw_animal(
  conn: &Connection,
  id: &str,
) -> rusqlite::Result<Option<RawAnimal>> {
  let record_json: Option<String> = conn
    .query_row(
      "SELECT record_json FROM animals WHERE id = ?1",
      rusqlite::params![id],
      |row| row.get(0),
    )
    .optional()?;
  let Some(record_json) = record_json else {
    return Ok(None);
  };

  let mut stmt = conn.prepare(
    "SELECT seq, timestamp, location, notes, condition, reported_by
     FROM report_history WHERE animal_id = ?1 ORDER BY seq",
  )?;
  let reports = stmt
    .query_map(rusqlite::params![id], RawReportEntry::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut stmt = conn.prepare(
    "SELECT seq, recorded_at, ngo_id, ngo_name, action, notes
     FROM care_history WHERE animal_id = ?1 ORDER BY seq",
  )?;
  let care = stmt
    .query_map(rusqlite::params![id], RawCareEntry::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(Some(RawAnimal {
    record_json,
    reports,
    care,
  }))
}

/// Decode, change and rewrite one animal row. Returns `false` if it does not
/// exist. Meant to run inside a transaction.
fn modify_animal(
  conn: &Connection,
  id: &str,
  f: impl FnOnce(&mut AnimalIdentity),
) -> tokio_rusqlite::Result<bool> {
  let record_json: Option<String> = conn
    .query_row(
      "SELECT record_json FROM animals WHERE id = ?1",
      rusqlite::params![id],
      |row| row.get(0),
    )
    .optional()?;
  let Some(record_json) = record_json else {
    return Ok(false);
  };

  let mut animal: AnimalIdentity = serde_json::from_str(&record_json).map_err(call_error)?;
  f(&mut animal);
  let row = AnimalRow::encode(&animal).map_err(call_error)?;

  conn.execute(
    "UPDATE animals SET
       species = ?2, status = ?3, created_by = ?4, last_seen_at = ?5,
       last_seen_location = ?6, embedding_json = ?7, record_json = ?8
     WHERE id = ?1",
    rusqlite::params![
      row.id,
      row.species,
      row.status,
      row.created_by,
      row.last_seen_at,
      row.last_seen_location,
      row.embedding_json,
      row.record_json,
    ],
  )?;
  Ok(true)
}

// ─── AnimalStore impl ────────────────────────────────────────────────────────

impl AnimalStore for SqliteStore {
  type Error = crate::Error;

  async fn insert_animal(&self, input: NewAnimal) -> Result<Option<AnimalIdentity>> {
    let animal = input.into_identity(Uuid::new_v4());
    let row = AnimalRow::encode(&animal)?;

    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT INTO animals (
             id, system_id, species, status, created_by,
             last_seen_at, last_seen_location, embedding_json, record_json
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
           ON CONFLICT (system_id) DO NOTHING",
          rusqlite::params![
            row.id,
            row.system_id,
            row.species,
            row.status,
            row.created_by,
            row.last_seen_at,
            row.last_seen_location,
            row.embedding_json,
            row.record_json,
          ],
        )?;
        Ok(n == 1)
      })
      .await?;

    Ok(inserted.then_some(animal))
  }

  async fn get_animal(&self, id: Uuid) -> Result<Option<AnimalIdentity>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| Ok(load_raw_animal(conn, &id_str)?))
      .await?;
    raw.map(RawAnimal::into_animal).transpose()
  }

  async fn list_animals(&self, query: &AnimalQuery) -> Result<Vec<AnimalIdentity>> {
    let species = query.species.map(|s| s.as_ref().to_owned());
    let status = query.status.map(|s| s.as_ref().to_owned());
    let created_by = query.created_by.clone();
    let region = query.region.clone();
    let limit = query.limit.map_or(-1, |l| l as i64);

    let raws: Vec<RawAnimal> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id FROM animals
           WHERE (?1 IS NULL OR species = ?1)
             AND (?2 IS NULL OR status = ?2)
             AND (?3 IS NULL OR created_by = ?3)
             AND (?4 IS NULL OR instr(lower(last_seen_location), lower(?4)) > 0)
           ORDER BY last_seen_at DESC, rowid DESC
           LIMIT ?5",
        )?;
        let ids = stmt
          .query_map(
            rusqlite::params![species, status, created_by, region, limit],
            |row| row.get::<_, String>(0),
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut raws = Vec::with_capacity(ids.len());
        for id in ids {
          if let Some(raw) = load_raw_animal(conn, &id)? {
            raws.push(raw);
          }
        }
        Ok(raws)
      })
      .await?;

    raws.into_iter().map(RawAnimal::into_animal).collect()
  }

  async fn update_animal(
    &self,
    id: Uuid,
    update: AnimalUpdate,
  ) -> Result<Option<AnimalIdentity>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !modify_animal(&tx, &id_str, |animal| update.apply(animal))? {
          return Ok(None);
        }
        let raw = load_raw_animal(&tx, &id_str)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;
    raw.map(RawAnimal::into_animal).transpose()
  }

  async fn append_report_entry(
    &self,
    id: Uuid,
    entry: ReportEntryInput,
  ) -> Result<Option<AnimalIdentity>> {
    let id_str = encode_uuid(id);
    let ts_str = encode_dt(entry.timestamp);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let found = modify_animal(&tx, &id_str, |animal| {
          animal.last_seen_at = entry.timestamp;
          animal.last_seen_location = entry.location.clone();
        })?;
        if !found {
          return Ok(None);
        }
        tx.execute(
          "INSERT INTO report_history
             (animal_id, timestamp, location, notes, condition, reported_by)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str,
            ts_str,
            entry.location,
            entry.notes,
            entry.condition,
            entry.reported_by,
          ],
        )?;
        let raw = load_raw_animal(&tx, &id_str)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;
    raw.map(RawAnimal::into_animal).transpose()
  }

  async fn append_care_entry(
    &self,
    id: Uuid,
    entry: CareEntryInput,
  ) -> Result<Option<AnimalIdentity>> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());
    let action_str = entry.action.as_ref().to_owned();

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists = tx
          .query_row(
            "SELECT 1 FROM animals WHERE id = ?1",
            rusqlite::params![id_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(None);
        }
        tx.execute(
          "INSERT INTO care_history
             (animal_id, recorded_at, ngo_id, ngo_name, action, notes)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str,
            at_str,
            entry.ngo_id,
            entry.ngo_name,
            action_str,
            entry.notes,
          ],
        )?;
        let raw = load_raw_animal(&tx, &id_str)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;
    raw.map(RawAnimal::into_animal).transpose()
  }

  async fn animal_embeddings(&self, species: Species) -> Result<Vec<(Uuid, Vec<f32>)>> {
    let species_str = species.as_ref().to_owned();
    let rows: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, embedding_json FROM animals
           WHERE species = ?1 AND embedding_json IS NOT NULL
           ORDER BY last_seen_at DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![species_str], |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(id, json)| Ok((decode_uuid(&id)?, serde_json::from_str(&json)?)))
      .collect()
  }
}
