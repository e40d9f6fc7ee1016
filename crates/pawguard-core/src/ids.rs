//! Human-readable identifiers.
//!
//! - System IDs: `PG-<year>-<4 random digits>`, unique per registry record.
//! - Report IDs: `RPT-<year>-<NNNN>`, sequential within a year.

use rand_core::RngCore;

/// How many fresh system IDs the registry tries before giving up.
pub const SYSTEM_ID_ATTEMPTS: usize = 8;

/// `PG-<year>-<0000..=9999>`.
pub fn generate_system_id<R: RngCore + ?Sized>(year: i32, rng: &mut R) -> String {
  let n = rng.next_u32() % 10_000;
  format!("PG-{year:04}-{n:04}")
}

/// Whether `s` matches `PG-\d{4}-\d{4}` exactly.
pub fn is_system_id(s: &str) -> bool {
  let Some(rest) = s.strip_prefix("PG-") else {
    return false;
  };
  let bytes = rest.as_bytes();
  bytes.len() == 9
    && bytes[4] == b'-'
    && bytes[..4].iter().all(u8::is_ascii_digit)
    && bytes[5..].iter().all(u8::is_ascii_digit)
}

/// Prefix shared by every report filed in `year`, e.g. `RPT-2026`.
pub fn report_id_prefix(year: i32) -> String { format!("RPT-{year:04}") }

/// The report ID following `existing` reports already filed this year.
pub fn next_report_id(year: i32, existing: u64) -> String {
  format!("{}-{:04}", report_id_prefix(year), existing + 1)
}
