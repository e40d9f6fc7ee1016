//! JSON REST API for PawGuard.
//!
//! Exposes an axum [`Router`] backed by any [`ReportStore`]. TLS and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", pawguard_api::api_router(state))
//! ```

pub mod animals;
pub mod auth;
pub mod error;
pub mod events;
pub mod identify;
pub mod images;
pub mod reports;
pub mod sightings;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use pawguard_core::{desk::ReportDesk, store::ReportStore};
use pawguard_identify::Identifier;

pub use auth::NgoAccount;
pub use error::ApiError;
pub use images::ImageStore;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub desk:       ReportDesk<S>,
  pub identifier: Arc<Identifier>,
  pub accounts:   Arc<Vec<NgoAccount>>,
  pub images:     Arc<ImageStore>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      desk:       self.desk.clone(),
      identifier: self.identifier.clone(),
      accounts:   self.accounts.clone(),
      images:     self.images.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: ReportStore + 'static,
{
  Router::new()
    // Identification and submission
    .route("/identify", post(identify::handler::<S>))
    .route("/sightings", post(sightings::create::<S>))
    // Registry
    .route("/animals", get(animals::list::<S>))
    .route("/animals/search", get(animals::search::<S>))
    .route("/animals/match", post(animals::match_embedding::<S>))
    .route("/animals/{id}", get(animals::get_one::<S>).patch(animals::update::<S>))
    .route("/animals/{id}/reports", post(animals::add_report::<S>))
    .route("/animals/{id}/care", post(animals::add_care::<S>))
    // Reports
    .route("/reports", get(reports::list::<S>))
    .route("/reports/events", get(events::stream::<S>))
    .route("/reports/zone", get(reports::zone::<S>))
    .route("/reports/zone/disaster-mode", post(reports::zone_disaster_mode::<S>))
    .route("/reports/{id}", get(reports::get_one::<S>))
    .route("/reports/{id}/history", get(reports::history::<S>))
    .route("/reports/{id}/status", post(reports::set_status::<S>))
    .route("/reports/{id}/assign", post(reports::assign::<S>))
    .route("/reports/{id}/welfare", post(reports::welfare::<S>))
    .route("/reports/{id}/outcome", post(reports::outcome::<S>))
    .route("/reports/{id}/notes", put(reports::notes::<S>))
    // Images
    .route("/images/{*path}", get(images::serve::<S>))
    .with_state(state)
}
