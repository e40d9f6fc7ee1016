//! Identification clients for PawGuard.
//!
//! Sends an image to a vision backend and normalises the reply into a
//! [`pawguard_core::identification::Identification`]:
//!
//! - [`cloud::CloudVisionClient`]: a prompted vision function that answers in
//!   loosely formatted JSON.
//! - [`yolo::YoloClient`]: a self-hosted bounding-box detector.
//! - [`fallback`]: a local classifier used when the cloud backend is over
//!   quota or unreachable. With the `onnx` feature, `onnx::OnnxClassifier`
//!   runs an ImageNet model in-process; without it the only classifier is
//!   the YOLO service, which is remote and shares the network with the cloud
//!   backend.
//!
//! [`Identifier`] picks between them.

pub mod cloud;
pub mod error;
pub mod fallback;
pub mod identifier;
pub mod imagenet;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod yolo;

pub use error::IdentifyError;
pub use identifier::{Backend, Identifier};

#[cfg(test)]
mod tests;
