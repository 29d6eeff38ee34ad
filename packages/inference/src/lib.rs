//! Arogya MRI inference
//!
//! Classifies uploaded brain MRI scans into one of eight diagnostic classes
//! (four Alzheimer stages, four tumor findings).
//!
//! ## Pipeline
//!
//! 1. [`validate`] rejects uploads that cannot be a scan (undecodable bytes,
//!    disallowed extension, implausible size).
//! 2. [`model::ModelProvider`] lazily loads the classifier on first use and
//!    retries after a failed load.
//! 3. [`preprocess`] turns the upload into a `[1, 224, 224, 3]` tensor.
//! 4. The model scores it, or [`fallback::FallbackPredictor`] answers from
//!    canned scenarios when the model is missing or fails.
//!
//! [`predict::Predictor`] sequences these steps and always produces a
//! [`types::PredictionResponse`]. The HTTP surface documents itself through
//! [`openapi::ApiDoc`], served as a Swagger UI under `/docs`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use arogya_inference::{inference_router, InferenceConfig, InferenceState};
//!
//! let state = InferenceState::from_config(InferenceConfig::from_env());
//! let app = inference_router(state);
//! ```

pub mod config;
pub mod error;
pub mod fallback;
pub mod labels;
pub mod model;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod openapi;
pub mod predict;
pub mod preprocess;
pub mod router;
pub mod types;
pub mod validate;

pub use config::{InferenceConfig, ValidationRules};
pub use error::{InferenceError, InferenceResult};
pub use labels::ClassLabel;
pub use model::{ModelLoader, ModelProvider, ModelStatus, Scorer};
pub use predict::Predictor;
pub use router::{InferenceState, inference_router};
pub use types::{PredictionResponse, Provenance, ScoredPrediction, ValidationVerdict};
