//! Request-level orchestration
//!
//! validate -> ensure model -> preprocess + score | fallback -> response.
//! [`Predictor::handle_request`] is total: every failure ends up as one of the
//! [`PredictionResponse`] shapes.

use crate::config::InferenceConfig;
use crate::error::{InferenceError, InferenceResult};
use crate::fallback::FallbackPredictor;
use crate::labels::{ClassLabel, NUM_CLASSES};
use crate::model::ModelProvider;
use crate::preprocess::preprocess;
use crate::types::{PredictionResponse, Provenance, ScoredPrediction, TOP_K, TopPredictions};
use crate::validate::validate;
use std::cmp::Ordering;

pub struct Predictor {
    config: InferenceConfig,
    model: ModelProvider,
    fallback: FallbackPredictor,
}

impl Predictor {
    pub fn new(config: InferenceConfig) -> Self {
        let model = ModelProvider::from_config(&config);
        Self::with_model(config, model)
    }

    /// Use a caller-supplied provider, e.g. one with a custom loader
    pub fn with_model(config: InferenceConfig, model: ModelProvider) -> Self {
        let fallback = FallbackPredictor::new(config.fallback_seed);
        Self {
            config,
            model,
            fallback,
        }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    pub fn model(&self) -> &ModelProvider {
        &self.model
    }

    /// Classify one upload. Never fails and never panics on bad input.
    pub fn handle_request(&self, bytes: &[u8], filename: Option<&str>) -> PredictionResponse {
        match self.try_handle(bytes, filename) {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "General error");
                PredictionResponse::prediction_failed(e)
            }
        }
    }

    fn try_handle(&self, bytes: &[u8], filename: Option<&str>) -> InferenceResult<PredictionResponse> {
        let filename = filename
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| InferenceError::Unexpected("upload has no filename".to_string()))?;
        tracing::info!(filename, size = bytes.len(), "Received file");

        let verdict = validate(bytes, filename, &self.config.validation);
        if !verdict.accepted {
            tracing::warn!(filename, reason = %verdict.reason, "Validation failed");
            return Ok(PredictionResponse::invalid_image(verdict.reason));
        }
        tracing::info!(filename, "Image validation passed");

        let prediction = if self.model.ensure_loaded() {
            match self.score_with_model(bytes) {
                Ok(prediction) => prediction,
                Err(e) => {
                    tracing::error!(error = %e, "Model prediction error, using fallback");
                    self.fallback
                        .predict_fallback(filename, Provenance::FallbackDueToError)
                }
            }
        } else {
            tracing::info!("Model unavailable, using intelligent mock prediction");
            self.fallback
                .predict_fallback(filename, Provenance::IntelligentMock)
        };

        tracing::info!(
            predicted_class = %prediction.predicted_class,
            confidence = prediction.confidence,
            model_used = prediction.model_used.as_str(),
            "Prediction complete"
        );
        Ok(PredictionResponse::classified(prediction))
    }

    fn score_with_model(&self, bytes: &[u8]) -> InferenceResult<ScoredPrediction> {
        let tensor = preprocess(bytes, self.config.input_size)?;
        let probabilities = self.model.score(&tensor)?;
        drop(tensor);
        rank_probabilities(&probabilities)
    }
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("model", &self.model)
            .field("fallback", &self.fallback)
            .finish()
    }
}

/// Turn a per-class probability vector into a prediction.
///
/// Argmax wins; the top entries are sorted descending with ties going to the
/// lower label index. Values are scaled by 100 but otherwise untouched.
pub fn rank_probabilities(probabilities: &[f32]) -> InferenceResult<ScoredPrediction> {
    if probabilities.len() != NUM_CLASSES {
        return Err(InferenceError::Scoring(format!(
            "expected {} class scores, got {}",
            NUM_CLASSES,
            probabilities.len()
        )));
    }
    if let Some(i) = probabilities.iter().position(|p| !p.is_finite()) {
        return Err(InferenceError::Scoring(format!(
            "non-finite score for {}",
            ClassLabel::ALL[i]
        )));
    }

    let mut order: Vec<usize> = (0..NUM_CLASSES).collect();
    order.sort_by(|&a, &b| {
        probabilities[b]
            .partial_cmp(&probabilities[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    let top: Vec<(ClassLabel, f64)> = order
        .iter()
        .take(TOP_K)
        .map(|&i| (ClassLabel::ALL[i], probabilities[i] as f64 * 100.0))
        .collect();
    let (predicted_class, confidence) = top[0];

    Ok(ScoredPrediction {
        predicted_class,
        confidence,
        top_predictions: TopPredictions::new(top),
        model_used: Provenance::Model,
    })
}
