//! Lazily loaded scoring resource
//!
//! The [`ModelProvider`] is the only owner of the classifier. It moves through
//! `Unloaded -> Loading -> Ready | LoadFailed`; `Ready` is terminal for the
//! process and `LoadFailed` is retried on the next [`ModelProvider::ensure_loaded`].
//!
//! Load attempts are serialized by a dedicated lock. A caller that queued
//! behind an attempt which finished meanwhile reuses that outcome instead of
//! loading again. There is no timeout on a load; it is bounded only by the
//! underlying loader.

use crate::config::InferenceConfig;
use crate::error::{InferenceError, InferenceResult};
use ndarray::Array4;
use serde::Serialize;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use utoipa::ToSchema;

/// A ready-to-run classifier producing one probability per class label
pub trait Scorer: Send + Sync {
    fn score(&self, input: &Array4<f32>) -> InferenceResult<Vec<f32>>;
}

/// Resolves a resource locator into a [`Scorer`]
pub trait ModelLoader: Send + Sync {
    fn load(&self, locator: &str) -> InferenceResult<Arc<dyn Scorer>>;
}

/// Externally visible lifecycle of the scoring resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Unloaded,
    Loading,
    Ready,
    LoadFailed,
}

impl ModelStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelStatus::Unloaded => "unloaded",
            ModelStatus::Loading => "loading",
            ModelStatus::Ready => "ready",
            ModelStatus::LoadFailed => "load_failed",
        }
    }
}

enum ModelState {
    Unloaded,
    Loading,
    Ready(Arc<dyn Scorer>),
    LoadFailed(String),
}

impl ModelState {
    fn status(&self) -> ModelStatus {
        match self {
            ModelState::Unloaded => ModelStatus::Unloaded,
            ModelState::Loading => ModelStatus::Loading,
            ModelState::Ready(_) => ModelStatus::Ready,
            ModelState::LoadFailed(_) => ModelStatus::LoadFailed,
        }
    }
}

struct Inner {
    state: ModelState,
    /// Completed load attempts, successful or not
    attempts: u64,
}

pub struct ModelProvider {
    locator: String,
    loader: Box<dyn ModelLoader>,
    inner: Mutex<Inner>,
    load_lock: Mutex<()>,
}

impl fmt::Debug for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelProvider")
            .field("locator", &self.locator)
            .field("status", &self.state())
            .finish()
    }
}

impl ModelProvider {
    /// Provider backed by the default loader for the configured model path
    pub fn from_config(config: &InferenceConfig) -> Self {
        Self::with_loader(config.model_path.clone(), default_loader(config))
    }

    pub fn with_loader(locator: impl Into<String>, loader: Box<dyn ModelLoader>) -> Self {
        Self {
            locator: locator.into(),
            loader,
            inner: Mutex::new(Inner {
                state: ModelState::Unloaded,
                attempts: 0,
            }),
            load_lock: Mutex::new(()),
        }
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Load the model if it is not ready yet. Returns whether a scorer is
    /// available afterwards. Never panics and never returns an error.
    pub fn ensure_loaded(&self) -> bool {
        let seen_attempts = {
            let inner = self.lock_inner();
            if matches!(inner.state, ModelState::Ready(_)) {
                return true;
            }
            inner.attempts
        };

        let _load_guard = self
            .load_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        {
            let mut inner = self.lock_inner();
            match inner.state {
                ModelState::Ready(_) => return true,
                ModelState::LoadFailed(_) if inner.attempts != seen_attempts => return false,
                _ => {}
            }
            inner.state = ModelState::Loading;
        }

        tracing::info!(locator = %self.locator, "Attempting to load model");
        let outcome = catch_unwind(AssertUnwindSafe(|| self.loader.load(&self.locator)))
            .unwrap_or_else(|_| Err(InferenceError::Load("loader panicked".to_string())));

        let mut inner = self.lock_inner();
        inner.attempts += 1;
        match outcome {
            Ok(scorer) => {
                inner.state = ModelState::Ready(scorer);
                tracing::info!(locator = %self.locator, "Model loaded successfully");
                true
            }
            Err(e) => {
                tracing::error!(locator = %self.locator, error = %e, "Error loading model");
                inner.state = ModelState::LoadFailed(e.to_string());
                false
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.lock_inner().state, ModelState::Ready(_))
    }

    pub fn state(&self) -> ModelStatus {
        self.lock_inner().state.status()
    }

    /// Message of the most recent failed load, while in `LoadFailed`
    pub fn last_error(&self) -> Option<String> {
        match &self.lock_inner().state {
            ModelState::LoadFailed(msg) => Some(msg.clone()),
            _ => None,
        }
    }

    pub fn load_attempts(&self) -> u64 {
        self.lock_inner().attempts
    }

    /// Run the classifier. The raw output is passed through untouched.
    pub fn score(&self, input: &Array4<f32>) -> InferenceResult<Vec<f32>> {
        let scorer = match &self.lock_inner().state {
            ModelState::Ready(scorer) => Arc::clone(scorer),
            _ => return Err(InferenceError::ModelNotReady),
        };
        catch_unwind(AssertUnwindSafe(|| scorer.score(input)))
            .unwrap_or_else(|_| Err(InferenceError::Scoring("scorer panicked".to_string())))
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(feature = "onnx")]
fn default_loader(config: &InferenceConfig) -> Box<dyn ModelLoader> {
    Box::new(crate::onnx::OnnxLoader::new(config.input_size))
}

#[cfg(not(feature = "onnx"))]
fn default_loader(_config: &InferenceConfig) -> Box<dyn ModelLoader> {
    Box::new(UnavailableLoader)
}

/// Loader used when the crate is built without a scoring backend
#[cfg(not(feature = "onnx"))]
struct UnavailableLoader;

#[cfg(not(feature = "onnx"))]
impl ModelLoader for UnavailableLoader {
    fn load(&self, _locator: &str) -> InferenceResult<Arc<dyn Scorer>> {
        Err(InferenceError::Load(
            "built without the 'onnx' feature".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    struct ConstScorer(Vec<f32>);

    impl Scorer for ConstScorer {
        fn score(&self, _input: &Array4<f32>) -> InferenceResult<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    /// Fails until `succeed` is flipped; counts calls.
    struct ToggleLoader {
        succeed: Arc<AtomicBool>,
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl ModelLoader for ToggleLoader {
        fn load(&self, locator: &str) -> InferenceResult<Arc<dyn Scorer>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            if self.succeed.load(Ordering::SeqCst) {
                Ok(Arc::new(ConstScorer(vec![0.125; 8])))
            } else {
                Err(InferenceError::Load(format!("{} not found", locator)))
            }
        }
    }

    fn provider(succeed: bool, delay: Duration) -> (ModelProvider, Arc<AtomicBool>, Arc<AtomicUsize>) {
        let flag = Arc::new(AtomicBool::new(succeed));
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = ToggleLoader {
            succeed: flag.clone(),
            calls: calls.clone(),
            delay,
        };
        (
            ModelProvider::with_loader("model.onnx", Box::new(loader)),
            flag,
            calls,
        )
    }

    #[test]
    fn test_starts_unloaded() {
        let (p, _, calls) = provider(true, Duration::ZERO);
        assert_eq!(p.state(), ModelStatus::Unloaded);
        assert!(!p.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_loads_once_then_stays_ready() {
        let (p, flag, calls) = provider(true, Duration::ZERO);
        assert!(p.ensure_loaded());
        assert!(p.is_ready());
        flag.store(false, Ordering::SeqCst);
        assert!(p.ensure_loaded());
        assert_eq!(p.state(), ModelStatus::Ready);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_load_is_retried() {
        let (p, flag, calls) = provider(false, Duration::ZERO);
        assert!(!p.ensure_loaded());
        assert_eq!(p.state(), ModelStatus::LoadFailed);
        assert_eq!(p.last_error().unwrap(), "Model load failed: model.onnx not found");

        flag.store(true, Ordering::SeqCst);
        assert!(p.ensure_loaded());
        assert_eq!(p.state(), ModelStatus::Ready);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(p.last_error().is_none());
    }

    #[test]
    fn test_score_requires_ready() {
        let (p, _, _) = provider(true, Duration::ZERO);
        let input = Array4::<f32>::zeros((1, 4, 4, 3));
        assert!(matches!(p.score(&input), Err(InferenceError::ModelNotReady)));
        p.ensure_loaded();
        assert_eq!(p.score(&input).unwrap(), vec![0.125; 8]);
    }

    #[test]
    fn test_panicking_loader_becomes_load_failure() {
        struct PanicLoader;
        impl ModelLoader for PanicLoader {
            fn load(&self, _locator: &str) -> InferenceResult<Arc<dyn Scorer>> {
                panic!("boom");
            }
        }
        let p = ModelProvider::with_loader("x", Box::new(PanicLoader));
        assert!(!p.ensure_loaded());
        assert_eq!(p.state(), ModelStatus::LoadFailed);
    }

    #[test]
    fn test_concurrent_first_load_succeeds_once() {
        let (p, _, calls) = provider(true, Duration::from_millis(50));
        let p = Arc::new(p);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let p = p.clone();
                thread::spawn(move || p.ensure_loaded())
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
        assert_eq!(p.state(), ModelStatus::Ready);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_first_load_failure_settles() {
        let (p, _, _) = provider(false, Duration::from_millis(20));
        let p = Arc::new(p);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let p = p.clone();
                thread::spawn(move || p.ensure_loaded())
            })
            .collect();
        for h in handles {
            assert!(!h.join().unwrap());
        }
        assert_eq!(p.state(), ModelStatus::LoadFailed);
        assert!(p.load_attempts() >= 1);
    }

    #[test]
    fn test_status_names() {
        assert_eq!(ModelStatus::LoadFailed.as_str(), "load_failed");
        assert_eq!(
            serde_json::to_value(ModelStatus::LoadFailed).unwrap(),
            "load_failed"
        );
    }
}
