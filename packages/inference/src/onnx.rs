//! tract-backed ONNX classifier

use crate::error::{InferenceError, InferenceResult};
use crate::model::{ModelLoader, Scorer};
use ndarray::Array4;
use std::path::Path;
use std::sync::Arc;
use tract_onnx::prelude::*;

/// Optimized, runnable plan behind a call boundary
type RunPlan = Box<dyn Fn(TVec<TValue>) -> TractResult<TVec<TValue>> + Send + Sync>;

/// Loads an ONNX export of the classifier with a fixed `[1, size, size, 3]` input
pub struct OnnxLoader {
    input_size: usize,
}

impl OnnxLoader {
    pub fn new(input_size: u32) -> Self {
        Self {
            input_size: input_size as usize,
        }
    }
}

impl ModelLoader for OnnxLoader {
    fn load(&self, locator: &str) -> InferenceResult<Arc<dyn Scorer>> {
        let path = Path::new(locator);
        if !path.exists() {
            return Err(InferenceError::Load(format!(
                "Model file not found at: {}",
                locator
            )));
        }

        let input_fact = f32::fact([1, self.input_size, self.input_size, 3]);
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, input_fact.into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| InferenceError::Load(format!("ONNX parse error: {e}")))?;

        Ok(Arc::new(OnnxScorer {
            plan: Box::new(move |inputs: TVec<TValue>| plan.run(inputs)),
            input_size: self.input_size,
        }))
    }
}

pub struct OnnxScorer {
    plan: RunPlan,
    input_size: usize,
}

impl Scorer for OnnxScorer {
    fn score(&self, input: &Array4<f32>) -> InferenceResult<Vec<f32>> {
        let expected = [1, self.input_size, self.input_size, 3];
        if input.shape() != expected {
            return Err(InferenceError::Scoring(format!(
                "input shape {:?} does not match {:?}",
                input.shape(),
                expected
            )));
        }
        let data = input
            .as_slice()
            .ok_or_else(|| InferenceError::Scoring("input tensor is not contiguous".to_string()))?;
        let tensor = Tensor::from_shape(&expected, data)
            .map_err(|e| InferenceError::Scoring(e.to_string()))?;

        let outputs = (self.plan)(tvec!(tensor.into()))
            .map_err(|e| InferenceError::Scoring(format!("Failed to run ONNX model: {e}")))?;

        let first = outputs
            .first()
            .ok_or_else(|| InferenceError::Scoring("Model produced no outputs".to_string()))?;
        let view = first
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::Scoring(format!("Output is not f32: {}", e)))?;

        Ok(view.iter().copied().collect())
    }
}
