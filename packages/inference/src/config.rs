use serde::{Deserialize, Deserializer, Serialize};

/// Upload gate limits applied by [`crate::validate::validate`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationRules {
    /// Lowercase filename suffixes, including the leading dot
    #[serde(
        default = "default_allowed_extensions",
        deserialize_with = "deserialize_extensions"
    )]
    pub allowed_extensions: Vec<String>,
    /// Smallest accepted width and height in pixels
    #[serde(default = "default_min_dimension")]
    pub min_dimension: u32,
    /// Largest accepted width and height in pixels
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
}

fn default_allowed_extensions() -> Vec<String> {
    [".jpg", ".jpeg", ".png", ".dcm", ".nii"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_min_dimension() -> u32 {
    64
}
fn default_max_dimension() -> u32 {
    2000
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
            min_dimension: default_min_dimension(),
            max_dimension: default_max_dimension(),
        }
    }
}

/// Configuration for the inference pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Location of the serialized classifier (ONNX)
    #[serde(default = "default_model_path")]
    pub model_path: String,
    /// Square edge length the classifier expects
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    #[serde(default)]
    pub validation: ValidationRules,
    /// Seed for fallback template selection; unseeded when absent
    #[serde(default)]
    pub fallback_seed: Option<u64>,
    /// Request body limit for uploads (bytes)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_model_path() -> String {
    "models/densenet201.onnx".to_string()
}
fn default_input_size() -> u32 {
    224
}
fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            input_size: default_input_size(),
            validation: ValidationRules::default(),
            fallback_seed: None,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl InferenceConfig {
    pub fn from_env() -> Self {
        Self {
            model_path: std::env::var("MODEL_PATH").unwrap_or_else(|_| default_model_path()),
            input_size: std::env::var("MODEL_INPUT_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &u32| *v > 0)
                .unwrap_or_else(default_input_size),
            validation: ValidationRules {
                allowed_extensions: std::env::var("ALLOWED_EXTENSIONS")
                    .ok()
                    .map(|v| parse_extensions(&v))
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(default_allowed_extensions),
                min_dimension: std::env::var("MIN_IMAGE_DIMENSION")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(default_min_dimension),
                max_dimension: std::env::var("MAX_IMAGE_DIMENSION")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(default_max_dimension),
            },
            fallback_seed: std::env::var("FALLBACK_SEED")
                .ok()
                .and_then(|v| v.parse().ok()),
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_max_upload_bytes),
        }
    }
}

/// Parse a comma separated extension list, normalizing case and the leading dot
pub fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',').filter_map(normalize_extension).collect()
}

/// Lowercase suffix with a leading dot, `None` for blank input
pub fn normalize_extension(raw: &str) -> Option<String> {
    let ext = raw.trim().to_ascii_lowercase();
    match ext.as_str() {
        "" | "." => None,
        _ if ext.starts_with('.') => Some(ext),
        _ => Some(format!(".{}", ext)),
    }
}

fn deserialize_extensions<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(raw.iter().filter_map(|ext| normalize_extension(ext)).collect())
}
