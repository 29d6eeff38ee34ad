use utoipa::OpenApi;

/// Path the interactive documentation is served under
pub const DOCS_PATH: &str = "/docs";
/// Path of the generated OpenAPI document
pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MRI Disease Prediction API",
        version = "1.0.0",
        description = "Classifies brain MRI scans into Alzheimer stages and tumor findings.\n\nEvery prediction outcome is returned with HTTP 200; failures carry an `error` field.",
        license(name = "MIT")
    ),
    tags(
        (name = "status", description = "Service and model status"),
        (name = "prediction", description = "MRI classification")
    ),
    paths(
        crate::router::root,
        crate::router::predict,
        crate::router::health_check,
    ),
    components(schemas(
        crate::router::StatusResponse,
        crate::router::Endpoints,
        crate::router::HealthResponse,
        crate::router::PredictUpload,
        crate::model::ModelStatus,
        crate::labels::ClassLabel,
        crate::types::Provenance,
        crate::types::ScoredPrediction,
        crate::types::PredictionResponse,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_all_routes() {
        let doc = ApiDoc::openapi();
        for path in ["/", "/predict", "/health"] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
        let schemas = doc.components.expect("components").schemas;
        assert!(schemas.contains_key("PredictionResponse"));
        assert!(schemas.contains_key("ClassLabel"));
    }
}
