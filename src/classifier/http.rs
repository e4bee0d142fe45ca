// src/classifier/http.rs
use crate::classifier::{
    Classifier, NarrativeAnalysis, NarrativeAnalyzer, Navigator, SectionAnchor, TableClassification, TableRequest,
};
use crate::edgar::models::StatementType;
use crate::utils::error::ClassifierError;
use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

const CLASSIFIER_USER_AGENT: &str = concat!("statement_extractor/", env!("CARGO_PKG_VERSION"));
// The service is rate limited; space requests out.
const DEFAULT_REQUEST_DELAY_MS: u64 = 150;
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Client for a JSON classification service exposing `/classify-table`,
/// `/locate-sections` and `/analyze`.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: reqwest::Client,
    base_url: String,
    request_delay: Duration,
}

impl HttpClassifier {
    pub fn new(base_url: &str) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .user_agent(CLASSIFIER_USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
        })
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ClassifierError> {
        let url = self.endpoint(path);
        tracing::debug!("POST {}", url);

        tokio::time::sleep(self.request_delay).await;

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;

        check_status(response.status(), &url)?;

        let text = response.text().await?;
        tracing::debug!("Received {} bytes from {}", text.len(), url);
        serde_json::from_str(&text).map_err(|e| ClassifierError::Malformed(format!("{}: {}", url, e)))
    }
}

fn check_status(status: StatusCode, url: &str) -> Result<(), ClassifierError> {
    if status.is_success() {
        return Ok(());
    }
    tracing::error!("HTTP error status: {} for URL: {}", status, url);
    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::FORBIDDEN {
        tracing::warn!("Received {} - backing off is up to the caller.", status);
        return Err(ClassifierError::RateLimited);
    }
    Err(ClassifierError::Http(status))
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify_table(&self, request: TableRequest<'_>) -> Result<TableClassification, ClassifierError> {
        tracing::info!("Classifying {} table ({} bytes)", request.statement, request.text.len());
        self.post("classify-table", &request).await
    }
}

#[async_trait]
impl Navigator for HttpClassifier {
    async fn locate_sections(&self, toc_text: &str) -> Result<Vec<SectionAnchor>, ClassifierError> {
        self.post("locate-sections", &json!({ "toc_text": toc_text })).await
    }
}

#[async_trait]
impl NarrativeAnalyzer for HttpClassifier {
    fn name(&self) -> &str {
        "http"
    }

    async fn analyze(&self, statement: StatementType, text: &str) -> Result<NarrativeAnalysis, ClassifierError> {
        self.post("analyze", &json!({ "statement_type": statement, "text": text })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joining() {
        let classifier = HttpClassifier::new("http://localhost:8080/api/").unwrap();
        assert_eq!(classifier.endpoint("/classify-table"), "http://localhost:8080/api/classify-table");
        assert_eq!(classifier.endpoint("analyze"), "http://localhost:8080/api/analyze");
    }

    #[test]
    fn test_status_mapping() {
        assert!(check_status(StatusCode::OK, "u").is_ok());
        assert!(matches!(check_status(StatusCode::TOO_MANY_REQUESTS, "u"), Err(ClassifierError::RateLimited)));
        assert!(matches!(check_status(StatusCode::FORBIDDEN, "u"), Err(ClassifierError::RateLimited)));
        assert!(matches!(
            check_status(StatusCode::BAD_GATEWAY, "u"),
            Err(ClassifierError::Http(StatusCode::BAD_GATEWAY))
        ));
    }

    #[test]
    fn test_unreachable_service_is_a_network_error() {
        let classifier = HttpClassifier::new("http://127.0.0.1:9").unwrap().with_request_delay(Duration::ZERO);
        let result = tokio_test::block_on(classifier.locate_sections("Item 8"));
        assert!(matches!(result, Err(ClassifierError::Network(_))));
    }
}
