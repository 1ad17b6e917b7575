use crate::auth;
use crate::error::ServiceError;
use crate::models::ProcessorInfo;
use crate::traits::LayoutProcessor;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Online processing accepts documents up to 20 MB; larger inputs must be
/// paginated before submission.
pub const ONLINE_REQUEST_LIMIT_BYTES: usize = 20 * 1024 * 1024;

pub struct LayoutClient {
    client: Client,
    project_id: String,
    location: String,
    processor_id: Option<String>,
}

impl LayoutClient {
    pub fn new(
        project_id: impl Into<String>,
        location: impl Into<String>,
        request_timeout_secs: u64,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            project_id: project_id.into(),
            location: location.into(),
            processor_id: None,
        })
    }

    pub fn with_processor(mut self, processor_id: impl Into<String>) -> Self {
        self.processor_id = Some(processor_id.into());
        self
    }

    fn parent(&self) -> String {
        format!(
            "https://{}-documentai.googleapis.com/v1/projects/{}/locations/{}",
            self.location, self.project_id, self.location
        )
    }

    async fn token(&self) -> Result<String, ServiceError> {
        auth::access_token()
            .await
            .map_err(|error| ServiceError::Request(error.to_string()))
    }

    pub async fn create_processor(
        &self,
        display_name: &str,
    ) -> Result<ProcessorInfo, ServiceError> {
        let token = self.token().await?;
        let response = self
            .client
            .post(format!("{}/processors", self.parent()))
            .bearer_auth(token)
            .json(&json!({
                "displayName": display_name,
                "type": "LAYOUT_PARSER_PROCESSOR",
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::BackendResponse {
                service: "documentai".to_string(),
                details: response.status().to_string(),
            });
        }

        let body: Value = response.json().await?;
        parse_processor(&body).ok_or_else(|| ServiceError::BackendResponse {
            service: "documentai".to_string(),
            details: "create response had no processor name".to_string(),
        })
    }

    pub async fn list_processors(&self) -> Result<Vec<ProcessorInfo>, ServiceError> {
        let token = self.token().await?;
        let response = self
            .client
            .get(format!("{}/processors", self.parent()))
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::BackendResponse {
                service: "documentai".to_string(),
                details: response.status().to_string(),
            });
        }

        let body: Value = response.json().await?;
        let processors = body
            .pointer("/processors")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(processors.iter().filter_map(parse_processor).collect())
    }

    pub async fn process_online(
        &self,
        content: &[u8],
        mime_type: &str,
    ) -> Result<Value, ServiceError> {
        let processor_id = self.processor_id.as_deref().ok_or_else(|| {
            ServiceError::Request("no processor id configured".to_string())
        })?;

        if content.len() > ONLINE_REQUEST_LIMIT_BYTES {
            return Err(ServiceError::Request(format!(
                "document is {} bytes, online processing is limited to {} bytes",
                content.len(),
                ONLINE_REQUEST_LIMIT_BYTES
            )));
        }

        let token = self.token().await?;
        let response = self
            .client
            .post(format!(
                "{}/processors/{}:process",
                self.parent(),
                processor_id
            ))
            .bearer_auth(token)
            .json(&json!({
                "rawDocument": {
                    "content": STANDARD.encode(content),
                    "mimeType": mime_type,
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let details = response.text().await.unwrap_or_default();
            return Err(ServiceError::BackendResponse {
                service: "documentai".to_string(),
                details: format!("{status}: {details}"),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl LayoutProcessor for LayoutClient {
    async fn process(&self, content: &[u8], mime_type: &str) -> Result<Value, ServiceError> {
        self.process_online(content, mime_type).await
    }
}

fn parse_processor(value: &Value) -> Option<ProcessorInfo> {
    let name = value.pointer("/name").and_then(Value::as_str)?.to_string();
    let processor_id = name.rsplit('/').next().unwrap_or_default().to_string();

    Some(ProcessorInfo {
        processor_id,
        display_name: value
            .pointer("/displayName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        processor_type: value
            .pointer("/type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        state: value
            .pointer("/state")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_processor, LayoutClient, ONLINE_REQUEST_LIMIT_BYTES};
    use crate::error::ServiceError;
    use serde_json::json;

    #[tokio::test]
    async fn oversized_document_is_rejected_before_any_request() {
        let client = LayoutClient::new("project", "us", 300)
            .expect("client should build")
            .with_processor("abc123");

        let content = vec![0u8; ONLINE_REQUEST_LIMIT_BYTES + 1];
        let result = client.process_online(&content, "application/pdf").await;
        assert!(matches!(result, Err(ServiceError::Request(_))));
    }

    #[tokio::test]
    async fn missing_processor_id_is_an_error() {
        let client = LayoutClient::new("project", "us", 300).expect("client should build");
        let result = client.process_online(b"%PDF-1.4", "application/pdf").await;
        assert!(matches!(result, Err(ServiceError::Request(_))));
    }

    #[test]
    fn processor_id_is_last_resource_path_segment() {
        let value = json!({
            "name": "projects/p/locations/us/processors/7dfc4ba025057d4c",
            "displayName": "layout-parser-md",
            "type": "LAYOUT_PARSER_PROCESSOR",
            "state": "ENABLED"
        });

        let info = parse_processor(&value).expect("processor should parse");
        assert_eq!(info.processor_id, "7dfc4ba025057d4c");
        assert_eq!(info.display_name, "layout-parser-md");
        assert_eq!(info.state, "ENABLED");
    }

    #[test]
    fn processor_without_name_is_rejected() {
        assert!(parse_processor(&json!({"displayName": "x"})).is_none());
    }
}
