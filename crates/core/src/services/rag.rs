use crate::auth;
use crate::error::ServiceError;
use crate::models::{CorpusInfo, ImportOptions, RagFileInfo, RetrievalOptions, RetrievedChunk};
use crate::traits::ChunkRetriever;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

const OPERATION_POLL_INTERVAL_SECS: u64 = 5;
const OPERATION_POLL_ATTEMPTS: usize = 60;

pub struct RagClient {
    client: Client,
    project_id: String,
    location: String,
    corpus_name: Option<String>,
}

impl RagClient {
    pub fn new(project_id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            project_id: project_id.into(),
            location: location.into(),
            corpus_name: None,
        }
    }

    pub fn with_corpus(mut self, corpus_name: impl Into<String>) -> Self {
        self.corpus_name = Some(corpus_name.into());
        self
    }

    fn base(&self) -> String {
        format!("https://{}-aiplatform.googleapis.com/v1", self.location)
    }

    fn parent(&self) -> String {
        format!("projects/{}/locations/{}", self.project_id, self.location)
    }

    fn model_resource(&self, model_id: &str) -> String {
        format!("{}/publishers/google/models/{}", self.parent(), model_id)
    }

    async fn token(&self) -> Result<String, ServiceError> {
        auth::access_token()
            .await
            .map_err(|error| ServiceError::Request(error.to_string()))
    }

    pub async fn create_corpus(&self, display_name: &str) -> Result<CorpusInfo, ServiceError> {
        let token = self.token().await?;
        let response = self
            .client
            .post(format!("{}/{}/ragCorpora", self.base(), self.parent()))
            .bearer_auth(token)
            .json(&json!({ "displayName": display_name }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::BackendResponse {
                service: "rag-engine".to_string(),
                details: response.status().to_string(),
            });
        }

        let operation: Value = response.json().await?;
        let done = self.wait_operation(&operation).await?;

        let name = done
            .pointer("/response/name")
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::BackendResponse {
                service: "rag-engine".to_string(),
                details: "corpus operation finished without a resource name".to_string(),
            })?;

        Ok(CorpusInfo {
            name: name.to_string(),
            display_name: display_name.to_string(),
        })
    }

    pub async fn list_corpora(&self) -> Result<Vec<CorpusInfo>, ServiceError> {
        let token = self.token().await?;
        let response = self
            .client
            .get(format!("{}/{}/ragCorpora", self.base(), self.parent()))
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::BackendResponse {
                service: "rag-engine".to_string(),
                details: response.status().to_string(),
            });
        }

        let body: Value = response.json().await?;
        let corpora = body
            .pointer("/ragCorpora")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(corpora
            .iter()
            .filter_map(|corpus| {
                let name = corpus.pointer("/name").and_then(Value::as_str)?;
                Some(CorpusInfo {
                    name: name.to_string(),
                    display_name: corpus
                        .pointer("/displayName")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                })
            })
            .collect())
    }

    pub async fn list_files(&self) -> Result<Vec<RagFileInfo>, ServiceError> {
        let corpus = self.corpus()?;
        let token = self.token().await?;
        let response = self
            .client
            .get(format!("{}/{}/ragFiles", self.base(), corpus))
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::BackendResponse {
                service: "rag-engine".to_string(),
                details: response.status().to_string(),
            });
        }

        let body: Value = response.json().await?;
        let files = body
            .pointer("/ragFiles")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(files
            .iter()
            .filter_map(|file| {
                let name = file.pointer("/name").and_then(Value::as_str)?;
                Some(RagFileInfo {
                    name: name.to_string(),
                    display_name: file
                        .pointer("/displayName")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                })
            })
            .collect())
    }

    /// Imports GCS documents through the LLM parser. The chunking config
    /// favours the largest chunk size with minimal overlap because the
    /// retrieved chunks are recombined into one document afterwards.
    pub async fn import_files(
        &self,
        gcs_uris: &[String],
        options: &ImportOptions,
    ) -> Result<(), ServiceError> {
        let corpus = self.corpus()?;
        if gcs_uris.is_empty() {
            return Err(ServiceError::Request("no gcs uris to import".to_string()));
        }

        let token = self.token().await?;
        let response = self
            .client
            .post(format!("{}/{}/ragFiles:import", self.base(), corpus))
            .bearer_auth(token)
            .json(&json!({
                "importRagFilesConfig": {
                    "gcsSource": { "uris": gcs_uris },
                    "ragFileTransformationConfig": {
                        "ragFileChunkingConfig": {
                            "fixedLengthChunking": {
                                "chunkSize": options.chunk_size,
                                "chunkOverlap": options.chunk_overlap,
                            }
                        }
                    },
                    "ragFileParsingConfig": {
                        "llmParser": {
                            "modelName": self.model_resource(&options.model_id),
                            "maxParsingRequestsPerMin": options.max_parsing_requests_per_min,
                            "customParsingPrompt": options.custom_parsing_prompt,
                        }
                    }
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::BackendResponse {
                service: "rag-engine".to_string(),
                details: response.status().to_string(),
            });
        }

        let operation: Value = response.json().await?;
        self.wait_operation(&operation).await?;
        Ok(())
    }

    pub async fn retrieve_chunks(
        &self,
        options: &RetrievalOptions,
    ) -> Result<Vec<RetrievedChunk>, ServiceError> {
        let corpus = self.corpus()?;
        let token = self.token().await?;
        let response = self
            .client
            .post(format!(
                "{}/{}:retrieveContexts",
                self.base(),
                self.parent()
            ))
            .bearer_auth(token)
            .json(&json!({
                "vertexRagStore": {
                    "ragResources": [ { "ragCorpus": corpus } ],
                    "vectorDistanceThreshold": options.vector_distance_threshold,
                },
                "query": {
                    "text": options.query,
                    "similarityTopK": options.top_k,
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::BackendResponse {
                service: "rag-engine".to_string(),
                details: response.status().to_string(),
            });
        }

        let body: Value = response.json().await?;
        Ok(parse_contexts(&body))
    }

    fn corpus(&self) -> Result<&str, ServiceError> {
        self.corpus_name
            .as_deref()
            .ok_or_else(|| ServiceError::Request("no corpus configured".to_string()))
    }

    async fn wait_operation(&self, operation: &Value) -> Result<Value, ServiceError> {
        if operation.pointer("/done").and_then(Value::as_bool) == Some(true) {
            if let Some(error) = operation.pointer("/error") {
                return Err(ServiceError::Request(format!("operation failed: {error}")));
            }
            return Ok(operation.clone());
        }

        let name = operation
            .pointer("/name")
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::BackendResponse {
                service: "rag-engine".to_string(),
                details: "operation response had no name".to_string(),
            })?
            .to_string();

        for _ in 0..OPERATION_POLL_ATTEMPTS {
            tokio::time::sleep(Duration::from_secs(OPERATION_POLL_INTERVAL_SECS)).await;

            let token = self.token().await?;
            let response = self
                .client
                .get(format!("{}/{}", self.base(), name))
                .bearer_auth(token)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(ServiceError::BackendResponse {
                    service: "rag-engine".to_string(),
                    details: response.status().to_string(),
                });
            }

            let body: Value = response.json().await?;
            if body.pointer("/done").and_then(Value::as_bool) == Some(true) {
                if let Some(error) = body.pointer("/error") {
                    return Err(ServiceError::Request(format!(
                        "operation {name} failed: {error}"
                    )));
                }
                return Ok(body);
            }
        }

        Err(ServiceError::NotReady(name))
    }
}

#[async_trait]
impl ChunkRetriever for RagClient {
    async fn retrieve(
        &self,
        options: &RetrievalOptions,
    ) -> Result<Vec<RetrievedChunk>, ServiceError> {
        self.retrieve_chunks(options).await
    }
}

fn parse_contexts(body: &Value) -> Vec<RetrievedChunk> {
    let contexts = body
        .pointer("/contexts/contexts")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    contexts
        .iter()
        .enumerate()
        .map(|(position, context)| RetrievedChunk {
            index: position + 1,
            source_uri: context
                .pointer("/sourceUri")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            text: context
                .pointer("/text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            distance: context.pointer("/distance").and_then(Value::as_f64),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{parse_contexts, RagClient};
    use crate::error::ServiceError;
    use serde_json::json;

    #[tokio::test]
    async fn finished_operation_with_error_is_not_success() {
        let client = RagClient::new("project", "us-central1");
        let operation = json!({
            "name": "projects/p/locations/us-central1/operations/1",
            "done": true,
            "error": {"code": 3, "message": "import failed"}
        });

        let result = client.wait_operation(&operation).await;
        assert!(matches!(result, Err(ServiceError::Request(_))));
    }

    #[tokio::test]
    async fn finished_operation_without_error_passes_through() {
        let client = RagClient::new("project", "us-central1");
        let operation = json!({
            "done": true,
            "response": {"name": "projects/p/locations/us-central1/ragCorpora/7"}
        });

        let done = client
            .wait_operation(&operation)
            .await
            .expect("completed operation should be returned");
        assert_eq!(
            done.pointer("/response/name").and_then(|name| name.as_str()),
            Some("projects/p/locations/us-central1/ragCorpora/7")
        );
    }

    #[test]
    fn contexts_map_to_indexed_chunks() {
        let body = json!({
            "contexts": {
                "contexts": [
                    {"sourceUri": "gs://b/doc.pdf", "text": "first", "distance": 0.42},
                    {"text": "second"}
                ]
            }
        });

        let chunks = parse_contexts(&body);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].index, 1);
        assert_eq!(chunks[0].source_uri, "gs://b/doc.pdf");
        assert_eq!(chunks[0].distance, Some(0.42));
        assert_eq!(chunks[1].index, 2);
        assert_eq!(chunks[1].source_uri, "unknown");
        assert_eq!(chunks[1].distance, None);
    }

    #[test]
    fn missing_contexts_yield_empty_list() {
        assert!(parse_contexts(&json!({})).is_empty());
    }
}
