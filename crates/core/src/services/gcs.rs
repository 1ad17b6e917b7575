use crate::auth;
use crate::error::ServiceError;
use reqwest::Client;
use url::Url;

pub struct GcsClient {
    client: Client,
    endpoint: String,
}

impl GcsClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            endpoint: "https://storage.googleapis.com".to_string(),
        }
    }

    pub async fn upload(
        &self,
        bucket: &str,
        object_name: &str,
        content: &str,
        content_type: &str,
    ) -> Result<String, ServiceError> {
        let url = Url::parse_with_params(
            &format!("{}/upload/storage/v1/b/{}/o", self.endpoint, bucket),
            &[("uploadType", "media"), ("name", object_name)],
        )?;

        let token = auth::access_token()
            .await
            .map_err(|error| ServiceError::Request(error.to_string()))?;

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .header("Content-Type", content_type)
            .body(content.to_string())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::BackendResponse {
                service: "gcs".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(format!("gs://{bucket}/{object_name}"))
    }
}

impl Default for GcsClient {
    fn default() -> Self {
        Self::new()
    }
}
