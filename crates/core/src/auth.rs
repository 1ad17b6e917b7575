use crate::error::ConvertError;
use tokio::process::Command;

/// Resolves the bearer token used for every Google API call. An explicit
/// `GOOGLE_ACCESS_TOKEN` wins; otherwise the gcloud CLI is asked for one.
pub async fn access_token() -> Result<String, ConvertError> {
    if let Some(token) = token_from_env() {
        return Ok(token);
    }

    let output = Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .await
        .map_err(|error| {
            ConvertError::AuthToken(format!("could not run gcloud: {error}"))
        })?;

    if !output.status.success() {
        return Err(ConvertError::AuthToken(format!(
            "gcloud auth print-access-token exited with {}",
            output.status
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(ConvertError::AuthToken(
            "gcloud returned an empty access token".to_string(),
        ));
    }

    Ok(token)
}

fn token_from_env() -> Option<String> {
    std::env::var("GOOGLE_ACCESS_TOKEN").ok().and_then(|value| {
        let token = value.trim().to_string();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    })
}
