//! Publication Client — IPFS pinning collaborator
//!
//! Narrow interface over an external pinning service: upload bytes, get a
//! content address back. The retrieval URL is built by string concatenation
//! with the configured gateway prefix. Publication failures never abort a
//! run; the caller degrades to a result without a URL.

use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;

use crate::config::RefineryConfig;
use crate::error::{RefineryError, Result};

const PIN_FILE_URL: &str = "https://api.pinata.cloud/pinning/pinFileToIPFS";
const PIN_JSON_URL: &str = "https://api.pinata.cloud/pinning/pinJSONToIPFS";
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Content-addressable publication collaborator
pub trait Publisher {
    /// Upload a file, returning its content address
    fn upload_file(&self, path: &Path) -> Result<String>;

    /// Upload a JSON value, returning its content address
    fn upload_json(&self, value: &Value) -> Result<String>;
}

/// Pinata pinning-service client
pub struct PinataClient {
    api_key: String,
    api_secret: String,
    client: reqwest::blocking::Client,
}

impl PinataClient {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| RefineryError::Publication(e.to_string()))?;
        Ok(Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            client,
        })
    }

    /// Build a client from the configuration; `None` when credentials are absent
    pub fn from_config(config: &RefineryConfig) -> Option<Result<Self>> {
        match (&config.pinata_api_key, &config.pinata_api_secret) {
            (Some(key), Some(secret)) => Some(Self::new(key, secret)),
            _ => None,
        }
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<String> {
        let response = request
            .header("pinata_api_key", &self.api_key)
            .header("pinata_secret_api_key", &self.api_secret)
            .send()
            .map_err(|e| RefineryError::Publication(e.to_string()))?;
        if !response.status().is_success() {
            return Err(RefineryError::Publication(format!(
                "pinning service returned {}",
                response.status()
            )));
        }
        let body: Value = response
            .json()
            .map_err(|e| RefineryError::Publication(e.to_string()))?;
        body.get("IpfsHash")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                RefineryError::Publication("response is missing IpfsHash".to_string())
            })
    }
}

impl Publisher for PinataClient {
    fn upload_file(&self, path: &Path) -> Result<String> {
        let form = reqwest::blocking::multipart::Form::new()
            .file("file", path)
            .map_err(|e| {
                RefineryError::Publication(format!("cannot attach '{}': {}", path.display(), e))
            })?;
        self.send(self.client.post(PIN_FILE_URL).multipart(form))
    }

    fn upload_json(&self, value: &Value) -> Result<String> {
        let body = json!({ "pinataContent": value });
        self.send(self.client.post(PIN_JSON_URL).json(&body))
    }
}

/// Build a retrieval URL from a gateway prefix and a content address
pub fn retrieval_url(gateway: &str, content_address: &str) -> String {
    format!("{}/{}", gateway.trim_end_matches('/'), content_address)
}
