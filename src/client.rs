//! Blocking HTTP implementation of [`ApiClient`].

use crate::secrets::LidarrSecrets;
use reconcile::{ApiClient, Error, Result};
use serde_json::Value;
use std::time::Duration;
use ureq::http::Response;

const API_KEY_HEADER: &str = "X-Api-Key";

/// Lidarr REST client over a `ureq` agent.
pub struct HttpClient {
    agent: ureq::Agent,
    secrets: LidarrSecrets,
}

impl HttpClient {
    pub fn new(secrets: LidarrSecrets, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: config.into(),
            secrets,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.secrets.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.secrets.base_url)
    }
}

fn transport(err: ureq::Error) -> Error {
    Error::Transport {
        message: err.to_string(),
    }
}

/// Turn a response into JSON, mapping non-2xx statuses to [`Error::Api`].
fn into_json(method: &str, path: &str, mut response: Response<ureq::Body>) -> Result<Value> {
    let status = response.status();
    let body = response.body_mut().read_to_string().map_err(transport)?;
    log::trace!("{method} {path} -> {status}");

    if !status.is_success() {
        let message = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            body
        };
        return Err(Error::api(status.as_u16(), message));
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&body)?)
}

impl ApiClient for HttpClient {
    fn get(&self, path: &str) -> Result<Value> {
        log::debug!("GET {path}");
        let response = self
            .agent
            .get(&self.url(path))
            .header(API_KEY_HEADER, &self.secrets.api_key)
            .header("Accept", "application/json")
            .call()
            .map_err(transport)?;
        into_json("GET", path, response)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value> {
        log::debug!("POST {path}");
        let response = self
            .agent
            .post(&self.url(path))
            .header(API_KEY_HEADER, &self.secrets.api_key)
            .send_json(body)
            .map_err(transport)?;
        into_json("POST", path, response)
    }

    fn put(&self, path: &str, body: &Value) -> Result<Value> {
        log::debug!("PUT {path}");
        let response = self
            .agent
            .put(&self.url(path))
            .header(API_KEY_HEADER, &self.secrets.api_key)
            .send_json(body)
            .map_err(transport)?;
        into_json("PUT", path, response)
    }

    fn delete(&self, path: &str) -> Result<()> {
        log::debug!("DELETE {path}");
        let response = self
            .agent
            .delete(&self.url(path))
            .header(API_KEY_HEADER, &self.secrets.api_key)
            .call()
            .map_err(transport)?;
        into_json("DELETE", path, response).map(|_| ())
    }
}
