/// AnkiConnect client: request envelope, response checking and typed actions

use crate::config::ExporterConfig;
use crate::error::ExporterError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// Envelope every AnkiConnect request is wrapped in
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnkiRequest<'a> {
    pub action: &'a str,
    pub version: u8,
    pub params: Value,
}

/// Conventional reply shape; `result` is left untyped until a caller asks for it
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AnkiResponse {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<String>,
}

impl AnkiResponse {
    /// A non-null `error` is a failure; otherwise hand back `result`
    pub fn into_result(self) -> Result<Value, ExporterError> {
        match self.error {
            Some(err) => Err(ExporterError::Api(err)),
            None => Ok(self.result),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NoteOptions {
    pub allow_duplicate: bool,
}

/// Payload for the `addNote` action
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NoteRequest {
    pub deck_name: String,
    pub model_name: String,
    pub fields: BTreeMap<String, String>,
    pub options: NoteOptions,
    pub tags: Vec<String>,
}

#[allow(async_fn_in_trait)]
pub trait AnkiApi {
    /// Send one action and return the parsed body as-is
    async fn invoke(&self, action: &str, params: Value) -> Result<Value, ExporterError>;

    async fn call<T: DeserializeOwned>(&self, action: &str, params: Value) -> Result<T, ExporterError> {
        let body = self.invoke(action, params).await?;
        let response: AnkiResponse = serde_json::from_value(body).map_err(|e| {
            ExporterError::UnexpectedResponse {
                action: action.to_string(),
                detail: e.to_string(),
            }
        })?;
        let result = response.into_result()?;

        serde_json::from_value(result).map_err(|e| ExporterError::UnexpectedResponse {
            action: action.to_string(),
            detail: e.to_string(),
        })
    }

    /// `None` when the listener answered without a usable version
    async fn version(&self) -> Result<Option<u64>, ExporterError> {
        let result: Value = self.call("version", json!({})).await?;
        Ok(result.as_u64().filter(|v| *v > 0))
    }

    async fn deck_names(&self) -> Result<Vec<String>, ExporterError> {
        self.call("deckNames", json!({})).await
    }

    async fn model_names(&self) -> Result<Vec<String>, ExporterError> {
        self.call("modelNames", json!({})).await
    }

    async fn model_field_names(&self, model_name: &str) -> Result<Vec<String>, ExporterError> {
        self.call("modelFieldNames", json!({ "modelName": model_name })).await
    }

    /// Returns the new note id
    async fn add_note(&self, note: &NoteRequest) -> Result<Option<u64>, ExporterError> {
        self.call("addNote", json!({ "note": note })).await
    }
}

/// Client for a running AnkiConnect add-on
#[derive(Debug, Clone)]
pub struct AnkiConnect {
    client: Client,
    config: ExporterConfig,
}

impl AnkiConnect {
    pub fn new(config: ExporterConfig) -> Self {
        AnkiConnect {
            client: Client::new(),
            config,
        }
    }

    pub fn request<'a>(&self, action: &'a str, params: Value) -> AnkiRequest<'a> {
        AnkiRequest {
            action,
            version: self.config.api_version,
            params: normalize_params(params),
        }
    }
}

impl AnkiApi for AnkiConnect {
    async fn invoke(&self, action: &str, params: Value) -> Result<Value, ExporterError> {
        let request = self.request(action, params);
        log::debug!("AnkiConnect -> {}", action);

        let body: Value = self
            .client
            .post(self.config.endpoint.clone())
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        Ok(body)
    }
}

/// AnkiConnect expects an object for `params`, even when there are none
fn normalize_params(params: Value) -> Value {
    match params {
        Value::Null => Value::Object(Map::new()),
        other => other,
    }
}
