/// Error type shared by the API client, settings store, scraper and popup

use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("Failed to connect to Anki API: {0}")]
    Connection(String),

    #[error("Anki API error: {0}")]
    Api(String),

    #[error("Unexpected response to '{action}': {detail}")]
    UnexpectedResponse { action: String, detail: String },

    #[error("No questions found")]
    NoQuestions,

    #[error("Select a {0} before adding cards")]
    IncompleteSelection(&'static str),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Added {added} of {total} cards before failure: {source}")]
    ExportAborted {
        added: usize,
        total: usize,
        #[source]
        source: Box<ExporterError>,
    },
}

impl ExporterError {
    /// Wrap a rejected JS promise or thrown value from the bridge or the DOM
    pub fn browser(value: JsValue) -> Self {
        ExporterError::Browser(describe_js(&value))
    }

    pub fn storage(value: JsValue) -> Self {
        ExporterError::Storage(describe_js(&value))
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, ExporterError::Connection(_))
    }
}

impl From<reqwest::Error> for ExporterError {
    fn from(error: reqwest::Error) -> Self {
        ExporterError::Connection(error.to_string())
    }
}

fn describe_js(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    js_sys::JSON::stringify(value)
        .ok()
        .and_then(|s| s.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}
