/// Fixed settings for talking to AnkiConnect and persisting popup choices

use crate::error::ExporterError;
use crate::settings::KeyValueStore;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8765";
pub const API_VERSION: u8 = 6;
pub const SETTINGS_KEY: &str = "ankiExporterSettings";
pub const ENDPOINT_KEY: &str = "ankiExporterEndpoint";
pub const DEFAULT_TAG: &str = "test-english";

#[derive(Debug, Clone, PartialEq)]
pub struct ExporterConfig {
    pub endpoint: Url,
    pub api_version: u8,
    pub settings_key: String,
    pub tags: Vec<String>,
    pub allow_duplicate: bool,
}

impl ExporterConfig {
    /// Defaults, with the endpoint replaced by a stored override when it is valid
    pub fn load<S: KeyValueStore>(store: &S) -> Self {
        let config = ExporterConfig::default();

        let endpoint = match store.get(ENDPOINT_KEY) {
            Ok(Some(endpoint)) if !endpoint.trim().is_empty() => endpoint,
            Ok(_) => return config,
            Err(e) => {
                log::warn!("Could not read endpoint override: {}", e);
                return config;
            }
        };

        match config.clone().with_endpoint(endpoint.trim()) {
            Ok(overridden) => {
                log::info!("Using AnkiConnect endpoint {}", overridden.endpoint);
                overridden
            }
            Err(e) => {
                log::warn!("{}", e);
                config
            }
        }
    }

    /// Point the client at a different AnkiConnect listener
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, ExporterError> {
        let url = Url::parse(endpoint)
            .map_err(|e| ExporterError::Config(format!("{}: {}", endpoint, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ExporterError::Config(format!(
                "{}: unsupported scheme '{}'",
                endpoint,
                url.scheme()
            )));
        }

        self.endpoint = url;
        Ok(self)
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        ExporterConfig {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint parses"),
            api_version: API_VERSION,
            settings_key: SETTINGS_KEY.to_string(),
            tags: vec![DEFAULT_TAG.to_string()],
            allow_duplicate: false,
        }
    }
}
