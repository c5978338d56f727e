use std::collections::HashSet;
use std::path::Path;

use qcsheet_net::DEFAULT_MAX_BODY_BYTES;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::classify::Classifier;
use crate::request::{Response, ResponseKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("version must not be empty")]
    EmptyVersion,
    #[error("`{0}` is listed as both network-first and cache-first")]
    OverlappingPolicies(String),
    #[error("maxBodyBytes must be greater than zero")]
    ZeroBodyLimit,
}

/// Response served when neither the network nor the cache can answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OfflineTemplate {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl Default for OfflineTemplate {
    fn default() -> Self {
        Self {
            status: 503,
            content_type: "text/html; charset=utf-8".to_string(),
            body: concat!(
                "<!DOCTYPE html>\n",
                "<html lang=\"zh-CN\"><head><meta charset=\"utf-8\"><title>离线</title></head>\n",
                "<body><h1>当前处于离线状态</h1><p>请检查网络连接后重试。</p></body></html>\n",
            )
            .to_string(),
        }
    }
}

impl OfflineTemplate {
    pub fn to_response(&self) -> Response {
        Response::new(self.status, ResponseKind::Default, self.body.as_bytes())
            .with_header("Content-Type", self.content_type.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ControllerConfig {
    pub cache_prefix: String,
    /// Bumping this is the only way to invalidate cached resources.
    pub version: String,
    /// Base URL of the app; precache entries are resolved against it.
    pub scope: Url,
    /// Path treated as the app's entry page. Defaults to the scope's path.
    pub root_path: Option<String>,
    pub network_first_files: Vec<String>,
    pub cache_first_files: Vec<String>,
    /// Resources fetched and stored at install time.
    pub precache: Vec<String>,
    pub offline: OfflineTemplate,
    pub max_body_bytes: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let precache: Vec<String> = [
            "icon/icon_192.png",
            "icon/icon_512.png",
            "css/purecss-3.0.0-min.css",
            "js/xlsx-0.20.3.full.min.js",
            "js/crypto-js-4.1.1.min.js",
        ]
        .map(String::from)
        .to_vec();

        Self {
            cache_prefix: "uipc-pwa-cache".to_string(),
            version: "v1".to_string(),
            scope: Url::parse("http://localhost/").expect("static scope url is valid"),
            root_path: None,
            network_first_files: [
                "index.html",
                "upload.html",
                "manifest.json",
                "app.js",
                "js/index.js",
                "js/excel_search.js",
                "js/upload.js",
            ]
            .map(String::from)
            .to_vec(),
            cache_first_files: [
                "icon_192.png",
                "icon_512.png",
                "purecss-3.0.0-min.css",
                "xlsx-0.20.3.full.min.js",
                "crypto-js-4.1.1.min.js",
            ]
            .map(String::from)
            .to_vec(),
            precache,
            offline: OfflineTemplate::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ControllerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(ConfigError::EmptyVersion);
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::ZeroBodyLimit);
        }
        let network_first: HashSet<&str> =
            self.network_first_files.iter().map(String::as_str).collect();
        if let Some(entry) = self
            .cache_first_files
            .iter()
            .find(|entry| network_first.contains(entry.as_str()))
        {
            return Err(ConfigError::OverlappingPolicies(entry.clone()));
        }
        Ok(())
    }

    /// Name of the current cache namespace, e.g. `uipc-pwa-cache-v1`.
    pub fn namespace(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.version)
    }

    pub fn classifier(&self) -> Classifier {
        let root_path = self
            .root_path
            .clone()
            .unwrap_or_else(|| self.scope.path().to_string());
        Classifier::new(
            root_path,
            self.network_first_files.clone(),
            self.cache_first_files.clone(),
        )
    }
}
