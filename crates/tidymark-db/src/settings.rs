//! User settings persisted under the individual settings keys.

use std::sync::Arc;

use serde_json::{json, Value as JsonValue};
use tracing::debug;

use tidymark_core::defaults::{
    KEY_API_KEY, KEY_AUTO_CLASSIFY, KEY_BASE_URL, KEY_LAST_SYNC, KEY_MODEL,
};
use tidymark_core::logging::SUBSYSTEM_DB;
use tidymark_core::{now_millis, Error, KeyValueStore, Result, Settings};

/// Loads and saves [`Settings`]. Missing keys fall back to the defaults.
#[derive(Clone)]
pub struct SettingsStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn load(&self) -> Result<Settings> {
        let defaults = Settings::default();

        let api_key = self.get_string(KEY_API_KEY).await?.filter(|k| !k.is_empty());
        let model = self
            .get_string(KEY_MODEL)
            .await?
            .filter(|m| !m.is_empty())
            .unwrap_or(defaults.model);
        let base_url = self
            .get_string(KEY_BASE_URL)
            .await?
            .filter(|u| !u.is_empty())
            .unwrap_or(defaults.base_url);
        let auto_classify = match self.get(KEY_AUTO_CLASSIFY).await? {
            Some(JsonValue::Bool(b)) => b,
            _ => defaults.auto_classify,
        };
        let last_sync = self.get(KEY_LAST_SYNC).await?.and_then(|v| v.as_i64());

        Ok(Settings {
            api_key,
            model,
            base_url,
            auto_classify,
            last_sync,
        })
    }

    pub async fn save(&self, settings: &Settings) -> Result<()> {
        match &settings.api_key {
            Some(key) => self.set(KEY_API_KEY, json!(key)).await?,
            None => self.remove(KEY_API_KEY).await?,
        }
        self.set(KEY_MODEL, json!(settings.model)).await?;
        self.set(KEY_BASE_URL, json!(settings.base_url)).await?;
        self.set(KEY_AUTO_CLASSIFY, json!(settings.auto_classify)).await?;
        match settings.last_sync {
            Some(at) => self.set(KEY_LAST_SYNC, json!(at)).await?,
            None => self.remove(KEY_LAST_SYNC).await?,
        }

        debug!(
            subsystem = SUBSYSTEM_DB,
            component = "settings_store",
            op = "save",
            model = %settings.model,
            has_api_key = settings.has_api_key(),
            "Settings saved"
        );
        Ok(())
    }

    /// Record the current time as the last sync and return it.
    pub async fn touch_last_sync(&self) -> Result<i64> {
        let now = now_millis();
        self.set(KEY_LAST_SYNC, json!(now)).await?;
        Ok(now)
    }

    async fn get(&self, key: &str) -> Result<Option<JsonValue>> {
        self.kv.get(key).await.map_err(unavailable)
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .get(key)
            .await?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    async fn set(&self, key: &str, value: JsonValue) -> Result<()> {
        self.kv.set(key, value).await.map_err(unavailable)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.kv.remove(key).await.map_err(unavailable)
    }
}

fn unavailable(e: Error) -> Error {
    match e {
        Error::StoreUnavailable(msg) => Error::StoreUnavailable(msg),
        other => Error::StoreUnavailable(other.to_string()),
    }
}
