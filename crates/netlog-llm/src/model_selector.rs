// Model selection
// Preferred name first, then the catalog ranked by an ordered preference list.

use netlog_core::config::ModelSettings;
use netlog_core::ConfigurationError;
use serde::Serialize;
use tracing::{info, warn};

use crate::llm_client::{LlmClient, ModelInfo};

/// Capability a model needs to be usable at all.
pub const GENERATE_METHOD: &str = "generateContent";
pub const STREAM_METHOD: &str = "streamGenerateContent";

/// The model every request is sent to. Resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelHandle {
    pub name: String,
    pub supports_streaming: bool,
}

impl ModelHandle {
    /// `None` when the model cannot generate text.
    pub fn from_info(info: &ModelInfo) -> Option<Self> {
        info.supports(GENERATE_METHOD).then(|| Self {
            name: info.name.clone(),
            supports_streaming: info.supports(STREAM_METHOD),
        })
    }
}

/// Pick from a fetched catalog.
///
/// Capable entries only; the first preference substring with a match wins, in
/// preference order, otherwise the first capable entry in catalog order.
pub fn select_model(catalog: &[ModelInfo], preferences: &[String]) -> Option<ModelHandle> {
    let capable: Vec<&ModelInfo> = catalog
        .iter()
        .filter(|m| m.supports(GENERATE_METHOD))
        .collect();

    preferences
        .iter()
        .find_map(|pref| capable.iter().find(|m| m.name.contains(pref.as_str())))
        .or_else(|| capable.first())
        .and_then(|m| ModelHandle::from_info(m))
}

/// Resolve the model for this process.
pub async fn resolve_model(
    client: &dyn LlmClient,
    settings: &ModelSettings,
) -> Result<ModelHandle, ConfigurationError> {
    match client.get_model(&settings.preferred).await {
        Ok(info) => match ModelHandle::from_info(&info) {
            Some(handle) => {
                info!(model = %handle.name, "Preferred model available");
                return Ok(handle);
            }
            None => warn!(model = %settings.preferred, "Preferred model cannot generate text"),
        },
        Err(e) => warn!(model = %settings.preferred, error = %e, "Preferred model unavailable"),
    }

    info!("Falling back to the model catalog");
    let catalog = client
        .list_models()
        .await
        .map_err(|e| ConfigurationError::NoCompatibleModel(format!("catalog query failed: {}", e)))?;

    let handle = select_model(&catalog, &settings.preferences).ok_or_else(|| {
        ConfigurationError::NoCompatibleModel(format!(
            "none of {} catalog entries supports {}",
            catalog.len(),
            GENERATE_METHOD
        ))
    })?;

    info!(model = %handle.name, streaming = handle.supports_streaming, "Model selected from catalog");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_capable_entry() {
        let catalog = vec![ModelInfo::new("gemini-1.5-pro", &[GENERATE_METHOD])];
        let handle = select_model(&catalog, &prefs(&["gemini-2.5-flash"])).unwrap();
        assert_eq!(handle.name, "gemini-1.5-pro");
        assert!(!handle.supports_streaming);
    }

    #[test]
    fn test_preference_order_beats_catalog_order() {
        let catalog = vec![
            ModelInfo::new("gemini-1.5-pro", &[GENERATE_METHOD]),
            ModelInfo::new("gemini-2.5-pro", &[GENERATE_METHOD, STREAM_METHOD]),
            ModelInfo::new("gemini-2.5-flash", &[GENERATE_METHOD, STREAM_METHOD]),
        ];
        let handle = select_model(&catalog, &prefs(&["2.5-flash", "2.5-pro"])).unwrap();
        assert_eq!(handle.name, "gemini-2.5-flash");
        assert!(handle.supports_streaming);
    }

    #[test]
    fn test_incapable_entries_ignored() {
        let catalog = vec![
            ModelInfo::new("gemini-2.5-flash-embed", &["embedContent"]),
            ModelInfo::new("aqa", &[GENERATE_METHOD]),
        ];
        let handle = select_model(&catalog, &prefs(&["gemini-2.5-flash"])).unwrap();
        assert_eq!(handle.name, "aqa");
    }

    #[test]
    fn test_no_capable_entries() {
        let catalog = vec![ModelInfo::new("text-embedding-004", &["embedContent"])];
        assert!(select_model(&catalog, &prefs(&["gemini"])).is_none());
        assert!(select_model(&[], &prefs(&["gemini"])).is_none());
    }
}
