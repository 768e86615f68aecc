//! Configuration resolution
//!
//! Merges user options with defaults. Pure and synchronous: no DOM access.

use std::collections::BTreeMap;

use url::Url;

use crate::error::{EmbedError, EmbedResult};
use crate::types::{
    EmbedConfig, EmbedOptions, MainMode, ThemeFallbackOptions, ThemeFallbacks,
    DEFAULT_DESCRIPTION_MAX_LENGTH, DEFAULT_KEYWORD_PARAM, DEFAULT_SERVICE_URL,
};
use crate::utils::color::{is_safe_css_value, is_valid_color, is_valid_custom_property};
use crate::utils::url::origin_of;

/// Default role -> host selector table
#[must_use]
pub fn default_style_selectors() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("body".to_string(), "body".to_string()),
        ("button".to_string(), "button, [type=\"button\"]".to_string()),
    ])
}

/// Default theme property -> CSS custom property table
#[must_use]
pub fn default_css_map() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("fontFamily".to_string(), "--mf-font-family".to_string()),
        ("color".to_string(), "--mf-text-color".to_string()),
        ("buttonColor".to_string(), "--mf-button-text".to_string()),
        ("buttonBg".to_string(), "--mf-button-bg".to_string()),
    ])
}

/// Config resolver
pub struct ConfigResolver;

impl ConfigResolver {
    /// Resolve user options into an immutable configuration
    pub fn resolve(options: &EmbedOptions) -> EmbedResult<EmbedConfig> {
        let main_mode = options.main_mode.unwrap_or_default();
        let detail_mode = options.detail_mode.unwrap_or_default();

        let target = non_empty(options.target.as_deref());
        if main_mode == MainMode::Inline && target.is_none() {
            return Err(EmbedError::MissingTarget);
        }

        let raw_url = non_empty(options.service_url.as_deref()).unwrap_or(DEFAULT_SERVICE_URL);
        let service_url = Url::parse(raw_url)
            .map_err(|e| EmbedError::InvalidServiceUrl(format!("{raw_url}: {e}")))?;
        if !service_url.origin().is_tuple() {
            return Err(EmbedError::InvalidServiceUrl(format!(
                "{raw_url}: no usable origin"
            )));
        }
        let origin = origin_of(&service_url);

        let context_terms = options
            .context_terms
            .iter()
            .flatten()
            .filter_map(|term| non_empty(Some(term)))
            .map(str::to_string)
            .collect();

        Ok(EmbedConfig {
            main_mode,
            main_mode_display: options.main_mode_display.unwrap_or_default(),
            detail_mode,
            target: target.map(str::to_string),
            service_url,
            origin,
            default_keyword: non_empty(options.default_keyword.as_deref())
                .unwrap_or_default()
                .to_string(),
            keyword_param: non_empty(options.keyword_param.as_deref())
                .unwrap_or(DEFAULT_KEYWORD_PARAM)
                .to_string(),
            context_terms,
            style_selectors: merge_table(default_style_selectors(), options.style_selectors.as_ref()),
            css_map: merge_css_map(options.css_map.as_ref()),
            fallback_theme: resolve_fallbacks(options.fallback_theme.as_ref()),
            description_max_length: options
                .description_max_length
                .filter(|max| *max > 0)
                .unwrap_or(DEFAULT_DESCRIPTION_MAX_LENGTH),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// User entries override defaults per key; blank keys or values are ignored
fn merge_table(
    mut defaults: BTreeMap<String, String>,
    overrides: Option<&BTreeMap<String, String>>,
) -> BTreeMap<String, String> {
    for (key, value) in overrides.into_iter().flatten() {
        if let (Some(key), Some(value)) = (non_empty(Some(key)), non_empty(Some(value))) {
            defaults.insert(key.to_string(), value.to_string());
        }
    }
    defaults
}

/// Like [`merge_table`], but variable names that are not custom properties are dropped
fn merge_css_map(overrides: Option<&BTreeMap<String, String>>) -> BTreeMap<String, String> {
    let valid: BTreeMap<String, String> = overrides
        .into_iter()
        .flatten()
        .filter(|(property, variable)| {
            let ok = is_valid_custom_property(variable.trim());
            if !ok {
                log::warn!("Ignoring cssMap entry {property}={variable:?}: not a custom property name");
            }
            ok
        })
        .map(|(property, variable)| (property.clone(), variable.clone()))
        .collect();
    merge_table(default_css_map(), Some(&valid))
}

fn resolve_fallbacks(options: Option<&ThemeFallbackOptions>) -> ThemeFallbacks {
    let mut fallbacks = ThemeFallbacks::default();
    let Some(options) = options else {
        return fallbacks;
    };

    let colors = [
        ("color", &options.color, &mut fallbacks.color),
        ("buttonColor", &options.button_color, &mut fallbacks.button_color),
        ("buttonBg", &options.button_bg, &mut fallbacks.button_bg),
    ];
    for (name, value, slot) in colors {
        match non_empty(value.as_deref()) {
            Some(v) if is_valid_color(v) => *slot = v.to_string(),
            Some(v) => log::warn!("Ignoring invalid fallback color {name}={v:?}"),
            None => {}
        }
    }

    match non_empty(options.font_family.as_deref()) {
        Some(v) if is_safe_css_value(v) => fallbacks.font_family = v.to_string(),
        Some(v) => log::warn!("Ignoring unsafe fallback fontFamily {v:?}"),
        None => {}
    }

    fallbacks
}
