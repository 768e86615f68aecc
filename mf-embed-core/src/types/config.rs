//! Configuration type definitions

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{EmbedError, EmbedResult};

use super::markup::COURSE_LIST_CLASS_PREFIX;
use super::presentation::PresentationMode;

/// Default content service endpoint
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8080/search";

/// Default query parameter carrying the keyword
pub const DEFAULT_KEYWORD_PARAM: &str = "keyword";

/// Default maximum length of a card description before truncation
pub const DEFAULT_DESCRIPTION_MAX_LENGTH: usize = 75;

/// Role whose computed style backs role-less theme properties (`fontFamily`, `color`)
pub const DEFAULT_STYLE_ROLE: &str = "body";

/// How the main view is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MainMode {
    /// Rendered inside the target container
    #[default]
    Inline,
    /// Rendered in an overlay appended to the host body
    Modal,
}

/// How detail views are presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DetailMode {
    /// Loaded into the `#mf-detail-container` element
    Inline,
    /// Opened in a new overlay
    #[default]
    Modal,
    /// Two-pane layout with the detail pane shown next to the list
    #[serde(alias = "inline-on-modal")]
    InlineOnModal,
}

/// Layout of the course list in the main view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MainModeDisplay {
    #[default]
    Grid,
    List,
    Scrollable,
}

impl MainModeDisplay {
    /// Modifier class put on `#mf-course-list`; the split layout always scrolls vertically
    #[must_use]
    pub fn list_class(self, split: bool) -> String {
        if split {
            format!("{COURSE_LIST_CLASS_PREFIX}scrollable-vertical")
        } else {
            format!("{COURSE_LIST_CLASS_PREFIX}{self}")
        }
    }
}

impl fmt::Display for MainModeDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid => write!(f, "grid"),
            Self::List => write!(f, "list"),
            Self::Scrollable => write!(f, "scrollable"),
        }
    }
}

impl fmt::Display for MainMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline => write!(f, "inline"),
            Self::Modal => write!(f, "modal"),
        }
    }
}

impl fmt::Display for DetailMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline => write!(f, "inline"),
            Self::Modal => write!(f, "modal"),
            Self::InlineOnModal => write!(f, "inlineOnModal"),
        }
    }
}

/// User-supplied fallback theme values (all optional)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeFallbackOptions {
    pub font_family: Option<String>,
    pub color: Option<String>,
    pub button_color: Option<String>,
    pub button_bg: Option<String>,
}

/// Values used whenever a theme property cannot be derived from the host page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeFallbacks {
    pub font_family: String,
    pub color: String,
    pub button_color: String,
    pub button_bg: String,
}

impl Default for ThemeFallbacks {
    fn default() -> Self {
        Self {
            font_family: "system-ui, sans-serif".to_string(),
            color: "#333".to_string(),
            button_color: "#fff".to_string(),
            button_bg: "#0066cc".to_string(),
        }
    }
}

impl ThemeFallbacks {
    /// Look up the fallback for a theme property key (`fontFamily`, `color`, `buttonColor`, `buttonBg`)
    #[must_use]
    pub fn get(&self, property: &str) -> Option<&str> {
        match property {
            "fontFamily" => Some(&self.font_family),
            "color" => Some(&self.color),
            "buttonColor" => Some(&self.button_color),
            "buttonBg" => Some(&self.button_bg),
            _ => None,
        }
    }
}

/// Options passed to `init`.
///
/// Every field is optional; missing values are filled in by
/// [`crate::services::ConfigResolver`]. Field names follow the camelCase
/// names used by host pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbedOptions {
    pub main_mode: Option<MainMode>,
    pub main_mode_display: Option<MainModeDisplay>,
    pub detail_mode: Option<DetailMode>,
    /// CSS selector of the container (required for inline main mode)
    pub target: Option<String>,
    pub service_url: Option<String>,
    pub default_keyword: Option<String>,
    /// Query parameter name used for the keyword
    pub keyword_param: Option<String>,
    /// Terms searched for in the host body text when no meta keyword exists
    pub context_terms: Option<Vec<String>>,
    /// role -> selector
    pub style_selectors: Option<BTreeMap<String, String>>,
    /// theme property -> CSS custom property name
    pub css_map: Option<BTreeMap<String, String>>,
    pub fallback_theme: Option<ThemeFallbackOptions>,
    pub description_max_length: Option<usize>,
}

impl EmbedOptions {
    /// Parse options from the JSON form of the host configuration object
    pub fn from_json(json: &str) -> EmbedResult<Self> {
        serde_json::from_str(json).map_err(|e| EmbedError::InvalidOptions(e.to_string()))
    }
}

/// Fully resolved configuration.
///
/// Created once per `init` call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedConfig {
    pub main_mode: MainMode,
    pub main_mode_display: MainModeDisplay,
    pub detail_mode: DetailMode,
    pub target: Option<String>,
    pub service_url: Url,
    /// ASCII serialization of the service URL origin, e.g. `http://localhost:8080`
    pub origin: String,
    pub default_keyword: String,
    pub keyword_param: String,
    pub context_terms: Vec<String>,
    pub style_selectors: BTreeMap<String, String>,
    pub css_map: BTreeMap<String, String>,
    pub fallback_theme: ThemeFallbacks,
    pub description_max_length: usize,
}

impl EmbedConfig {
    /// Presentation state selected by the two modes
    #[must_use]
    pub fn presentation(&self) -> PresentationMode {
        PresentationMode::select(self.main_mode, self.detail_mode)
    }

    /// URL of the sibling stylesheet served next to the content
    #[must_use]
    pub fn stylesheet_url(&self) -> String {
        format!("{}/static/css/style.css", self.origin)
    }
}
