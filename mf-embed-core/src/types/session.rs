//! Per-initialization session types

use serde::Serialize;

use crate::traits::NodeId;
use crate::utils::url::append_query_param;

use super::presentation::PresentationMode;
use super::theme::ThemeSnapshot;

/// Keyword folded into every outgoing content URL of a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Keyword(Option<String>);

impl Keyword {
    /// Build a keyword; blank values mean "no keyword"
    #[must_use]
    pub fn new(value: Option<String>) -> Self {
        Self(
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        )
    }

    #[must_use]
    pub fn none() -> Self {
        Self(None)
    }

    #[must_use]
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.0.is_some()
    }

    /// Append `param=<encoded keyword>` to `url`; returns `url` unchanged without a keyword
    #[must_use]
    pub fn apply(&self, url: &str, param: &str) -> String {
        match &self.0 {
            Some(keyword) => append_query_param(url, param, keyword),
            None => url.to_string(),
        }
    }
}

/// Summary of a mounted embedding session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedSession {
    /// Host element owning the isolation boundary
    pub container: NodeId,
    /// Encapsulated root attached to the container
    pub root: NodeId,
    /// Internal wrapper, sole child of the root
    pub wrapper: NodeId,
    /// Element the main content is loaded into
    pub main_mount: NodeId,
    /// Overlay hosting the main view (modal main mode only)
    pub main_overlay: Option<NodeId>,
    /// Detail pane next to the main view (split layout only)
    pub detail_pane: Option<NodeId>,
    pub mode: PresentationMode,
    pub keyword: Keyword,
    /// Service URL with the keyword folded in
    pub content_url: String,
    pub theme: ThemeSnapshot,
}
