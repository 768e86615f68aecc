//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

use crate::traits::NodeId;

/// Core layer error type
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum EmbedError {
    /// `target` is required when the main view is rendered inline
    #[error("'target' selector is required for mainMode 'inline'")]
    MissingTarget,

    /// The target selector matched nothing in the host document
    #[error("Target container not found: {0}")]
    TargetNotFound(String),

    /// The service URL is not an absolute URL
    #[error("Invalid service URL: {0}")]
    InvalidServiceUrl(String),

    /// Host-provided options could not be deserialized
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Selector syntax rejected by the document
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Node handle does not refer to a live node
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Generic DOM operation failure
    #[error("DOM error: {0}")]
    Dom(String),

    /// Computed styles could not be read from the host page
    #[error("Style unavailable: {0}")]
    StyleUnavailable(String),

    /// The fetch/render transport is not loaded or failed to load
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// A detail trigger was activated without a `data-detail-url`
    #[error("Detail element missing 'data-detail-url' attribute")]
    MissingDetailUrl,

    /// No inline detail container could be found
    #[error("Inline detail container '{0}' not found")]
    DetailContainerNotFound(String),

    /// The container was re-initialized while this session was pending
    #[error("Initialization superseded for container: {0}")]
    Superseded(String),
}

impl EmbedError {
    /// Whether it is expected behavior (host configuration, missing markup, etc.), used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    /// **Please update this method simultaneously when new variants are added.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::MissingDetailUrl
            | Self::DetailContainerNotFound(_)
            | Self::Superseded(_)
            | Self::StyleUnavailable(_) => true,
            Self::MissingTarget
            | Self::TargetNotFound(_)
            | Self::InvalidServiceUrl(_)
            | Self::InvalidOptions(_)
            | Self::InvalidSelector(_)
            | Self::NodeNotFound(_)
            | Self::Dom(_)
            | Self::TransportUnavailable(_) => false,
        }
    }

    /// Whether the error stems from the configuration passed to `init`.
    ///
    /// Configuration errors abort initialization before any boundary exists.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::MissingTarget
                | Self::TargetNotFound(_)
                | Self::InvalidServiceUrl(_)
                | Self::InvalidOptions(_)
        )
    }

    /// Log this error at the level given by [`Self::is_expected`].
    pub fn report(&self, context: &str) {
        if self.is_expected() {
            log::warn!("{context}: {self}");
        } else {
            log::error!("{context}: {self}");
        }
    }
}

/// Core layer Result type alias
pub type EmbedResult<T> = std::result::Result<T, EmbedError>;
