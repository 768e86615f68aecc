//! 嵌入引擎服务层

mod boundary_service;
mod config_resolver;
mod keyword_service;
mod normalization_service;
mod presentation_service;
mod theme_service;
mod transport_bridge;

pub use boundary_service::{BoundaryManager, IsolationBoundary};
pub use config_resolver::{default_css_map, default_style_selectors, ConfigResolver};
pub use keyword_service::KeywordService;
pub use normalization_service::{
    adapt_detail_markup, qualify_urls, truncate_descriptions, MarkupRules, NormalizationService,
};
pub use presentation_service::PresentationController;
pub use theme_service::{resolve_theme, style_source, ThemeService};
pub use transport_bridge::{rewrite_part_target, TransportBridge};

use std::rc::Rc;

use crate::traits::{HostDocument, Transport};

/// Service context - holds all platform dependencies
///
/// The platform layer creates this context and injects its document and
/// transport implementations.
pub struct ServiceContext {
    /// Host page document
    pub document: Rc<dyn HostDocument>,
    /// Fetch/render transport
    pub transport: Rc<dyn Transport>,
}

impl ServiceContext {
    #[must_use]
    pub fn new(document: Rc<dyn HostDocument>, transport: Rc<dyn Transport>) -> Self {
        Self {
            document,
            transport,
        }
    }

    #[must_use]
    pub fn document(&self) -> &dyn HostDocument {
        self.document.as_ref()
    }

    #[must_use]
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }
}
