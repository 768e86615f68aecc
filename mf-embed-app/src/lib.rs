//! Platform-agnostic embedder bootstrap for the mf-embed micro-frontend loader.
//!
//! Provides `Embedder` (page-level service container and `init` entry point),
//! `EmbedderBuilder` (adapter injection) and `TransportLoader` (platform-specific
//! loading of the fetch/render library).

mod extensions;

pub use extensions::ExtensionRegistry;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use mf_embed_core::error::{EmbedError, EmbedResult};
use mf_embed_core::services::{
    BoundaryManager, ConfigResolver, IsolationBoundary, KeywordService, MarkupRules,
    NormalizationService, PresentationController, ServiceContext, ThemeService,
    TransportBridge,
};
use mf_embed_core::traits::{HostDocument, NodeId, Transport};
use mf_embed_core::types::markup::EMBED_ROOT_ID;
use mf_embed_core::types::{EmbedConfig, EmbedOptions, EmbedSession};

/// Platform-specific loading of the transport library.
///
/// Browsers inject a script tag and resolve once it has loaded. Use
/// `PreloadedTransport` when the library is already on the page.
#[async_trait::async_trait(?Send)]
pub trait TransportLoader {
    /// Make the transport available. Called until it succeeds once.
    async fn load(&self) -> EmbedResult<()>;
}

/// Loader for pages that ship the transport themselves.
pub struct PreloadedTransport;

#[async_trait::async_trait(?Send)]
impl TransportLoader for PreloadedTransport {
    async fn load(&self) -> EmbedResult<()> {
        Ok(())
    }
}

/// Page-level embedder.
///
/// Holds the services and the `ServiceContext`. Hosts construct one per page
/// via `EmbedderBuilder` and call [`Embedder::init`] for every widget.
pub struct Embedder {
    /// Service context (holds the document and transport adapters)
    pub ctx: Rc<ServiceContext>,
    /// Isolation boundary manager
    pub boundaries: BoundaryManager,
    loader: Rc<dyn TransportLoader>,
    transport_ready: tokio::sync::OnceCell<()>,
    extensions: Rc<ExtensionRegistry>,
    sessions: RefCell<HashMap<NodeId, EmbedSession>>,
}

impl Embedder {
    /// Initialize one embedding session.
    ///
    /// Sequence: resolve configuration, create the isolation boundary, detect
    /// the keyword, wait for the transport, capture the theme, mount the
    /// presentation and install the normalization observers.
    ///
    /// Configuration errors abort before any boundary exists. Later failures
    /// tear the new boundary down again before they are returned. An
    /// unavailable transport is logged and the session still mounts. If the
    /// container is re-initialized or destroyed while this call waits for the
    /// transport, it returns `EmbedError::Superseded`.
    pub async fn init(&self, options: EmbedOptions) -> EmbedResult<EmbedSession> {
        let config = ConfigResolver::resolve(&options)?;
        let container = self.boundaries.locate_container(&config)?;
        self.sessions.borrow_mut().remove(&container);
        let boundary = self.boundaries.create(container)?;

        let session = match self.mount(&config, &boundary).await {
            Ok(session) => session,
            Err(e) => {
                self.discard_boundary(&boundary);
                return Err(e);
            }
        };

        log::info!(
            "Embed session ready on {container}: {} ({:?})",
            session.content_url,
            session.mode
        );
        self.sessions
            .borrow_mut()
            .insert(container, session.clone());
        Ok(session)
    }

    async fn mount(
        &self,
        config: &EmbedConfig,
        boundary: &Rc<IsolationBoundary>,
    ) -> EmbedResult<EmbedSession> {
        let keyword = KeywordService::new(Rc::clone(&self.ctx)).detect(config);

        self.wait_for_transport().await;
        if !boundary.is_active() {
            return Err(EmbedError::Superseded(boundary.container().to_string()));
        }
        self.install_extensions();

        let theme = ThemeService::new(Rc::clone(&self.ctx)).snapshot(config);
        let session = PresentationController::new(Rc::clone(&self.ctx))
            .mount(boundary, config, &keyword, &theme)?;
        let observers = NormalizationService::new(Rc::clone(&self.ctx))
            .install(boundary.root(), &MarkupRules::new(config, session.detail_pane))?;
        boundary.track_observers(observers);
        Ok(session)
    }

    /// Tear down a boundary whose initialization failed, unless another
    /// initialization already replaced it
    fn discard_boundary(&self, boundary: &Rc<IsolationBoundary>) {
        let container = boundary.container();
        let current = self
            .boundaries
            .active(container)
            .is_some_and(|active| Rc::ptr_eq(&active, boundary));
        if !current {
            return;
        }
        if let Err(e) = self.boundaries.teardown(container) {
            e.report("Discarding partial boundary failed");
        }
    }

    /// Initialize from the JSON form of the host options object
    pub async fn init_json(&self, json: &str) -> EmbedResult<EmbedSession> {
        let options = EmbedOptions::from_json(json)?;
        self.init(options).await
    }

    /// Tear down the session on `target` (or on the modal anchor when `None`).
    ///
    /// Returns `false` when nothing was mounted there.
    pub fn destroy(&self, target: Option<&str>) -> EmbedResult<bool> {
        let document = self.ctx.document();
        let selector = match target.map(str::trim).filter(|t| !t.is_empty()) {
            Some(target) => target.to_string(),
            None => format!("#{EMBED_ROOT_ID}"),
        };
        let Some(container) = document.query_document(&selector)? else {
            return Ok(false);
        };
        self.sessions.borrow_mut().remove(&container);
        self.boundaries.teardown(container)
    }

    /// Tear down every session of this embedder
    pub fn destroy_all(&self) -> EmbedResult<usize> {
        self.sessions.borrow_mut().clear();
        self.boundaries.teardown_all()
    }

    /// Session currently mounted on `container`
    #[must_use]
    pub fn session(&self, container: NodeId) -> Option<EmbedSession> {
        self.sessions.borrow().get(&container).cloned()
    }

    /// Sessions currently mounted
    #[must_use]
    pub fn sessions(&self) -> Vec<EmbedSession> {
        self.sessions.borrow().values().cloned().collect()
    }

    #[must_use]
    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    /// Wait for the single in-flight transport load; failures are logged
    async fn wait_for_transport(&self) {
        if let Err(e) = self
            .transport_ready
            .get_or_try_init(|| self.loader.load())
            .await
        {
            e.report("Transport failed to load");
        }
    }

    fn install_extensions(&self) {
        let transport = self.ctx.transport();
        if !transport.is_available() {
            return;
        }
        let bridge = TransportBridge::new(Rc::clone(&self.ctx));
        if let Err(e) = self
            .extensions
            .ensure_installed(transport, || bridge.shadow_parts_extension())
        {
            e.report("Transport extension registration failed");
        }
    }
}

/// Builder for constructing `Embedder` with platform-specific adapters.
///
/// # Required adapters
/// - `document`: the host page
/// - `transport`: the fetch/render library
///
/// # Optional
/// - `loader`: defaults to `PreloadedTransport`
/// - `extension_registry`: defaults to a registry owned by this embedder
pub struct EmbedderBuilder {
    document: Option<Rc<dyn HostDocument>>,
    transport: Option<Rc<dyn Transport>>,
    loader: Option<Rc<dyn TransportLoader>>,
    extensions: Option<Rc<ExtensionRegistry>>,
}

impl EmbedderBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            document: None,
            transport: None,
            loader: None,
            extensions: None,
        }
    }

    #[must_use]
    pub fn document(mut self, document: Rc<dyn HostDocument>) -> Self {
        self.document = Some(document);
        self
    }

    #[must_use]
    pub fn transport(mut self, transport: Rc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn loader(mut self, loader: Rc<dyn TransportLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    #[must_use]
    pub fn extension_registry(mut self, registry: Rc<ExtensionRegistry>) -> Self {
        self.extensions = Some(registry);
        self
    }

    /// Build the `Embedder`.
    ///
    /// # Errors
    /// Returns `EmbedError::InvalidOptions` if required adapters are missing.
    pub fn build(self) -> EmbedResult<Embedder> {
        let document = self
            .document
            .ok_or_else(|| EmbedError::InvalidOptions("document is required".to_string()))?;
        let transport = self
            .transport
            .ok_or_else(|| EmbedError::InvalidOptions("transport is required".to_string()))?;
        let loader = self
            .loader
            .unwrap_or_else(|| Rc::new(PreloadedTransport));
        let extensions = self.extensions.unwrap_or_default();

        let ctx = Rc::new(ServiceContext::new(document, transport));
        Ok(Embedder {
            boundaries: BoundaryManager::new(Rc::clone(&ctx)),
            ctx,
            loader,
            transport_ready: tokio::sync::OnceCell::new(),
            extensions,
            sessions: RefCell::new(HashMap::new()),
        })
    }
}

impl Default for EmbedderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
