#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Integration tests for `EmbedderBuilder` and the `Embedder::init` sequence.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use mf_embed_app::{EmbedderBuilder, Embedder, ExtensionRegistry, TransportLoader};
use mf_embed_core::dom::InMemoryDocument;
use mf_embed_core::error::{EmbedError, EmbedResult};
use mf_embed_core::services::{qualify_urls, truncate_descriptions};
use mf_embed_core::traits::{HostDocument, NodeId, ProcessOptions, Transport, TransportExtension};
use mf_embed_core::types::{ComputedStyle, EmbedOptions, MainMode, PresentationMode};

const ORIGIN: &str = "http://localhost:8080";

// ===== Mock Implementations =====

/// Transport that records processed nodes.
struct MockTransport {
    available: Cell<bool>,
    processed: RefCell<Vec<(NodeId, NodeId)>>,
    released: RefCell<Vec<NodeId>>,
    extensions: RefCell<Vec<String>>,
}

impl MockTransport {
    fn new() -> Self {
        Self {
            available: Cell::new(true),
            processed: RefCell::new(Vec::new()),
            released: RefCell::new(Vec::new()),
            extensions: RefCell::new(Vec::new()),
        }
    }
}

impl Transport for MockTransport {
    fn is_available(&self) -> bool {
        self.available.get()
    }

    fn process(&self, node: NodeId, options: ProcessOptions) -> EmbedResult<()> {
        self.processed.borrow_mut().push((node, options.root));
        Ok(())
    }

    fn define_extension(&self, extension: TransportExtension) -> EmbedResult<()> {
        self.extensions.borrow_mut().push(extension.name);
        Ok(())
    }

    fn release(&self, node: NodeId) {
        self.released.borrow_mut().push(node);
    }
}

/// Loader that suspends once per call and can fail its first attempt.
struct CountingLoader {
    calls: Cell<usize>,
    fail_first: Cell<bool>,
}

impl CountingLoader {
    fn new() -> Self {
        Self {
            calls: Cell::new(0),
            fail_first: Cell::new(false),
        }
    }

    fn failing_once(self) -> Self {
        self.fail_first.set(true);
        self
    }
}

#[async_trait(?Send)]
impl TransportLoader for CountingLoader {
    async fn load(&self) -> EmbedResult<()> {
        self.calls.set(self.calls.get() + 1);
        tokio::task::yield_now().await;
        if self.fail_first.replace(false) {
            return Err(EmbedError::TransportUnavailable("script 404".to_string()));
        }
        Ok(())
    }
}

// ===== Fixture =====

struct Page {
    doc: Rc<InMemoryDocument>,
    transport: Rc<MockTransport>,
    embedder: Embedder,
    app: NodeId,
}

fn page_with(loader: Option<Rc<dyn TransportLoader>>) -> Page {
    let doc = Rc::new(InMemoryDocument::new());
    let app = doc
        .append_element(doc.body(), "div", &[("id", "app")])
        .unwrap();
    let transport = Rc::new(MockTransport::new());
    let mut builder = EmbedderBuilder::new()
        .document(doc.clone())
        .transport(transport.clone());
    if let Some(loader) = loader {
        builder = builder.loader(loader);
    }
    Page {
        doc,
        transport,
        embedder: builder.build().unwrap(),
        app,
    }
}

fn page() -> Page {
    page_with(None)
}

fn options(json: &str) -> EmbedOptions {
    EmbedOptions::from_json(json).unwrap()
}

fn inline_options() -> EmbedOptions {
    options(r##"{"target": "#app"}"##)
}

/// Append a detail trigger and return an element inside it
fn add_trigger(doc: &InMemoryDocument, parent: NodeId, url: &str) -> NodeId {
    let card = doc
        .append_element(parent, "article", &[("class", "mf-detail"), ("data-detail-url", url)])
        .unwrap();
    doc.append_element(card, "h3", &[]).unwrap()
}

// ===== Configuration errors =====

#[tokio::test]
async fn missing_target_leaves_no_boundary() {
    let page = page();

    let result = page.embedder.init(EmbedOptions::default()).await;

    assert_eq!(result.unwrap_err(), EmbedError::MissingTarget);
    assert_eq!(page.embedder.boundaries.active_count(), 0);
    assert_eq!(page.doc.shadow_root(page.app), None);
    assert_eq!(page.doc.observer_count(), 0);
}

#[tokio::test]
async fn unknown_target_is_reported() {
    let page = page();

    let result = page.embedder.init(options(r##"{"target": "#nope"}"##)).await;

    assert_eq!(
        result.unwrap_err(),
        EmbedError::TargetNotFound("#nope".to_string())
    );
    assert_eq!(page.doc.observer_count(), 0);
}

#[tokio::test]
async fn malformed_json_is_invalid_options() {
    let page = page();

    let result = page.embedder.init_json("{\"target\": ").await;

    assert!(matches!(result, Err(EmbedError::InvalidOptions(_))));
}

#[test]
fn builder_requires_adapters() {
    let result = EmbedderBuilder::new()
        .transport(Rc::new(MockTransport::new()))
        .build();
    assert!(matches!(result, Err(EmbedError::InvalidOptions(_))));
}

// ===== Theme =====

#[tokio::test]
async fn invalid_fallback_colors_use_defaults() {
    let page = page();
    page.doc.fail_computed_styles(Some("no styles"));

    let session = page
        .embedder
        .init(options(
            r##"{"target": "#app", "fallbackTheme": {"color": "nope", "buttonBg": "#abc"}}"##,
        ))
        .await
        .unwrap();

    assert!(session.theme.is_fallback);
    assert_eq!(session.theme.value_of("color"), Some("#333"));
    assert_eq!(session.theme.value_of("buttonBg"), Some("#abc"));
    let style = page
        .doc
        .query_within(session.root, "style#mf-theme")
        .unwrap()
        .unwrap();
    assert!(page
        .doc
        .text_content(style)
        .contains("--mf-text-color: #333;"));
}

#[tokio::test]
async fn theme_follows_host_styles() {
    let page = page();
    page.doc
        .set_computed_style(
            page.doc.body(),
            ComputedStyle {
                font_family: "\"Inter\", sans-serif".to_string(),
                color: "rgb(17, 17, 17)".to_string(),
                background_color: String::new(),
            },
        )
        .unwrap();

    let session = page.embedder.init(inline_options()).await.unwrap();

    assert!(!session.theme.is_fallback);
    assert_eq!(
        session.theme.value_of("fontFamily"),
        Some("\"Inter\", sans-serif")
    );
    assert_eq!(session.theme.value_of("color"), Some("rgb(17, 17, 17)"));
    assert_eq!(session.theme.value_of("buttonBg"), Some("#0066cc"));
}

// ===== Boundary lifecycle =====

#[tokio::test]
async fn reinit_keeps_one_boundary_and_one_observer_set() {
    let page = page();

    let first = page.embedder.init(inline_options()).await.unwrap();
    let second = page.embedder.init(inline_options()).await.unwrap();

    assert_ne!(first.root, second.root);
    assert_eq!(page.doc.shadow_root(page.app), Some(second.root));
    assert_eq!(page.doc.children(second.root), vec![second.wrapper]);
    assert_eq!(page.embedder.boundaries.active_count(), 1);
    assert_eq!(page.doc.observer_count(), 3);
    assert_eq!(page.doc.listener_count(), 1);
    assert_eq!(*page.transport.released.borrow(), vec![first.main_mount]);
    assert_eq!(page.embedder.sessions().len(), 1);

    // A single DOM change reaches each pass once.
    page.doc
        .append_element(second.main_mount, "div", &[])
        .unwrap();
    assert_eq!(page.doc.flush_mutations(), 3);
}

#[tokio::test]
async fn destroy_releases_everything() {
    let page = page();
    let session = page
        .embedder
        .init(options(r##"{"target": "#app", "detailMode": "modal"}"##))
        .await
        .unwrap();
    let title = add_trigger(&page.doc, session.main_mount, "/course/1");
    page.doc.click(title).unwrap();
    assert!(page.doc.query_document(".mf-modal-overlay").unwrap().is_some());

    assert!(page.embedder.destroy(Some("#app")).unwrap());

    assert_eq!(page.doc.shadow_root(page.app), None);
    assert!(page.doc.query_document(".mf-modal-overlay").unwrap().is_none());
    assert_eq!(page.doc.observer_count(), 0);
    assert_eq!(page.doc.listener_count(), 0);
    assert_eq!(page.embedder.session(page.app), None);
    assert!(!page.embedder.destroy(Some("#app")).unwrap());
    assert!(!page.embedder.destroy(Some("#elsewhere")).unwrap());
}

#[tokio::test]
async fn modal_main_without_target_uses_anchor() {
    let page = page();

    let session = page
        .embedder
        .init(options(r#"{"mainMode": "modal", "detailMode": "inline"}"#))
        .await
        .unwrap();

    assert_eq!(session.mode, PresentationMode::ModalWithInlineDetail);
    assert_eq!(
        page.doc.get_attribute(session.container, "id").as_deref(),
        Some("mf-embed-root")
    );
    let overlay = session.main_overlay.unwrap();
    assert_eq!(page.doc.parent(overlay), Some(page.doc.body()));
    // Root passes plus the main overlay's passes.
    assert_eq!(page.doc.observer_count(), 6);
    assert_eq!(
        *page.transport.processed.borrow(),
        vec![(session.main_mount, session.root)]
    );

    assert!(page.embedder.destroy(None).unwrap());
    assert_eq!(page.doc.parent(overlay), None);
    assert_eq!(page.doc.observer_count(), 0);
}

// ===== Keyword & content URL =====

#[tokio::test]
async fn meta_keyword_reaches_content_url() {
    let page = page();
    page.doc
        .append_element(
            page.doc.head(),
            "meta",
            &[("name", "mf-keyword"), ("content", "robotics")],
        )
        .unwrap();

    let session = page
        .embedder
        .init(options(
            r##"{"target": "#app", "serviceUrl": "http://localhost:8080/search"}"##,
        ))
        .await
        .unwrap();

    assert_eq!(session.keyword.as_deref(), Some("robotics"));
    assert_eq!(
        session.content_url,
        "http://localhost:8080/search?keyword=robotics"
    );
    assert_eq!(
        page.doc.get_attribute(session.main_mount, "hx-get").as_deref(),
        Some("http://localhost:8080/search?keyword=robotics")
    );
    assert_eq!(
        page.transport.processed.borrow().first(),
        Some(&(session.main_mount, session.root))
    );
}

#[tokio::test]
async fn custom_keyword_param_and_default_keyword() {
    let page = page();

    let session = page
        .embedder
        .init(options(
            r##"{"target": "#app", "defaultKeyword": "data science", "keywordParam": "q"}"##,
        ))
        .await
        .unwrap();

    assert_eq!(
        session.content_url,
        "http://localhost:8080/search?q=data%20science"
    );
}

// ===== Detail modes =====

#[tokio::test]
async fn inline_detail_click_loads_into_container() {
    let page = page();
    page.doc
        .append_element(page.doc.head(), "meta", &[("name", "mf-keyword"), ("content", "ai")])
        .unwrap();
    let session = page
        .embedder
        .init(options(r##"{"target": "#app", "detailMode": "inline"}"##))
        .await
        .unwrap();
    let container = page
        .doc
        .append_element(session.main_mount, "section", &[("id", "mf-detail-container")])
        .unwrap();
    let title = add_trigger(&page.doc, session.main_mount, "/courses/42");

    assert!(page.doc.click(title).unwrap());

    assert_eq!(
        page.doc.get_attribute(container, "hx-get").as_deref(),
        Some("http://localhost:8080/courses/42?keyword=ai")
    );
    assert!(page.doc.query_document(".mf-modal-overlay").unwrap().is_none());
}

#[tokio::test]
async fn modal_detail_click_opens_overlay() {
    let page = page();
    let session = page.embedder.init(inline_options()).await.unwrap();
    let title = add_trigger(&page.doc, session.main_mount, "/courses/42");

    page.doc.click(title).unwrap();

    let overlay = page
        .doc
        .query_document(".mf-modal-overlay")
        .unwrap()
        .unwrap();
    assert_eq!(page.doc.parent(overlay), Some(page.doc.body()));
    let content = page
        .doc
        .query_within(overlay, ".mf-modal-content")
        .unwrap()
        .unwrap();
    let dynamic = page
        .doc
        .query_within(content, ".mf-modal-dynamic-content")
        .unwrap()
        .unwrap();
    assert!(page
        .doc
        .query_within(content, "button.mf-modal-close")
        .unwrap()
        .is_some());
    assert_eq!(
        page.doc.get_attribute(dynamic, "hx-get").as_deref(),
        Some("http://localhost:8080/courses/42")
    );
    assert_eq!(page.doc.observer_count(), 6);
    assert_eq!(
        page.transport.processed.borrow().last(),
        Some(&(dynamic, session.root))
    );
}

#[tokio::test]
async fn split_mode_prebuilds_detail_pane() {
    let page = page();

    let session = page
        .embedder
        .init(options(r##"{"target": "#app", "detailMode": "inline-on-modal"}"##))
        .await
        .unwrap();

    assert_eq!(session.mode, PresentationMode::InlineWithSplitDetail);
    let pane = page
        .doc
        .query_within(session.wrapper, "#mf-detail-container")
        .unwrap()
        .unwrap();
    let title = add_trigger(&page.doc, session.main_mount, "https://cdn.example.com/c/1");
    page.doc.click(title).unwrap();
    assert_eq!(
        page.doc.get_attribute(pane, "hx-get").as_deref(),
        Some("https://cdn.example.com/c/1")
    );
}

#[tokio::test]
async fn split_mode_uses_engine_pane_for_server_fragments() {
    let page = page();
    let session = page
        .embedder
        .init(options(r##"{"target": "#app", "detailMode": "inline-on-modal"}"##))
        .await
        .unwrap();
    let pane = session.detail_pane.unwrap();

    // The list fragment ships its own detail container and placeholder.
    let list = page
        .doc
        .append_element(session.main_mount, "div", &[("id", "mf-course-list")])
        .unwrap();
    let server_pane = page
        .doc
        .append_element(session.main_mount, "section", &[("id", "mf-detail-container")])
        .unwrap();
    let placeholder = page
        .doc
        .append_element(server_pane, "div", &[("id", "mf-detail-default")])
        .unwrap();
    page.doc.flush_mutations();

    assert_eq!(
        page.doc.get_attribute(list, "class").as_deref(),
        Some("mf-course-list__scrollable-vertical")
    );
    assert_eq!(page.doc.parent(placeholder), Some(pane));
    assert_eq!(
        page.doc.get_attribute(placeholder, "style").as_deref(),
        Some("display: flex;")
    );

    let title = add_trigger(&page.doc, list, "/courses/7");
    page.doc.click(title).unwrap();
    assert_eq!(
        page.doc.get_attribute(pane, "hx-get").as_deref(),
        Some("http://localhost:8080/courses/7")
    );
    assert_eq!(page.doc.get_attribute(server_pane, "hx-get"), None);
}

#[tokio::test]
async fn server_cards_follow_detail_mode() {
    let page = page();
    let session = page
        .embedder
        .init(options(r##"{"target": "#app", "mainModeDisplay": "scrollable"}"##))
        .await
        .unwrap();

    let list = page
        .doc
        .append_element(session.main_mount, "div", &[("id", "mf-course-list")])
        .unwrap();
    let title = page
        .doc
        .append_element(
            list,
            "h3",
            &[("class", "mf-course-card__title mf-has-url"), ("hx-get", "/courses/3")],
        )
        .unwrap();
    page.doc.flush_mutations();

    assert_eq!(
        page.doc.get_attribute(list, "class").as_deref(),
        Some("mf-course-list__scrollable")
    );
    assert_eq!(
        page.doc.get_attribute(title, "hx-get").as_deref(),
        Some("http://localhost:8080/courses/3?view=modal")
    );
    assert_eq!(page.doc.get_attribute(title, "hx-target").as_deref(), Some("#mf-modal"));
    assert_eq!(page.doc.pending_mutations(), 0);
}

// ===== Normalization =====

#[tokio::test]
async fn injected_urls_are_qualified_once() {
    let page = page();
    let session = page.embedder.init(inline_options()).await.unwrap();
    let button = page
        .doc
        .append_element(
            session.main_mount,
            "button",
            &[("class", "mf-has-url"), ("hx-post", "/enroll")],
        )
        .unwrap();

    page.doc.flush_mutations();
    assert_eq!(
        page.doc.get_attribute(button, "hx-post").as_deref(),
        Some("http://localhost:8080/enroll")
    );

    assert_eq!(qualify_urls(&*page.doc, session.root, ORIGIN).unwrap(), 0);
    assert_eq!(
        page.doc.get_attribute(button, "hx-post").as_deref(),
        Some("http://localhost:8080/enroll")
    );
}

#[tokio::test]
async fn injected_descriptions_are_truncated() {
    let page = page();
    let session = page.embedder.init(inline_options()).await.unwrap();
    let text: String = "0123456789".repeat(9);
    let card = page
        .doc
        .append_element(
            session.main_mount,
            "p",
            &[("class", "mf-course-card__description")],
        )
        .unwrap();
    page.doc.set_text_content(card, &text).unwrap();

    page.doc.flush_mutations();
    let displayed = page.doc.text_content(card);
    assert!(displayed.ends_with("..."));
    assert!(displayed.chars().count() <= 75 + 3);

    assert_eq!(truncate_descriptions(&*page.doc, session.root, 75).unwrap(), 0);
    assert_eq!(page.doc.text_content(card), displayed);
}

// ===== Failure cleanup =====

#[tokio::test]
async fn failed_init_leaves_no_partial_boundary() {
    let page = page();
    page.doc.fail_observers(Some("observer quota"));

    let result = page
        .embedder
        .init(options(r##"{"target": "#app", "detailMode": "modal"}"##))
        .await;

    assert!(matches!(result, Err(EmbedError::Dom(_))));
    assert_eq!(page.embedder.boundaries.active_count(), 0);
    assert_eq!(page.doc.shadow_root(page.app), None);
    assert_eq!(page.doc.listener_count(), 0);
    assert_eq!(page.doc.observer_count(), 0);
    assert!(page.embedder.sessions().is_empty());
    let processed: Vec<NodeId> = page
        .transport
        .processed
        .borrow()
        .iter()
        .map(|(node, _)| *node)
        .collect();
    assert_eq!(*page.transport.released.borrow(), processed);

    page.doc.fail_observers(None);
    page.embedder.init(inline_options()).await.unwrap();
    assert_eq!(page.embedder.boundaries.active_count(), 1);
}

#[tokio::test]
async fn failed_modal_init_removes_its_overlay() {
    let page = page();
    page.doc.fail_observers(Some("observer quota"));

    let result = page.embedder.init(options(r#"{"mainMode": "modal"}"#)).await;

    assert!(result.is_err());
    assert!(page.doc.query_document(".mf-modal-overlay").unwrap().is_none());
    assert_eq!(page.doc.listener_count(), 0);
    assert_eq!(page.embedder.boundaries.active_count(), 0);
}

// ===== Transport loading =====

#[tokio::test]
async fn unavailable_transport_still_mounts() {
    let page = page();
    page.transport.available.set(false);

    let session = page.embedder.init(inline_options()).await.unwrap();

    assert_eq!(page.doc.get_attribute(session.main_mount, "hx-get"), None);
    assert!(page.transport.processed.borrow().is_empty());
    assert!(!page.embedder.extensions().is_installed());
    assert_eq!(page.doc.observer_count(), 3);
}

#[tokio::test]
async fn concurrent_inits_share_one_load() {
    let loader = Rc::new(CountingLoader::new());
    let page = page_with(Some(loader.clone()));
    page.doc
        .append_element(page.doc.body(), "div", &[("id", "second")])
        .unwrap();

    let (a, b) = tokio::join!(
        page.embedder.init(inline_options()),
        page.embedder.init(options(r##"{"target": "#second"}"##)),
    );

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(loader.calls.get(), 1);
    assert_eq!(page.embedder.boundaries.active_count(), 2);

    page.embedder.init(inline_options()).await.unwrap();
    assert_eq!(loader.calls.get(), 1);
}

#[tokio::test]
async fn reinit_while_pending_supersedes_first_call() {
    let loader = Rc::new(CountingLoader::new());
    let page = page_with(Some(loader.clone()));

    let (first, second) = tokio::join!(
        page.embedder.init(inline_options()),
        page.embedder.init(inline_options()),
    );

    assert!(matches!(first, Err(EmbedError::Superseded(_))));
    let second = second.unwrap();
    assert_eq!(page.doc.shadow_root(page.app), Some(second.root));
    assert_eq!(page.doc.observer_count(), 3);
    assert_eq!(page.embedder.sessions(), vec![second]);
}

#[tokio::test]
async fn failed_load_is_retried_by_next_init() {
    let loader = Rc::new(CountingLoader::new().failing_once());
    let page = page_with(Some(loader.clone()));

    page.embedder.init(inline_options()).await.unwrap();
    page.embedder.init(inline_options()).await.unwrap();

    assert_eq!(loader.calls.get(), 2);
}

#[tokio::test]
async fn extension_installed_once_per_registry() {
    let doc = Rc::new(InMemoryDocument::new());
    doc.append_element(doc.body(), "div", &[("id", "app")])
        .unwrap();
    let transport = Rc::new(MockTransport::new());
    let registry = Rc::new(ExtensionRegistry::new());
    let build = || {
        EmbedderBuilder::new()
            .document(doc.clone())
            .transport(transport.clone())
            .extension_registry(Rc::clone(&registry))
            .build()
            .unwrap()
    };
    let first = build();
    let second = build();

    first.init(inline_options()).await.unwrap();
    second.init(inline_options()).await.unwrap();
    first.init(inline_options()).await.unwrap();

    assert_eq!(*transport.extensions.borrow(), vec!["shadowParts".to_string()]);
    assert!(registry.is_installed());
}

#[tokio::test]
async fn session_serializes_for_hosts() {
    let page = page();

    let session = page
        .embedder
        .init(options(r#"{"mainMode": "modal"}"#))
        .await
        .unwrap();

    let json = serde_json::to_value(&session).unwrap();
    assert_eq!(json["mode"], "modalWithModalDetail");
    assert_eq!(json["contentUrl"], "http://localhost:8080/search");
    assert!(json["detailPane"].is_null());
    assert!(json["theme"]["declarations"].is_array());
    assert_eq!(session.mode.main_mode(), MainMode::Modal);
}
