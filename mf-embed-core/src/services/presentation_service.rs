//! Presentation mode controller
//!
//! Builds the DOM structure of the selected presentation state and wires
//! detail triggers. Every listener, observer and overlay it creates is
//! registered on the isolation boundary so that teardown releases them.
//!
//! Handlers hold the service context and the boundary weakly: they are owned
//! by the document, which the context itself owns.

use std::rc::{Rc, Weak};

use crate::error::{EmbedError, EmbedResult};
use crate::services::{
    IsolationBoundary, MarkupRules, NormalizationService, ServiceContext, ThemeService,
    TransportBridge,
};
use crate::traits::{closest, ClickEvent, ListenerId, NodeId};
use crate::types::markup::{
    ATTR_DETAIL_URL, ATTR_HX_EXT, DETAIL_CONTAINER_ID, DETAIL_CONTAINER_SELECTOR,
    DETAIL_SELECTOR, MAIN_MOUNT_ID, OVERLAY_CLASS, OVERLAY_CLOSE_CLASS, OVERLAY_CONTENT_CLASS,
    OVERLAY_DYNAMIC_CLASS, SHADOW_PARTS_EXTENSION,
};
use crate::types::{
    DetailRouting, EmbedConfig, EmbedSession, Keyword, MainMode, PresentationMode, ThemeSnapshot,
};
use crate::utils::url::resolve_against_origin;

const OVERLAY_STYLE: &str = "position: fixed; top: 0; left: 0; width: 100%; height: 100%; \
     background: rgba(0,0,0,0.5); display: flex; align-items: center; \
     justify-content: center; z-index: 1000;";
const OVERLAY_CONTENT_STYLE: &str = "background: white; padding: 2rem; border-radius: 8px; \
     max-width: 90%; max-height: 90vh; overflow: auto; position: relative;";
const CLOSE_BUTTON_STYLE: &str = "position: absolute; top: 1rem; right: 1rem; \
     background: transparent; border: none; font-size: 1.5rem; cursor: pointer;";
const CLOSE_BUTTON_LABEL: &str = "\u{00d7}";

const SPLIT_WRAPPER_STYLE: &str = "display: flex; gap: 1rem;";
const SPLIT_MAIN_STYLE: &str = "flex: 0 0 30%;";
const SPLIT_DETAIL_STYLE: &str = "flex: 0 0 70%; margin-block-start: 0; \
     max-height: fit-content; display: flex;";

/// Nodes of one overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OverlayNodes {
    overlay: NodeId,
    dynamic: NodeId,
}

/// Everything a handler needs to route a detail trigger
#[derive(Clone)]
struct SessionWiring {
    ctx: Weak<ServiceContext>,
    boundary: Weak<IsolationBoundary>,
    mode: PresentationMode,
    keyword: Keyword,
    keyword_param: String,
    /// Origin, split pane and the rest of what normalization needs
    rules: MarkupRules,
}

impl SessionWiring {
    /// Delegate clicks on detail triggers inside `node`
    fn delegate_details(&self, ctx: &ServiceContext, node: NodeId) -> EmbedResult<ListenerId> {
        let wiring = self.clone();
        ctx.document().add_click_listener(
            node,
            Rc::new(move |event: &ClickEvent| {
                if let Err(e) = wiring.route_detail(event) {
                    e.report("Detail navigation failed");
                }
            }),
        )
    }

    /// Detail content is processed within the boundary root, overlays included.
    fn route_detail(&self, event: &ClickEvent) -> EmbedResult<()> {
        let (Some(ctx), Some(boundary)) = (self.ctx.upgrade(), self.boundary.upgrade()) else {
            return Ok(());
        };
        if !boundary.is_active() {
            return Ok(());
        }
        let document = ctx.document();
        let Some(trigger) = closest(document, event.target, DETAIL_SELECTOR, event.current_target)?
        else {
            return Ok(());
        };
        event.prevent_default();

        let raw_url = document
            .get_attribute(trigger, ATTR_DETAIL_URL)
            .filter(|url| !url.trim().is_empty())
            .ok_or(EmbedError::MissingDetailUrl)?;
        let url = self.keyword.apply(
            &resolve_against_origin(&raw_url, &self.rules.origin),
            &self.keyword_param,
        );

        match self.mode.detail_routing() {
            DetailRouting::Container => {
                // 分栏布局始终使用引擎创建的详情面板
                let container = match self.rules.detail_pane {
                    Some(pane) => pane,
                    None => document
                        .query_within(event.current_target, DETAIL_CONTAINER_SELECTOR)?
                        .ok_or_else(|| {
                            EmbedError::DetailContainerNotFound(
                                DETAIL_CONTAINER_SELECTOR.to_string(),
                            )
                        })?,
                };
                log::info!("Loading detail {url} inline");
                boundary.track_load(container);
                TransportBridge::new(Rc::clone(&ctx)).load(container, &url, boundary.root())?;
            }
            DetailRouting::Overlay => {
                let nodes = self.open_overlay(&ctx, &boundary)?;
                log::info!("Loading detail {url} in overlay {}", nodes.overlay);
                TransportBridge::new(Rc::clone(&ctx)).load(nodes.dynamic, &url, boundary.root())?;
            }
        }
        Ok(())
    }

    /// Append an overlay to the host body and register it on the boundary.
    ///
    /// The overlay gets its own close control, detail delegation and
    /// normalization observers.
    fn open_overlay(
        &self,
        ctx: &Rc<ServiceContext>,
        boundary: &Rc<IsolationBoundary>,
    ) -> EmbedResult<OverlayNodes> {
        let document = ctx.document();
        let overlay = create_styled(ctx, "div", OVERLAY_CLASS, OVERLAY_STYLE)?;
        let content = create_styled(ctx, "div", OVERLAY_CONTENT_CLASS, OVERLAY_CONTENT_STYLE)?;
        let close = create_styled(ctx, "button", OVERLAY_CLOSE_CLASS, CLOSE_BUTTON_STYLE)?;
        document.set_attribute(close, "type", "button")?;
        document.set_attribute(close, "aria-label", "Close")?;
        document.set_text_content(close, CLOSE_BUTTON_LABEL)?;
        let dynamic = document.create_element("div")?;
        document.set_attribute(dynamic, "class", OVERLAY_DYNAMIC_CLASS)?;

        document.append_child(content, close)?;
        document.append_child(content, dynamic)?;
        document.append_child(overlay, content)?;

        let close_listener = {
            let ctx = Rc::downgrade(ctx);
            let boundary = Rc::downgrade(boundary);
            document.add_click_listener(
                close,
                Rc::new(move |event: &ClickEvent| {
                    event.prevent_default();
                    let (Some(ctx), Some(boundary)) = (ctx.upgrade(), boundary.upgrade()) else {
                        return;
                    };
                    match boundary.release_overlay(&ctx, overlay) {
                        Ok(true) => log::info!("Overlay {overlay} closed"),
                        Ok(false) => {}
                        Err(e) => e.report("Closing overlay failed"),
                    }
                }),
            )?
        };
        let handles = self.delegate_details(ctx, dynamic).and_then(|detail_listener| {
            match NormalizationService::new(Rc::clone(ctx)).install(dynamic, &self.rules) {
                Ok(observers) => Ok((observers, detail_listener)),
                Err(e) => {
                    document.remove_listener(detail_listener);
                    Err(e)
                }
            }
        });
        let (observers, detail_listener) = match handles {
            Ok(handles) => handles,
            Err(e) => {
                document.remove_listener(close_listener);
                return Err(e);
            }
        };
        boundary.track_overlay(overlay, dynamic, observers, [close_listener, detail_listener]);

        document.append_child(document.body(), overlay)?;
        Ok(OverlayNodes { overlay, dynamic })
    }
}

fn create_styled(ctx: &ServiceContext, tag: &str, class: &str, style: &str) -> EmbedResult<NodeId> {
    let document = ctx.document();
    let node = document.create_element(tag)?;
    document.set_attribute(node, "class", class)?;
    document.set_attribute(node, "style", style)?;
    Ok(node)
}

/// Presentation mode controller
pub struct PresentationController {
    ctx: Rc<ServiceContext>,
}

impl PresentationController {
    #[must_use]
    pub fn new(ctx: Rc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Build the session structure inside `boundary` and start the main load.
    ///
    /// Inline main views load into `#mf-main` inside the wrapper; modal main
    /// views load into an overlay created here. The split detail layout
    /// creates its own `#mf-detail-container` next to `#mf-main`, and detail
    /// triggers always load into that pane.
    pub fn mount(
        &self,
        boundary: &Rc<IsolationBoundary>,
        config: &EmbedConfig,
        keyword: &Keyword,
        theme: &ThemeSnapshot,
    ) -> EmbedResult<EmbedSession> {
        let document = self.ctx.document();
        let mode = config.presentation();
        let wrapper = boundary.wrapper();
        let root = boundary.root();

        ThemeService::new(Rc::clone(&self.ctx)).apply(wrapper, theme)?;
        let stylesheet = document.create_element("link")?;
        document.set_attribute(stylesheet, "rel", "stylesheet")?;
        document.set_attribute(stylesheet, "href", &config.stylesheet_url())?;
        document.append_child(wrapper, stylesheet)?;
        document.set_attribute(wrapper, ATTR_HX_EXT, SHADOW_PARTS_EXTENSION)?;

        // Inline main views are built before the wiring so it knows the split pane.
        let inline_main = match mode.main_mode() {
            MainMode::Inline => {
                let main = document.create_element("div")?;
                document.set_attribute(main, "id", MAIN_MOUNT_ID)?;
                document.append_child(wrapper, main)?;
                let pane = if mode.is_split() {
                    Some(self.build_split_layout(wrapper, main)?)
                } else {
                    None
                };
                Some((main, pane))
            }
            MainMode::Modal => None,
        };
        let detail_pane = inline_main.and_then(|(_, pane)| pane);

        let wiring = SessionWiring {
            ctx: Rc::downgrade(&self.ctx),
            boundary: Rc::downgrade(boundary),
            mode,
            keyword: keyword.clone(),
            keyword_param: config.keyword_param.clone(),
            rules: MarkupRules::new(config, detail_pane),
        };
        let content_url = keyword.apply(config.service_url.as_str(), &config.keyword_param);
        let bridge = TransportBridge::new(Rc::clone(&self.ctx));

        let (main_mount, main_overlay) = match inline_main {
            Some((main, _)) => {
                boundary.track_listener(wiring.delegate_details(&self.ctx, wrapper)?);
                boundary.track_load(main);
                bridge.load(main, &content_url, root)?;
                (main, None)
            }
            None => {
                let nodes = wiring.open_overlay(&self.ctx, boundary)?;
                bridge.load(nodes.dynamic, &content_url, root)?;
                (nodes.dynamic, Some(nodes.overlay))
            }
        };

        log::info!(
            "Mounted {mode:?} on {} (keyword: {:?})",
            boundary.container(),
            keyword.as_deref()
        );
        Ok(EmbedSession {
            container: boundary.container(),
            root,
            wrapper,
            main_mount,
            main_overlay,
            detail_pane,
            mode,
            keyword: keyword.clone(),
            content_url,
            theme: theme.clone(),
        })
    }

    fn build_split_layout(&self, wrapper: NodeId, main: NodeId) -> EmbedResult<NodeId> {
        let document = self.ctx.document();
        document.set_attribute(wrapper, "style", SPLIT_WRAPPER_STYLE)?;
        document.set_attribute(main, "style", SPLIT_MAIN_STYLE)?;
        let detail = document.create_element("div")?;
        document.set_attribute(detail, "id", DETAIL_CONTAINER_ID)?;
        document.set_attribute(detail, "style", SPLIT_DETAIL_STYLE)?;
        document.append_child(wrapper, detail)?;
        Ok(detail)
    }
}
