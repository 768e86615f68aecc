//! DOM normalization passes
//!
//! Idempotent passes run over a scope once at install time and again on
//! every child-list mutation inside it:
//! - URL qualification of `hx-get`/`hx-post` on `.mf-has-url` elements
//! - truncation of card descriptions
//! - adaptation of server card markup to the presentation mode

use std::rc::{Rc, Weak};

use crate::error::{EmbedError, EmbedResult};
use crate::services::ServiceContext;
use crate::traits::{is_within, HostDocument, NodeId, ObserverId};
use crate::types::markup::{
    ATTR_FULL_TEXT, ATTR_HX_GET, ATTR_HX_POST, ATTR_HX_TARGET, CARD_BUTTON_SELECTOR,
    CARD_TITLE_SELECTOR, COURSE_LIST_SELECTOR, DESCRIPTION_SELECTOR, DETAIL_CONTAINER_SELECTOR,
    DETAIL_DEFAULT_SELECTOR, HAS_URL_SELECTOR, MODAL_TARGET_SELECTOR, MODAL_VIEW_PARAM,
};
use crate::types::{DetailRouting, EmbedConfig, MainModeDisplay, PresentationMode};
use crate::utils::text::truncate_chars;
use crate::utils::url::{qualify, with_query_pair, without_query_pair};

const DETAIL_DEFAULT_DISPLAY: &str = "display: flex;";

/// What the passes need to know about the session they serve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupRules {
    /// Service origin prefixed to relative fetch directives
    pub origin: String,
    pub max_length: usize,
    pub mode: PresentationMode,
    pub display: MainModeDisplay,
    /// Detail pane built by the split layout
    pub detail_pane: Option<NodeId>,
}

impl MarkupRules {
    #[must_use]
    pub fn new(config: &EmbedConfig, detail_pane: Option<NodeId>) -> Self {
        Self {
            origin: config.origin.clone(),
            max_length: config.description_max_length,
            mode: config.presentation(),
            display: config.main_mode_display,
            detail_pane,
        }
    }
}

/// Prefix relative fetch directives inside `scope` with `origin`.
///
/// Returns the number of attributes rewritten.
pub fn qualify_urls(document: &dyn HostDocument, scope: NodeId, origin: &str) -> EmbedResult<usize> {
    let mut rewritten = 0;
    for element in document.query_all_within(scope, HAS_URL_SELECTOR)? {
        for attribute in [ATTR_HX_GET, ATTR_HX_POST] {
            let Some(value) = document.get_attribute(element, attribute) else {
                continue;
            };
            if let Some(qualified) = qualify(&value, origin) {
                document.set_attribute(element, attribute, &qualified)?;
                rewritten += 1;
            }
        }
    }
    Ok(rewritten)
}

/// Truncate card descriptions inside `scope` to `max` characters.
///
/// The canonical text lives in `data-mf-full-text`. When the displayed text
/// no longer matches the truncation of the stored canonical text, the server
/// replaced it and the new text becomes canonical. Text is only written when
/// it differs, so a second run changes nothing.
///
/// Returns the number of elements whose text was rewritten.
pub fn truncate_descriptions(
    document: &dyn HostDocument,
    scope: NodeId,
    max: usize,
) -> EmbedResult<usize> {
    let mut rewritten = 0;
    for element in document.query_all_within(scope, DESCRIPTION_SELECTOR)? {
        let current = document.text_content(element);
        let current = current.trim();

        let canonical = match document.get_attribute(element, ATTR_FULL_TEXT) {
            Some(full) if truncate_chars(&full, max) == current => full,
            _ => {
                document.set_attribute(element, ATTR_FULL_TEXT, current)?;
                current.to_string()
            }
        };

        let displayed = truncate_chars(&canonical, max);
        if displayed != current {
            document.set_text_content(element, &displayed)?;
            rewritten += 1;
        }
    }
    Ok(rewritten)
}

/// Adapt server card markup inside `scope` to the session's presentation.
///
/// - `#mf-course-list` gets the `mf-course-list__<display>` modifier class.
/// - With container routing, card buttons drop `view=modal` from `hx-get`
///   and target `#mf-detail-container`. With overlay routing, card titles ask
///   for `view=modal` and target `#mf-modal`.
/// - In the split layout the `#mf-detail-default` placeholder is moved into
///   the detail pane and shown.
///
/// Returns the number of changes made; a second run makes none.
pub fn adapt_detail_markup(
    document: &dyn HostDocument,
    scope: NodeId,
    rules: &MarkupRules,
) -> EmbedResult<usize> {
    let mut changed = 0;

    let list_class = rules.display.list_class(rules.mode.is_split());
    for list in document.query_all_within(scope, COURSE_LIST_SELECTOR)? {
        let classes = document.get_attribute(list, "class").unwrap_or_default();
        if !classes.split_whitespace().any(|class| class == list_class) {
            let classes = classes.trim();
            let joined = if classes.is_empty() {
                list_class.clone()
            } else {
                format!("{classes} {list_class}")
            };
            document.set_attribute(list, "class", &joined)?;
            changed += 1;
        }
    }

    let routing = rules.mode.detail_routing();
    let (selector, target) = match routing {
        DetailRouting::Container => (CARD_BUTTON_SELECTOR, DETAIL_CONTAINER_SELECTOR),
        DetailRouting::Overlay => (CARD_TITLE_SELECTOR, MODAL_TARGET_SELECTOR),
    };
    let (name, value) = MODAL_VIEW_PARAM;
    for card in document.query_all_within(scope, selector)? {
        if let Some(url) = document.get_attribute(card, ATTR_HX_GET) {
            let wanted = match routing {
                DetailRouting::Container => without_query_pair(&url, name, value),
                DetailRouting::Overlay => with_query_pair(&url, name, value),
            };
            if wanted != url {
                document.set_attribute(card, ATTR_HX_GET, &wanted)?;
                changed += 1;
            }
        }
        if document.get_attribute(card, ATTR_HX_TARGET).as_deref() != Some(target) {
            document.set_attribute(card, ATTR_HX_TARGET, target)?;
            changed += 1;
        }
    }

    if let Some(pane) = rules.detail_pane {
        changed += show_detail_default(document, scope, pane)?;
    }
    Ok(changed)
}

fn show_detail_default(document: &dyn HostDocument, scope: NodeId, pane: NodeId) -> EmbedResult<usize> {
    let Some(placeholder) = document.query_within(scope, DETAIL_DEFAULT_SELECTOR)? else {
        return Ok(0);
    };
    let mut changed = 0;
    if !is_within(document, placeholder, pane) {
        document.append_child(pane, placeholder)?;
        changed += 1;
    }
    let style = document.get_attribute(placeholder, "style").unwrap_or_default();
    if !style.contains(DETAIL_DEFAULT_DISPLAY) {
        let style = style.trim().trim_end_matches(';');
        let shown = if style.is_empty() {
            DETAIL_DEFAULT_DISPLAY.to_string()
        } else {
            format!("{style}; {DETAIL_DEFAULT_DISPLAY}")
        };
        document.set_attribute(placeholder, "style", &shown)?;
        changed += 1;
    }
    Ok(changed)
}

/// Normalization observers
pub struct NormalizationService {
    ctx: Rc<ServiceContext>,
}

impl NormalizationService {
    #[must_use]
    pub fn new(ctx: Rc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Run every pass once over `scope`
    pub fn run(&self, scope: NodeId, rules: &MarkupRules) -> EmbedResult<()> {
        let document = self.ctx.document();
        let urls = qualify_urls(document, scope, &rules.origin)?;
        let texts = truncate_descriptions(document, scope, rules.max_length)?;
        let markup = adapt_detail_markup(document, scope, rules)?;
        log::debug!(
            "Normalized {scope}: {urls} url(s) qualified, {texts} description(s) truncated, \
             {markup} markup change(s)"
        );
        Ok(())
    }

    /// Run every pass now and observe `scope` for later insertions.
    ///
    /// Returns one observer per pass; the caller owns them and must
    /// disconnect them when the scope is torn down. If an observer cannot be
    /// registered, the ones already registered are disconnected.
    pub fn install(&self, scope: NodeId, rules: &MarkupRules) -> EmbedResult<Vec<ObserverId>> {
        self.run(scope, rules)?;

        let document = self.ctx.document();
        let weak: Weak<dyn HostDocument> = Rc::downgrade(&self.ctx.document);
        let origin = rules.origin.clone();
        let max = rules.max_length;
        let markup = rules.clone();
        let passes = [
            observer_callback(weak.clone(), "URL qualification", move |doc| {
                qualify_urls(doc, scope, &origin)
            }),
            observer_callback(weak.clone(), "Description truncation", move |doc| {
                truncate_descriptions(doc, scope, max)
            }),
            observer_callback(weak, "Detail markup", move |doc| {
                adapt_detail_markup(doc, scope, &markup)
            }),
        ];

        let mut observers = Vec::with_capacity(passes.len());
        for callback in passes {
            match document.observe_subtree(scope, callback) {
                Ok(observer) => observers.push(observer),
                Err(e) => {
                    for observer in observers {
                        document.disconnect(observer);
                    }
                    return Err(e);
                }
            }
        }
        Ok(observers)
    }
}

fn observer_callback(
    document: Weak<dyn HostDocument>,
    pass: &'static str,
    run: impl Fn(&dyn HostDocument) -> EmbedResult<usize> + 'static,
) -> Rc<dyn Fn()> {
    Rc::new(move || {
        let Some(document) = document.upgrade() else {
            return;
        };
        match run(document.as_ref()) {
            Ok(0) => {}
            Ok(count) => log::debug!("{pass} pass updated {count} node(s)"),
            // The scope went away between the mutation and its delivery.
            Err(EmbedError::NodeNotFound(_)) => {}
            Err(e) => e.report(&format!("{pass} pass failed")),
        }
    })
}
