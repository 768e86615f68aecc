//! Markup contract shared with the content service and the transport

/// Fetch directive read by the transport
pub const ATTR_HX_GET: &str = "hx-get";
pub const ATTR_HX_POST: &str = "hx-post";
pub const ATTR_HX_TRIGGER: &str = "hx-trigger";
pub const ATTR_HX_SWAP: &str = "hx-swap";
pub const ATTR_HX_TARGET: &str = "hx-target";
pub const ATTR_HX_EXT: &str = "hx-ext";

pub const TRIGGER_ON_LOAD: &str = "load";
pub const SWAP_INNER_HTML: &str = "innerHTML";

/// Elements whose fetch directives are qualified with the service origin
pub const HAS_URL_SELECTOR: &str = ".mf-has-url";
/// Detail triggers
pub const DETAIL_SELECTOR: &str = ".mf-detail";
pub const ATTR_DETAIL_URL: &str = "data-detail-url";
/// Card descriptions subject to truncation
pub const DESCRIPTION_SELECTOR: &str = ".mf-course-card__description";
/// Canonical (untruncated) description text
pub const ATTR_FULL_TEXT: &str = "data-mf-full-text";

pub const DETAIL_CONTAINER_ID: &str = "mf-detail-container";
pub const DETAIL_CONTAINER_SELECTOR: &str = "#mf-detail-container";

/// Placeholder shown in the detail pane before any detail is loaded
pub const DETAIL_DEFAULT_SELECTOR: &str = "#mf-detail-default";

pub const COURSE_LIST_SELECTOR: &str = "#mf-course-list";
pub const COURSE_LIST_CLASS_PREFIX: &str = "mf-course-list__";
/// Card controls the server renders with their own fetch directives
pub const CARD_BUTTON_SELECTOR: &str = ".mf-course-card__button";
pub const CARD_TITLE_SELECTOR: &str = ".mf-course-card__title";
/// Query flag asking the server for the overlay rendering of a detail
pub const MODAL_VIEW_PARAM: (&str, &str) = ("view", "modal");
pub const MODAL_TARGET_SELECTOR: &str = "#mf-modal";

pub const KEYWORD_META_SELECTOR: &str = "meta[name=\"mf-keyword\"]";

pub const WRAPPER_ID: &str = "mf-internal-wrapper";
pub const MAIN_MOUNT_ID: &str = "mf-main";
pub const THEME_STYLE_ID: &str = "mf-theme";
/// Anchor created on the body when the main view is modal and no target is set
pub const EMBED_ROOT_ID: &str = "mf-embed-root";

pub const OVERLAY_CLASS: &str = "mf-modal-overlay";
pub const OVERLAY_CONTENT_CLASS: &str = "mf-modal-content";
pub const OVERLAY_CLOSE_CLASS: &str = "mf-modal-close";
pub const OVERLAY_DYNAMIC_CLASS: &str = "mf-modal-dynamic-content";

pub const SHADOW_PARTS_EXTENSION: &str = "shadowParts";
pub const PART_TARGET_PREFIX: &str = "part:";
/// Id of the container whose root a rewritten `part:` target belongs to
pub const ATTR_SHADOW_ROOT: &str = "data-htmx-shadow-root";
