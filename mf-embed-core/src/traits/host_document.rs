//! Host document abstraction Trait

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::EmbedResult;
use crate::types::ComputedStyle;

/// Opaque handle to an element, shadow root or document node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle of a registered click listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Handle of a registered subtree mutation observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u64);

/// Click event delivered to a listener
#[derive(Debug)]
pub struct ClickEvent {
    /// Innermost element that was clicked
    pub target: NodeId,
    /// Element the listener is registered on
    pub current_target: NodeId,
    default_prevented: Cell<bool>,
}

impl ClickEvent {
    #[must_use]
    pub fn new(target: NodeId, current_target: NodeId) -> Self {
        Self {
            target,
            current_target,
            default_prevented: Cell::new(false),
        }
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    #[must_use]
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

/// Click listener callback
pub type ClickHandler = Rc<dyn Fn(&ClickEvent)>;

/// Mutation observer callback, invoked after child-list changes in the observed subtree
pub type MutationCallback = Rc<dyn Fn()>;

/// Host document Trait
///
/// The embedding engine never touches the DOM directly; every read and write
/// goes through this trait so the engine runs in a browser and headless.
///
/// Platform implementations:
/// - Browser (wasm): `WebDocument` (web-sys)
/// - Headless / tests: `InMemoryDocument` (feature `test-utils`)
///
/// Queries on the document never descend into encapsulated roots; queries
/// scoped to a root or element only search that subtree.
pub trait HostDocument {
    /// `<body>` of the host page
    fn body(&self) -> NodeId;

    /// `<head>` of the host page
    fn head(&self) -> NodeId;

    /// First element of the host document matching `selector`
    fn query_document(&self, selector: &str) -> EmbedResult<Option<NodeId>>;

    /// First descendant of `scope` matching `selector`
    fn query_within(&self, scope: NodeId, selector: &str) -> EmbedResult<Option<NodeId>>;

    /// All descendants of `scope` matching `selector`, in document order
    fn query_all_within(&self, scope: NodeId, selector: &str) -> EmbedResult<Vec<NodeId>>;

    /// Whether `node` matches `selector`
    fn matches(&self, node: NodeId, selector: &str) -> EmbedResult<bool>;

    /// Create a detached element
    fn create_element(&self, tag: &str) -> EmbedResult<NodeId>;

    /// Append `child` as last child of `parent`, moving it if attached elsewhere
    fn append_child(&self, parent: NodeId, child: NodeId) -> EmbedResult<()>;

    /// Detach `node` from its parent; no-op for detached nodes
    fn remove(&self, node: NodeId) -> EmbedResult<()>;

    /// Remove every child of `node` (light DOM only)
    fn clear_children(&self, node: NodeId) -> EmbedResult<()>;

    /// Parent element or root; `None` for detached nodes and encapsulated roots
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Whether `node` is reachable from the document
    fn is_connected(&self, node: NodeId) -> bool;

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String>;

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> EmbedResult<()>;

    fn remove_attribute(&self, node: NodeId, name: &str) -> EmbedResult<()>;

    /// Concatenated text of `node` and its descendants
    fn text_content(&self, node: NodeId) -> String;

    /// Replace all children of `node` with a single text
    fn set_text_content(&self, node: NodeId, text: &str) -> EmbedResult<()>;

    /// Encapsulated root currently attached to `host`
    fn shadow_root(&self, host: NodeId) -> Option<NodeId>;

    /// Host element of an encapsulated root; `None` for anything else
    fn host_of(&self, root: NodeId) -> Option<NodeId>;

    /// Attach a new open encapsulated root to `host`.
    ///
    /// Platforms that cannot replace a root may hand back the previous root
    /// after emptying it; callers must treat the result as fresh.
    fn attach_shadow(&self, host: NodeId) -> EmbedResult<NodeId>;

    /// Discard the encapsulated root of `host` and everything inside it
    fn detach_shadow(&self, host: NodeId) -> EmbedResult<()>;

    /// Computed style of a host element
    fn computed_style(&self, node: NodeId) -> EmbedResult<ComputedStyle>;

    /// Register a click listener on `node`; clicks on descendants bubble to it
    fn add_click_listener(&self, node: NodeId, handler: ClickHandler) -> EmbedResult<ListenerId>;

    /// Unregister a click listener; unknown ids are ignored
    fn remove_listener(&self, listener: ListenerId);

    /// Observe child-list changes of `root`'s whole subtree
    fn observe_subtree(&self, root: NodeId, callback: MutationCallback) -> EmbedResult<ObserverId>;

    /// Stop an observer; unknown ids are ignored
    fn disconnect(&self, observer: ObserverId);
}

/// Walk from `node` up to `boundary` (inclusive) and return the first element matching `selector`
pub fn closest(
    document: &dyn HostDocument,
    node: NodeId,
    selector: &str,
    boundary: NodeId,
) -> EmbedResult<Option<NodeId>> {
    let mut current = Some(node);
    while let Some(candidate) = current {
        if document.matches(candidate, selector)? {
            return Ok(Some(candidate));
        }
        if candidate == boundary {
            break;
        }
        current = document.parent(candidate);
    }
    Ok(None)
}

/// Whether `ancestor` is `node` or one of its light-DOM ancestors
pub fn is_within(document: &dyn HostDocument, node: NodeId, ancestor: NodeId) -> bool {
    let mut current = Some(node);
    while let Some(candidate) = current {
        if candidate == ancestor {
            return true;
        }
        current = document.parent(candidate);
    }
    false
}

/// Host of the encapsulated root `node` lives in
pub fn root_host(document: &dyn HostDocument, node: NodeId) -> Option<NodeId> {
    let mut top = node;
    while let Some(parent) = document.parent(top) {
        top = parent;
    }
    document.host_of(top)
}
