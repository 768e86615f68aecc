//! `HostDocument` over the live browser DOM
//!
//! DOM nodes are handed to the engine as `NodeId`s. The id is stamped on the
//! node object itself so a node reached twice (e.g. as an event target and
//! as a query result) always maps to the same handle.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use js_sys::Reflect;
use mf_embed_core::error::{EmbedError, EmbedResult};
use mf_embed_core::traits::{
    ClickEvent, ClickHandler, HostDocument, ListenerId, MutationCallback, NodeId, ObserverId,
};
use mf_embed_core::types::ComputedStyle;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, DocumentFragment, Element, Event, MutationObserver, MutationObserverInit,
    MutationRecord, Node, NodeList, ShadowRoot, ShadowRootInit, ShadowRootMode, Window,
};

const NODE_ID_PROPERTY: &str = "__mfEmbedNodeId";

type ClickClosure = Closure<dyn FnMut(Event)>;
type MutationClosure = Closure<dyn FnMut(js_sys::Array, MutationObserver)>;

pub(crate) fn js_error(e: JsValue) -> EmbedError {
    EmbedError::Dom(e.as_string().unwrap_or_else(|| format!("{e:?}")))
}

/// Drop a closure after the current task; it may be the one running now.
fn release_later<T: 'static>(value: T) {
    wasm_bindgen_futures::spawn_local(async move { drop(value) });
}

struct Listener {
    node: Node,
    closure: ClickClosure,
}

struct Observer {
    observer: MutationObserver,
    closure: MutationClosure,
}

/// Browser document adapter
pub struct WebDocument {
    me: Weak<WebDocument>,
    window: Window,
    document: Document,
    body: NodeId,
    head: NodeId,
    nodes: RefCell<HashMap<NodeId, Node>>,
    next_id: Cell<u64>,
    listeners: RefCell<HashMap<ListenerId, Listener>>,
    observers: RefCell<HashMap<ObserverId, Observer>>,
}

impl WebDocument {
    /// Bind to the page's `window.document`
    pub fn new() -> EmbedResult<Rc<Self>> {
        let window = web_sys::window().ok_or_else(|| EmbedError::Dom("no window".to_string()))?;
        let document = window
            .document()
            .ok_or_else(|| EmbedError::Dom("no document".to_string()))?;
        let body: Node = document
            .body()
            .ok_or_else(|| EmbedError::Dom("document has no <body>".to_string()))?
            .into();
        let head: Node = document
            .head()
            .ok_or_else(|| EmbedError::Dom("document has no <head>".to_string()))?
            .into();

        Ok(Rc::new_cyclic(|me| {
            let web = Self {
                me: me.clone(),
                window,
                document,
                body: NodeId(1),
                head: NodeId(2),
                nodes: RefCell::new(HashMap::new()),
                next_id: Cell::new(3),
                listeners: RefCell::new(HashMap::new()),
                observers: RefCell::new(HashMap::new()),
            };
            web.register(NodeId(1), &body);
            web.register(NodeId(2), &head);
            web
        }))
    }

    fn register(&self, id: NodeId, node: &Node) {
        #[allow(clippy::cast_precision_loss)]
        let stamp = JsValue::from_f64(id.0 as f64);
        // Frozen or exotic nodes reject the stamp; they just get a fresh id next time.
        let _ = Reflect::set(node, &NODE_ID_PROPERTY.into(), &stamp);
        self.nodes.borrow_mut().insert(id, node.clone());
    }

    fn next_handle(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Handle of a DOM node, registering it on first sight
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn id_of(&self, node: &Node) -> NodeId {
        let stamped = Reflect::get(node, &NODE_ID_PROPERTY.into())
            .ok()
            .and_then(|v| v.as_f64())
            .map(|v| NodeId(v as u64));
        if let Some(id) = stamped {
            if !self.nodes.borrow().contains_key(&id) {
                self.nodes.borrow_mut().insert(id, node.clone());
            }
            return id;
        }
        let id = NodeId(self.next_handle());
        self.register(id, node);
        id
    }

    /// DOM node behind a handle
    pub fn node(&self, id: NodeId) -> EmbedResult<Node> {
        self.nodes
            .borrow()
            .get(&id)
            .cloned()
            .ok_or(EmbedError::NodeNotFound(id))
    }

    /// DOM element behind a handle
    pub fn element(&self, id: NodeId) -> EmbedResult<Element> {
        self.node(id)?
            .dyn_into::<Element>()
            .map_err(|_| EmbedError::Dom(format!("{id} is not an element")))
    }

    /// Forget nodes that left the document
    fn prune(&self) {
        let (body, head) = (self.body, self.head);
        self.nodes
            .borrow_mut()
            .retain(|id, node| *id == body || *id == head || node.is_connected());
    }

    /// Forget `root` and every handle below it once it is out of the document
    fn forget_subtree(&self, root: &Node) {
        if root.is_connected() {
            return;
        }
        self.nodes
            .borrow_mut()
            .retain(|_, node| !root.contains(Some(&*node)));
    }
}

/// Nodes a mutation batch took out of the document
fn detached_nodes(records: &js_sys::Array) -> Vec<Node> {
    records
        .iter()
        .filter_map(|record| record.dyn_into::<MutationRecord>().ok())
        .flat_map(|record| {
            let removed = record.removed_nodes();
            (0..removed.length()).filter_map(move |i| removed.item(i))
        })
        .filter(|node| !node.is_connected())
        .collect()
}

fn select_first(scope: &Node, selector: &str) -> Result<Option<Element>, JsValue> {
    if let Some(element) = scope.dyn_ref::<Element>() {
        element.query_selector(selector)
    } else if let Some(fragment) = scope.dyn_ref::<DocumentFragment>() {
        fragment.query_selector(selector)
    } else if let Some(document) = scope.dyn_ref::<Document>() {
        document.query_selector(selector)
    } else {
        Ok(None)
    }
}

fn select_all(scope: &Node, selector: &str) -> Result<Option<NodeList>, JsValue> {
    if let Some(element) = scope.dyn_ref::<Element>() {
        element.query_selector_all(selector).map(Some)
    } else if let Some(fragment) = scope.dyn_ref::<DocumentFragment>() {
        fragment.query_selector_all(selector).map(Some)
    } else if let Some(document) = scope.dyn_ref::<Document>() {
        document.query_selector_all(selector).map(Some)
    } else {
        Ok(None)
    }
}

fn invalid_selector(selector: &str) -> impl FnOnce(JsValue) -> EmbedError + '_ {
    move |_| EmbedError::InvalidSelector(selector.to_string())
}

impl HostDocument for WebDocument {
    fn body(&self) -> NodeId {
        self.body
    }

    fn head(&self) -> NodeId {
        self.head
    }

    fn query_document(&self, selector: &str) -> EmbedResult<Option<NodeId>> {
        let found = self
            .document
            .query_selector(selector)
            .map_err(invalid_selector(selector))?;
        Ok(found.map(|element| self.id_of(&element)))
    }

    fn query_within(&self, scope: NodeId, selector: &str) -> EmbedResult<Option<NodeId>> {
        let scope = self.node(scope)?;
        let found = select_first(&scope, selector).map_err(invalid_selector(selector))?;
        Ok(found.map(|element| self.id_of(&element)))
    }

    fn query_all_within(&self, scope: NodeId, selector: &str) -> EmbedResult<Vec<NodeId>> {
        let scope = self.node(scope)?;
        let Some(list) = select_all(&scope, selector).map_err(invalid_selector(selector))? else {
            return Ok(Vec::new());
        };
        Ok((0..list.length())
            .filter_map(|i| list.item(i))
            .map(|node| self.id_of(&node))
            .collect())
    }

    fn matches(&self, node: NodeId, selector: &str) -> EmbedResult<bool> {
        match self.node(node)?.dyn_ref::<Element>() {
            Some(element) => element.matches(selector).map_err(invalid_selector(selector)),
            None => Ok(false),
        }
    }

    fn create_element(&self, tag: &str) -> EmbedResult<NodeId> {
        let element = self.document.create_element(tag).map_err(js_error)?;
        Ok(self.id_of(&element))
    }

    fn append_child(&self, parent: NodeId, child: NodeId) -> EmbedResult<()> {
        let parent = self.node(parent)?;
        let child = self.node(child)?;
        parent.append_child(&child).map_err(js_error)?;
        Ok(())
    }

    fn remove(&self, node: NodeId) -> EmbedResult<()> {
        let node = self.node(node)?;
        if let Some(parent) = node.parent_node() {
            parent.remove_child(&node).map_err(js_error)?;
        }
        self.forget_subtree(&node);
        Ok(())
    }

    fn clear_children(&self, node: NodeId) -> EmbedResult<()> {
        let node = self.node(node)?;
        while let Some(child) = node.first_child() {
            node.remove_child(&child).map_err(js_error)?;
        }
        Ok(())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.node(node).ok()?.parent_node()?;
        Some(self.id_of(&parent))
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.node(node).is_ok_and(|node| node.is_connected())
    }

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node).ok()?.get_attribute(name)
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> EmbedResult<()> {
        self.element(node)?
            .set_attribute(name, value)
            .map_err(js_error)
    }

    fn remove_attribute(&self, node: NodeId, name: &str) -> EmbedResult<()> {
        self.element(node)?.remove_attribute(name).map_err(js_error)
    }

    fn text_content(&self, node: NodeId) -> String {
        self.node(node)
            .ok()
            .and_then(|node| node.text_content())
            .unwrap_or_default()
    }

    fn set_text_content(&self, node: NodeId, text: &str) -> EmbedResult<()> {
        self.node(node)?.set_text_content(Some(text));
        Ok(())
    }

    fn host_of(&self, root: NodeId) -> Option<NodeId> {
        let host = self.node(root).ok()?.dyn_into::<ShadowRoot>().ok()?.host();
        let host: &Node = host.as_ref();
        Some(self.id_of(host))
    }

    fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        let root = self.element(host).ok()?.shadow_root()?;
        let root: &Node = root.as_ref();
        Some(self.id_of(root))
    }

    /// Browsers cannot replace a shadow root, so an existing one is emptied and reused.
    fn attach_shadow(&self, host: NodeId) -> EmbedResult<NodeId> {
        let element = self.element(host)?;
        if let Some(existing) = element.shadow_root() {
            let existing: &Node = existing.as_ref();
            let id = self.id_of(existing);
            self.clear_children(id)?;
            return Ok(id);
        }
        let root = element
            .attach_shadow(&ShadowRootInit::new(ShadowRootMode::Open))
            .map_err(js_error)?;
        let root: &Node = root.as_ref();
        Ok(self.id_of(root))
    }

    fn detach_shadow(&self, host: NodeId) -> EmbedResult<()> {
        if let Some(root) = self.shadow_root(host) {
            self.clear_children(root)?;
        }
        self.prune();
        Ok(())
    }

    fn computed_style(&self, node: NodeId) -> EmbedResult<ComputedStyle> {
        let element = self.element(node)?;
        let unavailable = |reason: String| EmbedError::StyleUnavailable(reason);
        let declaration = self
            .window
            .get_computed_style(&element)
            .map_err(|e| unavailable(format!("{e:?}")))?
            .ok_or_else(|| unavailable(format!("no computed style for {node}")))?;
        let read = |property: &str| {
            declaration
                .get_property_value(property)
                .map_err(|e| unavailable(format!("{property}: {e:?}")))
        };
        Ok(ComputedStyle {
            font_family: read("font-family")?,
            color: read("color")?,
            background_color: read("background-color")?,
        })
    }

    fn add_click_listener(&self, node: NodeId, handler: ClickHandler) -> EmbedResult<ListenerId> {
        let target = self.node(node)?;
        let me = self.me.clone();
        let closure = ClickClosure::new(move |event: Event| {
            let Some(document) = me.upgrade() else {
                return;
            };
            let Some(clicked) = event.target().and_then(|t| t.dyn_into::<Node>().ok()) else {
                return;
            };
            let click = ClickEvent::new(document.id_of(&clicked), node);
            handler(&click);
            if click.default_prevented() {
                event.prevent_default();
            }
        });
        target
            .add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())
            .map_err(js_error)?;

        let id = ListenerId(self.next_handle());
        self.listeners.borrow_mut().insert(
            id,
            Listener {
                node: target,
                closure,
            },
        );
        Ok(id)
    }

    fn remove_listener(&self, listener: ListenerId) {
        let Some(Listener { node, closure }) = self.listeners.borrow_mut().remove(&listener)
        else {
            return;
        };
        let _ = node.remove_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        release_later(closure);
    }

    fn observe_subtree(&self, root: NodeId, callback: MutationCallback) -> EmbedResult<ObserverId> {
        let target = self.node(root)?;
        let me = self.me.clone();
        let closure = MutationClosure::new(move |records: js_sys::Array, _observer| {
            // 被换掉的节点不再持有
            if let Some(document) = me.upgrade() {
                for node in detached_nodes(&records) {
                    document.forget_subtree(&node);
                }
            }
            callback();
        });
        let observer = MutationObserver::new(closure.as_ref().unchecked_ref()).map_err(js_error)?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        observer
            .observe_with_options(&target, &init)
            .map_err(js_error)?;

        let id = ObserverId(self.next_handle());
        self.observers
            .borrow_mut()
            .insert(id, Observer { observer, closure });
        Ok(id)
    }

    fn disconnect(&self, observer: ObserverId) {
        let Some(Observer { observer, closure }) = self.observers.borrow_mut().remove(&observer)
        else {
            return;
        };
        observer.disconnect();
        release_later(closure);
    }
}
