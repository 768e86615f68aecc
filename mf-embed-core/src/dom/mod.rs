//! In-memory host document
//!
//! A headless [`HostDocument`] used by tests and non-browser hosts. It models
//! the parts of the DOM the engine relies on: an element tree with
//! attributes and text, open encapsulated roots, computed styles set by the
//! caller, bubbling click listeners and subtree mutation observers with
//! explicit delivery through [`InMemoryDocument::flush_mutations`].

mod selector;

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::error::{EmbedError, EmbedResult};
use crate::traits::{
    ClickEvent, ClickHandler, HostDocument, ListenerId, MutationCallback, NodeId, ObserverId,
};
use crate::types::ComputedStyle;

use selector::{ElementView, SelectorList};

/// Upper bound of delivery rounds per flush; callbacks that keep mutating stop here
const MAX_FLUSH_ROUNDS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Document,
    Element(String),
    ShadowRoot { host: NodeId },
}

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    attributes: BTreeMap<String, String>,
    text: String,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    shadow: Option<NodeId>,
    style: ComputedStyle,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attributes: BTreeMap::new(),
            text: String::new(),
            children: Vec::new(),
            parent: None,
            shadow: None,
            style: ComputedStyle::default(),
        }
    }
}

impl ElementView for NodeData {
    fn tag(&self) -> &str {
        match &self.kind {
            NodeKind::Element(tag) => tag,
            NodeKind::Document => "#document",
            NodeKind::ShadowRoot { .. } => "#shadow-root",
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Node arena, indexed by `NodeId`; discarded nodes leave a `None` slot
#[derive(Debug, Default)]
struct Tree {
    nodes: Vec<Option<NodeData>>,
}

impl Tree {
    fn insert(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Some(data));
        NodeId((self.nodes.len() - 1) as u64)
    }

    fn get(&self, id: NodeId) -> EmbedResult<&NodeData> {
        usize::try_from(id.0)
            .ok()
            .and_then(|index| self.nodes.get(index))
            .and_then(Option::as_ref)
            .ok_or(EmbedError::NodeNotFound(id))
    }

    fn get_mut(&mut self, id: NodeId) -> EmbedResult<&mut NodeData> {
        usize::try_from(id.0)
            .ok()
            .and_then(|index| self.nodes.get_mut(index))
            .and_then(Option::as_mut)
            .ok_or(EmbedError::NodeNotFound(id))
    }

    fn element(&self, id: NodeId) -> EmbedResult<&NodeData> {
        let node = self.get(id)?;
        match node.kind {
            NodeKind::Element(_) => Ok(node),
            _ => Err(EmbedError::Dom(format!("{id} is not an element"))),
        }
    }

    fn detach(&mut self, id: NodeId) -> EmbedResult<Option<NodeId>> {
        let parent = self.get_mut(id)?.parent.take();
        if let Some(parent) = parent {
            self.get_mut(parent)?.children.retain(|child| *child != id);
        }
        Ok(parent)
    }

    /// Drop `id` and its whole subtree (including nested roots) from the arena
    fn discard(&mut self, id: NodeId) {
        let Ok(index) = usize::try_from(id.0) else {
            return;
        };
        let Some(node) = self.nodes.get_mut(index).and_then(Option::take) else {
            return;
        };
        for child in node.children {
            self.discard(child);
        }
        if let Some(shadow) = node.shadow {
            self.discard(shadow);
        }
    }

    /// `id` followed by its light-DOM ancestors (encapsulated roots end the walk)
    fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            chain.push(node);
            current = self.get(node).ok().and_then(|data| data.parent);
        }
        chain
    }

    /// Descendants of `scope` in document order, without entering encapsulated roots
    fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self
            .get(scope)
            .map(|data| data.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(node) = stack.pop() {
            out.push(node);
            if let Ok(data) = self.get(node) {
                stack.extend(data.children.iter().rev().copied());
            }
        }
        out
    }

    fn text_of(&self, id: NodeId, out: &mut String) {
        if let Ok(node) = self.get(id) {
            out.push_str(&node.text);
            for child in &node.children {
                self.text_of(*child, out);
            }
        }
    }
}

/// Headless host document
pub struct InMemoryDocument {
    tree: RefCell<Tree>,
    document: NodeId,
    head: NodeId,
    body: NodeId,
    listeners: RefCell<BTreeMap<ListenerId, (NodeId, ClickHandler)>>,
    observers: RefCell<BTreeMap<ObserverId, (NodeId, MutationCallback)>>,
    pending: RefCell<BTreeSet<ObserverId>>,
    next_handle: Cell<u64>,
    style_failure: RefCell<Option<String>>,
    observer_failure: RefCell<Option<String>>,
}

impl Default for InMemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocument {
    /// Create an empty `html > (head, body)` document
    #[must_use]
    pub fn new() -> Self {
        let mut tree = Tree::default();
        let document = tree.insert(NodeData::new(NodeKind::Document));
        let html = tree.insert(NodeData::new(NodeKind::Element("html".to_string())));
        let head = tree.insert(NodeData::new(NodeKind::Element("head".to_string())));
        let body = tree.insert(NodeData::new(NodeKind::Element("body".to_string())));
        for (parent, child) in [(document, html), (html, head), (html, body)] {
            if let Ok(data) = tree.get_mut(parent) {
                data.children.push(child);
            }
            if let Ok(data) = tree.get_mut(child) {
                data.parent = Some(parent);
            }
        }

        Self {
            tree: RefCell::new(tree),
            document,
            head,
            body,
            listeners: RefCell::new(BTreeMap::new()),
            observers: RefCell::new(BTreeMap::new()),
            pending: RefCell::new(BTreeSet::new()),
            next_handle: Cell::new(1),
            style_failure: RefCell::new(None),
            observer_failure: RefCell::new(None),
        }
    }

    fn next_handle(&self) -> u64 {
        let handle = self.next_handle.get();
        self.next_handle.set(handle + 1);
        handle
    }

    /// Queue every observer whose root contains `target`
    fn record_mutation(&self, target: NodeId) {
        let chain = self.tree.borrow().ancestors(target);
        let observers = self.observers.borrow();
        let mut pending = self.pending.borrow_mut();
        for (id, (root, _)) in observers.iter() {
            if chain.contains(root) {
                pending.insert(*id);
            }
        }
    }

    // ===== Setup helpers =====

    /// Create an element with attributes and append it to `parent`
    pub fn append_element(
        &self,
        parent: NodeId,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> EmbedResult<NodeId> {
        let node = self.create_element(tag)?;
        {
            let mut tree = self.tree.borrow_mut();
            let data = tree.get_mut(node)?;
            for (name, value) in attributes {
                data.attributes.insert((*name).to_string(), (*value).to_string());
            }
        }
        self.append_child(parent, node)?;
        Ok(node)
    }

    /// Set the computed style reported for `node`
    pub fn set_computed_style(&self, node: NodeId, style: ComputedStyle) -> EmbedResult<()> {
        self.tree.borrow_mut().get_mut(node)?.style = style;
        Ok(())
    }

    /// Make every `computed_style` call fail with the given reason (`None` restores)
    pub fn fail_computed_styles(&self, reason: Option<&str>) {
        *self.style_failure.borrow_mut() = reason.map(str::to_string);
    }

    /// Make every `observe_subtree` call fail with the given reason (`None` restores)
    pub fn fail_observers(&self, reason: Option<&str>) {
        *self.observer_failure.borrow_mut() = reason.map(str::to_string);
    }

    /// Remove `node` the way a host script would and let it be collected:
    /// later lookups of it or its subtree report `NodeNotFound`.
    pub fn discard(&self, node: NodeId) -> EmbedResult<()> {
        self.remove(node)?;
        self.tree.borrow_mut().discard(node);
        Ok(())
    }

    /// Element children of `node` (light DOM)
    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.tree
            .borrow()
            .get(node)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    /// Lower-case tag name, `None` for non-elements and discarded nodes
    #[must_use]
    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        match &self.tree.borrow().get(node).ok()?.kind {
            NodeKind::Element(tag) => Some(tag.clone()),
            _ => None,
        }
    }

    /// Whether `node` still exists in the arena
    #[must_use]
    pub fn exists(&self, node: NodeId) -> bool {
        self.tree.borrow().get(node).is_ok()
    }

    // ===== Event simulation =====

    /// Dispatch a click on `target`, bubbling through ancestors and out of
    /// encapsulated roots to their hosts. Returns whether a listener called
    /// `prevent_default`.
    pub fn click(&self, target: NodeId) -> EmbedResult<bool> {
        let path = {
            let tree = self.tree.borrow();
            tree.element(target)?;
            let mut path = Vec::new();
            let mut current = Some(target);
            while let Some(node) = current {
                path.push(node);
                current = match tree.get(node).map(|data| (&data.kind, data.parent)) {
                    Ok((NodeKind::ShadowRoot { host }, _)) => Some(*host),
                    Ok((_, parent)) => parent,
                    Err(_) => None,
                };
            }
            path
        };

        let mut prevented = false;
        for node in path {
            let handlers: Vec<ClickHandler> = self
                .listeners
                .borrow()
                .values()
                .filter(|(owner, _)| *owner == node)
                .map(|(_, handler)| Rc::clone(handler))
                .collect();
            for handler in handlers {
                let event = ClickEvent::new(target, node);
                handler(&event);
                prevented |= event.default_prevented();
            }
        }
        Ok(prevented)
    }

    /// Deliver queued mutation records until no observer is pending.
    ///
    /// Returns the number of callback invocations.
    pub fn flush_mutations(&self) -> usize {
        let mut delivered = 0;
        for _ in 0..MAX_FLUSH_ROUNDS {
            let batch = std::mem::take(&mut *self.pending.borrow_mut());
            if batch.is_empty() {
                return delivered;
            }
            for id in batch {
                let callback = self
                    .observers
                    .borrow()
                    .get(&id)
                    .map(|(_, callback)| Rc::clone(callback));
                if let Some(callback) = callback {
                    callback();
                    delivered += 1;
                }
            }
        }
        log::warn!("Mutation delivery did not settle after {MAX_FLUSH_ROUNDS} rounds");
        delivered
    }

    /// Number of mutation records waiting for delivery
    #[must_use]
    pub fn pending_mutations(&self) -> usize {
        self.pending.borrow().len()
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl HostDocument for InMemoryDocument {
    fn body(&self) -> NodeId {
        self.body
    }

    fn head(&self) -> NodeId {
        self.head
    }

    fn query_document(&self, selector: &str) -> EmbedResult<Option<NodeId>> {
        self.query_within(self.document, selector)
    }

    fn query_within(&self, scope: NodeId, selector: &str) -> EmbedResult<Option<NodeId>> {
        Ok(self.query_all_within(scope, selector)?.into_iter().next())
    }

    fn query_all_within(&self, scope: NodeId, selector: &str) -> EmbedResult<Vec<NodeId>> {
        let selector = SelectorList::parse(selector)?;
        let tree = self.tree.borrow();
        tree.get(scope)?;
        Ok(tree
            .descendants(scope)
            .into_iter()
            .filter(|node| {
                tree.element(*node)
                    .is_ok_and(|data| selector.matches(data))
            })
            .collect())
    }

    fn matches(&self, node: NodeId, selector: &str) -> EmbedResult<bool> {
        let selector = SelectorList::parse(selector)?;
        let tree = self.tree.borrow();
        Ok(tree.element(node).is_ok_and(|data| selector.matches(data)))
    }

    fn create_element(&self, tag: &str) -> EmbedResult<NodeId> {
        let tag = tag.trim().to_ascii_lowercase();
        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(EmbedError::Dom(format!("Invalid tag name: {tag:?}")));
        }
        Ok(self
            .tree
            .borrow_mut()
            .insert(NodeData::new(NodeKind::Element(tag))))
    }

    fn append_child(&self, parent: NodeId, child: NodeId) -> EmbedResult<()> {
        let previous_parent = {
            let mut tree = self.tree.borrow_mut();
            tree.element(child)?;
            tree.get(parent)?;
            if tree.ancestors(parent).contains(&child) {
                return Err(EmbedError::Dom(format!(
                    "Cannot append {child} inside its own subtree"
                )));
            }
            let previous = tree.detach(child)?;
            tree.get_mut(parent)?.children.push(child);
            tree.get_mut(child)?.parent = Some(parent);
            previous
        };
        if let Some(previous) = previous_parent {
            self.record_mutation(previous);
        }
        self.record_mutation(parent);
        Ok(())
    }

    fn remove(&self, node: NodeId) -> EmbedResult<()> {
        let previous = self.tree.borrow_mut().detach(node)?;
        if let Some(previous) = previous {
            self.record_mutation(previous);
        }
        Ok(())
    }

    fn clear_children(&self, node: NodeId) -> EmbedResult<()> {
        let changed = {
            let mut tree = self.tree.borrow_mut();
            let data = tree.get_mut(node)?;
            let children = std::mem::take(&mut data.children);
            let had_text = !std::mem::take(&mut data.text).is_empty();
            let changed = had_text || !children.is_empty();
            for child in children {
                tree.get_mut(child)?.parent = None;
            }
            changed
        };
        if changed {
            self.record_mutation(node);
        }
        Ok(())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree.borrow().get(node).ok()?.parent
    }

    fn is_connected(&self, node: NodeId) -> bool {
        let tree = self.tree.borrow();
        let mut current = Some(node);
        while let Some(id) = current {
            let Ok(data) = tree.get(id) else {
                return false;
            };
            current = match data.kind {
                NodeKind::Document => return true,
                NodeKind::ShadowRoot { host } => Some(host),
                NodeKind::Element(_) => data.parent,
            };
        }
        false
    }

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.tree
            .borrow()
            .get(node)
            .ok()?
            .attributes
            .get(name)
            .cloned()
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> EmbedResult<()> {
        let mut tree = self.tree.borrow_mut();
        tree.element(node)?;
        tree.get_mut(node)?
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_attribute(&self, node: NodeId, name: &str) -> EmbedResult<()> {
        self.tree.borrow_mut().get_mut(node)?.attributes.remove(name);
        Ok(())
    }

    fn text_content(&self, node: NodeId) -> String {
        let mut text = String::new();
        self.tree.borrow().text_of(node, &mut text);
        text
    }

    fn set_text_content(&self, node: NodeId, text: &str) -> EmbedResult<()> {
        {
            let mut tree = self.tree.borrow_mut();
            let data = tree.get_mut(node)?;
            let children = std::mem::take(&mut data.children);
            data.text = text.to_string();
            for child in children {
                tree.get_mut(child)?.parent = None;
            }
        }
        self.record_mutation(node);
        Ok(())
    }

    fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.tree.borrow().get(host).ok()?.shadow
    }

    fn host_of(&self, root: NodeId) -> Option<NodeId> {
        match self.tree.borrow().get(root).ok()?.kind {
            NodeKind::ShadowRoot { host } => Some(host),
            _ => None,
        }
    }

    fn attach_shadow(&self, host: NodeId) -> EmbedResult<NodeId> {
        let mut tree = self.tree.borrow_mut();
        if tree.element(host)?.shadow.is_some() {
            return Err(EmbedError::Dom(format!("{host} already hosts a shadow root")));
        }
        let root = tree.insert(NodeData::new(NodeKind::ShadowRoot { host }));
        tree.get_mut(host)?.shadow = Some(root);
        Ok(root)
    }

    fn detach_shadow(&self, host: NodeId) -> EmbedResult<()> {
        let mut tree = self.tree.borrow_mut();
        if let Some(root) = tree.get_mut(host)?.shadow.take() {
            tree.discard(root);
        }
        Ok(())
    }

    fn computed_style(&self, node: NodeId) -> EmbedResult<ComputedStyle> {
        if let Some(reason) = self.style_failure.borrow().as_ref() {
            return Err(EmbedError::StyleUnavailable(reason.clone()));
        }
        Ok(self.tree.borrow().element(node)?.style.clone())
    }

    fn add_click_listener(&self, node: NodeId, handler: ClickHandler) -> EmbedResult<ListenerId> {
        self.tree.borrow().get(node)?;
        let id = ListenerId(self.next_handle());
        self.listeners.borrow_mut().insert(id, (node, handler));
        Ok(id)
    }

    fn remove_listener(&self, listener: ListenerId) {
        self.listeners.borrow_mut().remove(&listener);
    }

    fn observe_subtree(&self, root: NodeId, callback: MutationCallback) -> EmbedResult<ObserverId> {
        if let Some(reason) = self.observer_failure.borrow().as_ref() {
            return Err(EmbedError::Dom(reason.clone()));
        }
        self.tree.borrow().get(root)?;
        let id = ObserverId(self.next_handle());
        self.observers.borrow_mut().insert(id, (root, callback));
        Ok(id)
    }

    fn disconnect(&self, observer: ObserverId) {
        self.observers.borrow_mut().remove(&observer);
        self.pending.borrow_mut().remove(&observer);
    }
}
