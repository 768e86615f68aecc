//! Isolation boundary lifecycle
//!
//! A boundary is the encapsulated root attached to a container plus
//! everything the engine registered for it: normalization observers, click
//! listeners and overlays appended to the host body. Tearing a boundary down
//! releases all of them before the root is discarded.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{EmbedError, EmbedResult};
use crate::services::ServiceContext;
use crate::traits::{ListenerId, NodeId, ObserverId};
use crate::types::markup::{EMBED_ROOT_ID, WRAPPER_ID};
use crate::types::EmbedConfig;

/// Overlay appended to the host body on behalf of a boundary
#[derive(Debug)]
struct OverlayEntry {
    node: NodeId,
    /// Element content is loaded into
    content: NodeId,
    observers: Vec<ObserverId>,
    listeners: Vec<ListenerId>,
}

/// One active isolation boundary
#[derive(Debug)]
pub struct IsolationBoundary {
    container: NodeId,
    root: NodeId,
    wrapper: NodeId,
    observers: RefCell<Vec<ObserverId>>,
    listeners: RefCell<Vec<ListenerId>>,
    /// Elements handed to the transport outside of overlays
    loads: RefCell<Vec<NodeId>>,
    overlays: RefCell<Vec<OverlayEntry>>,
    active: Cell<bool>,
}

impl IsolationBoundary {
    fn new(container: NodeId, root: NodeId, wrapper: NodeId) -> Self {
        Self {
            container,
            root,
            wrapper,
            observers: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
            loads: RefCell::new(Vec::new()),
            overlays: RefCell::new(Vec::new()),
            active: Cell::new(true),
        }
    }

    #[must_use]
    pub fn container(&self) -> NodeId {
        self.container
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Internal wrapper, sole child of the root
    #[must_use]
    pub fn wrapper(&self) -> NodeId {
        self.wrapper
    }

    /// `false` once the boundary has been torn down or replaced
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn track_observers(&self, observers: impl IntoIterator<Item = ObserverId>) {
        self.observers.borrow_mut().extend(observers);
    }

    pub fn track_listener(&self, listener: ListenerId) {
        self.listeners.borrow_mut().push(listener);
    }

    /// Remember that `node` was handed to the transport
    pub fn track_load(&self, node: NodeId) {
        let mut loads = self.loads.borrow_mut();
        if !loads.contains(&node) {
            loads.push(node);
        }
    }

    /// Register an overlay together with its content element and the
    /// observers and listeners owned by it
    pub fn track_overlay(
        &self,
        node: NodeId,
        content: NodeId,
        observers: impl IntoIterator<Item = ObserverId>,
        listeners: impl IntoIterator<Item = ListenerId>,
    ) {
        self.overlays.borrow_mut().push(OverlayEntry {
            node,
            content,
            observers: observers.into_iter().collect(),
            listeners: listeners.into_iter().collect(),
        });
    }

    /// Close one overlay: disconnect its observers, drop its listeners,
    /// release its content from the transport and remove it.
    ///
    /// Returns `false` when the overlay is not owned by this boundary.
    pub fn release_overlay(&self, ctx: &ServiceContext, node: NodeId) -> EmbedResult<bool> {
        let entry = {
            let mut overlays = self.overlays.borrow_mut();
            let Some(index) = overlays.iter().position(|entry| entry.node == node) else {
                return Ok(false);
            };
            overlays.remove(index)
        };
        release_entry(ctx, &entry)?;
        Ok(true)
    }

    /// Overlays currently open, oldest first
    #[must_use]
    pub fn overlays(&self) -> Vec<NodeId> {
        self.overlays.borrow().iter().map(|entry| entry.node).collect()
    }

    /// Observers owned by the boundary root and by every open overlay
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
            + self
                .overlays
                .borrow()
                .iter()
                .map(|entry| entry.observers.len())
                .sum::<usize>()
    }

    /// Release everything the boundary holds, then discard the root.
    ///
    /// Keeps going past failures; the first one is returned at the end.
    fn teardown(&self, ctx: &ServiceContext) -> EmbedResult<()> {
        self.active.set(false);
        let document = ctx.document();
        for observer in self.observers.borrow_mut().drain(..) {
            document.disconnect(observer);
        }
        for listener in self.listeners.borrow_mut().drain(..) {
            document.remove_listener(listener);
        }
        for node in self.loads.borrow_mut().drain(..) {
            ctx.transport().release(node);
        }

        let mut first_error = None;
        let overlays = std::mem::take(&mut *self.overlays.borrow_mut());
        for entry in &overlays {
            if let Err(e) = release_entry(ctx, entry) {
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = document.detach_shadow(self.container) {
            first_error.get_or_insert(e);
        }
        first_error.map_or(Ok(()), Err)
    }
}

fn release_entry(ctx: &ServiceContext, entry: &OverlayEntry) -> EmbedResult<()> {
    let document = ctx.document();
    for observer in &entry.observers {
        document.disconnect(*observer);
    }
    for listener in &entry.listeners {
        document.remove_listener(*listener);
    }
    ctx.transport().release(entry.content);
    match document.remove(entry.node) {
        // 已被页面移除
        Ok(()) | Err(EmbedError::NodeNotFound(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Boundary manager - at most one active boundary per container
pub struct BoundaryManager {
    ctx: Rc<ServiceContext>,
    boundaries: RefCell<HashMap<NodeId, Rc<IsolationBoundary>>>,
}

impl BoundaryManager {
    #[must_use]
    pub fn new(ctx: Rc<ServiceContext>) -> Self {
        Self {
            ctx,
            boundaries: RefCell::new(HashMap::new()),
        }
    }

    /// Find the container for a configuration.
    ///
    /// With a `target` the selector must match a host element. A modal main
    /// view without target gets an anchor element on the body, reused across
    /// initializations.
    pub fn locate_container(&self, config: &EmbedConfig) -> EmbedResult<NodeId> {
        let document = self.ctx.document();
        if let Some(target) = &config.target {
            return document
                .query_document(target)?
                .ok_or_else(|| EmbedError::TargetNotFound(target.clone()));
        }

        if let Some(anchor) = document.query_document(&format!("#{EMBED_ROOT_ID}"))? {
            return Ok(anchor);
        }
        let anchor = document.create_element("div")?;
        document.set_attribute(anchor, "id", EMBED_ROOT_ID)?;
        document.append_child(document.body(), anchor)?;
        log::debug!("Created embed anchor {anchor}");
        Ok(anchor)
    }

    /// Create a fresh boundary on `container`, tearing down any previous one
    pub fn create(&self, container: NodeId) -> EmbedResult<Rc<IsolationBoundary>> {
        let document = self.ctx.document();
        self.teardown(container)?;

        // A root left behind by an earlier page script is discarded too.
        if document.shadow_root(container).is_some() {
            document.detach_shadow(container)?;
        }
        document.clear_children(container)?;

        let root = document.attach_shadow(container)?;
        let wrapper = document.create_element("div")?;
        document.set_attribute(wrapper, "id", WRAPPER_ID)?;
        document.append_child(root, wrapper)?;

        let boundary = Rc::new(IsolationBoundary::new(container, root, wrapper));
        self.boundaries
            .borrow_mut()
            .insert(container, Rc::clone(&boundary));
        log::info!("Isolation boundary created on {container} (root {root})");
        Ok(boundary)
    }

    /// Tear down the boundary held for `container`.
    ///
    /// Returns `false` when no boundary was active there.
    pub fn teardown(&self, container: NodeId) -> EmbedResult<bool> {
        let Some(boundary) = self.boundaries.borrow_mut().remove(&container) else {
            return Ok(false);
        };
        boundary.teardown(&self.ctx)?;
        log::info!("Isolation boundary on {container} torn down");
        Ok(true)
    }

    /// Tear down every boundary, continuing past failures.
    ///
    /// Returns how many were active, or the first failure once all are gone.
    pub fn teardown_all(&self) -> EmbedResult<usize> {
        let containers: Vec<NodeId> = self.boundaries.borrow().keys().copied().collect();
        let mut count = 0;
        let mut first_error = None;
        for container in containers {
            match self.teardown(container) {
                Ok(true) => count += 1,
                Ok(false) => {}
                Err(e) => {
                    count += 1;
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(count), Err)
    }

    /// Active boundary of `container`
    #[must_use]
    pub fn active(&self, container: NodeId) -> Option<Rc<IsolationBoundary>> {
        self.boundaries.borrow().get(&container).cloned()
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.boundaries.borrow().len()
    }
}
