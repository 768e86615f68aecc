//! Fetch/render transport abstraction Trait

use std::rc::Rc;

use crate::error::EmbedResult;

use super::NodeId;

/// Callback invoked for every element the transport inserts
pub type NewNodeCallback = Rc<dyn Fn(NodeId)>;

/// Hook run by an extension before the transport processes a node
pub type BeforeProcessHook = Rc<dyn Fn(NodeId)>;

/// Scope of a processing call
#[derive(Clone)]
pub struct ProcessOptions {
    /// Root that selector lookups made by the transport must resolve in
    pub root: NodeId,
    /// Invoked for each element node inserted by responses to this element
    pub on_new_node: Option<NewNodeCallback>,
}

impl ProcessOptions {
    #[must_use]
    pub fn scoped(root: NodeId) -> Self {
        Self {
            root,
            on_new_node: None,
        }
    }
}

/// Transport extension definition
#[derive(Clone)]
pub struct TransportExtension {
    pub name: String,
    pub before_process_node: BeforeProcessHook,
}

/// Declarative fetch/render transport Trait
///
/// The engine only writes directives onto elements and asks the transport to
/// activate them; fetching, swapping and history are the transport's business.
///
/// Platform implementations:
/// - Browser (wasm): `HtmxTransport`
pub trait Transport {
    /// Whether the transport library is loaded and usable
    fn is_available(&self) -> bool;

    /// Activate the directives of `node` (and its descendants) within `options.root`
    fn process(&self, node: NodeId, options: ProcessOptions) -> EmbedResult<()>;

    /// Register a named extension with the transport
    fn define_extension(&self, extension: TransportExtension) -> EmbedResult<()>;

    /// Forget everything kept for `node` by earlier `process` calls.
    ///
    /// Called when the node's session or overlay goes away.
    fn release(&self, _node: NodeId) {}
}
