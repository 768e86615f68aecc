//! Platform abstraction trait definitions

mod host_document;
mod transport;

pub use host_document::{
    closest, is_within, root_host, ClickEvent, ClickHandler, HostDocument, ListenerId, MutationCallback, NodeId,
    ObserverId,
};
pub use transport::{
    BeforeProcessHook, NewNodeCallback, ProcessOptions, Transport, TransportExtension,
};
