//! Micro-frontend Embed Core Library
//!
//! Provides the embedding orchestration engine for the micro-frontend loader, including:
//! - Configuration resolution (Config Resolver)
//! - Isolation boundary lifecycle (Boundary Manager)
//! - Keyword detection and adaptive theming
//! - Presentation modes and DOM normalization passes
//!
//! This library is designed to be platform-independent, abstracting the host page and the
//! fetch/render library through traits, and runs both in the browser (wasm) and headless.

#[cfg(any(test, feature = "test-utils"))]
pub mod dom;
pub mod error;
pub mod services;
pub mod traits;
pub mod types;
pub mod utils;

#[cfg(test)]
mod test_utils;

// Re-export common types
#[cfg(any(test, feature = "test-utils"))]
pub use dom::InMemoryDocument;
pub use error::{EmbedError, EmbedResult};
pub use services::ServiceContext;
pub use traits::{HostDocument, NodeId, Transport};
