//! Browser bindings for the mf-embed micro-frontend loader.
//!
//! Compiled to wasm and loaded by host pages. Exposes `MicroFrontend.init(options)`
//! and `MicroFrontend.destroy(target)` to JavaScript and wires the engine to the live DOM
//! (`WebDocument`) and to htmx (`HtmxTransport`, `HtmxScriptLoader`).
//!
//! On other targets only the platform-independent pieces are built.

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub mod htmx_transport;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub mod script_loader;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub mod web_document;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
mod entry;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub use entry::MicroFrontend;

/// Pinned htmx build injected when the page has none
pub const HTMX_SCRIPT_URL: &str = "https://unpkg.com/htmx.org@1.9.2";
