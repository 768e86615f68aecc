//! Page-wide transport extension registry

use std::cell::OnceCell;

use mf_embed_core::error::EmbedResult;
use mf_embed_core::traits::{Transport, TransportExtension};

/// Registers the engine's transport extension at most once per page.
///
/// Embedders sharing a page share one registry; a failed registration leaves
/// the slot empty so the next initialization retries.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    installed: OnceCell<()>,
}

impl ExtensionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the extension built by `build` unless it is already installed.
    ///
    /// Returns `true` when this call installed it.
    pub fn ensure_installed(
        &self,
        transport: &dyn Transport,
        build: impl FnOnce() -> TransportExtension,
    ) -> EmbedResult<bool> {
        if self.installed.get().is_some() {
            return Ok(false);
        }
        let extension = build();
        let name = extension.name.clone();
        transport.define_extension(extension)?;
        // Cannot already be set: single-threaded and checked above.
        let _ = self.installed.set(());
        log::info!("Transport extension '{name}' installed");
        Ok(true)
    }

    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installed.get().is_some()
    }
}
