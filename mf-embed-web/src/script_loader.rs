//! Loads htmx from a CDN when the host page does not ship it

use std::rc::Rc;

use async_trait::async_trait;
use js_sys::Promise;
use mf_embed_app::TransportLoader;
use mf_embed_core::error::{EmbedError, EmbedResult};
use mf_embed_core::traits::Transport;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlScriptElement;

use crate::web_document::js_error;
use crate::HTMX_SCRIPT_URL;

/// Injects a `<script>` for htmx and resolves once it has run
pub struct HtmxScriptLoader {
    transport: Rc<dyn Transport>,
    src: String,
}

impl HtmxScriptLoader {
    pub fn new(transport: Rc<dyn Transport>) -> Self {
        Self::with_source(transport, HTMX_SCRIPT_URL)
    }

    pub fn with_source(transport: Rc<dyn Transport>, src: impl Into<String>) -> Self {
        Self {
            transport,
            src: src.into(),
        }
    }
}

#[async_trait(?Send)]
impl TransportLoader for HtmxScriptLoader {
    async fn load(&self) -> EmbedResult<()> {
        if self.transport.is_available() {
            return Ok(());
        }

        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| EmbedError::Dom("no document".to_string()))?;
        let head = document
            .head()
            .ok_or_else(|| EmbedError::Dom("document has no <head>".to_string()))?;
        let script: HtmlScriptElement = document
            .create_element("script")
            .map_err(js_error)?
            .dyn_into()
            .map_err(|_| EmbedError::Dom("<script> is not a script element".to_string()))?;
        script.set_src(&self.src);

        let loaded = Promise::new(&mut |resolve, reject| {
            script.set_onload(Some(&resolve));
            script.set_onerror(Some(&reject));
        });
        head.append_child(&script).map_err(js_error)?;
        log::info!("Loading transport from {}", self.src);

        JsFuture::from(loaded)
            .await
            .map_err(|_| EmbedError::TransportUnavailable(format!("failed to load {}", self.src)))?;
        if self.transport.is_available() {
            Ok(())
        } else {
            Err(EmbedError::TransportUnavailable(format!(
                "{} loaded but htmx is not defined",
                self.src
            )))
        }
    }
}
