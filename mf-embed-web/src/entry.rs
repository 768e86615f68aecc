//! JavaScript entry points
//!
//! One `Embedder` serves the whole page; it is created on first use.

use std::cell::RefCell;
use std::rc::Rc;

use mf_embed_app::{Embedder, EmbedderBuilder};
use mf_embed_core::error::EmbedError;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::htmx_transport::HtmxTransport;
use crate::script_loader::HtmxScriptLoader;
use crate::web_document::WebDocument;

thread_local! {
    static EMBEDDER: RefCell<Option<Rc<Embedder>>> = const { RefCell::new(None) };
}

fn to_js(e: &EmbedError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn embedder() -> Result<Rc<Embedder>, JsValue> {
    EMBEDDER.with(|slot| {
        if let Some(embedder) = slot.borrow().as_ref() {
            return Ok(Rc::clone(embedder));
        }

        console_error_panic_hook::set_once();
        // 已有 logger 时沿用页面的设置
        let _ = console_log::init_with_level(log::Level::Info);

        let document = WebDocument::new().map_err(|e| to_js(&e))?;
        let transport = Rc::new(HtmxTransport::new(Rc::clone(&document)));
        let loader = Rc::new(HtmxScriptLoader::new(transport.clone()));
        let embedder = EmbedderBuilder::new()
            .document(document)
            .transport(transport)
            .loader(loader)
            .build()
            .map_err(|e| to_js(&e))?;

        let embedder = Rc::new(embedder);
        *slot.borrow_mut() = Some(Rc::clone(&embedder));
        Ok(embedder)
    })
}

/// JSON text of the host options object (`{}` when omitted)
fn options_json(options: &JsValue) -> Result<String, JsValue> {
    if options.is_undefined() || options.is_null() {
        return Ok("{}".to_string());
    }
    js_sys::JSON::stringify(options)?
        .as_string()
        .ok_or_else(|| JsValue::from_str("options are not JSON-serializable"))
}

/// Page-level handle exported to JavaScript as `MicroFrontend`
#[wasm_bindgen]
pub struct MicroFrontend;

#[wasm_bindgen]
impl MicroFrontend {
    /// Mount a widget. Resolves to `true` once mounted, `false` when the
    /// initialization failed (the reason is logged to the console).
    pub fn init(options: JsValue) -> js_sys::Promise {
        future_to_promise(async move {
            let embedder = embedder()?;
            let json = options_json(&options)?;
            match embedder.init_json(&json).await {
                Ok(_) => Ok(JsValue::TRUE),
                Err(e) => {
                    e.report("Embed initialization failed");
                    Ok(JsValue::FALSE)
                }
            }
        })
    }

    /// Unmount the widget on `target` (the modal anchor when omitted)
    pub fn destroy(target: Option<String>) -> bool {
        let Ok(embedder) = embedder() else {
            return false;
        };
        match embedder.destroy(target.as_deref()) {
            Ok(destroyed) => destroyed,
            Err(e) => {
                e.report("Embed teardown failed");
                false
            }
        }
    }

    /// Unmount every widget on the page; returns how many were mounted
    #[wasm_bindgen(js_name = destroyAll)]
    pub fn destroy_all() -> usize {
        let Ok(embedder) = embedder() else {
            return 0;
        };
        embedder.destroy_all().unwrap_or_else(|e| {
            e.report("Embed teardown failed");
            0
        })
    }
}
