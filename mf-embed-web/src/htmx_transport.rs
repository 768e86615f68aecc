//! `Transport` backed by the page's global `htmx`

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use js_sys::Reflect;
use mf_embed_core::error::{EmbedError, EmbedResult};
use mf_embed_core::traits::{NodeId, ProcessOptions, Transport, TransportExtension};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, Node};

use crate::web_document::{js_error, WebDocument};

const BEFORE_PROCESS_NODE: &str = "htmx:beforeProcessNode";
const LOAD_EVENT: &str = "htmx:load";

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = htmx, js_name = process)]
    fn htmx_process(element: &Element, options: &js_sys::Object) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = htmx, js_name = defineExtension)]
    fn htmx_define_extension(name: &str, extension: &js_sys::Object) -> Result<(), JsValue>;
}

/// `evt.detail.elt` of an htmx event
fn event_element(event: &Event) -> Option<Node> {
    let detail = Reflect::get(event, &"detail".into()).ok()?;
    Reflect::get(&detail, &"elt".into()).ok()?.dyn_into::<Node>().ok()
}

struct LoadWatcher {
    element: Element,
    closure: Closure<dyn FnMut(Event)>,
}

impl LoadWatcher {
    fn unlisten(self) {
        let _ = self
            .element
            .remove_event_listener_with_callback(LOAD_EVENT, self.closure.as_ref().unchecked_ref());
        // 回调可能正在执行
        wasm_bindgen_futures::spawn_local(async move { drop(self.closure) });
    }
}

/// htmx 1.x transport
pub struct HtmxTransport {
    document: Rc<WebDocument>,
    /// `htmx:load` listeners, one per processed element
    load_watchers: RefCell<HashMap<NodeId, LoadWatcher>>,
}

impl HtmxTransport {
    pub fn new(document: Rc<WebDocument>) -> Self {
        Self {
            document,
            load_watchers: RefCell::new(HashMap::new()),
        }
    }

    /// Report nodes htmx inserts below `element` to `on_new_node`
    fn watch_loads(
        &self,
        node: NodeId,
        element: &Element,
        on_new_node: Rc<dyn Fn(NodeId)>,
    ) -> EmbedResult<()> {
        if self.load_watchers.borrow().contains_key(&node) {
            return Ok(());
        }
        let document: Weak<WebDocument> = Rc::downgrade(&self.document);
        let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let Some(document) = document.upgrade() else {
                return;
            };
            let Some(inserted) = event
                .target()
                .and_then(|t| t.dyn_into::<Element>().ok())
            else {
                return;
            };
            let inserted: &Node = inserted.as_ref();
            on_new_node(document.id_of(inserted));
        });
        element
            .add_event_listener_with_callback(LOAD_EVENT, closure.as_ref().unchecked_ref())
            .map_err(js_error)?;
        self.load_watchers.borrow_mut().insert(
            node,
            LoadWatcher {
                element: element.clone(),
                closure,
            },
        );
        Ok(())
    }

    /// Drop watchers whose element htmx or the page has swapped out
    fn sweep(&self) {
        let gone: Vec<LoadWatcher> = {
            let mut watchers = self.load_watchers.borrow_mut();
            let stale: Vec<NodeId> = watchers
                .iter()
                .filter(|(_, watcher)| !watcher.element.is_connected())
                .map(|(node, _)| *node)
                .collect();
            stale.iter().filter_map(|node| watchers.remove(node)).collect()
        };
        if !gone.is_empty() {
            log::trace!("Dropped {} stale load watcher(s)", gone.len());
        }
        gone.into_iter().for_each(LoadWatcher::unlisten);
    }
}

impl Transport for HtmxTransport {
    fn is_available(&self) -> bool {
        Reflect::get(&js_sys::global(), &"htmx".into())
            .is_ok_and(|htmx| !htmx.is_undefined() && !htmx.is_null())
    }

    /// `options.root` is passed on as `{ root }`; `part:` targets inside it
    /// are rewritten by the registered extension.
    fn process(&self, node: NodeId, options: ProcessOptions) -> EmbedResult<()> {
        let element = self.document.element(node)?;
        self.sweep();
        if let Some(on_new_node) = options.on_new_node {
            self.watch_loads(node, &element, on_new_node)?;
        }
        let root = self.document.node(options.root)?;
        let scope = js_sys::Object::new();
        Reflect::set(&scope, &"root".into(), &root).map_err(js_error)?;
        log::trace!("htmx.process({node}) within {}", options.root);
        htmx_process(&element, &scope)
            .map_err(|e| EmbedError::TransportUnavailable(format!("{e:?}")))
    }

    fn release(&self, node: NodeId) {
        let watcher = self.load_watchers.borrow_mut().remove(&node);
        if let Some(watcher) = watcher {
            watcher.unlisten();
        }
    }

    fn define_extension(&self, extension: TransportExtension) -> EmbedResult<()> {
        let document: Weak<WebDocument> = Rc::downgrade(&self.document);
        let hook = extension.before_process_node;
        let on_event = Closure::<dyn FnMut(String, Event) -> bool>::new(
            move |name: String, event: Event| {
                if name != BEFORE_PROCESS_NODE {
                    return true;
                }
                if let (Some(document), Some(element)) = (document.upgrade(), event_element(&event)) {
                    hook(document.id_of(&element));
                }
                true
            },
        );

        let definition = js_sys::Object::new();
        // The extension lives as long as htmx does.
        Reflect::set(&definition, &"onEvent".into(), &on_event.into_js_value())
            .map_err(js_error)?;
        htmx_define_extension(&extension.name, &definition)
            .map_err(|e| EmbedError::TransportUnavailable(format!("{e:?}")))
    }
}
