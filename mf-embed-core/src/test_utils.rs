//! 测试辅助模块
//!
//! 提供 mock 实现和便捷的测试工厂方法。

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::dom::InMemoryDocument;
use crate::error::{EmbedError, EmbedResult};
use crate::services::{ConfigResolver, ServiceContext};
use crate::traits::{NewNodeCallback, NodeId, ProcessOptions, Transport, TransportExtension};
use crate::types::{EmbedConfig, EmbedOptions};

// ===== RecordingTransport =====

/// Transport that records processing calls instead of fetching
pub struct RecordingTransport {
    available: Cell<bool>,
    /// 如果 Some，process 时返回此错误
    process_error: RefCell<Option<String>>,
    /// (node, root, had new-node callback)
    processed: RefCell<Vec<(NodeId, NodeId, bool)>>,
    callbacks: RefCell<Vec<(NodeId, NewNodeCallback)>>,
    extensions: RefCell<Vec<TransportExtension>>,
    released: RefCell<Vec<NodeId>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            available: Cell::new(true),
            process_error: RefCell::new(None),
            processed: RefCell::new(Vec::new()),
            callbacks: RefCell::new(Vec::new()),
            extensions: RefCell::new(Vec::new()),
            released: RefCell::new(Vec::new()),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }

    pub fn set_process_error(&self, err: Option<&str>) {
        *self.process_error.borrow_mut() = err.map(str::to_string);
    }

    pub fn processed(&self) -> Vec<(NodeId, NodeId, bool)> {
        self.processed.borrow().clone()
    }

    pub fn processed_nodes(&self) -> Vec<NodeId> {
        self.processed.borrow().iter().map(|(node, _, _)| *node).collect()
    }

    pub fn released(&self) -> Vec<NodeId> {
        self.released.borrow().clone()
    }

    pub fn extension_names(&self) -> Vec<String> {
        self.extensions
            .borrow()
            .iter()
            .map(|ext| ext.name.clone())
            .collect()
    }

    /// Run every registered extension hook on `node`
    pub fn run_extensions(&self, node: NodeId) {
        let hooks: Vec<_> = self
            .extensions
            .borrow()
            .iter()
            .map(|ext| Rc::clone(&ext.before_process_node))
            .collect();
        for hook in hooks {
            hook(node);
        }
    }

    /// Simulate a response inserting `new_node` under the processed `element`
    pub fn notify_new_node(&self, element: NodeId, new_node: NodeId) {
        let callbacks: Vec<NewNodeCallback> = self
            .callbacks
            .borrow()
            .iter()
            .filter(|(owner, _)| *owner == element)
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(new_node);
        }
    }
}

impl Transport for RecordingTransport {
    fn is_available(&self) -> bool {
        self.available.get()
    }

    fn process(&self, node: NodeId, options: ProcessOptions) -> EmbedResult<()> {
        if let Some(ref msg) = *self.process_error.borrow() {
            return Err(EmbedError::TransportUnavailable(msg.clone()));
        }
        self.processed
            .borrow_mut()
            .push((node, options.root, options.on_new_node.is_some()));
        if let Some(callback) = options.on_new_node {
            self.callbacks.borrow_mut().push((node, callback));
        }
        Ok(())
    }

    fn define_extension(&self, extension: TransportExtension) -> EmbedResult<()> {
        self.extensions.borrow_mut().push(extension);
        Ok(())
    }

    fn release(&self, node: NodeId) {
        self.callbacks.borrow_mut().retain(|(owner, _)| *owner != node);
        self.released.borrow_mut().push(node);
    }
}

// ===== Test Factory =====

pub struct TestEnv {
    pub doc: Rc<InMemoryDocument>,
    pub transport: Rc<RecordingTransport>,
    pub ctx: Rc<ServiceContext>,
}

/// 创建测试用的 `ServiceContext`
pub fn create_test_context() -> TestEnv {
    let doc = Rc::new(InMemoryDocument::new());
    let transport = Rc::new(RecordingTransport::new());
    let ctx = Rc::new(ServiceContext::new(doc.clone(), transport.clone()));
    TestEnv {
        doc,
        transport,
        ctx,
    }
}

/// Resolved configuration for an inline main view on `target`
pub fn inline_config(target: &str) -> EmbedConfig {
    config_with(EmbedOptions {
        target: Some(target.to_string()),
        ..Default::default()
    })
}

pub fn config_with(options: EmbedOptions) -> EmbedConfig {
    ConfigResolver::resolve(&options).unwrap()
}
