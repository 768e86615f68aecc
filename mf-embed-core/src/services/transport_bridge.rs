//! Transport bridge
//!
//! Declares fetch/render directives on elements and hands them to the
//! transport, scoped to the boundary root so that selector lookups made by
//! the transport resolve inside the encapsulated tree.

use std::rc::{Rc, Weak};

use crate::error::EmbedResult;
use crate::services::ServiceContext;
use crate::traits::{
    root_host, HostDocument, NewNodeCallback, NodeId, ProcessOptions, Transport,
    TransportExtension,
};
use crate::types::markup::{
    ATTR_HX_GET, ATTR_SHADOW_ROOT, ATTR_HX_SWAP, ATTR_HX_TARGET, ATTR_HX_TRIGGER, PART_TARGET_PREFIX,
    SHADOW_PARTS_EXTENSION, SWAP_INNER_HTML, TRIGGER_ON_LOAD,
};

/// Rewrite a `part:name` target into an attribute selector on `part`
#[must_use]
pub fn rewrite_part_target(value: &str) -> Option<String> {
    let name = value.trim().strip_prefix(PART_TARGET_PREFIX)?.trim();
    (!name.is_empty()).then(|| format!("[part=\"{name}\"]"))
}

/// Transport bridge
pub struct TransportBridge {
    ctx: Rc<ServiceContext>,
}

impl TransportBridge {
    #[must_use]
    pub fn new(ctx: Rc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Load `url` into `element` through the transport.
    ///
    /// Returns `Ok(false)` when the transport is unavailable or refused to
    /// process the element; both are logged, not raised. DOM failures while
    /// writing the directives are returned.
    pub fn load(&self, element: NodeId, url: &str, root: NodeId) -> EmbedResult<bool> {
        let transport = self.ctx.transport();
        if !transport.is_available() {
            log::warn!("Transport not available, skipping load of {url} into {element}");
            return Ok(false);
        }

        let document = self.ctx.document();
        document.set_attribute(element, ATTR_HX_GET, url)?;
        document.set_attribute(element, ATTR_HX_TRIGGER, TRIGGER_ON_LOAD)?;
        document.set_attribute(element, ATTR_HX_SWAP, SWAP_INNER_HTML)?;

        let options = ProcessOptions {
            root,
            on_new_node: Some(reprocess_callback(Rc::downgrade(&self.ctx.transport), root)),
        };
        match transport.process(element, options) {
            Ok(()) => {
                log::debug!("Loading {url} into {element}");
                Ok(true)
            }
            Err(e) => {
                e.report(&format!("Transport failed to process {element}"));
                Ok(false)
            }
        }
    }

    /// Extension rewriting `hx-target="part:name"` before nodes are processed.
    ///
    /// Rewritten nodes are stamped with the id of the container whose root
    /// they live in.
    #[must_use]
    pub fn shadow_parts_extension(&self) -> TransportExtension {
        let document: Weak<dyn HostDocument> = Rc::downgrade(&self.ctx.document);
        TransportExtension {
            name: SHADOW_PARTS_EXTENSION.to_string(),
            before_process_node: Rc::new(move |node| {
                let Some(document) = document.upgrade() else {
                    return;
                };
                if let Err(e) = rewrite_part_node(document.as_ref(), node) {
                    e.report("Rewriting part target failed");
                }
            }),
        }
    }
}

fn rewrite_part_node(document: &dyn HostDocument, node: NodeId) -> EmbedResult<()> {
    let Some(rewritten) = document
        .get_attribute(node, ATTR_HX_TARGET)
        .and_then(|target| rewrite_part_target(&target))
    else {
        return Ok(());
    };
    document.set_attribute(node, ATTR_HX_TARGET, &rewritten)?;
    let container_id = root_host(document, node)
        .and_then(|host| document.get_attribute(host, "id"))
        .filter(|id| !id.is_empty());
    if let Some(id) = container_id {
        document.set_attribute(node, ATTR_SHADOW_ROOT, &id)?;
    }
    Ok(())
}

/// Re-process every node the transport inserts, within the same root.
///
/// Holds the transport weakly: the callback is stored by the transport itself.
fn reprocess_callback(transport: Weak<dyn Transport>, root: NodeId) -> NewNodeCallback {
    Rc::new(move |node| {
        let Some(transport) = transport.upgrade() else {
            return;
        };
        if let Err(e) = transport.process(node, ProcessOptions::scoped(root)) {
            e.report(&format!("Re-processing inserted node {node} failed"));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_context, TestEnv};

    #[test]
    fn rewrites_part_targets() {
        assert_eq!(
            rewrite_part_target("part:results").as_deref(),
            Some("[part=\"results\"]")
        );
        assert_eq!(rewrite_part_target("#results"), None);
        assert_eq!(rewrite_part_target("part:  "), None);
    }

    #[test]
    fn load_writes_directives_and_processes_in_root() {
        let TestEnv {
            doc, transport, ctx, ..
        } = create_test_context();
        let root_host = doc.append_element(doc.body(), "div", &[]).unwrap();
        let root = doc.attach_shadow(root_host).unwrap();
        let mount = doc.append_element(root, "div", &[]).unwrap();

        let bridge = TransportBridge::new(ctx);
        assert!(bridge.load(mount, "http://a/search?keyword=ai", root).unwrap());

        assert_eq!(
            doc.get_attribute(mount, "hx-get").as_deref(),
            Some("http://a/search?keyword=ai")
        );
        assert_eq!(doc.get_attribute(mount, "hx-trigger").as_deref(), Some("load"));
        assert_eq!(doc.get_attribute(mount, "hx-swap").as_deref(), Some("innerHTML"));
        assert_eq!(transport.processed(), vec![(mount, root, true)]);
    }

    #[test]
    fn inserted_nodes_are_reprocessed_with_same_root() {
        let TestEnv {
            doc, transport, ctx, ..
        } = create_test_context();
        let root_host = doc.append_element(doc.body(), "div", &[]).unwrap();
        let root = doc.attach_shadow(root_host).unwrap();
        let mount = doc.append_element(root, "div", &[]).unwrap();
        TransportBridge::new(ctx).load(mount, "http://a/", root).unwrap();

        let card = doc.append_element(mount, "div", &[("hx-get", "/more")]).unwrap();
        transport.notify_new_node(mount, card);

        assert_eq!(transport.processed(), vec![(mount, root, true), (card, root, false)]);
    }

    #[test]
    fn unavailable_transport_is_a_noop() {
        let TestEnv {
            doc, transport, ctx, ..
        } = create_test_context();
        transport.set_available(false);
        let mount = doc.append_element(doc.body(), "div", &[]).unwrap();

        assert!(!TransportBridge::new(ctx).load(mount, "http://a/", mount).unwrap());
        assert_eq!(doc.get_attribute(mount, "hx-get"), None);
        assert!(transport.processed().is_empty());
    }

    #[test]
    fn transport_errors_are_swallowed() {
        let TestEnv {
            doc, transport, ctx, ..
        } = create_test_context();
        transport.set_process_error(Some("htmx exploded"));
        let mount = doc.append_element(doc.body(), "div", &[]).unwrap();

        assert!(!TransportBridge::new(ctx).load(mount, "http://a/", mount).unwrap());
    }

    #[test]
    fn shadow_parts_extension_rewrites_targets() {
        let TestEnv {
            doc, transport, ctx, ..
        } = create_test_context();
        let link = doc
            .append_element(doc.body(), "a", &[("hx-target", "part:detail")])
            .unwrap();
        let plain = doc
            .append_element(doc.body(), "a", &[("hx-target", "#detail")])
            .unwrap();

        let extension = TransportBridge::new(ctx).shadow_parts_extension();
        transport.define_extension(extension).unwrap();
        transport.run_extensions(link);
        transport.run_extensions(plain);

        assert_eq!(
            doc.get_attribute(link, "hx-target").as_deref(),
            Some("[part=\"detail\"]")
        );
        assert_eq!(doc.get_attribute(plain, "hx-target").as_deref(), Some("#detail"));
        assert_eq!(doc.get_attribute(link, "data-htmx-shadow-root"), None);
        assert_eq!(transport.extension_names(), vec!["shadowParts".to_string()]);
    }

    #[test]
    fn part_targets_are_stamped_with_their_container() {
        let TestEnv {
            doc, transport, ctx, ..
        } = create_test_context();
        let app = doc.append_element(doc.body(), "div", &[("id", "app")]).unwrap();
        let root = doc.attach_shadow(app).unwrap();
        let list = doc.append_element(root, "div", &[]).unwrap();
        let link = doc
            .append_element(list, "a", &[("hx-target", "part:detail")])
            .unwrap();

        transport
            .define_extension(TransportBridge::new(ctx).shadow_parts_extension())
            .unwrap();
        transport.run_extensions(link);

        assert_eq!(
            doc.get_attribute(link, "hx-target").as_deref(),
            Some("[part=\"detail\"]")
        );
        assert_eq!(
            doc.get_attribute(link, "data-htmx-shadow-root").as_deref(),
            Some("app")
        );
    }
}
