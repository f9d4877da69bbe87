//! Direct mounter
//!
//! Every instance gets its own container node and an isolated rendering
//! root in a [`Document`]. The container is created under, in order of
//! preference, the per-call target, the mounter's default container, or the
//! document body.

use crate::mount::{InstanceKey, MountError, Mounter};
use crate::tree::{Document, NodeId, Root};
use crate::view::Element;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Callback run after an instance has been rendered
pub type MountedHook = Arc<dyn Fn(&InstanceKey) + Send + Sync>;

struct MountedEntry {
    root: Root,
    node: NodeId,
}

/// Mounts instances straight into a [`Document`]
pub struct DirectMounter {
    document: Document,
    default_container: Option<NodeId>,
    entries: Mutex<HashMap<InstanceKey, MountedEntry>>,
    on_mounted: Option<MountedHook>,
}

impl DirectMounter {
    /// Create a mounter that falls back to the document body
    pub fn new(document: Document) -> Self {
        Self {
            document,
            default_container: None,
            entries: Mutex::new(HashMap::new()),
            on_mounted: None,
        }
    }

    /// Create a mounter whose instances land under `container` by default
    pub fn with_default_container(document: Document, container: NodeId) -> Self {
        let mut mounter = Self::new(document);
        mounter.default_container = Some(container);
        mounter
    }

    /// Register a hook called once an instance is rendered
    pub fn on_mounted(mut self, hook: impl Fn(&InstanceKey) + Send + Sync + 'static) -> Self {
        self.on_mounted = Some(Arc::new(hook));
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Container node hosting the instance, if it is still mounted
    pub fn container_of(&self, key: &InstanceKey) -> Option<NodeId> {
        self.entries().get(key).map(|entry| entry.node)
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<InstanceKey, MountedEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn resolve_target(&self, target: Option<NodeId>) -> NodeId {
        target
            .or(self.default_container)
            .unwrap_or_else(|| self.document.body())
    }

    /// Build node, root and view; undo whatever was created on failure
    fn create_entry(&self, element: Element, target: NodeId) -> Result<MountedEntry, MountError> {
        if !self.document.contains(target) {
            return Err(MountError::TargetNotFound(target));
        }
        let node = self.document.create_element(target)?;

        let rendered = self
            .document
            .create_root(node)
            .map_err(MountError::from)
            .and_then(|root| {
                let name = element.name();
                let view = element
                    .instantiate()
                    .map_err(|source| MountError::Component { name, source });
                match view.and_then(|view| root.render(view).map_err(MountError::from)) {
                    Ok(()) => Ok(root),
                    Err(e) => {
                        let _ = root.unmount();
                        Err(e)
                    }
                }
            });

        match rendered {
            Ok(root) => Ok(MountedEntry { root, node }),
            Err(e) => {
                if let Err(cleanup) = self.document.remove_node(node) {
                    warn!("Failed to remove container {} after mount failure: {}", node, cleanup);
                }
                Err(e)
            }
        }
    }
}

impl Mounter for DirectMounter {
    fn mount(&self, element: Element, target: Option<NodeId>) -> Result<InstanceKey, MountError> {
        let target = self.resolve_target(target);
        let name = element.name();
        let entry = self.create_entry(element, target)?;
        let node = entry.node;

        let key = {
            let mut entries = self.entries();
            let live = entries.keys().cloned().collect();
            let key = InstanceKey::generate_unique(&live);
            entries.insert(key.clone(), entry);
            key
        };
        debug!("Mounted '{}' as {} on {}", name, key, node);

        if let Some(hook) = &self.on_mounted {
            hook(&key);
        }
        Ok(key)
    }

    fn unmount(&self, key: &InstanceKey) {
        let Some(entry) = self.entries().remove(key) else {
            return;
        };

        if let Err(e) = entry.root.unmount() {
            warn!("Failed to unmount root for {}: {}", key, e);
        }
        if let Err(e) = self.document.remove_node(entry.node) {
            warn!("Failed to remove container {} for {}: {}", entry.node, key, e);
        }
        debug!("Unmounted {}", key);
    }

    fn is_mounted(&self, key: &InstanceKey) -> bool {
        self.entries().contains_key(key)
    }

    fn mounted_count(&self) -> usize {
        self.entries().len()
    }
}
