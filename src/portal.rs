//! Portal mounting
//!
//! A [`MountPoint`] is a long-lived view the application places once in its
//! own tree. It owns an ordered list of descriptors and renders every visible
//! one, in insertion order, on top of each other. The [`PortalMounter`] never
//! renders anything itself: it only appends and dismisses descriptors through
//! closures handed out by the mount point.

use crate::mount::{InstanceKey, MountError, Mounter};
use crate::schedule::run_after;
use crate::tree::NodeId;
use crate::view::{Element, View};
use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tracing::{debug, warn};

type SharedView = Arc<Mutex<Box<dyn View>>>;

/// The portal's record of one live instance
pub struct Descriptor {
    key: InstanceKey,
    name: &'static str,
    view: SharedView,
    visible: bool,
}

impl Descriptor {
    pub fn key(&self) -> &InstanceKey {
        &self.key
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("visible", &self.visible)
            .finish()
    }
}

/// Appends a descriptor to the mount point's list
pub type AppendFn = Arc<dyn Fn(Descriptor) -> Result<(), MountError> + Send + Sync>;

/// Marks a descriptor for removal
pub type DismissFn = Arc<dyn Fn(&InstanceKey) + Send + Sync>;

/// Mount point behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortalOptions {
    /// How long a dismissed descriptor stays in the list before removal
    pub exit_transition: Option<Duration>,
}

type DescriptorList = Mutex<Vec<Descriptor>>;

fn lock_list(list: &DescriptorList) -> MutexGuard<'_, Vec<Descriptor>> {
    list.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn lock_view(view: &SharedView) -> MutexGuard<'_, Box<dyn View>> {
    view.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn remove_descriptor(list: &DescriptorList, key: &InstanceKey) {
    let removed = {
        let mut descriptors = lock_list(list);
        descriptors
            .iter()
            .position(|d| &d.key == key)
            .map(|index| descriptors.remove(index))
    };
    if removed.is_some() {
        debug!("Removed descriptor {}", key);
    }
}

/// Renders the descriptors appended by a [`PortalMounter`]
#[derive(Clone)]
pub struct MountPoint {
    descriptors: Arc<DescriptorList>,
    options: PortalOptions,
}

impl MountPoint {
    pub fn new(options: PortalOptions) -> Self {
        Self {
            descriptors: Arc::new(Mutex::new(Vec::new())),
            options,
        }
    }

    /// List mutation closures for a [`PortalMounter`]
    ///
    /// The closures hold weak references: once every clone of the mount
    /// point is gone, appending fails and dismissing does nothing.
    pub fn bind(&self) -> (AppendFn, DismissFn) {
        let list = Arc::downgrade(&self.descriptors);
        let append: AppendFn = Arc::new(move |descriptor: Descriptor| -> Result<(), MountError> {
            let list = list.upgrade().ok_or(MountError::MountPointDropped)?;
            lock_list(&list).push(descriptor);
            Ok(())
        });

        let list = Arc::downgrade(&self.descriptors);
        let exit_transition = self.options.exit_transition;
        let dismiss: DismissFn = Arc::new(move |key: &InstanceKey| {
            dismiss_descriptor(&list, key, exit_transition);
        });

        (append, dismiss)
    }

    /// Keys of the visible descriptors, in render order
    pub fn keys(&self) -> Vec<InstanceKey> {
        lock_list(&self.descriptors)
            .iter()
            .filter(|d| d.visible)
            .map(|d| d.key.clone())
            .collect()
    }

    /// Number of descriptors, including dismissed ones still transitioning out
    pub fn len(&self) -> usize {
        lock_list(&self.descriptors).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn visible_views(&self) -> Vec<SharedView> {
        lock_list(&self.descriptors)
            .iter()
            .filter(|d| d.visible)
            .map(|d| d.view.clone())
            .collect()
    }
}

fn dismiss_descriptor(list: &Weak<DescriptorList>, key: &InstanceKey, exit_transition: Option<Duration>) {
    let Some(list) = list.upgrade() else {
        debug!("Mount point gone, nothing to dismiss for {}", key);
        return;
    };

    let found = match lock_list(&list).iter_mut().find(|d| &d.key == key) {
        Some(descriptor) => {
            descriptor.visible = false;
            true
        }
        None => false,
    };
    if !found {
        warn!("No descriptor to dismiss for {}", key);
        return;
    }

    match exit_transition {
        None => remove_descriptor(&list, key),
        Some(delay) => {
            let list = Arc::downgrade(&list);
            let key = key.clone();
            run_after(delay, move || {
                if let Some(list) = list.upgrade() {
                    remove_descriptor(&list, &key);
                }
            });
        }
    }
}

impl View for MountPoint {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        for view in self.visible_views() {
            let mut view = lock_view(&view);
            if view.is_visible() {
                view.render(frame, area);
            }
        }
    }

    fn handle_key_event(&mut self, event: KeyEvent) -> Result<bool> {
        match self.visible_views().pop() {
            Some(view) => lock_view(&view).handle_key_event(event),
            None => Ok(false),
        }
    }

    fn is_visible(&self) -> bool {
        !self.keys().is_empty()
    }
}

impl fmt::Debug for MountPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountPoint")
            .field("descriptors", &*lock_list(&self.descriptors))
            .field("options", &self.options)
            .finish()
    }
}

/// Mounts instances as descriptors of a [`MountPoint`]
pub struct PortalMounter {
    append: AppendFn,
    dismiss: DismissFn,
    keys: Mutex<HashSet<InstanceKey>>,
}

impl PortalMounter {
    pub fn new(append: AppendFn, dismiss: DismissFn) -> Self {
        Self {
            append,
            dismiss,
            keys: Mutex::new(HashSet::new()),
        }
    }

    fn keys(&self) -> MutexGuard<'_, HashSet<InstanceKey>> {
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Mounter for PortalMounter {
    fn mount(&self, element: Element, target: Option<NodeId>) -> Result<InstanceKey, MountError> {
        if let Some(target) = target {
            debug!("Portal mounter ignores target override {}", target);
        }

        let name = element.name();
        let view = element
            .instantiate()
            .map_err(|source| MountError::Component { name, source })?;

        let mut keys = self.keys();
        let key = InstanceKey::generate_unique(&keys);
        (self.append)(Descriptor {
            key: key.clone(),
            name,
            view: Arc::new(Mutex::new(view)),
            visible: true,
        })?;
        keys.insert(key.clone());
        drop(keys);

        debug!("Mounted '{}' as {} in portal", name, key);
        Ok(key)
    }

    fn unmount(&self, key: &InstanceKey) {
        if !self.keys().remove(key) {
            return;
        }
        (self.dismiss)(key);
        debug!("Unmounted {} from portal", key);
    }

    fn is_mounted(&self, key: &InstanceKey) -> bool {
        self.keys().contains(key)
    }

    fn mounted_count(&self) -> usize {
        self.keys().len()
    }
}

/// Create a portal mounter wired to a fresh mount point
pub fn create_portal(options: PortalOptions) -> (PortalMounter, MountPoint) {
    let mount_point = MountPoint::new(options);
    let (append, dismiss) = mount_point.bind();
    (PortalMounter::new(append, dismiss), mount_point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, widgets::Paragraph, Terminal};

    struct Label(&'static str);

    impl View for Label {
        fn render(&mut self, frame: &mut Frame, area: Rect) {
            frame.render_widget(Paragraph::new(self.0), area);
        }
    }

    fn label(text: &'static str) -> Element {
        Element::from_view(Box::new(Label(text)))
    }

    #[test]
    fn test_unmounting_middle_keeps_order() {
        let (mounter, mount_point) = create_portal(PortalOptions::default());
        let first = mounter.mount(label("1"), None).unwrap();
        let second = mounter.mount(label("2"), None).unwrap();
        let third = mounter.mount(label("3"), None).unwrap();

        mounter.unmount(&second);

        assert_eq!(mount_point.keys(), vec![first, third]);
        assert_eq!(mount_point.len(), 2);
        assert_eq!(mounter.mounted_count(), 2);
    }

    #[test]
    fn test_unmount_is_idempotent() {
        let (mounter, mount_point) = create_portal(PortalOptions::default());
        let key = mounter.mount(label("x"), None).unwrap();

        mounter.unmount(&key);
        mounter.unmount(&key);
        mounter.unmount(&InstanceKey::from("unknown"));

        assert!(mount_point.is_empty());
        assert!(!mounter.is_mounted(&key));
    }

    #[test]
    fn test_mount_fails_once_mount_point_dropped() {
        let (mounter, mount_point) = create_portal(PortalOptions::default());
        drop(mount_point);

        let err = mounter.mount(label("x"), None).unwrap_err();
        assert!(matches!(err, MountError::MountPointDropped));
        assert_eq!(mounter.mounted_count(), 0);
    }

    #[test]
    fn test_component_failure_appends_nothing() {
        let (mounter, mount_point) = create_portal(PortalOptions::default());
        let failing = Arc::new(|_: ()| -> Result<Box<dyn View>> { Err(anyhow::anyhow!("bad props")) });

        assert!(mounter.mount(Element::new(failing, ()), None).is_err());
        assert!(mount_point.is_empty());
        assert_eq!(mounter.mounted_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exit_transition_delays_removal() {
        let (mounter, mount_point) = create_portal(PortalOptions {
            exit_transition: Some(Duration::from_millis(200)),
        });
        let key = mounter.mount(label("x"), None).unwrap();

        mounter.unmount(&key);
        assert!(mount_point.keys().is_empty());
        assert_eq!(mount_point.len(), 1);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(mount_point.is_empty());
    }

    #[test]
    fn test_renders_visible_descriptors_in_order() {
        let (mounter, mut mount_point) = create_portal(PortalOptions::default());
        mounter.mount(label("under"), None).unwrap();
        let over = mounter.mount(label("over"), None).unwrap();

        let mut terminal = Terminal::new(TestBackend::new(8, 1)).unwrap();
        let mut draw = |mount_point: &mut MountPoint| {
            terminal
                .draw(|frame| {
                    let area = frame.size();
                    mount_point.render(frame, area);
                })
                .unwrap();
            terminal
                .backend()
                .buffer()
                .content()
                .iter()
                .map(|cell| cell.symbol().to_string())
                .collect::<String>()
        };

        assert_eq!(draw(&mut mount_point).trim_end(), "overr");
        mounter.unmount(&over);
        assert_eq!(draw(&mut mount_point).trim_end(), "under");
    }
}
