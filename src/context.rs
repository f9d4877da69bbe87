//! Context-scoped confirmations
//!
//! Bundles one portal mounter, its mount point and a factory maker so that
//! every confirmation created from the same context renders under the same
//! mount point, wherever the application placed it.

use crate::confirm::{ConfirmFactory, ConfirmOptions, ConfirmProps};
use crate::mount::Mounter;
use crate::portal::{create_portal, MountPoint, PortalOptions};
use crate::view::Component;
use std::sync::Arc;

/// A shared mount location for confirmations
#[derive(Clone)]
pub struct ConfirmContext {
    mounter: Arc<dyn Mounter>,
    mount_point: MountPoint,
    options: ConfirmOptions,
}

impl ConfirmContext {
    pub fn new(portal: PortalOptions, options: ConfirmOptions) -> Self {
        let (mounter, mount_point) = create_portal(portal);
        Self {
            mounter: Arc::new(mounter),
            mount_point,
            options,
        }
    }

    /// The view to place once in the application's tree
    pub fn mount_point(&self) -> MountPoint {
        self.mount_point.clone()
    }

    pub fn mounter(&self) -> &Arc<dyn Mounter> {
        &self.mounter
    }

    /// Build a confirmation factory that mounts `component` into this context
    pub fn create_confirmation<C, P, T, E>(&self, component: C) -> ConfirmFactory<C, P, T, E>
    where
        C: Component<ConfirmProps<P, T, E>>,
        P: Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        ConfirmFactory::new(self.mounter.clone(), component, self.options)
    }
}

impl Default for ConfirmContext {
    fn default() -> Self {
        Self::new(PortalOptions::default(), ConfirmOptions::default())
    }
}
