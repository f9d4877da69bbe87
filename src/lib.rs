//! Awaitable confirmation dialogs for ratatui applications
//!
//! A dialog is mounted by a [`Mounter`], either straight into a render tree
//! ([`DirectMounter`]) or into a [`MountPoint`] the application already draws
//! ([`PortalMounter`]). A [`ConfirmFactory`] wraps a dialog component so that
//! asking the user becomes a single `await`:
//!
//! ```no_run
//! # use tui_confirm::{ConfirmFactory, ConfirmProps, Document, View};
//! # async fn ask(document: Document, dialog: fn(ConfirmProps<&'static str, bool, ()>) -> anyhow::Result<Box<dyn View>>) {
//! let confirm = ConfirmFactory::<_, _, bool, ()>::direct(document, dialog);
//! let delete = confirm.invoke("Delete?").await.unwrap_or(false);
//! # }
//! ```
//!
//! The dialog gets a [`Responder`] with its props. The first `resolve` or
//! `reject` settles the future; the dialog is unmounted after a grace delay.

pub mod config;
pub mod confirm;
pub mod context;
pub mod direct;
pub mod mount;
pub mod portal;
mod schedule;
pub mod tree;
pub mod view;

pub use config::ConfirmConfig;
pub use confirm::{
    ConfirmError, ConfirmFactory, ConfirmOptions, ConfirmProps, ConfirmState, Confirmation, Responder,
    StateTracker, DEFAULT_UNMOUNT_DELAY,
};
pub use context::ConfirmContext;
pub use direct::DirectMounter;
pub use mount::{InstanceKey, MountError, Mounter};
pub use portal::{create_portal, Descriptor, MountPoint, PortalMounter, PortalOptions};
pub use tree::{Document, NodeId, Root, TreeError};
pub use view::{Component, Element, View};
