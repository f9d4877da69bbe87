//! Views, components and elements
//!
//! A [`View`] is a live, rendered UI instance. A [`Component`] knows how to
//! build a view from a set of props, and an [`Element`] is a component bound
//! to its props that has not been instantiated yet. Mounters receive elements
//! and decide where the resulting view lives.

use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};
use std::fmt;
use std::sync::Arc;

/// A mounted UI instance
pub trait View: Send {
    /// Render the view into the given area
    fn render(&mut self, frame: &mut Frame, area: Rect);

    /// Handle keyboard input, returning `true` when the event was consumed
    fn handle_key_event(&mut self, event: KeyEvent) -> Result<bool> {
        let _ = event;
        Ok(false)
    }

    /// Check if the view wants to be drawn
    fn is_visible(&self) -> bool {
        true
    }
}

/// Builds a [`View`] from props
pub trait Component<P>: Send + Sync + 'static {
    fn create(&self, props: P) -> Result<Box<dyn View>>;
}

impl<P, F> Component<P> for F
where
    F: Fn(P) -> Result<Box<dyn View>> + Send + Sync + 'static,
{
    fn create(&self, props: P) -> Result<Box<dyn View>> {
        self(props)
    }
}

type Build = Box<dyn FnOnce() -> Result<Box<dyn View>> + Send>;

/// A component paired with its props, instantiated by a mounter
pub struct Element {
    name: &'static str,
    build: Build,
}

impl Element {
    pub fn new<C, P>(component: Arc<C>, props: P) -> Self
    where
        C: Component<P> + ?Sized,
        P: Send + 'static,
    {
        Self {
            name: std::any::type_name::<C>(),
            build: Box::new(move || component.create(props)),
        }
    }

    /// Wrap an already constructed view
    pub fn from_view(view: Box<dyn View>) -> Self {
        Self {
            name: "view",
            build: Box::new(move || Ok(view)),
        }
    }

    /// Component type name, used in logs
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn instantiate(self) -> Result<Box<dyn View>> {
        (self.build)()
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element").field("name", &self.name).finish_non_exhaustive()
    }
}
