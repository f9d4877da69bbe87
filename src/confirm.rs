//! Confirmation factory
//!
//! Turns "mount a dialog and wait for its answer" into one awaitable call.
//! The dialog receives a [`Responder`] inside its [`ConfirmProps`]; the first
//! call to `resolve` or `reject` settles the [`Confirmation`] future and
//! schedules the unmount after a grace delay, leaving time for an exit
//! animation. Settlement never waits for that unmount.

use crate::direct::DirectMounter;
use crate::mount::{InstanceKey, MountError, Mounter};
use crate::schedule::run_after;
use crate::tree::{Document, NodeId};
use crate::view::{Component, Element};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// Default grace delay between settlement and unmount
pub const DEFAULT_UNMOUNT_DELAY: Duration = Duration::from_millis(1000);

/// Factory configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmOptions {
    /// Grace period between settlement and teardown
    pub unmount_delay: Duration,
    /// Where instances are mounted, for mounters that honour it
    pub target: Option<NodeId>,
}

impl Default for ConfirmOptions {
    fn default() -> Self {
        Self {
            unmount_delay: DEFAULT_UNMOUNT_DELAY,
            target: None,
        }
    }
}

impl ConfirmOptions {
    pub fn with_unmount_delay(mut self, delay: Duration) -> Self {
        self.unmount_delay = delay;
        self
    }

    pub fn with_target(mut self, target: NodeId) -> Self {
        self.target = Some(target);
        self
    }
}

/// Lifecycle of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmState {
    Created,
    Mounted,
    Settled,
    CleanedUp,
    Failed,
}

/// Why a confirmation did not produce a value
#[derive(Debug, thiserror::Error)]
pub enum ConfirmError<E> {
    #[error("confirmation rejected")]
    Rejected(E),

    #[error("failed to mount confirmation: {0}")]
    Mount(#[from] MountError),

    #[error("confirmation dialog was dropped without an answer")]
    Abandoned,
}

impl<E> ConfirmError<E> {
    /// The rejection value, if the dialog rejected
    pub fn into_rejection(self) -> Option<E> {
        match self {
            Self::Rejected(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct StateCell(Mutex<ConfirmState>);

impl StateCell {
    fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(ConfirmState::Created)))
    }

    fn lock(&self) -> MutexGuard<'_, ConfirmState> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn get(&self) -> ConfirmState {
        *self.lock()
    }

    fn set(&self, state: ConfirmState) {
        *self.lock() = state;
    }

    /// Move to `to` if the current state is one of `from`, under a single lock
    fn transition(&self, from: &[ConfirmState], to: ConfirmState) -> bool {
        let mut state = self.lock();
        if from.contains(&*state) {
            *state = to;
            true
        } else {
            false
        }
    }
}

/// Deferred unmount of one mounted dialog
struct Cleanup {
    mounter: Arc<dyn Mounter>,
    delay: Duration,
    key: InstanceKey,
    state: Arc<StateCell>,
}

impl Cleanup {
    fn schedule(self) {
        let Cleanup {
            mounter,
            delay,
            key,
            state,
        } = self;
        debug!("Unmounting {} in {:?}", key, delay);
        run_after(delay, move || {
            mounter.unmount(&key);
            state.set(ConfirmState::CleanedUp);
        });
    }
}

struct Settlement<T, E> {
    sender: Option<oneshot::Sender<Result<T, E>>>,
    cleanup: Option<Cleanup>,
}

impl<T, E> Drop for Settlement<T, E> {
    fn drop(&mut self) {
        // Still armed means every responder went away unanswered.
        if let Some(cleanup) = self.cleanup.take() {
            debug!("Responder for {} dropped without an answer", cleanup.key);
            cleanup.schedule();
        }
    }
}

/// Settles a pending confirmation; handed to the dialog through [`ConfirmProps`]
///
/// Only the first `resolve` or `reject` has any effect.
pub struct Responder<T, E> {
    settlement: Arc<Mutex<Settlement<T, E>>>,
    state: Arc<StateCell>,
}

impl<T, E> Clone for Responder<T, E> {
    fn clone(&self) -> Self {
        Self {
            settlement: self.settlement.clone(),
            state: self.state.clone(),
        }
    }
}

impl<T, E> Responder<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn resolve(&self, value: T) {
        self.settle(Ok(value));
    }

    pub fn reject(&self, error: E) {
        self.settle(Err(error));
    }

    /// Whether an answer was already given
    pub fn is_settled(&self) -> bool {
        self.settlement().sender.is_none()
    }

    fn settlement(&self) -> MutexGuard<'_, Settlement<T, E>> {
        self.settlement.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn settle(&self, outcome: Result<T, E>) {
        let (sender, cleanup) = {
            let mut settlement = self.settlement();
            let Some(sender) = settlement.sender.take() else {
                trace!("Ignoring repeated settlement");
                return;
            };
            (sender, settlement.cleanup.take())
        };

        self.state.transition(
            &[ConfirmState::Created, ConfirmState::Mounted],
            ConfirmState::Settled,
        );
        if sender.send(outcome).is_err() {
            debug!("Confirmation settled after its caller stopped waiting");
        }

        if let Some(cleanup) = cleanup {
            cleanup.schedule();
        }
    }

    fn arm_cleanup(&self, cleanup: Cleanup) {
        let pending = {
            let mut settlement = self.settlement();
            if settlement.sender.is_some() {
                settlement.cleanup = Some(cleanup);
                None
            } else {
                Some(cleanup)
            }
        };

        // The dialog answered while it was still being mounted.
        if let Some(cleanup) = pending {
            cleanup.schedule();
        }
    }
}

impl<T, E> fmt::Debug for Responder<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder").field("state", &self.state.get()).finish()
    }
}

/// Props given to a confirmation dialog: the caller's props plus the responder
#[derive(Debug, Clone)]
pub struct ConfirmProps<P, T, E> {
    pub props: P,
    pub responder: Responder<T, E>,
}

enum Outcome<T, E> {
    Failed(Option<MountError>),
    Waiting(oneshot::Receiver<Result<T, E>>),
}

/// A pending confirmation, resolving to the dialog's answer
pub struct Confirmation<T, E> {
    key: Option<InstanceKey>,
    state: Arc<StateCell>,
    outcome: Outcome<T, E>,
}

impl<T, E> Confirmation<T, E> {
    /// Key of the mounted dialog, absent when mounting failed
    pub fn key(&self) -> Option<&InstanceKey> {
        self.key.as_ref()
    }

    pub fn state(&self) -> ConfirmState {
        self.state.get()
    }

    /// Shared view of the lifecycle that outlives the future
    pub fn tracker(&self) -> StateTracker {
        StateTracker(self.state.clone())
    }
}

impl<T, E> Future for Confirmation<T, E> {
    type Output = Result<T, ConfirmError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.outcome {
            Outcome::Failed(error) => Poll::Ready(Err(match error.take() {
                Some(error) => ConfirmError::Mount(error),
                None => ConfirmError::Abandoned,
            })),
            Outcome::Waiting(receiver) => match Pin::new(receiver).poll(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(Ok(Ok(value))) => Poll::Ready(Ok(value)),
                Poll::Ready(Ok(Err(error))) => Poll::Ready(Err(ConfirmError::Rejected(error))),
                Poll::Ready(Err(_)) => Poll::Ready(Err(ConfirmError::Abandoned)),
            },
        }
    }
}

impl<T, E> fmt::Debug for Confirmation<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Confirmation")
            .field("key", &self.key)
            .field("state", &self.state.get())
            .finish()
    }
}

/// Read-only handle on an invocation's [`ConfirmState`]
#[derive(Debug, Clone)]
pub struct StateTracker(Arc<StateCell>);

impl StateTracker {
    pub fn get(&self) -> ConfirmState {
        self.0.get()
    }
}

/// Mounts a dialog component and awaits its answer
pub struct ConfirmFactory<C, P, T, E> {
    mounter: Arc<dyn Mounter>,
    component: Arc<C>,
    options: ConfirmOptions,
    _marker: PhantomData<fn(P) -> Result<T, E>>,
}

impl<C, P, T, E> ConfirmFactory<C, P, T, E>
where
    C: Component<ConfirmProps<P, T, E>>,
    P: Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new(mounter: Arc<dyn Mounter>, component: C, options: ConfirmOptions) -> Self {
        Self {
            mounter,
            component: Arc::new(component),
            options,
            _marker: PhantomData,
        }
    }

    /// Factory backed by a fresh [`DirectMounter`] on `document`
    pub fn direct(document: Document, component: C) -> Self {
        Self::new(
            Arc::new(DirectMounter::new(document)),
            component,
            ConfirmOptions::default(),
        )
    }

    pub fn options(&self) -> &ConfirmOptions {
        &self.options
    }

    pub fn mounter(&self) -> &Arc<dyn Mounter> {
        &self.mounter
    }

    /// Mount the dialog with `props` and return a future of its answer
    ///
    /// Mounting happens before this returns; awaiting only waits for the
    /// answer. A mount failure surfaces as [`ConfirmError::Mount`].
    pub fn invoke(&self, props: P) -> Confirmation<T, E> {
        let (sender, receiver) = oneshot::channel();
        let state = StateCell::new();
        let responder = Responder {
            settlement: Arc::new(Mutex::new(Settlement {
                sender: Some(sender),
                cleanup: None,
            })),
            state: state.clone(),
        };

        let element = Element::new(
            self.component.clone(),
            ConfirmProps {
                props,
                responder: responder.clone(),
            },
        );

        match self.mounter.mount(element, self.options.target) {
            Ok(key) => {
                debug!("Confirmation mounted as {}", key);
                state.transition(&[ConfirmState::Created], ConfirmState::Mounted);
                responder.arm_cleanup(Cleanup {
                    mounter: self.mounter.clone(),
                    delay: self.options.unmount_delay,
                    key: key.clone(),
                    state: state.clone(),
                });
                Confirmation {
                    key: Some(key),
                    state,
                    outcome: Outcome::Waiting(receiver),
                }
            }
            Err(error) => {
                debug!("Confirmation failed to mount: {}", error);
                state.set(ConfirmState::Failed);
                Confirmation {
                    key: None,
                    state,
                    outcome: Outcome::Failed(Some(error)),
                }
            }
        }
    }
}
