//! Bringing a field's element into view inside a scrollable container.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::form::{FieldHandle, FieldKey};

/// Platform identifier of a mounted element.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ElementId(pub u64);

/// Geometry of an element relative to the container's content origin.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LayoutRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LayoutRect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn origin(self) -> ScrollPosition {
        ScrollPosition {
            x: self.x,
            y: self.y,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollPosition {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ScrollBehavior {
    /// Jump without animation
    Auto,
    #[default]
    Smooth,
}

/// Layout was not available for a scroll request. Callers treat every variant
/// as a skipped scroll.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ScrollError {
    TargetDetached(FieldKey),
    ContainerDetached,
    Measurement(String),
}

impl Display for ScrollError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrollError::TargetDetached(field) => {
                write!(f, "field `{field}` is not attached to a live element")
            }
            ScrollError::ContainerDetached => {
                f.write_str("scroll container is not attached to a live view")
            }
            ScrollError::Measurement(error) => write!(f, "layout measurement failed: {error}"),
        }
    }
}

impl std::error::Error for ScrollError {}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScrollOutcome {
    Scrolled(ScrollPosition),
    /// A newer request was issued while this one was measuring.
    Superseded,
}

pub type BoxedLayoutFuture<'a> =
    Pin<Box<dyn Future<Output = Result<LayoutRect, ScrollError>> + Send + 'a>>;

/// Scrollable container provided by the platform layer.
pub trait ScrollContainer: Send + Sync {
    /// Resolves once the platform has reported the element's geometry.
    fn measure(&self, element: ElementId) -> BoxedLayoutFuture<'_>;

    fn scroll_to(&self, position: ScrollPosition, behavior: ScrollBehavior);
}

/// Request bookkeeping. A measured request scrolls only when no newer request
/// is still measuring and none has scrolled already.
#[derive(Debug, Default)]
struct ScrollRequests {
    issued: u64,
    in_flight: BTreeSet<u64>,
    last_scrolled: u64,
}

impl ScrollRequests {
    fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.in_flight.insert(self.issued);
        self.issued
    }

    fn claim(&mut self, ticket: u64) -> bool {
        let newer_in_flight = self.in_flight.range(ticket + 1..).next().is_some();
        if newer_in_flight || ticket < self.last_scrolled {
            return false;
        }
        self.last_scrolled = ticket;
        true
    }
}

/// Withdraws a ticket when its request finishes, fails or is dropped.
struct InFlight<'a> {
    requests: &'a Mutex<ScrollRequests>,
    ticket: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock_requests(self.requests).in_flight.remove(&self.ticket);
    }
}

fn lock_requests(requests: &Mutex<ScrollRequests>) -> MutexGuard<'_, ScrollRequests> {
    match requests.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Clone, Default)]
pub struct ScrollCoordinator {
    container: Arc<RwLock<Option<Arc<dyn ScrollContainer>>>>,
    requests: Arc<Mutex<ScrollRequests>>,
}

impl ScrollCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach_container(&self, container: Arc<dyn ScrollContainer>) {
        let mut slot = match self.container.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(container);
    }

    pub fn detach_container(&self) {
        let mut slot = match self.container.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = None;
    }

    pub fn has_container(&self) -> bool {
        self.container().is_some()
    }

    fn container(&self) -> Option<Arc<dyn ScrollContainer>> {
        match self.container.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Measures the field's element and smoothly scrolls its top-left corner
    /// to the container's visible origin.
    pub async fn scroll_to_field(&self, handle: &FieldHandle) -> Result<ScrollOutcome, ScrollError> {
        let element = handle
            .element()
            .ok_or_else(|| ScrollError::TargetDetached(handle.key().clone()))?;
        let container = self.container().ok_or(ScrollError::ContainerDetached)?;

        let in_flight = InFlight {
            requests: &self.requests,
            ticket: lock_requests(&self.requests).issue(),
        };
        let rect = container.measure(element).await?;
        if !lock_requests(&self.requests).claim(in_flight.ticket) {
            tracing::debug!(field = %handle.key(), "scroll superseded by a newer request");
            return Ok(ScrollOutcome::Superseded);
        }
        drop(in_flight);

        let position = rect.origin();
        tracing::trace!(field = %handle.key(), x = position.x, y = position.y, "scrolling to field");
        container.scroll_to(position, ScrollBehavior::Smooth);
        Ok(ScrollOutcome::Scrolled(position))
    }
}

impl std::fmt::Debug for ScrollCoordinator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollCoordinator")
            .field("has_container", &self.has_container())
            .field("requests", &*lock_requests(&self.requests))
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use futures::channel::oneshot;

    use super::*;

    /// Container with fixed geometry that records every scroll command.
    #[derive(Default)]
    pub(crate) struct RecordingContainer {
        rects: Mutex<BTreeMap<ElementId, LayoutRect>>,
        gates: Mutex<BTreeMap<ElementId, oneshot::Receiver<LayoutRect>>>,
        pub(crate) scrolls: Mutex<Vec<(ScrollPosition, ScrollBehavior)>>,
    }

    impl RecordingContainer {
        pub(crate) fn with_rect(self, element: ElementId, rect: LayoutRect) -> Self {
            lock(&self.rects).insert(element, rect);
            self
        }

        /// The next measurement of `element` waits for the returned sender.
        pub(crate) fn gate(&self, element: ElementId) -> oneshot::Sender<LayoutRect> {
            let (sender, receiver) = oneshot::channel();
            lock(&self.gates).insert(element, receiver);
            sender
        }

        pub(crate) fn scrolls(&self) -> Vec<(ScrollPosition, ScrollBehavior)> {
            lock(&self.scrolls).clone()
        }
    }

    impl ScrollContainer for RecordingContainer {
        fn measure(&self, element: ElementId) -> BoxedLayoutFuture<'_> {
            if let Some(gate) = lock(&self.gates).remove(&element) {
                return Box::pin(async move {
                    gate.await
                        .map_err(|_| ScrollError::Measurement("measurement dropped".into()))
                });
            }
            let rect = lock(&self.rects).get(&element).copied();
            Box::pin(async move {
                rect.ok_or_else(|| ScrollError::Measurement(format!("no layout for {element:?}")))
            })
        }

        fn scroll_to(&self, position: ScrollPosition, behavior: ScrollBehavior) {
            lock(&self.scrolls).push((position, behavior));
        }
    }

    pub(crate) fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
        match mutex.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
