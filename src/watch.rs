//! Watch consumption for mutation verification
//!
//! One generic blocking loop drains a bounded watch subscription and applies
//! a caller-supplied predicate to each event. Every wait in the harness,
//! whether for a mutation phase, a generation echo, or the final readiness
//! condition, is an instantiation of this loop with a different predicate.

use futures::stream::BoxStream;
use futures::StreamExt;
use kube::api::DynamicObject;
use kube::core::WatchEvent;
use tracing::{debug, trace};

use gantry_common::Error;

/// Events from a single-resource watch subscription.
///
/// The stream ends when the server-side watch timeout expires; it carries
/// no explicit end-of-watch marker.
pub type WatchEventStream = BoxStream<'static, Result<WatchEvent<DynamicObject>, kube::Error>>;

/// Drain a watch stream until the predicate is satisfied.
///
/// The predicate is invoked once per object-bearing event, in delivery
/// order, and decides the outcome:
/// - `Ok(true)` ends the wait successfully,
/// - `Ok(false)` keeps consuming,
/// - `Err` ends the wait with that error.
///
/// Error-tagged events end the wait immediately without consulting the
/// predicate, and a stream that ends without a terminal outcome is a
/// timeout, never a success. Bookmark events carry no object and are
/// skipped. Exactly one terminal outcome is produced per call, and the
/// subscription is owned by this function, so it is released on every exit
/// path including panic unwind.
pub async fn watch_wait<S, F>(mut stream: S, resource: &str, mut predicate: F) -> Result<(), Error>
where
    S: futures::Stream<Item = Result<WatchEvent<DynamicObject>, kube::Error>> + Unpin,
    F: FnMut(&WatchEvent<DynamicObject>) -> Result<bool, Error>,
{
    while let Some(item) = stream.next().await {
        let event = item?;
        match &event {
            WatchEvent::Error(status) => {
                debug!(resource = %resource, code = status.code, "watch reported error event");
                return Err(Error::watch_stream(
                    resource,
                    format!("{} (code {})", status.message, status.code),
                ));
            }
            WatchEvent::Bookmark(_) => {
                trace!(resource = %resource, "skipping bookmark event");
                continue;
            }
            _ => {
                if predicate(&event)? {
                    return Ok(());
                }
            }
        }
    }

    debug!(resource = %resource, "watch closed without satisfying condition");
    Err(Error::watch_timeout(resource))
}

/// The object carried by an event, if any
pub fn event_object(event: &WatchEvent<DynamicObject>) -> Option<&DynamicObject> {
    match event {
        WatchEvent::Added(obj) | WatchEvent::Modified(obj) | WatchEvent::Deleted(obj) => Some(obj),
        WatchEvent::Bookmark(_) | WatchEvent::Error(_) => None,
    }
}
