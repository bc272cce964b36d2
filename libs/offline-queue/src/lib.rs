//! Persisted request queue with replay on reconnect
//!
//! Trophy submissions made while the network is down are written to a JSON
//! file and re-POSTed once connectivity returns. Replays run in insertion
//! order; a delivered request is removed, a failed one has its retry counter
//! bumped and waits for the next reconnect. There is no backoff and no
//! idempotency key, so a request whose response was lost may be delivered
//! twice.

mod connectivity;
mod error;
mod queue;

pub use connectivity::ConnectivityWatcher;
pub use error::{QueueError, QueueResult};
pub use queue::{
    DEFAULT_MAX_RETENTION_SECS, OfflineQueue, QueuedRequest, ReplaySummary, RequestMethod,
    SubmitOutcome, submit_or_enqueue,
};
