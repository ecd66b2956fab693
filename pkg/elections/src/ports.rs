use super::errors::*;
use super::protos::*;

use std::time::{Duration, Instant};

/// Read access to the epoch manager. Must return promptly; implementations may not block.
pub trait EpochStore {
	/// The last epoch recorded in the local log, if the node has written any
	fn last_epoch(&self) -> Option<Epoch>;
}

/// Read access to the positions the storage pipeline has reached. Must return promptly.
pub trait LogPositions {
	/// Position up to which the writer has flushed the log
	fn writer_checkpoint(&self) -> i64;

	/// Position up to which the chaser has caught up with the writer
	fn chaser_checkpoint(&self) -> i64;

	/// Position of the last commit known to this node
	fn last_commit_position(&self) -> i64;
}

/// Publishes events onto the local message bus. Fire-and-forget: implementations may enqueue
/// or batch but must never call back into the elections module on the same stack.
pub trait Publisher {
	fn publish(&self, event: ElectionEvent) -> Result<()>;
}

/// Point-to-point delivery of election messages to a peer. No delivery guarantees; messages
/// still undelivered at `expires` may be dropped.
pub trait Transport {
	fn send(&self, to: &EndPoint, msg: &ElectionMessage, expires: Instant) -> Result<()>;
}

/// Schedules a message to be delivered back to the elections module after a delay
pub trait Scheduler {
	fn schedule(&self, delay: Duration, msg: ElectionMessage) -> Result<()>;
}
