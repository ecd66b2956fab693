use super::elections::*;
use super::ports::*;
use super::protos::*;

use std::sync::Arc;

/// Single-threaded driver around the elections module. Owns the module, feeds it one message
/// at a time and executes every side effect the tick asked for.
///
/// Failed sends, publishes and timer arms are logged and dropped; the protocol's timeout
/// rotation and periodic proof rebroadcast make losing any single message survivable, so
/// nothing is ever retried from here.
pub struct ElectionsBus {
	module: ElectionsModule,

	publisher: Arc<dyn Publisher + Send + Sync>,
	transport: Arc<dyn Transport + Send + Sync>,
	scheduler: Arc<dyn Scheduler + Send + Sync>
}

impl ElectionsBus {

	pub fn new(
		module: ElectionsModule,
		publisher: Arc<dyn Publisher + Send + Sync>,
		transport: Arc<dyn Transport + Send + Sync>,
		scheduler: Arc<dyn Scheduler + Send + Sync>
	) -> ElectionsBus {
		ElectionsBus { module, publisher, transport, scheduler }
	}

	pub fn module(&self) -> &ElectionsModule {
		&self.module
	}

	/// Runs a single input through the module and applies the resulting side effects. Must be
	/// called from one logical thread only.
	// TODO: Collapse the per-endpoint sends of a broadcast into one transport call once the
	// transport grows a multi-destination entry point
	pub fn dispatch(&mut self, msg: ElectionMessage) {
		let mut tick = Tick::empty();
		self.module.handle(msg, &mut tick);
		self.apply(tick);
	}

	fn apply(&self, tick: Tick) {
		for envelope in tick.messages {
			for to in &envelope.to {
				if let Err(e) = self.transport.send(to, &envelope.body, envelope.expires) {
					warn!("dropping undeliverable message to {}: {}", to, e);
				}
			}
		}

		for event in tick.events {
			if let Err(e) = self.publisher.publish(event) {
				warn!("dropping unpublishable election event: {}", e);
			}
		}

		for (delay, msg) in tick.timers {
			if let Err(e) = self.scheduler.schedule(delay, msg) {
				warn!("failed to arm election timer: {}", e);
			}
		}
	}
}
