use super::errors::*;
use super::ports::*;
use super::protos::*;
use super::state::*;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// If an election attempt has not produced a leader within this window, the node assumes the
/// attempt is stuck and rotates to the next view
pub const ELECTION_PROGRESS_TIMEOUT: Duration = Duration::from_millis(1000);

/// Interval at which a node re-advertises its installed view so that peers which missed the
/// original view change can catch up
pub const SEND_VIEW_CHANGE_PROOF_INTERVAL: Duration = Duration::from_millis(5000);

/// A message staged for delivery to one or more peers. The transport may drop envelopes still
/// undelivered at `expires`; the protocol recovers through timeouts and proof rebroadcasts.
pub struct Envelope {
	pub to: Vec<EndPoint>,
	pub body: ElectionMessage,
	pub expires: Instant
}

/// Represents all external side effects requested by the elections module during a single
/// handle call. The caller executes them after the call returns; nothing here is performed by
/// the module itself.
pub struct Tick {
	/// Exact time at which this tick is happening
	pub time: Instant,

	/// Messages that need to be sent to other nodes
	pub messages: Vec<Envelope>,

	/// Events to publish on the local bus
	pub events: Vec<ElectionEvent>,

	/// Messages to deliver back to the module after the given delay
	pub timers: Vec<(Duration, ElectionMessage)>
}

impl Tick {
	pub fn empty() -> Self {
		Tick {
			time: Instant::now(),
			messages: vec![],
			events: vec![],
			timers: vec![]
		}
	}

	pub fn send_to(&mut self, to: EndPoint, body: ElectionMessage) {
		// TODO: Room for optimization in reusing one tick (and these vectors) across handle
		// calls instead of reallocating them for every message
		let expires = self.time + ELECTION_PROGRESS_TIMEOUT;
		self.messages.push(Envelope { to: vec![to], body, expires });
	}

	pub fn send_to_many(&mut self, to: Vec<EndPoint>, body: ElectionMessage) {
		if to.is_empty() {
			return;
		}

		let expires = self.time + ELECTION_PROGRESS_TIMEOUT;
		self.messages.push(Envelope { to, body, expires });
	}

	pub fn publish(&mut self, event: ElectionEvent) {
		self.events.push(event);
	}

	pub fn schedule(&mut self, delay: Duration, msg: ElectionMessage) {
		self.timers.push((delay, msg));
	}
}

/// Coordinates leader elections for a fixed-size cluster of event store nodes.
///
/// The module is a pure state machine: it owns no threads, performs no I/O and must be driven
/// by a single caller that serializes every `handle` invocation. Self-addressed messages are
/// delivered by direct recursion into `handle` before the matching broadcast is staged, so
/// the local node always counts towards its own majorities first.
///
/// Nothing here is persisted. A restarted node re-enters the protocol at `Idle` with no view
/// history and recovers by participating in the next election; safety is preserved because
/// majorities are computed over live membership and epochs only ever grow.
pub struct ElectionsModule {
	/// Identity of the node we are running on
	node: NodeInfo,

	/// Total number of voting seats in the cluster. Fixed at construction; majorities are
	/// computed against this, not against the currently visible member count.
	cluster_size: u32,

	node_priority: i32,

	epochs: Arc<dyn EpochStore + Send + Sync>,
	positions: Arc<dyn LogPositions + Send + Sync>,

	state: ElectionsState,

	last_attempted_view: i32,
	last_installed_view: i32,

	/// Latest gossip snapshot: live non-manager members, sorted descending by endpoint.
	/// Replaced wholesale on every gossip update; ids already counted in a tally are kept
	/// counted even if they disappear from here.
	servers: Vec<MemberInfo>,

	vc_received: HashSet<InstanceId>,
	prepare_ok_received: HashMap<InstanceId, PrepareOk>,
	accepts_received: HashSet<InstanceId>,
	resigning_ok_received: HashSet<InstanceId>,

	leader_proposal: Option<LeaderCandidate>,

	/// Leader installed on this node by the last completed election, if any
	leader: Option<InstanceId>,

	/// Sticky hint used to prefer re-electing the previous leader across views
	last_elected_leader: Option<InstanceId>,

	/// Set while a leader is stepping down; breaks the sticky-leader preference for exactly
	/// that node and is cleared by the next successful election
	resigning_leader: Option<InstanceId>
}

impl ElectionsModule {

	pub fn new(
		node: NodeInfo, cluster_size: u32, node_priority: i32,
		epochs: Arc<dyn EpochStore + Send + Sync>,
		positions: Arc<dyn LogPositions + Send + Sync>
	) -> Result<ElectionsModule> {

		if cluster_size == 0 {
			bail!("cluster size must be at least 1");
		}

		Ok(ElectionsModule {
			node,
			cluster_size,
			node_priority,
			epochs,
			positions,
			state: ElectionsState::Idle,
			last_attempted_view: -1,
			last_installed_view: -1,
			servers: vec![],
			vc_received: HashSet::new(),
			prepare_ok_received: HashMap::new(),
			accepts_received: HashSet::new(),
			resigning_ok_received: HashSet::new(),
			leader_proposal: None,
			leader: None,
			last_elected_leader: None,
			resigning_leader: None
		})
	}

	pub fn id(&self) -> InstanceId {
		self.node.instance_id
	}

	pub fn state(&self) -> ElectionsState {
		self.state
	}

	pub fn last_attempted_view(&self) -> i32 {
		self.last_attempted_view
	}

	pub fn last_installed_view(&self) -> i32 {
		self.last_installed_view
	}

	pub fn leader(&self) -> Option<InstanceId> {
		self.leader
	}

	pub fn node_priority(&self) -> i32 {
		self.node_priority
	}

	/// Processes a single input message, recording every requested side effect on the tick.
	/// Must be invoked serially; the module itself recurses here for self-addressed messages,
	/// which gurantees the node has counted itself before any peer response can arrive.
	pub fn handle(&mut self, msg: ElectionMessage, tick: &mut Tick) {
		if self.state.is_shutdown() {
			return;
		}

		match msg {
			ElectionMessage::StartElections => self.start_elections(tick),
			ElectionMessage::ElectionsTimedOut { view } => self.elections_timed_out(view, tick),
			ElectionMessage::SendViewChangeProof => self.send_view_change_proof(tick),
			ElectionMessage::BecomeShuttingDown => {
				info!("elections service is shutting down");
				self.state = ElectionsState::Shutdown;
			},
			ElectionMessage::GossipUpdated(info) => self.gossip_updated(info),
			ElectionMessage::SetNodePriority(priority) => self.set_node_priority(priority, tick),
			ElectionMessage::ResignNode => self.resign_node(tick),

			ElectionMessage::ViewChange(m) => self.view_change(m, tick),
			ElectionMessage::ViewChangeProof(m) => self.view_change_proof(m, tick),
			ElectionMessage::Prepare(m) => self.prepare(m, tick),
			ElectionMessage::PrepareOk(m) => self.prepare_ok(m, tick),
			ElectionMessage::Proposal(m) => self.proposal(m, tick),
			ElectionMessage::Accept(m) => self.accept(m, tick),

			ElectionMessage::LeaderIsResigning(m) => self.leader_is_resigning(m, tick),
			ElectionMessage::LeaderIsResigningOk(m) => self.leader_is_resigning_ok(m, tick)
		}
	}

	fn start_elections(&mut self, tick: &mut Tick) {
		// The proof broadcaster is armed exactly once, on the first start; afterwards it
		// re-arms itself on every fire
		if self.state == ElectionsState::Idle {
			tick.schedule(SEND_VIEW_CHANGE_PROOF_INTERVAL, ElectionMessage::SendViewChangeProof);
		}

		info!("starting elections");
		let next_view = self.last_attempted_view + 1;
		self.shift_to_leader_election(next_view, tick);
	}

	fn shift_to_leader_election(&mut self, view: i32, tick: &mut Tick) {
		debug!("(v={}) shift to leader election", view);

		self.state = ElectionsState::ElectingLeader;
		self.vc_received.clear();
		self.prepare_ok_received.clear();
		self.accepts_received.clear();
		self.leader_proposal = None;
		self.leader = None;
		self.last_attempted_view = view;

		let vc = ViewChange {
			server_id: self.node.instance_id,
			server_endpoint: self.node.external_endpoint.clone(),
			attempted_view: view
		};
		self.handle(ElectionMessage::ViewChange(vc.clone()), tick);
		self.send_to_all_except_self(ElectionMessage::ViewChange(vc), tick);

		tick.schedule(ELECTION_PROGRESS_TIMEOUT, ElectionMessage::ElectionsTimedOut { view });
	}

	fn view_change(&mut self, msg: ViewChange, tick: &mut Tick) {
		if !self.electioneering() {
			return;
		}
		if msg.attempted_view <= self.last_installed_view {
			return;
		}

		debug!("(v={}) view change from [{}, {}]", msg.attempted_view, msg.server_endpoint, msg.server_id);

		if msg.attempted_view > self.last_attempted_view {
			self.shift_to_leader_election(msg.attempted_view, tick);
		}

		if self.vc_received.insert(msg.server_id) && self.vc_received.len() == self.majority() {
			debug!("(v={}) majority of view change", msg.attempted_view);

			if self.am_proposer_of(self.last_attempted_view) {
				self.shift_to_prepare_phase(tick);
			}
		}
	}

	fn shift_to_prepare_phase(&mut self, tick: &mut Tick) {
		debug!("(v={}) shift to prepare phase", self.last_attempted_view);

		self.last_installed_view = self.last_attempted_view;
		self.prepare_ok_received.clear();

		let own = self.create_prepare_ok(self.last_installed_view);
		self.handle(ElectionMessage::PrepareOk(own), tick);

		let prepare = Prepare {
			server_id: self.node.instance_id,
			server_endpoint: self.node.external_endpoint.clone(),
			view: self.last_installed_view
		};
		self.send_to_all_except_self(ElectionMessage::Prepare(prepare), tick);
	}

	fn prepare(&mut self, msg: Prepare, tick: &mut Tick) {
		if !self.electioneering() {
			return;
		}
		if msg.server_id == self.node.instance_id {
			return;
		}
		if msg.view != self.last_attempted_view {
			return;
		}
		if !self.known_server(msg.server_id) {
			return;
		}

		debug!("(v={}) prepare from [{}, {}]", msg.view, msg.server_endpoint, msg.server_id);

		if self.state == ElectionsState::ElectingLeader {
			// Another node won the race to drive this view; install it and follow
			self.state = ElectionsState::Acceptor;
			self.last_installed_view = msg.view;
		}

		if self.node.is_read_only_replica {
			debug!("not answering prepare: this node is a read-only replica");
			return;
		}

		let prepare_ok = self.create_prepare_ok(msg.view);
		tick.send_to(msg.server_endpoint, ElectionMessage::PrepareOk(prepare_ok));
	}

	fn prepare_ok(&mut self, msg: PrepareOk, tick: &mut Tick) {
		if self.state != ElectionsState::ElectingLeader {
			return;
		}
		if msg.view != self.last_attempted_view {
			return;
		}

		debug!("(v={}) prepare ok from [{}, {}]", msg.view, msg.server_endpoint, msg.server_id);

		if !self.prepare_ok_received.contains_key(&msg.server_id) {
			self.prepare_ok_received.insert(msg.server_id, msg);

			if self.prepare_ok_received.len() == self.majority() {
				self.shift_to_leader(tick);
			}
		}
	}

	fn shift_to_leader(&mut self, tick: &mut Tick) {
		debug!("(v={}) majority of prepare ok, shift to leader", self.last_attempted_view);

		self.state = ElectionsState::Leader;
		self.send_proposal(tick);
	}

	fn send_proposal(&mut self, tick: &mut Tick) {
		self.accepts_received.clear();

		let candidate = match Self::best_leader_candidate(
				&self.prepare_ok_received, &self.servers,
				self.last_elected_leader, self.resigning_leader) {
			Some(c) => c,
			None => {
				debug!("(v={}) no leader candidate available, not sending a proposal", self.last_attempted_view);
				return;
			}
		};

		self.leader_proposal = Some(candidate.clone());

		info!("(v={}) proposing [{}, {}] as leader", self.last_installed_view,
			candidate.external_endpoint, candidate.instance_id);

		let accept = Accept {
			server_id: self.node.instance_id,
			server_endpoint: self.node.external_endpoint.clone(),
			leader_id: candidate.instance_id,
			leader_endpoint: candidate.external_endpoint.clone(),
			view: self.last_installed_view
		};
		self.handle(ElectionMessage::Accept(accept), tick);

		let proposal = Proposal::new(
			self.node.instance_id, self.node.external_endpoint.clone(),
			&candidate, self.last_installed_view);
		self.send_to_all_except_self(ElectionMessage::Proposal(proposal), tick);
	}

	fn proposal(&mut self, msg: Proposal, tick: &mut Tick) {
		if self.state != ElectionsState::Acceptor {
			return;
		}
		if msg.server_id == self.node.instance_id {
			return;
		}
		if msg.view != self.last_installed_view {
			return;
		}
		if !self.known_server(msg.server_id) {
			return;
		}
		if !self.known_server(msg.leader_id) {
			return;
		}

		let candidate = msg.candidate();
		if !self.is_legitimate_leader(&candidate) {
			return;
		}

		debug!("(v={}) proposal from [{}, {}] nominating [{}, {}]", msg.view,
			msg.server_endpoint, msg.server_id, msg.leader_endpoint, msg.leader_id);

		if self.leader_proposal.is_none() {
			self.leader_proposal = Some(candidate);
			self.accepts_received.clear();
		}

		// TODO: If a second legitimate proposal naming a different leader shows up in the
		// same view we currently just drop it on the floor; should at least log who sent it
		match &self.leader_proposal {
			Some(p) if p.instance_id == msg.leader_id => {},
			_ => return
		}

		// NOTE: The proposer never broadcasts an accept for its own proposal, so count its
		// vote here on its behalf; the tally set deduplicates by server id in case the
		// proposer also counted itself locally
		let on_behalf = Accept {
			server_id: msg.server_id,
			server_endpoint: msg.server_endpoint.clone(),
			leader_id: msg.leader_id,
			leader_endpoint: msg.leader_endpoint.clone(),
			view: msg.view
		};
		self.handle(ElectionMessage::Accept(on_behalf), tick);

		let own = Accept {
			server_id: self.node.instance_id,
			server_endpoint: self.node.external_endpoint.clone(),
			leader_id: msg.leader_id,
			leader_endpoint: msg.leader_endpoint.clone(),
			view: msg.view
		};
		self.handle(ElectionMessage::Accept(own.clone()), tick);
		self.send_to_all_except_self(ElectionMessage::Accept(own), tick);
	}

	fn accept(&mut self, msg: Accept, tick: &mut Tick) {
		if !self.electioneering() {
			return;
		}
		if msg.view != self.last_installed_view {
			return;
		}

		let proposal = match &self.leader_proposal {
			Some(p) => p.clone(),
			None => return
		};
		if proposal.instance_id != msg.leader_id {
			return;
		}

		debug!("(v={}) accept from [{}, {}] for [{}, {}]", msg.view,
			msg.server_endpoint, msg.server_id, msg.leader_endpoint, msg.leader_id);

		if self.accepts_received.insert(msg.server_id) && self.accepts_received.len() == self.majority() {
			// Prefer the gossip row for the winner since it carries the freshest node facts;
			// fall back to the fingerprint if gossip dropped it in the meantime
			let leader = self.servers.iter()
				.find(|m| m.instance_id == proposal.instance_id)
				.cloned()
				.unwrap_or_else(|| proposal.as_member());

			self.leader = Some(proposal.instance_id);
			self.last_elected_leader = Some(proposal.instance_id);
			self.resigning_leader = None;

			info!("(v={}) elections done, elected leader is [{}, {}]", self.last_installed_view,
				leader.external_endpoint, leader.instance_id);

			tick.publish(ElectionEvent::ElectionsDone {
				installed_view: self.last_installed_view,
				leader
			});
		}
	}

	fn elections_timed_out(&mut self, view: i32, tick: &mut Tick) {
		if view != self.last_attempted_view {
			return;
		}
		// The view is still current but a leader was already elected on it
		if self.state != ElectionsState::ElectingLeader && self.leader.is_some() {
			return;
		}

		debug!("(v={}) election timed out (state={:?})", view, self.state);
		let next_view = self.last_attempted_view + 1;
		self.shift_to_leader_election(next_view, tick);
	}

	fn send_view_change_proof(&mut self, tick: &mut Tick) {
		if self.last_installed_view >= 0 {
			let proof = ViewChangeProof {
				server_id: self.node.instance_id,
				server_endpoint: self.node.external_endpoint.clone(),
				installed_view: self.last_installed_view
			};
			self.send_to_all_except_self(ElectionMessage::ViewChangeProof(proof), tick);
		}

		tick.schedule(SEND_VIEW_CHANGE_PROOF_INTERVAL, ElectionMessage::SendViewChangeProof);
	}

	fn view_change_proof(&mut self, msg: ViewChangeProof, tick: &mut Tick) {
		if !self.electioneering() {
			return;
		}
		if msg.installed_view <= self.last_installed_view {
			return;
		}

		// NOTE: Whatever this node still holds from the last election it completed belongs to
		// an older view now; a stale proposal must not shadow the proposal of the view we are
		// adopting, and a stale leader must not stop the progress timeout from rotating us
		self.leader = None;
		self.leader_proposal = None;
		self.accepts_received.clear();

		self.last_attempted_view = msg.installed_view;
		tick.schedule(ELECTION_PROGRESS_TIMEOUT,
			ElectionMessage::ElectionsTimedOut { view: self.last_attempted_view });

		if self.am_proposer_of(self.last_attempted_view) {
			debug!("(v={}) view change proof from [{}, {}], jumping to prepare phase",
				msg.installed_view, msg.server_endpoint, msg.server_id);

			self.state = ElectionsState::ElectingLeader;
			self.shift_to_prepare_phase(tick);
		} else {
			debug!("(v={}) view change proof from [{}, {}], becoming acceptor",
				msg.installed_view, msg.server_endpoint, msg.server_id);

			self.state = ElectionsState::Acceptor;
			self.last_installed_view = msg.installed_view;
		}
	}

	fn gossip_updated(&mut self, info: ClusterInfo) {
		let mut members: Vec<MemberInfo> = info.members.into_iter()
			.filter(|m| m.state != NodeState::Manager)
			.filter(|m| m.is_alive)
			.collect();
		members.sort_by(|a, b| b.external_endpoint.cmp(&a.external_endpoint));

		// NOTE: Ids already recieved into a tally stay counted even when they just dropped
		// out of this snapshot; a node that was live when it voted still cast a valid vote
		self.servers = members;
	}

	fn set_node_priority(&mut self, priority: i32, tick: &mut Tick) {
		debug!("setting node priority to {}", priority);

		self.node_priority = priority;
		tick.publish(ElectionEvent::UpdateNodePriority(priority));
	}

	fn resign_node(&mut self, tick: &mut Tick) {
		if self.leader != Some(self.node.instance_id) {
			info!("node resignation ignored: this node is not the current leader");
			return;
		}

		self.resigning_leader = Some(self.node.instance_id);
		self.resigning_ok_received.clear();

		let own_ok = LeaderIsResigningOk {
			leader_id: self.node.instance_id,
			leader_endpoint: self.node.external_endpoint.clone(),
			server_id: self.node.instance_id,
			server_endpoint: self.node.external_endpoint.clone()
		};
		self.handle(ElectionMessage::LeaderIsResigningOk(own_ok), tick);

		let resigning = LeaderIsResigning {
			leader_id: self.node.instance_id,
			leader_endpoint: self.node.external_endpoint.clone()
		};
		self.send_to_all_except_self(ElectionMessage::LeaderIsResigning(resigning), tick);
	}

	fn leader_is_resigning(&mut self, msg: LeaderIsResigning, tick: &mut Tick) {
		if self.node.is_read_only_replica {
			info!("not acknowledging resignation of [{}, {}]: this node is a read-only replica",
				msg.leader_endpoint, msg.leader_id);
			return;
		}

		info!("leader [{}, {}] is resigning", msg.leader_endpoint, msg.leader_id);
		self.resigning_leader = Some(msg.leader_id);

		let ok = LeaderIsResigningOk {
			leader_id: msg.leader_id,
			leader_endpoint: msg.leader_endpoint.clone(),
			server_id: self.node.instance_id,
			server_endpoint: self.node.external_endpoint.clone()
		};
		tick.send_to(msg.leader_endpoint, ElectionMessage::LeaderIsResigningOk(ok));
	}

	fn leader_is_resigning_ok(&mut self, msg: LeaderIsResigningOk, tick: &mut Tick) {
		debug!("resignation of [{}, {}] acknowledged by [{}, {}]",
			msg.leader_endpoint, msg.leader_id, msg.server_endpoint, msg.server_id);

		if self.resigning_ok_received.insert(msg.server_id)
				&& self.resigning_ok_received.len() == self.majority() {
			info!("majority of resignation acknowledgements, initiating leader resignation");
			tick.publish(ElectionEvent::InitiateLeaderResignation);
		}
	}

	/// Selects the leader to nominate given the fingerprints collected in the prepare phase.
	///
	/// The previous leader is sticky: while it is still alive and not stepping down it is
	/// re-nominated regardless of how the other fingerprints compare. Otherwise the candidate
	/// with the most complete log wins, with the instance id as the final deterministic
	/// tie-break. Returns None only when no fingerprints were collected.
	pub fn best_leader_candidate(
		received: &HashMap<InstanceId, PrepareOk>, servers: &[MemberInfo],
		last_elected_leader: Option<InstanceId>, resigning_leader: Option<InstanceId>
	) -> Option<LeaderCandidate> {

		if let Some(last) = last_elected_leader {
			if Some(last) != resigning_leader {
				if let Some(ok) = received.get(&last) {
					return Some(ok.candidate());
				}

				if let Some(member) = servers.iter()
						.find(|m| m.instance_id == last && m.state == NodeState::Leader) {
					return Some(member.candidate());
				}
			}
		}

		received.values()
			.max_by_key(|ok| (ok.epoch_number, ok.last_commit_position, ok.writer_checkpoint,
				ok.chaser_checkpoint, ok.node_priority, ok.server_id))
			.map(|ok| ok.candidate())
	}

	/// Decides whether an incoming proposal may be accepted by this node
	fn is_legitimate_leader(&self, candidate: &LeaderCandidate) -> bool {
		let previous_leader = self.last_elected_leader.and_then(|last| {
			if Some(last) == self.resigning_leader {
				return None;
			}
			self.servers.iter().find(|m| m.instance_id == last && m.state == NodeState::Leader)
		});

		if let Some(prev) = previous_leader {
			// A live leader only yields to itself, to a strictly newer epoch, or to a forked
			// epoch that has to be healed by a fresh election
			if candidate.instance_id == prev.instance_id
					|| candidate.epoch_number > prev.epoch_number
					|| (candidate.epoch_number == prev.epoch_number && candidate.epoch_id != prev.epoch_id) {
				return true;
			}

			info!("(v={}) rejecting proposal of [{}, {}]: previous leader [{}, {}] is still alive",
				self.last_installed_view, candidate.external_endpoint, candidate.instance_id,
				prev.external_endpoint, prev.instance_id);
			return false;
		}

		if candidate.instance_id == self.node.instance_id {
			return true;
		}

		let own = self.own_candidate();
		if !candidate_at_least_as_good(candidate, &own) {
			info!("(v={}) rejecting proposal of [{}, {}]: our own log is more complete",
				self.last_installed_view, candidate.external_endpoint, candidate.instance_id);
			return false;
		}

		true
	}

	fn create_prepare_ok(&self, view: i32) -> PrepareOk {
		let own = self.own_candidate();

		PrepareOk {
			view,
			server_id: own.instance_id,
			server_endpoint: own.external_endpoint,
			epoch_number: own.epoch_number,
			epoch_position: own.epoch_position,
			epoch_id: own.epoch_id,
			last_commit_position: own.last_commit_position,
			writer_checkpoint: own.writer_checkpoint,
			chaser_checkpoint: own.chaser_checkpoint,
			node_priority: own.node_priority
		}
	}

	/// Assembles this node's current log-completeness fingerprint from the storage ports
	// XXX: The epoch and the two checkpoints are read at slightly different instants; that is
	// fine for ranking purposes but nothing should ever treat this as one atomic snapshot
	fn own_candidate(&self) -> LeaderCandidate {
		let (epoch_number, epoch_position, epoch_id) = match self.epochs.last_epoch() {
			Some(e) => (e.number, e.position, e.id),
			None => (-1, -1, InstanceId::zero())
		};

		LeaderCandidate {
			instance_id: self.node.instance_id,
			external_endpoint: self.node.external_endpoint.clone(),
			epoch_number,
			epoch_position,
			epoch_id,
			last_commit_position: self.positions.last_commit_position(),
			writer_checkpoint: self.positions.writer_checkpoint(),
			chaser_checkpoint: self.positions.chaser_checkpoint(),
			node_priority: self.node_priority
		}
	}

	/// Whether this node is responsible for driving the given view. The proposer rotates
	/// round-robin over the electable members in gossip order.
	fn am_proposer_of(&self, view: i32) -> bool {
		if view < 0 {
			return false;
		}

		let eligible: Vec<&MemberInfo> = self.servers.iter()
			.filter(|m| !m.is_read_only_replica)
			.collect();
		if eligible.is_empty() {
			return false;
		}

		let index = (view as usize) % eligible.len();
		eligible[index].instance_id == self.node.instance_id
	}

	fn known_server(&self, id: InstanceId) -> bool {
		self.servers.iter().any(|m| m.instance_id == id)
	}

	fn send_to_all_except_self(&self, body: ElectionMessage, tick: &mut Tick) {
		let to: Vec<EndPoint> = self.servers.iter()
			.filter(|m| m.instance_id != self.node.instance_id)
			.map(|m| m.external_endpoint.clone())
			.collect();

		tick.send_to_many(to, body);
	}

	/// Number of distinct votes required to get anything done
	/// NOTE: With a fixed cluster size this is always at least one, which is what lets a
	/// single node cluster elect itself without waiting on anyone
	fn majority(&self) -> usize {
		(self.cluster_size as usize) / 2 + 1
	}

	fn electioneering(&self) -> bool {
		match self.state {
			ElectionsState::Idle | ElectionsState::Shutdown => false,
			_ => true
		}
	}
}

/// Compares two fingerprints by log completeness alone: epoch number, then commit position,
/// then writer and chaser checkpoints. Priorities and instance ids do not participate here;
/// equality on all four fields accepts.
pub fn candidate_at_least_as_good(candidate: &LeaderCandidate, own: &LeaderCandidate) -> bool {
	(candidate.epoch_number, candidate.last_commit_position,
		candidate.writer_checkpoint, candidate.chaser_checkpoint)
	>= (own.epoch_number, own.last_commit_position,
		own.writer_checkpoint, own.chaser_checkpoint)
}
