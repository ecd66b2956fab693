extern crate elections;
extern crate env_logger;
extern crate rand;

use elections::elections::*;
use elections::ports::*;
use elections::protos::*;
use elections::state::ElectionsState;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::Arc;

struct FixedEpochs(Option<Epoch>);

impl EpochStore for FixedEpochs {
	fn last_epoch(&self) -> Option<Epoch> {
		self.0
	}
}

struct FixedPositions {
	writer: i64,
	chaser: i64,
	commit: i64
}

impl LogPositions for FixedPositions {
	fn writer_checkpoint(&self) -> i64 {
		self.writer
	}
	fn chaser_checkpoint(&self) -> i64 {
		self.chaser
	}
	fn last_commit_position(&self) -> i64 {
		self.commit
	}
}

/// Everything needed to stand up one node of the simulated cluster
struct NodeConfig {
	id: u128,
	port: u16,
	epoch: Option<Epoch>,
	commit: i64,
	writer: i64,
	chaser: i64,
	priority: i32
}

fn node(id: u128, port: u16) -> NodeConfig {
	NodeConfig {
		id,
		port,
		epoch: None,
		commit: 0,
		writer: 0,
		chaser: 0,
		priority: 0
	}
}

struct TestNode {
	module: ElectionsModule,
	endpoint: EndPoint,
	inbox: VecDeque<ElectionMessage>,

	/// Timer messages armed by the module but not yet fired
	timers: Vec<ElectionMessage>,

	events: Vec<ElectionEvent>,

	/// A dead node stops processing anything
	alive: bool,

	/// A partitioned node keeps running but all traffic to and from it is lost
	connected: bool
}

/// Hosts a cluster of election modules in-process, routing envelopes between them and firing
/// timers only when a test asks for it. All delivery is lossy the moment a node is dead or
/// partitioned, mirroring what the real transport is allowed to do.
struct Cluster {
	nodes: Vec<TestNode>,
	members: Vec<MemberInfo>
}

impl Cluster {

	fn new(configs: Vec<NodeConfig>) -> Cluster {
		let _ = env_logger::try_init();

		let cluster_size = configs.len() as u32;

		let members: Vec<MemberInfo> = configs.iter().map(|s| {
			let (epoch_number, epoch_position, epoch_id) = match s.epoch {
				Some(e) => (e.number, e.position, e.id),
				None => (-1, -1, InstanceId::zero())
			};

			MemberInfo {
				instance_id: InstanceId::from_u128(s.id),
				external_endpoint: EndPoint::new("10.0.0.1", s.port),
				state: NodeState::Unknown,
				is_alive: true,
				is_read_only_replica: false,
				epoch_number,
				epoch_position,
				epoch_id,
				last_commit_position: s.commit,
				writer_checkpoint: s.writer,
				chaser_checkpoint: s.chaser,
				node_priority: s.priority
			}
		}).collect();

		let nodes = configs.into_iter().map(|s| {
			let endpoint = EndPoint::new("10.0.0.1", s.port);
			let module = ElectionsModule::new(
				NodeInfo {
					instance_id: InstanceId::from_u128(s.id),
					external_endpoint: endpoint.clone(),
					is_read_only_replica: false
				},
				cluster_size, s.priority,
				Arc::new(FixedEpochs(s.epoch)),
				Arc::new(FixedPositions {
					writer: s.writer,
					chaser: s.chaser,
					commit: s.commit
				})
			).unwrap();

			TestNode {
				module,
				endpoint,
				inbox: VecDeque::new(),
				timers: vec![],
				events: vec![],
				alive: true,
				connected: true
			}
		}).collect();

		Cluster { nodes, members }
	}

	fn enqueue(&mut self, i: usize, msg: ElectionMessage) {
		self.nodes[i].inbox.push_back(msg);
	}

	fn enqueue_all(&mut self, msg: ElectionMessage) {
		for node in self.nodes.iter_mut() {
			node.inbox.push_back(msg.clone());
		}
	}

	/// Pushes the current membership table to every node
	fn gossip_all(&mut self) {
		let info = ClusterInfo { members: self.members.clone() };
		self.enqueue_all(ElectionMessage::GossipUpdated(info));
		self.run();
	}

	/// Processes one inbox message on node i, routing whatever it produced
	fn step(&mut self, i: usize, msg: ElectionMessage) {
		let mut tick = Tick::empty();
		self.nodes[i].module.handle(msg, &mut tick);

		self.nodes[i].events.extend(tick.events);
		for (_delay, m) in tick.timers {
			self.nodes[i].timers.push(m);
		}

		let connected = self.nodes[i].connected;
		for envelope in tick.messages {
			if !connected {
				continue;
			}

			for to in &envelope.to {
				if let Some(j) = self.index_of(to) {
					if self.nodes[j].alive && self.nodes[j].connected {
						self.nodes[j].inbox.push_back(envelope.body.clone());
					}
				}
			}
		}
	}

	fn run_one(&mut self, i: usize) -> bool {
		if !self.nodes[i].alive {
			return false;
		}

		match self.nodes[i].inbox.pop_front() {
			Some(msg) => {
				self.step(i, msg);
				true
			},
			None => false
		}
	}

	/// Round-robins over the nodes until every inbox is drained. Timers never fire on their
	/// own; tests trigger them explicitly.
	fn run(&mut self) {
		loop {
			let mut progressed = false;
			for i in 0..self.nodes.len() {
				if self.run_one(i) {
					progressed = true;
				}
			}
			if !progressed {
				return;
			}
		}
	}

	/// Delivers every pending progress-timeout message on node i, then quiesces. Fires for
	/// abandoned views are included; the module is expected to ignore those.
	fn fire_timeouts(&mut self, i: usize) {
		let timers = std::mem::replace(&mut self.nodes[i].timers, vec![]);
		let (fire, keep): (Vec<_>, Vec<_>) = timers.into_iter().partition(|m| match m {
			ElectionMessage::ElectionsTimedOut { .. } => true,
			_ => false
		});

		self.nodes[i].timers = keep;
		for msg in fire {
			self.nodes[i].inbox.push_back(msg);
		}
		self.run();
	}

	/// Delivers one pending proof-broadcast tick on node i, then quiesces
	fn fire_proof(&mut self, i: usize) {
		let position = self.nodes[i].timers.iter().position(|m| match m {
			ElectionMessage::SendViewChangeProof => true,
			_ => false
		});

		if let Some(p) = position {
			let msg = self.nodes[i].timers.remove(p);
			self.nodes[i].inbox.push_back(msg);
			self.run();
		}
	}

	fn index_of(&self, endpoint: &EndPoint) -> Option<usize> {
		self.nodes.iter().position(|n| n.endpoint == *endpoint)
	}

	fn done_events(&self, i: usize) -> Vec<(i32, InstanceId)> {
		self.nodes[i].events.iter().filter_map(|e| match e {
			ElectionEvent::ElectionsDone { installed_view, leader } =>
				Some((*installed_view, leader.instance_id)),
			_ => None
		}).collect()
	}

	fn last_done(&self, i: usize) -> Option<(i32, InstanceId)> {
		self.done_events(i).last().cloned()
	}
}

fn id(n: u128) -> InstanceId {
	InstanceId::from_u128(n)
}

#[test]
fn cold_start_elects_the_highest_ranked_node() {
	// The node on port 3003 both sorts first (proposer of view 0) and carries the highest
	// instance id (winner of the fingerprint tie-break)
	let mut cluster = Cluster::new(vec![node(3, 3003), node(2, 3002), node(1, 3001)]);

	cluster.gossip_all();
	cluster.enqueue_all(ElectionMessage::StartElections);
	cluster.run();

	for i in 0..3 {
		assert_eq!(cluster.last_done(i), Some((0, id(3))), "node {} disagrees", i);
	}
}

#[test]
fn surviving_nodes_elect_a_leader_after_the_proposer_crashes() {
	let mut cluster = Cluster::new(vec![node(3, 3003), node(2, 3002), node(1, 3001)]);

	cluster.gossip_all();
	cluster.enqueue_all(ElectionMessage::StartElections);

	// Everyone announces view 0, then the view-0 proposer dies before preparing
	for i in 0..3 {
		cluster.run_one(i);
	}
	cluster.nodes[0].alive = false;
	cluster.run();

	assert!(cluster.done_events(1).is_empty());
	assert!(cluster.done_events(2).is_empty());

	// Progress timeouts rotate the survivors to view 1, which the next node drives
	cluster.fire_timeouts(1);
	cluster.fire_timeouts(2);

	assert_eq!(cluster.last_done(1), Some((1, id(2))));
	assert_eq!(cluster.last_done(2), Some((1, id(2))));
	assert!(cluster.done_events(0).is_empty());
}

#[test]
fn live_leader_is_reelected_across_views() {
	let mut cluster = Cluster::new(vec![
		node(5, 3005), node(4, 3004), node(3, 3003), node(2, 3002), node(1, 3001)
	]);

	cluster.gossip_all();
	cluster.enqueue_all(ElectionMessage::StartElections);
	cluster.run();
	for i in 0..5 {
		assert_eq!(cluster.last_done(i), Some((0, id(5))));
	}

	// Gossip now reports the winner as an installed leader; a fresh election round driven by
	// a different proposer must still come back to it
	cluster.members[0].state = NodeState::Leader;
	cluster.gossip_all();
	cluster.enqueue_all(ElectionMessage::StartElections);
	cluster.run();

	for i in 0..5 {
		assert_eq!(cluster.last_done(i), Some((1, id(5))));
	}
}

#[test]
fn most_complete_log_wins_the_election() {
	let epoch_id = id(0xee);
	let mut a = node(1, 3003);
	a.epoch = Some(Epoch { number: 5, position: 50, id: epoch_id });
	a.commit = 100;
	let mut b = node(2, 3002);
	b.epoch = Some(Epoch { number: 5, position: 50, id: epoch_id });
	b.commit = 200;
	let mut c = node(3, 3001);
	c.epoch = Some(Epoch { number: 5, position: 50, id: epoch_id });
	c.commit = 150;

	let mut cluster = Cluster::new(vec![a, b, c]);
	cluster.gossip_all();
	cluster.enqueue_all(ElectionMessage::StartElections);
	cluster.run();

	// Not the proposer and not the highest id: the longest committed log alone decides
	for i in 0..3 {
		assert_eq!(cluster.last_done(i), Some((0, id(2))), "node {} disagrees", i);
	}
}

#[test]
fn resigned_leader_is_not_sticky_in_the_next_election() {
	// The first round is decided by priority, the second by the id tie-break
	let mut a = node(1, 3003);
	a.priority = 1;
	let mut cluster = Cluster::new(vec![a, node(3, 3002), node(2, 3001)]);

	cluster.gossip_all();
	cluster.enqueue_all(ElectionMessage::StartElections);
	cluster.run();
	for i in 0..3 {
		assert_eq!(cluster.last_done(i), Some((0, id(1))));
	}

	// The leader drops its priority advantage and asks to step down
	cluster.enqueue(0, ElectionMessage::SetNodePriority(0));
	cluster.enqueue(0, ElectionMessage::ResignNode);
	cluster.run();

	assert!(cluster.nodes[0].events.contains(&ElectionEvent::UpdateNodePriority(0)));
	let resignations = cluster.nodes[0].events.iter().filter(|e| match e {
		ElectionEvent::InitiateLeaderResignation => true,
		_ => false
	}).count();
	assert_eq!(resignations, 1);

	// The next election skips the resigning leader even though it is the previous winner
	cluster.enqueue_all(ElectionMessage::StartElections);
	cluster.run();

	for i in 0..3 {
		let (view, leader) = cluster.last_done(i).unwrap();
		assert_eq!(view, 1);
		assert_eq!(leader, id(3));
	}
}

#[test]
fn view_change_proof_heals_a_partitioned_node() {
	let mut cluster = Cluster::new(vec![node(3, 3003), node(2, 3002), node(1, 3001)]);

	cluster.gossip_all();

	// A full partition: every node attempts views on its own without reaching anyone
	for node in cluster.nodes.iter_mut() {
		node.connected = false;
	}
	cluster.enqueue_all(ElectionMessage::StartElections);
	cluster.run();
	cluster.fire_timeouts(0);
	cluster.fire_timeouts(1);

	// Two of the nodes reconnect and complete an election at the view they reached
	cluster.nodes[0].connected = true;
	cluster.nodes[1].connected = true;
	cluster.fire_timeouts(0);
	cluster.fire_timeouts(1);

	assert_eq!(cluster.last_done(0), Some((3, id(3))));
	assert_eq!(cluster.last_done(1), Some((3, id(3))));

	// The third node reconnects knowing nothing; the periodic proof pulls it forward
	cluster.nodes[2].connected = true;
	assert_eq!(cluster.nodes[2].module.last_installed_view(), -1);

	cluster.fire_proof(0);

	assert_eq!(cluster.nodes[2].module.state(), ElectionsState::Acceptor);
	assert_eq!(cluster.nodes[2].module.last_attempted_view(), 3);
	assert_eq!(cluster.nodes[2].module.last_installed_view(), 3);

	// Once its progress timeout fires it drives the cluster into the next view and takes
	// part in a full election again
	cluster.fire_timeouts(2);

	for i in 0..3 {
		let (view, leader) = cluster.last_done(i).unwrap();
		assert_eq!(view, 4, "node {} is on the wrong view", i);
		assert_eq!(leader, id(3), "node {} disagrees on the leader", i);
	}
}

#[test]
fn shuffled_delivery_never_splits_a_view() {
	for seed in 0..10u64 {
		let mut rng = StdRng::seed_from_u64(seed);
		let mut cluster = Cluster::new(vec![node(3, 3003), node(2, 3002), node(1, 3001)]);

		cluster.gossip_all();
		cluster.enqueue_all(ElectionMessage::StartElections);

		let mut max_installed = vec![-1i32; 3];

		for _ in 0..500 {
			let i = rng.gen_range(0, cluster.nodes.len());

			// Occasionally fire a pending timer instead of delivering traffic
			if rng.gen_bool(0.05) && !cluster.nodes[i].timers.is_empty() {
				let t = rng.gen_range(0, cluster.nodes[i].timers.len());
				let msg = cluster.nodes[i].timers.remove(t);
				cluster.step(i, msg);
				continue;
			}

			// Deliver a random message from the inbox, not necessarily the oldest
			if !cluster.nodes[i].inbox.is_empty() {
				let m = rng.gen_range(0, cluster.nodes[i].inbox.len());
				if let Some(msg) = cluster.nodes[i].inbox.remove(m) {
					cluster.step(i, msg);
				}
			}

			// Installed views only ever move forward
			for n in 0..3 {
				let installed = cluster.nodes[n].module.last_installed_view();
				assert!(installed >= max_installed[n],
					"seed {}: node {} went backwards from {} to {}",
					seed, n, max_installed[n], installed);
				max_installed[n] = installed;
			}
		}

		// Let the cluster settle completely, nudging it with timeouts if the random phase
		// left an attempt half-finished
		for _ in 0..20 {
			cluster.run();
			let settled = (0..3).all(|i| !cluster.done_events(i).is_empty());
			if settled {
				break;
			}
			for i in 0..3 {
				cluster.fire_timeouts(i);
			}
		}

		// However delivery was ordered, no view may ever name two different leaders
		let mut agreed: Vec<(i32, InstanceId)> = vec![];
		for i in 0..3 {
			assert!(!cluster.done_events(i).is_empty(), "seed {}: node {} never saw a result", seed, i);
			for (view, leader) in cluster.done_events(i) {
				match agreed.iter().find(|(v, _)| *v == view) {
					Some((_, l)) => assert_eq!(*l, leader,
						"seed {}: view {} elected two leaders", seed, view),
					None => agreed.push((view, leader))
				}
			}
		}
	}
}
