use std::fmt;

/*
	NOTE: When two nodes first connect to each other they should exchange cluster ids to
	validate that both are operating in the same namespace of instance ids; until that lands
	the transport layer is trusted to only ever deliver messages from our own cluster

	TODO: Over the wire the per-message endpoint fields are technically redundant once the
	sender's identity is established on the connection layer, and could be dropped from the
	encoding (they are kept for now because the resignation handshake replies to the endpoint
	named in the message rather than the connection it arrived on)

	- Types of members as far as elections are concerned:
		- Electable nodes : can propose views, vote and end up as the leader
		- Read-only replicas : follow views and observe results but never vote
		- Managers : ignored entirely, they never appear in the election snapshot
*/

/// Opaque 128-bit identity of a single node instance. Assigned once when a node first joins
/// the cluster and never reused.
///
/// Ordering is defined over the canonical 16-byte big-endian form so that comparisons are
/// stable across platforms and match the unsigned numeric order of the id.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId([u8; 16]);

impl InstanceId {
	pub fn from_bytes(bytes: [u8; 16]) -> InstanceId {
		InstanceId(bytes)
	}

	pub fn from_u128(value: u128) -> InstanceId {
		InstanceId(value.to_be_bytes())
	}

	/// The all-zero id, used as the 'no epoch' marker
	pub fn zero() -> InstanceId {
		InstanceId([0u8; 16])
	}

	pub fn is_zero(&self) -> bool {
		self.0.iter().all(|b| *b == 0)
	}

	pub fn as_bytes(&self) -> &[u8; 16] {
		&self.0
	}

	pub fn to_u128(&self) -> u128 {
		u128::from_be_bytes(self.0)
	}
}

impl fmt::Display for InstanceId {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{:032x}", self.to_u128())
	}
}

/// Address at which a node can be reached
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EndPoint {
	pub host: String,
	pub port: u16
}

impl EndPoint {
	pub fn new<S: Into<String>>(host: S, port: u16) -> EndPoint {
		EndPoint { host: host.into(), port }
	}
}

impl fmt::Display for EndPoint {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}:{}", self.host, self.port)
	}
}

/// A generation of the log. Epochs are opened by a newly installed leader; a higher number
/// strictly supersedes all lower ones.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch {
	pub number: i32,
	pub position: i64,
	pub id: InstanceId
}

/// Lifecycle state of a cluster node as reported by gossip
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
	Initializing,
	Unknown,
	PreReplica,
	CatchingUp,
	Clone,
	Follower,
	PreLeader,
	Leader,
	ResigningLeader,
	Manager,
	ShuttingDown,
	Shutdown,
	ReadOnlyReplica
}

/// Identity of the local node. Fixed for the lifetime of the process.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NodeInfo {
	pub instance_id: InstanceId,
	pub external_endpoint: EndPoint,

	/// Read-only replicas follow the log but are not electable and do not vote
	pub is_read_only_replica: bool
}

/// Gossip's view of a single peer, including the log positions it last advertised
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MemberInfo {
	pub instance_id: InstanceId,
	pub external_endpoint: EndPoint,
	pub state: NodeState,
	pub is_alive: bool,
	pub is_read_only_replica: bool,

	pub epoch_number: i32,
	pub epoch_position: i64,
	pub epoch_id: InstanceId,
	pub last_commit_position: i64,
	pub writer_checkpoint: i64,
	pub chaser_checkpoint: i64,
	pub node_priority: i32
}

impl MemberInfo {
	/// The log-completeness fingerprint this member last advertised
	pub fn candidate(&self) -> LeaderCandidate {
		LeaderCandidate {
			instance_id: self.instance_id,
			external_endpoint: self.external_endpoint.clone(),
			epoch_number: self.epoch_number,
			epoch_position: self.epoch_position,
			epoch_id: self.epoch_id,
			last_commit_position: self.last_commit_position,
			writer_checkpoint: self.writer_checkpoint,
			chaser_checkpoint: self.chaser_checkpoint,
			node_priority: self.node_priority
		}
	}
}

/// Snapshot of the live cluster membership pushed by the gossip layer
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClusterInfo {
	pub members: Vec<MemberInfo>
}

/// How much of the log a node possesses, used to rank candidates during an election.
/// An `epoch_number` of -1 with a zero `epoch_id` means the node has no epoch yet.
/// The writer and chaser checkpoints track how far the physical log has gotten even when
/// those records are not yet commited, which is why they rank below the commit position.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LeaderCandidate {
	pub instance_id: InstanceId,
	pub external_endpoint: EndPoint,

	pub epoch_number: i32,
	pub epoch_position: i64,
	pub epoch_id: InstanceId,

	pub last_commit_position: i64,
	pub writer_checkpoint: i64,
	pub chaser_checkpoint: i64,

	pub node_priority: i32
}

impl LeaderCandidate {
	/// Builds the member record announced when this candidate wins an election. Used when the
	/// winner is not present in the local gossip snapshot.
	pub fn as_member(&self) -> MemberInfo {
		MemberInfo {
			instance_id: self.instance_id,
			external_endpoint: self.external_endpoint.clone(),
			state: NodeState::Leader,
			is_alive: true,
			is_read_only_replica: false,
			epoch_number: self.epoch_number,
			epoch_position: self.epoch_position,
			epoch_id: self.epoch_id,
			last_commit_position: self.last_commit_position,
			writer_checkpoint: self.writer_checkpoint,
			chaser_checkpoint: self.chaser_checkpoint,
			node_priority: self.node_priority
		}
	}
}

/// Announces that the sender wants to move the cluster to a new election attempt
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ViewChange {
	pub server_id: InstanceId,
	pub server_endpoint: EndPoint,
	pub attempted_view: i32
}

/// Periodic re-advertisement of the sender's installed view so that nodes which missed the
/// original view change can catch up
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ViewChangeProof {
	pub server_id: InstanceId,
	pub server_endpoint: EndPoint,
	pub installed_view: i32
}

/// Sent by the proposer of a view once a majority of nodes agreed to attempt it
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Prepare {
	pub server_id: InstanceId,
	pub server_endpoint: EndPoint,
	pub view: i32
}

/// A node's reply to a `Prepare`, carrying its own log-completeness fingerprint
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PrepareOk {
	pub view: i32,
	pub server_id: InstanceId,
	pub server_endpoint: EndPoint,

	pub epoch_number: i32,
	pub epoch_position: i64,
	pub epoch_id: InstanceId,
	pub last_commit_position: i64,
	pub writer_checkpoint: i64,
	pub chaser_checkpoint: i64,
	pub node_priority: i32
}

impl PrepareOk {
	pub fn candidate(&self) -> LeaderCandidate {
		LeaderCandidate {
			instance_id: self.server_id,
			external_endpoint: self.server_endpoint.clone(),
			epoch_number: self.epoch_number,
			epoch_position: self.epoch_position,
			epoch_id: self.epoch_id,
			last_commit_position: self.last_commit_position,
			writer_checkpoint: self.writer_checkpoint,
			chaser_checkpoint: self.chaser_checkpoint,
			node_priority: self.node_priority
		}
	}
}

/// The proposer's nomination of a leader for the current view
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Proposal {
	pub server_id: InstanceId,
	pub server_endpoint: EndPoint,
	pub leader_id: InstanceId,
	pub leader_endpoint: EndPoint,
	pub view: i32,

	pub epoch_number: i32,
	pub epoch_position: i64,
	pub epoch_id: InstanceId,
	pub last_commit_position: i64,
	pub writer_checkpoint: i64,
	pub chaser_checkpoint: i64,
	pub node_priority: i32
}

impl Proposal {
	pub fn new(server_id: InstanceId, server_endpoint: EndPoint, candidate: &LeaderCandidate, view: i32) -> Proposal {
		Proposal {
			server_id,
			server_endpoint,
			leader_id: candidate.instance_id,
			leader_endpoint: candidate.external_endpoint.clone(),
			view,
			epoch_number: candidate.epoch_number,
			epoch_position: candidate.epoch_position,
			epoch_id: candidate.epoch_id,
			last_commit_position: candidate.last_commit_position,
			writer_checkpoint: candidate.writer_checkpoint,
			chaser_checkpoint: candidate.chaser_checkpoint,
			node_priority: candidate.node_priority
		}
	}

	pub fn candidate(&self) -> LeaderCandidate {
		LeaderCandidate {
			instance_id: self.leader_id,
			external_endpoint: self.leader_endpoint.clone(),
			epoch_number: self.epoch_number,
			epoch_position: self.epoch_position,
			epoch_id: self.epoch_id,
			last_commit_position: self.last_commit_position,
			writer_checkpoint: self.writer_checkpoint,
			chaser_checkpoint: self.chaser_checkpoint,
			node_priority: self.node_priority
		}
	}
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Accept {
	pub server_id: InstanceId,
	pub server_endpoint: EndPoint,
	pub leader_id: InstanceId,
	pub leader_endpoint: EndPoint,
	pub view: i32
}

/// Broadcast by a leader that wants to step down gracefully
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LeaderIsResigning {
	pub leader_id: InstanceId,
	pub leader_endpoint: EndPoint
}

/// Acknowledgement of a resignation announcement, sent back to the resigning leader
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LeaderIsResigningOk {
	pub leader_id: InstanceId,
	pub leader_endpoint: EndPoint,
	pub server_id: InstanceId,
	pub server_endpoint: EndPoint
}

/// Every input the elections module can receive, either from a peer over the wire, from the
/// local timer service, or from the rest of the node.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ElectionMessage {
	// Control messages originating on the local node
	StartElections,
	ElectionsTimedOut { view: i32 },
	SendViewChangeProof,
	BecomeShuttingDown,
	GossipUpdated(ClusterInfo),
	SetNodePriority(i32),
	ResignNode,

	// Election protocol messages exchanged between nodes
	ViewChange(ViewChange),
	ViewChangeProof(ViewChangeProof),
	Prepare(Prepare),
	PrepareOk(PrepareOk),
	Proposal(Proposal),
	Accept(Accept),

	// Resignation handshake
	LeaderIsResigning(LeaderIsResigning),
	LeaderIsResigningOk(LeaderIsResigningOk)
}

/// Events published on the local bus for the rest of the node to consume
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ElectionEvent {
	/// A leader was elected for the given view. Consumers are responsible for acting on the
	/// result (e.g. becoming leader or subscribing to the new one).
	ElectionsDone { installed_view: i32, leader: MemberInfo },

	/// A majority of peers acknowledged this node's resignation; the node may now begin
	/// stepping down.
	InitiateLeaderResignation,

	/// The operator changed this node's election priority; gossip should spread the new value
	UpdateNodePriority(i32)
}
