/// Role the local node is currently playing in the election protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionsState {
	/// No election has been started yet. All protocol messages are dropped until the node
	/// receives its first start signal.
	Idle,

	/// An election attempt is in flight: collecting view changes for the attempted view, or
	/// (as the proposer) collecting prepare acknowledgements
	ElectingLeader,

	/// This node is the proposer of the installed view and has sent its proposal
	Leader,

	/// This node follows the proposer of the installed view and votes on its proposal
	Acceptor,

	/// Terminal. Every handler is a no-op from here on.
	Shutdown
}

impl ElectionsState {
	pub fn is_shutdown(&self) -> bool {
		*self == ElectionsState::Shutdown
	}
}
