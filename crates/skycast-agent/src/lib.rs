//! Background-agent embodiment: the agent owns the network and the cache
//! writes, foreground surfaces talk to it by message.

pub mod agent;
pub mod client;
pub mod protocol;

pub use agent::{AgentHandle, BackgroundAgent};
pub use client::AgentClient;
pub use protocol::{AgentReply, AgentRequest, Envelope};
