pub mod tabular;
pub mod hierarchy;
pub mod conversations;
pub mod packets;
pub mod credentials;
pub mod threat;
pub mod bound;

pub use hierarchy::{parse_hierarchy, ProtocolStatRow};
pub use conversations::{parse_conversations, ConversationRow};
pub use packets::{parse_packets, PacketSummary, TrafficOverview};
pub use credentials::{Credential, CredentialExtractor, CredentialRecord, Extraction, PlaintextFamily};
pub use threat::{correlate, observed_addresses, Blacklist};
pub use bound::{bound_joined, bound_list, BoundedPayload};
