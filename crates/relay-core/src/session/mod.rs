//! Sessions: the provider sets a dispatcher hands out for one application, chain, and
//! epoch, and the bounded cache that keeps them between relays.

pub mod cache;
pub mod types;

pub use cache::{CacheStats, SessionCache};
pub use types::{epoch_start, ServiceNode, Session, SessionError, SessionHeader, StakingStatus};
