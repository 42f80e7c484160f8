mod block_list;
mod session;

pub use block_list::{AppIdentifier, BlockList};
pub use session::{Session, SessionStatus, DEFAULT_DURATION_SECS};
