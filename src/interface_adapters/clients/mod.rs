// Session verifier implementations: HTTP auth service and in-process store.

pub mod auth;
pub mod memory;

pub use auth::AuthClient;
pub use memory::MemorySessions;
