pub mod types;
pub mod loader;
pub mod validator;
pub mod resolved;
pub mod server;

pub use types::*;
pub use loader::*;
pub use validator::*;
pub use resolved::*;
pub use server::ServerConfig;
