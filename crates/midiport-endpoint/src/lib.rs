pub mod discovery;
pub mod endpoint;
pub mod session;

pub use endpoint::Endpoint;
pub use session::Session;
