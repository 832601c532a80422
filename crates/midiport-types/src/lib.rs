pub mod defaults;
pub mod endpoint_type;
pub mod errors;
pub mod handle;
pub mod info;
pub mod status;
