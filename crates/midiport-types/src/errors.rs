use crate::endpoint_type::EndpointType;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    #[error("Native call failed with status {code}")]
    NativeCallFailed { code: i32 },

    #[error("Property '{key}' is not available")]
    PropertyUnavailable { key: String },

    #[error("Packet of {length} bytes exceeds the packet capacity of {capacity} bytes")]
    PacketOverflow { length: usize, capacity: usize },

    #[error("Packet payload is empty")]
    EmptyPacket,

    #[error("Timestamp {timestamp} does not fit a 32-bit timestamp field")]
    TimestampOutOfRange { timestamp: u64 },

    #[error("Native handle has been disposed or is no longer valid")]
    InvalidHandle,

    #[error("Operation requires an {expected} endpoint")]
    WrongDirection { expected: EndpointType },

    #[error("String contains an interior NUL byte")]
    InvalidString,
}
