// Property identifiers, matching the textual values of CoreMIDI's kMIDIProperty* keys
pub const PROPERTY_MANUFACTURER: &str = "manufacturer";
pub const PROPERTY_MODEL: &str = "model";
pub const PROPERTY_OFFLINE: &str = "offline";
pub const PROPERTY_UNIQUE_ID: &str = "uniqueID";

// Packet list layout
pub const PACKET_COUNT_FIELD_SIZE: usize = 4;
pub const WIDE_TIMESTAMP_FIELD_SIZE: usize = 8;
pub const SPLIT_TIMESTAMP_FIELD_SIZE: usize = 4;
pub const RESERVED_FIELD_SIZE: usize = 4;
pub const LENGTH_FIELD_SIZE: usize = 2;
