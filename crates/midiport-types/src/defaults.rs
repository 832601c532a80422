pub struct Defaults {}

impl Defaults {
    // Packet Defaults
    pub const PACKET_DATA_CAPACITY: usize = 256;
    pub const SEND_TIMESTAMP: u64 = 0;

    // Resource Label Defaults
    pub const CLIENT_LABEL_PREFIX: &'static str = "Client";
    pub const PORT_LABEL_PREFIX: &'static str = "Port";

    // Endpoint Defaults
    pub const INPUT_CHANNEL_CAPACITY: usize = 64;
    pub const OFFLINE_FLAG_WHEN_ABSENT: i32 = 0;
    pub const UNKNOWN_PROPERTY_VALUE: &'static str = "";
}
