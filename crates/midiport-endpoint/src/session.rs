use midiport_native::host::NativeMidi;
use midiport_native::packet::{PacketListBuilder, TimestampConvention};
use std::sync::Arc;

#[derive(Clone)]
pub struct Session {
    host: Arc<dyn NativeMidi>,
    packets: PacketListBuilder,
}

impl Session {
    pub fn new(host: Arc<dyn NativeMidi>) -> Self {
        let convention = host.timestamp_convention();
        Self::with_convention(host, convention)
    }

    pub fn with_convention(host: Arc<dyn NativeMidi>, convention: TimestampConvention) -> Self {
        log::info!("Constructing MIDI session with {convention} timestamps");
        Self {
            host,
            packets: PacketListBuilder::new(convention),
        }
    }

    #[cfg(target_os = "macos")]
    pub fn core_midi() -> Self {
        Self::new(Arc::new(midiport_native::coremidi::CoreMidiHost::new()))
    }

    pub fn host(&self) -> &Arc<dyn NativeMidi> {
        &self.host
    }

    pub fn native(&self) -> &dyn NativeMidi {
        self.host.as_ref()
    }

    pub fn packet_builder(&self) -> PacketListBuilder {
        self.packets
    }

    pub fn convention(&self) -> TimestampConvention {
        self.packets.convention()
    }

    // Converts a host-clock timestamp, such as `ReceivedPacket::timestamp`.
    pub fn timestamp_to_nanos(&self, host_time: u64) -> u64 {
        self.host.host_time_to_nanos(host_time)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("convention", &self.convention())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use midiport_native::fake::FakeHost;

    #[test]
    fn new_selects_the_convention_reported_by_the_host() {
        let fake = Arc::new(FakeHost::new());
        fake.set_timestamp_convention(TimestampConvention::Split);

        let session = Session::new(fake);

        assert_eq!(session.convention(), TimestampConvention::Split);
        assert_eq!(
            session.packet_builder().convention(),
            TimestampConvention::Split
        );
    }

    #[test]
    fn with_convention_overrides_the_host_convention() {
        let session =
            Session::with_convention(Arc::new(FakeHost::new()), TimestampConvention::Split);
        assert_eq!(session.convention(), TimestampConvention::Split);
    }

    #[test]
    fn timestamp_to_nanos_uses_the_host_clock_rate() {
        let fake = Arc::new(FakeHost::new());
        fake.set_nanos_per_tick(125);
        let session = Session::new(fake);

        assert_eq!(session.timestamp_to_nanos(0), 0);
        assert_eq!(session.timestamp_to_nanos(1_500), 187_500);
    }
}
