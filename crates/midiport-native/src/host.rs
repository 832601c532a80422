use crate::packet::{PacketList, TimestampConvention};
use crossbeam_channel::Sender;
use midiport_types::errors::EndpointError;
use midiport_types::handle::RawRef;
use midiport_types::status::NativeStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedPacket {
    pub timestamp: u64,
    pub data: Vec<u8>,
}

pub type PacketSink = Sender<ReceivedPacket>;

pub trait StringService {
    fn create_string(&self, value: &str) -> Result<RawRef, EndpointError>;

    fn string_length(&self, string: RawRef) -> isize;

    // Excludes the NUL terminator.
    fn max_size_for_encoding(&self, length: isize) -> isize;

    fn copy_c_string(&self, string: RawRef, buffer: &mut [u8]) -> bool;

    fn release(&self, string: RawRef);
}

pub trait MidiHost {
    fn device_count(&self) -> usize;
    fn device(&self, index: usize) -> RawRef;
    fn entity_count(&self, device: RawRef) -> usize;
    fn entity(&self, device: RawRef, index: usize) -> RawRef;
    fn source_count(&self, entity: RawRef) -> usize;
    fn source(&self, entity: RawRef, index: usize) -> RawRef;
    fn destination_count(&self, entity: RawRef) -> usize;
    fn destination(&self, entity: RawRef, index: usize) -> RawRef;

    fn string_property(&self, object: RawRef, property: RawRef) -> (NativeStatus, RawRef);
    fn integer_property(&self, object: RawRef, property: RawRef) -> (NativeStatus, i32);

    fn create_client(&self, name: RawRef) -> (NativeStatus, RawRef);
    fn create_output_port(&self, client: RawRef, name: RawRef) -> (NativeStatus, RawRef);
    fn create_input_port(
        &self,
        client: RawRef,
        name: RawRef,
        sink: PacketSink,
    ) -> (NativeStatus, RawRef);
    fn connect_source(&self, port: RawRef, source: RawRef) -> NativeStatus;
    fn dispose_client(&self, client: RawRef) -> NativeStatus;
    fn dispose_port(&self, port: RawRef) -> NativeStatus;

    fn send(&self, port: RawRef, destination: RawRef, packets: &PacketList) -> NativeStatus;

    fn timestamp_convention(&self) -> TimestampConvention;
    fn host_time_to_nanos(&self, host_time: u64) -> u64;
}

pub trait NativeMidi: MidiHost + StringService + Send + Sync {}

impl<T: MidiHost + StringService + Send + Sync> NativeMidi for T {}
