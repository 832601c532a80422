use crate::constants::{PROPERTY_MANUFACTURER, PROPERTY_MODEL, PROPERTY_OFFLINE, PROPERTY_UNIQUE_ID};
use crate::host::{MidiHost, PacketSink, ReceivedPacket, StringService};
use crate::packet::{PacketList, TimestampConvention};
use midiport_types::errors::EndpointError;
use midiport_types::handle::RawRef;
use midiport_types::status::{
    NativeStatus, STATUS_INVALID_CLIENT, STATUS_INVALID_PORT, STATUS_OBJECT_NOT_FOUND,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

const STATUS_PARAMETER_ERROR: i32 = -50;
const STATUS_UNKNOWN_PROPERTY: i32 = -10835;
const UTF8_BYTES_PER_UTF16_UNIT: isize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeCall {
    CreateClient,
    CreateOutputPort,
    CreateInputPort,
    ConnectSource,
    Send,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPacketList {
    pub port: RawRef,
    pub destination: RawRef,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
struct FakeObject {
    strings: HashMap<String, String>,
    integers: HashMap<String, i32>,
}

struct FakePort {
    client: RawRef,
    sink: Option<PacketSink>,
    sources: Vec<RawRef>,
}

struct FakeState {
    next_ref: usize,
    devices: Vec<RawRef>,
    entities: HashMap<RawRef, Vec<RawRef>>,
    sources: HashMap<RawRef, Vec<RawRef>>,
    destinations: HashMap<RawRef, Vec<RawRef>>,
    objects: HashMap<RawRef, FakeObject>,
    strings: HashMap<RawRef, String>,
    invalid_releases: usize,
    clients: HashMap<RawRef, String>,
    client_names: Vec<String>,
    ports: HashMap<RawRef, FakePort>,
    port_names: Vec<String>,
    dispose_calls: usize,
    failures: HashMap<FakeCall, i32>,
    sent: Vec<SentPacketList>,
    convention: TimestampConvention,
    nanos_per_tick: u64,
}

impl FakeState {
    fn allocate(&mut self) -> RawRef {
        self.next_ref += 1;
        RawRef::new(self.next_ref)
    }

    fn add_object(&mut self) -> RawRef {
        let object = self.allocate();
        self.objects.insert(object, FakeObject::default());
        object
    }

    fn object_mut(&mut self, object: RawRef) -> &mut FakeObject {
        self.objects.entry(object).or_default()
    }

    fn take_failure(&mut self, call: FakeCall) -> Option<NativeStatus> {
        self.failures.remove(&call).map(NativeStatus)
    }

    fn string(&self, string: RawRef) -> Option<&String> {
        self.strings.get(&string)
    }

    fn is_source(&self, endpoint: RawRef) -> bool {
        self.objects.contains_key(&endpoint)
            && self.sources.values().any(|sources| sources.contains(&endpoint))
    }
}

pub struct FakeHost {
    state: Mutex<FakeState>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_ref: 0,
                devices: Vec::new(),
                entities: HashMap::new(),
                sources: HashMap::new(),
                destinations: HashMap::new(),
                objects: HashMap::new(),
                strings: HashMap::new(),
                invalid_releases: 0,
                clients: HashMap::new(),
                client_names: Vec::new(),
                ports: HashMap::new(),
                port_names: Vec::new(),
                dispose_calls: 0,
                failures: HashMap::new(),
                sent: Vec::new(),
                convention: TimestampConvention::Wide,
                nanos_per_tick: 1,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_device(&self) -> RawRef {
        let mut state = self.state();
        let device = state.add_object();
        state.devices.push(device);
        state.entities.insert(device, Vec::new());
        device
    }

    pub fn add_entity(&self, device: RawRef, manufacturer: &str, model: &str) -> RawRef {
        let mut state = self.state();
        let entity = state.add_object();
        let object = state.object_mut(entity);
        object
            .strings
            .insert(PROPERTY_MANUFACTURER.to_string(), manufacturer.to_string());
        object
            .strings
            .insert(PROPERTY_MODEL.to_string(), model.to_string());
        object.integers.insert(PROPERTY_OFFLINE.to_string(), 0);

        state.entities.entry(device).or_default().push(entity);
        state.sources.insert(entity, Vec::new());
        state.destinations.insert(entity, Vec::new());
        entity
    }

    pub fn add_source(&self, entity: RawRef) -> RawRef {
        let mut state = self.state();
        let source = state.add_object();
        state
            .object_mut(source)
            .integers
            .insert(PROPERTY_UNIQUE_ID.to_string(), source.as_usize() as i32);
        state.sources.entry(entity).or_default().push(source);
        source
    }

    pub fn add_destination(&self, entity: RawRef) -> RawRef {
        let mut state = self.state();
        let destination = state.add_object();
        state
            .object_mut(destination)
            .integers
            .insert(PROPERTY_UNIQUE_ID.to_string(), destination.as_usize() as i32);
        state
            .destinations
            .entry(entity)
            .or_default()
            .push(destination);
        destination
    }

    pub fn set_string_property(&self, object: RawRef, key: &str, value: &str) {
        self.state()
            .object_mut(object)
            .strings
            .insert(key.to_string(), value.to_string());
    }

    pub fn remove_string_property(&self, object: RawRef, key: &str) {
        self.state().object_mut(object).strings.remove(key);
    }

    pub fn set_integer_property(&self, object: RawRef, key: &str, value: i32) {
        self.state()
            .object_mut(object)
            .integers
            .insert(key.to_string(), value);
    }

    pub fn remove_integer_property(&self, object: RawRef, key: &str) {
        self.state().object_mut(object).integers.remove(key);
    }

    pub fn remove_device(&self, device: RawRef) {
        let mut state = self.state();
        state.devices.retain(|attached| *attached != device);
        state.objects.remove(&device);

        let entities = state.entities.remove(&device).unwrap_or_default();
        for entity in entities {
            state.objects.remove(&entity);
            let sources = state.sources.remove(&entity).unwrap_or_default();
            let destinations = state.destinations.remove(&entity).unwrap_or_default();
            for endpoint in sources.into_iter().chain(destinations) {
                state.objects.remove(&endpoint);
            }
        }
    }

    pub fn set_timestamp_convention(&self, convention: TimestampConvention) {
        self.state().convention = convention;
    }

    pub fn set_nanos_per_tick(&self, nanos_per_tick: u64) {
        self.state().nanos_per_tick = nanos_per_tick;
    }

    pub fn fail_next(&self, call: FakeCall, code: i32) {
        self.state().failures.insert(call, code);
    }

    pub fn deliver(&self, source: RawRef, timestamp: u64, data: &[u8]) -> usize {
        let state = self.state();
        state
            .ports
            .values()
            .filter(|port| port.sources.contains(&source))
            .filter_map(|port| port.sink.as_ref())
            .filter(|sink| {
                sink.try_send(ReceivedPacket {
                    timestamp,
                    data: data.to_vec(),
                })
                .is_ok()
            })
            .count()
    }

    pub fn outstanding_strings(&self) -> usize {
        self.state().strings.len()
    }

    pub fn invalid_releases(&self) -> usize {
        self.state().invalid_releases
    }

    pub fn live_clients(&self) -> usize {
        self.state().clients.len()
    }

    pub fn live_ports(&self) -> usize {
        self.state().ports.len()
    }

    pub fn dispose_calls(&self) -> usize {
        self.state().dispose_calls
    }

    pub fn client_names(&self) -> Vec<String> {
        self.state().client_names.clone()
    }

    pub fn port_names(&self) -> Vec<String> {
        self.state().port_names.clone()
    }

    pub fn sent(&self) -> Vec<SentPacketList> {
        self.state().sent.clone()
    }
}

impl StringService for FakeHost {
    fn create_string(&self, value: &str) -> Result<RawRef, EndpointError> {
        if value.contains('\0') {
            return Err(EndpointError::InvalidString);
        }
        let mut state = self.state();
        let string = state.allocate();
        state.strings.insert(string, value.to_string());
        Ok(string)
    }

    fn string_length(&self, string: RawRef) -> isize {
        self.state()
            .string(string)
            .map_or(-1, |value| value.encode_utf16().count() as isize)
    }

    fn max_size_for_encoding(&self, length: isize) -> isize {
        if length < 0 {
            return -1;
        }
        length * UTF8_BYTES_PER_UTF16_UNIT
    }

    fn copy_c_string(&self, string: RawRef, buffer: &mut [u8]) -> bool {
        let state = self.state();
        let Some(value) = state.string(string) else {
            return false;
        };

        let bytes = value.as_bytes();
        if bytes.len() + 1 > buffer.len() {
            return false;
        }
        buffer[..bytes.len()].copy_from_slice(bytes);
        buffer[bytes.len()] = 0;
        true
    }

    fn release(&self, string: RawRef) {
        let mut state = self.state();
        if state.strings.remove(&string).is_none() {
            state.invalid_releases += 1;
        }
    }
}

impl MidiHost for FakeHost {
    fn device_count(&self) -> usize {
        self.state().devices.len()
    }

    fn device(&self, index: usize) -> RawRef {
        self.state()
            .devices
            .get(index)
            .copied()
            .unwrap_or(RawRef::NULL)
    }

    fn entity_count(&self, device: RawRef) -> usize {
        self.state().entities.get(&device).map_or(0, Vec::len)
    }

    fn entity(&self, device: RawRef, index: usize) -> RawRef {
        self.state()
            .entities
            .get(&device)
            .and_then(|entities| entities.get(index).copied())
            .unwrap_or(RawRef::NULL)
    }

    fn source_count(&self, entity: RawRef) -> usize {
        self.state().sources.get(&entity).map_or(0, Vec::len)
    }

    fn source(&self, entity: RawRef, index: usize) -> RawRef {
        self.state()
            .sources
            .get(&entity)
            .and_then(|sources| sources.get(index).copied())
            .unwrap_or(RawRef::NULL)
    }

    fn destination_count(&self, entity: RawRef) -> usize {
        self.state().destinations.get(&entity).map_or(0, Vec::len)
    }

    fn destination(&self, entity: RawRef, index: usize) -> RawRef {
        self.state()
            .destinations
            .get(&entity)
            .and_then(|destinations| destinations.get(index).copied())
            .unwrap_or(RawRef::NULL)
    }

    fn string_property(&self, object: RawRef, property: RawRef) -> (NativeStatus, RawRef) {
        let mut state = self.state();
        let Some(key) = state.string(property).cloned() else {
            return (NativeStatus(STATUS_PARAMETER_ERROR), RawRef::NULL);
        };
        let Some(found) = state.objects.get(&object) else {
            return (NativeStatus(STATUS_OBJECT_NOT_FOUND), RawRef::NULL);
        };
        let Some(value) = found.strings.get(&key).cloned() else {
            return (NativeStatus(STATUS_UNKNOWN_PROPERTY), RawRef::NULL);
        };

        let string = state.allocate();
        state.strings.insert(string, value);
        (NativeStatus::OK, string)
    }

    fn integer_property(&self, object: RawRef, property: RawRef) -> (NativeStatus, i32) {
        let state = self.state();
        let Some(key) = state.string(property) else {
            return (NativeStatus(STATUS_PARAMETER_ERROR), 0);
        };
        let Some(found) = state.objects.get(&object) else {
            return (NativeStatus(STATUS_OBJECT_NOT_FOUND), 0);
        };
        match found.integers.get(key) {
            Some(value) => (NativeStatus::OK, *value),
            None => (NativeStatus(STATUS_UNKNOWN_PROPERTY), 0),
        }
    }

    fn create_client(&self, name: RawRef) -> (NativeStatus, RawRef) {
        let mut state = self.state();
        if let Some(status) = state.take_failure(FakeCall::CreateClient) {
            return (status, RawRef::NULL);
        }
        let Some(name) = state.string(name).cloned() else {
            return (NativeStatus(STATUS_PARAMETER_ERROR), RawRef::NULL);
        };

        let client = state.allocate();
        state.clients.insert(client, name.clone());
        state.client_names.push(name);
        (NativeStatus::OK, client)
    }

    fn create_output_port(&self, client: RawRef, name: RawRef) -> (NativeStatus, RawRef) {
        let mut state = self.state();
        if let Some(status) = state.take_failure(FakeCall::CreateOutputPort) {
            return (status, RawRef::NULL);
        }
        create_port(&mut state, client, name, None)
    }

    fn create_input_port(
        &self,
        client: RawRef,
        name: RawRef,
        sink: PacketSink,
    ) -> (NativeStatus, RawRef) {
        let mut state = self.state();
        if let Some(status) = state.take_failure(FakeCall::CreateInputPort) {
            return (status, RawRef::NULL);
        }
        create_port(&mut state, client, name, Some(sink))
    }

    fn connect_source(&self, port: RawRef, source: RawRef) -> NativeStatus {
        let mut state = self.state();
        if let Some(status) = state.take_failure(FakeCall::ConnectSource) {
            return status;
        }
        if !state.is_source(source) {
            return NativeStatus(STATUS_OBJECT_NOT_FOUND);
        }
        match state.ports.get_mut(&port) {
            Some(found) => {
                found.sources.push(source);
                NativeStatus::OK
            }
            None => NativeStatus(STATUS_INVALID_PORT),
        }
    }

    fn dispose_client(&self, client: RawRef) -> NativeStatus {
        let mut state = self.state();
        if state.clients.remove(&client).is_none() {
            return NativeStatus(STATUS_INVALID_CLIENT);
        }
        state.dispose_calls += 1;
        state.ports.retain(|_, port| port.client != client);
        NativeStatus::OK
    }

    fn dispose_port(&self, port: RawRef) -> NativeStatus {
        let mut state = self.state();
        if state.ports.remove(&port).is_none() {
            return NativeStatus(STATUS_INVALID_PORT);
        }
        state.dispose_calls += 1;
        NativeStatus::OK
    }

    fn send(&self, port: RawRef, destination: RawRef, packets: &PacketList) -> NativeStatus {
        let mut state = self.state();
        if let Some(status) = state.take_failure(FakeCall::Send) {
            return status;
        }
        if !state.ports.contains_key(&port) {
            return NativeStatus(STATUS_INVALID_PORT);
        }
        if !state.objects.contains_key(&destination) {
            return NativeStatus(STATUS_OBJECT_NOT_FOUND);
        }

        state.sent.push(SentPacketList {
            port,
            destination,
            bytes: packets.as_bytes().to_vec(),
        });
        NativeStatus::OK
    }

    fn timestamp_convention(&self) -> TimestampConvention {
        self.state().convention
    }

    fn host_time_to_nanos(&self, host_time: u64) -> u64 {
        host_time.saturating_mul(self.state().nanos_per_tick)
    }
}

fn create_port(
    state: &mut FakeState,
    client: RawRef,
    name: RawRef,
    sink: Option<PacketSink>,
) -> (NativeStatus, RawRef) {
    if !state.clients.contains_key(&client) {
        return (NativeStatus(STATUS_INVALID_CLIENT), RawRef::NULL);
    }
    let Some(name) = state.string(name).cloned() else {
        return (NativeStatus(STATUS_PARAMETER_ERROR), RawRef::NULL);
    };

    let port = state.allocate();
    state.ports.insert(
        port,
        FakePort {
            client,
            sink,
            sources: Vec::new(),
        },
    );
    state.port_names.push(name);
    (NativeStatus::OK, port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_strings_are_no_longer_outstanding() {
        let host = FakeHost::new();
        let string = host.create_string("Acme").unwrap();
        assert_eq!(host.outstanding_strings(), 1);

        host.release(string);
        host.release(string);

        assert_eq!(host.outstanding_strings(), 0);
        assert_eq!(host.invalid_releases(), 1);
    }

    #[test]
    fn create_string_rejects_interior_nul() {
        let host = FakeHost::new();
        assert_eq!(
            host.create_string("bad\0name"),
            Err(EndpointError::InvalidString)
        );
    }

    #[test]
    fn disposing_a_client_also_disposes_its_ports() {
        let host = FakeHost::new();
        let name = host.create_string("client").unwrap();
        let (_, client) = host.create_client(name);
        let (_, _port) = host.create_output_port(client, name);

        assert_eq!(host.dispose_client(client), NativeStatus::OK);
        assert_eq!(host.live_ports(), 0);
        assert_eq!(
            host.dispose_client(client),
            NativeStatus(STATUS_INVALID_CLIENT)
        );
    }
}
