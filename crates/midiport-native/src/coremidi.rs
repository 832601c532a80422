use crate::host::{MidiHost, PacketSink, ReceivedPacket, StringService};
use crate::packet::{PacketList, TimestampConvention};
use core_foundation::base::{CFIndex, CFRelease, CFTypeRef, kCFAllocatorDefault};
use core_foundation::string::{
    CFStringCreateWithCString, CFStringGetCString, CFStringGetLength,
    CFStringGetMaximumSizeForEncoding, CFStringRef, kCFStringEncodingUTF8,
};
use coreaudio_sys::{
    AudioConvertHostTimeToNanos, ItemCount, MIDIClientCreate, MIDIClientDispose, MIDIClientRef,
    MIDIDeviceGetEntity, MIDIDeviceGetNumberOfEntities, MIDIEntityGetDestination,
    MIDIEntityGetNumberOfDestinations, MIDIEntityGetNumberOfSources, MIDIEntityGetSource,
    MIDIGetDevice, MIDIGetNumberOfDevices, MIDIInputPortCreate, MIDIObjectGetIntegerProperty,
    MIDIObjectGetStringProperty, MIDIObjectRef, MIDIOutputPortCreate, MIDIPacket, MIDIPacketList,
    MIDIPacketListAdd, MIDIPacketListInit, MIDIPortConnectSource, MIDIPortDispose, MIDIPortRef,
    MIDISend, SInt32,
};
use midiport_types::errors::EndpointError;
use midiport_types::handle::RawRef;
use midiport_types::status::NativeStatus;
use std::collections::HashMap;
use std::ffi::{CString, c_char, c_void};
use std::sync::{Mutex, MutexGuard};
use std::{ptr, slice};

const STATUS_PARAMETER_ERROR: i32 = -50;
const NATIVE_PACKET_LIST_CAPACITY: usize = 1024;

struct InputSink {
    client: MIDIClientRef,
    sink: usize,
}

pub struct CoreMidiHost {
    input_sinks: Mutex<HashMap<MIDIPortRef, InputSink>>,
}

impl Default for CoreMidiHost {
    fn default() -> Self {
        Self::new()
    }
}

impl CoreMidiHost {
    pub fn new() -> Self {
        log::info!("Constructing CoreMIDI host");
        Self {
            input_sinks: Mutex::new(HashMap::new()),
        }
    }

    fn input_sinks(&self) -> MutexGuard<'_, HashMap<MIDIPortRef, InputSink>> {
        self.input_sinks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for CoreMidiHost {
    fn drop(&mut self) {
        let ports: Vec<MIDIPortRef> = self.input_sinks().keys().copied().collect();
        for port in ports {
            if let Err(err) = self.dispose_port(RawRef::new(port as usize)).check() {
                log::warn!("drop(): Could not dispose CoreMIDI input port {port}. Error: {err}");
            }
        }
    }
}

fn object(raw: RawRef) -> MIDIObjectRef {
    raw.as_usize() as MIDIObjectRef
}

fn cf_string(raw: RawRef) -> CFStringRef {
    raw.as_usize() as CFStringRef
}

fn from_object(object: MIDIObjectRef) -> RawRef {
    RawRef::new(object as usize)
}

unsafe fn free_sink(sink: usize) {
    if sink != 0 {
        let _ = unsafe { Box::from_raw(sink as *mut PacketSink) };
    }
}

impl StringService for CoreMidiHost {
    fn create_string(&self, value: &str) -> Result<RawRef, EndpointError> {
        let value = CString::new(value).map_err(|_| EndpointError::InvalidString)?;
        let string = unsafe {
            CFStringCreateWithCString(kCFAllocatorDefault, value.as_ptr(), kCFStringEncodingUTF8)
        };

        if string.is_null() {
            log::warn!("create_string(): CFStringCreateWithCString returned null");
            return Err(EndpointError::InvalidString);
        }
        Ok(RawRef::new(string as usize))
    }

    fn string_length(&self, string: RawRef) -> isize {
        if string.is_null() {
            return -1;
        }
        unsafe { CFStringGetLength(cf_string(string)) as isize }
    }

    fn max_size_for_encoding(&self, length: isize) -> isize {
        unsafe { CFStringGetMaximumSizeForEncoding(length as CFIndex, kCFStringEncodingUTF8) as isize }
    }

    fn copy_c_string(&self, string: RawRef, buffer: &mut [u8]) -> bool {
        if string.is_null() || buffer.is_empty() {
            return false;
        }
        unsafe {
            CFStringGetCString(
                cf_string(string),
                buffer.as_mut_ptr() as *mut c_char,
                buffer.len() as CFIndex,
                kCFStringEncodingUTF8,
            ) != 0
        }
    }

    fn release(&self, string: RawRef) {
        if !string.is_null() {
            unsafe { CFRelease(string.as_usize() as CFTypeRef) };
        }
    }
}

impl MidiHost for CoreMidiHost {
    fn device_count(&self) -> usize {
        unsafe { MIDIGetNumberOfDevices() as usize }
    }

    fn device(&self, index: usize) -> RawRef {
        from_object(unsafe { MIDIGetDevice(index as ItemCount) })
    }

    fn entity_count(&self, device: RawRef) -> usize {
        unsafe { MIDIDeviceGetNumberOfEntities(object(device)) as usize }
    }

    fn entity(&self, device: RawRef, index: usize) -> RawRef {
        from_object(unsafe { MIDIDeviceGetEntity(object(device), index as ItemCount) })
    }

    fn source_count(&self, entity: RawRef) -> usize {
        unsafe { MIDIEntityGetNumberOfSources(object(entity)) as usize }
    }

    fn source(&self, entity: RawRef, index: usize) -> RawRef {
        from_object(unsafe { MIDIEntityGetSource(object(entity), index as ItemCount) })
    }

    fn destination_count(&self, entity: RawRef) -> usize {
        unsafe { MIDIEntityGetNumberOfDestinations(object(entity)) as usize }
    }

    fn destination(&self, entity: RawRef, index: usize) -> RawRef {
        from_object(unsafe { MIDIEntityGetDestination(object(entity), index as ItemCount) })
    }

    fn string_property(&self, object_ref: RawRef, property: RawRef) -> (NativeStatus, RawRef) {
        let mut string: coreaudio_sys::CFStringRef = ptr::null();
        let status = unsafe {
            MIDIObjectGetStringProperty(
                object(object_ref),
                property.as_usize() as coreaudio_sys::CFStringRef,
                &mut string,
            )
        };
        (NativeStatus(status), RawRef::new(string as usize))
    }

    fn integer_property(&self, object_ref: RawRef, property: RawRef) -> (NativeStatus, i32) {
        let mut value: SInt32 = 0;
        let status = unsafe {
            MIDIObjectGetIntegerProperty(
                object(object_ref),
                property.as_usize() as coreaudio_sys::CFStringRef,
                &mut value,
            )
        };
        (NativeStatus(status), value)
    }

    fn create_client(&self, name: RawRef) -> (NativeStatus, RawRef) {
        let mut client: MIDIClientRef = 0;
        let status = unsafe {
            MIDIClientCreate(
                name.as_usize() as coreaudio_sys::CFStringRef,
                None,
                ptr::null_mut(),
                &mut client,
            )
        };
        (NativeStatus(status), from_object(client))
    }

    fn create_output_port(&self, client: RawRef, name: RawRef) -> (NativeStatus, RawRef) {
        let mut port: MIDIPortRef = 0;
        let status = unsafe {
            MIDIOutputPortCreate(
                object(client),
                name.as_usize() as coreaudio_sys::CFStringRef,
                &mut port,
            )
        };
        (NativeStatus(status), from_object(port))
    }

    fn create_input_port(
        &self,
        client: RawRef,
        name: RawRef,
        sink: PacketSink,
    ) -> (NativeStatus, RawRef) {
        let sink = Box::into_raw(Box::new(sink)) as usize;
        let mut port: MIDIPortRef = 0;

        let status = unsafe {
            MIDIInputPortCreate(
                object(client),
                name.as_usize() as coreaudio_sys::CFStringRef,
                Some(read_proc),
                sink as *mut c_void,
                &mut port,
            )
        };

        if status != 0 {
            unsafe { free_sink(sink) };
            return (NativeStatus(status), RawRef::NULL);
        }

        self.input_sinks().insert(
            port,
            InputSink {
                client: object(client),
                sink,
            },
        );
        (NativeStatus(status), from_object(port))
    }

    fn connect_source(&self, port: RawRef, source: RawRef) -> NativeStatus {
        NativeStatus(unsafe { MIDIPortConnectSource(object(port), object(source), ptr::null_mut()) })
    }

    fn dispose_client(&self, client: RawRef) -> NativeStatus {
        let status = unsafe { MIDIClientDispose(object(client)) };

        // The client's ports go with it, and so do their read procs.
        let mut input_sinks = self.input_sinks();
        let ports: Vec<MIDIPortRef> = input_sinks
            .iter()
            .filter(|(_, input)| input.client == object(client))
            .map(|(port, _)| *port)
            .collect();
        for port in ports {
            if let Some(input) = input_sinks.remove(&port) {
                unsafe { free_sink(input.sink) };
            }
        }

        NativeStatus(status)
    }

    fn dispose_port(&self, port: RawRef) -> NativeStatus {
        let status = unsafe { MIDIPortDispose(object(port)) };
        if let Some(input) = self.input_sinks().remove(&object(port)) {
            unsafe { free_sink(input.sink) };
        }
        NativeStatus(status)
    }

    fn send(&self, port: RawRef, destination: RawRef, packets: &PacketList) -> NativeStatus {
        let mut storage = vec![0u64; NATIVE_PACKET_LIST_CAPACITY / size_of::<u64>()];
        let native_list = storage.as_mut_ptr() as *mut MIDIPacketList;

        unsafe {
            let mut current = MIDIPacketListInit(native_list);
            for packet in packets.packets() {
                current = MIDIPacketListAdd(
                    native_list,
                    NATIVE_PACKET_LIST_CAPACITY as _,
                    current,
                    packet.timestamp,
                    packet.data.len() as _,
                    packet.data.as_ptr(),
                );
                if current.is_null() {
                    log::error!("send(): Packet list does not fit the native packet list buffer");
                    return NativeStatus(STATUS_PARAMETER_ERROR);
                }
            }

            NativeStatus(MIDISend(object(port), object(destination), native_list))
        }
    }

    fn timestamp_convention(&self) -> TimestampConvention {
        TimestampConvention::for_target()
    }

    fn host_time_to_nanos(&self, host_time: u64) -> u64 {
        unsafe { AudioConvertHostTimeToNanos(host_time) }
    }
}

unsafe extern "C" fn read_proc(
    packet_list: *const MIDIPacketList,
    read_proc_ref_con: *mut c_void,
    _source_ref_con: *mut c_void,
) {
    if packet_list.is_null() || read_proc_ref_con.is_null() {
        log::debug!("read_proc(): Received a null packet list or sink pointer.");
        return;
    }

    unsafe {
        let sink = &*(read_proc_ref_con as *const PacketSink);
        let count = ptr::addr_of!((*packet_list).numPackets).read_unaligned();
        let mut packet = ptr::addr_of!((*packet_list).packet) as *const MIDIPacket;

        for _ in 0..count {
            let timestamp = ptr::addr_of!((*packet).timeStamp).read_unaligned();
            let length = usize::from(ptr::addr_of!((*packet).length).read_unaligned());
            let data = ptr::addr_of!((*packet).data) as *const u8;

            let received = ReceivedPacket {
                timestamp,
                data: slice::from_raw_parts(data, length).to_vec(),
            };
            if sink.try_send(received).is_err() {
                log::warn!("read_proc(): Input channel is full or closed. Dropping packet.");
            }

            packet = next_packet(data, length);
        }
    }
}

// Mirrors MIDIPacketNext: packets are 4-byte aligned on ARM only.
fn next_packet(data: *const u8, length: usize) -> *const MIDIPacket {
    let end = data as usize + length;
    if cfg!(any(target_arch = "aarch64", target_arch = "arm")) {
        ((end + 3) & !3) as *const MIDIPacket
    } else {
        end as *const MIDIPacket
    }
}
