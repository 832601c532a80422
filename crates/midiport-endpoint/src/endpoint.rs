use crate::session::Session;
use crossbeam_channel::{Receiver, bounded};
use midiport_native::constants::{
    PROPERTY_MANUFACTURER, PROPERTY_MODEL, PROPERTY_OFFLINE, PROPERTY_UNIQUE_ID,
};
use midiport_native::enumerate::endpoint_at;
use midiport_native::host::{NativeMidi, ReceivedPacket};
use midiport_native::packet::PacketListBuilder;
use midiport_native::property::{get_int_property, get_string_property};
use midiport_native::resource::{
    OwnedResource, acquire_client, acquire_input_port, acquire_output_port, connect_source,
};
use midiport_types::defaults::Defaults;
use midiport_types::endpoint_type::EndpointType;
use midiport_types::errors::EndpointError;
use midiport_types::handle::{NativeHandle, RawRef};
use midiport_types::info::EndpointInfo;
use std::sync::Arc;

// Field order matters: the port is disposed before its client.
struct Resources {
    port: OwnedResource,
    client: OwnedResource,
}

pub struct Endpoint {
    host: Arc<dyn NativeMidi>,
    packets: PacketListBuilder,
    endpoint_type: EndpointType,
    endpoint_index: usize,
    entity: NativeHandle,
    endpoint: NativeHandle,
    id: Option<u32>,
    manufacturer: Option<String>,
    model: Option<String>,
    name: String,
    is_online: bool,
    resources: Option<Resources>,
    receiver: Option<Receiver<ReceivedPacket>>,
}

impl Endpoint {
    pub fn new(
        session: &Session,
        endpoint_type: EndpointType,
        endpoint_index: usize,
        entity: RawRef,
    ) -> Self {
        let host = session.host().clone();
        let endpoint = endpoint_at(&*host, entity, endpoint_type, endpoint_index);

        let manufacturer = get_string_property(host.as_ref(), entity, PROPERTY_MANUFACTURER);
        let model = get_string_property(host.as_ref(), entity, PROPERTY_MODEL);
        let name = display_name(manufacturer.as_deref(), model.as_deref());

        let offline = get_int_property(host.as_ref(), entity, PROPERTY_OFFLINE)
            .unwrap_or(Defaults::OFFLINE_FLAG_WHEN_ABSENT);
        let is_online = offline == 0 && is_reachable(host.as_ref(), endpoint);

        log::debug!(
            "new(): Constructed {endpoint_type} endpoint {endpoint_index} '{name}', online: {is_online}"
        );

        Self {
            host,
            packets: session.packet_builder(),
            endpoint_type,
            endpoint_index,
            entity: NativeHandle::borrowed(entity),
            endpoint: NativeHandle::borrowed(endpoint),
            id: None,
            manufacturer,
            model,
            name,
            is_online,
            resources: None,
            receiver: None,
        }
    }

    pub fn id(&self) -> Option<u32> {
        self.id
    }

    pub fn set_id(&mut self, id: u32) {
        match self.id {
            None => self.id = Some(id),
            Some(current) => {
                log::trace!("set_id(): Ignoring id {id}, endpoint already has id {current}");
            }
        }
    }

    pub fn endpoint_type(&self) -> EndpointType {
        self.endpoint_type
    }

    pub fn native_endpoint(&self) -> RawRef {
        self.endpoint.raw()
    }

    pub fn manufacturer(&self) -> Option<&str> {
        self.manufacturer.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_online(&self) -> bool {
        self.is_online
    }

    pub fn is_enabled(&self) -> bool {
        self.resources.is_some()
    }

    pub fn info(&self) -> EndpointInfo {
        EndpointInfo {
            id: self.id,
            endpoint_type: self.endpoint_type,
            name: self.name.clone(),
            manufacturer: self.manufacturer.clone(),
            model: self.model.clone(),
            is_online: self.is_online,
            enabled: self.is_enabled(),
        }
    }

    pub fn enable(&mut self) -> Result<(), EndpointError> {
        if self.resources.is_some() {
            log::debug!("enable(): '{}' is already enabled", self.name);
            return Ok(());
        }

        let owner_id = self.owner_id();
        let client = acquire_client(&self.host, owner_id, &self.name)?;

        let port = match self.endpoint_type {
            EndpointType::Output => acquire_output_port(&self.host, &client, owner_id, &self.name)?,
            EndpointType::Input => {
                let (sender, receiver) = bounded(Defaults::INPUT_CHANNEL_CAPACITY);
                let port = acquire_input_port(&self.host, &client, owner_id, &self.name, sender)?;
                connect_source(self.host.as_ref(), &port, self.endpoint.raw())?;
                self.receiver = Some(receiver);
                port
            }
        };

        log::info!("enable(): Enabled {} endpoint '{}'", self.endpoint_type, self.name);
        self.resources = Some(Resources { port, client });
        Ok(())
    }

    pub fn disable(&mut self) -> Result<(), EndpointError> {
        let Some(mut resources) = self.resources.take() else {
            return Ok(());
        };
        self.receiver = None;

        let port_result = resources.port.dispose();
        let client_result = resources.client.dispose();

        log::info!("disable(): Disabled {} endpoint '{}'", self.endpoint_type, self.name);
        port_result.and(client_result)
    }

    pub fn send(&mut self, bytes: &[u8]) -> Result<(), EndpointError> {
        if self.endpoint_type != EndpointType::Output {
            return Err(EndpointError::WrongDirection {
                expected: EndpointType::Output,
            });
        }
        let Some(resources) = &self.resources else {
            return Err(EndpointError::InvalidHandle);
        };

        let packets = self.packets.build(Defaults::SEND_TIMESTAMP, bytes)?;
        let status = self
            .host
            .send(resources.port.raw(), self.endpoint.raw(), &packets);

        status.check().inspect_err(|err| {
            log::warn!("send(): Could not send to '{}'. Error: {err}", self.name);
        })
    }

    pub fn receiver(&self) -> Result<Receiver<ReceivedPacket>, EndpointError> {
        if self.endpoint_type != EndpointType::Input {
            return Err(EndpointError::WrongDirection {
                expected: EndpointType::Input,
            });
        }
        self.receiver.clone().ok_or(EndpointError::InvalidHandle)
    }

    fn owner_id(&self) -> u32 {
        self.id.unwrap_or(self.endpoint_index as u32)
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("id", &self.id)
            .field("type", &self.endpoint_type)
            .field("endpoint_index", &self.endpoint_index)
            .field("entity", &self.entity.raw())
            .field("name", &self.name)
            .field("is_online", &self.is_online)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

fn display_name(manufacturer: Option<&str>, model: Option<&str>) -> String {
    format!(
        "{} {}",
        manufacturer.unwrap_or(Defaults::UNKNOWN_PROPERTY_VALUE),
        model.unwrap_or(Defaults::UNKNOWN_PROPERTY_VALUE)
    )
}

// An endpoint is reachable when the host still answers for it.
fn is_reachable(host: &dyn NativeMidi, endpoint: RawRef) -> bool {
    !endpoint.is_null() && get_int_property(host, endpoint, PROPERTY_UNIQUE_ID).is_some()
}
