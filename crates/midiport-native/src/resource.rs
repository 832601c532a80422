use crate::host::{NativeMidi, PacketSink};
use crate::property::ScopedString;
use midiport_types::defaults::Defaults;
use midiport_types::errors::EndpointError;
use midiport_types::handle::{NativeHandle, RawRef};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Client,
    Port,
}

pub struct OwnedResource {
    host: Arc<dyn NativeMidi>,
    kind: ResourceKind,
    handle: NativeHandle,
}

impl OwnedResource {
    fn new(host: Arc<dyn NativeMidi>, kind: ResourceKind, raw: RawRef) -> Self {
        Self {
            host,
            kind,
            handle: NativeHandle::owned(raw),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn raw(&self) -> RawRef {
        self.handle.raw()
    }

    pub fn is_disposed(&self) -> bool {
        self.handle.is_null()
    }

    pub fn dispose(&mut self) -> Result<(), EndpointError> {
        if !self.handle.needs_release() {
            return Ok(());
        }

        let raw = self.handle.raw();
        self.handle = NativeHandle::null();

        let status = match self.kind {
            ResourceKind::Client => self.host.dispose_client(raw),
            ResourceKind::Port => self.host.dispose_port(raw),
        };
        log::debug!("dispose(): Disposed {:?} {raw:?} with status {}", self.kind, status.0);

        status.check()
    }
}

impl Drop for OwnedResource {
    fn drop(&mut self) {
        if let Err(err) = self.dispose() {
            log::warn!("drop(): Could not dispose native {:?}. Error: {err}", self.kind);
        }
    }
}

impl std::fmt::Debug for OwnedResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedResource")
            .field("kind", &self.kind)
            .field("handle", &self.handle)
            .finish()
    }
}

pub fn client_label(owner_id: u32, label: &str) -> String {
    format!("{} {owner_id}: {label}", Defaults::CLIENT_LABEL_PREFIX)
}

pub fn port_label(owner_id: u32, label: &str) -> String {
    format!("{} {owner_id}: {label}", Defaults::PORT_LABEL_PREFIX)
}

pub fn acquire_client(
    host: &Arc<dyn NativeMidi>,
    owner_id: u32,
    label: &str,
) -> Result<OwnedResource, EndpointError> {
    let name = ScopedString::create(host.as_ref(), &client_label(owner_id, label))?;
    let (status, client) = host.create_client(name.raw());

    created(host, ResourceKind::Client, status.check(), client)
}

pub fn acquire_output_port(
    host: &Arc<dyn NativeMidi>,
    client: &OwnedResource,
    owner_id: u32,
    label: &str,
) -> Result<OwnedResource, EndpointError> {
    let client = live_client(client)?;
    let name = ScopedString::create(host.as_ref(), &port_label(owner_id, label))?;
    let (status, port) = host.create_output_port(client, name.raw());

    created(host, ResourceKind::Port, status.check(), port)
}

pub fn acquire_input_port(
    host: &Arc<dyn NativeMidi>,
    client: &OwnedResource,
    owner_id: u32,
    label: &str,
    sink: PacketSink,
) -> Result<OwnedResource, EndpointError> {
    let client = live_client(client)?;
    let name = ScopedString::create(host.as_ref(), &port_label(owner_id, label))?;
    let (status, port) = host.create_input_port(client, name.raw(), sink);

    created(host, ResourceKind::Port, status.check(), port)
}

pub fn connect_source(
    host: &dyn NativeMidi,
    port: &OwnedResource,
    source: RawRef,
) -> Result<(), EndpointError> {
    if port.is_disposed() || source.is_null() {
        return Err(EndpointError::InvalidHandle);
    }

    host.connect_source(port.raw(), source).check()
}

fn live_client(client: &OwnedResource) -> Result<RawRef, EndpointError> {
    if client.kind() != ResourceKind::Client || client.is_disposed() {
        return Err(EndpointError::InvalidHandle);
    }
    Ok(client.raw())
}

fn created(
    host: &Arc<dyn NativeMidi>,
    kind: ResourceKind,
    result: Result<(), EndpointError>,
    raw: RawRef,
) -> Result<OwnedResource, EndpointError> {
    if let Err(err) = result {
        log::error!("created(): Native {kind:?} creation failed. Error: {err}");
        return Err(err);
    }

    if raw.is_null() {
        log::error!("created(): Native {kind:?} creation returned a null handle");
        return Err(EndpointError::InvalidHandle);
    }

    log::debug!("created(): Created native {kind:?} {raw:?}");
    Ok(OwnedResource::new(host.clone(), kind, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeCall, FakeHost};

    fn fake_host() -> (Arc<FakeHost>, Arc<dyn NativeMidi>) {
        let fake = Arc::new(FakeHost::new());
        let host: Arc<dyn NativeMidi> = fake.clone();
        (fake, host)
    }

    #[test]
    fn acquire_client_labels_the_client_with_the_owner_id() {
        let (fake, host) = fake_host();

        let client = acquire_client(&host, 7, "Acme Synth").unwrap();

        assert_eq!(client.kind(), ResourceKind::Client);
        assert_eq!(fake.client_names(), vec!["Client 7: Acme Synth".to_string()]);
        assert_eq!(fake.outstanding_strings(), 0);
    }

    #[test]
    fn acquire_client_maps_nonzero_status_to_native_call_failed() {
        let (fake, host) = fake_host();
        fake.fail_next(FakeCall::CreateClient, -50);

        let result = acquire_client(&host, 1, "Acme Synth");

        assert_eq!(
            result.map(|_| ()),
            Err(EndpointError::NativeCallFailed { code: -50 })
        );
        assert_eq!(fake.live_clients(), 0);
        assert_eq!(fake.outstanding_strings(), 0);
    }

    #[test]
    fn acquire_output_port_uses_port_label_and_is_released_on_drop() {
        let (fake, host) = fake_host();

        {
            let client = acquire_client(&host, 3, "Acme Synth").unwrap();
            let _port = acquire_output_port(&host, &client, 3, "Acme Synth").unwrap();

            assert_eq!(fake.port_names(), vec!["Port 3: Acme Synth".to_string()]);
            assert_eq!(fake.live_ports(), 1);
            assert_eq!(fake.live_clients(), 1);
        }

        assert_eq!(fake.live_ports(), 0);
        assert_eq!(fake.live_clients(), 0);
    }

    #[test]
    fn acquire_output_port_rejects_a_disposed_client() {
        let (_fake, host) = fake_host();
        let mut client = acquire_client(&host, 1, "Acme Synth").unwrap();
        client.dispose().unwrap();

        let result = acquire_output_port(&host, &client, 1, "Acme Synth");

        assert_eq!(result.map(|_| ()), Err(EndpointError::InvalidHandle));
    }

    #[test]
    fn dispose_is_idempotent() {
        let (fake, host) = fake_host();
        let mut client = acquire_client(&host, 1, "Acme Synth").unwrap();

        assert_eq!(client.dispose(), Ok(()));
        assert_eq!(client.dispose(), Ok(()));
        assert!(client.is_disposed());
        assert_eq!(fake.live_clients(), 0);
        assert_eq!(fake.dispose_calls(), 1);
    }

    #[test]
    fn connect_source_reports_invalid_handle_for_a_removed_device() {
        let (fake, host) = fake_host();
        let device = fake.add_device();
        let entity = fake.add_entity(device, "Acme", "Keys");
        let source = fake.add_source(entity);
        fake.remove_device(device);

        let client = acquire_client(&host, 1, "Acme Keys").unwrap();
        let (sender, _receiver) = crossbeam_channel::bounded(1);
        let port = acquire_input_port(&host, &client, 1, "Acme Keys", sender).unwrap();

        assert_eq!(
            connect_source(host.as_ref(), &port, source),
            Err(EndpointError::InvalidHandle)
        );
    }
}
