use crate::host::MidiHost;
use midiport_types::endpoint_type::EndpointType;
use midiport_types::handle::RawRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointLocation {
    pub position: usize,
    pub device_index: usize,
    pub entity_index: usize,
    pub endpoint_index: usize,
    pub endpoint_type: EndpointType,
    pub entity: RawRef,
    pub endpoint: RawRef,
}

pub fn walk<H: MidiHost + ?Sized>(host: &H) -> Vec<EndpointLocation> {
    let mut locations = Vec::new();

    for device_index in 0..host.device_count() {
        let device = host.device(device_index);
        if device.is_null() {
            log::debug!("walk(): Device {device_index} is no longer available");
            continue;
        }

        let entities: Vec<(usize, RawRef)> = (0..host.entity_count(device))
            .map(|entity_index| (entity_index, host.entity(device, entity_index)))
            .filter(|(_, entity)| !entity.is_null())
            .collect();

        for endpoint_type in [EndpointType::Input, EndpointType::Output] {
            for &(entity_index, entity) in &entities {
                for endpoint_index in 0..endpoint_count(host, entity, endpoint_type) {
                    let endpoint = endpoint_at(host, entity, endpoint_type, endpoint_index);
                    locations.push(EndpointLocation {
                        position: locations.len(),
                        device_index,
                        entity_index,
                        endpoint_index,
                        endpoint_type,
                        entity,
                        endpoint,
                    });
                }
            }
        }
    }

    log::debug!("walk(): Found {} endpoints", locations.len());
    locations
}

pub fn walk_type<H: MidiHost + ?Sized>(
    host: &H,
    endpoint_type: EndpointType,
) -> Vec<EndpointLocation> {
    walk(host)
        .into_iter()
        .filter(|location| location.endpoint_type == endpoint_type)
        .collect()
}

pub fn endpoint_count<H: MidiHost + ?Sized>(
    host: &H,
    entity: RawRef,
    endpoint_type: EndpointType,
) -> usize {
    match endpoint_type {
        EndpointType::Input => host.source_count(entity),
        EndpointType::Output => host.destination_count(entity),
    }
}

pub fn endpoint_at<H: MidiHost + ?Sized>(
    host: &H,
    entity: RawRef,
    endpoint_type: EndpointType,
    index: usize,
) -> RawRef {
    match endpoint_type {
        EndpointType::Input => host.source(entity, index),
        EndpointType::Output => host.destination(entity, index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeHost;

    #[test]
    fn walk_returns_nothing_for_an_empty_host() {
        assert!(walk(&FakeHost::new()).is_empty());
    }

    #[test]
    fn walk_lists_sources_before_destinations_within_each_device() {
        let host = FakeHost::new();
        let device = host.add_device();
        let first_entity = host.add_entity(device, "Acme", "Keys");
        let second_entity = host.add_entity(device, "Acme", "Pads");
        let first_out = host.add_destination(first_entity);
        let first_in = host.add_source(first_entity);
        let second_in = host.add_source(second_entity);

        let locations = walk(&host);
        let endpoints: Vec<RawRef> = locations.iter().map(|location| location.endpoint).collect();

        assert_eq!(endpoints, vec![first_in, second_in, first_out]);
        assert_eq!(
            locations.iter().map(|l| l.position).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(locations[1].entity_index, 1);
        assert_eq!(locations[2].endpoint_type, EndpointType::Output);
    }

    #[test]
    fn walk_type_counts_match_native_destination_totals_across_devices() {
        let host = FakeHost::new();
        for destinations in [2, 0, 3] {
            let device = host.add_device();
            let entity = host.add_entity(device, "Acme", "Rack");
            host.add_source(entity);
            for _ in 0..destinations {
                host.add_destination(entity);
            }
        }

        let outputs = walk_type(&host, EndpointType::Output);
        let native_total: usize = (0..host.device_count())
            .map(|index| host.device(index))
            .flat_map(|device| (0..host.entity_count(device)).map(move |i| (device, i)))
            .map(|(device, index)| host.destination_count(host.entity(device, index)))
            .sum();

        assert_eq!(outputs.len(), 5);
        assert_eq!(outputs.len(), native_total);
        assert_eq!(walk_type(&host, EndpointType::Input).len(), 3);
    }

    #[test]
    fn walk_skips_devices_removed_from_the_hierarchy() {
        let host = FakeHost::new();
        let removed = host.add_device();
        let entity = host.add_entity(removed, "Gone", "Box");
        host.add_destination(entity);
        let kept = host.add_device();
        let entity = host.add_entity(kept, "Acme", "Synth");
        let destination = host.add_destination(entity);

        host.remove_device(removed);

        let locations = walk(&host);
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].endpoint, destination);
        assert_eq!(locations[0].device_index, 0);
    }
}
