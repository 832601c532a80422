use crate::endpoint::Endpoint;
use crate::session::Session;
use midiport_native::enumerate::{EndpointLocation, walk, walk_type};
use midiport_types::endpoint_type::EndpointType;

// Each query walks the hierarchy afresh. Re-query after hardware changes.

pub fn first(session: &Session, endpoint_type: EndpointType) -> Option<Endpoint> {
    walk_type(session.native(), endpoint_type)
        .first()
        .map(|location| construct(session, location))
}

pub fn last(session: &Session, endpoint_type: EndpointType) -> Option<Endpoint> {
    walk_type(session.native(), endpoint_type)
        .last()
        .map(|location| construct(session, location))
}

pub fn all_of_type(session: &Session, endpoint_type: EndpointType) -> Vec<Endpoint> {
    walk_type(session.native(), endpoint_type)
        .iter()
        .map(|location| construct(session, location))
        .collect()
}

pub fn all(session: &Session) -> Vec<Endpoint> {
    walk(session.native())
        .iter()
        .map(|location| construct(session, location))
        .collect()
}

pub fn find_by_id(session: &Session, id: u32) -> Option<Endpoint> {
    walk(session.native())
        .into_iter()
        .find(|location| location.position as u32 == id)
        .map(|location| construct(session, &location))
}

fn construct(session: &Session, location: &EndpointLocation) -> Endpoint {
    let mut endpoint = Endpoint::new(
        session,
        location.endpoint_type,
        location.endpoint_index,
        location.entity,
    );
    endpoint.set_id(location.position as u32);
    endpoint
}

#[cfg(test)]
mod tests {
    use super::*;
    use midiport_native::fake::FakeHost;
    use midiport_native::host::MidiHost;
    use std::sync::Arc;

    fn single_synth() -> (Arc<FakeHost>, Session) {
        let fake = Arc::new(FakeHost::new());
        let device = fake.add_device();
        let entity = fake.add_entity(device, "Acme", "Synth");
        fake.add_destination(entity);
        let session = Session::new(fake.clone());
        (fake, session)
    }

    fn studio() -> (Arc<FakeHost>, Session) {
        let fake = Arc::new(FakeHost::new());

        let keys = fake.add_device();
        let entity = fake.add_entity(keys, "Acme", "Keys");
        fake.add_source(entity);
        fake.add_destination(entity);

        let interface = fake.add_device();
        let port_a = fake.add_entity(interface, "Box", "Port A");
        fake.add_source(port_a);
        fake.add_destination(port_a);
        let port_b = fake.add_entity(interface, "Box", "Port B");
        fake.add_destination(port_b);

        let session = Session::new(fake.clone());
        (fake, session)
    }

    #[test]
    fn first_output_of_a_single_synth_is_named_from_its_entity() {
        let (_fake, session) = single_synth();

        let output = first(&session, EndpointType::Output).unwrap();

        assert_eq!(output.name(), "Acme Synth");
        assert!(!output.is_enabled());
        assert_eq!(output.id(), Some(0));
    }

    #[test]
    fn first_and_last_return_none_when_no_endpoint_of_the_type_exists() {
        let (_fake, session) = single_synth();

        assert!(first(&session, EndpointType::Input).is_none());
        assert!(last(&session, EndpointType::Input).is_none());
    }

    #[test]
    fn first_and_last_pick_the_ends_of_the_flattened_list() {
        let (_fake, session) = studio();

        assert_eq!(first(&session, EndpointType::Input).unwrap().name(), "Acme Keys");
        assert_eq!(last(&session, EndpointType::Input).unwrap().name(), "Box Port A");
        assert_eq!(first(&session, EndpointType::Output).unwrap().name(), "Acme Keys");
        assert_eq!(last(&session, EndpointType::Output).unwrap().name(), "Box Port B");
    }

    #[test]
    fn all_of_type_output_matches_native_destination_count() {
        let (fake, session) = studio();

        let native_destinations: usize = (0..fake.device_count())
            .map(|index| fake.device(index))
            .map(|device| {
                (0..fake.entity_count(device))
                    .map(|index| fake.destination_count(fake.entity(device, index)))
                    .sum::<usize>()
            })
            .sum();

        let outputs = all_of_type(&session, EndpointType::Output);
        assert_eq!(outputs.len(), native_destinations);
        assert!(
            outputs
                .iter()
                .all(|endpoint| endpoint.endpoint_type() == EndpointType::Output)
        );
    }

    #[test]
    fn all_returns_every_endpoint_with_unique_ids() {
        let (_fake, session) = studio();

        let endpoints = all(&session);
        let ids: Vec<Option<u32>> = endpoints.iter().map(Endpoint::id).collect();

        assert_eq!(endpoints.len(), 5);
        assert_eq!(ids, (0..5).map(Some).collect::<Vec<_>>());
    }

    #[test]
    fn ids_are_the_same_whichever_query_produced_the_endpoint() {
        let (_fake, session) = studio();

        let from_all: Vec<Option<u32>> = all(&session)
            .into_iter()
            .filter(|endpoint| endpoint.endpoint_type() == EndpointType::Output)
            .map(|endpoint| endpoint.id())
            .collect();
        let from_type: Vec<Option<u32>> = all_of_type(&session, EndpointType::Output)
            .iter()
            .map(Endpoint::id)
            .collect();

        assert_eq!(from_all, from_type);
        assert_eq!(
            last(&session, EndpointType::Output).unwrap().id(),
            from_type.last().copied().flatten()
        );
    }

    #[test]
    fn find_by_id_returns_the_matching_endpoint() {
        let (_fake, session) = studio();

        let endpoint = find_by_id(&session, 3).unwrap();

        assert_eq!(endpoint.id(), Some(3));
        assert_eq!(endpoint.name(), "Box Port A");
        assert!(find_by_id(&session, 42).is_none());
    }

    #[test]
    fn queries_reflect_hierarchy_changes_between_calls() {
        let (fake, session) = single_synth();
        assert_eq!(all(&session).len(), 1);

        let device = fake.add_device();
        let entity = fake.add_entity(device, "Late", "Arrival");
        fake.add_source(entity);

        assert_eq!(all(&session).len(), 2);
        assert_eq!(
            first(&session, EndpointType::Input).unwrap().name(),
            "Late Arrival"
        );
    }

    #[test]
    fn discovery_leaves_no_foreign_strings_outstanding() {
        let (fake, session) = studio();

        let _ = all(&session);

        assert_eq!(fake.outstanding_strings(), 0);
        assert_eq!(fake.invalid_releases(), 0);
    }
}
