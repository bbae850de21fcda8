mod common;

use std::sync::Arc;

use common::{
    catalog, property, ready, use_shared_scope, use_user_scope, user_harness, RecordingHooks,
    WeatherConsumer, ZipProvider,
};
use expect_test::expect;
use webparts_core::{InterfaceType, PersonalizationScope, PropertyValue};
use webparts_runtime::manager::ManagerEvent;
use webparts_runtime::{
    ConnectOutcome, ConnectionSubmission, PageHarness, PersonalizationConfig,
    PersonalizationStore, RequestContext, RowToFieldTransformer, Transformer, WebPartConnection,
    WebPartManager, WebPartsError, Zone,
};

const PAGE: &str = "/portal/home";

/// One provider with every point enabled, one with `row` disabled and
/// three weather consumers.
fn connection_page(manager: &mut WebPartManager) -> Result<(), WebPartsError> {
    manager.register_zone(Zone::web_parts("left"))?;
    manager.register_zone(Zone::web_parts("right"))?;
    manager.add_static_part("left", Box::new(ZipProvider::new("zip1")))?;
    manager.add_static_part(
        "left",
        Box::new(ZipProvider {
            disabled: vec!["row".into()],
            ..ZipProvider::new("zip2")
        }),
    )?;
    for id in ["weather1", "weather2", "weather3"] {
        manager.add_static_part("right", Box::new(WeatherConsumer::new(id)))?;
    }
    Ok(())
}

fn with_static_connection(manager: &mut WebPartManager) -> Result<(), WebPartsError> {
    connection_page(manager)?;
    manager.add_static_connection(WebPartConnection::new("s1", "zip1", "zip", "weather1", "zip"))
}

fn alice() -> RequestContext {
    RequestContext::post(PAGE).with_user("alice")
}

fn row_to_zip() -> Option<Box<dyn Transformer>> {
    Some(Box::new(RowToFieldTransformer::new("zip")))
}

#[test]
fn check_connect_reports_the_first_failing_rule() {
    let harness = user_harness();

    let anonymous = ready(&harness, RequestContext::post(PAGE), connection_page);
    let err = anonymous
        .check_connect("nope", "zip", "weather1", "zip", None)
        .unwrap_err();
    assert_eq!(err, WebPartsError::NotModifiable(PersonalizationScope::User));

    let mut manager = ready(&harness, alice(), connection_page);
    assert!(manager.close_web_part("weather3").expect("close"));
    let attempts = [
        ("nope", "zip", "weather1", "zip"),
        ("zip1", "weather", "weather1", "zip"),
        ("weather1", "forecast", "weather1", "zip"),
        ("zip1", "zip", "weather3", "zip"),
        ("zip2", "row", "weather1", "field"),
        ("zip1", "row", "weather1", "zip"),
    ];
    let messages: Vec<String> = attempts
        .iter()
        .map(|(provider, provider_point, consumer, consumer_point)| {
            manager
                .check_connect(provider, provider_point, consumer, consumer_point, None)
                .unwrap_err()
                .to_string()
        })
        .collect();
    expect![[r#"
        unknown web part 'nope'
        connection point 'weather' does not belong to web part 'zip1'
        web part 'weather1' cannot be connected to itself
        web part 'weather3' is closed
        connection point 'row' on 'zip2' is disabled
        provider interface 'IWebPartRow' does not match consumer interface 'IZipCode'"#]]
    .assert_eq(&messages.join("\n"));
    assert!(manager.can_connect("zip1", "zip", "weather1", "zip", None));
}

#[test]
fn single_connection_points_refuse_a_second_connection() {
    let harness = user_harness();
    let mut manager = ready(&harness, alice(), connection_page);
    manager
        .connect("zip1", "zip", "weather1", "zip", None)
        .expect("first connection");

    assert_eq!(
        manager.check_connect("zip1", "zip", "weather2", "zip", None),
        Err(WebPartsError::DuplicateConnection {
            part: "zip1".into(),
            point: "zip".into(),
        })
    );
    assert_eq!(
        manager.check_connect("zip2", "zip", "weather1", "zip", None),
        Err(WebPartsError::DuplicateConnection {
            part: "weather1".into(),
            point: "zip".into(),
        })
    );

    // `row` takes any number of connections.
    for consumer in ["weather1", "weather2"] {
        manager
            .connect("zip1", "row", consumer, "field", row_to_zip())
            .expect("row connection");
    }
    assert_eq!(manager.connections().count(), 3);
}

#[test]
fn secondary_interfaces_must_be_accepted_by_the_consumer() {
    let harness = user_harness();
    let page = |manager: &mut WebPartManager| {
        manager.register_zone(Zone::web_parts("main"))?;
        manager.add_static_part(
            "main",
            Box::new(ZipProvider {
                secondary: vec![InterfaceType::new("IZipFormat")],
                ..ZipProvider::new("zip1")
            }),
        )?;
        manager.add_static_part("main", Box::new(ZipProvider::new("zip2")))?;
        manager.add_static_part(
            "main",
            Box::new(WeatherConsumer {
                rejects_secondary: true,
                ..WeatherConsumer::new("strict")
            }),
        )?;
        manager.add_static_part(
            "main",
            Box::new(WeatherConsumer {
                requires_secondary: true,
                ..WeatherConsumer::new("picky")
            }),
        )
    };
    let manager = ready(&harness, alice(), page);

    let incompatible = |part: &str| WebPartsError::IncompatibleSecondaryInterfaces {
        part: part.into(),
        point: "zip".into(),
    };
    assert_eq!(
        manager.check_connect("zip1", "zip", "strict", "zip", None),
        Err(incompatible("strict"))
    );
    assert_eq!(
        manager.check_connect("zip2", "zip", "picky", "zip", None),
        Err(incompatible("picky"))
    );
    assert!(manager.can_connect("zip2", "zip", "strict", "zip", None));
    assert!(manager.can_connect("zip1", "zip", "picky", "zip", None));

    let transformer = RowToFieldTransformer::new("zip");
    assert_eq!(
        manager.check_connect("zip1", "row", "picky", "field", Some(&transformer)),
        Err(WebPartsError::ConsumerRequiresSecondaryInterfaces {
            part: "picky".into(),
            point: "field".into(),
        })
    );
}

#[test]
fn transformer_must_be_allowed_and_bridge_both_interfaces() {
    let harness = user_harness();
    let manager = ready(&harness, alice(), connection_page);
    let transformer = RowToFieldTransformer::new("zip");

    assert!(manager.can_connect("zip1", "row", "weather1", "field", Some(&transformer)));
    assert_eq!(
        manager.check_connect("zip1", "zip", "weather1", "field", Some(&transformer)),
        Err(WebPartsError::IncompatibleProviderTransformer {
            transformer: "row-to-field".into(),
            interface: "IZipCode".into(),
        })
    );
    assert_eq!(
        manager.check_connect("zip1", "row", "weather1", "zip", Some(&transformer)),
        Err(WebPartsError::IncompatibleConsumerTransformer {
            transformer: "row-to-field".into(),
            interface: "IZipCode".into(),
        })
    );

    let restricted = PageHarness::new(
        PersonalizationConfig {
            allowed_transformers: vec!["field-to-row".into()],
            ..PersonalizationConfig::default()
        },
        Arc::new(catalog()),
    );
    let manager = ready(&restricted, alice(), connection_page);
    assert_eq!(
        manager.check_connect("zip1", "row", "weather1", "field", Some(&transformer)),
        Err(WebPartsError::TransformerNotAvailable("row-to-field".into()))
    );
}

#[test]
fn connection_persists_and_moves_values_on_every_request() {
    let harness = user_harness();
    let run = harness
        .post(PAGE, Some("alice"), connection_page, |manager| {
            let id = manager
                .connect("zip1", "zip", "weather1", "zip", None)?
                .expect("not cancelled");
            assert!(id.starts_with('c'));
            Ok(())
        })
        .expect("post");
    assert!(matches!(run.saved, webparts_runtime::SaveOutcome::Saved { .. }));
    assert_eq!(
        property(&run.manager, "weather1", "Received"),
        Some("98052".into())
    );
    assert_eq!(
        property(&run.manager, "weather1", "ReceivedOn"),
        Some("zip".into())
    );

    let run = harness
        .get(PAGE, Some("alice"), connection_page)
        .expect("get");
    let connection = run
        .manager
        .connection_for_consumer("weather1", "ZIP")
        .expect("connection restored");
    assert!(connection.is_active());
    assert!(!connection.is_static());
    assert!(!connection.is_shared());
    assert_eq!(
        property(&run.manager, "weather1", "Received"),
        Some("98052".into())
    );

    // Other users never see it.
    let run = harness.get(PAGE, Some("bob"), connection_page).expect("get");
    assert_eq!(run.manager.connections().count(), 0);
    assert_eq!(property(&run.manager, "weather1", "Received"), None);
}

#[test]
fn transformer_configuration_survives_a_round_trip() {
    let harness = user_harness();
    harness
        .post(PAGE, Some("alice"), connection_page, |manager| {
            manager.connect("zip1", "row", "weather2", "field", row_to_zip())?;
            Ok(())
        })
        .expect("post");

    let run = harness
        .get(PAGE, Some("alice"), connection_page)
        .expect("get");
    let connection = run
        .manager
        .connection_for_provider("zip1", "row")
        .expect("restored");
    let transformer = connection.transformer().expect("transformer restored");
    assert_eq!(transformer.name(), "row-to-field");
    assert_eq!(
        transformer.save_configuration(),
        Some(PropertyValue::from("zip"))
    );
    assert_eq!(
        property(&run.manager, "weather2", "Received"),
        Some("98052".into())
    );
    assert_eq!(
        property(&run.manager, "weather2", "ReceivedOn"),
        Some("field".into())
    );
}

#[test]
fn disconnect_removes_user_connections() {
    let harness = user_harness();
    let run = harness
        .post(PAGE, Some("alice"), connection_page, |manager| {
            manager.connect("zip1", "zip", "weather1", "zip", None)?;
            Ok(())
        })
        .expect("connect");
    let id = run
        .manager
        .connections()
        .next()
        .map(|connection| connection.id().to_owned())
        .expect("connection");

    let run = harness
        .post(PAGE, Some("alice"), connection_page, |manager| {
            assert!(manager.disconnect(&id)?);
            assert_eq!(
                manager.disconnect(&id),
                Err(WebPartsError::UnknownConnection(id.as_str().into()))
            );
            Ok(())
        })
        .expect("disconnect");
    assert!(run.manager.has_data_changed());

    let run = harness
        .get(PAGE, Some("alice"), connection_page)
        .expect("get");
    assert_eq!(run.manager.connections().count(), 0);
    assert!(!run.manager.has_data_changed());
}

#[test]
fn static_connection_is_tombstoned_per_user() {
    let harness = user_harness();
    harness
        .post(PAGE, Some("alice"), with_static_connection, |manager| {
            assert!(manager.disconnect("s1")?);
            assert_eq!(
                manager.disconnect("S1"),
                Err(WebPartsError::AlreadyDisconnected("S1".into()))
            );
            Ok(())
        })
        .expect("disconnect");

    let run = harness
        .get(PAGE, Some("alice"), with_static_connection)
        .expect("get");
    let connection = run.manager.connection("s1").expect("still declared");
    assert!(connection.is_deleted());
    assert!(!connection.is_active());
    assert_eq!(property(&run.manager, "weather1", "Received"), None);

    let run = harness
        .get(PAGE, Some("bob"), with_static_connection)
        .expect("get");
    assert!(run.manager.connection("s1").is_some_and(|c| c.is_active()));
}

#[test]
fn shared_tombstones_are_not_copied_into_user_data() {
    let mut harness = user_harness();
    use_shared_scope(&mut harness);
    harness
        .post(PAGE, Some("admin"), with_static_connection, |manager| {
            assert!(manager.disconnect("s1")?);
            Ok(())
        })
        .expect("admin disconnects");

    use_user_scope(&mut harness);
    harness
        .post(PAGE, Some("alice"), with_static_connection, |manager| {
            let connection = manager.connection("s1").expect("declared");
            assert_eq!(connection.deleted_in(), Some(PersonalizationScope::Shared));
            manager.connect("zip2", "zip", "weather3", "zip", None)?;
            Ok(())
        })
        .expect("alice connects");

    // Only the shared layer held the tombstone.
    harness.store().reset_blob(PAGE, None).expect("reset shared");
    let run = harness
        .get(PAGE, Some("alice"), with_static_connection)
        .expect("alice views");
    assert!(run.manager.connection("s1").is_some_and(|c| c.is_active()));
    assert!(run
        .manager
        .connection_for_consumer("weather3", "zip")
        .is_some_and(|c| c.is_active()));
}

#[test]
fn connections_freeze_after_activation() {
    let harness = user_harness();
    let mut run = harness
        .get(PAGE, Some("alice"), with_static_connection)
        .expect("get");
    let manager = &mut run.manager;
    assert!(manager.static_connections().is_read_only());
    assert!(manager.dynamic_connections().is_read_only());
    assert_eq!(
        manager.connect("zip2", "zip", "weather2", "zip", None),
        Err(WebPartsError::ConnectionsReadOnly("dynamic"))
    );
    assert_eq!(
        manager.disconnect("s1"),
        Err(WebPartsError::ConnectionsReadOnly("static"))
    );
    let late = WebPartConnection::new("s2", "zip2", "zip", "weather2", "zip");
    assert!(matches!(
        manager.add_static_connection(late),
        Err(WebPartsError::TooLate { .. })
    ));
}

#[test]
fn user_connection_beats_shared_and_static_ones_on_the_same_point() {
    let mut harness = user_harness();

    let run = harness
        .post(PAGE, Some("alice"), connection_page, |manager| {
            manager.connect("zip1", "zip", "weather3", "zip", None)?;
            Ok(())
        })
        .expect("alice connects");
    let mine = run.manager.connections().next().expect("mine").id().to_owned();

    use_shared_scope(&mut harness);
    let run = harness
        .post(PAGE, Some("admin"), connection_page, |manager| {
            manager.connect("zip1", "zip", "weather2", "zip", None)?;
            Ok(())
        })
        .expect("admin connects");
    let shared = run.manager.connections().next().expect("shared").id().to_owned();
    assert!(run.manager.connection(&shared).is_some_and(|c| c.is_shared()));

    use_user_scope(&mut harness);
    let run = harness
        .get(PAGE, Some("alice"), with_static_connection)
        .expect("alice views");
    let manager = &run.manager;
    let active: Vec<&str> = manager
        .connections()
        .filter(|connection| connection.is_active())
        .map(|connection| connection.id())
        .collect();
    assert_eq!(active, [mine.as_str()]);
    assert!(manager.connection("s1").is_some_and(|c| c.is_deleted()));
    assert!(manager.connection(&shared).is_some_and(|c| c.is_deleted()));
    assert_eq!(property(manager, "weather3", "Received"), Some("98052".into()));
    assert_eq!(property(manager, "weather1", "Received"), None);
    assert_eq!(property(manager, "weather2", "Received"), None);

    // The losers stay disconnected for alice.
    let run = harness
        .get(PAGE, Some("alice"), with_static_connection)
        .expect("alice again");
    assert!(run.manager.connection("s1").is_some_and(|c| c.is_deleted()));
    assert!(run.manager.connection(&shared).is_some_and(|c| c.is_deleted()));
    assert!(run.manager.connection(&mine).is_some_and(|c| c.is_active()));
    assert!(!run.manager.has_data_changed());
}

#[test]
fn connections_contesting_a_point_are_both_left_inactive() {
    let harness = user_harness();
    let page = |manager: &mut WebPartManager| {
        connection_page(manager)?;
        manager.add_static_connection(WebPartConnection::new(
            "s1", "zip1", "zip", "weather1", "zip",
        ))?;
        manager.add_static_connection(WebPartConnection::new(
            "s2", "zip1", "zip", "weather2", "zip",
        ))
    };
    let run = harness.get(PAGE, Some("alice"), page).expect("get");
    let manager = &run.manager;

    for id in ["s1", "s2"] {
        let connection = manager.connection(id).expect("declared");
        assert!(!connection.is_active());
        assert!(!connection.is_deleted());
    }
    let error = |part: &str| {
        manager
            .part(part)
            .and_then(|slot| slot.connect_error())
            .map(str::to_owned)
    };
    expect![[r#"connection 's1' was not activated: it conflicts with connection 's2' on the same connection point"#]]
        .assert_eq(&error("weather1").expect("first consumer shows the conflict"));
    expect![[r#"connection 's2' was not activated: it conflicts with connection 's1' on the same connection point"#]]
        .assert_eq(&error("weather2").expect("second consumer shows the conflict"));
    assert_eq!(property(manager, "weather1", "Received"), None);
    assert_eq!(property(manager, "weather2", "Received"), None);
}

#[test]
fn connection_to_a_vanished_part_is_dropped_unless_static() {
    let harness = user_harness();
    harness
        .post(PAGE, Some("alice"), connection_page, |manager| {
            manager.connect("zip1", "zip", "weather3", "zip", None)?;
            Ok(())
        })
        .expect("connect");

    let without_weather3 = |manager: &mut WebPartManager| {
        manager.register_zone(Zone::web_parts("left"))?;
        manager.register_zone(Zone::web_parts("right"))?;
        manager.add_static_part("left", Box::new(ZipProvider::new("zip1")))?;
        manager.add_static_part("right", Box::new(WeatherConsumer::new("weather1")))
    };
    let run = harness
        .get(PAGE, Some("alice"), without_weather3)
        .expect("get");
    assert_eq!(run.manager.connections().count(), 0);
    assert!(run.manager.has_data_changed());

    let broken = |manager: &mut WebPartManager| {
        without_weather3(manager)?;
        manager.add_static_connection(WebPartConnection::new(
            "s9", "zip1", "zip", "weather9", "zip",
        ))
    };
    let err = harness.get(PAGE, Some("alice"), broken).unwrap_err();
    assert_eq!(
        err,
        WebPartsError::MissingConsumer {
            connection: "s9".into(),
            consumer: "weather9".into(),
        }
    );
}

#[test]
fn duplicate_connection_ids_fail_activation() {
    let harness = user_harness();
    let run = harness
        .post(PAGE, Some("alice"), connection_page, |manager| {
            manager.connect("zip1", "zip", "weather1", "zip", None)?;
            Ok(())
        })
        .expect("connect");
    let id = run.manager.connections().next().expect("connection").id().to_owned();

    let clashing = {
        let id = id.clone();
        move |manager: &mut WebPartManager| {
            connection_page(manager)?;
            manager.add_static_connection(WebPartConnection::new(
                id.as_str(),
                "zip2",
                "zip",
                "weather2",
                "zip",
            ))
        }
    };
    let err = harness.get(PAGE, Some("alice"), clashing).unwrap_err();
    assert_eq!(err, WebPartsError::DuplicateConnectionId(id.as_str().into()));

    let mut manager = harness.manager(alice());
    let duplicate = WebPartConnection::new("s1", "zip2", "zip", "weather2", "zip");
    with_static_connection(&mut manager).expect("page");
    assert_eq!(
        manager.add_static_connection(duplicate),
        Err(WebPartsError::DuplicateConnectionId("s1".into()))
    );
    assert_eq!(
        manager.add_static_connection(WebPartConnection::new("", "zip2", "zip", "weather2", "zip")),
        Err(WebPartsError::MissingConnectionId)
    );
}

#[test]
fn submitted_connections_never_fail() {
    let harness = user_harness();
    let mut manager = ready(&harness, alice(), connection_page);

    let incomplete = ConnectionSubmission {
        provider: "zip1".into(),
        ..ConnectionSubmission::default()
    };
    assert_eq!(
        manager.connect_from_submission(&incomplete),
        ConnectOutcome::Rejected("the connection request is incomplete".into())
    );

    let submission = ConnectionSubmission {
        provider: "zip1".into(),
        provider_point: "row".into(),
        consumer: "weather1".into(),
        consumer_point: "field".into(),
        transformer: Some("unknown".into()),
        transformer_configuration: None,
    };
    assert_eq!(
        manager.connect_from_submission(&submission),
        ConnectOutcome::Rejected("transformer 'unknown' is not available".into())
    );

    let stale = ConnectionSubmission {
        consumer: "weather7".into(),
        transformer: None,
        ..submission.clone()
    };
    assert_eq!(
        manager.connect_from_submission(&stale),
        ConnectOutcome::Rejected("unknown web part 'weather7'".into())
    );

    let valid = ConnectionSubmission {
        transformer: Some("row-to-field".into()),
        transformer_configuration: Some("zip".into()),
        ..submission
    };
    let ConnectOutcome::Connected(id) = manager.connect_from_submission(&valid) else {
        panic!("expected a connection");
    };
    let transformer = manager
        .connection(&id)
        .and_then(|connection| connection.transformer())
        .expect("transformer attached");
    assert_eq!(transformer.save_configuration(), Some("zip".into()));

    let hooks =
        RecordingHooks::cancelling(|event| matches!(event, ManagerEvent::Connecting { .. }));
    manager.set_hooks(Box::new(hooks));
    let other = ConnectionSubmission {
        provider: "zip2".into(),
        provider_point: "zip".into(),
        consumer: "weather2".into(),
        consumer_point: "zip".into(),
        ..ConnectionSubmission::default()
    };
    assert_eq!(manager.connect_from_submission(&other), ConnectOutcome::Cancelled);
    assert_eq!(manager.connections().count(), 1);
}

#[test]
fn closing_a_part_disconnects_it_even_when_hooks_cancel() {
    let harness = user_harness();
    let hooks =
        RecordingHooks::cancelling(|event| matches!(event, ManagerEvent::Disconnecting { .. }));
    let mut manager = ready(&harness, alice(), connection_page);
    let id = manager
        .connect("zip1", "zip", "weather1", "zip", None)
        .expect("connect")
        .expect("not cancelled");
    manager.set_hooks(Box::new(hooks.clone()));

    assert_eq!(manager.disconnect(&id), Ok(false));
    assert_eq!(manager.connections().count(), 1);

    assert!(manager.close_web_part("weather1").expect("close"));
    assert_eq!(manager.connections().count(), 0);
    let cascaded = hooks
        .before
        .lock()
        .iter()
        .filter(|(event, _)| matches!(event, ManagerEvent::Disconnecting { .. }))
        .map(|(_, cx)| cx.cascade)
        .collect::<Vec<_>>();
    assert_eq!(cascaded, [false, true]);
    assert!(hooks.after_events().contains(&ManagerEvent::Disconnected {
        connection: id.clone(),
    }));
}

#[test]
fn enabled_points_follow_the_part_and_the_request_culture() {
    let harness = user_harness();
    let manager = ready(&harness, alice(), connection_page);
    let ids = |points: Vec<webparts_core::ConnectionPoint>| {
        points.into_iter().map(|point| point.id).collect::<Vec<_>>()
    };
    assert_eq!(ids(manager.enabled_provider_points("zip1").expect("zip1")), ["zip", "row"]);
    assert_eq!(ids(manager.enabled_provider_points("zip2").expect("zip2")), ["zip"]);
    assert_eq!(
        manager.enabled_consumer_points("nope"),
        Err(WebPartsError::UnknownPart("nope".into()))
    );

    let german = ready(&harness, alice().with_culture("de"), connection_page);
    let names: Vec<_> = german
        .enabled_consumer_points("weather1")
        .expect("weather1")
        .into_iter()
        .map(|point| point.display_name)
        .collect();
    assert_eq!(names, ["Postleitzahl", "Field"]);
}
