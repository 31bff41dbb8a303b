//! Integration tests: SessionManager lifecycle against a mock transport.

use std::time::Duration;

use futures_lite::future::block_on;
use sensorlink::app::channels::{self, EVENT_DEPTH, StopSignal};
use sensorlink::app::session::{SessionManager, SessionState};
use sensorlink::app::sink::NotificationSink;
use sensorlink::config::SessionConfig;
use sensorlink::error::{SessionError, TransportError};

use super::mock_ble::{
    ChannelSlot, FloodingPresenter, MockTransport, PresenterCall, RecordingPresenter,
    SENSOR_CHAR, TransportCall, link_lost, notification,
};

const VALID: &[u8] = br#"{"temp":23.5,"ax":0.01,"ay":-9.8,"az":0.02,"batt":3.91}"#;
const VALID_2: &[u8] = br#"{"temp":24.0,"ax":0.0,"ay":-9.81,"az":0.0,"batt":3.9}"#;

fn run_session(
    transport: MockTransport,
    stop: &StopSignal,
) -> (
    Result<(), SessionError>,
    SessionManager<MockTransport>,
    NotificationSink<RecordingPresenter>,
) {
    let mut manager = SessionManager::new(SessionConfig::default(), transport);
    let mut sink = NotificationSink::new(RecordingPresenter::new());
    let result = block_on(manager.run(&mut sink, stop));
    (result, manager, sink)
}

// ── Clean stop ────────────────────────────────────────────────

#[test]
fn stop_disables_notifications_then_disconnects() {
    let stop = channels::stop_signal();
    let transport = MockTransport::new()
        .with_script(vec![notification(VALID), notification(VALID_2)])
        .stop_after_script(stop.clone());

    let (result, manager, sink) = run_session(transport, &stop);

    assert_eq!(result, Ok(()));
    assert_eq!(
        manager.transport().calls,
        vec![
            TransportCall::Connect {
                address: "98:88:E0:10:1F:2E".into(),
                timeout: Duration::from_secs(15),
            },
            TransportCall::EnableNotifications(SENSOR_CHAR),
            TransportCall::DisableNotifications(SENSOR_CHAR),
            TransportCall::Disconnect,
        ]
    );
    assert_eq!(manager.state(), SessionState::Disconnected);
    assert!(!manager.notifications_active());
    assert_eq!(sink.presenter().records().len(), 2);
}

#[test]
fn disconnect_is_attempted_even_when_disable_fails() {
    let stop = channels::stop_signal();
    let mut transport = MockTransport::new().stop_after_script(stop.clone());
    transport.disable_result = Err(TransportError::Backend("ATT error 0x0e".into()));

    let (result, manager, _sink) = run_session(transport, &stop);

    assert_eq!(result, Ok(()), "teardown errors must not fail the run");
    let calls = &manager.transport().calls;
    assert_eq!(calls[2], TransportCall::DisableNotifications(SENSOR_CHAR));
    assert_eq!(calls[3], TransportCall::Disconnect);
    assert_eq!(manager.state(), SessionState::Disconnected);
}

#[test]
fn failing_teardown_calls_still_exit_cleanly() {
    let stop = channels::stop_signal();
    let mut transport = MockTransport::new().stop_after_script(stop.clone());
    transport.disable_result = Err(TransportError::NotConnected);
    transport.disconnect_result = Err(TransportError::NotConnected);

    let (result, manager, _sink) = run_session(transport, &stop);

    assert_eq!(result, Ok(()));
    assert!(manager.transport().was_called(&TransportCall::Disconnect));
}

#[test]
fn queued_notifications_are_drained_before_stop() {
    let stop = channels::stop_signal();
    let script = (0..10)
        .map(|i| {
            let doc = format!(r#"{{"temp":{i},"ax":0,"ay":0,"az":0,"batt":3.7}}"#);
            notification(doc.as_bytes())
        })
        .collect();
    let transport = MockTransport::new()
        .with_script(script)
        .stop_after_script(stop.clone());

    let (result, _manager, sink) = run_session(transport, &stop);

    assert_eq!(result, Ok(()));
    let temps: Vec<f64> = sink
        .presenter()
        .records()
        .iter()
        .map(|r| r.temperature_c)
        .collect();
    assert_eq!(temps, (0..10).map(f64::from).collect::<Vec<_>>());
}

#[test]
fn stop_is_honoured_while_the_channel_never_empties() {
    let stop = channels::stop_signal();
    let slot = ChannelSlot::default();
    let transport = MockTransport::new()
        .with_script(vec![notification(VALID); EVENT_DEPTH])
        .share_channel(slot.clone())
        .stop_after_script(stop.clone());
    let mut manager = SessionManager::new(SessionConfig::default(), transport);
    let mut sink = NotificationSink::new(FloodingPresenter::new(slot, VALID));

    let result = block_on(manager.run(&mut sink, &stop));

    assert_eq!(result, Ok(()));
    assert_eq!(sink.presenter().shown, EVENT_DEPTH, "drain is bounded");
    assert_eq!(
        manager.transport().calls[2..],
        [
            TransportCall::DisableNotifications(SENSOR_CHAR),
            TransportCall::Disconnect,
        ]
    );
    assert_eq!(manager.state(), SessionState::Disconnected);
}

#[test]
fn configured_target_is_used() {
    let stop = channels::stop_signal();
    let config = SessionConfig {
        device_address: "11:22:33:44:55:66".into(),
        characteristic_uuid: uuid::Uuid::from_u128(0xabc),
        connect_timeout_secs: 3,
        ..SessionConfig::default()
    };
    let transport = MockTransport::new().stop_after_script(stop.clone());
    let mut manager = SessionManager::new(config, transport);
    let mut sink = NotificationSink::new(RecordingPresenter::new());

    assert_eq!(block_on(manager.run(&mut sink, &stop)), Ok(()));
    assert_eq!(
        manager.transport().calls[..2],
        [
            TransportCall::Connect {
                address: "11:22:33:44:55:66".into(),
                timeout: Duration::from_secs(3),
            },
            TransportCall::EnableNotifications(uuid::Uuid::from_u128(0xabc)),
        ]
    );
}

// ── Fatal paths ───────────────────────────────────────────────

#[test]
fn connect_failure_is_fatal_and_skips_subscribe() {
    let stop = channels::stop_signal();
    let mut transport = MockTransport::new();
    transport.connect_result = Err(TransportError::ConnectTimeout(Duration::from_secs(15)));

    let (result, manager, sink) = run_session(transport, &stop);

    assert_eq!(
        result,
        Err(SessionError::ConnectFailed(TransportError::ConnectTimeout(
            Duration::from_secs(15)
        )))
    );
    let calls = &manager.transport().calls;
    assert!(matches!(calls[0], TransportCall::Connect { .. }));
    assert_eq!(
        calls[1..],
        [TransportCall::Disconnect],
        "no retry, no subscribe, link released"
    );
    assert_eq!(manager.state(), SessionState::Disconnected);
    assert!(sink.presenter().calls.is_empty());
}

#[test]
fn subscribe_failure_is_fatal_but_releases_link() {
    let stop = channels::stop_signal();
    let mut transport = MockTransport::new();
    transport.enable_result = Err(TransportError::NotNotifiable(SENSOR_CHAR));

    let (result, manager, _sink) = run_session(transport, &stop);

    assert_eq!(
        result,
        Err(SessionError::SubscribeFailed(TransportError::NotNotifiable(SENSOR_CHAR)))
    );
    let calls = &manager.transport().calls;
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1], TransportCall::EnableNotifications(SENSOR_CHAR));
    assert_eq!(calls[2], TransportCall::Disconnect);
    assert!(!manager.notifications_active());
}

#[test]
fn link_loss_is_fatal_after_processing_earlier_events() {
    let stop = channels::stop_signal();
    let transport = MockTransport::new().with_script(vec![
        notification(VALID),
        link_lost("peripheral disconnected"),
    ]);

    let (result, manager, sink) = run_session(transport, &stop);

    assert_eq!(
        result,
        Err(SessionError::LinkLost("peripheral disconnected".into()))
    );
    assert_eq!(sink.presenter().records().len(), 1);
    assert_eq!(manager.transport().calls.last(), Some(&TransportCall::Disconnect));
    assert!(
        !manager
            .transport()
            .was_called(&TransportCall::DisableNotifications(SENSOR_CHAR)),
        "no unsubscribe on a dead link"
    );
    assert_eq!(manager.state(), SessionState::Disconnected);
}

// ── Cancellation before steady state ──────────────────────────

#[test]
fn stop_while_connecting_is_a_clean_exit() {
    let stop = channels::stop_signal();
    stop.signal(());
    let mut transport = MockTransport::new();
    transport.hang_on_connect = true;

    let (result, manager, _sink) = run_session(transport, &stop);

    assert_eq!(result, Ok(()));
    let calls = &manager.transport().calls;
    assert!(matches!(calls[0], TransportCall::Connect { .. }));
    assert_eq!(calls[1..], [TransportCall::Disconnect]);
}

#[test]
fn stop_while_enabling_notifications_runs_full_teardown() {
    let stop = channels::stop_signal();
    stop.signal(());
    let mut transport = MockTransport::new();
    transport.hang_on_enable = true;

    let (result, manager, sink) = run_session(transport, &stop);

    assert_eq!(result, Ok(()));
    let calls = &manager.transport().calls;
    assert!(matches!(calls[0], TransportCall::Connect { .. }));
    assert_eq!(
        calls[1..],
        [
            TransportCall::EnableNotifications(SENSOR_CHAR),
            TransportCall::DisableNotifications(SENSOR_CHAR),
            TransportCall::Disconnect,
        ]
    );
    assert_eq!(manager.state(), SessionState::Disconnected);
    assert!(!manager.notifications_active());
    assert!(sink.presenter().calls.is_empty());
}

// ── Decode errors never end the session ───────────────────────

#[test]
fn bad_payloads_are_reported_and_session_continues() {
    let stop = channels::stop_signal();
    let transport = MockTransport::new()
        .with_script(vec![
            notification(VALID),
            notification(b"not json"),
            notification(br#"{"temp":23.5}"#),
            notification(&[0xff, 0xfe]),
            notification(VALID_2),
        ])
        .stop_after_script(stop.clone());

    let (result, manager, sink) = run_session(transport, &stop);

    assert_eq!(result, Ok(()));
    let calls = &sink.presenter().calls;
    assert_eq!(calls.len(), 5);
    assert!(matches!(calls[0], PresenterCall::Record(_)));
    assert_eq!(
        calls[1],
        PresenterCall::Error {
            message: "invalid JSON".into(),
            raw: "not json".into()
        }
    );
    assert_eq!(
        calls[2],
        PresenterCall::Error {
            message: "missing key 'ax'".into(),
            raw: r#"{"temp":23.5}"#.into()
        }
    );
    assert_eq!(
        calls[3],
        PresenterCall::Error {
            message: "invalid UTF-8 payload".into(),
            raw: "fffe".into()
        }
    );
    assert!(matches!(calls[4], PresenterCall::Record(_)));
    assert_eq!(sink.stats().records, 2);
    assert_eq!(sink.stats().decode_failures(), 3);
    assert!(manager.transport().was_called(&TransportCall::Disconnect));
}
