//! End-to-end bridge behavior against a scripted transceiver.

mod common;

use std::sync::Arc;
use std::time::Duration;

use rfxcom::protocol::{CMD_GET_STATUS, CMD_RESET, CMD_START_RECEIVER};
use rfxcom::{
    BridgeConfig, BridgeEvent, BridgeStatus, ConnectionState, DeviceMessage,
    DeviceMessageListener, Error, ListenerError, PacketType, Protocol, StatusDetail,
    Subscription, TransmitterResponse,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

fn lighting1_on() -> DeviceMessage {
    DeviceMessage::new(PacketType::Lighting1, 0x00, vec![0x41, 0x01, 0x01, 0x00])
}

fn configured() -> BridgeConfig {
    BridgeConfig::serial("/dev/ttyUSB0")
        .enable(Protocol::Ac)
        .enable(Protocol::Arc)
}

async fn wait_status(events: &mut Subscription, status: BridgeStatus, within: Duration) -> bool {
    events
        .wait_for(|e| *e == BridgeEvent::StatusChanged(status), within)
        .await
        .is_some()
}

#[tokio::test(start_paused = true)]
async fn test_start_walks_the_handshake_and_goes_online() {
    let (bridge, script) = common::bridge(configured());
    let mut states = bridge.subscribe();
    let mut events = bridge.subscribe();

    bridge.start();
    assert!(wait_status(&mut events, BridgeStatus::Online, Duration::from_secs(5)).await);
    assert_eq!(bridge.state(), ConnectionState::Running);

    let mut seen = Vec::new();
    while let Some(event) = states.try_recv() {
        if let BridgeEvent::StateChanged(state) = event {
            seen.push(state);
        }
    }
    assert_eq!(
        seen,
        vec![
            ConnectionState::Connecting,
            ConnectionState::ResetSent,
            ConnectionState::StatusRequested,
            ConnectionState::Configured,
            ConnectionState::Running,
        ]
    );

    let writes = script.writes();
    assert_eq!(writes.len(), 4);
    assert_eq!(writes[0].1, CMD_RESET);
    assert_eq!(writes[1].1, CMD_GET_STATUS);
    assert!(writes[1].0 - writes[0].0 >= Duration::from_millis(300));

    let set_mode = &writes[2].1;
    assert_eq!(set_mode.len(), 14);
    assert_eq!(&set_mode[..5], &[0x0D, 0x00, 0x00, 0x00, 0x03]);
    assert_eq!(set_mode[5], 0x53);
    assert_eq!(set_mode[9], 0x06);

    assert_eq!(writes[3].1, CMD_START_RECEIVER);
    assert_eq!(script.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_send_is_acknowledged() {
    let (bridge, script) = common::bridge(configured());
    let mut events = bridge.subscribe();
    bridge.start();
    assert!(wait_status(&mut events, BridgeStatus::Online, Duration::from_secs(5)).await);

    let receipt = bridge.send(lighting1_on()).await.unwrap();
    assert_eq!(receipt.sequence, 1);
    assert_eq!(receipt.response, TransmitterResponse::Ack);
    assert!(!receipt.warning());

    let receipt = bridge.send(lighting1_on()).await.unwrap();
    assert_eq!(receipt.sequence, 2);

    let frames = script.device_writes();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0], vec![0x07, 0x10, 0x00, 0x01, 0x41, 0x01, 0x01, 0x00]);
    assert_eq!(frames[1][3], 0x02);
    assert_eq!(bridge.status(), BridgeStatus::Online);
}

#[tokio::test(start_paused = true)]
async fn test_nak_is_returned_as_warning() {
    let (bridge, script) = common::bridge(configured());
    let mut events = bridge.subscribe();
    bridge.start();
    assert!(wait_status(&mut events, BridgeStatus::Online, Duration::from_secs(5)).await);

    script.set_ack_response(0x02);
    let receipt = bridge.send(lighting1_on()).await.unwrap();
    assert_eq!(receipt.response, TransmitterResponse::Nak);
    assert!(receipt.warning());
    assert_eq!(bridge.status(), BridgeStatus::Online);
}

#[tokio::test(start_paused = true)]
async fn test_send_timeout_goes_offline_then_supervisor_reconnects() {
    let (bridge, script) = common::bridge(configured());
    let mut events = bridge.subscribe();
    bridge.start();
    assert!(wait_status(&mut events, BridgeStatus::Online, Duration::from_secs(5)).await);

    script.set_auto_ack(false);
    let started = Instant::now();
    let err = bridge.send(lighting1_on()).await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, Error::Timeout { timeout_ms: 5000 }));
    assert!(elapsed >= Duration::from_secs(5));
    assert!(elapsed < Duration::from_secs(6));
    assert_eq!(
        bridge.status(),
        BridgeStatus::Offline(Some(StatusDetail::CommunicationError))
    );
    assert_eq!(bridge.state(), ConnectionState::Offline);

    assert!(wait_status(&mut events, BridgeStatus::Online, Duration::from_secs(70)).await);
    assert_eq!(script.connects(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_ignore_config_skips_set_mode() {
    let (bridge, script) = common::bridge(configured().ignore_config());
    let mut events = bridge.subscribe();
    bridge.start();
    assert!(wait_status(&mut events, BridgeStatus::Online, Duration::from_secs(5)).await);

    let frames: Vec<_> = script.writes().into_iter().map(|(_, f)| f).collect();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0], CMD_RESET);
    assert_eq!(frames[1], CMD_GET_STATUS);
    assert_eq!(frames[2], CMD_START_RECEIVER);
}

#[tokio::test(start_paused = true)]
async fn test_literal_set_mode_is_written_verbatim() {
    let literal = "0D00000003530000000F00000000";
    let (bridge, script) = common::bridge(configured().set_mode(literal));
    let mut events = bridge.subscribe();
    bridge.start();
    assert!(wait_status(&mut events, BridgeStatus::Online, Duration::from_secs(5)).await);

    let writes = script.writes();
    assert_eq!(writes[2].1, hex::decode(literal).unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_malformed_set_mode_falls_back_to_protocols() {
    let (bridge, script) = common::bridge(configured().set_mode("0D00000003ZZ"));
    let mut events = bridge.subscribe();
    bridge.start();
    assert!(wait_status(&mut events, BridgeStatus::Online, Duration::from_secs(5)).await);

    let writes = script.writes();
    let set_mode = &writes[2].1;
    assert_eq!(set_mode.len(), 14);
    assert_eq!(set_mode[4], 0x03);
    assert_eq!(set_mode[9], 0x06);
    assert_eq!(bridge.state(), ConnectionState::Running);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_sends_are_serialized() {
    let (bridge, script) = common::bridge(configured());
    let mut events = bridge.subscribe();
    bridge.start();
    assert!(wait_status(&mut events, BridgeStatus::Online, Duration::from_secs(5)).await);

    script.set_auto_ack(false);
    let first = tokio::spawn({
        let bridge = Arc::clone(&bridge);
        async move { bridge.send(lighting1_on()).await }
    });
    let second = tokio::spawn({
        let bridge = Arc::clone(&bridge);
        async move { bridge.send(lighting1_on()).await }
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(script.device_writes().len(), 1);

    assert!(script.ack_last(0x00));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(script.device_writes().len(), 2);

    assert!(script.ack_last(0x00));
    let mut sequences = vec![
        first.await.unwrap().unwrap().sequence,
        second.await.unwrap().unwrap().sequence,
    ];
    sequences.sort_unstable();
    assert_eq!(sequences, vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_device_messages_reach_listeners() {
    let (bridge, script) = common::bridge(configured());
    let mut events = bridge.subscribe();
    bridge.start();
    assert!(wait_status(&mut events, BridgeStatus::Online, Duration::from_secs(5)).await);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let recorder: Arc<dyn DeviceMessageListener> = Arc::new(
        move |bridge: &str, message: &DeviceMessage| -> Result<(), ListenerError> {
            let _ = tx.send((bridge.to_owned(), message.clone()));
            Ok(())
        },
    );
    let failing: Arc<dyn DeviceMessageListener> = Arc::new(
        |_: &str, _: &DeviceMessage| -> Result<(), ListenerError> { Err("unsupported".into()) },
    );
    assert!(bridge.register_listener(Arc::clone(&failing)));
    assert!(bridge.register_listener(Arc::clone(&recorder)));
    assert!(!bridge.register_listener(Arc::clone(&recorder)));

    // TEMPERATURE_HUMIDITY, THGR810
    assert!(script.inject(&[0x52, 0x01, 0x04, 0xAF, 0x01, 0x00, 0x90, 0x36, 0x02, 0x59]));

    let (uid, message) = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(uid, "rfxcom:test");
    assert_eq!(message.packet_type, PacketType::TemperatureHumidity);
    assert_eq!(message.sequence, 0x04);

    assert!(bridge.unregister_listener(&recorder));
    assert!(script.inject(&[0x52, 0x01, 0x05, 0xAF, 0x01, 0x00, 0x90, 0x36, 0x02, 0x59]));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_link_loss_goes_offline_and_recovers() {
    let (bridge, script) = common::bridge(configured());
    let mut events = bridge.subscribe();
    bridge.start();
    assert!(wait_status(&mut events, BridgeStatus::Online, Duration::from_secs(5)).await);

    assert!(script.close_link());
    assert!(
        wait_status(
            &mut events,
            BridgeStatus::Offline(Some(StatusDetail::CommunicationError)),
            Duration::from_secs(1)
        )
        .await
    );
    assert!(!script.is_connected());

    assert!(wait_status(&mut events, BridgeStatus::Online, Duration::from_secs(70)).await);
    assert_eq!(script.connects(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_connect_failure_is_retried() {
    let (bridge, script) = common::bridge(configured());
    let mut events = bridge.subscribe();
    script.set_fail_connect(true);
    bridge.start();

    assert!(
        wait_status(
            &mut events,
            BridgeStatus::Offline(Some(StatusDetail::CommunicationError)),
            Duration::from_secs(1)
        )
        .await
    );
    assert_eq!(script.connects(), 0);
    assert!(script.writes().is_empty());

    script.set_fail_connect(false);
    assert!(wait_status(&mut events, BridgeStatus::Online, Duration::from_secs(70)).await);
    assert_eq!(script.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_transport_is_configuration_error() {
    let (bridge, script) = common::bridge(BridgeConfig::new());
    let mut events = bridge.subscribe();
    bridge.start();

    assert!(
        wait_status(
            &mut events,
            BridgeStatus::Offline(Some(StatusDetail::ConfigurationError)),
            Duration::from_secs(1)
        )
        .await
    );
    assert_eq!(script.connects(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_is_idempotent() {
    let (bridge, script) = common::bridge(configured());
    let mut events = bridge.subscribe();
    bridge.start();
    assert!(wait_status(&mut events, BridgeStatus::Online, Duration::from_secs(5)).await);

    let listener: Arc<dyn DeviceMessageListener> =
        Arc::new(|_: &str, _: &DeviceMessage| -> Result<(), ListenerError> { Ok(()) });
    assert!(bridge.register_listener(Arc::clone(&listener)));

    bridge.shutdown().await;
    bridge.shutdown().await;

    assert_eq!(bridge.state(), ConnectionState::Offline);
    assert_eq!(bridge.status(), BridgeStatus::Offline(None));
    assert!(!script.is_connected());
    // listeners were dropped by shutdown
    assert!(!bridge.unregister_listener(&listener));

    let err = bridge.send(lighting1_on()).await.unwrap_err();
    assert!(matches!(err, Error::SendFailed(_)));

    // no reconnect after shutdown
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(script.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_send() {
    let (bridge, script) = common::bridge(configured());
    let mut events = bridge.subscribe();
    bridge.start();
    assert!(wait_status(&mut events, BridgeStatus::Online, Duration::from_secs(5)).await);

    script.set_auto_ack(false);
    let pending = tokio::spawn({
        let bridge = Arc::clone(&bridge);
        async move { bridge.send(lighting1_on()).await }
    });
    tokio::time::sleep(Duration::from_secs(1)).await;

    bridge.shutdown().await;
    let err = pending.await.unwrap().unwrap_err();
    assert!(
        matches!(&err, Error::SendFailed(cause) if matches!(**cause, Error::NotConnected)),
        "unexpected error: {err:?}"
    );
    assert_eq!(bridge.status(), BridgeStatus::Offline(None));
}

#[tokio::test(start_paused = true)]
async fn test_send_during_slow_connect_fails_fast() {
    let (bridge, script) = common::bridge(BridgeConfig::tcp("192.0.2.10", 10001));
    script.set_connect_delay(Duration::from_secs(120));
    bridge.start();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let started = Instant::now();
    let err = bridge.send(lighting1_on()).await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(
        matches!(&err, Error::SendFailed(cause) if matches!(**cause, Error::NotConnected)),
        "unexpected error: {err:?}"
    );
    assert_eq!(
        bridge.status(),
        BridgeStatus::Offline(Some(StatusDetail::CommunicationError))
    );

    // the slow connect still finishes the handshake
    let mut events = bridge.subscribe();
    assert!(wait_status(&mut events, BridgeStatus::Online, Duration::from_secs(130)).await);
    assert_eq!(script.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bad_packets_do_not_disturb_pending_send() {
    let (bridge, script) = common::bridge(configured());
    let mut events = bridge.subscribe();
    bridge.start();
    assert!(wait_status(&mut events, BridgeStatus::Online, Duration::from_secs(5)).await);

    script.set_auto_ack(false);
    let started = Instant::now();
    let pending = tokio::spawn({
        let bridge = Arc::clone(&bridge);
        async move { bridge.send(lighting1_on()).await }
    });
    tokio::time::sleep(Duration::from_secs(1)).await;
    let seq = script.device_writes().last().unwrap()[3];

    // undefined transmitter response code
    assert!(script.inject(&[0x02, 0x01, seq, 0x09]));
    // unknown packet type
    assert!(script.inject(&[0xFF, 0x00, 0x00, 0x00]));
    // interface response cut short
    assert!(script.inject(&[0x01, 0x00, 0x05, 0x02, 0x53]));
    // ack for another sequence
    assert!(script.inject(&[0x02, 0x01, seq.wrapping_add(1), 0x00]));
    // interface control echoed back
    assert!(script.inject(&[
        0x00, 0x00, 0x01, 0x03, 0x53, 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0x00
    ]));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!pending.is_finished());
    assert_eq!(bridge.status(), BridgeStatus::Online);
    assert_eq!(bridge.state(), ConnectionState::Running);
    assert!(events.try_recv().is_none());

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Timeout { timeout_ms: 5000 }));
    assert!(started.elapsed() >= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_failed_reset_closes_transport() {
    let (bridge, script) = common::bridge(configured());
    let mut events = bridge.subscribe();
    script.set_fail_writes(true);
    bridge.start();

    assert!(
        wait_status(
            &mut events,
            BridgeStatus::Offline(Some(StatusDetail::CommunicationError)),
            Duration::from_secs(1)
        )
        .await
    );
    assert_eq!(script.connects(), 1);
    assert!(!script.is_connected());
    assert_eq!(bridge.state(), ConnectionState::Offline);

    script.set_fail_writes(false);
    assert!(wait_status(&mut events, BridgeStatus::Online, Duration::from_secs(70)).await);
    assert_eq!(script.connects(), 2);
}
