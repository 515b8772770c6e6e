use std::cell::{Cell, RefCell};

use libiotconnect::Error;
use libiotconnect::c2d::{C2dEvent, CMD_FAILED, CMD_SUCCESS, EventType, OTA_DOWNLOAD_DONE};
use libiotconnect::config::{
    ClientConfig, DeviceConfig, DeviceTopology, EventHandlers, MqttSend, Session,
};
use serde_json::{Value, json};

thread_local! {
    static COMMANDS: Cell<usize> = const { Cell::new(0) };
    static OTAS: Cell<usize> = const { Cell::new(0) };
    static LAST_COMMAND: RefCell<String> = const { RefCell::new(String::new()) };
    static PUBLISHED: RefCell<Vec<(String, String)>> = const { RefCell::new(Vec::new()) };
}

const C2D_TOPIC: &str = "devices/CPID-pump/messages/devicebound/#";
const ACK_TOPIC: &str = "devices/CPID-pump/messages/events/cd=XG4E&v=2.1&mt=6";

fn capture(topic: &str, payload: &str) {
    PUBLISHED.with_borrow_mut(|p| p.push((topic.to_string(), payload.to_string())));
}

fn published() -> Vec<(String, String)> {
    PUBLISHED.with_borrow_mut(std::mem::take)
}

fn on_command(session: &Session, event: C2dEvent) {
    COMMANDS.set(COMMANDS.get() + 1);
    let command = event.command().unwrap().to_string();
    let status = if command.starts_with("fail") { CMD_FAILED } else { CMD_SUCCESS };
    if let Some(ack) = event.ack_id() {
        let ack = ack.to_string();
        event.destroy();
        session.send_cmd_ack(&ack, status, Some("done")).unwrap();
    }
    LAST_COMMAND.set(command);
}

fn on_ota(session: &Session, event: C2dEvent) {
    OTAS.set(OTAS.get() + 1);
    assert_eq!(event.ota_url_hostname(0).unwrap(), "fw.example.com");
    if let Some(ack) = event.ack_id() {
        session.send_ota_ack(ack, OTA_DOWNLOAD_DONE, None).unwrap();
    }
}

fn reset() {
    COMMANDS.set(0);
    OTAS.set(0);
    LAST_COMMAND.set(String::new());
    published();
}

fn session(events: EventHandlers, mqtt_send: Option<MqttSend>) -> Session {
    let mut session = Session::new();
    session
        .init(&ClientConfig {
            device: DeviceConfig {
                topology: DeviceTopology::AzureShared,
                duid: Some("pump"),
                cpid: Some("CPID"),
                cd: Some("XG4E"),
                host: Some("hub.azure-devices.net"),
            },
            events,
            mqtt_send,
            ..Default::default()
        })
        .unwrap();
    session
}

fn handlers() -> EventHandlers {
    EventHandlers {
        command: Some(on_command),
        ota: Some(on_ota),
    }
}

#[test]
fn test_command_dispatch_and_ack() {
    reset();
    let session = session(handlers(), Some(capture));

    session
        .receive(C2D_TOPIC, r#"{"v":"2.1","ct":0,"cmd":"set-led on","ack":"ack-1"}"#)
        .unwrap();

    assert_eq!(COMMANDS.get(), 1);
    assert_eq!(OTAS.get(), 0);
    assert_eq!(LAST_COMMAND.with_borrow(Clone::clone), "set-led on");

    let sent = published();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, ACK_TOPIC);
    let ack: Value = serde_json::from_str(&sent[0].1).unwrap();
    assert_eq!(ack, json!({"d": {"ack": "ack-1", "st": 7, "type": 0, "msg": "done"}}));
}

#[test]
fn test_failed_command_ack_status() {
    reset();
    let session = session(handlers(), Some(capture));
    session
        .process_event(r#"{"v":"2.1","ct":0,"cmd":"fail now","ack":"ack-2"}"#)
        .unwrap();

    let sent = published();
    let ack: Value = serde_json::from_str(&sent[0].1).unwrap();
    assert_eq!(ack["d"]["st"], json!(CMD_FAILED));
}

#[test]
fn test_command_without_ack_is_not_acknowledged() {
    reset();
    let session = session(handlers(), Some(capture));
    session
        .process_event(r#"{"v":"2.1","ct":0,"cmd":"blink"}"#)
        .unwrap();
    assert_eq!(COMMANDS.get(), 1);
    assert!(published().is_empty());
}

#[test]
fn test_ota_dispatch_and_ack() {
    reset();
    let session = session(handlers(), Some(capture));
    session
        .process_event(
            r#"{"v":"2.1","ct":1,"sw":"1.2.0","hw":"rev3","ack":"ota-1",
                "urls":[{"url":"https://fw.example.com/app.bin?sig=x","fileName":"app.bin"}]}"#,
        )
        .unwrap();

    assert_eq!(COMMANDS.get(), 0);
    assert_eq!(OTAS.get(), 1);
    let sent = published();
    assert_eq!(sent.len(), 1);
    let ack: Value = serde_json::from_str(&sent[0].1).unwrap();
    assert_eq!(ack, json!({"d": {"ack": "ota-1", "st": 3, "type": 1}}));
}

#[test]
fn test_unsupported_types_reach_no_handler() {
    reset();
    let session = session(handlers(), Some(capture));
    for ct in [2, 101, 106, 111, 999] {
        let payload = format!(r#"{{"v":"2.1","ct":{ct}}}"#);
        assert_eq!(session.process_event(&payload), Err(Error::ParsingError));
        assert!(!EventType::from_code(ct).is_actionable());
    }
    assert_eq!(session.process_event("not json"), Err(Error::ParsingError));
    assert_eq!(session.process_event(r#"{"ct":0,"cmd":"x"}"#), Err(Error::ParsingError));
    assert_eq!(COMMANDS.get(), 0);
    assert_eq!(OTAS.get(), 0);
}

#[test]
fn test_missing_handler_is_not_an_error() {
    reset();
    let session = session(EventHandlers::default(), None);
    session
        .process_event(r#"{"v":"2.1","ct":0,"cmd":"reboot","ack":"a"}"#)
        .unwrap();
    session
        .process_event(r#"{"v":"2.1","ct":1,"urls":[]}"#)
        .unwrap();
    assert_eq!(COMMANDS.get(), 0);
}

#[test]
fn test_other_protocol_version_is_still_dispatched() {
    reset();
    let session = session(handlers(), None);
    session
        .process_event(r#"{"v":"2.0","ct":0,"cmd":"legacy"}"#)
        .unwrap();
    assert_eq!(COMMANDS.get(), 1);
}

#[test]
fn test_receive_routing() {
    reset();
    let session = session(handlers(), Some(capture));

    assert_eq!(
        session.receive("devices/other/messages/devicebound/#", r#"{"v":"2.1","ct":0,"cmd":"x"}"#),
        Err(Error::Ignored)
    );
    assert_eq!(session.receive("", "{}"), Err(Error::Ignored));
    assert_eq!(
        session.receive(C2D_TOPIC, b"{\"v\":\"2.1\",\"ct\":0,\"cmd\":\"\x01\"}"),
        Err(Error::BadValue)
    );
    assert_eq!(session.receive("topic\u{7f}", "{}"), Err(Error::BadValue));
    assert_eq!(COMMANDS.get(), 0);

    session
        .receive_c2d(r#"{"v":"2.1","ct":0,"cmd":"direct"}"#)
        .unwrap();
    assert_eq!(COMMANDS.get(), 1);
}

#[test]
fn test_azure_delivery_topic_needs_receive_c2d() {
    reset();
    let session = session(handlers(), None);
    let payload = r#"{"v":"2.1","ct":0,"cmd":"azure"}"#;

    let delivery = "devices/CPID-pump/messages/devicebound/%24.to=%2Fdevices%2FCPID-pump";
    assert_eq!(session.receive(delivery, payload), Err(Error::Ignored));
    assert_eq!(COMMANDS.get(), 0);

    session.receive_c2d(payload).unwrap();
    assert_eq!(COMMANDS.get(), 1);
    assert_eq!(LAST_COMMAND.with_borrow(Clone::clone), "azure");
}

#[test]
fn test_printable_check_can_be_disabled() {
    reset();
    let mut session = Session::new();
    session
        .init(&ClientConfig {
            device: DeviceConfig {
                topology: DeviceTopology::AwsDedicated,
                duid: Some("pump"),
                ..Default::default()
            },
            events: handlers(),
            disable_printable_check: true,
            ..Default::default()
        })
        .unwrap();

    session
        .receive("iot/pump/cmd", "{\"v\":\"2.1\",\"ct\":0,\"cmd\":\"caf\u{e9}\"}")
        .unwrap();
    assert_eq!(COMMANDS.get(), 1);
    assert_eq!(LAST_COMMAND.with_borrow(Clone::clone), "caf\u{e9}");
}

#[test]
fn test_uninitialised_session() {
    reset();
    let mut session = session(handlers(), Some(capture));
    session.deinit();

    let payload = r#"{"v":"2.1","ct":0,"cmd":"x","ack":"a"}"#;
    assert_eq!(session.process_event(payload), Err(Error::ConfigMissing));
    assert_eq!(session.receive(C2D_TOPIC, payload), Err(Error::ConfigMissing));
    assert_eq!(session.send_cmd_ack("a", CMD_SUCCESS, None), Err(Error::ConfigMissing));
    assert_eq!(COMMANDS.get(), 0);
    assert!(published().is_empty());
}

#[test]
fn test_send_without_send_function() {
    reset();
    let session = session(EventHandlers::default(), None);
    assert_eq!(session.send_cmd_ack("a", CMD_SUCCESS, None), Err(Error::ConfigMissing));
    assert_eq!(session.send_cmd_ack("", CMD_SUCCESS, None), Err(Error::ConfigMissing));
}
