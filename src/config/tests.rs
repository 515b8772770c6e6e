use super::*;

fn device(topology: DeviceTopology) -> DeviceConfig<'static> {
    DeviceConfig {
        topology,
        duid: Some("duid"),
        cpid: Some("CPID"),
        cd: Some("XG4EOOO"),
        host: Some("poc-iotconnect-iothub-030-eu2.azure-devices.net"),
    }
}

fn client(device: DeviceConfig<'static>) -> ClientConfig<'static> {
    ClientConfig {
        device,
        ..Default::default()
    }
}

fn assert_pristine(session: &Session) {
    assert!(!session.is_valid());
    assert_eq!(session.topology(), DeviceTopology::Undefined);
    assert_eq!(session.topics(), &MqttTopicSet::default());
    assert!(session.time_source().is_none());
    assert!(session.mqtt_send().is_none());
    assert!(session.events().command.is_none());
    assert!(session.events().ota.is_none());
    assert!(!session.printable_check_disabled());
}

#[test]
fn undefined_topology_is_a_config_error() {
    let mut session = Session::new();
    let result = session.init(&client(device(DeviceTopology::Undefined)));
    assert_eq!(result, Err(Error::ConfigError));
    assert_pristine(&session);
}

#[test]
fn duid_is_required_unless_custom() {
    let mut session = Session::new();
    for topology in [
        DeviceTopology::AwsShared,
        DeviceTopology::AwsDedicated,
        DeviceTopology::AzureShared,
        DeviceTopology::AzureDedicated,
    ] {
        let mut d = device(topology);
        d.duid = None;
        assert_eq!(session.init(&client(d)), Err(Error::MissingValue));
        d.duid = Some("");
        assert_eq!(session.init(&client(d)), Err(Error::MissingValue));
        assert_pristine(&session);
    }

    let mut d = device(DeviceTopology::Custom);
    d.duid = None;
    assert!(session.init(&client(d)).is_ok());
}

#[test]
fn cpid_is_required_for_shared_only() {
    let mut session = Session::new();
    let mut d = device(DeviceTopology::AwsShared);
    d.cpid = None;
    assert_eq!(session.init(&client(d)), Err(Error::MissingValue));

    let mut d = device(DeviceTopology::AwsDedicated);
    d.cpid = None;
    assert!(session.init(&client(d)).is_ok());
    assert_eq!(session.topics().client_id.as_deref(), Some("duid"));
}

#[test]
fn cd_is_required_for_azure_only() {
    let mut session = Session::new();
    let mut d = device(DeviceTopology::AzureDedicated);
    d.cd = Some("");
    assert_eq!(session.init(&client(d)), Err(Error::MissingValue));

    let mut d = device(DeviceTopology::AwsShared);
    d.cd = None;
    assert!(session.init(&client(d)).is_ok());
    assert!(session.topics().cd.is_none());
}

#[test]
fn custom_topology_leaves_topics_empty() {
    fn now() -> u64 {
        1_720_000_000
    }

    let mut session = Session::new();
    let mut config = client(device(DeviceTopology::Custom));
    config.time_source = Some(now);
    config.disable_printable_check = true;
    session.init(&config).unwrap();

    assert!(session.is_valid());
    assert!(session.topics().is_empty());
    assert_eq!(session.time_source().map(|f| f()), Some(1_720_000_000));
    assert!(session.printable_check_disabled());
}

#[test]
fn azure_without_host_has_no_username() {
    let mut session = Session::new();
    let mut d = device(DeviceTopology::AzureDedicated);
    d.host = None;
    session.init(&client(d)).unwrap();

    let topics = session.topics();
    assert!(topics.username.is_none());
    assert!(topics.host.is_none());
    assert_eq!(topics.cd.as_deref(), Some("XG4EOOO"));
    assert_eq!(topics.version.as_deref(), Some("2.1"));
}

#[test]
fn reinit_replaces_previous_configuration() {
    let mut session = Session::new();
    session.init(&client(device(DeviceTopology::AzureShared))).unwrap();
    session.init(&client(device(DeviceTopology::AwsDedicated))).unwrap();

    let topics = session.topics();
    assert_eq!(session.topology(), DeviceTopology::AwsDedicated);
    assert!(topics.username.is_none());
    assert!(topics.host.is_none());
    assert!(topics.cd.is_none());
    assert_eq!(topics.report_topic.as_deref(), Some("$aws/rules/msg_d2c_rpt/duid/2.1/0"));
}

#[test]
fn failed_reinit_drops_previous_configuration() {
    let mut session = Session::new();
    session.init(&client(device(DeviceTopology::AwsShared))).unwrap();
    let mut d = device(DeviceTopology::AwsShared);
    d.cpid = None;
    assert!(session.init(&client(d)).is_err());
    assert_pristine(&session);
}

#[test]
fn deinit_is_idempotent() {
    let mut session = Session::new();
    session.deinit();
    session.deinit();
    assert_pristine(&session);
}

#[test]
fn topics_mut_requires_configuration() {
    let mut session = Session::new();
    assert_eq!(session.topics_mut().err(), Some(Error::ConfigMissing));

    session.init(&client(device(DeviceTopology::Custom))).unwrap();
    session.topics_mut().unwrap().c2d_topic = Some("custom/cmd".into());
    assert_eq!(session.topics().c2d_topic_len(), "custom/cmd".len());
    assert_eq!(session.topics().report_topic_len(), 0);
}

#[test]
fn iso_timestamp_now_uses_time_source() {
    fn now() -> u64 {
        1_717_245_296
    }

    let mut session = Session::new();
    assert_eq!(session.iso_timestamp_now(), Err(Error::ConfigMissing));

    session.init(&client(device(DeviceTopology::AwsDedicated))).unwrap();
    assert_eq!(session.iso_timestamp_now(), Err(Error::ConfigError));

    let mut config = client(device(DeviceTopology::AwsDedicated));
    config.time_source = Some(now);
    session.init(&config).unwrap();
    assert_eq!(
        session.iso_timestamp_now().unwrap().as_str(),
        "2024-06-01T12:34:56.000Z"
    );
}
