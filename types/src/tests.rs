use std::str::FromStr;

use rstest::rstest;

use crate::prelude::*;

const FUNDING_TX: &str = "ab00000000000000000000000000000000000000000000000000000000000001";

#[rstest]
#[case(0)]
#[case(1)]
#[case(4_294_967_295)]
fn channel_point_round_trips_through_text(#[case] output_index: u32) -> anyhow::Result<()> {
    let point = ChannelPoint::new(FUNDING_TX, output_index);
    let parsed = ChannelPoint::from_str(&point.to_string())?;

    assert_eq!(point, parsed);
    Ok(())
}

#[rstest]
#[case("")]
#[case("abcd")]
#[case("ab00:0")]
#[case("zz00000000000000000000000000000000000000000000000000000000000001:0")]
#[case("ab00000000000000000000000000000000000000000000000000000000000001:x")]
#[case("ab00000000000000000000000000000000000000000000000000000000000001:-1")]
fn channel_point_rejects_malformed_input(#[case] input: &str) {
    assert!(matches!(
        ChannelPoint::from_str(input),
        Err(TypesError::InvalidChannelPoint(_))
    ));
}

#[rstest]
#[case(700_000, 1, 0, "700000x1x0")]
#[case(0, 0, 0, "0x0x0")]
#[case(16_777_215, 16_777_215, 65_535, "16777215x16777215x65535")]
fn lnd_short_channel_id_formats_and_parses_back(
    #[case] block_height: u32,
    #[case] tx_index: u32,
    #[case] output_index: u16,
    #[case] expected: &str,
) -> anyhow::Result<()> {
    let lnd = (u64::from(block_height) << 40) | (u64::from(tx_index) << 16) | u64::from(output_index);

    let scid = ShortChannelId::from_lnd(lnd);
    assert_eq!(scid.to_string(), expected);

    let parsed = ShortChannelId::from_str(expected)?;
    assert_eq!(parsed.to_lnd(), lnd);
    Ok(())
}

#[test]
fn short_channel_id_accepts_cln_separator() -> anyhow::Result<()> {
    assert_eq!(
        ShortChannelId::from_str("700000:1:0")?,
        ShortChannelId::from_str("700000x1x0")?
    );
    Ok(())
}

#[rstest]
#[case("700000x1")]
#[case("700000x1x0x0")]
#[case("ax1x0")]
#[case("700000x1x65536")]
#[case("16777216x0x0")]
fn short_channel_id_rejects_malformed_input(#[case] input: &str) {
    assert!(ShortChannelId::from_str(input).is_err());
}

#[test]
fn channel_status_never_moves_backwards() {
    use ChannelStatus::*;

    assert!(Opening.can_transition_to(Open));
    assert!(Open.can_transition_to(Closing));
    assert!(Closing.can_transition_to(CooperativeClosed));
    assert!(Opening.can_transition_to(RemoteForceClosed));
    assert!(Open.can_transition_to(Open));

    assert!(!Open.can_transition_to(Opening));
    assert!(!Closing.can_transition_to(Open));
    assert!(!CooperativeClosed.can_transition_to(Open));
    assert!(!CooperativeClosed.can_transition_to(LocalForceClosed));
}

#[rstest]
#[case(ChannelStatus::Opening, 0)]
#[case(ChannelStatus::Open, 1)]
#[case(ChannelStatus::Closing, 2)]
#[case(ChannelStatus::CooperativeClosed, 100)]
#[case(ChannelStatus::AbandonedClosed, 105)]
fn channel_status_persisted_values(#[case] status: ChannelStatus, #[case] value: i32) -> anyhow::Result<()> {
    assert_eq!(i32::from(status), value);
    assert_eq!(ChannelStatus::try_from(value)?, status);
    Ok(())
}

#[test]
fn unknown_persisted_value_is_an_error() {
    assert_eq!(
        NodeStatus::try_from(2),
        Err(TypesError::UnknownEnumValue {
            kind: "NodeStatus",
            value: 2
        })
    );
}

#[test]
fn channel_flags_add_and_remove() {
    let mut flags = ChannelFlags::default();
    flags.add(ChannelFlags::FUNDED_ON);
    flags.add(ChannelFlags::CLOSED_ON);
    assert_eq!(flags.0, 3);

    flags.remove(ChannelFlags::FUNDED_ON);
    assert!(!flags.contains(ChannelFlags::FUNDED_ON));
    assert!(flags.contains(ChannelFlags::CLOSED_ON));
}

#[test]
fn channel_with_identical_endpoints_is_rejected() {
    let channel = Channel {
        first_node_id: 4,
        second_node_id: 4,
        ..Default::default()
    };

    assert_eq!(channel.validate_endpoints(), Err(TypesError::SameChannelEndpoints(4)));
}

#[test]
fn corridor_priority_bits() {
    let key = CorridorKey::new(CorridorType::Tag, 5).from_node(1).channel(1);
    assert_eq!(key.discriminators.priority(), priority::FROM_NODE | priority::CHANNEL);

    let all = CorridorKey::new(CorridorType::Tag, 5)
        .from_tag(1)
        .from_node(1)
        .to_tag(1)
        .to_node(1)
        .channel(1);
    assert_eq!(all.discriminators.priority(), 31);
}

#[test]
fn discriminators_compare_only_bucket_fields() {
    let rule = CorridorDiscriminators {
        from_node_id: Some(1),
        ..Default::default()
    };
    let query = CorridorKey::new(CorridorType::Tag, 5).from_node(1).channel(9).discriminators;

    assert!(rule.matches_within(&query, priority::FROM_NODE));
    assert!(!rule.matches_within(&query, priority::FROM_NODE | priority::CHANNEL));
}

#[rstest]
#[case("mainnet", Network::MainNet)]
#[case("bitcoin", Network::MainNet)]
#[case("testnet", Network::TestNet)]
#[case("regtest", Network::RegTest)]
#[case("SigNet", Network::SigNet)]
fn network_names(#[case] input: &str, #[case] expected: Network) -> anyhow::Result<()> {
    assert_eq!(Network::from_str(input)?, expected);
    Ok(())
}

#[test]
fn channel_state_balance_bound() {
    let mut state = ChannelState {
        capacity: 1_000_000,
        local_balance: 600_000,
        remote_balance: 390_000,
        unsettled_balance: 10_000,
        ..Default::default()
    };
    assert!(state.balances_within_capacity());

    state.unsettled_balance = 10_001;
    assert!(!state.balances_within_capacity());
}

#[test]
fn service_dependencies() {
    assert_eq!(
        ServiceType::LndGraphEvents.dependency(),
        Some(ServiceType::LndChannelEvents)
    );
    assert_eq!(ServiceType::ClnNodes.dependency(), Some(ServiceType::ClnChannels));
    assert_eq!(ServiceType::LndInvoices.dependency(), None);
    assert_eq!(ServiceType::for_implementation(Implementation::Cln).len(), 5);
}

#[test]
fn node_settings_serialize_as_json() -> anyhow::Result<()> {
    let settings = NodeSettings {
        node_id: 3,
        public_key: "02aa".into(),
        torq_node: true,
        ..Default::default()
    };

    let json = serde_json::to_value(&settings)?;
    assert_eq!(json["node_id"], 3);
    assert_eq!(json["torq_node"], true);
    Ok(())
}

#[test]
fn connection_details_credentials_ignore_name_and_status() {
    let details = NodeConnectionDetails {
        node_id: 1,
        name: "alice".into(),
        implementation: Implementation::Lnd,
        grpc_address: Some("localhost:10009".into()),
        macaroon_data: Some(vec![1, 2, 3]),
        status: NodeStatus::Active,
        ..Default::default()
    };

    let renamed = NodeConnectionDetails {
        name: "alice-2".into(),
        status: NodeStatus::Inactive,
        ..details.clone()
    };
    assert!(!details.credentials_differ(&renamed));

    let new_macaroon = NodeConnectionDetails {
        macaroon_data: Some(vec![4]),
        ..details.clone()
    };
    assert!(details.credentials_differ(&new_macaroon));
}
