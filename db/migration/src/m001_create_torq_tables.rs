use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

fn id_col<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .big_integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn created_on<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).timestamp_with_time_zone().not_null().to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Node::Table)
                    .if_not_exists()
                    .col(id_col(Node::NodeId))
                    .col(ColumnDef::new(Node::PublicKey).string_len(66).not_null())
                    .col(ColumnDef::new(Node::Chain).integer().not_null())
                    .col(ColumnDef::new(Node::Network).integer().not_null())
                    .col(created_on(Node::CreatedOn))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(NodeConnectionDetails::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NodeConnectionDetails::NodeId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(NodeConnectionDetails::Name).string().not_null())
                    .col(ColumnDef::new(NodeConnectionDetails::Implementation).integer().not_null())
                    .col(ColumnDef::new(NodeConnectionDetails::GrpcAddress).string().null())
                    .col(ColumnDef::new(NodeConnectionDetails::TlsData).binary().null())
                    .col(ColumnDef::new(NodeConnectionDetails::MacaroonData).binary().null())
                    .col(ColumnDef::new(NodeConnectionDetails::CertificateData).binary().null())
                    .col(ColumnDef::new(NodeConnectionDetails::KeyData).binary().null())
                    .col(ColumnDef::new(NodeConnectionDetails::StatusId).integer().not_null())
                    .col(
                        ColumnDef::new(NodeConnectionDetails::PingSystem)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(created_on(NodeConnectionDetails::CreatedOn))
                    .col(created_on(NodeConnectionDetails::UpdatedOn))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_node_connection_details_node_id")
                            .from(NodeConnectionDetails::Table, NodeConnectionDetails::NodeId)
                            .to(Node::Table, Node::NodeId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Channel::Table)
                    .if_not_exists()
                    .col(id_col(Channel::ChannelId))
                    .col(ColumnDef::new(Channel::ShortChannelId).string().null().unique_key())
                    .col(ColumnDef::new(Channel::LndShortChannelId).big_integer().null())
                    .col(ColumnDef::new(Channel::FundingTransactionHash).string_len(64).not_null())
                    .col(ColumnDef::new(Channel::FundingOutputIndex).integer().not_null())
                    .col(ColumnDef::new(Channel::ClosingTransactionHash).string_len(64).null())
                    .col(ColumnDef::new(Channel::Capacity).big_integer().not_null())
                    .col(ColumnDef::new(Channel::Private).boolean().not_null().default(false))
                    .col(ColumnDef::new(Channel::FirstNodeId).big_integer().not_null())
                    .col(ColumnDef::new(Channel::SecondNodeId).big_integer().not_null())
                    .col(ColumnDef::new(Channel::InitiatingNodeId).big_integer().null())
                    .col(ColumnDef::new(Channel::AcceptingNodeId).big_integer().null())
                    .col(ColumnDef::new(Channel::ClosingNodeId).big_integer().null())
                    .col(ColumnDef::new(Channel::StatusId).integer().not_null())
                    .col(ColumnDef::new(Channel::FundingBlockHeight).integer().null())
                    .col(ColumnDef::new(Channel::FundedOn).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Channel::ClosingBlockHeight).integer().null())
                    .col(ColumnDef::new(Channel::ClosedOn).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Channel::Flags).integer().not_null().default(0))
                    .col(created_on(Channel::CreatedOn))
                    .col(created_on(Channel::UpdatedOn))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_channel_first_node_id")
                            .from(Channel::Table, Channel::FirstNodeId)
                            .to(Node::Table, Node::NodeId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_channel_second_node_id")
                            .from(Channel::Table, Channel::SecondNodeId)
                            .to(Node::Table, Node::NodeId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RoutingPolicy::Table)
                    .if_not_exists()
                    .col(id_col(RoutingPolicy::Id))
                    .col(created_on(RoutingPolicy::Ts))
                    .col(ColumnDef::new(RoutingPolicy::ChannelId).big_integer().not_null())
                    .col(ColumnDef::new(RoutingPolicy::AnnouncingNodeId).big_integer().not_null())
                    .col(ColumnDef::new(RoutingPolicy::ConnectingNodeId).big_integer().not_null())
                    .col(ColumnDef::new(RoutingPolicy::NodeId).big_integer().not_null())
                    .col(ColumnDef::new(RoutingPolicy::Disabled).boolean().not_null())
                    .col(ColumnDef::new(RoutingPolicy::TimeLockDelta).integer().not_null())
                    .col(ColumnDef::new(RoutingPolicy::MinHtlcMsat).big_integer().not_null())
                    .col(ColumnDef::new(RoutingPolicy::MaxHtlcMsat).big_integer().not_null())
                    .col(ColumnDef::new(RoutingPolicy::FeeBaseMsat).big_integer().not_null())
                    .col(ColumnDef::new(RoutingPolicy::FeeRateMilliMsat).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_routing_policy_channel_id")
                            .from(RoutingPolicy::Table, RoutingPolicy::ChannelId)
                            .to(Channel::Table, Channel::ChannelId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(NodeEvent::Table)
                    .if_not_exists()
                    .col(id_col(NodeEvent::Id))
                    .col(created_on(NodeEvent::Timestamp))
                    .col(ColumnDef::new(NodeEvent::EventNodeId).big_integer().not_null())
                    .col(ColumnDef::new(NodeEvent::NodeId).big_integer().not_null())
                    .col(ColumnDef::new(NodeEvent::Alias).string().not_null())
                    .col(ColumnDef::new(NodeEvent::Color).string().not_null())
                    .col(ColumnDef::new(NodeEvent::NodeAddresses).text().not_null())
                    .col(ColumnDef::new(NodeEvent::Features).text().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Category::Table)
                    .if_not_exists()
                    .col(id_col(Category::CategoryId))
                    .col(ColumnDef::new(Category::Name).string().not_null().unique_key())
                    .col(ColumnDef::new(Category::Style).string().not_null())
                    .col(created_on(Category::CreatedOn))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Tag::Table)
                    .if_not_exists()
                    .col(id_col(Tag::TagId))
                    .col(ColumnDef::new(Tag::Name).string().not_null().unique_key())
                    .col(ColumnDef::new(Tag::Style).string().not_null())
                    .col(ColumnDef::new(Tag::CategoryId).big_integer().null())
                    .col(created_on(Tag::CreatedOn))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tag_category_id")
                            .from(Tag::Table, Tag::CategoryId)
                            .to(Category::Table, Category::CategoryId)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TaggedEntity::Table)
                    .if_not_exists()
                    .col(id_col(TaggedEntity::Id))
                    .col(ColumnDef::new(TaggedEntity::TagId).big_integer().not_null())
                    .col(ColumnDef::new(TaggedEntity::NodeId).big_integer().null())
                    .col(ColumnDef::new(TaggedEntity::ChannelId).big_integer().null())
                    .col(created_on(TaggedEntity::CreatedOn))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tagged_entity_tag_id")
                            .from(TaggedEntity::Table, TaggedEntity::TagId)
                            .to(Tag::Table, Tag::TagId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Corridor::Table)
                    .if_not_exists()
                    .col(id_col(Corridor::CorridorId))
                    .col(ColumnDef::new(Corridor::CorridorTypeId).integer().not_null())
                    .col(ColumnDef::new(Corridor::ReferenceId).big_integer().not_null())
                    .col(ColumnDef::new(Corridor::Flag).integer().not_null())
                    .col(ColumnDef::new(Corridor::Inverse).boolean().not_null().default(false))
                    .col(ColumnDef::new(Corridor::Priority).integer().not_null())
                    .col(ColumnDef::new(Corridor::FromTagId).big_integer().null())
                    .col(ColumnDef::new(Corridor::FromNodeId).big_integer().null())
                    .col(ColumnDef::new(Corridor::ToTagId).big_integer().null())
                    .col(ColumnDef::new(Corridor::ToNodeId).big_integer().null())
                    .col(ColumnDef::new(Corridor::ChannelId).big_integer().null())
                    .col(created_on(Corridor::CreatedOn))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChannelGroup::Table)
                    .if_not_exists()
                    .col(id_col(ChannelGroup::Id))
                    .col(ColumnDef::new(ChannelGroup::ChannelId).big_integer().not_null())
                    .col(ColumnDef::new(ChannelGroup::CategoryId).big_integer().null())
                    .col(ColumnDef::new(ChannelGroup::TagId).big_integer().null())
                    .col(ColumnDef::new(ChannelGroup::OriginId).integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Tx::Table)
                    .if_not_exists()
                    .col(id_col(Tx::Id))
                    .col(ColumnDef::new(Tx::NodeId).big_integer().not_null())
                    .col(ColumnDef::new(Tx::TxHash).string_len(64).not_null())
                    .col(created_on(Tx::Timestamp))
                    .col(ColumnDef::new(Tx::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Tx::TotalFees).big_integer().not_null())
                    .col(ColumnDef::new(Tx::NumConfirmations).integer().not_null())
                    .col(ColumnDef::new(Tx::BlockHeight).integer().not_null())
                    .col(ColumnDef::new(Tx::BlockHash).string().null())
                    .col(ColumnDef::new(Tx::DestAddresses).text().not_null())
                    .col(ColumnDef::new(Tx::RawTxHex).text().null())
                    .col(ColumnDef::new(Tx::Label).string().null())
                    .col(ColumnDef::new(Tx::Flags).integer().not_null().default(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(NodeConnectionHistory::Table)
                    .if_not_exists()
                    .col(id_col(NodeConnectionHistory::Id))
                    .col(ColumnDef::new(NodeConnectionHistory::NodeId).big_integer().not_null())
                    .col(ColumnDef::new(NodeConnectionHistory::PeerNodeId).big_integer().not_null())
                    .col(created_on(NodeConnectionHistory::Timestamp))
                    .col(ColumnDef::new(NodeConnectionHistory::Address).string().null())
                    .col(ColumnDef::new(NodeConnectionHistory::Setting).integer().not_null())
                    .col(ColumnDef::new(NodeConnectionHistory::ConnectionStatus).integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Settings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Settings::Id).big_integer().not_null().primary_key())
                    .col(ColumnDef::new(Settings::TorqUuid).string_len(36).not_null())
                    .col(ColumnDef::new(Settings::PreferredTimezone).string().not_null())
                    .col(ColumnDef::new(Settings::DefaultDateRange).string().not_null())
                    .col(ColumnDef::new(Settings::DefaultLanguage).string().not_null())
                    .col(ColumnDef::new(Settings::WeekStartsOn).string().not_null())
                    .col(ColumnDef::new(Settings::VectorUrl).string().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Invoice::Table)
                    .if_not_exists()
                    .col(id_col(Invoice::Id))
                    .col(ColumnDef::new(Invoice::NodeId).big_integer().not_null())
                    .col(ColumnDef::new(Invoice::PaymentHash).string_len(64).not_null())
                    .col(ColumnDef::new(Invoice::PaymentRequest).text().not_null())
                    .col(ColumnDef::new(Invoice::Memo).text().not_null())
                    .col(ColumnDef::new(Invoice::ValueMsat).big_integer().not_null())
                    .col(ColumnDef::new(Invoice::AmountPaidMsat).big_integer().not_null())
                    .col(ColumnDef::new(Invoice::State).integer().not_null())
                    .col(created_on(Invoice::CreationDate))
                    .col(ColumnDef::new(Invoice::SettleDate).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Invoice::AddIndex).big_integer().not_null())
                    .col(ColumnDef::new(Invoice::SettleIndex).big_integer().not_null())
                    .col(ColumnDef::new(Invoice::Expiry).big_integer().not_null())
                    .col(ColumnDef::new(Invoice::Private).boolean().not_null())
                    .col(ColumnDef::new(Invoice::IsKeysend).boolean().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Payment::Table)
                    .if_not_exists()
                    .col(id_col(Payment::Id))
                    .col(ColumnDef::new(Payment::NodeId).big_integer().not_null())
                    .col(ColumnDef::new(Payment::PaymentHash).string_len(64).not_null())
                    .col(ColumnDef::new(Payment::PaymentIndex).big_integer().not_null())
                    .col(ColumnDef::new(Payment::ValueMsat).big_integer().not_null())
                    .col(ColumnDef::new(Payment::FeeMsat).big_integer().not_null())
                    .col(ColumnDef::new(Payment::Status).integer().not_null())
                    .col(ColumnDef::new(Payment::FailureReason).string().null())
                    .col(created_on(Payment::CreationTime))
                    .col(ColumnDef::new(Payment::PaymentPreimage).string_len(64).null())
                    .col(ColumnDef::new(Payment::PaymentRequest).text().null())
                    .col(ColumnDef::new(Payment::HtlcAttempts).integer().not_null().default(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Forward::Table)
                    .if_not_exists()
                    .col(id_col(Forward::Id))
                    .col(ColumnDef::new(Forward::NodeId).big_integer().not_null())
                    .col(ColumnDef::new(Forward::TimeNs).big_integer().not_null())
                    .col(ColumnDef::new(Forward::IncomingChannelId).big_integer().null())
                    .col(ColumnDef::new(Forward::OutgoingChannelId).big_integer().null())
                    .col(ColumnDef::new(Forward::AmountInMsat).big_integer().not_null())
                    .col(ColumnDef::new(Forward::AmountOutMsat).big_integer().not_null())
                    .col(ColumnDef::new(Forward::FeeMsat).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(HtlcEvent::Table)
                    .if_not_exists()
                    .col(id_col(HtlcEvent::Id))
                    .col(ColumnDef::new(HtlcEvent::NodeId).big_integer().not_null())
                    .col(ColumnDef::new(HtlcEvent::TimeNs).big_integer().not_null())
                    .col(ColumnDef::new(HtlcEvent::EventType).integer().not_null())
                    .col(ColumnDef::new(HtlcEvent::Kind).integer().not_null())
                    .col(ColumnDef::new(HtlcEvent::IncomingChannelId).big_integer().null())
                    .col(ColumnDef::new(HtlcEvent::OutgoingChannelId).big_integer().null())
                    .col(ColumnDef::new(HtlcEvent::IncomingHtlcId).big_integer().null())
                    .col(ColumnDef::new(HtlcEvent::OutgoingHtlcId).big_integer().null())
                    .col(ColumnDef::new(HtlcEvent::IncomingAmountMsat).big_integer().null())
                    .col(ColumnDef::new(HtlcEvent::OutgoingAmountMsat).big_integer().null())
                    .col(ColumnDef::new(HtlcEvent::IncomingTimelock).integer().null())
                    .col(ColumnDef::new(HtlcEvent::OutgoingTimelock).integer().null())
                    .col(ColumnDef::new(HtlcEvent::WireFailure).integer().null())
                    .col(ColumnDef::new(HtlcEvent::FailureDetail).integer().null())
                    .col(ColumnDef::new(HtlcEvent::FailureString).string().null())
                    .col(ColumnDef::new(HtlcEvent::Settled).boolean().null())
                    .col(ColumnDef::new(HtlcEvent::Offchain).boolean().null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(HtlcEvent::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Forward::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Payment::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Invoice::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Settings::Table).to_owned()).await?;
        manager
            .drop_table(Table::drop().table(NodeConnectionHistory::Table).to_owned())
            .await?;
        manager.drop_table(Table::drop().table(Tx::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(ChannelGroup::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Corridor::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(TaggedEntity::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Tag::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Category::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(NodeEvent::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(RoutingPolicy::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Channel::Table).to_owned()).await?;
        manager
            .drop_table(Table::drop().table(NodeConnectionDetails::Table).to_owned())
            .await?;
        manager.drop_table(Table::drop().table(Node::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Node {
    Table,
    NodeId,
    PublicKey,
    Chain,
    Network,
    CreatedOn,
}

#[derive(DeriveIden)]
enum NodeConnectionDetails {
    Table,
    NodeId,
    Name,
    Implementation,
    GrpcAddress,
    TlsData,
    MacaroonData,
    CertificateData,
    KeyData,
    StatusId,
    PingSystem,
    CreatedOn,
    UpdatedOn,
}

#[derive(DeriveIden)]
pub(crate) enum Channel {
    Table,
    ChannelId,
    ShortChannelId,
    LndShortChannelId,
    FundingTransactionHash,
    FundingOutputIndex,
    ClosingTransactionHash,
    Capacity,
    Private,
    FirstNodeId,
    SecondNodeId,
    InitiatingNodeId,
    AcceptingNodeId,
    ClosingNodeId,
    StatusId,
    FundingBlockHeight,
    FundedOn,
    ClosingBlockHeight,
    ClosedOn,
    Flags,
    CreatedOn,
    UpdatedOn,
}

#[derive(DeriveIden)]
pub(crate) enum RoutingPolicy {
    Table,
    Id,
    Ts,
    ChannelId,
    AnnouncingNodeId,
    ConnectingNodeId,
    NodeId,
    Disabled,
    TimeLockDelta,
    MinHtlcMsat,
    MaxHtlcMsat,
    FeeBaseMsat,
    FeeRateMilliMsat,
}

#[derive(DeriveIden)]
pub(crate) enum NodeEvent {
    Table,
    Id,
    Timestamp,
    EventNodeId,
    NodeId,
    Alias,
    Color,
    NodeAddresses,
    Features,
}

#[derive(DeriveIden)]
enum Category {
    Table,
    CategoryId,
    Name,
    Style,
    CreatedOn,
}

#[derive(DeriveIden)]
enum Tag {
    Table,
    TagId,
    Name,
    Style,
    CategoryId,
    CreatedOn,
}

#[derive(DeriveIden)]
pub(crate) enum TaggedEntity {
    Table,
    Id,
    TagId,
    NodeId,
    ChannelId,
    CreatedOn,
}

#[derive(DeriveIden)]
pub(crate) enum Corridor {
    Table,
    CorridorId,
    CorridorTypeId,
    ReferenceId,
    Flag,
    Inverse,
    Priority,
    FromTagId,
    FromNodeId,
    ToTagId,
    ToNodeId,
    ChannelId,
    CreatedOn,
}

#[derive(DeriveIden)]
pub(crate) enum ChannelGroup {
    Table,
    Id,
    ChannelId,
    CategoryId,
    TagId,
    OriginId,
}

#[derive(DeriveIden)]
pub(crate) enum Tx {
    Table,
    Id,
    NodeId,
    TxHash,
    Timestamp,
    Amount,
    TotalFees,
    NumConfirmations,
    BlockHeight,
    BlockHash,
    DestAddresses,
    RawTxHex,
    Label,
    Flags,
}

#[derive(DeriveIden)]
pub(crate) enum NodeConnectionHistory {
    Table,
    Id,
    NodeId,
    PeerNodeId,
    Timestamp,
    Address,
    Setting,
    ConnectionStatus,
}

#[derive(DeriveIden)]
enum Settings {
    Table,
    Id,
    TorqUuid,
    PreferredTimezone,
    DefaultDateRange,
    DefaultLanguage,
    WeekStartsOn,
    VectorUrl,
}

#[derive(DeriveIden)]
pub(crate) enum Invoice {
    Table,
    Id,
    NodeId,
    PaymentHash,
    PaymentRequest,
    Memo,
    ValueMsat,
    AmountPaidMsat,
    State,
    CreationDate,
    SettleDate,
    AddIndex,
    SettleIndex,
    Expiry,
    Private,
    IsKeysend,
}

#[derive(DeriveIden)]
pub(crate) enum Payment {
    Table,
    Id,
    NodeId,
    PaymentHash,
    PaymentIndex,
    ValueMsat,
    FeeMsat,
    Status,
    FailureReason,
    CreationTime,
    PaymentPreimage,
    PaymentRequest,
    HtlcAttempts,
}

#[derive(DeriveIden)]
pub(crate) enum Forward {
    Table,
    Id,
    NodeId,
    TimeNs,
    IncomingChannelId,
    OutgoingChannelId,
    AmountInMsat,
    AmountOutMsat,
    FeeMsat,
}

#[derive(DeriveIden)]
pub(crate) enum HtlcEvent {
    Table,
    Id,
    NodeId,
    TimeNs,
    EventType,
    Kind,
    IncomingChannelId,
    OutgoingChannelId,
    IncomingHtlcId,
    OutgoingHtlcId,
    IncomingAmountMsat,
    OutgoingAmountMsat,
    IncomingTimelock,
    OutgoingTimelock,
    WireFailure,
    FailureDetail,
    FailureString,
    Settled,
    Offchain,
}
