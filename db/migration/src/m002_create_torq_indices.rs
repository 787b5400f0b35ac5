use sea_orm_migration::prelude::*;

use crate::m001_create_torq_tables::{
    Channel, ChannelGroup, Corridor, Forward, HtlcEvent, Invoice, Node, NodeConnectionHistory, NodeEvent, Payment,
    RoutingPolicy, TaggedEntity, Tx,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

const INDICES: [&str; 14] = [
    "idx_node_public_key_chain_network",
    "idx_channel_funding_point",
    "idx_routing_policy_edge_ts",
    "idx_node_event_event_node",
    "idx_tagged_entity_tag_node",
    "idx_tagged_entity_tag_channel",
    "idx_corridor_type_reference",
    "idx_channel_group_channel",
    "idx_tx_node_hash",
    "idx_node_connection_history_peer",
    "idx_invoice_node_add_index",
    "idx_payment_node_payment_index",
    "idx_forward_node_time",
    "idx_htlc_event_node_time",
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name(INDICES[0])
                    .table(Node::Table)
                    .col(Node::PublicKey)
                    .col(Node::Chain)
                    .col(Node::Network)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name(INDICES[1])
                    .table(Channel::Table)
                    .col(Channel::FundingTransactionHash)
                    .col(Channel::FundingOutputIndex)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name(INDICES[2])
                    .table(RoutingPolicy::Table)
                    .col(RoutingPolicy::ChannelId)
                    .col(RoutingPolicy::AnnouncingNodeId)
                    .col(RoutingPolicy::ConnectingNodeId)
                    .col(RoutingPolicy::Ts)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name(INDICES[3])
                    .table(NodeEvent::Table)
                    .col(NodeEvent::EventNodeId)
                    .col(NodeEvent::NodeId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name(INDICES[4])
                    .table(TaggedEntity::Table)
                    .col(TaggedEntity::TagId)
                    .col(TaggedEntity::NodeId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name(INDICES[5])
                    .table(TaggedEntity::Table)
                    .col(TaggedEntity::TagId)
                    .col(TaggedEntity::ChannelId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name(INDICES[6])
                    .table(Corridor::Table)
                    .col(Corridor::CorridorTypeId)
                    .col(Corridor::ReferenceId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name(INDICES[7])
                    .table(ChannelGroup::Table)
                    .col(ChannelGroup::ChannelId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name(INDICES[8])
                    .table(Tx::Table)
                    .col(Tx::NodeId)
                    .col(Tx::TxHash)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name(INDICES[9])
                    .table(NodeConnectionHistory::Table)
                    .col(NodeConnectionHistory::NodeId)
                    .col(NodeConnectionHistory::PeerNodeId)
                    .col(NodeConnectionHistory::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name(INDICES[10])
                    .table(Invoice::Table)
                    .col(Invoice::NodeId)
                    .col(Invoice::AddIndex)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name(INDICES[11])
                    .table(Payment::Table)
                    .col(Payment::NodeId)
                    .col(Payment::PaymentIndex)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name(INDICES[12])
                    .table(Forward::Table)
                    .col(Forward::NodeId)
                    .col(Forward::TimeNs)
                    .col(Forward::AmountInMsat)
                    .col(Forward::AmountOutMsat)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name(INDICES[13])
                    .table(HtlcEvent::Table)
                    .col(HtlcEvent::NodeId)
                    .col(HtlcEvent::TimeNs)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in INDICES.iter().rev() {
            manager.drop_index(Index::drop().name(*name).to_owned()).await?;
        }
        Ok(())
    }
}
