use torq_types::prelude::{
    Forward, HtlcEvent, HtlcEventKind, HtlcEventType, Invoice, InvoiceState, Payment, PaymentStatus, Transaction,
    TransactionFlags,
};

use super::to_unsigned;
use crate::{errors::DbEntityError, forward, htlc_event, invoice, payment, tx};

impl TryFrom<tx::Model> for Transaction {
    type Error = DbEntityError;

    fn try_from(value: tx::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            node_id: value.node_id,
            tx_hash: value.tx_hash,
            timestamp: Some(value.timestamp),
            amount: value.amount,
            total_fees: value.total_fees,
            num_confirmations: value.num_confirmations,
            block_height: to_unsigned("block_height", i64::from(value.block_height))?,
            block_hash: value.block_hash,
            dest_addresses: serde_json::from_str(&value.dest_addresses)?,
            raw_tx_hex: value.raw_tx_hex,
            label: value.label,
            flags: TransactionFlags(to_unsigned("flags", i64::from(value.flags))?),
        })
    }
}

impl TryFrom<invoice::Model> for Invoice {
    type Error = DbEntityError;

    fn try_from(value: invoice::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            node_id: value.node_id,
            payment_hash: value.payment_hash,
            payment_request: value.payment_request,
            memo: value.memo,
            value_msat: value.value_msat,
            amount_paid_msat: value.amount_paid_msat,
            state: InvoiceState::try_from(value.state)?,
            creation_date: Some(value.creation_date),
            settle_date: value.settle_date,
            add_index: to_unsigned("add_index", value.add_index)?,
            settle_index: to_unsigned("settle_index", value.settle_index)?,
            expiry: value.expiry,
            private: value.private,
            is_keysend: value.is_keysend,
        })
    }
}

impl TryFrom<payment::Model> for Payment {
    type Error = DbEntityError;

    fn try_from(value: payment::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            node_id: value.node_id,
            payment_hash: value.payment_hash,
            payment_index: to_unsigned("payment_index", value.payment_index)?,
            value_msat: value.value_msat,
            fee_msat: value.fee_msat,
            status: PaymentStatus::try_from(value.status)?,
            failure_reason: value.failure_reason,
            creation_time: Some(value.creation_time),
            payment_preimage: value.payment_preimage,
            payment_request: value.payment_request,
            htlc_attempts: to_unsigned("htlc_attempts", i64::from(value.htlc_attempts))?,
        })
    }
}

impl TryFrom<forward::Model> for Forward {
    type Error = DbEntityError;

    fn try_from(value: forward::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            node_id: value.node_id,
            time_ns: value.time_ns,
            incoming_channel_id: value.incoming_channel_id,
            outgoing_channel_id: value.outgoing_channel_id,
            amount_in_msat: to_unsigned("amount_in_msat", value.amount_in_msat)?,
            amount_out_msat: to_unsigned("amount_out_msat", value.amount_out_msat)?,
            fee_msat: to_unsigned("fee_msat", value.fee_msat)?,
        })
    }
}

impl TryFrom<htlc_event::Model> for HtlcEvent {
    type Error = DbEntityError;

    fn try_from(value: htlc_event::Model) -> Result<Self, Self::Error> {
        let unsigned = |column, v: Option<i64>| v.map(|v| to_unsigned::<u64>(column, v)).transpose();

        Ok(Self {
            node_id: value.node_id,
            time_ns: value.time_ns,
            event_type: HtlcEventType::try_from(value.event_type)?,
            kind: HtlcEventKind::try_from(value.kind)?,
            incoming_channel_id: value.incoming_channel_id,
            outgoing_channel_id: value.outgoing_channel_id,
            incoming_htlc_id: unsigned("incoming_htlc_id", value.incoming_htlc_id)?,
            outgoing_htlc_id: unsigned("outgoing_htlc_id", value.outgoing_htlc_id)?,
            incoming_amount_msat: unsigned("incoming_amount_msat", value.incoming_amount_msat)?,
            outgoing_amount_msat: unsigned("outgoing_amount_msat", value.outgoing_amount_msat)?,
            incoming_timelock: value
                .incoming_timelock
                .map(|v| to_unsigned("incoming_timelock", i64::from(v)))
                .transpose()?,
            outgoing_timelock: value
                .outgoing_timelock
                .map(|v| to_unsigned("outgoing_timelock", i64::from(v)))
                .transpose()?,
            wire_failure: value.wire_failure,
            failure_detail: value.failure_detail,
            failure_string: value.failure_string,
            settled: value.settled,
            offchain: value.offchain,
        })
    }
}
