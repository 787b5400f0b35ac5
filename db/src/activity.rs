//! Invoices, payments, forwards, HTLC events and on-chain transactions of managed nodes.
//!
//! Every importer resumes from a per-node high-water mark exposed here, so the
//! insert operations tolerate rows that were already imported.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set, sea_query::OnConflict,
};
use torq_db_entity::{
    conversions::to_db_int, forward, htlc_event, invoice, payment,
    prelude::{Forward, HtlcEvent, Invoice, Payment, Tx},
    tx as onchain_tx,
};
use torq_types::prelude::{
    Forward as ForwardEntry, HtlcEvent as HtlcEventEntry, Invoice as InvoiceEntry, Payment as PaymentEntry,
    PaymentStatus, Transaction,
};

use crate::{
    OptTx, TorqDbGeneralModelOperations,
    db::TorqDb,
    errors::{DbSqlError, Result},
};

/// Defines DB API for the activity imported by the ingestion pipelines.
#[async_trait]
pub trait TorqDbActivityOperations {
    /// Highest block height of a stored transaction of the node.
    async fn get_last_transaction_block_height<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Option<u32>>;

    /// Stores the transaction. Returns `false` if the node already has it.
    async fn insert_transaction<'a>(&'a self, tx: OptTx<'a>, transaction: Transaction) -> Result<bool>;

    async fn get_transactions<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Vec<Transaction>>;

    /// Highest stored add index and settle index of the node's invoices.
    async fn get_last_invoice_indexes<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<(u64, u64)>;

    /// Inserts the invoice or updates the stored invoice with the same add index.
    async fn upsert_invoice<'a>(&'a self, tx: OptTx<'a>, invoice: InvoiceEntry) -> Result<()>;

    async fn get_invoices<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Vec<InvoiceEntry>>;

    async fn get_last_payment_index<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<u64>;

    /// Inserts the payment or updates the stored payment with the same payment index.
    async fn upsert_payment<'a>(&'a self, tx: OptTx<'a>, payment: PaymentEntry) -> Result<()>;

    async fn get_payments<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Vec<PaymentEntry>>;

    async fn get_in_flight_payments<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Vec<PaymentEntry>>;

    /// Time in nanoseconds of the most recent stored forward of the node.
    async fn get_last_forward_time<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Option<i64>>;

    /// Stores the forwards, skipping the ones already stored. Returns the number of inserted rows.
    async fn insert_forwards<'a>(&'a self, tx: OptTx<'a>, forwards: Vec<ForwardEntry>) -> Result<u64>;

    async fn get_forwards<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Vec<ForwardEntry>>;

    async fn insert_htlc_event<'a>(&'a self, tx: OptTx<'a>, event: HtlcEventEntry) -> Result<()>;

    async fn get_htlc_events<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Vec<HtlcEventEntry>>;
}

fn invoice_model(invoice: &InvoiceEntry) -> Result<invoice::ActiveModel> {
    Ok(invoice::ActiveModel {
        node_id: Set(invoice.node_id),
        payment_hash: Set(invoice.payment_hash.clone()),
        payment_request: Set(invoice.payment_request.clone()),
        memo: Set(invoice.memo.clone()),
        value_msat: Set(invoice.value_msat),
        amount_paid_msat: Set(invoice.amount_paid_msat),
        state: Set(i32::from(invoice.state)),
        creation_date: Set(invoice.creation_date.unwrap_or_else(chrono::Utc::now)),
        settle_date: Set(invoice.settle_date),
        add_index: Set(to_db_int("add_index", invoice.add_index)?),
        settle_index: Set(to_db_int("settle_index", invoice.settle_index)?),
        expiry: Set(invoice.expiry),
        private: Set(invoice.private),
        is_keysend: Set(invoice.is_keysend),
        ..Default::default()
    })
}

fn payment_model(payment: &PaymentEntry) -> Result<payment::ActiveModel> {
    Ok(payment::ActiveModel {
        node_id: Set(payment.node_id),
        payment_hash: Set(payment.payment_hash.clone()),
        payment_index: Set(to_db_int("payment_index", payment.payment_index)?),
        value_msat: Set(payment.value_msat),
        fee_msat: Set(payment.fee_msat),
        status: Set(i32::from(payment.status)),
        failure_reason: Set(payment.failure_reason.clone()),
        creation_time: Set(payment.creation_time.unwrap_or_else(chrono::Utc::now)),
        payment_preimage: Set(payment.payment_preimage.clone()),
        payment_request: Set(payment.payment_request.clone()),
        htlc_attempts: Set(i32::try_from(payment.htlc_attempts)?),
        ..Default::default()
    })
}

fn forward_model(forward: &ForwardEntry) -> Result<forward::ActiveModel> {
    Ok(forward::ActiveModel {
        node_id: Set(forward.node_id),
        time_ns: Set(forward.time_ns),
        incoming_channel_id: Set(forward.incoming_channel_id),
        outgoing_channel_id: Set(forward.outgoing_channel_id),
        amount_in_msat: Set(to_db_int("amount_in_msat", forward.amount_in_msat)?),
        amount_out_msat: Set(to_db_int("amount_out_msat", forward.amount_out_msat)?),
        fee_msat: Set(to_db_int("fee_msat", forward.fee_msat)?),
        ..Default::default()
    })
}

fn htlc_event_model(event: &HtlcEventEntry) -> Result<htlc_event::ActiveModel> {
    let signed = |column, v: Option<u64>| v.map(|v| to_db_int(column, v)).transpose();
    let timelock = |v: Option<u32>| v.map(i32::try_from).transpose();

    Ok(htlc_event::ActiveModel {
        node_id: Set(event.node_id),
        time_ns: Set(event.time_ns),
        event_type: Set(i32::from(event.event_type)),
        kind: Set(i32::from(event.kind)),
        incoming_channel_id: Set(event.incoming_channel_id),
        outgoing_channel_id: Set(event.outgoing_channel_id),
        incoming_htlc_id: Set(signed("incoming_htlc_id", event.incoming_htlc_id)?),
        outgoing_htlc_id: Set(signed("outgoing_htlc_id", event.outgoing_htlc_id)?),
        incoming_amount_msat: Set(signed("incoming_amount_msat", event.incoming_amount_msat)?),
        outgoing_amount_msat: Set(signed("outgoing_amount_msat", event.outgoing_amount_msat)?),
        incoming_timelock: Set(timelock(event.incoming_timelock)?),
        outgoing_timelock: Set(timelock(event.outgoing_timelock)?),
        wire_failure: Set(event.wire_failure),
        failure_detail: Set(event.failure_detail),
        failure_string: Set(event.failure_string.clone()),
        settled: Set(event.settled),
        offchain: Set(event.offchain),
        ..Default::default()
    })
}

#[async_trait]
impl TorqDbActivityOperations for TorqDb {
    async fn get_last_transaction_block_height<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Option<u32>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let latest = Tx::find()
                        .filter(onchain_tx::Column::NodeId.eq(node_id))
                        .order_by_desc(onchain_tx::Column::BlockHeight)
                        .one(tx.as_ref())
                        .await?;
                    Ok::<_, DbSqlError>(latest.map(|m| u32::try_from(m.block_height)).transpose()?)
                })
            })
            .await
    }

    async fn insert_transaction<'a>(&'a self, tx: OptTx<'a>, transaction: Transaction) -> Result<bool> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let exists = Tx::find()
                        .filter(onchain_tx::Column::NodeId.eq(transaction.node_id))
                        .filter(onchain_tx::Column::TxHash.eq(transaction.tx_hash.as_str()))
                        .one(tx.as_ref())
                        .await?
                        .is_some();
                    if exists {
                        return Ok(false);
                    }

                    onchain_tx::ActiveModel {
                        node_id: Set(transaction.node_id),
                        tx_hash: Set(transaction.tx_hash.clone()),
                        timestamp: Set(transaction.timestamp.unwrap_or_else(chrono::Utc::now)),
                        amount: Set(transaction.amount),
                        total_fees: Set(transaction.total_fees),
                        num_confirmations: Set(transaction.num_confirmations),
                        block_height: Set(i32::try_from(transaction.block_height)?),
                        block_hash: Set(transaction.block_hash.clone()),
                        dest_addresses: Set(serde_json::to_string(&transaction.dest_addresses)?),
                        raw_tx_hex: Set(transaction.raw_tx_hex.clone()),
                        label: Set(transaction.label.clone()),
                        flags: Set(i32::try_from(transaction.flags.0)?),
                        ..Default::default()
                    }
                    .insert(tx.as_ref())
                    .await?;

                    Ok::<_, DbSqlError>(true)
                })
            })
            .await
    }

    async fn get_transactions<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Vec<Transaction>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    Tx::find()
                        .filter(onchain_tx::Column::NodeId.eq(node_id))
                        .order_by_asc(onchain_tx::Column::BlockHeight)
                        .order_by_asc(onchain_tx::Column::Id)
                        .all(tx.as_ref())
                        .await?
                        .into_iter()
                        .map(|m| Transaction::try_from(m).map_err(DbSqlError::from))
                        .collect::<Result<Vec<_>>>()
                })
            })
            .await
    }

    async fn get_last_invoice_indexes<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<(u64, u64)> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let by_add = Invoice::find()
                        .filter(invoice::Column::NodeId.eq(node_id))
                        .order_by_desc(invoice::Column::AddIndex)
                        .one(tx.as_ref())
                        .await?;
                    let by_settle = Invoice::find()
                        .filter(invoice::Column::NodeId.eq(node_id))
                        .order_by_desc(invoice::Column::SettleIndex)
                        .one(tx.as_ref())
                        .await?;

                    let add_index = by_add.map(|m| u64::try_from(m.add_index)).transpose()?.unwrap_or(0);
                    let settle_index = by_settle
                        .map(|m| u64::try_from(m.settle_index))
                        .transpose()?
                        .unwrap_or(0);
                    Ok::<_, DbSqlError>((add_index, settle_index))
                })
            })
            .await
    }

    async fn upsert_invoice<'a>(&'a self, tx: OptTx<'a>, invoice: InvoiceEntry) -> Result<()> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let existing = Invoice::find()
                        .filter(invoice::Column::NodeId.eq(invoice.node_id))
                        .filter(invoice::Column::AddIndex.eq(to_db_int("add_index", invoice.add_index)?))
                        .one(tx.as_ref())
                        .await?;

                    let model = invoice_model(&invoice)?;
                    match existing {
                        Some(existing) => {
                            let mut current = existing.into_active_model();
                            current.amount_paid_msat = model.amount_paid_msat.clone();
                            current.state = model.state.clone();
                            current.settle_date = model.settle_date.clone();
                            current.settle_index = model.settle_index.clone();
                            current.update(tx.as_ref()).await?;
                        }
                        None => {
                            model.insert(tx.as_ref()).await?;
                        }
                    }

                    Ok::<_, DbSqlError>(())
                })
            })
            .await
    }

    async fn get_invoices<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Vec<InvoiceEntry>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    Invoice::find()
                        .filter(invoice::Column::NodeId.eq(node_id))
                        .order_by_asc(invoice::Column::AddIndex)
                        .all(tx.as_ref())
                        .await?
                        .into_iter()
                        .map(|m| InvoiceEntry::try_from(m).map_err(DbSqlError::from))
                        .collect::<Result<Vec<_>>>()
                })
            })
            .await
    }

    async fn get_last_payment_index<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<u64> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let latest = Payment::find()
                        .filter(payment::Column::NodeId.eq(node_id))
                        .order_by_desc(payment::Column::PaymentIndex)
                        .one(tx.as_ref())
                        .await?;
                    Ok::<_, DbSqlError>(latest.map(|m| u64::try_from(m.payment_index)).transpose()?.unwrap_or(0))
                })
            })
            .await
    }

    async fn upsert_payment<'a>(&'a self, tx: OptTx<'a>, payment: PaymentEntry) -> Result<()> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let existing = Payment::find()
                        .filter(payment::Column::NodeId.eq(payment.node_id))
                        .filter(payment::Column::PaymentIndex.eq(to_db_int("payment_index", payment.payment_index)?))
                        .one(tx.as_ref())
                        .await?;

                    let model = payment_model(&payment)?;
                    match existing {
                        Some(existing) => {
                            let mut current = existing.into_active_model();
                            current.status = model.status.clone();
                            current.fee_msat = model.fee_msat.clone();
                            current.failure_reason = model.failure_reason.clone();
                            current.payment_preimage = model.payment_preimage.clone();
                            current.htlc_attempts = model.htlc_attempts.clone();
                            current.update(tx.as_ref()).await?;
                        }
                        None => {
                            model.insert(tx.as_ref()).await?;
                        }
                    }

                    Ok::<_, DbSqlError>(())
                })
            })
            .await
    }

    async fn get_payments<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Vec<PaymentEntry>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    Payment::find()
                        .filter(payment::Column::NodeId.eq(node_id))
                        .order_by_asc(payment::Column::PaymentIndex)
                        .all(tx.as_ref())
                        .await?
                        .into_iter()
                        .map(|m| PaymentEntry::try_from(m).map_err(DbSqlError::from))
                        .collect::<Result<Vec<_>>>()
                })
            })
            .await
    }

    async fn get_in_flight_payments<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Vec<PaymentEntry>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    Payment::find()
                        .filter(payment::Column::NodeId.eq(node_id))
                        .filter(payment::Column::Status.eq(i32::from(PaymentStatus::InFlight)))
                        .order_by_asc(payment::Column::PaymentIndex)
                        .all(tx.as_ref())
                        .await?
                        .into_iter()
                        .map(|m| PaymentEntry::try_from(m).map_err(DbSqlError::from))
                        .collect::<Result<Vec<_>>>()
                })
            })
            .await
    }

    async fn get_last_forward_time<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Option<i64>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    Ok::<_, DbSqlError>(
                        Forward::find()
                            .filter(forward::Column::NodeId.eq(node_id))
                            .order_by_desc(forward::Column::TimeNs)
                            .one(tx.as_ref())
                            .await?
                            .map(|m| m.time_ns),
                    )
                })
            })
            .await
    }

    async fn insert_forwards<'a>(&'a self, tx: OptTx<'a>, forwards: Vec<ForwardEntry>) -> Result<u64> {
        if forwards.is_empty() {
            return Ok(0);
        }
        let models = forwards.iter().map(forward_model).collect::<Result<Vec<_>>>()?;

        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let inserted = Forward::insert_many(models)
                        .on_conflict(
                            OnConflict::columns([
                                forward::Column::NodeId,
                                forward::Column::TimeNs,
                                forward::Column::AmountInMsat,
                                forward::Column::AmountOutMsat,
                            ])
                            .do_nothing()
                            .to_owned(),
                        )
                        .exec_without_returning(tx.as_ref())
                        .await?;
                    Ok::<_, DbSqlError>(inserted)
                })
            })
            .await
    }

    async fn get_forwards<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Vec<ForwardEntry>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    Forward::find()
                        .filter(forward::Column::NodeId.eq(node_id))
                        .order_by_asc(forward::Column::TimeNs)
                        .all(tx.as_ref())
                        .await?
                        .into_iter()
                        .map(|m| ForwardEntry::try_from(m).map_err(DbSqlError::from))
                        .collect::<Result<Vec<_>>>()
                })
            })
            .await
    }

    async fn insert_htlc_event<'a>(&'a self, tx: OptTx<'a>, event: HtlcEventEntry) -> Result<()> {
        let model = htlc_event_model(&event)?;
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    model.insert(tx.as_ref()).await?;
                    Ok::<_, DbSqlError>(())
                })
            })
            .await
    }

    async fn get_htlc_events<'a>(&'a self, tx: OptTx<'a>, node_id: i64) -> Result<Vec<HtlcEventEntry>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    HtlcEvent::find()
                        .filter(htlc_event::Column::NodeId.eq(node_id))
                        .order_by_asc(htlc_event::Column::TimeNs)
                        .order_by_asc(htlc_event::Column::Id)
                        .all(tx.as_ref())
                        .await?
                        .into_iter()
                        .map(|m| HtlcEventEntry::try_from(m).map_err(DbSqlError::from))
                        .collect::<Result<Vec<_>>>()
                })
            })
            .await
    }
}
