use tokio_util::sync::CancellationToken;
use torq_db::{TorqDbAllOperations, activity::TorqDbActivityOperations};
use torq_lightning_rpc::proto::lnrpc;
use torq_types::prelude::{Invoice, InvoiceState};

use super::{from_unix_seconds, next_message};
use crate::{context::ServiceContext, errors::Result, events::TorqEvent, lifecycle::ServiceHandle};

/// Imports the invoices added since the last stored one, then follows invoice updates.
pub async fn run<Db>(ctx: &ServiceContext<Db>, handle: &ServiceHandle, cancel: &CancellationToken) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let node_id = handle.node_id();
    let client = ctx.lnd(node_id).await?;

    let (mut index_offset, _) = ctx.db.get_last_invoice_indexes(None, node_id).await?;
    let page_size = u64::from(ctx.cfg.import_page_size.max(1));
    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }
        let page = client
            .list_invoices(lnrpc::ListInvoiceRequest {
                pending_only: false,
                index_offset,
                num_max_invoices: page_size,
                reversed: false,
            })
            .await?;
        let count = page.invoices.len();
        for invoice in page.invoices {
            store_invoice(ctx, node_id, invoice).await?;
        }
        tracing::debug!(node_id, index_offset, count, "invoice page imported");

        if (count as u64) < page_size || page.last_index_offset <= index_offset {
            break;
        }
        index_offset = page.last_index_offset;
    }

    // the subscription replays everything added or settled after these indexes
    let (add_index, settle_index) = ctx.db.get_last_invoice_indexes(None, node_id).await?;
    let mut updates = client.subscribe_invoices(add_index, settle_index).await?;
    handle.active();

    while let Some(invoice) = next_message(cancel, &mut updates, "invoices").await? {
        store_invoice(ctx, node_id, invoice).await?;
    }
    Ok(())
}

async fn store_invoice<Db>(ctx: &ServiceContext<Db>, node_id: i64, invoice: lnrpc::Invoice) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let invoice = normalize(node_id, invoice)?;
    ctx.db.upsert_invoice(None, invoice.clone()).await?;
    ctx.bus.publish(TorqEvent::InvoiceUpdated(Box::new(invoice)));
    Ok(())
}

fn normalize(node_id: i64, invoice: lnrpc::Invoice) -> Result<Invoice> {
    Ok(Invoice {
        node_id,
        payment_hash: hex::encode(&invoice.r_hash),
        payment_request: invoice.payment_request,
        memo: invoice.memo,
        value_msat: invoice.value_msat,
        amount_paid_msat: invoice.amt_paid_msat,
        state: InvoiceState::try_from(invoice.state)?,
        creation_date: from_unix_seconds(invoice.creation_date),
        settle_date: from_unix_seconds(invoice.settle_date),
        add_index: invoice.add_index,
        settle_index: invoice.settle_index,
        expiry: invoice.expiry,
        private: invoice.private,
        is_keysend: invoice.is_keysend,
    })
}
