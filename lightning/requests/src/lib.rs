//! Request router of the operator actions issued against the managed Lightning nodes.
//!
//! Requests are submitted through the cloneable [`router::LightningRequests`] handle and executed
//! by the [`router::LightningRequestRouter`], which bounds the concurrency per node and answers
//! every request with a [`messages::Response`], `Inactive` when the request was refused, failed
//! or did not complete in time.
//!
//! Node implementation differences are hidden behind [`backend::LightningBackend`].

pub mod backend;
pub mod cln;
pub mod errors;
pub mod lnd;
pub mod messages;
pub mod peers;
pub mod policy;
pub mod router;

pub use router::{LightningRequestRouter, LightningRequests, RouterConfig};
