//! Mailbox-facing core: session primitives, subject normalization, text
//! extraction, the reply resolver and the sent-item enumerator.

pub mod extract;
pub mod query;
pub mod resolver;
pub mod sent;
pub mod session;
pub mod subject;
#[cfg(test)]
pub(crate) mod testkit;
pub mod types;
