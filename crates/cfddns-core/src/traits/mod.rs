//! Core traits for the cfddns system
//!
//! - [`PublicIpResolver`]: discover the caller's current public IP
//! - [`DnsRecordClient`]: look up, read and write the managed DNS record

pub mod ip_resolver;
pub mod dns_record_client;

pub use ip_resolver::PublicIpResolver;
pub use dns_record_client::{DnsRecordClient, RecordId, UpdateOutcome};
