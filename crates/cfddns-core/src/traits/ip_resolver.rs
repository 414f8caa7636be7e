// # Public IP Resolver Trait
//
// Defines how the engine learns the caller's current public address.
//
// ## Implementations
//
// - HTTP IP-echo service: `cfddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::PublicIpResolver;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* PublicIpResolver implementation */;
//     let observed = resolver.current_public_ip().await?;
//     println!("public IP: {}", observed);
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Trait for public IP resolver implementations
///
/// # Contract
///
/// - One outbound request per call, no retry, no caching
/// - The address is returned in the textual form the service reported; the
///   engine compares it to the stored record content by exact string equality
/// - Any network, status or parse failure is returned as
///   [`Error::IpResolver`](crate::Error::IpResolver), which the engine treats
///   as recoverable for the current cycle
#[async_trait]
pub trait PublicIpResolver: Send + Sync {
    /// Fetch the caller's current public IP address
    async fn current_public_ip(&self) -> Result<String, crate::Error>;

    /// Resolver name (for logging/debugging)
    fn resolver_name(&self) -> &'static str;
}
