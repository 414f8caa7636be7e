// # cfddns-core
//
// Core library for the cfddns dynamic DNS updater.
//
// ## Architecture Overview
//
// - **PublicIpResolver**: Trait for discovering the caller's public IP
// - **DnsRecordClient**: Trait for finding, reading and writing the managed record
// - **ReconcileEngine**: Fixed-interval loop comparing observed vs stored IP
// - **Settings / Credentials**: Settings file and the immutable values derived from it
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Loop logic is separate from HTTP clients
// 2. **Explicit Configuration**: Credentials are passed in, never read from globals
// 3. **Explicit Severity**: Errors say whether they end the process or only the cycle
// 4. **Library-First**: The loop can be driven and tested without a process exit

pub mod traits;
pub mod engine;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{DnsRecordClient, PublicIpResolver, RecordId, UpdateOutcome};
pub use engine::{CycleOutcome, EngineEvent, ReconcileEngine};
pub use config::{Credentials, EngineConfig, Settings, SettingsStatus};
pub use error::{Error, Result, Severity};
