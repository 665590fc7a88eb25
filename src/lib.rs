//! # Zeta4G HA
//!
//! A client-side high-availability router for primary/replica graph database
//! clusters.
//!
//! ## Features
//!
//! - **Health Monitoring** - Probes every server's HA endpoint in parallel on a fixed interval
//! - **Role-Aware Routing** - Sends writes to the primary and reads wherever the policy allows
//! - **Selection Strategies** - Random, round-robin and nearest-by-latency
//! - **Transparent Failover** - Retries a failed unit of work on another server, up to a budget
//! - **Async/Await** - Built on Tokio; the data path is a pluggable [`Connector`]
//!
//! ## Quick Start
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! zeta4g-ha = "0.1"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use zeta4g_ha::{
//!     AuthToken, Connector, DriverResult, Router, RouterConfig, ServerLocation, SessionConfig,
//! };
//!
//! # fn my_connector(_: &ServerLocation) -> DriverResult<Arc<dyn Connector>> { unimplemented!() }
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RouterConfig::builder([
//!         "http://db1:7474",
//!         "http://db2:7474",
//!         "http://db3:7474",
//!     ])
//!     .with_auth(AuthToken::basic("neo4j", "password"))
//!     .build()?;
//!
//!     // Waits for the first health check cycle
//!     let router = Router::connect(config, my_connector).await?;
//!
//!     let session = router.session(SessionConfig::write()).await?;
//!     let result = session.run("CREATE (n:Person {name: 'Alice'})", None).await?;
//!     println!("served by {:?}", result.summary.server());
//!
//!     session.close().await?;
//!     router.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Read/Write Policies
//!
//! ```rust
//! use zeta4g_ha::{ReadWritePolicy, RoleCapability};
//!
//! // Writes to the primary, reads from replicas only
//! let policy = ReadWritePolicy::primary_write_only();
//!
//! // Anything else
//! let policy = ReadWritePolicy::custom(RoleCapability::READ_WRITE, RoleCapability::READ_ONLY);
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use std::time::Duration;
//! use zeta4g_ha::{RouterConfig, ServerLocation, Strategy};
//!
//! let config = RouterConfig::builder(vec![
//!     ServerLocation::new("http://db1:7474"),
//!     ServerLocation::split("http://db2:7474", "bolt://db2:7687"),
//! ])
//!     .with_strategy(Strategy::Nearest)
//!     .with_check_interval(Duration::from_secs(1))
//!     .with_max_retries(3)
//!     .build()
//!     .unwrap();
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`DriverResult`]. A unit of work that keeps failing
//! ends with [`DriverError::RetriesExhausted`], which keeps the last failure
//! as its source.
//!
//! ## Modules
//!
//! - [`driver`] - Router, sessions, results and the routing engine
//!

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod driver;

// Re-exports for convenience
pub use driver::{
    Router, RouterConfig, RouterConfigBuilder, RouterMetrics, AuthToken, ServerLocation,
    Session, SessionConfig, SessionConfigBuilder, SessionState,
    Connector, Connection, ConnectorFactory,
    Record, Value,
    DriverError, DriverResult,
    AccessMode, Provenance,
    Query, QueryResult, ResultSummary,
};

pub use driver::routing::{
    HealthInfo, HealthStatus, ServerRole,
    ReadWritePolicy, RoleCapability, Strategy,
};

/// Config alias for convenience
pub type Config = RouterConfig;
