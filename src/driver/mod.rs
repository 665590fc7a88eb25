//! Driver Module
//!
//! 클라이언트 측 HA 라우터
//!
//! # 구성
//!
//! - 라우터 (Router, RouterConfig, AuthToken, ServerLocation)
//! - 헬스 프로브와 토폴로지 모니터 (routing)
//! - 라우팅 세션 (Session, SessionConfig, Query)
//! - 결과 스트림 (tokio-stream 기반)
//! - 커넥터 트레이트 (Connector, Connection)
//!
//! # Example
//!
//! ```ignore
//! use zeta4g_ha::driver::{AuthToken, Router, RouterConfig, SessionConfig};
//! use zeta4g_ha::params;
//!
//! let config = RouterConfig::builder(["http://db1:7474", "http://db2:7474", "http://db3:7474"])
//!     .with_auth(AuthToken::basic("neo4j", "password"))
//!     .build()?;
//! let router = Router::connect(config, |location: &ServerLocation| my_connector(location)).await?;
//!
//! // 쓰기 세션 (프라이머리로 라우팅)
//! let session = router.session(SessionConfig::write()).await?;
//! let result = session
//!     .run("CREATE (n:Person {name: $name})", Some(params! {"name" => "Alice"}))
//!     .await?;
//! println!("served by {:?}", result.summary.server());
//!
//! session.close().await?;
//! router.close().await?;
//! ```

pub mod reactive;
pub mod routing;
mod connector;
mod driver;
mod error;
mod record;
mod session;
#[cfg(test)]
pub(crate) mod testing;
mod types;

// Re-exports
pub use connector::{Connection, Connector, ConnectorFactory};
pub use driver::{
    AuthToken, Router, RouterConfig, RouterConfigBuilder, RouterMetrics, ServerLocation,
};
pub use error::{DriverError, DriverResult};
pub use record::Record;
pub use session::{
    AccessMode, Provenance, Query, QueryResult, ResultSummary, Session, SessionConfig,
    SessionConfigBuilder, SessionState,
};
pub use types::Value;

/// 파라미터 맵 생성 매크로
#[macro_export]
macro_rules! params {
    () => {
        std::collections::HashMap::<String, $crate::driver::Value>::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = std::collections::HashMap::<String, $crate::driver::Value>::new();
        $(
            map.insert($key.into(), $crate::driver::Value::from($value));
        )+
        map
    }};
}
