//! 라우팅 모듈
//!
//! 프라이머리/레플리카 클러스터에서 요청 종류에 맞는 서버를 고릅니다.
//!
//! # 개요
//!
//! - [`health`]: 서버 하나의 HA 상태 프로브와 분류
//! - [`monitor`]: 모든 서버를 주기적으로 프로브해 레지스트리에 게시
//! - [`table`]: 서버 레지스트리 (원자적으로 교체되는 스냅샷)
//! - [`policy`]: 역할별 읽기/쓰기 정책과 선택 전략
//!
//! # 예시
//!
//! ```ignore
//! use zeta4g_ha::driver::routing::{ReadWritePolicy, Strategy};
//! use zeta4g_ha::driver::{AuthToken, Router, RouterConfig, SessionConfig};
//!
//! let config = RouterConfig::builder(["http://db1:7474", "http://db2:7474"])
//!     .with_auth(AuthToken::basic("neo4j", "password"))
//!     .with_policy(ReadWritePolicy::primary_write_only())
//!     .with_strategy(Strategy::Nearest)
//!     .build()?;
//! let router = Router::connect(config, connector_factory).await?;
//!
//! // 읽기 세션 (레플리카로 라우팅)
//! let session = router.session(SessionConfig::read()).await?;
//! ```

pub mod health;
pub mod monitor;
pub mod policy;
pub mod table;

pub use health::{
    classify, HealthCheck, HealthInfo, HealthStatus, HttpHealthCheck, ProbeOutcome, ServerRole,
    HA_AVAILABLE_PATH,
};
pub use monitor::TopologyMonitor;
pub use policy::{ReadWritePolicy, RoleCapability, ServerSelector, Strategy};
pub use table::{ServerRecord, ServerRegistry, Topology};
