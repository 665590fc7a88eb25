//! Router
//!
//! HA 라우터 인스턴스 및 설정

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::connector::ConnectorFactory;
use super::error::{DriverError, DriverResult};
use super::routing::{
    HealthCheck, HttpHealthCheck, ReadWritePolicy, ServerRecord, ServerRegistry, ServerSelector,
    Strategy, Topology, TopologyMonitor,
};
use super::session::{Session, SessionConfig};

// ============================================================================
// AuthToken - 인증 토큰
// ============================================================================

/// 인증 토큰
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum AuthToken {
    /// 인증 없음
    #[default]
    None,
    /// Basic 인증 (사용자명/비밀번호)
    Basic { username: String, password: String },
    /// Bearer 토큰 (데이터 경로 전용)
    Bearer { token: String },
}

impl AuthToken {
    /// Basic 인증 토큰 생성
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Bearer 토큰 생성
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// 인증 없음
    pub fn none() -> Self {
        Self::None
    }

    /// 인증 없음 여부
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// 인증 스킴
    pub fn scheme(&self) -> &str {
        match self {
            Self::None => "none",
            Self::Basic { .. } => "basic",
            Self::Bearer { .. } => "bearer",
        }
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
        }
    }
}

// ============================================================================
// ServerLocation - 서버 위치
// ============================================================================

/// 서버 위치
///
/// 헬스 프로브 주소와 데이터 경로 주소는 같을 수도, 다를 수도 있습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerLocation {
    /// 헬스 프로브 기준 URL
    pub probe_url: String,
    /// 데이터 경로 URL
    pub data_url: String,
    /// 서버별 인증 (`None`이면 라우터 전역 인증 사용)
    #[serde(default)]
    pub auth: AuthToken,
}

impl ServerLocation {
    /// 프로브와 데이터 경로가 같은 위치
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            probe_url: url.clone(),
            data_url: url,
            auth: AuthToken::None,
        }
    }

    /// 프로브와 데이터 경로가 다른 위치
    pub fn split(probe_url: impl Into<String>, data_url: impl Into<String>) -> Self {
        Self {
            probe_url: probe_url.into(),
            data_url: data_url.into(),
            auth: AuthToken::None,
        }
    }

    /// 서버별 인증 설정
    pub fn with_auth(mut self, auth: AuthToken) -> Self {
        self.auth = auth;
        self
    }

    /// 서버별 인증이 없으면 `fallback` 사용
    fn resolved(&self, fallback: &AuthToken) -> Self {
        let mut location = self.clone();
        if location.auth.is_none() {
            location.auth = fallback.clone();
        }
        location
    }

    fn validate(&self) -> DriverResult<()> {
        for url in [&self.probe_url, &self.data_url] {
            Url::parse(url).map_err(|e| {
                DriverError::configuration(format!("Invalid server URL '{}': {}", url, e))
            })?;
        }
        Ok(())
    }
}

impl fmt::Display for ServerLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data_url)
    }
}

impl From<&str> for ServerLocation {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for ServerLocation {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

impl From<(&str, &str)> for ServerLocation {
    fn from((probe_url, data_url): (&str, &str)) -> Self {
        Self::split(probe_url, data_url)
    }
}

// ============================================================================
// RouterConfig - 라우터 설정
// ============================================================================

/// 라우터 설정
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// 서버 목록 (순서가 곧 서버 식별자)
    pub servers: Vec<ServerLocation>,
    /// 전역 인증
    pub auth: AuthToken,
    /// 선택 전략
    pub strategy: Strategy,
    /// 읽기/쓰기 정책
    pub policy: ReadWritePolicy,
    /// 헬스 체크 간격
    pub check_interval: Duration,
    /// 세션당 재시도 한도
    pub max_retries: u32,
    /// 연결 장애도 재시도 대상으로 볼지 여부
    pub bad_connections_count_as_errors: bool,
    /// 연결 타임아웃 (헬스 프로브에도 적용)
    pub connection_timeout: Duration,
}

impl RouterConfig {
    /// 빌더 시작
    pub fn builder<I, L>(servers: I) -> RouterConfigBuilder
    where
        I: IntoIterator<Item = L>,
        L: Into<ServerLocation>,
    {
        RouterConfigBuilder {
            config: Self {
                servers: servers.into_iter().map(Into::into).collect(),
                ..Self::default()
            },
        }
    }

    /// 설정 검증
    pub fn validate(&self) -> DriverResult<()> {
        if self.servers.is_empty() {
            return Err(DriverError::configuration("At least one server is required"));
        }
        if self.check_interval.is_zero() {
            return Err(DriverError::configuration("Check interval must be greater than zero"));
        }
        for server in &self.servers {
            server.validate()?;
        }
        Ok(())
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            auth: AuthToken::default(),
            strategy: Strategy::default(),
            policy: ReadWritePolicy::default(),
            check_interval: Duration::from_millis(500),
            max_retries: 10,
            bad_connections_count_as_errors: false,
            connection_timeout: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// RouterConfigBuilder - 설정 빌더
// ============================================================================

/// 라우터 설정 빌더
#[derive(Debug)]
pub struct RouterConfigBuilder {
    config: RouterConfig,
}

impl RouterConfigBuilder {
    /// 전역 인증 설정
    pub fn with_auth(mut self, auth: AuthToken) -> Self {
        self.config.auth = auth;
        self
    }

    /// 선택 전략 설정
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// 읽기/쓰기 정책 설정
    pub fn with_policy(mut self, policy: ReadWritePolicy) -> Self {
        self.config.policy = policy;
        self
    }

    /// 헬스 체크 간격 설정
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.config.check_interval = interval;
        self
    }

    /// 재시도 한도 설정
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// 연결 장애 재시도 여부 설정
    pub fn with_bad_connections_count_as_errors(mut self, enabled: bool) -> Self {
        self.config.bad_connections_count_as_errors = enabled;
        self
    }

    /// 연결 타임아웃 설정
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    /// 검증 후 빌드
    pub fn build(self) -> DriverResult<RouterConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ============================================================================
// RouterShared - 세션과 공유하는 상태
// ============================================================================

/// 라우터 카운터
#[derive(Debug, Default)]
pub(crate) struct RouterCounters {
    pub(crate) sessions_opened: AtomicU64,
    pub(crate) retries: AtomicU64,
    pub(crate) fallbacks: AtomicU64,
}

/// 라우터와 세션이 공유하는 상태
#[derive(Debug)]
pub(crate) struct RouterShared {
    pub(crate) config: RouterConfig,
    pub(crate) registry: Arc<ServerRegistry>,
    pub(crate) selector: ServerSelector,
    pub(crate) counters: RouterCounters,
}

impl RouterShared {
    /// 바인딩할 서버 결정
    ///
    /// 전략이 서버를 못 고르면 프라이머리, 프라이머리도 없으면 첫 번째 서버로 폴백합니다.
    /// 서버가 없거나 아직 한 번도 프로브되지 않았으면 에러입니다.
    pub(crate) fn route(
        &self,
        is_write: bool,
        policy: &ReadWritePolicy,
        strategy: Strategy,
    ) -> DriverResult<ServerRecord> {
        let topology = self.registry.snapshot();
        if topology.servers().is_empty() {
            return Err(DriverError::service_unavailable("No servers configured"));
        }
        if !topology.is_probed() {
            return Err(DriverError::service_unavailable(
                "Server health has not been probed yet",
            ));
        }

        if let Some(record) = self
            .selector
            .select(strategy, topology.servers(), policy, is_write)
        {
            return Ok(record.clone());
        }

        self.counters.fallbacks.fetch_add(1, Ordering::Relaxed);
        if let Some(primary) = topology.primary() {
            warn!(
                is_write,
                %strategy,
                server = %primary.location,
                "no eligible server for policy, falling back to primary"
            );
            return Ok(primary.clone());
        }

        let first = topology
            .first()
            .cloned()
            .ok_or_else(|| DriverError::service_unavailable("No servers configured"))?;
        warn!(
            is_write,
            %strategy,
            server = %first.location,
            "no eligible server and no primary, falling back to first configured server"
        );
        Ok(first)
    }
}

// ============================================================================
// Router - 라우터
// ============================================================================

/// HA 라우터
///
/// 백그라운드에서 서버 헬스를 감시하고, 세션마다 요청 종류에 맞는 서버를 고릅니다.
pub struct Router {
    shared: Arc<RouterShared>,
    monitor: TopologyMonitor,
    open: AtomicBool,
}

impl Router {
    /// 새 라우터 생성 (HTTP 헬스 체크 사용)
    ///
    /// tokio 런타임 안에서 호출해야 하며, 첫 헬스 체크 주기를 기다리지 않습니다.
    pub fn new<F>(config: RouterConfig, factory: F) -> DriverResult<Self>
    where
        F: ConnectorFactory,
    {
        let probe = HttpHealthCheck::new(config.connection_timeout)?;
        Self::with_health_check(config, factory, Arc::new(probe))
    }

    /// 헬스 체크 구현을 지정해 라우터 생성
    pub fn with_health_check<F>(
        config: RouterConfig,
        factory: F,
        probe: Arc<dyn HealthCheck>,
    ) -> DriverResult<Self>
    where
        F: ConnectorFactory,
    {
        config.validate()?;
        tokio::runtime::Handle::try_current().map_err(|_| {
            DriverError::configuration("Router must be created inside a tokio runtime")
        })?;

        let records = config
            .servers
            .iter()
            .enumerate()
            .map(|(index, location)| {
                let location = location.resolved(&config.auth);
                let connector = factory.create(&location)?;
                Ok(ServerRecord::new(index, location, connector))
            })
            .collect::<DriverResult<Vec<_>>>()?;

        let registry = Arc::new(ServerRegistry::new(records));
        let monitor = TopologyMonitor::start(registry.clone(), probe, config.check_interval);
        info!(
            servers = config.servers.len(),
            strategy = %config.strategy,
            max_retries = config.max_retries,
            "router created"
        );

        Ok(Self {
            shared: Arc::new(RouterShared {
                config,
                registry,
                selector: ServerSelector::new(),
                counters: RouterCounters::default(),
            }),
            monitor,
            open: AtomicBool::new(true),
        })
    }

    /// 라우터 생성 후 첫 헬스 체크 주기까지 대기
    pub async fn connect<F>(config: RouterConfig, factory: F) -> DriverResult<Self>
    where
        F: ConnectorFactory,
    {
        let router = Self::new(config, factory)?;
        router.ready().await?;
        Ok(router)
    }

    /// 첫 헬스 체크 주기 완료까지 대기
    pub async fn ready(&self) -> DriverResult<()> {
        self.monitor.ready().await
    }

    /// 헬스 체크 주기를 즉시 한 번 실행
    pub async fn refresh(&self) -> DriverResult<Arc<Topology>> {
        self.ensure_open()?;
        Ok(self.monitor.refresh().await)
    }

    /// 현재 프라이머리
    pub fn primary(&self) -> Option<ServerRecord> {
        self.shared.registry.primary()
    }

    /// 현재 서버 스냅샷
    pub fn servers(&self) -> Arc<Topology> {
        self.shared.registry.snapshot()
    }

    /// 세션이 바인딩할 서버 조회 (연결은 열지 않음)
    pub fn select(&self, is_write: bool) -> DriverResult<ServerRecord> {
        self.ensure_open()?;
        let config = &self.shared.config;
        self.shared
            .route(is_write, &config.policy, config.strategy)
    }

    /// 세션 생성
    pub async fn session(&self, config: SessionConfig) -> DriverResult<Session> {
        self.ensure_open()?;
        Session::open(self.shared.clone(), config).await
    }

    /// 라우터 설정
    pub fn config(&self) -> &RouterConfig {
        &self.shared.config
    }

    /// 라우터 종료
    ///
    /// 헬스 체크 타이머를 멈추고 모든 커넥터를 닫습니다. 이미 열린 세션의
    /// 진행 중인 작업은 중단하지 않습니다.
    pub async fn close(&self) -> DriverResult<()> {
        if !self.open.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        self.monitor.stop();
        let topology = self.shared.registry.snapshot();
        let mut first_error = None;
        for record in topology.servers() {
            if let Err(e) = record.connector().close().await {
                warn!(server = %record.location, error = %e, "failed to close connector");
                first_error.get_or_insert(e);
            }
        }
        info!("router closed");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// 열린 상태 여부
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// 열린 상태 확인
    fn ensure_open(&self) -> DriverResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(DriverError::session("Router is closed"))
        }
    }

    /// 메트릭 조회
    pub fn metrics(&self) -> RouterMetrics {
        let topology = self.shared.registry.snapshot();
        let counters = &self.shared.counters;
        RouterMetrics {
            servers: topology.servers().len(),
            servers_up: topology.servers().iter().filter(|r| r.is_up()).count(),
            primary: topology.primary_index(),
            probe_cycles: self.monitor.cycles(),
            sessions_opened: counters.sessions_opened.load(Ordering::Relaxed),
            retries: counters.retries.load(Ordering::Relaxed),
            fallbacks: counters.fallbacks.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("servers", &self.shared.config.servers.len())
            .field("strategy", &self.shared.config.strategy)
            .field("monitor", &self.monitor)
            .field("open", &self.is_open())
            .finish()
    }
}

// ============================================================================
// RouterMetrics - 라우터 메트릭
// ============================================================================

/// 라우터 메트릭
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterMetrics {
    /// 설정된 서버 수
    pub servers: usize,
    /// 정상 상태 서버 수
    pub servers_up: usize,
    /// 프라이머리 위치
    pub primary: Option<usize>,
    /// 완료된 헬스 체크 주기 수
    pub probe_cycles: u64,
    /// 열린 세션 수 (누적)
    pub sessions_opened: u64,
    /// 재시도 횟수 (누적)
    pub retries: u64,
    /// 폴백 횟수 (누적)
    pub fallbacks: u64,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testing::{location, start_router, up_primary, up_replica, MockCluster, StaticHealthCheck};

    #[test]
    fn test_auth_token_basic() {
        let auth = AuthToken::basic("neo4j", "s3cret");
        assert_eq!(auth.scheme(), "basic");

        if let AuthToken::Basic { username, password } = &auth {
            assert_eq!(username, "neo4j");
            assert_eq!(password, "s3cret");
        } else {
            panic!("Expected Basic auth");
        }
        assert!(!format!("{:?}", auth).contains("s3cret"));
    }

    #[test]
    fn test_auth_token_none() {
        assert_eq!(AuthToken::none().scheme(), "none");
        assert!(AuthToken::default().is_none());
        assert_eq!(AuthToken::bearer("t").scheme(), "bearer");
    }

    #[test]
    fn test_server_location() {
        let loc = ServerLocation::new("http://db0:7474");
        assert_eq!(loc.probe_url, loc.data_url);
        assert_eq!(loc.to_string(), "http://db0:7474");

        let loc: ServerLocation = ("http://db0:7474", "bolt://db0:7687").into();
        assert_eq!(loc.probe_url, "http://db0:7474");
        assert_eq!(loc.data_url, "bolt://db0:7687");
    }

    #[test]
    fn test_per_server_auth_wins() {
        let global = AuthToken::basic("global", "g");
        let own = ServerLocation::new("http://db0:7474").with_auth(AuthToken::basic("own", "o"));
        assert_eq!(own.resolved(&global).auth, AuthToken::basic("own", "o"));

        let plain = ServerLocation::new("http://db1:7474");
        assert_eq!(plain.resolved(&global).auth, global);
    }

    #[test]
    fn test_router_config_defaults() {
        let config = RouterConfig::builder(["http://db0:7474"]).build().unwrap();
        assert_eq!(config.check_interval, Duration::from_millis(500));
        assert_eq!(config.max_retries, 10);
        assert!(!config.bad_connections_count_as_errors);
        assert_eq!(config.connection_timeout, Duration::from_secs(30));
        assert_eq!(config.strategy, Strategy::Random);
        assert_eq!(config.policy, ReadWritePolicy::primary_read_write());
    }

    #[test]
    fn test_router_config_builder() {
        let config = RouterConfig::builder(vec!["http://db0:7474", "http://db1:7474"])
            .with_auth(AuthToken::basic("neo4j", "secret"))
            .with_strategy(Strategy::Nearest)
            .with_policy(ReadWritePolicy::primary_only())
            .with_check_interval(Duration::from_secs(2))
            .with_max_retries(3)
            .with_bad_connections_count_as_errors(true)
            .with_connection_timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.strategy, Strategy::Nearest);
        assert_eq!(config.max_retries, 3);
        assert!(config.bad_connections_count_as_errors);
        assert_eq!(config.connection_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_router_config_validation() {
        let empty: Vec<&str> = Vec::new();
        assert!(matches!(
            RouterConfig::builder(empty).build(),
            Err(DriverError::Configuration(_))
        ));
        assert!(RouterConfig::builder(["not a url"]).build().is_err());
        assert!(RouterConfig::builder(["http://db0:7474"])
            .with_check_interval(Duration::ZERO)
            .build()
            .is_err());
    }

    #[test]
    fn test_router_requires_runtime() {
        let config = RouterConfig::builder(["http://db0:7474"]).build().unwrap();
        let err = Router::with_health_check(
            config,
            MockCluster::new().factory(),
            Arc::new(StaticHealthCheck::new()),
        )
        .unwrap_err();
        assert!(matches!(err, DriverError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_factory_receives_resolved_auth() {
        let config = RouterConfig::builder([
            location(0),
            location(1).with_auth(AuthToken::basic("own", "o")),
        ])
        .with_auth(AuthToken::basic("global", "g"))
        .build()
        .unwrap();
        let cluster = MockCluster::new();
        let router =
            Router::with_health_check(config, cluster.factory(), Arc::new(StaticHealthCheck::new()))
                .unwrap();

        let topology = router.servers();
        assert_eq!(topology.servers()[0].location.auth, AuthToken::basic("global", "g"));
        assert_eq!(topology.servers()[1].location.auth, AuthToken::basic("own", "o"));
        router.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_primary_and_select() {
        let test = start_router(vec![up_replica(3), up_primary(8), up_replica(1)], |b| {
            b.with_strategy(Strategy::Nearest)
        })
        .await;

        assert_eq!(test.router.primary().unwrap().index, 1);
        assert_eq!(test.router.select(true).unwrap().index, 1);
        assert_eq!(test.router.select(false).unwrap().index, 2);
    }

    #[tokio::test]
    async fn test_session_before_first_probe_is_unavailable() {
        let config = RouterConfig::builder([location(0)]).build().unwrap();
        let probe = Arc::new(StaticHealthCheck::new());
        probe.set_delay(Duration::from_millis(200));
        let router = Router::with_health_check(config, MockCluster::new().factory(), probe).unwrap();

        let err = router.select(false).unwrap_err();
        assert!(matches!(err, DriverError::ServiceUnavailable(_)));
        router.ready().await.unwrap();
        assert!(router.select(false).is_ok());
    }

    #[tokio::test]
    async fn test_refresh_picks_up_failover() {
        let test = start_router(vec![up_primary(1), up_replica(1)], |b| b).await;
        assert_eq!(test.router.primary().unwrap().index, 0);

        test.probe.set(&location(0).probe_url, up_replica(1));
        test.probe.set(&location(1).probe_url, up_primary(1));
        test.router.refresh().await.unwrap();

        assert_eq!(test.router.primary().unwrap().index, 1);
        assert!(test.router.metrics().probe_cycles >= 2);
    }

    #[tokio::test]
    async fn test_retry_with_running_monitor() {
        let test = start_router(vec![up_replica(1), up_replica(50)], |b| {
            b.with_strategy(Strategy::Nearest)
                .with_check_interval(Duration::from_millis(20))
        })
        .await;
        let session = test.router.session(SessionConfig::read()).await.unwrap();
        while test.router.metrics().probe_cycles < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        test.cluster.fail_next(DriverError::timeout("slow"));
        let result = session.run("MATCH (n) RETURN n", None).await.unwrap();

        let attempts = test.cluster.attempts();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0], "http://db0:7474");
        assert_eq!(session.failures(), 1);
        assert!(result.provenance().is_some());
    }

    #[tokio::test]
    async fn test_close_lets_in_flight_work_finish() {
        let test = start_router(vec![up_primary(1)], |b| b).await;
        let session = test.router.session(SessionConfig::write()).await.unwrap();
        test.cluster.hold();

        let work = tokio::spawn({
            let session = session.clone();
            async move { session.run("CREATE (n)", None).await }
        });
        test.cluster.wait_for_attempts(1).await;

        test.router.close().await.unwrap();
        test.router.close().await.unwrap();
        assert!(!test.router.is_open());
        assert_eq!(test.cluster.connectors_closed(), 1);
        assert!(matches!(
            test.router.session(SessionConfig::write()).await,
            Err(DriverError::Session(_))
        ));

        test.cluster.release();
        let result = work.await.unwrap().unwrap();
        assert_eq!(result.provenance().unwrap().index, 0);
    }

    #[tokio::test]
    async fn test_metrics() {
        let test = start_router(vec![up_primary(1), up_replica(1)], |b| b).await;
        test.router.session(SessionConfig::read()).await.unwrap();

        let metrics = test.router.metrics();
        assert_eq!(metrics.servers, 2);
        assert_eq!(metrics.servers_up, 2);
        assert_eq!(metrics.primary, Some(0));
        assert_eq!(metrics.sessions_opened, 1);
        assert!(metrics.probe_cycles >= 1);
    }
}
