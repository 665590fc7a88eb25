//! 테스트 지원
//!
//! 스크립트로 동작을 정하는 가짜 커넥터와 고정 응답 헬스 체크

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use super::connector::{Connection, Connector, ConnectorFactory};
use super::driver::{Router, RouterConfig, RouterConfigBuilder, ServerLocation};
use super::error::{DriverError, DriverResult};
use super::record::Record;
use super::routing::{HealthCheck, HealthInfo, HealthStatus, ServerRecord, ServerRole};
use super::session::{Query, QueryResult, ResultSummary};

// ============================================================================
// 헬스/레코드 헬퍼
// ============================================================================

pub(crate) fn location(index: usize) -> ServerLocation {
    ServerLocation::new(format!("http://db{}:7474", index))
}

pub(crate) fn up_primary(latency_ms: u64) -> HealthInfo {
    HealthInfo::new(HealthStatus::Up, ServerRole::Primary, Some(latency_ms))
}

pub(crate) fn up_replica(latency_ms: u64) -> HealthInfo {
    HealthInfo::new(HealthStatus::Up, ServerRole::Replica, Some(latency_ms))
}

pub(crate) fn down() -> HealthInfo {
    HealthInfo::down()
}

/// 연결할 수 없는 커넥터를 가진 레코드
pub(crate) fn record(index: usize, health: Option<HealthInfo>) -> ServerRecord {
    ServerRecord::new(index, location(index), Arc::new(Unreachable)).with_health(health)
}

struct Unreachable;

#[async_trait]
impl Connector for Unreachable {
    async fn connect(&self) -> DriverResult<Arc<dyn Connection>> {
        Err(DriverError::connection("unreachable"))
    }
}

// ============================================================================
// StaticHealthCheck - 고정 응답 헬스 체크
// ============================================================================

/// 프로브 URL별로 정해 둔 결과를 돌려주는 헬스 체크. 모르는 URL은 `Down`
#[derive(Default)]
pub(crate) struct StaticHealthCheck {
    table: Mutex<HashMap<String, HealthInfo>>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl StaticHealthCheck {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&self, probe_url: &str, health: HealthInfo) {
        self.table.lock().insert(probe_url.to_string(), health);
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthCheck for StaticHealthCheck {
    async fn check(&self, location: &ServerLocation) -> HealthInfo {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let health = self.table.lock().get(&location.probe_url).cloned();
        health.unwrap_or_else(HealthInfo::down)
    }
}

// ============================================================================
// MockCluster - 스크립트 커넥터
// ============================================================================

#[derive(Default)]
struct MockState {
    /// 다음 실행들이 순서대로 돌려줄 실패
    failures: Mutex<VecDeque<DriverError>>,
    /// 스트리밍 실행 한 번에 적용할 (전달할 레코드 수, 실패)
    stream_failure: Mutex<Option<(usize, DriverError)>>,
    /// 실행 시도마다 기록한 데이터 경로 URL
    attempts: Mutex<Vec<String>>,
    /// 연결을 거부할 URL
    refused: Mutex<HashSet<String>>,
    /// 실행을 붙잡아 둘 게이트
    gate: Mutex<Option<watch::Sender<bool>>>,
    rows: Mutex<Option<usize>>,
    connects: AtomicUsize,
    connections_closed: AtomicUsize,
    connectors_closed: AtomicUsize,
}

/// 모든 서버가 공유하는 가짜 클러스터
#[derive(Clone, Default)]
pub(crate) struct MockCluster {
    state: Arc<MockState>,
}

impl MockCluster {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn factory(&self) -> impl ConnectorFactory {
        let state = Arc::clone(&self.state);
        move |location: &ServerLocation| -> DriverResult<Arc<dyn Connector>> {
            Ok(Arc::new(MockConnector {
                url: location.data_url.clone(),
                state: Arc::clone(&state),
            }))
        }
    }

    /// 다음 실행 하나를 `error`로 실패시킴
    pub(crate) fn fail_next(&self, error: DriverError) {
        self.state.failures.lock().push_back(error);
    }

    /// 다음 스트리밍 실행이 `records`개를 보낸 뒤 `error`로 실패
    pub(crate) fn fail_stream_after(&self, records: usize, error: DriverError) {
        *self.state.stream_failure.lock() = Some((records, error));
    }

    pub(crate) fn refuse(&self, url: &str) {
        self.state.refused.lock().insert(url.to_string());
    }

    pub(crate) fn set_rows(&self, rows: usize) {
        *self.state.rows.lock() = Some(rows);
    }

    /// 이후 실행들을 [`MockCluster::release`]까지 붙잡아 둠
    pub(crate) fn hold(&self) {
        let (tx, _) = watch::channel(false);
        *self.state.gate.lock() = Some(tx);
    }

    pub(crate) fn release(&self) {
        if let Some(gate) = self.state.gate.lock().take() {
            gate.send_replace(true);
        }
    }

    pub(crate) fn attempts(&self) -> Vec<String> {
        self.state.attempts.lock().clone()
    }

    pub(crate) async fn wait_for_attempts(&self, count: usize) {
        while self.state.attempts.lock().len() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    pub(crate) fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn connections_closed(&self) -> usize {
        self.state.connections_closed.load(Ordering::SeqCst)
    }

    pub(crate) fn connectors_closed(&self) -> usize {
        self.state.connectors_closed.load(Ordering::SeqCst)
    }
}

struct MockConnector {
    url: String,
    state: Arc<MockState>,
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> DriverResult<Arc<dyn Connection>> {
        if self.state.refused.lock().contains(&self.url) {
            return Err(DriverError::connection(format!("{} refused", self.url)));
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockConnection {
            url: self.url.clone(),
            state: Arc::clone(&self.state),
        }))
    }

    async fn close(&self) -> DriverResult<()> {
        self.state.connectors_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MockConnection {
    url: String,
    state: Arc<MockState>,
}

impl MockConnection {
    fn row(&self, n: usize) -> Record {
        Record::new(
            vec!["server".into(), "row".into()],
            vec![self.url.clone().into(), (n as i64).into()],
        )
    }

    /// 시도 기록 후 게이트가 열릴 때까지 대기
    async fn begin_attempt(&self) {
        self.state.attempts.lock().push(self.url.clone());
        let gate = self.state.gate.lock().as_ref().map(watch::Sender::subscribe);
        if let Some(mut gate) = gate {
            let _ = gate.wait_for(|open| *open).await;
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn run(&self, query: &Query) -> DriverResult<QueryResult> {
        self.begin_attempt().await;
        let failure = self.state.failures.lock().pop_front();
        if let Some(error) = failure {
            return Err(error);
        }

        let rows = self.state.rows.lock().unwrap_or(1);
        let records: Vec<Record> = (0..rows).map(|n| self.row(n)).collect();
        let summary = ResultSummary {
            query: Some(query.clone()),
            ..ResultSummary::default()
        };
        Ok(QueryResult::new(
            vec!["server".into(), "row".into()],
            records,
            summary,
        ))
    }

    async fn run_streaming(
        &self,
        query: &Query,
        records: mpsc::Sender<Record>,
    ) -> DriverResult<ResultSummary> {
        let plan = self.state.stream_failure.lock().take();
        let Some((count, error)) = plan else {
            let result = self.run(query).await?;
            for record in result.records {
                if records.send(record).await.is_err() {
                    break;
                }
            }
            return Ok(result.summary);
        };

        self.begin_attempt().await;
        for n in 0..count {
            if records.send(self.row(n)).await.is_err() {
                break;
            }
        }
        Err(error)
    }

    async fn close(&self) -> DriverResult<()> {
        self.state.connections_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// 라우터 헬퍼
// ============================================================================

pub(crate) struct TestCluster {
    pub(crate) router: Router,
    pub(crate) cluster: MockCluster,
    pub(crate) probe: Arc<StaticHealthCheck>,
}

/// 서버마다 `health`를 보고하는 라우터를 만들고 첫 주기까지 대기
///
/// 기본 간격은 길게 잡습니다. 새 주기는 `router.refresh()`로 게시하거나
/// `configure`에서 `with_check_interval`로 간격을 줄여 돌립니다.
pub(crate) async fn start_router(
    health: Vec<HealthInfo>,
    configure: impl FnOnce(RouterConfigBuilder) -> RouterConfigBuilder,
) -> TestCluster {
    let probe = Arc::new(StaticHealthCheck::new());
    for (index, info) in health.iter().enumerate() {
        probe.set(&location(index).probe_url, info.clone());
    }

    let builder = RouterConfig::builder((0..health.len()).map(location))
        .with_check_interval(Duration::from_secs(3600));
    let config = configure(builder).build().unwrap();
    let cluster = MockCluster::new();
    let router = Router::with_health_check(config, cluster.factory(), probe.clone()).unwrap();
    router.ready().await.unwrap();

    TestCluster {
        router,
        cluster,
        probe,
    }
}
