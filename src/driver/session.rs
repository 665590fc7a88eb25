//! Routed Session
//!
//! 서버 하나에 바인딩된 논리 작업 단위
//!
//! 세션은 생성 시 서버를 고르고 연결을 엽니다. 재시도 가능한 실패가 나면
//! 그 서버를 버리고 `Unknown`으로 내린 뒤 다른 서버를 골라 같은 작업을 다시 실행합니다.
//! 실패 카운터는 세션 전체에서 누적되며 세션 생성 시에만 0입니다.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use super::connector::Connection;
use super::driver::{RouterShared, ServerLocation};
use super::error::{DriverError, DriverResult};
use super::reactive::{ResultStream, StreamEvent};
use super::record::Record;
use super::routing::{HealthInfo, ReadWritePolicy, ServerRecord, Strategy};
use super::types::Value;

// ============================================================================
// AccessMode - 접근 모드
// ============================================================================

/// 접근 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// 읽기
    Read,
    /// 쓰기
    #[default]
    Write,
}

impl AccessMode {
    /// 쿼리 텍스트로 접근 모드 추정
    pub fn for_query(query: &Query) -> Self {
        if query.is_read_only() {
            AccessMode::Read
        } else {
            AccessMode::Write
        }
    }

    /// 쓰기 여부
    pub fn is_write(&self) -> bool {
        matches!(self, AccessMode::Write)
    }
}

// ============================================================================
// SessionConfig - 세션 설정
// ============================================================================

/// 세션 설정
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// 접근 모드
    pub access_mode: AccessMode,
    /// 라우터 정책 대신 쓸 읽기/쓰기 정책
    pub policy: Option<ReadWritePolicy>,
    /// 라우터 전략 대신 쓸 선택 전략
    pub strategy: Option<Strategy>,
    /// 스트리밍 버퍼 크기
    pub fetch_size: usize,
}

impl SessionConfig {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 빌더 시작
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// 읽기 세션 설정
    pub fn read() -> Self {
        Self::default().with_access_mode(AccessMode::Read)
    }

    /// 쓰기 세션 설정
    pub fn write() -> Self {
        Self::default().with_access_mode(AccessMode::Write)
    }

    /// 접근 모드 설정
    pub fn with_access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = mode;
        self
    }

    /// 정책 설정
    pub fn with_policy(mut self, policy: ReadWritePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// 전략 설정
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Fetch Size 설정
    pub fn with_fetch_size(mut self, size: usize) -> Self {
        self.fetch_size = size;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_mode: AccessMode::default(),
            policy: None,
            strategy: None,
            fetch_size: 1000,
        }
    }
}

// ============================================================================
// SessionConfigBuilder - 세션 설정 빌더
// ============================================================================

/// 세션 설정 빌더
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// 새 빌더 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 읽기 모드로 설정
    pub fn with_read_access(mut self) -> Self {
        self.config.access_mode = AccessMode::Read;
        self
    }

    /// 쓰기 모드로 설정
    pub fn with_write_access(mut self) -> Self {
        self.config.access_mode = AccessMode::Write;
        self
    }

    /// 정책 설정
    pub fn with_policy(mut self, policy: ReadWritePolicy) -> Self {
        self.config.policy = Some(policy);
        self
    }

    /// 전략 설정
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.config.strategy = Some(strategy);
        self
    }

    /// Fetch Size 설정
    pub fn with_fetch_size(mut self, size: usize) -> Self {
        self.config.fetch_size = size;
        self
    }

    /// 빌드
    pub fn build(self) -> SessionConfig {
        self.config
    }
}

// ============================================================================
// Query - 쿼리
// ============================================================================

/// 쓰기로 간주하는 절
const WRITE_CLAUSES: [&str; 5] = [" set ", " merge ", " create ", " delete ", " remove "];

/// 쿼리
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// 쿼리 텍스트
    pub text: String,
    /// 파라미터
    pub parameters: HashMap<String, Value>,
}

impl Query {
    /// 새 쿼리 생성
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: HashMap::new(),
        }
    }

    /// 파라미터 추가
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// 파라미터들 추가
    pub fn with_params(mut self, params: HashMap<String, Value>) -> Self {
        self.parameters.extend(params);
        self
    }

    /// 읽기 전용 쿼리 추정
    ///
    /// 공백을 하나로 접고 소문자로 바꾼 텍스트에 쓰기 절이 없으면 읽기 전용입니다.
    /// 문자열 리터럴 안의 단어도 절로 취급하는 단순한 휴리스틱입니다.
    pub fn is_read_only(&self) -> bool {
        let normalized = format!(
            " {} ",
            self.text
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase()
        );
        !WRITE_CLAUSES.iter().any(|clause| normalized.contains(clause))
    }
}

impl From<&str> for Query {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Query {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// Provenance - 실행 서버 정보
// ============================================================================

/// 결과를 만든 서버
#[derive(Debug, Clone)]
pub struct Provenance {
    /// 서버 식별자 (설정 목록 위치)
    pub index: usize,
    /// 서버 위치
    pub location: ServerLocation,
    /// 바인딩 시점의 헬스 정보
    pub health: Option<HealthInfo>,
}

impl Provenance {
    fn from_record(record: &ServerRecord) -> Self {
        Self {
            index: record.index,
            location: record.location.clone(),
            health: record.health.clone(),
        }
    }
}

// ============================================================================
// ResultSummary - 결과 요약
// ============================================================================

/// 결과 요약
#[derive(Debug, Clone, Default)]
pub struct ResultSummary {
    /// 쿼리
    pub query: Option<Query>,
    /// 결과 대기 시간
    pub result_available_after: Option<Duration>,
    /// 데이터베이스 이름
    pub database: Option<String>,
    /// 실행 서버
    pub provenance: Option<Provenance>,
}

impl ResultSummary {
    /// 실행 서버 위치
    pub fn server(&self) -> Option<&ServerLocation> {
        self.provenance.as_ref().map(|p| &p.location)
    }
}

// ============================================================================
// QueryResult - 쿼리 결과
// ============================================================================

/// 쿼리 결과
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// 컬럼 키
    pub keys: Vec<String>,
    /// 레코드
    pub records: Vec<Record>,
    /// 결과 요약
    pub summary: ResultSummary,
}

impl QueryResult {
    /// 새 결과 생성
    pub fn new(keys: Vec<String>, records: Vec<Record>, summary: ResultSummary) -> Self {
        Self {
            keys,
            records,
            summary,
        }
    }

    /// 빈 결과 생성
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), ResultSummary::default())
    }

    /// 레코드 수
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 레코드 없음 여부
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 단일 레코드 가져오기
    pub fn single(self) -> DriverResult<Record> {
        let count = self.records.len();
        let mut records = self.records.into_iter();
        match (records.next(), count) {
            (Some(record), 1) => Ok(record),
            _ => Err(DriverError::internal(format!(
                "Expected exactly one record, got {}",
                count
            ))),
        }
    }

    /// 첫 번째 레코드 가져오기
    pub fn first(&self) -> Option<&Record> {
        self.records.first()
    }

    /// 실행 서버
    pub fn provenance(&self) -> Option<&Provenance> {
        self.summary.provenance.as_ref()
    }
}

impl IntoIterator for QueryResult {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

// ============================================================================
// SessionState - 세션 상태
// ============================================================================

/// 세션 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 서버 선택/연결 중
    Acquiring,
    /// 서버에 바인딩됨
    Bound,
    /// 작업 실행 중
    Executing,
    /// 닫힘
    Closed,
}

// ============================================================================
// 내부 상태
// ============================================================================

/// 현재 바인딩
#[derive(Clone)]
struct Binding {
    id: u64,
    index: usize,
    connection: Arc<dyn Connection>,
    provenance: Provenance,
}

/// 작업 한 번의 실패
pub(crate) struct AttemptError {
    error: DriverError,
    /// 호출자에게 이미 결과 일부를 넘겼으면 `false`
    replayable: bool,
}

impl From<DriverError> for AttemptError {
    fn from(error: DriverError) -> Self {
        Self {
            error,
            replayable: true,
        }
    }
}

/// 복구 대상 실패
struct FailedAttempt {
    /// 연결 열기 자체가 실패했으면 `None`
    binding: Option<u64>,
    index: usize,
    error: DriverError,
}

enum BindError {
    Fatal(DriverError),
    Connect(FailedAttempt),
}

/// 실행 중 작업 수 가드
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

struct SessionInner {
    router: Arc<RouterShared>,
    config: SessionConfig,
    binding: Mutex<Option<Binding>>,
    bound: AtomicBool,
    failures: AtomicU32,
    in_flight: AtomicUsize,
    next_binding: AtomicU64,
    open: RwLock<bool>,
}

impl SessionInner {
    fn is_open(&self) -> bool {
        *self.open.read()
    }

    fn policy(&self) -> ReadWritePolicy {
        self.config.policy.unwrap_or(self.router.config.policy)
    }

    fn strategy(&self) -> Strategy {
        self.config.strategy.unwrap_or(self.router.config.strategy)
    }

    /// 현재 바인딩을 돌려주거나 새로 바인딩
    ///
    /// 바인딩 잠금을 쥔 채 연결을 열기 때문에 동시에 실패한 작업들은
    /// 하나의 새 바인딩을 공유합니다.
    async fn bind(&self) -> Result<Binding, BindError> {
        let mut slot = self.binding.lock().await;
        if !self.is_open() {
            return Err(BindError::Fatal(DriverError::session("Session is closed")));
        }
        if let Some(binding) = slot.as_ref() {
            return Ok(binding.clone());
        }

        let record = self
            .router
            .route(self.config.access_mode.is_write(), &self.policy(), self.strategy())
            .map_err(BindError::Fatal)?;

        let connection = record.connector().connect().await.map_err(|error| {
            BindError::Connect(FailedAttempt {
                binding: None,
                index: record.index,
                error,
            })
        })?;

        let binding = Binding {
            id: self.next_binding.fetch_add(1, Ordering::Relaxed) + 1,
            index: record.index,
            connection,
            provenance: Provenance::from_record(&record),
        };
        debug!(server = %record.location, index = record.index, "session bound");

        *slot = Some(binding.clone());
        self.bound.store(true, Ordering::Release);
        Ok(binding)
    }

    /// 재시도 루프
    async fn execute<T, F, Fut>(&self, mut work: F) -> DriverResult<T>
    where
        F: FnMut(Binding) -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            let failed = match self.bind().await {
                Ok(binding) => {
                    let (id, index) = (binding.id, binding.index);
                    match work(binding).await {
                        Ok(value) => return Ok(value),
                        Err(AttemptError {
                            error,
                            replayable: false,
                        }) => return Err(error),
                        Err(AttemptError { error, .. }) => FailedAttempt {
                            binding: Some(id),
                            index,
                            error,
                        },
                    }
                }
                Err(BindError::Fatal(error)) => return Err(error),
                Err(BindError::Connect(failed)) => failed,
            };
            self.recover(failed, attempts).await?;
        }
    }

    /// 실패 분류 후 재시도 준비. 재시도하지 않을 실패면 그대로 돌려줌
    async fn recover(&self, failed: FailedAttempt, attempts: u32) -> DriverResult<()> {
        let settings = &self.router.config;
        if !failed
            .error
            .is_retryable(settings.bad_connections_count_as_errors)
        {
            return Err(failed.error);
        }

        let failures = self.failures.fetch_add(1, Ordering::AcqRel) + 1;
        if failures > settings.max_retries {
            warn!(
                attempts,
                failures,
                max_retries = settings.max_retries,
                error = %failed.error,
                "retry budget exhausted"
            );
            return Err(DriverError::RetriesExhausted {
                attempts,
                source: Box::new(failed.error),
            });
        }

        self.router.counters.retries.fetch_add(1, Ordering::Relaxed);
        debug!(
            attempt = attempts,
            failures,
            index = failed.index,
            error = %failed.error,
            "retrying on another server"
        );
        self.discard(&failed).await;
        Ok(())
    }

    /// 실패한 바인딩 해제 후 서버를 `Unknown`으로 내림
    async fn discard(&self, failed: &FailedAttempt) {
        let released = {
            let mut slot = self.binding.lock().await;
            match (failed.binding, slot.as_ref()) {
                (Some(id), Some(current)) if current.id == id => {
                    self.bound.store(false, Ordering::Release);
                    slot.take()
                }
                // 다른 작업이 이미 다시 바인딩함
                (Some(_), _) => return,
                (None, _) => None,
            }
        };

        if let Some(binding) = released {
            if let Err(error) = binding.connection.close().await {
                debug!(%error, index = binding.index, "failed to close discarded connection");
            }
        }
        self.router.registry.mark_unknown(failed.index);
    }
}

/// 스트리밍 작업 한 번
async fn stream_attempt(
    binding: Binding,
    query: &Query,
    events: &mpsc::Sender<StreamEvent>,
    capacity: usize,
) -> Result<ResultSummary, AttemptError> {
    let (tx, mut rx) = mpsc::channel::<Record>(capacity);
    let forward = async move {
        let mut delivered = false;
        while let Some(record) = rx.recv().await {
            delivered = true;
            if events.send(StreamEvent::Record(record)).await.is_err() {
                break;
            }
        }
        delivered
    };

    let (outcome, delivered) = tokio::join!(binding.connection.run_streaming(query, tx), forward);
    match outcome {
        Ok(mut summary) => {
            summary.provenance = Some(binding.provenance);
            summary.query.get_or_insert_with(|| query.clone());
            Ok(summary)
        }
        Err(error) => Err(AttemptError {
            error,
            replayable: !delivered,
        }),
    }
}

// ============================================================================
// Session - 세션
// ============================================================================

/// 라우팅 세션
///
/// 여러 작업을 동시에 실행할 수 있으며 모두 같은 연결을 공유합니다.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// 세션 열기 (서버 선택 후 연결)
    pub(crate) async fn open(router: Arc<RouterShared>, config: SessionConfig) -> DriverResult<Self> {
        let session = Self {
            inner: Arc::new(SessionInner {
                router,
                config,
                binding: Mutex::new(None),
                bound: AtomicBool::new(false),
                failures: AtomicU32::new(0),
                in_flight: AtomicUsize::new(0),
                next_binding: AtomicU64::new(0),
                open: RwLock::new(true),
            }),
        };

        session
            .inner
            .execute(|_binding| async { Ok::<_, AttemptError>(()) })
            .await?;
        session
            .inner
            .router
            .counters
            .sessions_opened
            .fetch_add(1, Ordering::Relaxed);
        Ok(session)
    }

    /// 쿼리 실행 후 전체 결과 반환
    pub async fn run(
        &self,
        query: impl Into<Query>,
        params: Option<HashMap<String, Value>>,
    ) -> DriverResult<QueryResult> {
        self.ensure_open()?;
        let query = Self::build_query(query, params);
        let _in_flight = InFlight::enter(&self.inner.in_flight);

        let query_ref = &query;
        self.inner
            .execute(move |binding| async move {
                let mut result = binding.connection.run(query_ref).await?;
                result.summary.provenance = Some(binding.provenance);
                result.summary.query.get_or_insert_with(|| query_ref.clone());
                Ok::<_, AttemptError>(result)
            })
            .await
    }

    /// 쿼리 실행 후 레코드 스트림 반환
    ///
    /// 레코드가 하나라도 전달된 뒤의 실패는 재시도하지 않고 스트림의 마지막 이벤트로 전달합니다.
    pub async fn run_stream(
        &self,
        query: impl Into<Query>,
        params: Option<HashMap<String, Value>>,
    ) -> DriverResult<ResultStream> {
        self.ensure_open()?;
        let query = Self::build_query(query, params);
        let capacity = self.inner.config.fetch_size.max(1);
        let (events, stream) = ResultStream::channel(capacity);
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            let _in_flight = InFlight::enter(&inner.in_flight);
            let query_ref = &query;
            let events_ref = &events;
            let outcome = inner
                .execute(move |binding| stream_attempt(binding, query_ref, events_ref, capacity))
                .await;

            let terminal = match outcome {
                Ok(summary) => StreamEvent::Completed(summary),
                Err(error) => StreamEvent::Failed(error),
            };
            if events.send(terminal).await.is_err() {
                debug!("result stream dropped before completion");
            }
        });

        Ok(stream)
    }

    /// 세션 닫기 (여러 번 호출해도 안전)
    pub async fn close(&self) -> DriverResult<()> {
        {
            let mut open = self.inner.open.write();
            if !*open {
                return Ok(());
            }
            *open = false;
        }

        let binding = self.inner.binding.lock().await.take();
        self.inner.bound.store(false, Ordering::Release);
        if let Some(binding) = binding {
            debug!(index = binding.index, "closing session connection");
            binding.connection.close().await?;
        }
        Ok(())
    }

    /// 현재 상태
    pub fn state(&self) -> SessionState {
        if !self.inner.is_open() {
            SessionState::Closed
        } else if self.inner.in_flight.load(Ordering::Acquire) > 0 {
            SessionState::Executing
        } else if self.inner.bound.load(Ordering::Acquire) {
            SessionState::Bound
        } else {
            SessionState::Acquiring
        }
    }

    /// 현재 바인딩된 서버
    pub async fn server(&self) -> Option<Provenance> {
        self.inner
            .binding
            .lock()
            .await
            .as_ref()
            .map(|b| b.provenance.clone())
    }

    /// 지금까지 누적된 재시도 가능 실패 수
    pub fn failures(&self) -> u32 {
        self.inner.failures.load(Ordering::Acquire)
    }

    /// 세션 설정
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    fn build_query(query: impl Into<Query>, params: Option<HashMap<String, Value>>) -> Query {
        let query = query.into();
        match params {
            Some(p) => query.with_params(p),
            None => query,
        }
    }

    /// 열린 상태 확인
    fn ensure_open(&self) -> DriverResult<()> {
        if self.inner.is_open() {
            Ok(())
        } else {
            Err(DriverError::session("Session is closed"))
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_mode", &self.inner.config.access_mode)
            .field("state", &self.state())
            .field("failures", &self.failures())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
