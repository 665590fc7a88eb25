//! 헬스 프로브
//!
//! 서버 하나에 HA 상태 조회 요청을 보내고 결과를 [`HealthInfo`]로 분류합니다.
//!
//! | 결과 | status | role | latency |
//! |------|--------|------|---------|
//! | 전송 실패 (연결 거부, 타임아웃 등) | `Down` | `Unknown` | 없음 |
//! | 404 | `Unknown` | `Unknown` | 측정값 |
//! | 그 외 200이 아닌 응답 | `Error` | `Unknown` | 측정값 |
//! | 200 + `master` / `primary` | `Up` | `Primary` | 측정값 |
//! | 200 + `slave` / `replica` | `Up` | `Replica` | 측정값 |
//! | 200 + 그 외 본문 | `Up` | `Unknown` | 측정값 |

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Serialize;

use super::super::driver::{AuthToken, ServerLocation};
use super::super::error::{DriverError, DriverResult};

/// HA 상태 조회 경로
pub const HA_AVAILABLE_PATH: &str = "/db/manage/server/ha/available";

// ============================================================================
// HealthStatus / ServerRole
// ============================================================================

/// 서버 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HealthStatus {
    /// 상태 조회를 지원하지 않거나 재평가 대기 중
    Unknown,
    /// 정상
    Up,
    /// 네트워크 도달 불가
    Down,
    /// 비정상 응답
    Error,
}

/// 서버 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ServerRole {
    /// 알 수 없음
    Unknown,
    /// 쓰기 가능한 단일 마스터
    Primary,
    /// 읽기 전용 팔로워
    Replica,
}

impl ServerRole {
    /// 상태 조회 응답 본문에서 역할 파싱 (앞뒤 공백 제거, 대소문자 구분)
    pub fn from_body(body: &str) -> Self {
        match body.trim() {
            "master" | "primary" => Self::Primary,
            "slave" | "replica" => Self::Replica,
            _ => Self::Unknown,
        }
    }

    /// 역할을 문자열로 변환
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Primary => "primary",
            Self::Replica => "replica",
        }
    }
}

impl fmt::Display for ServerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// HealthInfo
// ============================================================================

/// 프로브 한 번의 분류 결과
///
/// 매 주기마다 새로 만들어지며 통째로 교체됩니다.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthInfo {
    /// 상태
    pub status: HealthStatus,
    /// 역할
    pub role: ServerRole,
    /// 왕복 지연 (ms). 도달 불가면 `None`
    pub latency_ms: Option<u64>,
    /// 프로브 완료 시각
    pub checked_at: DateTime<Utc>,
}

impl HealthInfo {
    /// 새 분류 결과 생성
    pub fn new(status: HealthStatus, role: ServerRole, latency_ms: Option<u64>) -> Self {
        Self {
            status,
            role,
            latency_ms,
            checked_at: Utc::now(),
        }
    }

    /// 도달 불가
    pub fn down() -> Self {
        Self::new(HealthStatus::Down, ServerRole::Unknown, None)
    }

    /// 정상 상태 여부
    pub fn is_up(&self) -> bool {
        self.status == HealthStatus::Up
    }

    /// 정상 상태의 프라이머리 여부
    pub fn is_available_primary(&self) -> bool {
        self.is_up() && self.role == ServerRole::Primary
    }
}

// ============================================================================
// ProbeOutcome - 분류 입력
// ============================================================================

/// 네트워크 호출 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 응답을 받지 못함
    Transport(String),
    /// HTTP 응답
    Response {
        /// 상태 코드
        status: u16,
        /// 본문
        body: String,
    },
}

/// 호출 결과를 분류
///
/// 같은 입력에는 항상 같은 `status`/`role`/`latency_ms`를 돌려줍니다.
pub fn classify(outcome: &ProbeOutcome, latency: Duration) -> HealthInfo {
    let latency_ms = Some(u64::try_from(latency.as_millis()).unwrap_or(u64::MAX));

    match outcome {
        ProbeOutcome::Transport(_) => HealthInfo::down(),
        ProbeOutcome::Response { status: 404, .. } => {
            HealthInfo::new(HealthStatus::Unknown, ServerRole::Unknown, latency_ms)
        }
        ProbeOutcome::Response { status, .. } if *status != 200 => {
            HealthInfo::new(HealthStatus::Error, ServerRole::Unknown, latency_ms)
        }
        ProbeOutcome::Response { body, .. } => {
            HealthInfo::new(HealthStatus::Up, ServerRole::from_body(body), latency_ms)
        }
    }
}

// ============================================================================
// HealthCheck - 프로브 트레이트
// ============================================================================

/// 서버 하나의 헬스 프로브
///
/// 실패를 에러로 돌려주지 않고 항상 [`HealthInfo`]로 변환합니다.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// 프로브 실행
    async fn check(&self, location: &ServerLocation) -> HealthInfo;
}

/// HTTP 상태 엔드포인트 프로브
#[derive(Debug, Clone)]
pub struct HttpHealthCheck {
    client: reqwest::Client,
}

impl HttpHealthCheck {
    /// 요청 타임아웃을 지정해 생성
    pub fn new(timeout: Duration) -> DriverResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DriverError::configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// 프로브 URL
    pub fn probe_url(location: &ServerLocation) -> String {
        format!("{}{}", location.probe_url.trim_end_matches('/'), HA_AVAILABLE_PATH)
    }

    async fn fetch(&self, location: &ServerLocation) -> ProbeOutcome {
        let mut request = self
            .client
            .get(Self::probe_url(location))
            .header(ACCEPT, "text/plain");

        if let AuthToken::Basic { username, password } = &location.auth {
            request = request.basic_auth(username, Some(password));
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return ProbeOutcome::Transport(e.to_string()),
        };

        let status = response.status();
        if status != StatusCode::OK {
            return ProbeOutcome::Response {
                status: status.as_u16(),
                body: String::new(),
            };
        }

        match response.text().await {
            Ok(body) => ProbeOutcome::Response {
                status: status.as_u16(),
                body,
            },
            Err(e) => ProbeOutcome::Transport(e.to_string()),
        }
    }
}

#[async_trait]
impl HealthCheck for HttpHealthCheck {
    async fn check(&self, location: &ServerLocation) -> HealthInfo {
        let started = Instant::now();
        let outcome = self.fetch(location).await;
        let info = classify(&outcome, started.elapsed());

        if let ProbeOutcome::Transport(reason) = &outcome {
            tracing::debug!(server = %location.probe_url, %reason, "health probe unreachable");
        } else {
            tracing::debug!(
                server = %location.probe_url,
                status = ?info.status,
                role = %info.role,
                latency_ms = ?info.latency_ms,
                "health probe classified"
            );
        }

        info
    }
}

// ============================================================================
// Tests
// ============================================================================
