//! 라우팅 정책
//!
//! 역할별 읽기/쓰기 허용 정책과 서버 선택 전략을 정의합니다.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::super::error::DriverError;
use super::health::{HealthStatus, ServerRole};
use super::table::ServerRecord;

// ============================================================================
// ReadWritePolicy - 역할별 읽기/쓰기 허용
// ============================================================================

/// 역할 하나에 허용된 작업
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCapability {
    /// 읽기 허용
    pub read: bool,
    /// 쓰기 허용
    pub write: bool,
}

impl RoleCapability {
    /// 읽기/쓰기 모두 허용
    pub const READ_WRITE: Self = Self {
        read: true,
        write: true,
    };

    /// 읽기만 허용
    pub const READ_ONLY: Self = Self {
        read: true,
        write: false,
    };

    /// 쓰기만 허용
    pub const WRITE_ONLY: Self = Self {
        read: false,
        write: true,
    };

    /// 아무것도 허용하지 않음
    pub const NONE: Self = Self {
        read: false,
        write: false,
    };

    /// 요청 종류 허용 여부
    pub fn allows(&self, is_write: bool) -> bool {
        if is_write {
            self.write
        } else {
            self.read
        }
    }
}

/// 역할별 읽기/쓰기 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadWritePolicy {
    /// 프라이머리 허용 작업
    pub primary: RoleCapability,
    /// 레플리카 허용 작업
    pub replica: RoleCapability,
}

impl ReadWritePolicy {
    /// 프라이머리만 읽기/쓰기
    pub fn primary_only() -> Self {
        Self {
            primary: RoleCapability::READ_WRITE,
            replica: RoleCapability::NONE,
        }
    }

    /// 쓰기는 프라이머리, 읽기는 레플리카
    pub fn primary_write_only() -> Self {
        Self {
            primary: RoleCapability::WRITE_ONLY,
            replica: RoleCapability::READ_ONLY,
        }
    }

    /// 프라이머리는 읽기/쓰기, 레플리카는 읽기 (기본값)
    pub fn primary_read_write() -> Self {
        Self {
            primary: RoleCapability::READ_WRITE,
            replica: RoleCapability::READ_ONLY,
        }
    }

    /// 모든 역할 읽기/쓰기
    ///
    /// 레플리카가 쓰기를 받아 프라이머리로 넘겨주는 클러스터용
    pub fn all_read_write() -> Self {
        Self {
            primary: RoleCapability::READ_WRITE,
            replica: RoleCapability::READ_WRITE,
        }
    }

    /// 직접 구성
    pub fn custom(primary: RoleCapability, replica: RoleCapability) -> Self {
        Self { primary, replica }
    }

    /// 역할과 요청 종류에 대한 허용 여부. 역할을 모르면 항상 거부
    pub fn allows(&self, role: ServerRole, is_write: bool) -> bool {
        match role {
            ServerRole::Primary => self.primary.allows(is_write),
            ServerRole::Replica => self.replica.allows(is_write),
            ServerRole::Unknown => false,
        }
    }
}

impl Default for ReadWritePolicy {
    fn default() -> Self {
        Self::primary_read_write()
    }
}

// ============================================================================
// Strategy - 선택 전략
// ============================================================================

/// 서버 선택 전략
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// 랜덤 (기본값)
    #[default]
    Random,
    /// 라운드 로빈
    RoundRobin,
    /// 최소 지연
    Nearest,
}

impl Strategy {
    /// 설정 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Random => "random",
            Strategy::RoundRobin => "round_robin",
            Strategy::Nearest => "nearest",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(Strategy::Random),
            "round_robin" | "round-robin" | "roundRobin" => Ok(Strategy::RoundRobin),
            "nearest" => Ok(Strategy::Nearest),
            other => Err(DriverError::configuration(format!(
                "Unknown selection strategy: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// ServerSelector - 서버 선택기
// ============================================================================

/// 서버 선택기
///
/// 라운드 로빈 커서는 라우터 하나당 하나이며 모든 세션이 공유합니다.
/// 자격 있는 서버 수가 바뀌어도 커서를 초기화하지 않고 나머지 연산으로 맞춥니다.
#[derive(Debug, Default)]
pub struct ServerSelector {
    /// 라운드 로빈 커서
    cursor: AtomicUsize,
}

impl ServerSelector {
    /// 새 선택기 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 선택 자격 여부
    ///
    /// 헬스 정보가 있고, 상태가 `Up`이고, 역할이 알려져 있고,
    /// 정책이 그 역할에 요청 종류를 허용해야 합니다.
    pub fn is_eligible(record: &ServerRecord, policy: &ReadWritePolicy, is_write: bool) -> bool {
        match &record.health {
            Some(health) => {
                health.status == HealthStatus::Up && policy.allows(health.role, is_write)
            }
            None => false,
        }
    }

    /// 자격 있는 서버 목록 (설정 순서 유지)
    pub fn eligible<'a>(
        records: &'a [ServerRecord],
        policy: &ReadWritePolicy,
        is_write: bool,
    ) -> Vec<&'a ServerRecord> {
        records
            .iter()
            .filter(|r| Self::is_eligible(r, policy, is_write))
            .collect()
    }

    /// 전략에 따라 서버 하나 선택. 자격 있는 서버가 없으면 `None`
    pub fn select<'a>(
        &self,
        strategy: Strategy,
        records: &'a [ServerRecord],
        policy: &ReadWritePolicy,
        is_write: bool,
    ) -> Option<&'a ServerRecord> {
        let candidates = Self::eligible(records, policy, is_write);
        if candidates.is_empty() {
            return None;
        }

        match strategy {
            Strategy::Random => {
                let index = rand::thread_rng().gen_range(0..candidates.len());
                Some(candidates[index])
            }
            Strategy::RoundRobin => Some(candidates[self.advance(candidates.len())]),
            // 동률이면 먼저 설정된 서버
            Strategy::Nearest => candidates
                .into_iter()
                .min_by_key(|r| r.health.as_ref().and_then(|h| h.latency_ms).unwrap_or(u64::MAX)),
        }
    }

    /// 커서를 한 칸 옮기고 새 위치 반환
    fn advance(&self, len: usize) -> usize {
        let previous = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| Some((cur + 1) % len))
            .unwrap_or_else(|cur| cur);
        (previous + 1) % len
    }

    /// 커서 리셋
    pub fn reset(&self) {
        self.cursor.store(0, Ordering::Relaxed);
    }
}

// ============================================================================
// Tests
// ============================================================================
