//! 서버 레지스트리
//!
//! 설정된 서버 목록과 각 서버의 마지막 헬스 분류를 관리합니다.
//!
//! 토폴로지는 통째로 새로 만들어 `ArcSwap`으로 한 번에 교체합니다.
//! 읽는 쪽은 결정 하나마다 [`ServerRegistry::snapshot`]을 한 번만 호출해
//! 이전 주기와 새 주기의 데이터가 섞이지 않게 합니다.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::super::connector::Connector;
use super::super::driver::ServerLocation;
use super::health::{HealthInfo, HealthStatus};

// ============================================================================
// ServerRecord - 서버 레코드
// ============================================================================

/// 서버 하나의 위치, 커넥터, 마지막 헬스 분류
#[derive(Clone)]
pub struct ServerRecord {
    /// 설정 목록에서의 위치 (서버 식별자)
    pub index: usize,
    /// 서버 위치
    pub location: ServerLocation,
    /// 첫 프로브가 끝나기 전에는 `None`
    pub health: Option<HealthInfo>,
    connector: Arc<dyn Connector>,
}

impl ServerRecord {
    /// 새 레코드 생성 (헬스 미확인)
    pub fn new(index: usize, location: ServerLocation, connector: Arc<dyn Connector>) -> Self {
        Self {
            index,
            location,
            health: None,
            connector,
        }
    }

    /// 헬스 정보를 바꾼 사본
    pub fn with_health(&self, health: Option<HealthInfo>) -> Self {
        Self {
            health,
            ..self.clone()
        }
    }

    /// 데이터 경로 커넥터
    pub fn connector(&self) -> &Arc<dyn Connector> {
        &self.connector
    }

    /// 정상 상태 여부
    pub fn is_up(&self) -> bool {
        self.health.as_ref().is_some_and(HealthInfo::is_up)
    }

    /// 정상 상태 프라이머리 여부
    pub fn is_available_primary(&self) -> bool {
        self.health.as_ref().is_some_and(HealthInfo::is_available_primary)
    }
}

impl fmt::Debug for ServerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerRecord")
            .field("index", &self.index)
            .field("location", &self.location)
            .field("health", &self.health)
            .finish()
    }
}

// ============================================================================
// Topology - 불변 스냅샷
// ============================================================================

/// 한 시점의 서버 목록과 프라이머리 위치
#[derive(Debug, Clone)]
pub struct Topology {
    generation: u64,
    servers: Vec<ServerRecord>,
    primary: Option<usize>,
}

impl Topology {
    fn initial(servers: Vec<ServerRecord>) -> Self {
        Self {
            generation: 0,
            servers,
            primary: None,
        }
    }

    /// 프로브 주기 번호. 0이면 아직 한 번도 프로브되지 않음
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 프로브가 한 번 이상 끝났는지 여부
    pub fn is_probed(&self) -> bool {
        self.generation > 0
    }

    /// 설정 순서대로의 서버 목록
    pub fn servers(&self) -> &[ServerRecord] {
        &self.servers
    }

    /// 프라이머리 위치
    pub fn primary_index(&self) -> Option<usize> {
        self.primary
    }

    /// 프라이머리 레코드
    pub fn primary(&self) -> Option<&ServerRecord> {
        self.primary.and_then(|i| self.servers.get(i))
    }

    /// 첫 번째로 설정된 서버
    pub fn first(&self) -> Option<&ServerRecord> {
        self.servers.first()
    }
}

// ============================================================================
// ServerRegistry - 레지스트리
// ============================================================================

/// 라이브 토폴로지 소유자
#[derive(Debug)]
pub struct ServerRegistry {
    topology: ArcSwap<Topology>,
}

impl ServerRegistry {
    /// 프로브 전 상태의 레지스트리 생성
    pub fn new(servers: Vec<ServerRecord>) -> Self {
        Self {
            topology: ArcSwap::from_pointee(Topology::initial(servers)),
        }
    }

    /// 현재 스냅샷
    pub fn snapshot(&self) -> Arc<Topology> {
        self.topology.load_full()
    }

    /// 현재 프라이머리
    pub fn primary(&self) -> Option<ServerRecord> {
        self.topology.load().primary().cloned()
    }

    /// 프로브 주기 결과 게시
    ///
    /// `health`는 서버 목록과 같은 순서여야 합니다. 정상 프라이머리가 여럿이면
    /// 목록에서 마지막 것이 이깁니다. 새로 게시된 스냅샷을 돌려줍니다.
    pub fn publish(&self, health: Vec<HealthInfo>) -> Arc<Topology> {
        let mut stored = None;
        let previous = self.topology.rcu(|current| {
            let servers: Vec<ServerRecord> = current
                .servers
                .iter()
                .zip(health.iter())
                .map(|(record, info)| record.with_health(Some(info.clone())))
                .collect();
            let primary = servers.iter().rposition(ServerRecord::is_available_primary);

            let next = Arc::new(Topology {
                generation: current.generation + 1,
                servers,
                primary,
            });
            stored = Some(Arc::clone(&next));
            next
        });

        // rcu는 마지막으로 만든 값을 저장하므로 `stored`가 실제로 게시된 스냅샷
        let published = stored.unwrap_or_else(|| self.snapshot());
        if previous.primary != published.primary {
            tracing::info!(
                previous = ?previous.primary,
                current = ?published.primary,
                "primary changed"
            );
        }
        published
    }

    /// 서버 하나의 상태를 `Unknown`으로 내림
    ///
    /// 역할과 지연값은 유지하고 프라이머리 위치도 다시 계산하지 않습니다.
    /// 현재 스냅샷에 적용되며 다음 주기의 게시가 통째로 덮어씁니다.
    /// 실제로 내렸으면 `true`.
    pub fn mark_unknown(&self, index: usize) -> bool {
        let mut applied = false;
        self.topology.rcu(|current| {
            applied = false;
            let eligible = current
                .servers
                .get(index)
                .and_then(|r| r.health.as_ref())
                .is_some_and(|h| h.status != HealthStatus::Unknown);
            if !eligible {
                return Arc::clone(current);
            }

            let mut next = Topology::clone(current);
            if let Some(health) = next.servers[index].health.as_mut() {
                health.status = HealthStatus::Unknown;
            }
            applied = true;
            Arc::new(next)
        });
        applied
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::health::ServerRole;
    use crate::driver::testing::{down, record, up_primary, up_replica};

    fn registry(n: usize) -> ServerRegistry {
        ServerRegistry::new((0..n).map(|i| record(i, None)).collect())
    }

    #[test]
    fn test_new_registry_is_unprobed() {
        let registry = registry(2);
        let topology = registry.snapshot();
        assert!(!topology.is_probed());
        assert_eq!(topology.servers().len(), 2);
        assert!(topology.servers().iter().all(|r| r.health.is_none()));
        assert!(registry.primary().is_none());
    }

    #[test]
    fn test_publish_single_primary() {
        let registry = registry(3);
        let topology = registry.publish(vec![up_replica(5), up_primary(7), down()]);

        assert_eq!(topology.generation(), 1);
        assert_eq!(topology.primary_index(), Some(1));
        assert_eq!(registry.primary().unwrap().index, 1);
    }

    #[test]
    fn test_publish_two_primaries_last_wins() {
        let registry = registry(3);
        registry.publish(vec![up_primary(5), up_replica(5), up_primary(9)]);
        assert_eq!(registry.primary().unwrap().index, 2);
    }

    #[test]
    fn test_publish_primary_must_be_up() {
        let registry = registry(2);
        let mut stale = up_primary(5);
        stale.status = HealthStatus::Error;
        registry.publish(vec![stale, up_replica(5)]);
        assert!(registry.primary().is_none());
    }

    #[test]
    fn test_snapshot_is_not_affected_by_publish() {
        let registry = registry(1);
        registry.publish(vec![up_primary(1)]);
        let before = registry.snapshot();

        registry.publish(vec![down()]);

        assert!(before.servers()[0].is_up());
        assert!(!registry.snapshot().servers()[0].is_up());
    }

    #[test]
    fn test_publish_returns_stored_snapshot() {
        let registry = registry(2);
        let published = registry.publish(vec![up_replica(1), up_primary(2)]);
        assert!(Arc::ptr_eq(&published, &registry.snapshot()));
    }

    #[test]
    fn test_mark_unknown_keeps_role_and_latency() {
        let registry = registry(2);
        let topology = registry.publish(vec![up_primary(3), up_replica(8)]);

        assert!(registry.mark_unknown(1));

        let after = registry.snapshot();
        let health = after.servers()[1].health.as_ref().unwrap();
        assert_eq!(health.status, HealthStatus::Unknown);
        assert_eq!(health.role, ServerRole::Replica);
        assert_eq!(health.latency_ms, Some(8));
        assert_eq!(after.generation(), topology.generation());
        assert!(after.servers()[0].is_up());
        assert!(!registry.mark_unknown(1));
    }

    #[test]
    fn test_mark_unknown_applies_after_newer_cycle() {
        let registry = registry(2);
        registry.publish(vec![up_replica(1), up_replica(2)]);
        registry.publish(vec![up_replica(1), up_replica(2)]);

        assert!(registry.mark_unknown(0));
        assert!(!registry.snapshot().servers()[0].is_up());
    }

    #[test]
    fn test_next_cycle_overwrites_mark_unknown() {
        let registry = registry(1);
        registry.publish(vec![up_primary(3)]);
        assert!(registry.mark_unknown(0));
        assert!(!registry.snapshot().servers()[0].is_up());

        registry.publish(vec![up_primary(4)]);
        assert!(registry.snapshot().servers()[0].is_up());
        assert_eq!(registry.primary().unwrap().index, 0);
    }

    #[test]
    fn test_mark_unknown_before_probe_is_noop() {
        let registry = registry(1);
        assert!(!registry.mark_unknown(0));
        assert!(!registry.mark_unknown(5));
    }
}
