//! 토폴로지 모니터
//!
//! 모든 서버를 주기적으로 프로브해 레지스트리에 결과를 게시합니다.
//!
//! - 생성 즉시 첫 주기를 실행하고, 끝나면 준비 신호를 한 번 보냅니다.
//! - 이후 고정 간격마다 새 주기를 별도 태스크로 띄웁니다. 주기가 간격보다
//!   오래 걸리면 다음 주기와 겹칠 수 있고, 나중에 게시한 쪽이 이깁니다.
//! - [`TopologyMonitor::stop`]은 타이머만 멈추고 진행 중인 주기는 끝까지 실행됩니다.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info};

use super::super::error::{DriverError, DriverResult};
use super::health::HealthCheck;
use super::table::{ServerRegistry, Topology};

/// 모니터 공유 상태
struct MonitorShared {
    registry: Arc<ServerRegistry>,
    probe: Arc<dyn HealthCheck>,
    cycles: AtomicU64,
}

impl MonitorShared {
    /// 프로브 한 주기: 모든 서버를 동시에 프로브한 뒤 한 번에 게시
    async fn run_cycle(&self) -> Arc<Topology> {
        let snapshot = self.registry.snapshot();
        let health = join_all(
            snapshot
                .servers()
                .iter()
                .map(|record| self.probe.check(&record.location)),
        )
        .await;

        let published = self.registry.publish(health);
        self.cycles.fetch_add(1, Ordering::Relaxed);
        debug!(
            generation = published.generation(),
            up = published.servers().iter().filter(|r| r.is_up()).count(),
            primary = ?published.primary_index(),
            "probe cycle complete"
        );
        published
    }
}

// ============================================================================
// TopologyMonitor - 백그라운드 프로브
// ============================================================================

/// 백그라운드 헬스 모니터
pub struct TopologyMonitor {
    shared: Arc<MonitorShared>,
    interval: Duration,
    ticker: Mutex<Option<JoinHandle<()>>>,
    ready: watch::Receiver<bool>,
}

impl TopologyMonitor {
    /// 모니터 시작
    ///
    /// tokio 런타임 안에서 호출해야 합니다.
    pub fn start(
        registry: Arc<ServerRegistry>,
        probe: Arc<dyn HealthCheck>,
        interval: Duration,
    ) -> Self {
        let shared = Arc::new(MonitorShared {
            registry,
            probe,
            cycles: AtomicU64::new(0),
        });
        let (ready_tx, ready_rx) = watch::channel(false);

        let first = Arc::clone(&shared);
        tokio::spawn(async move {
            first.run_cycle().await;
            ready_tx.send_replace(true);
        });

        let ticking = Arc::clone(&shared);
        let ticker = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + interval, interval);
            loop {
                ticks.tick().await;
                let cycle = Arc::clone(&ticking);
                tokio::spawn(async move {
                    cycle.run_cycle().await;
                });
            }
        });

        info!(
            servers = shared.registry.snapshot().servers().len(),
            interval_ms = interval.as_millis() as u64,
            "topology monitor started"
        );

        Self {
            shared,
            interval,
            ticker: Mutex::new(Some(ticker)),
            ready: ready_rx,
        }
    }

    /// 첫 주기 완료까지 대기
    pub async fn ready(&self) -> DriverResult<()> {
        let mut ready = self.ready.clone();
        ready
            .wait_for(|done| *done)
            .await
            .map(|_| ())
            .map_err(|_| DriverError::internal("Initial probe cycle did not complete"))
    }

    /// 첫 주기 완료 여부
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// 주기를 즉시 한 번 실행하고 게시된 스냅샷 반환
    pub async fn refresh(&self) -> Arc<Topology> {
        self.shared.run_cycle().await
    }

    /// 완료된 주기 수
    pub fn cycles(&self) -> u64 {
        self.shared.cycles.load(Ordering::Relaxed)
    }

    /// 프로브 간격
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 타이머 동작 여부
    pub fn is_running(&self) -> bool {
        self.ticker
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// 타이머 정지 (여러 번 호출해도 안전)
    pub fn stop(&self) {
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
            info!("topology monitor stopped");
        }
    }
}

impl Drop for TopologyMonitor {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.get_mut().take() {
            handle.abort();
        }
    }
}

impl fmt::Debug for TopologyMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopologyMonitor")
            .field("interval", &self.interval)
            .field("cycles", &self.cycles())
            .field("ready", &self.is_ready())
            .field("running", &self.is_running())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
