//! 데이터 경로 커넥터
//!
//! 라우터는 쿼리 프로토콜을 직접 구현하지 않습니다. 서버마다 [`Connector`]를
//! 하나씩 만들고, 세션은 그 커넥터가 연 [`Connection`]으로 쿼리를 실행합니다.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::driver::ServerLocation;
use super::error::DriverResult;
use super::record::Record;
use super::session::{Query, QueryResult, ResultSummary};

// ============================================================================
// Connection - 쿼리 실행 연결
// ============================================================================

/// 서버 하나에 대한 열린 연결
#[async_trait]
pub trait Connection: Send + Sync {
    /// 쿼리 실행 후 전체 결과 반환
    async fn run(&self, query: &Query) -> DriverResult<QueryResult>;

    /// 레코드를 `records`로 흘려보내며 쿼리 실행
    ///
    /// 수신 측이 닫히면 남은 레코드는 버려도 됩니다.
    async fn run_streaming(
        &self,
        query: &Query,
        records: mpsc::Sender<Record>,
    ) -> DriverResult<ResultSummary> {
        let result = self.run(query).await?;
        for record in result.records {
            if records.send(record).await.is_err() {
                break;
            }
        }
        Ok(result.summary)
    }

    /// 연결 닫기
    async fn close(&self) -> DriverResult<()>;
}

// ============================================================================
// Connector - 서버별 연결 생성기
// ============================================================================

/// 서버 하나에 대한 연결 생성기
#[async_trait]
pub trait Connector: Send + Sync {
    /// 새 연결 열기
    async fn connect(&self) -> DriverResult<Arc<dyn Connection>>;

    /// 커넥터가 가진 자원 해제 (라우터 종료 시 호출)
    async fn close(&self) -> DriverResult<()> {
        Ok(())
    }
}

// ============================================================================
// ConnectorFactory - 커넥터 팩토리
// ============================================================================

/// 서버 위치로 커넥터를 만드는 팩토리
///
/// 전달되는 위치의 `auth`는 서버별 인증이 없으면 라우터 전역 인증으로 채워져 있습니다.
pub trait ConnectorFactory {
    /// 커넥터 생성
    fn create(&self, location: &ServerLocation) -> DriverResult<Arc<dyn Connector>>;
}

impl<F> ConnectorFactory for F
where
    F: Fn(&ServerLocation) -> DriverResult<Arc<dyn Connector>>,
{
    fn create(&self, location: &ServerLocation) -> DriverResult<Arc<dyn Connector>> {
        self(location)
    }
}
