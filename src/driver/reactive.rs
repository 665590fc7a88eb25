//! Result Streams
//!
//! tokio-stream 기반 비동기 결과 스트림
//!
//! # Example
//!
//! ```ignore
//! use futures::StreamExt;
//! use zeta4g_ha::driver::reactive::StreamEvent;
//!
//! let mut stream = session.run_stream("MATCH (n) RETURN n", None).await?;
//! while let Some(event) = stream.next().await {
//!     match event {
//!         StreamEvent::Record(record) => println!("{}", record),
//!         StreamEvent::Completed(summary) => println!("served by {:?}", summary.server()),
//!         StreamEvent::Failed(err) => return Err(err),
//!     }
//! }
//! ```

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use super::error::{DriverError, DriverResult};
use super::record::Record;
use super::session::{QueryResult, ResultSummary};

// ============================================================================
// StreamEvent - 스트림 이벤트
// ============================================================================

/// 스트림 이벤트
///
/// 레코드가 0개 이상 온 뒤 `Completed` 또는 `Failed` 중 하나로 끝납니다.
#[derive(Debug)]
pub enum StreamEvent {
    /// 레코드
    Record(Record),
    /// 정상 종료 (실행 서버 정보 포함)
    Completed(ResultSummary),
    /// 실패 종료
    Failed(DriverError),
}

impl StreamEvent {
    /// 종료 이벤트 여부
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Record(_))
    }
}

// ============================================================================
// ResultStream - 결과 스트림
// ============================================================================

/// 비동기 결과 스트림
///
/// 버퍼가 가득 차면 생산 측이 기다리므로 소비 속도가 곧 실행 속도입니다.
pub struct ResultStream {
    inner: ReceiverStream<StreamEvent>,
}

impl ResultStream {
    /// 버퍼 크기 `capacity`의 송신 측과 스트림 생성
    pub fn channel(capacity: usize) -> (mpsc::Sender<StreamEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            tx,
            Self {
                inner: ReceiverStream::new(rx),
            },
        )
    }

    /// 다음 이벤트
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.inner.next().await
    }

    /// 레코드를 모두 모아 단일 결과로 변환
    pub async fn collect_result(mut self) -> DriverResult<QueryResult> {
        let mut records = Vec::new();
        while let Some(event) = self.inner.next().await {
            match event {
                StreamEvent::Record(record) => records.push(record),
                StreamEvent::Completed(summary) => {
                    let keys = records
                        .first()
                        .map(|r| r.keys().to_vec())
                        .unwrap_or_default();
                    return Ok(QueryResult::new(keys, records, summary));
                }
                StreamEvent::Failed(err) => return Err(err),
            }
        }
        Err(DriverError::internal("Result stream ended without a summary"))
    }

    /// 레코드만 모으기 (실패 시 에러)
    pub async fn try_collect(self) -> DriverResult<Vec<Record>> {
        self.collect_result().await.map(|result| result.records)
    }
}

impl Stream for ResultStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl fmt::Debug for ResultStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultStream").finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
