//! 모니터 trait -- 레코드 프로듀서의 생명주기 추상화
//!
//! 모든 모니터는 자기 큐를 소유하고, `start`로 백그라운드 프로듀서 루프를 띄우며,
//! `stop`은 그 루프가 완전히 종료될 때까지 기다립니다.
//!
//! # 생명주기
//! ```text
//! Idle → start() → Running → stop() → Stopped
//!                     │
//!                     └── 캡처 소스 실패 → Failed
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio_util::sync::CancellationToken;

use trafficwatch_core::{SourceKind, TrafficRecord, TrafficwatchError};

use crate::queue::{QueueStats, RecordQueue};

/// `Send` 박스 퓨처
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 모니터 생명주기 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// 생성됨, 아직 시작 전
    Idle,
    /// 프로듀서 루프 실행 중
    Running,
    /// 정상 정지
    Stopped,
    /// 캡처 소스 실패로 루프 종료
    Failed,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// 프로듀서 루프와 공유하는 상태 셀
#[derive(Debug, Clone)]
pub(crate) struct SharedState(Arc<AtomicU8>);

impl SharedState {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicU8::new(0)))
    }

    pub(crate) fn get(&self) -> MonitorState {
        match self.0.load(Ordering::Acquire) {
            0 => MonitorState::Idle,
            1 => MonitorState::Running,
            2 => MonitorState::Stopped,
            _ => MonitorState::Failed,
        }
    }

    pub(crate) fn set(&self, state: MonitorState) {
        let raw = match state {
            MonitorState::Idle => 0,
            MonitorState::Running => 1,
            MonitorState::Stopped => 2,
            MonitorState::Failed => 3,
        };
        self.0.store(raw, Ordering::Release);
    }
}

/// 레코드 프로듀서 trait
///
/// # 구현 예시
/// ```ignore
/// impl Monitor for MyMonitor {
///     fn name(&self) -> &str { &self.name }
///     fn kind(&self) -> SourceKind { SourceKind::Interface }
///     fn state(&self) -> MonitorState { self.state.get() }
///     fn queue(&self) -> &RecordQueue { &self.queue }
///
///     async fn start(&mut self, cancel: CancellationToken) -> Result<(), TrafficwatchError> {
///         // 프로듀서 태스크 spawn
///         Ok(())
///     }
///     async fn stop(&mut self) -> Result<(), TrafficwatchError> {
///         // 취소 후 태스크 join
///         Ok(())
///     }
/// }
/// ```
pub trait Monitor: Send + Sync {
    /// 모니터 이름 (인터페이스 이름 또는 로그 소스 태그)
    fn name(&self) -> &str;

    /// 생산하는 레코드의 출처 종류
    fn kind(&self) -> SourceKind;

    /// 현재 생명주기 상태
    fn state(&self) -> MonitorState;

    /// 이 모니터의 레코드 큐
    fn queue(&self) -> &RecordQueue;

    /// 백그라운드 프로듀서 루프를 시작합니다.
    ///
    /// `cancel`이 취소되거나 `stop()`이 호출되면 루프가 끝납니다.
    /// 이미 실행 중이면 `MonitorError::AlreadyRunning`을 반환합니다.
    fn start(
        &mut self,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<(), TrafficwatchError>> + Send;

    /// 프로듀서 루프에 종료를 알리고, 루프가 끝날 때까지 기다립니다.
    ///
    /// 반환 이후에는 큐에 새 레코드가 들어오지 않습니다.
    /// 이미 적재된 레코드는 큐에 남아 있습니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), TrafficwatchError>> + Send;

    /// 큐의 모든 레코드를 블로킹 없이 꺼냅니다.
    fn drain(&self) -> Vec<TrafficRecord> {
        self.queue().drain_all()
    }

    /// 큐 통계
    fn queue_stats(&self) -> QueueStats {
        self.queue().stats()
    }
}

/// dyn-compatible 모니터 trait
///
/// `Monitor`는 RPITIT를 사용하므로 `dyn Monitor`가 불가합니다.
/// 수집 루프는 `Vec<Box<dyn DynMonitor>>`로 서로 다른 모니터를 함께 관리합니다.
pub trait DynMonitor: Send + Sync {
    /// 모니터 이름
    fn name(&self) -> &str;

    /// 출처 종류
    fn kind(&self) -> SourceKind;

    /// 현재 상태
    fn state(&self) -> MonitorState;

    /// 프로듀서 루프를 시작합니다.
    fn start(&mut self, cancel: CancellationToken) -> BoxFuture<'_, Result<(), TrafficwatchError>>;

    /// 프로듀서 루프를 정지하고 종료를 기다립니다.
    fn stop(&mut self) -> BoxFuture<'_, Result<(), TrafficwatchError>>;

    /// 큐를 비웁니다.
    fn drain(&self) -> Vec<TrafficRecord>;

    /// 큐 통계
    fn queue_stats(&self) -> QueueStats;
}

/// Monitor를 구현한 타입은 자동으로 DynMonitor도 구현됩니다.
impl<T: Monitor> DynMonitor for T {
    fn name(&self) -> &str {
        Monitor::name(self)
    }

    fn kind(&self) -> SourceKind {
        Monitor::kind(self)
    }

    fn state(&self) -> MonitorState {
        Monitor::state(self)
    }

    fn start(&mut self, cancel: CancellationToken) -> BoxFuture<'_, Result<(), TrafficwatchError>> {
        Box::pin(Monitor::start(self, cancel))
    }

    fn stop(&mut self) -> BoxFuture<'_, Result<(), TrafficwatchError>> {
        Box::pin(Monitor::stop(self))
    }

    fn drain(&self) -> Vec<TrafficRecord> {
        Monitor::drain(self)
    }

    fn queue_stats(&self) -> QueueStats {
        Monitor::queue_stats(self)
    }
}
