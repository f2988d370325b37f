//! 인터페이스 캡처 모니터
//!
//! [`InterfaceMonitor`]는 네트워크 인터페이스 하나를 소유합니다. 프로듀서 루프는
//! 블로킹 스레드(`spawn_blocking`)에서 고정 길이 캡처 윈도우를 반복하며,
//! 도착한 프레임을 디코딩하고 [`FramePolicy`]로 거른 뒤 큐에 적재합니다.
//!
//! # 사용 예시
//! ```ignore
//! let mut monitor = InterfaceMonitor::builder("eth0")
//!     .poll_interval(Duration::from_secs(5))
//!     .ports(Some(vec![22, 8080]))
//!     .exclude_internal(true)
//!     .build(Arc::new(PnetBackend::new()))?;
//!
//! monitor.start(cancel.child_token()).await?;
//! let records = monitor.drain();
//! ```

pub mod capture;
pub mod decode;
pub mod filter;

pub use capture::{CaptureBackend, PacketCapture, PnetBackend, RawFrame};
pub use decode::{DecodedFrame, decode_frame};
pub use filter::{FramePolicy, is_internal};

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use trafficwatch_core::config::DropPolicy;
use trafficwatch_core::metrics as m;
use trafficwatch_core::{
    ConfigError, MonitorError, SourceKind, TrafficRecord, TrafficwatchError,
};

use crate::monitor::{Monitor, MonitorState, SharedState};
use crate::queue::RecordQueue;

/// 인터페이스 모니터 빌더
pub struct InterfaceMonitorBuilder {
    interface: String,
    poll_interval: Duration,
    ports: Option<Vec<u16>>,
    exclude_internal: bool,
    queue_capacity: usize,
    drop_policy: DropPolicy,
}

impl InterfaceMonitorBuilder {
    fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            poll_interval: Duration::from_secs(5),
            ports: None,
            exclude_internal: false,
            queue_capacity: 0,
            drop_policy: DropPolicy::Oldest,
        }
    }

    /// 캡처 윈도우 길이 (기본: 5초)
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// 목적지 포트 필터
    pub fn ports(mut self, ports: Option<Vec<u16>>) -> Self {
        self.ports = ports;
        self
    }

    /// 내부망 출발지 제외 여부
    pub fn exclude_internal(mut self, exclude: bool) -> Self {
        self.exclude_internal = exclude;
        self
    }

    /// 큐 용량과 드롭 정책 (용량 0 = 무제한)
    pub fn queue(mut self, capacity: usize, drop_policy: DropPolicy) -> Self {
        self.queue_capacity = capacity;
        self.drop_policy = drop_policy;
        self
    }

    /// 모니터를 생성합니다.
    ///
    /// # 에러
    /// - `ConfigError::UnknownInterface`: 호스트에 없는 인터페이스
    /// - `ConfigError::InvalidValue`: 캡처 윈도우가 0
    pub fn build(self, backend: Arc<dyn CaptureBackend>) -> Result<InterfaceMonitor, ConfigError> {
        let available = backend.interfaces();
        if !available.iter().any(|name| name == &self.interface) {
            return Err(ConfigError::UnknownInterface {
                name: self.interface,
                available,
            });
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: format!("monitors[{}].interval", self.interface),
                reason: "must be greater than 0".to_owned(),
            });
        }

        let policy = FramePolicy::new(self.ports.as_deref(), self.exclude_internal);
        let queue = RecordQueue::new(&self.interface, self.queue_capacity, self.drop_policy);

        Ok(InterfaceMonitor {
            name: self.interface,
            window: self.poll_interval,
            policy,
            backend,
            queue,
            state: SharedState::new(),
            cancel: None,
            handle: None,
        })
    }
}

/// 네트워크 인터페이스 캡처 모니터
pub struct InterfaceMonitor {
    name: String,
    window: Duration,
    policy: FramePolicy,
    backend: Arc<dyn CaptureBackend>,
    queue: RecordQueue,
    state: SharedState,
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl InterfaceMonitor {
    /// 빌더를 생성합니다.
    pub fn builder(interface: impl Into<String>) -> InterfaceMonitorBuilder {
        InterfaceMonitorBuilder::new(interface)
    }

    /// 적용 중인 프레임 정책
    pub fn policy(&self) -> &FramePolicy {
        &self.policy
    }

    /// 캡처 윈도우 길이
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Monitor for InterfaceMonitor {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Interface
    }

    fn state(&self) -> MonitorState {
        self.state.get()
    }

    fn queue(&self) -> &RecordQueue {
        &self.queue
    }

    async fn start(&mut self, cancel: CancellationToken) -> Result<(), TrafficwatchError> {
        if self.handle.is_some() {
            return Err(MonitorError::AlreadyRunning {
                name: self.name.clone(),
            }
            .into());
        }

        let mut capture = match self.backend.open(&self.name) {
            Ok(capture) => capture,
            Err(e) => {
                self.state.set(MonitorState::Failed);
                return Err(e.into());
            }
        };

        let filter = self.policy.bpf_expression();
        let policy = self.policy.clone();
        let queue = self.queue.clone();
        let state = self.state.clone();
        let name = self.name.clone();
        let window = self.window;
        let loop_cancel = cancel.clone();

        info!(
            interface = %name,
            window_secs = window.as_secs_f64(),
            filter = %filter,
            exclude_internal = policy.excludes_internal(),
            "interface monitor starting"
        );

        self.state.set(MonitorState::Running);
        let handle = tokio::task::spawn_blocking(move || {
            let mut sink = |frame: RawFrame| {
                let Some(decoded) = decode_frame(&frame.data) else {
                    return;
                };
                if !policy.accepts(&decoded) {
                    counter!(m::COLLECTOR_FRAMES_FILTERED_TOTAL, m::LABEL_MONITOR => name.clone())
                        .increment(1);
                    return;
                }
                queue.push(TrafficRecord::interface(
                    frame.captured_at,
                    name.as_str(),
                    decoded.src_ip.to_string(),
                    decoded.src_port,
                ));
            };

            while !loop_cancel.is_cancelled() {
                if let Err(e) = capture.capture_window(&filter, window, &mut sink) {
                    error!(interface = %capture.interface_name(), error = %e, "capture failed, monitor stopping");
                    state.set(MonitorState::Failed);
                    return;
                }
            }
            debug!(interface = %capture.interface_name(), "capture loop exited");
        });

        self.cancel = Some(cancel);
        self.handle = Some(handle);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), TrafficwatchError> {
        let Some(handle) = self.handle.take() else {
            return Err(MonitorError::NotRunning {
                name: self.name.clone(),
            }
            .into());
        };
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }

        // 진행 중인 캡처 윈도우가 끝날 때까지 대기
        handle.await.map_err(|e| MonitorError::Join {
            name: self.name.clone(),
            reason: e.to_string(),
        })?;

        if self.state.get() != MonitorState::Failed {
            self.state.set(MonitorState::Stopped);
        }
        info!(
            interface = %self.name,
            queued = self.queue.len(),
            "interface monitor stopped"
        );
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::time::Instant;

    use super::decode::build::{PROTO_TCP, PROTO_UDP, ipv4_frame};
    use super::mock::ScriptedBackend;
    use super::*;

    async fn wait_for_len(queue: &RecordQueue, len: usize) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while queue.len() < len && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn external(dport: u16) -> Vec<u8> {
        ipv4_frame(
            Ipv4Addr::new(203, 0, 113, 9),
            Ipv4Addr::new(198, 51, 100, 1),
            PROTO_TCP,
            51000,
            dport,
        )
    }

    #[test]
    fn build_rejects_unknown_interface() {
        let backend = Arc::new(ScriptedBackend::new(&["lo", "eth0"], vec![]));
        let err = InterfaceMonitor::builder("eth9").build(backend).err().unwrap();
        match err {
            ConfigError::UnknownInterface { name, available } => {
                assert_eq!(name, "eth9");
                assert_eq!(available, vec!["lo", "eth0"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn build_rejects_zero_window() {
        let backend = Arc::new(ScriptedBackend::new(&["eth0"], vec![]));
        let result = InterfaceMonitor::builder("eth0")
            .poll_interval(Duration::ZERO)
            .build(backend);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn new_monitor_is_idle() {
        let backend = Arc::new(ScriptedBackend::new(&["eth0"], vec![]));
        let monitor = InterfaceMonitor::builder("eth0").build(backend).unwrap();
        assert_eq!(Monitor::state(&monitor), MonitorState::Idle);
        assert_eq!(Monitor::kind(&monitor), SourceKind::Interface);
    }

    #[tokio::test]
    async fn accepted_frames_become_interface_records() {
        let frames = vec![
            external(22),
            external(80),
            ipv4_frame(
                Ipv4Addr::new(192, 168, 1, 20),
                Ipv4Addr::new(198, 51, 100, 1),
                PROTO_TCP,
                40000,
                22,
            ),
            ipv4_frame(
                Ipv4Addr::new(8, 8, 4, 4),
                Ipv4Addr::new(198, 51, 100, 1),
                PROTO_UDP,
                5353,
                8080,
            ),
            vec![0u8; 6],
        ];
        let backend = Arc::new(ScriptedBackend::new(&["eth0"], frames));
        let mut monitor = InterfaceMonitor::builder("eth0")
            .poll_interval(Duration::from_millis(20))
            .ports(Some(vec![22, 80, 8080]))
            .exclude_internal(true)
            .build(backend)
            .unwrap();

        Monitor::start(&mut monitor, CancellationToken::new()).await.unwrap();
        assert_eq!(Monitor::state(&monitor), MonitorState::Running);
        wait_for_len(Monitor::queue(&monitor), 2).await;
        Monitor::stop(&mut monitor).await.unwrap();
        assert_eq!(Monitor::state(&monitor), MonitorState::Stopped);

        let records = Monitor::drain(&monitor);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].src_ip, "203.0.113.9");
        assert_eq!(records[0].src_port, 51000);
        assert_eq!(records[0].source_id, "eth0");
        assert!(records[0].request_url.is_none());
        assert_eq!(records[1].src_ip, "8.8.4.4");
    }

    #[tokio::test]
    async fn no_records_after_stop_returns() {
        let backend = Arc::new(ScriptedBackend::new(&["eth0"], vec![external(22); 50]));
        let mut monitor = InterfaceMonitor::builder("eth0")
            .poll_interval(Duration::from_millis(10))
            .build(backend)
            .unwrap();

        Monitor::start(&mut monitor, CancellationToken::new()).await.unwrap();
        Monitor::stop(&mut monitor).await.unwrap();
        let len_after_stop = Monitor::queue(&monitor).len();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(Monitor::queue(&monitor).len(), len_after_stop);
    }

    #[tokio::test]
    async fn parent_cancellation_ends_loop() {
        let backend = Arc::new(ScriptedBackend::new(&["eth0"], vec![]));
        let mut monitor = InterfaceMonitor::builder("eth0")
            .poll_interval(Duration::from_millis(10))
            .build(backend)
            .unwrap();
        let parent = CancellationToken::new();

        Monitor::start(&mut monitor, parent.child_token()).await.unwrap();
        parent.cancel();
        Monitor::stop(&mut monitor).await.unwrap();
        assert_eq!(Monitor::state(&monitor), MonitorState::Stopped);
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let backend = Arc::new(ScriptedBackend::new(&["eth0"], vec![]));
        let mut monitor = InterfaceMonitor::builder("eth0")
            .poll_interval(Duration::from_millis(10))
            .build(backend)
            .unwrap();

        Monitor::start(&mut monitor, CancellationToken::new()).await.unwrap();
        let err = Monitor::start(&mut monitor, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TrafficwatchError::Monitor(MonitorError::AlreadyRunning { .. })
        ));
        Monitor::stop(&mut monitor).await.unwrap();
    }

    #[tokio::test]
    async fn stop_without_start_is_rejected() {
        let backend = Arc::new(ScriptedBackend::new(&["eth0"], vec![]));
        let mut monitor = InterfaceMonitor::builder("eth0").build(backend).unwrap();
        let err = Monitor::stop(&mut monitor).await.unwrap_err();
        assert!(matches!(
            err,
            TrafficwatchError::Monitor(MonitorError::NotRunning { .. })
        ));
    }

    #[tokio::test]
    async fn open_failure_marks_monitor_failed() {
        let mut backend = ScriptedBackend::new(&["eth0"], vec![]);
        backend.fail_open = true;
        let mut monitor = InterfaceMonitor::builder("eth0")
            .build(Arc::new(backend))
            .unwrap();

        let err = Monitor::start(&mut monitor, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TrafficwatchError::Interface(_)));
        assert_eq!(Monitor::state(&monitor), MonitorState::Failed);
    }

    #[tokio::test]
    async fn capture_failure_marks_monitor_failed() {
        let mut backend = ScriptedBackend::new(&["eth0"], vec![]);
        backend.fail_capture = true;
        let mut monitor = InterfaceMonitor::builder("eth0")
            .poll_interval(Duration::from_millis(10))
            .build(Arc::new(backend))
            .unwrap();

        Monitor::start(&mut monitor, CancellationToken::new()).await.unwrap();
        Monitor::stop(&mut monitor).await.unwrap();
        assert_eq!(Monitor::state(&monitor), MonitorState::Failed);
    }
}
