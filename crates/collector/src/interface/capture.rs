//! 캡처 백엔드 추상화
//!
//! 인터페이스 모니터는 [`CaptureBackend`]에 의존하며, 실제 구현은
//! [`PnetBackend`](pnet `datalink` 채널)입니다. 테스트에서는 미리 준비한 프레임을
//! 돌려주는 백엔드로 교체합니다.

use std::time::{Duration, Instant};

use bytes::Bytes;
use chrono::{DateTime, Local};
use pnet::datalink::{self, Channel, DataLinkReceiver, NetworkInterface};
use tracing::debug;

use trafficwatch_core::InterfaceError;

/// 링크 계층에서 캡처된 원시 프레임
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// 이더넷 프레임 바이트
    pub data: Bytes,
    /// 캡처 시각
    pub captured_at: DateTime<Local>,
}

impl RawFrame {
    /// 지금 캡처된 프레임을 생성합니다.
    pub fn now(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            captured_at: Local::now(),
        }
    }
}

/// 호스트의 캡처 기능
pub trait CaptureBackend: Send + Sync {
    /// 캡처 가능한 인터페이스 이름 목록
    fn interfaces(&self) -> Vec<String>;

    /// 인터페이스에 대한 캡처 핸들을 엽니다.
    fn open(&self, interface: &str) -> Result<Box<dyn PacketCapture>, InterfaceError>;
}

/// 열린 캡처 핸들
pub trait PacketCapture: Send {
    /// 캡처 중인 인터페이스 이름
    fn interface_name(&self) -> &str;

    /// `window` 동안 프레임을 캡처하여 도착 순서대로 `sink`에 전달합니다.
    ///
    /// 윈도우가 지나면 반드시 반환해야 합니다 (블로킹 무기한 대기 금지).
    /// `filter`는 `dst port 22 or dst port 8080` 형식의 BPF 표현식이며,
    /// 커널 필터를 지원하지 않는 구현은 무시할 수 있습니다.
    fn capture_window(
        &mut self,
        filter: &str,
        window: Duration,
        sink: &mut dyn FnMut(RawFrame),
    ) -> Result<(), InterfaceError>;
}

/// pnet `datalink` 기반 캡처 백엔드
#[derive(Debug, Clone)]
pub struct PnetBackend {
    /// 채널 읽기 타임아웃 -- 윈도우 경계를 지키기 위한 폴링 단위
    read_timeout: Duration,
}

impl PnetBackend {
    /// 새 백엔드를 생성합니다.
    pub fn new() -> Self {
        Self {
            read_timeout: Duration::from_millis(250),
        }
    }

    /// 채널 읽기 타임아웃을 지정합니다.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    fn find(&self, interface: &str) -> Option<NetworkInterface> {
        datalink::interfaces()
            .into_iter()
            .find(|iface| iface.name == interface)
    }
}

impl Default for PnetBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for PnetBackend {
    fn interfaces(&self) -> Vec<String> {
        datalink::interfaces()
            .into_iter()
            .map(|iface| iface.name)
            .collect()
    }

    fn open(&self, interface: &str) -> Result<Box<dyn PacketCapture>, InterfaceError> {
        let iface = self.find(interface).ok_or_else(|| InterfaceError::Open {
            interface: interface.to_owned(),
            reason: "interface disappeared".to_owned(),
        })?;

        let config = datalink::Config {
            read_timeout: Some(self.read_timeout),
            ..Default::default()
        };

        match datalink::channel(&iface, config) {
            Ok(Channel::Ethernet(_tx, rx)) => Ok(Box::new(PnetCapture {
                interface: interface.to_owned(),
                rx,
            })),
            Ok(_) => Err(InterfaceError::UnsupportedChannel {
                interface: interface.to_owned(),
            }),
            Err(e) => Err(InterfaceError::Open {
                interface: interface.to_owned(),
                reason: e.to_string(),
            }),
        }
    }
}

/// pnet 이더넷 채널 캡처 핸들
///
/// pnet 채널은 커널 BPF 필터를 받지 않으므로 필터 표현식은 로깅에만 쓰이고,
/// 포트/주소 정책은 [`FramePolicy`](super::FramePolicy)가 사용자 공간에서 적용합니다.
struct PnetCapture {
    interface: String,
    rx: Box<dyn DataLinkReceiver>,
}

impl PacketCapture for PnetCapture {
    fn interface_name(&self) -> &str {
        &self.interface
    }

    fn capture_window(
        &mut self,
        filter: &str,
        window: Duration,
        sink: &mut dyn FnMut(RawFrame),
    ) -> Result<(), InterfaceError> {
        debug!(interface = %self.interface, filter, ?window, "capture window opened");

        let deadline = Instant::now() + window;
        while Instant::now() < deadline {
            match self.rx.next() {
                Ok(frame) => sink(RawFrame::now(Bytes::copy_from_slice(frame))),
                Err(e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::TimedOut
                            | std::io::ErrorKind::WouldBlock
                            | std::io::ErrorKind::Interrupted
                    ) =>
                {
                    continue;
                }
                Err(e) => {
                    return Err(InterfaceError::Capture {
                        interface: self.interface.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
