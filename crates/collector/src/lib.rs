#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`queue`]: 모니터별 레코드 큐
//! - [`monitor`]: 모니터 생명주기 trait
//! - [`interface`]: 인터페이스 패킷 캡처 모니터
//! - [`log_tail`]: 접근 로그 테일 모니터
//! - [`factory`]: 설정 기반 모니터 조립

pub mod factory;
pub mod interface;
pub mod log_tail;
pub mod monitor;
pub mod queue;

pub use factory::build_monitors;
pub use interface::{CaptureBackend, InterfaceMonitor, PacketCapture, PnetBackend, RawFrame};
pub use log_tail::{
    AccessLogEntry, AccessLogParser, LogTailMonitor, LogTailState, NGINX_LOG_FORMAT,
    NGINX_LOG_FORMAT_NAME,
};
pub use monitor::{BoxFuture, DynMonitor, Monitor, MonitorState};
pub use queue::{QueueStats, RecordQueue};
