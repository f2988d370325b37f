#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod metrics;
pub mod record;

// --- 주요 타입 re-export ---

// 에러
pub use error::{
    CleanupError, ConfigError, InterfaceError, MonitorError, ParseError, TrafficwatchError,
    WriteError,
};

// 설정
pub use config::TrafficwatchConfig;

// 레코드
pub use record::{SourceKind, TrafficRecord};
