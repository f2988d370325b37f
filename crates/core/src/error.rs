//! 에러 타입 -- 도메인별 에러 정의
//!
//! 시작 시점에 치명적인 에러(`ConfigError`)와 틱 단위로 복구되는 에러
//! (`ParseError`, `WriteError`, `CleanupError`)를 구분합니다.
//! 모든 에러는 [`TrafficwatchError`]로 수렴하므로 상위 레이어에서 `?`로 전파할 수 있습니다.

use std::path::PathBuf;

/// trafficwatch 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum TrafficwatchError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 캡처 인터페이스 에러
    #[error("interface error: {0}")]
    Interface(#[from] InterfaceError),

    /// 로그 라인 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// 출력 파일 쓰기 에러
    #[error("write error: {0}")]
    Write(#[from] WriteError),

    /// 보존 기간 정리 에러
    #[error("cleanup error: {0}")]
    Cleanup(#[from] CleanupError),

    /// 모니터 생명주기 에러
    #[error("monitor error: {0}")]
    Monitor(#[from] MonitorError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// 호스트에 존재하지 않는 네트워크 인터페이스
    #[error("interface '{name}' not found, available: [{}]", available.join(", "))]
    UnknownInterface {
        name: String,
        available: Vec<String>,
    },
}

/// 캡처 인터페이스 에러
///
/// 해당 모니터에만 치명적입니다. 다른 모니터는 계속 동작합니다.
#[derive(Debug, thiserror::Error)]
pub enum InterfaceError {
    /// 캡처 채널을 열 수 없음 (권한 부족, 인터페이스 소실 등)
    #[error("failed to open capture on '{interface}': {reason}")]
    Open { interface: String, reason: String },

    /// 캡처 도중 실패
    #[error("capture failed on '{interface}': {reason}")]
    Capture { interface: String, reason: String },

    /// 지원하지 않는 링크 계층 채널
    #[error("unsupported channel type on '{interface}'")]
    UnsupportedChannel { interface: String },
}

/// 로그 라인 파싱 에러
///
/// 라인 단위로 복구됩니다 (해당 라인만 건너뜀).
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// 로그 문법과 일치하지 않음
    #[error("line does not match access log grammar")]
    GrammarMismatch,

    /// 타임스탬프 형식 오류
    #[error("invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    /// 필드 값 오류
    #[error("invalid value for field '{field}': '{value}'")]
    InvalidField { field: String, value: String },
}

/// 출력 파일 쓰기 에러
///
/// 수집 루프는 이 에러를 로깅하고 다음 틱으로 진행합니다.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// 디렉토리 생성 실패
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 파일 append 실패
    #[error("failed to append to {}: {source}", path.display())]
    Append {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 위장 이름 변경 실패
    #[error("failed to rename {} -> {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 실제 파일과 위장 파일이 동시에 있을 때 합치기 실패
    #[error("failed to merge {} into {}: {source}", from.display(), to.display())]
    Merge {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 보존 기간 정리 에러
///
/// 로깅만 하고 나머지 파일의 정리는 계속합니다.
#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    /// 디렉토리 순회 실패
    #[error("failed to read directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 파일 메타데이터 조회 실패
    #[error("failed to stat {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 파일 삭제 실패
    #[error("failed to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 모니터 생명주기 에러
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// 이미 실행 중인 모니터를 다시 시작함
    #[error("monitor '{name}' is already running")]
    AlreadyRunning { name: String },

    /// 실행 중이 아닌 모니터를 정지함
    #[error("monitor '{name}' is not running")]
    NotRunning { name: String },

    /// 프로듀서 태스크 join 실패
    #[error("monitor '{name}' producer task failed: {reason}")]
    Join { name: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_interface_lists_available() {
        let err = ConfigError::UnknownInterface {
            name: "eth9".to_owned(),
            available: vec!["lo".to_owned(), "eth0".to_owned()],
        };
        let msg = err.to_string();
        assert!(msg.contains("eth9"));
        assert!(msg.contains("lo, eth0"));
    }

    #[test]
    fn write_error_converts_to_top_level() {
        let err = WriteError::Append {
            path: PathBuf::from("/tmp/out/2024-01/20240101.csv"),
            source: std::io::Error::other("disk full"),
        };
        let top: TrafficwatchError = err.into();
        assert!(matches!(top, TrafficwatchError::Write(_)));
        assert!(top.to_string().contains("disk full"));
    }

    #[test]
    fn write_error_exposes_io_source() {
        use std::error::Error;

        let err = WriteError::Rename {
            from: PathBuf::from("a.csv"),
            to: PathBuf::from("a.jpg"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("a.csv -> a.jpg"));
    }

    #[test]
    fn monitor_error_display() {
        let err = MonitorError::AlreadyRunning {
            name: "eth0".to_owned(),
        };
        assert_eq!(err.to_string(), "monitor 'eth0' is already running");
    }
}
