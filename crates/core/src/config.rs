//! 설정 관리 -- trafficwatch.toml / trafficwatch.yaml 파싱 및 런타임 설정
//!
//! [`TrafficwatchConfig`]는 모든 컴포넌트의 설정을 담는 최상위 구조체입니다.
//! 프로세스 시작 시 한 번 로드되고, 필요한 컴포넌트에 참조나 복제본으로 전달됩니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`TRAFFICWATCH_WRITER_PATH=/data/traffic` 형식)
//! 3. 설정 파일 (`.toml`, 확장자가 `.yaml`/`.yml`이면 YAML)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), trafficwatch_core::error::TrafficwatchError> {
//! use trafficwatch_core::config::TrafficwatchConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드 + 검증
//! let config = TrafficwatchConfig::load("trafficwatch.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = TrafficwatchConfig::parse("[writer]\npath = \"/data/traffic\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, TrafficwatchError};

/// 프록시가 소유하는 포트. 인터페이스 포트 필터에서 항상 제외됩니다.
pub const PROXY_OWNED_PORTS: [u16; 2] = [80, 443];

/// trafficwatch 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrafficwatchConfig {
    /// 일반 설정 (로깅)
    #[serde(default)]
    pub general: GeneralConfig,
    /// 시스템 수준 필터/수집 설정
    #[serde(default)]
    pub system: SystemConfig,
    /// 프록시 연동 설정 (없으면 로그 테일 모니터를 만들지 않음)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middleware: Option<MiddlewareConfig>,
    /// 인터페이스 모니터 목록
    #[serde(default)]
    pub monitors: Vec<InterfaceMonitorConfig>,
    /// 출력 파일 설정
    #[serde(default)]
    pub writer: WriterConfig,
    /// 보존 기간 정리 설정
    #[serde(default)]
    pub observer: ObserverConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl TrafficwatchConfig {
    /// 설정 파일을 로드하고 환경변수 오버라이드를 적용한 뒤 검증합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, TrafficwatchError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일을 로드합니다 (환경변수 오버라이드 및 검증 없음).
    ///
    /// 확장자가 `yaml` 또는 `yml`이면 YAML로, 그 외에는 TOML로 파싱합니다.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, TrafficwatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TrafficwatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                TrafficwatchError::Io(e)
            }
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        if is_yaml {
            Self::parse_yaml(&content)
        } else {
            Self::parse(&content)
        }
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, TrafficwatchError> {
        toml::from_str(toml_str).map_err(|e| {
            TrafficwatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// YAML 문자열에서 설정을 파싱합니다.
    pub fn parse_yaml(yaml_str: &str) -> Result<Self, TrafficwatchError> {
        if yaml_str.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml_str).map_err(|e| {
            TrafficwatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `TRAFFICWATCH_{SECTION}_{FIELD}`
    /// 모니터 목록(`monitors`)은 파일에서만 설정할 수 있습니다.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(
            &mut self.general.log_level,
            "TRAFFICWATCH_GENERAL_LOG_LEVEL",
        );
        override_string(
            &mut self.general.log_format,
            "TRAFFICWATCH_GENERAL_LOG_FORMAT",
        );

        // System
        override_bool(
            &mut self.system.filter_internal_ip,
            "TRAFFICWATCH_SYSTEM_FILTER_INTERNAL_IP",
        );
        override_bool(
            &mut self.system.filter_superfluous_ip,
            "TRAFFICWATCH_SYSTEM_FILTER_SUPERFLUOUS_IP",
        );
        override_u64(&mut self.system.tick_secs, "TRAFFICWATCH_SYSTEM_TICK_SECS");
        override_usize(
            &mut self.system.queue_capacity,
            "TRAFFICWATCH_SYSTEM_QUEUE_CAPACITY",
        );
        override_parsed(
            &mut self.system.drop_policy,
            "TRAFFICWATCH_SYSTEM_DROP_POLICY",
        );

        // Middleware (섹션이 있을 때만)
        if let Some(middleware) = self.middleware.as_mut() {
            override_string(
                &mut middleware.logs_dir,
                "TRAFFICWATCH_MIDDLEWARE_LOGS_DIR",
            );
            override_u64(
                &mut middleware.interval_secs,
                "TRAFFICWATCH_MIDDLEWARE_INTERVAL_SECS",
            );
            override_string(
                &mut middleware.source_tag,
                "TRAFFICWATCH_MIDDLEWARE_SOURCE_TAG",
            );
            override_bool(
                &mut middleware.rediscover,
                "TRAFFICWATCH_MIDDLEWARE_REDISCOVER",
            );
            override_string(&mut middleware.config, "TRAFFICWATCH_MIDDLEWARE_CONFIG");
            override_string(
                &mut middleware.sites_dir,
                "TRAFFICWATCH_MIDDLEWARE_SITES_DIR",
            );
        }

        // Writer
        override_string(&mut self.writer.path, "TRAFFICWATCH_WRITER_PATH");
        override_parsed(&mut self.writer.format, "TRAFFICWATCH_WRITER_FORMAT");
        override_parsed(
            &mut self.writer.interval_type,
            "TRAFFICWATCH_WRITER_INTERVAL_TYPE",
        );
        override_bool(&mut self.writer.fake_img, "TRAFFICWATCH_WRITER_FAKE_IMG");
        override_string(
            &mut self.writer.disguise_extension,
            "TRAFFICWATCH_WRITER_DISGUISE_EXTENSION",
        );

        // Observer
        override_bool(&mut self.observer.enabled, "TRAFFICWATCH_OBSERVER_ENABLED");
        override_u32(
            &mut self.observer.cleanup_days,
            "TRAFFICWATCH_OBSERVER_CLEANUP_DAYS",
        );
        override_u64(
            &mut self.observer.check_interval_secs,
            "TRAFFICWATCH_OBSERVER_CHECK_INTERVAL_SECS",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "TRAFFICWATCH_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "TRAFFICWATCH_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "TRAFFICWATCH_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 인터페이스 이름이 호스트에 존재하는지는 여기서 확인하지 않습니다
    /// (모니터 팩토리가 캡처 백엔드로 확인).
    pub fn validate(&self) -> Result<(), TrafficwatchError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.system.tick_secs == 0 {
            return Err(invalid("system.tick_secs", "must be greater than 0"));
        }

        if let Some(middleware) = &self.middleware {
            if middleware.kind != "nginx" {
                return Err(invalid(
                    "middleware.type",
                    format!("unsupported middleware '{}', expected: nginx", middleware.kind),
                ));
            }
            if middleware.logs_dir.is_empty() {
                return Err(invalid("middleware.logs_dir", "must not be empty"));
            }
            if middleware.interval_secs == 0 {
                return Err(invalid(
                    "middleware.interval_secs",
                    "must be greater than 0",
                ));
            }
            if middleware.source_tag.is_empty() {
                return Err(invalid("middleware.source_tag", "must not be empty"));
            }
        }

        let mut seen = HashSet::new();
        for (idx, monitor) in self.monitors.iter().enumerate() {
            if monitor.interface.is_empty() {
                return Err(invalid(
                    &format!("monitors[{idx}].interface"),
                    "must not be empty",
                ));
            }
            if monitor.interval == 0 {
                return Err(invalid(
                    &format!("monitors[{idx}].interval"),
                    "must be greater than 0",
                ));
            }
            if !seen.insert(monitor.interface.as_str()) {
                return Err(invalid(
                    &format!("monitors[{idx}].interface"),
                    format!("interface '{}' is configured more than once", monitor.interface),
                ));
            }
        }

        if self.writer.path.is_empty() {
            return Err(invalid("writer.path", "must not be empty"));
        }

        let ext = self.writer.disguise_extension.as_str();
        if ext.is_empty() || ext.contains(['.', '/', '\\']) {
            return Err(invalid(
                "writer.disguise_extension",
                "must be a bare extension such as 'jpg'",
            ));
        }
        if ext.eq_ignore_ascii_case(self.writer.format.extension()) {
            return Err(invalid(
                "writer.disguise_extension",
                "must differ from the output format extension",
            ));
        }

        if self.observer.enabled {
            if self.observer.cleanup_days == 0 {
                return Err(invalid("observer.cleanup_days", "must be greater than 0"));
            }
            if self.observer.check_interval_secs == 0 {
                return Err(invalid(
                    "observer.check_interval_secs",
                    "must be greater than 0",
                ));
            }
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid("metrics.port", "must be greater than 0"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> TrafficwatchError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 시스템 수준 필터 및 수집 루프 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// 내부망 출발지 주소를 캡처에서 제외
    pub filter_internal_ip: bool,
    /// 배치 내 같은 흐름의 인터페이스 레코드를 하나로 병합
    pub filter_superfluous_ip: bool,
    /// 수집 루프 틱 주기 (초)
    pub tick_secs: u64,
    /// 모니터별 큐 최대 크기 (0 = 무제한)
    pub queue_capacity: usize,
    /// 큐가 가득 찼을 때의 드롭 정책
    pub drop_policy: DropPolicy,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            filter_internal_ip: false,
            filter_superfluous_ip: false,
            tick_secs: 5,
            queue_capacity: 0,
            drop_policy: DropPolicy::Oldest,
        }
    }
}

/// 큐 오버플로 시 드롭 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// 가장 오래된 레코드를 버리고 새 레코드를 추가
    #[default]
    Oldest,
    /// 새 레코드를 버림
    Newest,
}

impl std::str::FromStr for DropPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "oldest" => Ok(Self::Oldest),
            "newest" => Ok(Self::Newest),
            other => Err(format!("unknown drop policy '{other}'")),
        }
    }
}

/// 프록시 연동 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MiddlewareConfig {
    /// 프록시 종류 (현재 "nginx"만 지원)
    #[serde(rename = "type")]
    pub kind: String,
    /// 접근 로그 디렉토리
    pub logs_dir: String,
    /// 로그 파싱 주기 (초)
    pub interval_secs: u64,
    /// 레코드의 `source_id`로 사용할 태그
    pub source_tag: String,
    /// 매 틱마다 디렉토리를 다시 스캔하여 새 사이트 로그를 추적
    pub rediscover: bool,
    /// 프록시 주 설정 파일 (`init-nginx`가 `log_format`을 추가)
    pub config: String,
    /// 사이트별 설정 디렉토리 (`init-nginx`가 `access_log`를 수정)
    pub sites_dir: String,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            kind: "nginx".to_owned(),
            logs_dir: "/var/log/nginx".to_owned(),
            interval_secs: 5,
            source_tag: "nginx".to_owned(),
            rediscover: false,
            config: "/etc/nginx/nginx.conf".to_owned(),
            sites_dir: "/etc/nginx/conf.d".to_owned(),
        }
    }
}

/// 인터페이스 모니터 항목
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceMonitorConfig {
    /// 캡처할 네트워크 인터페이스 이름
    pub interface: String,
    /// 캡처 윈도우 길이 (초)
    #[serde(default = "default_monitor_interval")]
    pub interval: u64,
    /// 목적지 포트 필터 (없으면 모든 포트)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<u16>>,
}

fn default_monitor_interval() -> u64 {
    5
}

/// 출력 파일 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// 헤더가 있는 CSV
    #[default]
    Csv,
    /// 사람이 읽기 위한 텍스트 라인
    Txt,
    /// 로그 레벨 접두사가 붙은 텍스트 라인
    Log,
}

impl OutputFormat {
    /// 파일 확장자
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Txt => "txt",
            Self::Log => "log",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "txt" => Ok(Self::Txt),
            "log" => Ok(Self::Log),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

/// 출력 파일 회전 단위
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalType {
    /// 시간 단위
    Hour,
    /// 일 단위
    #[default]
    Day,
    /// 주 단위
    Week,
}

impl std::str::FromStr for IntervalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            other => Err(format!("unknown interval type '{other}'")),
        }
    }
}

/// 출력 파일 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// 출력 루트 디렉토리
    pub path: String,
    /// 출력 형식
    pub format: OutputFormat,
    /// 파일 회전 단위
    pub interval_type: IntervalType,
    /// 쓰기 후 파일 확장자를 위장
    pub fake_img: bool,
    /// 위장에 사용할 확장자
    pub disguise_extension: String,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            path: "/var/lib/trafficwatch".to_owned(),
            format: OutputFormat::Csv,
            interval_type: IntervalType::Day,
            fake_img: false,
            disguise_extension: "jpg".to_owned(),
        }
    }
}

/// 보존 기간 정리 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 보존 기간 (일)
    pub cleanup_days: u32,
    /// 정리 주기 (초)
    pub check_interval_secs: u64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cleanup_days: 7,
            check_interval_secs: 3600,
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 수신 주소
    pub listen_addr: String,
    /// 수신 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9108,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    override_parsed(target, env_key);
}

fn override_usize(target: &mut usize, env_key: &str) {
    override_parsed(target, env_key);
}

fn override_u16(target: &mut u16, env_key: &str) {
    override_parsed(target, env_key);
}

fn override_u32(target: &mut u32, env_key: &str) {
    override_parsed(target, env_key);
}

fn override_u64(target: &mut u64, env_key: &str) {
    override_parsed(target, env_key);
}

fn override_parsed<T: std::str::FromStr>(target: &mut T, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                expected = std::any::type_name::<T>(),
                "failed to parse env var, ignoring"
            ),
        }
    }
}
