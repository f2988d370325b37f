//! nginx 접근 로그 파서
//!
//! 프록시가 남기는 파이프 구분 형식 한 줄을 파싱합니다:
//!
//! ```text
//! remote_addr|remote_port|[time_local]|scheme://host+uri|status body_bytes|"referer"|[UA]user_agent[UA]|server_addr|server_port
//! ```
//!
//! `time_local`은 `%d/%b/%Y:%H:%M:%S %z` 형식입니다.

use chrono::{DateTime, FixedOffset, Local};
use regex::Regex;

use trafficwatch_core::{ParseError, TrafficRecord};

const ACCESS_LOG_PATTERN: &str = r#"^(\S+)\|(\S+)\|\[([^\]]+)\]\|([^|]+)\|(\d+)\s+(\d+)\|"([^"]*)"\|\[UA\]([^|]+)\[UA\]\|(\S+)\|(\S+)"#;

const TIME_LOCAL_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// 위 형식의 로그를 남기도록 nginx `http` 블록에 넣는 지시어 (끝의 `;` 제외)
pub const NGINX_LOG_FORMAT: &str = r#"log_format custom '$remote_addr|$remote_port|[$time_local]|$scheme://$http_host$request_uri|$status $body_bytes_sent|"$http_referer"|[UA]$http_user_agent[UA]|$server_addr|$server_port'"#;

/// [`NGINX_LOG_FORMAT`]의 이름. 사이트의 `access_log` 지시어가 참조합니다.
pub const NGINX_LOG_FORMAT_NAME: &str = "custom";

/// 파싱된 접근 로그 한 줄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessLogEntry {
    /// 클라이언트 주소
    pub remote_addr: String,
    /// 클라이언트 포트 (`-` 등 숫자가 아니면 0)
    pub remote_port: u16,
    /// 요청 시각 (로그에 기록된 오프셋 유지)
    pub time: DateTime<FixedOffset>,
    /// 요청 URL (`scheme://host+uri`)
    pub request_url: String,
    /// HTTP 상태 코드
    pub status: u16,
    /// 응답 바디 크기
    pub body_bytes: u64,
    /// Referer
    pub referer: String,
    /// User-Agent
    pub user_agent: String,
    /// 서버 주소
    pub server_addr: String,
    /// 서버 포트
    pub server_port: String,
}

impl AccessLogEntry {
    /// 로컬 타임존의 레코드로 변환합니다.
    pub fn into_record(self, source_tag: &str) -> TrafficRecord {
        TrafficRecord::proxy_log(
            self.time.with_timezone(&Local),
            source_tag,
            self.remote_addr,
            self.remote_port,
            self.request_url,
            self.user_agent,
        )
    }
}

/// 접근 로그 파서
#[derive(Debug, Clone)]
pub struct AccessLogParser {
    pattern: Regex,
}

impl AccessLogParser {
    /// 새 파서를 생성합니다.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(ACCESS_LOG_PATTERN)?,
        })
    }

    /// 한 줄을 파싱합니다. 앞뒤 공백은 무시합니다.
    pub fn parse(&self, line: &str) -> Result<AccessLogEntry, ParseError> {
        let caps = self
            .pattern
            .captures(line.trim())
            .ok_or(ParseError::GrammarMismatch)?;
        let field = |idx: usize| caps.get(idx).map_or("", |m| m.as_str());

        let time_local = field(3);
        let time = DateTime::parse_from_str(time_local, TIME_LOCAL_FORMAT).map_err(|e| {
            ParseError::InvalidTimestamp {
                value: time_local.to_owned(),
                reason: e.to_string(),
            }
        })?;

        let status = field(5)
            .parse::<u16>()
            .map_err(|_| ParseError::InvalidField {
                field: "status".to_owned(),
                value: field(5).to_owned(),
            })?;
        let body_bytes = field(6)
            .parse::<u64>()
            .map_err(|_| ParseError::InvalidField {
                field: "body_bytes".to_owned(),
                value: field(6).to_owned(),
            })?;

        Ok(AccessLogEntry {
            remote_addr: field(1).to_owned(),
            remote_port: field(2).parse().unwrap_or(0),
            time,
            request_url: field(4).to_owned(),
            status,
            body_bytes,
            referer: field(7).to_owned(),
            user_agent: field(8).to_owned(),
            server_addr: field(9).to_owned(),
            server_port: field(10).to_owned(),
        })
    }
}
