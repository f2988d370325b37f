//! 트래픽 레코드 -- 모든 수집 소스가 공유하는 관측 단위
//!
//! [`TrafficRecord`]는 인터페이스 캡처와 프록시 접근 로그 양쪽에서 생성됩니다.
//! 프록시 로그에만 존재하는 필드(`request_url`, `user_agent`)는 `Option`으로 표현하여
//! "값 없음"과 "빈 값"이 섞이지 않도록 합니다.

use std::fmt;

use chrono::{DateTime, Local, SubsecRound};
use serde::{Deserialize, Serialize};

/// 레코드 출처 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// 네트워크 인터페이스 패킷 캡처
    Interface,
    /// 리버스 프록시 접근 로그
    ProxyLog,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interface => write!(f, "interface"),
            Self::ProxyLog => write!(f, "proxy_log"),
        }
    }
}

/// 정규화된 트래픽 관측값
///
/// 생성은 [`TrafficRecord::interface`]와 [`TrafficRecord::proxy_log`]를 통해서만 하며,
/// 두 생성자 모두 타임스탬프를 초 단위로 절삭합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficRecord {
    /// 이벤트 시각 (초 정밀도, 로컬 타임존)
    pub timestamp: DateTime<Local>,
    /// 출처 종류
    pub source_kind: SourceKind,
    /// 인터페이스 이름 또는 로그 소스 태그 (예: "nginx")
    pub source_id: String,
    /// 출발지 주소
    pub src_ip: String,
    /// 출발지 포트 (알 수 없으면 0)
    pub src_port: u16,
    /// 요청 URL (프록시 로그 전용)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_url: Option<String>,
    /// User-Agent (프록시 로그 전용)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl TrafficRecord {
    /// 인터페이스 캡처에서 나온 레코드를 생성합니다.
    pub fn interface(
        timestamp: DateTime<Local>,
        interface: impl Into<String>,
        src_ip: impl Into<String>,
        src_port: u16,
    ) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(0),
            source_kind: SourceKind::Interface,
            source_id: interface.into(),
            src_ip: src_ip.into(),
            src_port,
            request_url: None,
            user_agent: None,
        }
    }

    /// 프록시 접근 로그에서 나온 레코드를 생성합니다.
    pub fn proxy_log(
        timestamp: DateTime<Local>,
        source_tag: impl Into<String>,
        src_ip: impl Into<String>,
        src_port: u16,
        request_url: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(0),
            source_kind: SourceKind::ProxyLog,
            source_id: source_tag.into(),
            src_ip: src_ip.into(),
            src_port,
            request_url: Some(request_url.into()),
            user_agent: Some(user_agent.into()),
        }
    }

    /// 중복 병합 시 그룹 키 `(src_ip, src_port, source_id)`
    pub fn flow_key(&self) -> (&str, u16, &str) {
        (&self.src_ip, self.src_port, &self.source_id)
    }

    /// 인터페이스 캡처 레코드 여부
    pub fn is_interface(&self) -> bool {
        self.source_kind == SourceKind::Interface
    }
}

impl fmt::Display for TrafficRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}:{}",
            self.source_id, self.source_kind, self.src_ip, self.src_port
        )?;
        if let Some(url) = &self.request_url {
            write!(f, " {url}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn sample_time() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 1, 1, 10, 0, 0)
            .single()
            .unwrap()
            .with_nanosecond(750_000_000)
            .unwrap()
    }

    #[test]
    fn interface_record_has_no_proxy_fields() {
        let record = TrafficRecord::interface(sample_time(), "eth0", "203.0.113.9", 51000);
        assert_eq!(record.source_kind, SourceKind::Interface);
        assert_eq!(record.source_id, "eth0");
        assert!(record.request_url.is_none());
        assert!(record.user_agent.is_none());
        assert!(record.is_interface());
    }

    #[test]
    fn proxy_record_carries_url_and_agent() {
        let record = TrafficRecord::proxy_log(
            sample_time(),
            "nginx",
            "1.2.3.4",
            5678,
            "https://host/path",
            "curl/8.0",
        );
        assert_eq!(record.source_kind, SourceKind::ProxyLog);
        assert_eq!(record.request_url.as_deref(), Some("https://host/path"));
        assert_eq!(record.user_agent.as_deref(), Some("curl/8.0"));
        assert!(!record.is_interface());
    }

    #[test]
    fn constructors_truncate_to_seconds() {
        let record = TrafficRecord::interface(sample_time(), "eth0", "1.1.1.1", 1);
        assert_eq!(record.timestamp.nanosecond(), 0);
        assert_eq!(record.timestamp.second(), 0);
        assert_eq!(record.timestamp.hour(), 10);
    }

    #[test]
    fn flow_key_ignores_timestamp() {
        let a = TrafficRecord::interface(sample_time(), "eth0", "1.1.1.1", 22);
        let mut b = a.clone();
        b.timestamp = b.timestamp + chrono::Duration::seconds(30);
        assert_eq!(a.flow_key(), b.flow_key());
    }

    #[test]
    fn interface_record_serializes_without_optional_fields() {
        let record = TrafficRecord::interface(sample_time(), "eth0", "1.1.1.1", 22);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"source_kind\":\"interface\""));
        assert!(!json.contains("request_url"));

        let parsed: TrafficRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn display_includes_source_and_endpoint() {
        let record = TrafficRecord::interface(sample_time(), "eth0", "1.1.1.1", 22);
        assert_eq!(record.to_string(), "[eth0] interface 1.1.1.1:22");
    }
}
