//! 프레임 필터 정책 -- 목적지 포트 및 내부망 출발지 필터링

use std::collections::BTreeSet;
use std::net::IpAddr;

use tracing::warn;

use trafficwatch_core::config::PROXY_OWNED_PORTS;

use super::decode::DecodedFrame;

/// 인터페이스 모니터의 프레임 수용 정책
///
/// 포트 필터가 주어지면 프록시 소유 포트(80/443)를 항상 뺀 뒤 적용합니다.
/// 그 결과 집합이 비면 모든 프레임을 거부합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePolicy {
    ports: Option<BTreeSet<u16>>,
    exclude_internal: bool,
}

impl FramePolicy {
    /// 새 정책을 생성합니다.
    ///
    /// `ports`가 `None`이거나 비어 있으면 포트 필터가 없습니다.
    pub fn new(ports: Option<&[u16]>, exclude_internal: bool) -> Self {
        let ports = ports.filter(|p| !p.is_empty()).map(|configured| {
            let effective: BTreeSet<u16> = configured
                .iter()
                .copied()
                .filter(|port| !PROXY_OWNED_PORTS.contains(port))
                .collect();
            if effective.is_empty() {
                warn!(
                    configured = ?configured,
                    "port filter only contains proxy-owned ports (80/443); every frame will be dropped"
                );
            }
            effective
        });

        Self {
            ports,
            exclude_internal,
        }
    }

    /// 적용 중인 포트 집합 (80/443 제외 후)
    pub fn ports(&self) -> Option<&BTreeSet<u16>> {
        self.ports.as_ref()
    }

    /// 내부망 출발지 제외 여부
    pub fn excludes_internal(&self) -> bool {
        self.exclude_internal
    }

    /// 캡처 백엔드에 넘길 BPF 표현식 (`dst port 22 or dst port 8080`)
    ///
    /// 포트 필터가 없거나 비어 있으면 빈 문자열입니다.
    pub fn bpf_expression(&self) -> String {
        self.ports
            .iter()
            .flatten()
            .map(|port| format!("dst port {port}"))
            .collect::<Vec<_>>()
            .join(" or ")
    }

    /// 디코딩된 프레임을 수용하는지 판단합니다.
    pub fn accepts(&self, frame: &DecodedFrame) -> bool {
        if self
            .ports
            .as_ref()
            .is_some_and(|ports| !ports.contains(&frame.dst_port))
        {
            return false;
        }
        !(self.exclude_internal && is_internal(frame.src_ip))
    }
}

/// 내부망 주소 여부
///
/// IPv4: 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16, 127.0.0.0/8.
/// IPv6: `::1`만 내부로 취급합니다.
pub fn is_internal(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => v6.is_loopback(),
    }
}
