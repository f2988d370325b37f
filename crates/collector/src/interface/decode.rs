//! 프레임 디코딩 -- 이더넷/IP/TCP/UDP 헤더에서 필요한 필드만 추출

use std::net::IpAddr;

use pnet::packet::Packet;
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::ipv6::Ipv6Packet;
use pnet::packet::tcp::TcpPacket;
use pnet::packet::udp::UdpPacket;

/// L3/L4 헤더 요약
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame {
    /// 출발지 주소
    pub src_ip: IpAddr,
    /// 목적지 주소
    pub dst_ip: IpAddr,
    /// 출발지 포트 (TCP/UDP가 아니면 0)
    pub src_port: u16,
    /// 목적지 포트 (TCP/UDP가 아니면 0)
    pub dst_port: u16,
}

/// 이더넷 프레임을 디코딩합니다.
///
/// IPv4/IPv6가 아니거나 헤더가 잘린 프레임은 `None`입니다.
pub fn decode_frame(data: &[u8]) -> Option<DecodedFrame> {
    let ethernet = EthernetPacket::new(data)?;
    match ethernet.get_ethertype() {
        EtherTypes::Ipv4 => {
            let ip = Ipv4Packet::new(ethernet.payload())?;
            let (src_port, dst_port) = transport_ports(ip.get_next_level_protocol(), ip.payload());
            Some(DecodedFrame {
                src_ip: IpAddr::V4(ip.get_source()),
                dst_ip: IpAddr::V4(ip.get_destination()),
                src_port,
                dst_port,
            })
        }
        EtherTypes::Ipv6 => {
            let ip = Ipv6Packet::new(ethernet.payload())?;
            let (src_port, dst_port) = transport_ports(ip.get_next_header(), ip.payload());
            Some(DecodedFrame {
                src_ip: IpAddr::V6(ip.get_source()),
                dst_ip: IpAddr::V6(ip.get_destination()),
                src_port,
                dst_port,
            })
        }
        _ => None,
    }
}

fn transport_ports(protocol: IpNextHeaderProtocol, payload: &[u8]) -> (u16, u16) {
    match protocol {
        IpNextHeaderProtocols::Tcp => TcpPacket::new(payload)
            .map(|tcp| (tcp.get_source(), tcp.get_destination()))
            .unwrap_or((0, 0)),
        IpNextHeaderProtocols::Udp => UdpPacket::new(payload)
            .map(|udp| (udp.get_source(), udp.get_destination()))
            .unwrap_or((0, 0)),
        _ => (0, 0),
    }
}
