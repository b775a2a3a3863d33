// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch raw network traffic for packets matching a filter.
//!
//! Reads Ethernet frames from an `AF_PACKET` socket bound to one
//! interface, keeps IPv4 only, and parses TCP/UDP/ICMP headers by hand.
//! TCP flags match on a nonzero bit intersection; the payload filter is a
//! bytes regex; everything else is an equality check. By default every
//! configured filter must match one packet; `trigger_any` relaxes that to
//! any single filter.

use std::fmt;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinSet;
use tracing::info;

use rig_core::{ConfigError, RigConfig};

use super::{first_completed, Monitor, MonitorError, MonitorOutcome, MonitorResult};
use crate::options;

const ETH_P_ALL: u16 = 0x0003;
const ETHERTYPE_IPV4: u16 = 0x0800;
const IPPROTO_TCP: u8 = 6;
const IPPROTO_UDP: u8 = 17;
const IPPROTO_ICMP: u8 = 1;

/// TCP flag bits in header order.
const TCP_FLAGS: &[(&str, u8)] = &[
    ("FIN", 0x01),
    ("SYN", 0x02),
    ("RST", 0x04),
    ("PSH", 0x08),
    ("ACK", 0x10),
    ("URG", 0x20),
    ("ECN", 0x40),
    ("CWR", 0x80),
];

/// ICMP message types a filter may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IcmpType(u8);

const ICMP_TYPES: &[(&str, u8)] = &[
    ("ECHO_REPLY", 0),
    ("DESTINATION_UNREACHABLE", 3),
    ("REDIRECT", 5),
    ("ECHO", 8),
    ("ROUTER_ADVERTISEMENT", 9),
    ("ROUTER_SELECTION", 10),
    ("TIME_EXCEEDED", 11),
    ("PARAMETER_PROBLEM", 12),
    ("TIMESTAMP", 13),
    ("TIMESTAMP_REPLY", 14),
    ("INFORMATION_REQUEST", 15),
    ("INFORMATION_REPLY", 16),
    ("ADDRESS_MASK_REQUEST", 17),
    ("ADDRESS_MASK_REPLY", 18),
    ("TRACEROUTE", 30),
];

impl IcmpType {
    fn parse(name: &str) -> Result<Self, ConfigError> {
        let normalized = name.to_ascii_uppercase().replace('-', "_");
        ICMP_TYPES
            .iter()
            .find(|(n, _)| *n == normalized)
            .map(|(_, v)| IcmpType(*v))
            .ok_or_else(|| {
                ConfigError::invalid("icmptype", format!("unknown ICMP type '{name}'"))
            })
    }

    fn from_wire(value: u8) -> Option<Self> {
        ICMP_TYPES.iter().find(|(_, v)| *v == value).map(|_| IcmpType(value))
    }
}

impl fmt::Display for IcmpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = ICMP_TYPES
            .iter()
            .find(|(_, v)| *v == self.0)
            .map(|(n, _)| *n)
            .unwrap_or("UNKNOWN");
        f.write_str(name)
    }
}

fn parse_tcpflags(names: &[String]) -> Result<u8, ConfigError> {
    let mut bits = 0u8;
    for name in names {
        let upper = name.to_ascii_uppercase();
        let bit = TCP_FLAGS
            .iter()
            .find(|(n, _)| *n == upper)
            .map(|(_, b)| *b)
            .ok_or_else(|| {
                ConfigError::invalid("tcpflags", format!("unknown TCP flag '{name}'"))
            })?;
        bits |= bit;
    }
    Ok(bits)
}

fn flag_names(bits: u8) -> String {
    let names: Vec<&str> = TCP_FLAGS
        .iter()
        .filter(|(_, b)| bits & b != 0)
        .map(|(n, _)| *n)
        .collect();
    names.join("|")
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PacketOptions {
    interface: String,
    #[serde(default)]
    srcmac: Option<String>,
    #[serde(default)]
    dstmac: Option<String>,
    #[serde(default)]
    srcip: Option<String>,
    #[serde(default)]
    dstip: Option<String>,
    #[serde(default)]
    srcport: Option<u16>,
    #[serde(default)]
    dstport: Option<u16>,
    #[serde(default, deserialize_with = "options::one_or_many")]
    tcpflags: Vec<String>,
    #[serde(default)]
    icmptype: Option<String>,
    #[serde(default)]
    payload: Option<String>,
    #[serde(default)]
    trigger_any: bool,
}

/// The compiled filter set.
#[derive(Debug)]
struct Filter {
    srcmac: Option<String>,
    dstmac: Option<String>,
    srcip: Option<String>,
    dstip: Option<String>,
    srcport: Option<u16>,
    dstport: Option<u16>,
    tcpflags: Option<u8>,
    icmptype: Option<IcmpType>,
    payload: Option<regex::bytes::Regex>,
    trigger_any: bool,
}

impl Filter {
    fn len(&self) -> usize {
        [
            self.srcmac.is_some(),
            self.dstmac.is_some(),
            self.srcip.is_some(),
            self.dstip.is_some(),
            self.srcport.is_some(),
            self.dstport.is_some(),
            self.tcpflags.is_some(),
            self.icmptype.is_some(),
            self.payload.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    /// Names of the filters this packet satisfies.
    fn matching_keys(&self, pkt: &ParsedPacket) -> Vec<&'static str> {
        let mut matched = Vec::new();
        if let Some(want) = &self.srcmac {
            if want.eq_ignore_ascii_case(&pkt.srcmac) {
                matched.push("srcmac");
            }
        }
        if let Some(want) = &self.dstmac {
            if want.eq_ignore_ascii_case(&pkt.dstmac) {
                matched.push("dstmac");
            }
        }
        if let Some(want) = &self.srcip {
            if *want == pkt.srcip {
                matched.push("srcip");
            }
        }
        if let Some(want) = &self.dstip {
            if *want == pkt.dstip {
                matched.push("dstip");
            }
        }
        if let Some(want) = self.srcport {
            if pkt.srcport == Some(want) {
                matched.push("srcport");
            }
        }
        if let Some(want) = self.dstport {
            if pkt.dstport == Some(want) {
                matched.push("dstport");
            }
        }
        if let Some(want) = self.tcpflags {
            if pkt.tcpflags.is_some_and(|flags| flags & want != 0) {
                matched.push("tcpflags");
            }
        }
        if let Some(want) = self.icmptype {
            if pkt.icmptype == Some(want) {
                matched.push("icmptype");
            }
        }
        if let Some(re) = &self.payload {
            if pkt.payload.as_deref().is_some_and(|p| !p.is_empty() && re.is_match(p)) {
                matched.push("payload");
            }
        }
        matched
    }

    fn is_match(&self, pkt: &ParsedPacket) -> Option<Vec<&'static str>> {
        let matched = self.matching_keys(pkt);
        let wanted = if self.trigger_any { 1 } else { self.len() };
        if !matched.is_empty() && matched.len() >= wanted {
            Some(matched)
        } else {
            None
        }
    }
}

/// Fields pulled out of one captured frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedPacket {
    srcmac: String,
    dstmac: String,
    srcip: String,
    dstip: String,
    srcport: Option<u16>,
    dstport: Option<u16>,
    tcpflags: Option<u8>,
    icmptype: Option<IcmpType>,
    payload: Option<Vec<u8>>,
}

fn strmac(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":")
}

fn str_ipv4(bytes: &[u8]) -> String {
    format!("{}.{}.{}.{}", bytes[0], bytes[1], bytes[2], bytes[3])
}

/// Parse one Ethernet frame. Returns `None` for anything that is not a
/// well-formed IPv4 packet.
pub(crate) fn parse_frame(eth: &[u8]) -> Option<ParsedPacket> {
    if eth.len() < 34 {
        return None;
    }
    let ethertype = u16::from_be_bytes([eth[12], eth[13]]);
    if ethertype != ETHERTYPE_IPV4 {
        return None;
    }
    let dstmac = strmac(&eth[0..6]);
    let srcmac = strmac(&eth[6..12]);

    let ip = &eth[14..];
    let ip_ver = ip[0] >> 4;
    let ip_hdrlen = ((ip[0] & 0x0f) as usize) * 4;
    if ip_ver != 4 || ip.len() < ip_hdrlen || ip_hdrlen < 20 {
        return None;
    }
    let ip_proto = ip[9];
    let srcip = str_ipv4(&ip[12..16]);
    let dstip = str_ipv4(&ip[16..20]);

    let l4 = &ip[ip_hdrlen..];
    let mut pkt = ParsedPacket {
        srcmac,
        dstmac,
        srcip,
        dstip,
        srcport: None,
        dstport: None,
        tcpflags: None,
        icmptype: None,
        payload: None,
    };

    match ip_proto {
        IPPROTO_TCP => {
            if l4.len() < 20 {
                return None;
            }
            pkt.srcport = Some(u16::from_be_bytes([l4[0], l4[1]]));
            pkt.dstport = Some(u16::from_be_bytes([l4[2], l4[3]]));
            let data_offset = ((l4[12] >> 4) as usize) * 4;
            pkt.tcpflags = Some(l4[13]);
            if l4.len() >= data_offset {
                pkt.payload = Some(l4[data_offset..].to_vec());
            }
        }
        IPPROTO_UDP => {
            if l4.len() < 8 {
                return None;
            }
            pkt.srcport = Some(u16::from_be_bytes([l4[0], l4[1]]));
            pkt.dstport = Some(u16::from_be_bytes([l4[2], l4[3]]));
            pkt.payload = Some(l4[8..].to_vec());
        }
        IPPROTO_ICMP => {
            if l4.len() < 8 {
                return None;
            }
            pkt.icmptype = IcmpType::from_wire(l4[0]);
        }
        _ => {}
    }
    Some(pkt)
}

#[derive(Debug)]
pub struct PacketMonitor {
    interface: String,
    ifindex: u32,
    filter: std::sync::Arc<Filter>,
}

impl PacketMonitor {
    pub fn configure(value: &serde_yaml::Value, _config: &RigConfig) -> Result<Self, ConfigError> {
        let opts: PacketOptions = options::from_value("monitor", "packet", value)?;

        let ifindex = nix::net::if_::if_nametoindex(opts.interface.as_str()).map_err(|_| {
            ConfigError::invalid(
                "interface",
                format!("interface '{}' does not exist", opts.interface),
            )
        })?;

        let tcpflags = if opts.tcpflags.is_empty() {
            None
        } else {
            Some(parse_tcpflags(&opts.tcpflags)?)
        };
        let icmptype = opts.icmptype.as_deref().map(IcmpType::parse).transpose()?;
        let payload = opts
            .payload
            .as_deref()
            .map(|p| {
                regex::bytes::Regex::new(p).map_err(|e| {
                    ConfigError::invalid("payload", format!("pattern does not compile: {e}"))
                })
            })
            .transpose()?;

        let filter = Filter {
            srcmac: opts.srcmac,
            dstmac: opts.dstmac,
            srcip: opts.srcip,
            dstip: opts.dstip,
            srcport: opts.srcport,
            dstport: opts.dstport,
            tcpflags,
            icmptype,
            payload,
            trigger_any: opts.trigger_any,
        };
        if filter.len() == 0 {
            return Err(ConfigError::Invalid(
                "packet monitor: must specify at least one filter".to_string(),
            ));
        }

        Ok(Self {
            interface: opts.interface,
            ifindex,
            filter: std::sync::Arc::new(filter),
        })
    }
}

#[async_trait]
impl Monitor for PacketMonitor {
    fn name(&self) -> &'static str {
        "packet"
    }

    fn monitoring(&self) -> serde_json::Value {
        let mut info = json!({ "interface": self.interface });
        if let Some(v) = &self.filter.srcmac {
            info["srcmac"] = json!(v);
        }
        if let Some(v) = &self.filter.dstmac {
            info["dstmac"] = json!(v);
        }
        if let Some(v) = &self.filter.srcip {
            info["srcip"] = json!(v);
        }
        if let Some(v) = &self.filter.dstip {
            info["dstip"] = json!(v);
        }
        if let Some(v) = self.filter.srcport {
            info["srcport"] = json!(v);
        }
        if let Some(v) = self.filter.dstport {
            info["dstport"] = json!(v);
        }
        if let Some(bits) = self.filter.tcpflags {
            info["tcpflags"] = json!(flag_names(bits));
        }
        if let Some(t) = self.filter.icmptype {
            info["icmptype"] = json!(t.to_string());
        }
        if let Some(re) = &self.filter.payload {
            info["payload"] = json!(re.as_str());
        }
        info["trigger_any"] = json!(self.filter.trigger_any);
        info
    }

    async fn start(&self, _interval: Duration) -> MonitorResult {
        let socket = open_capture_socket(self.ifindex)
            .map_err(|e| MonitorError::Worker(format!("could not open capture socket: {e}")))?;
        info!("Beginning packet watch on interface {}", self.interface);

        let filter = std::sync::Arc::clone(&self.filter);
        let mut workers = JoinSet::new();
        // recv() blocks with no async variant, so the read loop runs on a
        // blocking thread and is torn down with the process.
        workers.spawn_blocking(move || read_from_socket(socket, &filter));
        first_completed(workers).await
    }
}

/// Open a raw `AF_PACKET` socket bound to one interface.
fn open_capture_socket(ifindex: u32) -> std::io::Result<OwnedFd> {
    // SAFETY: plain libc socket/bind calls; the fd is owned immediately
    unsafe {
        let fd = libc::socket(
            libc::AF_PACKET,
            libc::SOCK_RAW,
            i32::from(ETH_P_ALL.to_be()),
        );
        if fd < 0 {
            return Err(std::io::Error::last_os_error());
        }
        let fd = OwnedFd::from_raw_fd(fd);

        let mut addr: libc::sockaddr_ll = std::mem::zeroed();
        addr.sll_family = libc::AF_PACKET as u16;
        addr.sll_protocol = ETH_P_ALL.to_be();
        addr.sll_ifindex = ifindex as i32;
        let ret = libc::bind(
            fd.as_raw_fd(),
            std::ptr::addr_of!(addr).cast(),
            std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
        );
        if ret < 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(fd)
    }
}

fn read_from_socket(socket: OwnedFd, filter: &Filter) -> MonitorResult {
    let mut buf = vec![0u8; 65535];
    loop {
        // SAFETY: buf outlives the call and len matches its capacity
        let received = unsafe {
            libc::recv(socket.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len(), 0)
        };
        if received < 0 {
            return Err(MonitorError::Io(std::io::Error::last_os_error()));
        }
        let Some(pkt) = parse_frame(&buf[..received as usize]) else {
            continue;
        };
        if let Some(matched) = filter.is_match(&pkt) {
            let match_str = matched.join(" and ");
            info!(
                "Packet matching {match_str} found: {}:{} -> {}:{}",
                pkt.srcip,
                pkt.srcport.unwrap_or(0),
                pkt.dstip,
                pkt.dstport.unwrap_or(0)
            );
            return Ok(MonitorOutcome::Triggered(format!("packet matched {match_str}")));
        }
    }
}

#[cfg(test)]
#[path = "packet_tests.rs"]
mod tests;
