use axum::extract::ConnectInfo;
use axum::http::{Extensions, HeaderMap};
use ipnet::IpNet;
use std::net::{IpAddr, SocketAddr};

/// Forwarded headers are honoured only when the peer is a trusted proxy.
pub fn client_ip(
    headers: &HeaderMap,
    remote_addr: Option<SocketAddr>,
    trusted: &[String],
) -> Option<String> {
    let remote_ip = remote_addr.map(|addr| addr.ip());
    if trusted.is_empty() {
        return remote_ip.map(|ip| ip.to_string());
    }
    if remote_ip.is_some_and(|ip| is_trusted_proxy(ip, trusted)) {
        return parse_forwarded_ip(headers).or_else(|| remote_ip.map(|ip| ip.to_string()));
    }
    remote_ip.map(|ip| ip.to_string())
}

pub fn remote_addr(extensions: &Extensions) -> Option<SocketAddr> {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(std::string::ToString::to_string)
}

pub fn referrer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("referer")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(std::string::ToString::to_string)
}

fn parse_forwarded_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        let first = value.split(',').next().map_or(value, str::trim);
        if !first.is_empty() {
            return Some(first.to_string());
        }
    }
    if let Some(value) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let value = value.trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }
    if let Some(value) = headers.get("forwarded").and_then(|v| v.to_str().ok()) {
        for part in value.split(';') {
            let part = part.trim();
            if let Some(rest) = part.strip_prefix("for=") {
                let rest = rest.trim_matches('"');
                if !rest.is_empty() {
                    return Some(rest.to_string());
                }
            }
        }
    }
    None
}

fn is_trusted_proxy(remote_ip: IpAddr, trusted: &[String]) -> bool {
    let Ok(trusted_nets) = trusted
        .iter()
        .map(|value| value.parse::<IpNet>())
        .collect::<Result<Vec<_>, _>>()
    else {
        return false;
    };
    trusted_nets.iter().any(|net| net.contains(&remote_ip))
}
