use std::net::Ipv4Addr;

const AGENT_PORT: &str = "AGENT_PORT";

const DEFAULT_PORT: u16 = 9123;

pub fn get_default_port() -> u16 {
    DEFAULT_PORT
}

pub fn get_port() -> u16 {
    let port_from_env = std::env::var(AGENT_PORT);
    port_from_env.map_or(DEFAULT_PORT, |res| res.parse().unwrap_or(DEFAULT_PORT))
}

const AGENT_ADDR: &str = "AGENT_ADDR";

const DEFAULT_ADDR: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 0);

pub fn get_addr() -> Ipv4Addr {
    let addr_from_env = std::env::var(AGENT_ADDR);
    addr_from_env.map_or(DEFAULT_ADDR, |res| res.parse().unwrap_or(DEFAULT_ADDR))
}

const AGENT_SECRET: &str = "AGENT_SECRET";

pub fn get_secret() -> Option<String> {
    std::env::var(AGENT_SECRET).ok().filter(|s| !s.is_empty())
}

const TOP_PROCESSES: &str = "TOP_PROCESSES";

/// Length of the process list an agent serves.
pub fn get_top_processes() -> usize {
    std::env::var(TOP_PROCESSES)
        .ok()
        .and_then(|n| n.parse().ok())
        .filter(|n| *n > 0)
        .unwrap_or(crate::DEFAULT_TOP_PROCESSES)
}

/// Truthy environment flag: `1`, `true`, `yes` or `on`, ignoring case.
pub fn is_true(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

const MASK: &str = "***";

/// Replace the password part of a URL's userinfo with `***`.
///
/// Strings without a scheme, without userinfo or without a password are
/// returned unchanged. Masking an already masked string is a no-op.
pub fn mask_password(raw: &str) -> String {
    let Some(scheme_end) = raw.find("://") else {
        return raw.to_string();
    };
    let authority_start = scheme_end + 3;
    let rest = &raw[authority_start..];
    let authority_len = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..authority_len];

    let Some(at) = authority.rfind('@') else {
        return raw.to_string();
    };
    let userinfo = &authority[..at];
    let Some(colon) = userinfo.find(':') else {
        return raw.to_string();
    };

    let mut masked = String::with_capacity(raw.len());
    masked.push_str(&raw[..authority_start]);
    masked.push_str(&userinfo[..=colon]);
    masked.push_str(MASK);
    masked.push_str(&rest[at..]);
    masked
}
