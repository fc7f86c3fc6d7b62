// Network settings for a participant.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use imposter_game::content::DEFAULT_CONTENT_TIMEOUT;

#[derive(Clone, Debug)]
pub struct PeerConfig {
    /// Name shown for the host in the lobby roster.
    pub display_name: String,
    /// Where a host listens for joiners. Port 0 picks a free port.
    pub bind_address: SocketAddr,
    /// Address registered with the directory when the listener is bound to an
    /// unspecified IP. Defaults to loopback.
    pub advertised_ip: Option<IpAddr>,
    pub connect_timeout: Duration,
    pub content_timeout: Duration,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            display_name: "Host".into(),
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            advertised_ip: None,
            connect_timeout: Duration::from_secs(5),
            content_timeout: DEFAULT_CONTENT_TIMEOUT,
        }
    }
}

impl PeerConfig {
    /// The address joiners should dial for a listener bound at `local`.
    pub fn advertised(&self, local: SocketAddr) -> SocketAddr {
        let ip = match (self.advertised_ip, local.ip()) {
            (Some(ip), _) => ip,
            (None, ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            (None, ip) => ip,
        };
        SocketAddr::new(ip, local.port())
    }
}
