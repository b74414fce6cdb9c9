use std::net::IpAddr;
use std::time::Duration;

use photo_click_common::config::NetworkConfig;
use serde::{Serialize, Serializer};
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Outcome of a best-effort address lookup. Serializes as the address, or
/// `"unknown"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Resolved(String),
    Unknown,
}

impl Lookup {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Resolved(addr) => addr,
            Self::Unknown => "unknown",
        }
    }
}

impl Serialize for Lookup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkInfo {
    pub local_ip: Lookup,
    pub public_ip: Lookup,
}

/// Resolves this host's LAN and public addresses.
pub struct NetworkProbe {
    client: reqwest::Client,
    local_probe_addr: String,
    public_ip_url: String,
}

impl NetworkProbe {
    pub fn new(config: &NetworkConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.public_ip_timeout_ms))
            .build()?;
        Ok(Self {
            client,
            local_probe_addr: config.local_probe_addr.clone(),
            public_ip_url: config.public_ip_url.clone(),
        })
    }

    /// Both lookups run concurrently and fail independently.
    pub async fn lookup(&self) -> NetworkInfo {
        let (local_ip, public_ip) = tokio::join!(self.local_ip(), self.public_ip());
        NetworkInfo {
            local_ip,
            public_ip,
        }
    }

    /// Address of the interface the OS would route `local_probe_addr` through.
    /// Connecting a UDP socket sends no packets.
    pub async fn local_ip(&self) -> Lookup {
        match self.routed_local_addr().await {
            Ok(ip) => Lookup::Resolved(ip.to_string()),
            Err(e) => {
                warn!(probe = self.local_probe_addr, error = %e, "local address lookup failed");
                Lookup::Unknown
            }
        }
    }

    async fn routed_local_addr(&self) -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(self.local_probe_addr.as_str()).await?;
        Ok(socket.local_addr()?.ip())
    }

    pub async fn public_ip(&self) -> Lookup {
        match self.fetch_public_ip().await {
            Ok(ip) if !ip.is_empty() => {
                debug!(ip, "public address resolved");
                Lookup::Resolved(ip)
            }
            Ok(_) => {
                warn!(url = self.public_ip_url, "public address service returned an empty body");
                Lookup::Unknown
            }
            Err(e) => {
                warn!(url = self.public_ip_url, error = %e, "public address lookup failed");
                Lookup::Unknown
            }
        }
    }

    async fn fetch_public_ip(&self) -> Result<String, reqwest::Error> {
        let body = self
            .client
            .get(&self.public_ip_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    fn probe(local_probe_addr: &str, public_ip_url: &str) -> NetworkProbe {
        NetworkProbe::new(&NetworkConfig {
            local_probe_addr: local_probe_addr.into(),
            public_ip_url: public_ip_url.into(),
            public_ip_timeout_ms: 300,
        })
        .unwrap()
    }

    /// Serve `router` on an ephemeral port and return its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn lookup_serializes_as_plain_string() {
        let info = NetworkInfo {
            local_ip: Lookup::Resolved("192.168.1.20".into()),
            public_ip: Lookup::Unknown,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"local_ip": "192.168.1.20", "public_ip": "unknown"})
        );
    }

    #[tokio::test]
    async fn local_ip_via_loopback_route() {
        let probe = probe("127.0.0.1:9", "http://127.0.0.1:1/");
        assert_eq!(probe.local_ip().await, Lookup::Resolved("127.0.0.1".into()));
    }

    #[tokio::test]
    async fn bad_probe_address_is_unknown() {
        let probe = probe("not-an-address", "http://127.0.0.1:1/");
        assert_eq!(probe.local_ip().await, Lookup::Unknown);
    }

    #[tokio::test]
    async fn public_ip_body_is_trimmed() {
        let base = serve(Router::new().route("/", get(|| async { "203.0.113.7\n" }))).await;
        let probe = probe("127.0.0.1:9", &format!("{base}/"));
        assert_eq!(probe.public_ip().await, Lookup::Resolved("203.0.113.7".into()));
    }

    #[tokio::test]
    async fn public_ip_error_status_is_unknown() {
        let base = serve(Router::new().route(
            "/",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "busy") }),
        ))
        .await;
        let probe = probe("127.0.0.1:9", &format!("{base}/"));
        assert_eq!(probe.public_ip().await, Lookup::Unknown);
    }

    #[tokio::test]
    async fn public_ip_timeout_is_unknown() {
        let base = serve(Router::new().route(
            "/",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "198.51.100.1"
            }),
        ))
        .await;
        let probe = probe("127.0.0.1:9", &format!("{base}/"));
        assert_eq!(probe.public_ip().await, Lookup::Unknown);
    }

    #[tokio::test]
    async fn lookups_degrade_independently() {
        let info = probe("not-an-address", "http://127.0.0.1:1/").lookup().await;
        assert_eq!(info.local_ip, Lookup::Unknown);
        assert_eq!(info.public_ip, Lookup::Unknown);

        let info = probe("127.0.0.1:9", "http://127.0.0.1:1/").lookup().await;
        assert_eq!(info.local_ip, Lookup::Resolved("127.0.0.1".into()));
        assert_eq!(info.public_ip, Lookup::Unknown);
    }
}
