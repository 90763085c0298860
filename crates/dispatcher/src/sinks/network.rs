//! NetworkSink - streams scenes to a live viewer over UDP
//!
//! Each scene becomes one JSON datagram. `full` datagrams carry the whole
//! `SceneUpdate`; `compact` datagrams carry only what a live trajectory or
//! chart view redraws per frame. A full scene that does not fit in one
//! datagram is re-encoded compactly before it is rejected.

use std::collections::HashMap;
use std::net::SocketAddr;

use contracts::{ContractError, Point2, SceneCause, SceneSink, SceneUpdate};
use serde::Serialize;
use tokio::net::UdpSocket;
use tracing::{debug, instrument, warn};

/// IPv4 UDP payload limit is 65507; stay under it
const DEFAULT_MAX_PACKET_SIZE: usize = 65000;

/// Datagram encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatagramFormat {
    /// Complete `SceneUpdate`
    #[default]
    Full,
    /// Cursor, position, obstacles and chart values only
    Compact,
}

impl DatagramFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "full" => Some(Self::Full),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// Per-frame payload for live views
#[derive(Debug, Serialize)]
struct CompactScene<'a> {
    seq: u64,
    session: u64,
    cause: SceneCause,
    t: f64,
    playing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pos: Option<Point2>,
    obstacles: &'a [Point2],
    latency: Option<f64>,
    speed: Option<f64>,
    curvature: Option<f64>,
}

impl<'a> From<&'a SceneUpdate> for CompactScene<'a> {
    fn from(update: &'a SceneUpdate) -> Self {
        let scene = &update.scene;
        Self {
            seq: update.sequence,
            session: update.session,
            cause: update.cause,
            t: scene.cursor,
            playing: scene.is_playing,
            pos: scene.frame.as_ref().map(|f| f.pos),
            obstacles: scene
                .frame
                .as_ref()
                .map(|f| f.obstacles.as_slice())
                .unwrap_or_default(),
            latency: scene.latency_ms(),
            speed: scene.speed_value(),
            curvature: scene.curvature_value(),
        }
    }
}

/// Configuration for NetworkSink
#[derive(Debug, Clone)]
pub struct NetworkSinkConfig {
    /// Viewer address
    pub addr: SocketAddr,
    pub max_packet_size: usize,
    pub format: DatagramFormat,
}

impl NetworkSinkConfig {
    /// Read `addr`, `max_packet_size` and `format` from sink params
    pub fn from_params(name: &str, params: &HashMap<String, String>) -> Result<Self, ContractError> {
        let field = |key: &str| format!("sinks[{name}].params.{key}");

        let raw_addr = params
            .get("addr")
            .ok_or_else(|| ContractError::config_validation(field("addr"), "missing 'addr'"))?;
        let addr = raw_addr.parse::<SocketAddr>().map_err(|e| {
            ContractError::config_validation(field("addr"), format!("invalid address '{raw_addr}': {e}"))
        })?;

        let max_packet_size = match params.get("max_packet_size") {
            Some(raw) => raw.parse::<usize>().map_err(|e| {
                ContractError::config_validation(field("max_packet_size"), format!("'{raw}': {e}"))
            })?,
            None => DEFAULT_MAX_PACKET_SIZE,
        };

        let format = match params.get("format") {
            Some(raw) => DatagramFormat::parse(raw).ok_or_else(|| {
                ContractError::config_validation(
                    field("format"),
                    format!("unknown datagram format '{raw}' (expected full or compact)"),
                )
            })?,
            None => DatagramFormat::default(),
        };

        Ok(Self {
            addr,
            max_packet_size,
            format,
        })
    }
}

/// Sink that streams each scene as one datagram
pub struct NetworkSink {
    name: String,
    config: NetworkSinkConfig,
    socket: UdpSocket,
    closed: bool,
    downgraded: u64,
}

impl NetworkSink {
    /// Bind an ephemeral local port and connect it to the viewer address
    #[instrument(name = "network_sink_new", skip(name, config), fields(target = %config.addr))]
    pub async fn new(name: impl Into<String>, config: NetworkSinkConfig) -> Result<Self, ContractError> {
        let name = name.into();
        let local = if config.addr.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };

        let connect = async {
            let socket = UdpSocket::bind(local).await?;
            socket.connect(config.addr).await?;
            Ok::<_, std::io::Error>(socket)
        };
        let socket = connect.await.map_err(|e| ContractError::SinkConnection {
            sink_name: name.clone(),
            message: e.to_string(),
        })?;

        debug!(sink = %name, format = ?config.format, "NetworkSink connected");
        Ok(Self {
            name,
            config,
            socket,
            closed: false,
            downgraded: 0,
        })
    }

    /// Create from sink params (for factory)
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkSinkConfig::from_params(&name, params)?;
        Self::new(name, config).await
    }

    /// Full scenes that were sent compactly because they did not fit
    pub fn downgraded(&self) -> u64 {
        self.downgraded
    }

    fn encode(&self, update: &SceneUpdate, format: DatagramFormat) -> Result<Vec<u8>, ContractError> {
        let encoded = match format {
            DatagramFormat::Full => serde_json::to_vec(update),
            DatagramFormat::Compact => serde_json::to_vec(&CompactScene::from(update)),
        };
        encoded.map_err(|e| ContractError::sink_write(&self.name, format!("json error: {e}")))
    }

    /// Encode within `max_packet_size`, falling back to compact
    fn datagram(&mut self, update: &SceneUpdate) -> Result<Vec<u8>, ContractError> {
        let limit = self.config.max_packet_size;
        let mut data = self.encode(update, self.config.format)?;

        if data.len() > limit && self.config.format == DatagramFormat::Full {
            debug!(sink = %self.name, size = data.len(), limit, "Full scene too large, sending compact");
            data = self.encode(update, DatagramFormat::Compact)?;
            self.downgraded += 1;
        }

        if data.len() > limit {
            return Err(ContractError::sink_write(
                &self.name,
                format!("scene {} needs {} bytes, max_packet_size is {limit}", update.sequence, data.len()),
            ));
        }
        Ok(data)
    }
}

impl SceneSink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_sink_write",
        skip(self, update),
        fields(sink = %self.name, sequence = update.sequence)
    )]
    async fn write(&mut self, update: &SceneUpdate) -> Result<(), ContractError> {
        if self.closed {
            return Err(ContractError::sink_write(&self.name, "sink is closed"));
        }
        let data = self.datagram(update)?;

        // best effort: an unreachable viewer must not fail playback
        if let Err(e) = self.socket.send(&data).await {
            warn!(sink = %self.name, error = %e, "UDP send failed");
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.closed = true;
        debug!(sink = %self.name, downgraded = self.downgraded, "NetworkSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_update;
    use tokio::time::{timeout, Duration};

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn viewer() -> (UdpSocket, SocketAddr) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        (socket, addr)
    }

    async fn receive(socket: &UdpSocket) -> serde_json::Value {
        let mut buf = vec![0u8; 65536];
        let len = timeout(Duration::from_secs(1), socket.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        serde_json::from_slice(&buf[..len]).unwrap()
    }

    #[test]
    fn test_config_from_params() {
        let config = NetworkSinkConfig::from_params(
            "udp",
            &params(&[("addr", "127.0.0.1:9999"), ("max_packet_size", "1200"), ("format", "Compact")]),
        )
        .unwrap();
        assert_eq!(config.addr.port(), 9999);
        assert_eq!(config.max_packet_size, 1200);
        assert_eq!(config.format, DatagramFormat::Compact);
    }

    #[test]
    fn test_config_errors_name_the_field() {
        let err = NetworkSinkConfig::from_params("udp", &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("sinks[udp].params.addr"));

        let err = NetworkSinkConfig::from_params(
            "udp",
            &params(&[("addr", "127.0.0.1:9999"), ("format", "protobuf")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("protobuf"));
    }

    #[tokio::test]
    async fn test_full_datagram() {
        let (receiver, addr) = viewer().await;
        let addr = addr.to_string();
        let mut sink = NetworkSink::from_params("net", &params(&[("addr", addr.as_str())]))
            .await
            .unwrap();
        sink.write(&sample_update(3)).await.unwrap();

        let decoded = receive(&receiver).await;
        assert_eq!(decoded["sequence"], 3);
        assert_eq!(decoded["scene"]["latency"]["latency"], 45.0);
    }

    #[tokio::test]
    async fn test_compact_datagram() {
        let (receiver, addr) = viewer().await;
        let config = NetworkSinkConfig {
            addr,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            format: DatagramFormat::Compact,
        };
        let mut sink = NetworkSink::new("net", config).await.unwrap();
        sink.write(&sample_update(5)).await.unwrap();

        let decoded = receive(&receiver).await;
        assert_eq!(decoded["seq"], 5);
        assert_eq!(decoded["cause"], "tick");
        assert_eq!(decoded["t"], 0.5);
        assert_eq!(decoded["obstacles"].as_array().unwrap().len(), 1);
        assert_eq!(decoded["latency"], 45.0);
        assert!(decoded["speed"].is_null());
    }

    #[tokio::test]
    async fn test_oversized_full_scene_sent_compact() {
        let (receiver, addr) = viewer().await;
        let full_len = serde_json::to_vec(&sample_update(1)).unwrap().len();
        let config = NetworkSinkConfig {
            addr,
            max_packet_size: full_len - 1,
            format: DatagramFormat::Full,
        };
        let mut sink = NetworkSink::new("net", config).await.unwrap();
        sink.write(&sample_update(1)).await.unwrap();

        let decoded = receive(&receiver).await;
        assert_eq!(decoded["seq"], 1);
        assert_eq!(sink.downgraded(), 1);
    }

    #[tokio::test]
    async fn test_too_small_for_any_encoding() {
        let (_receiver, addr) = viewer().await;
        let config = NetworkSinkConfig {
            addr,
            max_packet_size: 16,
            format: DatagramFormat::Full,
        };
        let mut sink = NetworkSink::new("tiny", config).await.unwrap();
        let err = sink.write(&sample_update(1)).await.unwrap_err();
        assert!(err.to_string().contains("max_packet_size is 16"));
    }

    #[tokio::test]
    async fn test_write_after_close_fails() {
        let (_receiver, addr) = viewer().await;
        let addr = addr.to_string();
        let mut sink = NetworkSink::from_params("closed", &params(&[("addr", addr.as_str())]))
            .await
            .unwrap();
        sink.close().await.unwrap();
        assert!(sink.write(&sample_update(1)).await.is_err());
    }
}
