//! syslog 전송 계층
//!
//! [`EventSink`]는 포맷이 끝난 syslog 라인 하나를 SIEM으로 보냅니다.
//!
//! - [`UdpSyslogSink`]: 라인 하나가 UDP 데이터그램 하나
//! - [`TcpSyslogSink`]: 줄바꿈 구분 스트림, 실패 시 다음 전송에서 재연결
//!
//! TCP 연결과 쓰기는 모두 타임아웃으로 제한합니다.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use iotsentry_core::config::SyslogConfig;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::IngestError;

/// syslog 라인 전송 trait
pub trait EventSink: Send + Sync + 'static {
    /// 라인 하나를 전송합니다.
    fn send(&self, line: &str) -> impl Future<Output = Result<(), IngestError>> + Send;

    /// 메트릭 레이블용 프로토콜 이름
    fn protocol(&self) -> &'static str;
}

/// `host:port`를 소켓 주소로 해석합니다.
pub async fn resolve_target(target: &str) -> Result<SocketAddr, IngestError> {
    tokio::net::lookup_host(target)
        .await
        .map_err(|e| sink_error(target, &e))?
        .next()
        .ok_or_else(|| IngestError::Sink {
            target: target.to_owned(),
            reason: "no address resolved".to_owned(),
        })
}

fn sink_error(target: &str, e: &std::io::Error) -> IngestError {
    IngestError::Sink {
        target: target.to_owned(),
        reason: e.to_string(),
    }
}

fn unspecified_for(addr: &SocketAddr) -> SocketAddr {
    if addr.is_ipv4() {
        SocketAddr::from(([0, 0, 0, 0], 0))
    } else {
        SocketAddr::from(([0u16; 8], 0))
    }
}

/// UDP syslog 전송기
#[derive(Debug)]
pub struct UdpSyslogSink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpSyslogSink {
    /// 대상에 연결된 UDP 소켓을 엽니다.
    pub async fn connect(target: &str) -> Result<Self, IngestError> {
        let addr = resolve_target(target).await?;
        let socket = UdpSocket::bind(unspecified_for(&addr))
            .await
            .map_err(|e| sink_error(target, &e))?;
        socket
            .connect(addr)
            .await
            .map_err(|e| sink_error(target, &e))?;
        info!(peer = %addr, "udp syslog sink ready");
        Ok(Self {
            socket,
            target: addr,
        })
    }

    /// 전송 대상 주소
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl EventSink for UdpSyslogSink {
    async fn send(&self, line: &str) -> Result<(), IngestError> {
        self.socket
            .send(line.as_bytes())
            .await
            .map_err(|e| sink_error(&self.target.to_string(), &e))?;
        Ok(())
    }

    fn protocol(&self) -> &'static str {
        "udp"
    }
}

/// TCP syslog 전송기
///
/// 연결은 첫 전송 때 맺고, 쓰기 실패나 타임아웃 시 끊은 뒤 다음 전송에서 다시 맺습니다.
#[derive(Debug)]
pub struct TcpSyslogSink {
    target: String,
    send_timeout: Duration,
    stream: Mutex<Option<TcpStream>>,
}

impl TcpSyslogSink {
    /// 기본 연결/쓰기 타임아웃
    pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

    /// 지연 연결 TCP 전송기를 생성합니다.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            send_timeout: Self::DEFAULT_SEND_TIMEOUT,
            stream: Mutex::new(None),
        }
    }

    /// 연결과 쓰기 각각에 적용할 타임아웃을 설정합니다.
    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    fn timed_out(&self, stage: &str) -> IngestError {
        IngestError::Sink {
            target: self.target.clone(),
            reason: format!("{stage} timed out after {:?}", self.send_timeout),
        }
    }

    /// 전송 대상 (`host:port`)
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl EventSink for TcpSyslogSink {
    async fn send(&self, line: &str) -> Result<(), IngestError> {
        let mut guard = self.stream.lock().await;
        if guard.is_none() {
            let stream = timeout(self.send_timeout, TcpStream::connect(&self.target))
                .await
                .map_err(|_| self.timed_out("connect"))?
                .map_err(|e| sink_error(&self.target, &e))?;
            debug!(peer = %self.target, "tcp syslog connection established");
            *guard = Some(stream);
        }

        // 줄바꿈이 프레임 구분자이므로 본문의 줄바꿈은 공백으로 바꿉니다.
        let mut frame = line.replace(['\r', '\n'], " ");
        frame.push('\n');

        let Some(stream) = guard.as_mut() else {
            return Ok(());
        };
        let written = timeout(self.send_timeout, stream.write_all(frame.as_bytes())).await;
        match written {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                *guard = None;
                Err(sink_error(&self.target, &e))
            }
            // 일부만 쓰였을 수 있으므로 스트림을 버립니다.
            Err(_) => {
                *guard = None;
                Err(self.timed_out("write"))
            }
        }
    }

    fn protocol(&self) -> &'static str {
        "tcp"
    }
}

/// 설정으로 선택하는 syslog 전송기
#[derive(Debug)]
pub enum SyslogSink {
    /// UDP
    Udp(UdpSyslogSink),
    /// TCP
    Tcp(TcpSyslogSink),
}

impl SyslogSink {
    /// `[syslog]` 설정에 맞는 전송기를 만듭니다.
    pub async fn from_config(config: &SyslogConfig) -> Result<Self, IngestError> {
        let target = config.target();
        match config.protocol.as_str() {
            "udp" => Ok(Self::Udp(UdpSyslogSink::connect(&target).await?)),
            "tcp" => Ok(Self::Tcp(
                TcpSyslogSink::new(target)
                    .with_send_timeout(Duration::from_secs(config.send_timeout_secs)),
            )),
            other => Err(IngestError::Config {
                field: "syslog.protocol".to_owned(),
                reason: format!("unsupported protocol '{other}'"),
            }),
        }
    }
}

impl EventSink for SyslogSink {
    async fn send(&self, line: &str) -> Result<(), IngestError> {
        match self {
            Self::Udp(sink) => sink.send(line).await,
            Self::Tcp(sink) => sink.send(line).await,
        }
    }

    fn protocol(&self) -> &'static str {
        match self {
            Self::Udp(sink) => sink.protocol(),
            Self::Tcp(sink) => sink.protocol(),
        }
    }
}

/// 테스트용 메모리 전송기
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySink {
    /// 받은 라인
    pub lines: std::sync::Mutex<Vec<String>>,
    /// 전송 실패를 시뮬레이션할지 여부
    pub fail: bool,
}

#[cfg(test)]
impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
impl EventSink for MemorySink {
    async fn send(&self, line: &str) -> Result<(), IngestError> {
        if self.fail {
            return Err(IngestError::Sink {
                target: "memory".to_owned(),
                reason: "mock failure".to_owned(),
            });
        }
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_owned());
        }
        Ok(())
    }

    fn protocol(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncBufReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn udp_sink_delivers_datagram() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = receiver.local_addr().unwrap().to_string();

        let sink = UdpSyslogSink::connect(&target).await.unwrap();
        sink.send("<142>hello").await.unwrap();

        let mut buf = [0u8; 256];
        let n = receiver.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"<142>hello");
        assert_eq!(sink.protocol(), "udp");
    }

    #[tokio::test]
    async fn tcp_sink_frames_with_newline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap().to_string();

        let sink = TcpSyslogSink::new(target);
        let accept = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut lines = tokio::io::BufReader::new(stream).lines();
            let first = lines.next_line().await.unwrap();
            let second = lines.next_line().await.unwrap();
            (first, second)
        });

        sink.send("<142>first\nline").await.unwrap();
        sink.send("<140>second").await.unwrap();

        let (first, second) = accept.await.unwrap();
        assert_eq!(first.as_deref(), Some("<142>first line"));
        assert_eq!(second.as_deref(), Some("<140>second"));
    }

    #[tokio::test]
    async fn tcp_sink_reports_connect_failure() {
        // 바인드 후 바로 닫아 연결이 거부되는 포트를 만듭니다.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap().to_string();
        drop(listener);

        let sink = TcpSyslogSink::new(target);
        let err = sink.send("<142>x").await.unwrap_err();
        assert!(matches!(err, IngestError::Sink { .. }));
    }

    #[tokio::test]
    async fn tcp_sink_write_is_bounded_when_peer_never_reads() {
        // accept하지 않는 리스너: 커널 버퍼가 차면 write_all이 멈춥니다.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap().to_string();

        let sink = TcpSyslogSink::new(target).with_send_timeout(Duration::from_millis(200));
        let oversized = "x".repeat(32 * 1024 * 1024);

        let started = std::time::Instant::now();
        let err = sink.send(&oversized).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(matches!(err, IngestError::Sink { ref reason, .. } if reason.contains("timed out")));
        assert!(sink.stream.lock().await.is_none());
        drop(listener);
    }

    #[tokio::test]
    async fn from_config_selects_transport() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = receiver.local_addr().unwrap().port();

        let mut config = SyslogConfig {
            port,
            ..SyslogConfig::default()
        };
        let sink = SyslogSink::from_config(&config).await.unwrap();
        assert_eq!(sink.protocol(), "udp");

        config.protocol = "tcp".to_owned();
        let sink = SyslogSink::from_config(&config).await.unwrap();
        assert_eq!(sink.protocol(), "tcp");

        config.protocol = "relp".to_owned();
        assert!(SyslogSink::from_config(&config).await.is_err());
    }
}
