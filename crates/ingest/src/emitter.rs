//! syslog 이벤트 송신기
//!
//! 분류된 이벤트를 syslog 라인 하나로 포맷해 [`EventSink`]에 넘깁니다.
//!
//! ```text
//! <142>2018-02-28T20:02:50.585Z 10.0.0.9 WIoTP:Connection source=32.97.110.54 event=AuthSucceeded clientID=d:li0f0v:NXPDev:testSub Message=Token auth succeeded: ...
//! ```
//!
//! 전송 실패는 warn 로그와 메트릭으로만 남기고 호출자에게 돌려주지 않습니다.

use std::net::{IpAddr, Ipv4Addr};

use chrono::Utc;
use iotsentry_core::metrics as m;
use iotsentry_core::types::{ClassifiedEvent, EventType};
use metrics::counter;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::sink::{EventSink, resolve_target};

/// syslog facility `local1`
pub const FACILITY_LOCAL1: u8 = 17;

/// syslog severity `warning`
pub const SEVERITY_WARNING: u8 = 4;

/// syslog severity `informational`
pub const SEVERITY_INFO: u8 = 6;

/// 재생 모드에서 쓰는 현재 시각 형식
pub const WALL_CLOCK_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// 이벤트 유형별 syslog PRI 값 (`facility * 8 + severity`)
pub fn priority(event_type: EventType) -> u8 {
    let severity = if event_type.is_suspicious() {
        SEVERITY_WARNING
    } else {
        SEVERITY_INFO
    };
    FACILITY_LOCAL1 * 8 + severity
}

/// PRI 없이 syslog 본문 라인을 만듭니다.
pub fn format_line(
    timestamp: &str,
    local_ip: IpAddr,
    app_name: &str,
    event: &ClassifiedEvent,
) -> String {
    format!(
        "{timestamp} {local_ip} {app_name} source={} event={} clientID={} Message={}",
        event.source_ip, event.event_type, event.client_id, event.raw_message
    )
}

/// syslog 대상으로 향하는 로컬 인터페이스 주소를 찾습니다.
///
/// UDP 소켓을 대상에 `connect`한 뒤 로컬 주소를 읽습니다. 패킷은 보내지 않습니다.
/// 찾지 못하면 `127.0.0.1`입니다.
pub async fn discover_local_ip(target: &str) -> IpAddr {
    let fallback = IpAddr::V4(Ipv4Addr::LOCALHOST);
    let addr = match resolve_target(target).await {
        Ok(addr) => addr,
        Err(e) => {
            debug!(syslog_target = target, error = %e, "local ip discovery failed, using loopback");
            return fallback;
        }
    };
    let bind = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };

    let local = async {
        let socket = UdpSocket::bind(bind).await?;
        socket.connect(addr).await?;
        socket.local_addr()
    };
    match local.await {
        Ok(local) if !local.ip().is_unspecified() => local.ip(),
        Ok(_) => fallback,
        Err(e) => {
            debug!(syslog_target = target, error = %e, "local ip discovery failed, using loopback");
            fallback
        }
    }
}

/// 이벤트를 syslog로 보내는 송신기
pub struct SyslogEmitter<S> {
    sink: S,
    local_ip: IpAddr,
    app_name: String,
    wall_clock: bool,
}

impl<S: EventSink> SyslogEmitter<S> {
    /// 로컬 주소 `127.0.0.1`, 레코드 타임스탬프를 쓰는 송신기를 만듭니다.
    pub fn new(sink: S, app_name: impl Into<String>) -> Self {
        Self {
            sink,
            local_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            app_name: app_name.into(),
            wall_clock: false,
        }
    }

    /// 라인에 들어갈 로컬 주소를 지정합니다.
    pub fn with_local_ip(mut self, local_ip: IpAddr) -> Self {
        self.local_ip = local_ip;
        self
    }

    /// 레코드 타임스탬프 대신 현재 시각을 쓸지 지정합니다.
    pub fn with_wall_clock(mut self, wall_clock: bool) -> Self {
        self.wall_clock = wall_clock;
        self
    }

    /// 라인에 들어가는 로컬 주소
    pub fn local_ip(&self) -> IpAddr {
        self.local_ip
    }

    /// 현재 시각 모드 여부
    pub fn uses_wall_clock(&self) -> bool {
        self.wall_clock
    }

    /// 내부 전송기
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// PRI를 포함한 전송용 라인을 만듭니다.
    pub fn render(&self, event: &ClassifiedEvent) -> String {
        let line = if self.wall_clock {
            let now = Utc::now().format(WALL_CLOCK_FORMAT).to_string();
            format_line(&now, self.local_ip, &self.app_name, event)
        } else {
            format_line(&event.timestamp, self.local_ip, &self.app_name, event)
        };
        format!("<{}>{line}", priority(event.event_type))
    }

    /// 이벤트를 전송합니다. 실패는 기록만 하고, 전송 성공 여부를 돌려줍니다.
    pub async fn emit(&self, event: &ClassifiedEvent) -> bool {
        let wire = self.render(event);
        match self.sink.send(&wire).await {
            Ok(()) => {
                counter!(
                    m::INGEST_EVENTS_EMITTED_TOTAL,
                    m::LABEL_EVENT_TYPE => event.event_type.as_str()
                )
                .increment(1);
                true
            }
            Err(e) => {
                counter!(
                    m::SYSLOG_SINK_ERRORS_TOTAL,
                    m::LABEL_PROTOCOL => self.sink.protocol()
                )
                .increment(1);
                warn!(
                    protocol = self.sink.protocol(),
                    event_type = %event.event_type,
                    client_id = %event.client_id,
                    error = %e,
                    "failed to send syslog event"
                );
                false
            }
        }
    }
}
