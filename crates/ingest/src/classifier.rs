//! 연결 로그 분류기
//!
//! 플랫폼 연결 로그 메시지 한 줄을 [`ClassifiedEvent`]로 변환합니다.
//! 분류는 순수 함수이며 어떤 입력에도 실패하지 않습니다.
//!
//! # 매처 우선순위
//!
//! 1. [`Matcher::Auth`]: `Token auth succeeded: ClientID='...', ClientIP=...`
//! 2. [`Matcher::ConnClosed`]: `Closed connection from 1.2.3.4. ...`
//! 3. [`Matcher::Generic`]: 메시지 어딘가의 `ClientIP=...`
//!
//! 인증/연결 종료 메시지에도 `ClientIP=`가 들어갈 수 있으므로
//! Generic은 항상 마지막에 시도합니다. 아무것도 맞지 않으면 `Unknown`입니다.

use std::sync::LazyLock;

use iotsentry_core::types::{ClassifiedEvent, EventType, LogRecord};
use regex::Regex;

/// 출발지 IP를 알 수 없을 때 쓰는 값
pub const UNKNOWN_SOURCE_IP: &str = "NA";

static AUTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*): ClientID=\S(.*?)\S, ClientIP=(.*)").expect("auth regex is valid")
});

static CONN_CLOSED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Closed\sconnection\sfrom\s(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})\.(.*)")
        .expect("connection-closed regex is valid")
});

static CLIENT_IP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ClientIP=([^\s,]+)").expect("client ip regex is valid"));

/// 단일 매처가 만든 부분 결과
#[derive(Debug, Clone, PartialEq, Eq)]
struct Partial {
    event_type: EventType,
    source_ip: String,
    /// 메시지에서 읽은 클라이언트 ID (호출자 값보다 우선)
    client_id: Option<String>,
}

/// 메시지 매처 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// 토큰 인증 성공/실패
    Auth,
    /// 연결 종료
    ConnClosed,
    /// `ClientIP=` 토큰만 있는 일반 메시지
    Generic,
}

impl Matcher {
    /// 적용 순서. 먼저 맞는 매처가 결과를 결정합니다.
    pub const ORDER: [Matcher; 3] = [Matcher::Auth, Matcher::ConnClosed, Matcher::Generic];

    fn apply(&self, message: &str) -> Option<Partial> {
        match self {
            Self::Auth => {
                let caps = AUTH_RE.captures(message)?;
                let leading = caps.get(1).map_or("", |m| m.as_str());
                let event_type = if leading.contains("failed") {
                    EventType::AuthFailed
                } else {
                    EventType::AuthSucceeded
                };
                Some(Partial {
                    event_type,
                    source_ip: caps.get(3).map_or("", |m| m.as_str()).trim().to_owned(),
                    client_id: caps.get(2).map(|m| m.as_str().to_owned()),
                })
            }
            Self::ConnClosed => {
                let caps = CONN_CLOSED_RE.captures(message)?;
                let rest = caps.get(2).map_or("", |m| m.as_str());
                let event_type = if rest.contains("not authorized") {
                    EventType::ConnClosedUnauthorized
                } else if rest.contains("by the client") || rest.contains("by client") {
                    EventType::ConnClosedByClient
                } else {
                    EventType::ConnClosedNormal
                };
                Some(Partial {
                    event_type,
                    source_ip: caps.get(1).map_or("", |m| m.as_str()).to_owned(),
                    client_id: None,
                })
            }
            Self::Generic => {
                let caps = CLIENT_IP_RE.captures(message)?;
                Some(Partial {
                    event_type: EventType::Generic,
                    source_ip: caps.get(1).map_or("", |m| m.as_str()).to_owned(),
                    client_id: None,
                })
            }
        }
    }
}

/// 로그 레코드를 분류합니다.
///
/// `client_id`는 레코드를 가져온 디바이스의 연결 ID입니다.
/// 인증 메시지에 들어 있는 ClientID가 있으면 그 값으로 대체됩니다.
pub fn classify(client_id: &str, record: &LogRecord) -> ClassifiedEvent {
    let partial = Matcher::ORDER
        .iter()
        .find_map(|m| m.apply(&record.message))
        .unwrap_or_else(|| Partial {
            event_type: EventType::Unknown,
            source_ip: UNKNOWN_SOURCE_IP.to_owned(),
            client_id: None,
        });

    ClassifiedEvent {
        timestamp: record.timestamp.clone(),
        source_ip: partial.source_ip,
        event_type: partial.event_type,
        client_id: partial.client_id.unwrap_or_else(|| client_id.to_owned()),
        raw_message: record.message.clone(),
    }
}
