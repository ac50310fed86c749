//! 도메인 타입: 수집 파이프라인 전역에서 사용되는 공통 타입
//!
//! 플랫폼 API, 재생 파일, 분류기, syslog 송신기가 이 타입들로 데이터를 주고받습니다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 플랫폼 API 시간 파라미터 형식 (ISO8601, 초 단위)
pub const ISO_SECONDS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// 디바이스 카탈로그의 단일 항목
///
/// 매 사이클마다 새로 조회하며 사이클 간에 캐싱하지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// 디바이스 타입 ID
    pub type_id: String,
    /// 디바이스 ID
    pub device_id: String,
    /// 플랫폼 연결 식별자 (예: `d:org:type:id`)
    #[serde(default)]
    pub client_id: String,
    /// 디바이스 메타데이터 (없으면 빈 객체)
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Device {
    /// 테스트와 재생 경로에서 쓰는 간단한 생성자
    pub fn new(
        type_id: impl Into<String>,
        device_id: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            type_id: type_id.into(),
            device_id: device_id.into(),
            client_id: client_id.into(),
            metadata: serde_json::Map::new(),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_id, self.device_id)
    }
}

/// 연결 로그 레코드
///
/// 플랫폼 예시: `{"timestamp": "2018-02-28T20:02:50.585Z", "message": "Token auth succeeded: ..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// ISO8601 타임스탬프 (원문 그대로 보존)
    pub timestamp: String,
    /// 자유 형식 메시지
    pub message: String,
}

impl LogRecord {
    /// 새 로그 레코드를 생성합니다.
    pub fn new(timestamp: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            message: message.into(),
        }
    }
}

/// 분류된 보안 이벤트 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    AuthSucceeded,
    AuthFailed,
    ConnClosedNormal,
    ConnClosedByClient,
    ConnClosedUnauthorized,
    Generic,
    Unknown,
}

impl EventType {
    /// syslog 라인과 메트릭 레이블에 쓰는 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthSucceeded => "AuthSucceeded",
            Self::AuthFailed => "AuthFailed",
            Self::ConnClosedNormal => "ConnClosedNormal",
            Self::ConnClosedByClient => "ConnClosedByClient",
            Self::ConnClosedUnauthorized => "ConnClosedUnauthorized",
            Self::Generic => "Generic",
            Self::Unknown => "Unknown",
        }
    }

    /// SIEM 쪽에서 주의가 필요한 이벤트인지 여부
    pub fn is_suspicious(&self) -> bool {
        matches!(self, Self::AuthFailed | Self::ConnClosedUnauthorized)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 로그 레코드 하나에서 결정적으로 도출된 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedEvent {
    /// 원본 레코드의 타임스탬프
    pub timestamp: String,
    /// 출발지 IP (추출 실패 시 `"NA"`)
    pub source_ip: String,
    /// 이벤트 유형
    pub event_type: EventType,
    /// 클라이언트 ID
    pub client_id: String,
    /// 원본 메시지 전체
    pub raw_message: String,
}

/// 로그 조회 모드 (설정의 `log_fetch_limit`에서 결정)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchMode {
    /// 직전 사이클 이후 시간 구간만 조회
    Window,
    /// 최근 N개만 조회
    Count(u32),
    /// 전체 조회
    Unbounded,
}

impl FetchMode {
    /// `0` = window, `-1` = unbounded, `N > 0` = count
    ///
    /// `-1` 미만은 `None`을 반환합니다.
    pub fn from_limit(limit: i64) -> Option<Self> {
        match limit {
            0 => Some(Self::Window),
            -1 => Some(Self::Unbounded),
            n if n > 0 => Some(Self::Count(u32::try_from(n).unwrap_or(u32::MAX))),
            _ => None,
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Window => f.write_str("window"),
            Self::Count(n) => write!(f, "count({n})"),
            Self::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// 로그 조회 시간 구간
///
/// 불변식: `from <= to`. `from`은 직전 사이클의 `to`로만 전진하며 되감기지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl FetchWindow {
    /// 시작 시각에서 길이 0인 구간을 만듭니다.
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self { from: now, to: now }
    }

    /// 구간 시작 시각
    pub fn from_time(&self) -> DateTime<Utc> {
        self.from
    }

    /// 구간 끝 시각
    pub fn to_time(&self) -> DateTime<Utc> {
        self.to
    }

    /// 플랫폼 API 형식의 시작 시각
    pub fn from_iso(&self) -> String {
        self.from.format(ISO_SECONDS_FORMAT).to_string()
    }

    /// 플랫폼 API 형식의 끝 시각
    pub fn to_iso(&self) -> String {
        self.to.format(ISO_SECONDS_FORMAT).to_string()
    }

    /// 사이클 종료 후 구간을 전진시킵니다.
    ///
    /// `from`은 이전 `to`가 되고, `to`는 `now`가 됩니다.
    /// 시계가 뒤로 가더라도 `to`는 `from`보다 작아지지 않습니다.
    pub fn advance(&mut self, now: DateTime<Utc>) {
        self.from = self.to;
        self.to = now.max(self.from);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn device_deserializes_without_metadata() {
        let json = r#"{"typeId":"NXPDev","deviceId":"testSub","clientId":"d:li0f0v:NXPDev:testSub"}"#;
        let device: Device = serde_json::from_str(json).unwrap();
        assert_eq!(device.type_id, "NXPDev");
        assert_eq!(device.client_id, "d:li0f0v:NXPDev:testSub");
        assert!(device.metadata.is_empty());
        assert_eq!(device.to_string(), "NXPDev/testSub");
    }

    #[test]
    fn device_ignores_unknown_fields() {
        let json = r#"{"typeId":"t","deviceId":"d","clientId":"c","deviceInfo":{},"metadata":{"k":1}}"#;
        let device: Device = serde_json::from_str(json).unwrap();
        assert_eq!(device.metadata.get("k"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn fetch_mode_from_limit() {
        assert_eq!(FetchMode::from_limit(0), Some(FetchMode::Window));
        assert_eq!(FetchMode::from_limit(-1), Some(FetchMode::Unbounded));
        assert_eq!(FetchMode::from_limit(25), Some(FetchMode::Count(25)));
        assert_eq!(FetchMode::from_limit(-2), None);
    }

    #[test]
    fn window_advances_to_previous_end() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 15).unwrap();
        let mut window = FetchWindow::starting_at(t0);
        window.advance(t1);
        assert_eq!(window.from_time(), t0);
        assert_eq!(window.to_time(), t1);
        assert_eq!(window.from_iso(), "2024-01-15T12:00:00");
        assert_eq!(window.to_iso(), "2024-01-15T12:00:15");
    }

    #[test]
    fn window_never_rewinds_on_clock_skew() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 15, 12, 1, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2024, 1, 15, 11, 0, 0).unwrap();
        let mut window = FetchWindow::starting_at(t0);
        window.advance(t1);
        window.advance(earlier);
        assert_eq!(window.from_time(), t1);
        assert_eq!(window.to_time(), t1);
    }

    #[test]
    fn suspicious_event_types() {
        assert!(EventType::AuthFailed.is_suspicious());
        assert!(EventType::ConnClosedUnauthorized.is_suspicious());
        assert!(!EventType::ConnClosedByClient.is_suspicious());
        assert_eq!(EventType::ConnClosedByClient.to_string(), "ConnClosedByClient");
    }
}
