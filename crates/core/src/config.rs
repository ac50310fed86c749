//! 설정 관리: iotsentry.toml 파싱 및 런타임 설정
//!
//! [`IotsentryConfig`]는 커넥터 전체 설정을 담는 최상위 구조체입니다.
//! 시작 시 한 번 로드되며 이후 읽기 전용입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`IOTSENTRY_SYSLOG_HOST=10.0.0.9` 형식)
//! 3. 설정 파일 (`iotsentry.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), iotsentry_core::error::IotsentryError> {
//! use iotsentry_core::config::IotsentryConfig;
//!
//! let config = IotsentryConfig::load("iotsentry.toml").await?;
//! let config = IotsentryConfig::parse("[syslog]\nhost = \"10.0.0.9\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, IotsentryError};
use crate::types::FetchMode;

/// `base_url`이 비어 있을 때 쓰는 플랫폼 도메인
const PLATFORM_DOMAIN: &str = "internetofthings.ibmcloud.com";

/// iotsentry 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IotsentryConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 플랫폼 API 설정
    #[serde(default)]
    pub platform: PlatformConfig,
    /// syslog 전송 설정
    #[serde(default)]
    pub syslog: SyslogConfig,
    /// 수집 주기/모드 설정
    #[serde(default)]
    pub connector: ConnectorConfig,
    /// 제어 HTTP 서버 설정
    #[serde(default)]
    pub control: ControlConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl IotsentryConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용한 뒤 검증합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, IotsentryError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드, 검증 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, IotsentryError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IotsentryError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                IotsentryError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, IotsentryError> {
        toml::from_str(toml_str).map_err(|e| {
            IotsentryError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 네이밍 규칙: `IOTSENTRY_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "IOTSENTRY_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "IOTSENTRY_GENERAL_LOG_FORMAT");

        // Platform
        override_string(&mut self.platform.org_id, "IOTSENTRY_PLATFORM_ORG_ID");
        override_string(&mut self.platform.api_key, "IOTSENTRY_PLATFORM_API_KEY");
        override_string(&mut self.platform.api_token, "IOTSENTRY_PLATFORM_API_TOKEN");
        override_string(&mut self.platform.base_url, "IOTSENTRY_PLATFORM_BASE_URL");
        override_u64(
            &mut self.platform.request_timeout_secs,
            "IOTSENTRY_PLATFORM_REQUEST_TIMEOUT_SECS",
        );

        // Syslog
        override_string(&mut self.syslog.host, "IOTSENTRY_SYSLOG_HOST");
        override_u16(&mut self.syslog.port, "IOTSENTRY_SYSLOG_PORT");
        override_string(&mut self.syslog.protocol, "IOTSENTRY_SYSLOG_PROTOCOL");
        override_string(&mut self.syslog.app_name, "IOTSENTRY_SYSLOG_APP_NAME");
        override_u64(
            &mut self.syslog.send_timeout_secs,
            "IOTSENTRY_SYSLOG_SEND_TIMEOUT_SECS",
        );

        // Connector
        override_u32(
            &mut self.connector.device_page_size,
            "IOTSENTRY_CONNECTOR_DEVICE_PAGE_SIZE",
        );
        override_i64(
            &mut self.connector.log_fetch_limit,
            "IOTSENTRY_CONNECTOR_LOG_FETCH_LIMIT",
        );
        override_u64(
            &mut self.connector.poll_interval_secs,
            "IOTSENTRY_CONNECTOR_POLL_INTERVAL_SECS",
        );
        override_u64(&mut self.connector.max_cycles, "IOTSENTRY_CONNECTOR_MAX_CYCLES");
        override_bool(&mut self.connector.replay_mode, "IOTSENTRY_CONNECTOR_REPLAY_MODE");
        override_string(&mut self.connector.replay_file, "IOTSENTRY_CONNECTOR_REPLAY_FILE");
        override_bool(&mut self.connector.autostart, "IOTSENTRY_CONNECTOR_AUTOSTART");

        // Control
        override_bool(&mut self.control.enabled, "IOTSENTRY_CONTROL_ENABLED");
        override_string(&mut self.control.bind, "IOTSENTRY_CONTROL_BIND");

        // Metrics
        override_bool(&mut self.metrics.enabled, "IOTSENTRY_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "IOTSENTRY_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "IOTSENTRY_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 여기서 실패하면 스케줄러 시작 전에 프로세스가 종료되어야 합니다.
    pub fn validate(&self) -> Result<(), IotsentryError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        // 재생 모드에서는 플랫폼 API를 호출하지 않으므로 자격 증명이 필요 없음
        if self.connector.replay_mode {
            if self.connector.replay_file.is_empty() {
                return Err(invalid(
                    "connector.replay_file",
                    "replay_file must be set when replay_mode is enabled".to_owned(),
                ));
            }
            if !Path::new(&self.connector.replay_file).is_file() {
                return Err(invalid(
                    "connector.replay_file",
                    format!("file does not exist: {}", self.connector.replay_file),
                ));
            }
        } else {
            for (field, value) in [
                ("platform.org_id", &self.platform.org_id),
                ("platform.api_key", &self.platform.api_key),
                ("platform.api_token", &self.platform.api_token),
            ] {
                if value.is_empty() {
                    return Err(invalid(
                        field,
                        "required unless connector.replay_mode is enabled".to_owned(),
                    ));
                }
            }
        }

        if self.platform.request_timeout_secs == 0 {
            return Err(invalid(
                "platform.request_timeout_secs",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.syslog.host.is_empty() {
            return Err(invalid("syslog.host", "must not be empty".to_owned()));
        }
        if self.syslog.port == 0 {
            return Err(invalid("syslog.port", "must be greater than 0".to_owned()));
        }
        let valid_protocols = ["udp", "tcp"];
        if !valid_protocols.contains(&self.syslog.protocol.as_str()) {
            return Err(invalid(
                "syslog.protocol",
                format!("must be one of: {}", valid_protocols.join(", ")),
            ));
        }
        if self.syslog.app_name.chars().any(char::is_whitespace) {
            return Err(invalid(
                "syslog.app_name",
                "must not contain whitespace".to_owned(),
            ));
        }
        if self.syslog.send_timeout_secs == 0 {
            return Err(invalid(
                "syslog.send_timeout_secs",
                "must be greater than 0".to_owned(),
            ));
        }

        const MAX_PAGE_SIZE: u32 = 1000;
        if self.connector.device_page_size == 0 || self.connector.device_page_size > MAX_PAGE_SIZE
        {
            return Err(invalid(
                "connector.device_page_size",
                format!("must be 1-{MAX_PAGE_SIZE}"),
            ));
        }

        if FetchMode::from_limit(self.connector.log_fetch_limit).is_none() {
            return Err(invalid(
                "connector.log_fetch_limit",
                "must be 0 (window), -1 (unbounded) or a positive count".to_owned(),
            ));
        }

        if self.connector.poll_interval_secs == 0 {
            return Err(invalid(
                "connector.poll_interval_secs",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.control.enabled && self.control.bind.is_empty() {
            return Err(invalid(
                "control.bind",
                "must not be empty when control is enabled".to_owned(),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> IotsentryError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// IoT 플랫폼 API 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// 조직 ID
    pub org_id: String,
    /// API 키 (basic auth 사용자명)
    pub api_key: String,
    /// API 토큰 (basic auth 비밀번호)
    pub api_token: String,
    /// API 기본 URL. 비어 있으면 조직 ID로 생성합니다.
    pub base_url: String,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            org_id: String::new(),
            api_key: String::new(),
            api_token: String::new(),
            base_url: String::new(),
            request_timeout_secs: 30,
        }
    }
}

impl PlatformConfig {
    /// 실제 요청에 사용할 기본 URL (끝의 `/` 제거)
    pub fn resolved_base_url(&self) -> String {
        if self.base_url.is_empty() {
            format!("https://{}.{PLATFORM_DOMAIN}/api/v0002", self.org_id)
        } else {
            self.base_url.trim_end_matches('/').to_owned()
        }
    }
}

/// syslog 전송 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyslogConfig {
    /// SIEM syslog 수신 호스트
    pub host: String,
    /// SIEM syslog 수신 포트
    pub port: u16,
    /// 전송 프로토콜 (udp, tcp)
    pub protocol: String,
    /// syslog 라인의 애플리케이션 이름
    pub app_name: String,
    /// TCP 연결/쓰기 타임아웃 (초)
    pub send_timeout_secs: u64,
}

impl Default for SyslogConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 514,
            protocol: "udp".to_owned(),
            app_name: "WIoTP:Connection".to_owned(),
            send_timeout_secs: 5,
        }
    }
}

impl SyslogConfig {
    /// `host:port` 형식의 대상 주소
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 수집 주기/모드 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// 디바이스 목록 페이지 크기
    pub device_page_size: u32,
    /// 로그 조회 전략: 0 = window, -1 = unbounded, N = count
    pub log_fetch_limit: i64,
    /// 폴링 주기 (초)
    pub poll_interval_secs: u64,
    /// 최대 사이클 수 (0 = 무제한)
    pub max_cycles: u64,
    /// 재생 모드 (플랫폼 API 대신 파일 입력)
    pub replay_mode: bool,
    /// 재생 파일 경로
    pub replay_file: String,
    /// 기동 직후 자동으로 수집 시작
    pub autostart: bool,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            device_page_size: 100,
            log_fetch_limit: 0,
            poll_interval_secs: 15,
            max_cycles: 0,
            replay_mode: false,
            replay_file: String::new(),
            autostart: true,
        }
    }
}

impl ConnectorConfig {
    /// 설정된 로그 조회 모드
    ///
    /// 검증을 통과한 설정에서는 항상 유효한 모드를 반환합니다.
    pub fn fetch_mode(&self) -> FetchMode {
        FetchMode::from_limit(self.log_fetch_limit).unwrap_or(FetchMode::Window)
    }
}

/// 제어 HTTP 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub bind: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "0.0.0.0:8000".to_owned(),
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 리슨 주소
    pub listen_addr: String,
    /// 리슨 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9102,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_parsed<T: std::str::FromStr>(target: &mut T, env_key: &str, type_name: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                type_name,
                "failed to parse env var, ignoring"
            ),
        }
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    override_parsed(target, env_key, "bool");
}

fn override_u16(target: &mut u16, env_key: &str) {
    override_parsed(target, env_key, "u16");
}

fn override_u32(target: &mut u32, env_key: &str) {
    override_parsed(target, env_key, "u32");
}

fn override_u64(target: &mut u64, env_key: &str) {
    override_parsed(target, env_key, "u64");
}

fn override_i64(target: &mut i64, env_key: &str) {
    override_parsed(target, env_key, "i64");
}
