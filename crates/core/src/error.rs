//! 에러 타입: 도메인별 에러 정의

/// iotsentry 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum IotsentryError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 수집 파이프라인 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 플랫폼 API 에러
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// IoT 플랫폼 API 에러
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// 2xx가 아닌 응답
    #[error("platform returned {status} for {url}")]
    Status { status: u16, url: String },

    /// 연결/타임아웃 등 전송 실패
    #[error("platform request failed: {0}")]
    Http(String),

    /// 응답 본문 디코딩 실패
    #[error("failed to decode platform response: {0}")]
    Decode(String),
}

/// 수집 파이프라인 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 이미 실행 중
    #[error("scheduler already running")]
    AlreadyRunning,

    /// 실행 중이 아님
    #[error("scheduler not running")]
    NotRunning,

    /// 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 사이클 실행 실패 (해당 사이클에 한정)
    #[error("cycle failed: {0}")]
    CycleFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_top_level() {
        let err: IotsentryError = ConfigError::InvalidValue {
            field: "syslog.port".to_owned(),
            reason: "must be greater than 0".to_owned(),
        }
        .into();
        assert!(matches!(err, IotsentryError::Config(_)));
        assert!(err.to_string().contains("syslog.port"));
    }

    #[test]
    fn platform_status_display() {
        let err: IotsentryError = PlatformError::Status {
            status: 401,
            url: "https://org.example/api/v0002/bulk/devices".to_owned(),
        }
        .into();
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn pipeline_error_display() {
        let err = PipelineError::CycleFailed("device page 3 failed".to_owned());
        assert_eq!(err.to_string(), "cycle failed: device page 3 failed");
    }
}
