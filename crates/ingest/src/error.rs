//! 수집 파이프라인 에러 타입
//!
//! [`IngestError`]는 디바이스 순회, 로그 조회, 재생, syslog 전송 중 발생하는 에러를 표현합니다.
//! `From<IngestError> for IotsentryError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.

use iotsentry_core::error::{IotsentryError, PipelineError, PlatformError};

/// 수집 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// 플랫폼 API 호출 실패
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// 플랫폼이 보낸 것과 같은 북마크를 돌려줌 (페이지 순회가 끝나지 않음)
    #[error("device listing returned the cursor it was given: {bookmark}")]
    CursorLoop {
        /// 반복된 북마크
        bookmark: String,
    },

    /// 재생 파일 읽기 실패
    #[error("replay error: {path}: {reason}")]
    Replay {
        /// 재생 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// syslog 전송 실패
    #[error("syslog sink error: {target}: {reason}")]
    Sink {
        /// 전송 대상 (`host:port`)
        target: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl From<IngestError> for IotsentryError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Platform(e) => IotsentryError::Platform(e),
            IngestError::Config { .. } => {
                IotsentryError::Pipeline(PipelineError::InitFailed(err.to_string()))
            }
            other => IotsentryError::Pipeline(PipelineError::CycleFailed(other.to_string())),
        }
    }
}
