//! iotsentry 공통 크레이트
//!
//! IoT 연결 로그 수집기 전반에서 공유하는 도메인 타입, 에러, 설정, 메트릭 이름을 제공합니다.
//! 수집 파이프라인(`iotsentry-ingest`)과 데몬(`iotsentry-daemon`)이 모두 이 크레이트에 의존합니다.

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, IotsentryError, PipelineError, PlatformError};

// 설정
pub use config::IotsentryConfig;

// 도메인 타입
pub use types::{ClassifiedEvent, Device, EventType, FetchMode, FetchWindow, LogRecord};
