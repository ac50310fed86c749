//! iotsentry 수집 파이프라인
//!
//! IoT 플랫폼의 디바이스 연결 로그를 주기적으로 가져와 보안 이벤트로 분류하고
//! SIEM이 받는 syslog 라인으로 전송합니다.
//!
//! # 모듈 구성
//!
//! - [`platform`]: 플랫폼 REST API 클라이언트 (디바이스 목록, 연결 로그)
//! - [`catalog`]: 북마크 기반 디바이스 카탈로그 순회
//! - [`fetch`]: 로그 조회 모드 선택 (window / count / unbounded, 콜드 스타트)
//! - [`replay`]: 캡처 파일 재생 입력
//! - [`classifier`]: 연결 로그 메시지 분류
//! - [`emitter`]: syslog 라인 포맷과 송신
//! - [`sink`]: UDP/TCP syslog 전송
//! - [`scheduler`]: 폴링 사이클 반복
//! - [`lifecycle`]: `start` / `stop` / `interrupt` 제어 핸들
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! PlatformClient -> DeviceCatalogWalker -> connection_logs -> classify -> SyslogEmitter -> EventSink
//!       |                                        ^                              |
//!  ReplaySource ---------------------------------+                        UDP / TCP syslog
//!
//! LifecycleController <- control HTTP / signals
//!         |
//! PollCycleScheduler (cycle -> sleep -> cycle ...)
//! ```

pub mod catalog;
pub mod classifier;
pub mod emitter;
pub mod error;
pub mod fetch;
pub mod lifecycle;
pub mod platform;
pub mod replay;
pub mod scheduler;
pub mod sink;

// --- 주요 타입 re-export ---

// 스케줄러
pub use scheduler::{
    CycleReport, CycleSource, PollCycleScheduler, PollCycleSchedulerBuilder, SchedulerConfig,
};

// 수명 주기
pub use lifecycle::{LifecycleController, SchedulerState};

// 에러
pub use error::IngestError;

// 플랫폼
pub use catalog::DeviceCatalogWalker;
pub use platform::{DevicePage, HttpPlatformClient, PlatformClient};

// 조회
pub use fetch::{LogFetchStrategy, LogQuery};
pub use replay::{ReplayReader, ReplaySource};

// 분류
pub use classifier::{Matcher, classify};

// 송신
pub use emitter::{SyslogEmitter, discover_local_ip};
pub use sink::{EventSink, SyslogSink, TcpSyslogSink, UdpSyslogSink};
