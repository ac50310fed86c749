//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 수집 모듈은 이 상수로 `metrics::counter!()`, `metrics::gauge!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `iotsentry_`
//! - 모듈명: `ingest_`, `syslog_`, `daemon_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(iotsentry_core::metrics::INGEST_CYCLES_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 이벤트 유형 레이블 키 (AuthSucceeded, AuthFailed, ...)
pub const LABEL_EVENT_TYPE: &str = "event_type";

/// 조회 모드 레이블 키 (window, count, unbounded)
pub const LABEL_FETCH_MODE: &str = "mode";

/// 전송 프로토콜 레이블 키 (udp, tcp)
pub const LABEL_PROTOCOL: &str = "protocol";

// ─── Ingest 메트릭 ─────────────────────────────────────────────────

/// Ingest: 완료된 사이클 수 (counter)
pub const INGEST_CYCLES_TOTAL: &str = "iotsentry_ingest_cycles_total";

/// Ingest: 사이클 단위 실패 수 (counter)
pub const INGEST_CYCLE_ERRORS_TOTAL: &str = "iotsentry_ingest_cycle_errors_total";

/// Ingest: 방문한 디바이스 수 (counter)
pub const INGEST_DEVICES_VISITED_TOTAL: &str = "iotsentry_ingest_devices_visited_total";

/// Ingest: 디바이스별 로그 조회 실패 수 (counter)
pub const INGEST_DEVICE_FETCH_ERRORS_TOTAL: &str = "iotsentry_ingest_device_fetch_errors_total";

/// Ingest: 분류 후 전송한 이벤트 수 (counter, label: event_type)
pub const INGEST_EVENTS_EMITTED_TOTAL: &str = "iotsentry_ingest_events_emitted_total";

/// Ingest: 건너뛴 재생 파일 라인 수 (counter)
pub const INGEST_REPLAY_LINES_SKIPPED_TOTAL: &str = "iotsentry_ingest_replay_lines_skipped_total";

/// Ingest: 현재까지 실행한 사이클 번호 (gauge)
pub const INGEST_LOOP_COUNT: &str = "iotsentry_ingest_loop_count";

// ─── Syslog 메트릭 ─────────────────────────────────────────────────

/// Syslog: 전송 실패 수 (counter, label: protocol)
pub const SYSLOG_SINK_ERRORS_TOTAL: &str = "iotsentry_syslog_sink_errors_total";

// ─── Daemon 메트릭 ─────────────────────────────────────────────────

/// Daemon: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "iotsentry_daemon_build_info";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `iotsentry-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    // Ingest
    describe_counter!(INGEST_CYCLES_TOTAL, "Total number of completed poll cycles");
    describe_counter!(
        INGEST_CYCLE_ERRORS_TOTAL,
        "Total number of cycles that ended with a page-listing or replay error"
    );
    describe_counter!(
        INGEST_DEVICES_VISITED_TOTAL,
        "Total number of devices visited across all cycles"
    );
    describe_counter!(
        INGEST_DEVICE_FETCH_ERRORS_TOTAL,
        "Total number of per-device connection log fetch failures"
    );
    describe_counter!(
        INGEST_EVENTS_EMITTED_TOTAL,
        "Total number of classified events handed to the syslog sink, by event type"
    );
    describe_counter!(
        INGEST_REPLAY_LINES_SKIPPED_TOTAL,
        "Total number of malformed replay file lines skipped"
    );
    describe_gauge!(
        INGEST_LOOP_COUNT,
        "Number of cycles executed since the scheduler started"
    );

    // Syslog
    describe_counter!(
        SYSLOG_SINK_ERRORS_TOTAL,
        "Total number of syslog transport failures"
    );

    // Daemon
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version label)"
    );
}
