//! 폴링 사이클 스케줄러
//!
//! [`PollCycleScheduler`]는 백그라운드 태스크 하나에서 사이클을 순서대로 실행합니다.
//!
//! 한 사이클은 다음과 같습니다.
//! 1. 디바이스 카탈로그를 처음부터 순회 (재생 모드에서는 재생 파일을 처음부터 읽음)
//! 2. 디바이스마다 연결 로그 조회 → 분류 → syslog 전송
//! 3. 조회 구간 전진 (`from = to`, `to = now`), 사이클 수 증가
//!
//! 사이클 사이에는 폴링 주기만큼 잠들고, 깨어나면 정지 요청과 최대 사이클 수를 확인합니다.
//! 따라서 `stop()`은 최대 한 주기만큼 늦게 반영됩니다. 인터럽트는 잠든 동안에도 바로 반영됩니다.

use std::time::Duration;

use chrono::Utc;
use iotsentry_core::config::ConnectorConfig;
use iotsentry_core::metrics as m;
use iotsentry_core::types::{FetchMode, FetchWindow};
use metrics::{counter, gauge};
use tracing::{debug, error, info};

use crate::catalog::DeviceCatalogWalker;
use crate::classifier::classify;
use crate::emitter::SyslogEmitter;
use crate::error::IngestError;
use crate::fetch::{LogFetchStrategy, LogQuery};
use crate::lifecycle::{LifecycleController, SchedulerState};
use crate::platform::PlatformClient;
use crate::replay::ReplaySource;
use crate::sink::EventSink;

/// 디바이스 목록 페이지 크기 상한
const MAX_PAGE_SIZE: u32 = 1000;

/// 스케줄러 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// 사이클 사이 대기 시간
    pub poll_interval: Duration,
    /// 최대 사이클 수 (0 = 무제한)
    pub max_cycles: u64,
    /// 디바이스 목록 페이지 크기
    pub device_page_size: u32,
    /// 설정된 로그 조회 모드
    pub fetch_mode: FetchMode,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            max_cycles: 0,
            device_page_size: 100,
            fetch_mode: FetchMode::Window,
        }
    }
}

impl SchedulerConfig {
    /// core의 `[connector]` 설정에서 생성합니다.
    pub fn from_core(core: &ConnectorConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(core.poll_interval_secs),
            max_cycles: core.max_cycles,
            device_page_size: core.device_page_size,
            fetch_mode: core.fetch_mode(),
        }
    }

    /// 설정값을 검증합니다.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.poll_interval.is_zero() {
            return Err(IngestError::Config {
                field: "poll_interval".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.device_page_size == 0 || self.device_page_size > MAX_PAGE_SIZE {
            return Err(IngestError::Config {
                field: "device_page_size".to_owned(),
                reason: format!("must be 1-{MAX_PAGE_SIZE}"),
            });
        }
        Ok(())
    }
}

/// 사이클 입력
pub enum CycleSource<P> {
    /// 플랫폼 API
    Live(P),
    /// 캡처 파일
    Replay(ReplaySource),
}

impl<P> CycleSource<P> {
    /// 재생 모드 여부
    pub fn is_replay(&self) -> bool {
        matches!(self, Self::Replay(_))
    }
}

/// 사이클 하나의 결과 요약
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// 사이클 번호 (1부터)
    pub cycle: u64,
    /// 이번 사이클에 사용한 조회 모드 (재생 모드에서는 `None`)
    pub mode: Option<FetchMode>,
    /// 방문한 디바이스 수
    pub devices_visited: u64,
    /// 전송에 성공한 이벤트 수
    pub events_emitted: u64,
    /// 전송에 실패한 이벤트 수
    pub send_failures: u64,
    /// 로그 조회에 실패한 디바이스 수
    pub device_errors: u64,
    /// 건너뛴 재생 파일 줄 수
    pub lines_skipped: u64,
    /// 사이클 단위 실패 (페이지 조회 실패, 재생 파일 I/O 실패)
    pub cycle_error: Option<String>,
}

impl CycleReport {
    fn new(cycle: u64) -> Self {
        Self {
            cycle,
            ..Self::default()
        }
    }

    fn count_sent(&mut self, delivered: bool) {
        if delivered {
            self.events_emitted += 1;
        } else {
            self.send_failures += 1;
        }
    }

    /// 사이클 단위 실패도 디바이스 실패도 없었는지 여부
    pub fn is_clean(&self) -> bool {
        self.cycle_error.is_none() && self.device_errors == 0
    }
}

/// 폴링 사이클 스케줄러
pub struct PollCycleScheduler<P, S> {
    config: SchedulerConfig,
    source: CycleSource<P>,
    strategy: LogFetchStrategy,
    emitter: SyslogEmitter<S>,
    controller: LifecycleController,
    window: FetchWindow,
    loop_count: u64,
    cold_start_done: bool,
}

impl<P: PlatformClient, S: EventSink> PollCycleScheduler<P, S> {
    /// 외부 제어 핸들
    pub fn controller(&self) -> &LifecycleController {
        &self.controller
    }

    /// 현재 조회 구간
    pub fn window(&self) -> FetchWindow {
        self.window
    }

    /// 완료한 사이클 수
    pub fn loop_count(&self) -> u64 {
        self.loop_count
    }

    /// 콜드 스타트 완료 여부
    pub fn cold_start_done(&self) -> bool {
        self.cold_start_done
    }

    /// 송신기
    pub fn emitter(&self) -> &SyslogEmitter<S> {
        &self.emitter
    }

    fn max_cycles_reached(&self) -> bool {
        self.config.max_cycles > 0 && self.loop_count >= self.config.max_cycles
    }

    /// `start()`를 기다린 뒤 정지/인터럽트까지 사이클을 반복합니다.
    ///
    /// 최종 상태(`Stopped` 또는 `Terminated`)를 반환합니다.
    pub async fn run(mut self) -> SchedulerState {
        info!(
            replay = self.source.is_replay(),
            mode = %self.strategy.configured_mode(),
            interval_secs = self.config.poll_interval.as_secs(),
            max_cycles = self.config.max_cycles,
            "scheduler idle, waiting for start"
        );
        self.controller.wait_for_start().await;

        if self.controller.is_terminated() {
            return SchedulerState::Terminated;
        }
        if self.controller.is_stop_requested() {
            self.controller.set_state(SchedulerState::Stopped);
            info!("stop requested before start, scheduler stopped");
            return SchedulerState::Stopped;
        }

        // 사이클 상태는 시작 시점에 새로 만듭니다.
        self.window = FetchWindow::starting_at(Utc::now());
        self.loop_count = 0;
        self.cold_start_done = false;
        self.controller.publish_loop_count(0);
        self.controller.set_state(SchedulerState::Running);
        info!("scheduler running");

        loop {
            if self.controller.is_running() {
                let report = self.run_cycle().await;
                log_report(&report);
            } else {
                debug!("running flag cleared, skipping cycle body");
            }

            if self.controller.is_terminated() {
                return SchedulerState::Terminated;
            }

            tokio::select! {
                () = tokio::time::sleep(self.config.poll_interval) => {}
                () = self.controller.terminated() => {
                    return SchedulerState::Terminated;
                }
            }

            if self.controller.is_stop_requested() || self.max_cycles_reached() {
                self.controller.set_state(SchedulerState::Stopping);
                break;
            }
        }

        self.controller.set_state(SchedulerState::Stopped);
        info!(loop_count = self.loop_count, "scheduler stopped");
        SchedulerState::Stopped
    }

    /// 사이클 하나를 실행합니다.
    ///
    /// 사이클 단위 실패는 보고서에 담기며, 실패해도 구간은 전진하고 사이클 수는 증가합니다.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let cycle = self.loop_count + 1;
        let mut report = CycleReport::new(cycle);

        let outcome = match &self.source {
            CycleSource::Live(client) => {
                let query = self.strategy.plan(self.cold_start_done, &self.window);
                report.mode = Some(query.mode());
                live_cycle(
                    client,
                    &self.emitter,
                    self.config.device_page_size,
                    &query,
                    &mut report,
                )
                .await
            }
            CycleSource::Replay(source) => replay_cycle(source, &self.emitter, &mut report).await,
        };

        match outcome {
            Ok(()) => self.cold_start_done = true,
            Err(e) => {
                counter!(m::INGEST_CYCLE_ERRORS_TOTAL).increment(1);
                error!(cycle, error = %e, "cycle failed");
                report.cycle_error = Some(e.to_string());
            }
        }

        self.window.advance(Utc::now());
        self.loop_count = cycle;
        self.controller.publish_loop_count(cycle);

        counter!(m::INGEST_CYCLES_TOTAL, m::LABEL_FETCH_MODE => mode_label(report.mode))
            .increment(1);
        #[allow(clippy::cast_precision_loss)]
        gauge!(m::INGEST_LOOP_COUNT).set(cycle as f64);

        report
    }
}

async fn live_cycle<P: PlatformClient, S: EventSink>(
    client: &P,
    emitter: &SyslogEmitter<S>,
    page_size: u32,
    query: &LogQuery,
    report: &mut CycleReport,
) -> Result<(), IngestError> {
    let mut walker = DeviceCatalogWalker::walk(client, page_size);
    while let Some(device) = walker.next_device().await? {
        report.devices_visited += 1;
        counter!(m::INGEST_DEVICES_VISITED_TOTAL).increment(1);

        match client.connection_logs(&device, query).await {
            Ok(records) => {
                debug!(
                    type_id = %device.type_id,
                    device_id = %device.device_id,
                    records = records.len(),
                    "connection logs fetched"
                );
                for record in &records {
                    let event = classify(&device.client_id, record);
                    report.count_sent(emitter.emit(&event).await);
                }
            }
            Err(e) => {
                report.device_errors += 1;
                counter!(m::INGEST_DEVICE_FETCH_ERRORS_TOTAL).increment(1);
                error!(
                    type_id = %device.type_id,
                    device_id = %device.device_id,
                    error = %e,
                    "failed to fetch connection logs"
                );
            }
        }
    }
    Ok(())
}

async fn replay_cycle<S: EventSink>(
    source: &ReplaySource,
    emitter: &SyslogEmitter<S>,
    report: &mut CycleReport,
) -> Result<(), IngestError> {
    let mut reader = source.read().await?;
    while let Some((client_id, record)) = reader.next_record().await? {
        let event = classify(&client_id, &record);
        report.count_sent(emitter.emit(&event).await);
    }
    report.lines_skipped = reader.skipped();
    Ok(())
}

/// 메트릭 레이블과 로그에 쓰는 조회 모드 이름
fn mode_label(mode: Option<FetchMode>) -> &'static str {
    match mode {
        Some(FetchMode::Window) => "window",
        Some(FetchMode::Count(_)) => "count",
        Some(FetchMode::Unbounded) => "unbounded",
        None => "replay",
    }
}

fn log_report(report: &CycleReport) {
    info!(
        cycle = report.cycle,
        mode = mode_label(report.mode),
        devices = report.devices_visited,
        events = report.events_emitted,
        send_failures = report.send_failures,
        device_errors = report.device_errors,
        lines_skipped = report.lines_skipped,
        cycle_error = report.cycle_error.as_deref().unwrap_or(""),
        "cycle complete"
    );
}

/// [`PollCycleScheduler`] 빌더
pub struct PollCycleSchedulerBuilder<P, S> {
    config: SchedulerConfig,
    source: Option<CycleSource<P>>,
    emitter: Option<SyslogEmitter<S>>,
    controller: Option<LifecycleController>,
}

impl<P: PlatformClient, S: EventSink> Default for PollCycleSchedulerBuilder<P, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PlatformClient, S: EventSink> PollCycleSchedulerBuilder<P, S> {
    /// 기본 설정으로 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
            source: None,
            emitter: None,
            controller: None,
        }
    }

    /// 스케줄러 설정을 지정합니다.
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// 플랫폼 API를 입력으로 사용합니다.
    pub fn platform(mut self, client: P) -> Self {
        self.source = Some(CycleSource::Live(client));
        self
    }

    /// 재생 파일을 입력으로 사용합니다. 디바이스 순회도 하지 않습니다.
    pub fn replay(mut self, source: ReplaySource) -> Self {
        self.source = Some(CycleSource::Replay(source));
        self
    }

    /// 이벤트 송신기를 지정합니다.
    pub fn emitter(mut self, emitter: SyslogEmitter<S>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// 외부와 공유할 컨트롤러를 지정합니다. 지정하지 않으면 새로 만듭니다.
    pub fn controller(mut self, controller: LifecycleController) -> Self {
        self.controller = Some(controller);
        self
    }

    /// 스케줄러를 빌드합니다.
    ///
    /// # Errors
    ///
    /// - 설정 검증 실패
    /// - 입력 또는 송신기가 지정되지 않음
    pub fn build(self) -> Result<PollCycleScheduler<P, S>, IngestError> {
        self.config.validate()?;

        let source = self.source.ok_or_else(|| IngestError::Config {
            field: "source".to_owned(),
            reason: "platform client or replay source is required".to_owned(),
        })?;
        let emitter = self.emitter.ok_or_else(|| IngestError::Config {
            field: "emitter".to_owned(),
            reason: "syslog emitter is required".to_owned(),
        })?;

        // 재생 모드에서는 레코드 시각 대신 현재 시각으로 전송
        let emitter = if source.is_replay() {
            emitter.with_wall_clock(true)
        } else {
            emitter
        };

        Ok(PollCycleScheduler {
            strategy: LogFetchStrategy::new(self.config.fetch_mode),
            config: self.config,
            source,
            emitter,
            controller: self.controller.unwrap_or_default(),
            window: FetchWindow::starting_at(Utc::now()),
            loop_count: 0,
            cold_start_done: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use iotsentry_core::types::{Device, LogRecord};

    use crate::platform::{DevicePage, MockPlatformClient};
    use crate::sink::MemorySink;

    const AUTH_OK: &str = "Token auth succeeded: ClientID='d:li0f0v:NXPDev:a', ClientIP=32.97.110.54";
    const CLOSED: &str = "Closed connection from 10.0.0.5. The connection was closed by the client";

    fn device(id: &str) -> Device {
        Device::new("NXPDev", id, format!("d:li0f0v:NXPDev:{id}"))
    }

    fn two_device_client() -> MockPlatformClient {
        MockPlatformClient::new()
            .with_page(None, DevicePage::new(vec![device("a"), device("b")], None))
            .with_logs("a", vec![LogRecord::new("2024-01-01T00:00:00.000Z", AUTH_OK)])
            .with_logs("b", vec![LogRecord::new("2024-01-01T00:00:01.000Z", CLOSED)])
    }

    fn live_scheduler(
        client: MockPlatformClient,
        config: SchedulerConfig,
    ) -> PollCycleScheduler<MockPlatformClient, MemorySink> {
        PollCycleSchedulerBuilder::new()
            .config(config)
            .platform(client)
            .emitter(SyslogEmitter::new(MemorySink::new(), "WIoTP:Connection"))
            .build()
            .unwrap()
    }

    fn fast_config(max_cycles: u64) -> SchedulerConfig {
        SchedulerConfig {
            poll_interval: Duration::from_secs(1),
            max_cycles,
            ..SchedulerConfig::default()
        }
    }

    #[test]
    fn mode_labels() {
        assert_eq!(mode_label(Some(FetchMode::Count(10))), "count");
        assert_eq!(mode_label(None), "replay");
    }

    #[test]
    fn config_from_core() {
        let core = ConnectorConfig {
            poll_interval_secs: 30,
            max_cycles: 2,
            device_page_size: 50,
            log_fetch_limit: 10,
            ..ConnectorConfig::default()
        };
        let config = SchedulerConfig::from_core(&core);
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.max_cycles, 2);
        assert_eq!(config.device_page_size, 50);
        assert_eq!(config.fetch_mode, FetchMode::Count(10));
    }

    #[test]
    fn builder_requires_source_and_emitter() {
        let result = PollCycleSchedulerBuilder::<MockPlatformClient, MemorySink>::new()
            .emitter(SyslogEmitter::new(MemorySink::new(), "app"))
            .build();
        assert!(matches!(result, Err(IngestError::Config { .. })));

        let result = PollCycleSchedulerBuilder::<MockPlatformClient, MemorySink>::new()
            .platform(MockPlatformClient::new())
            .build();
        assert!(matches!(result, Err(IngestError::Config { .. })));
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let result = PollCycleSchedulerBuilder::new()
            .config(SchedulerConfig {
                poll_interval: Duration::ZERO,
                ..SchedulerConfig::default()
            })
            .platform(MockPlatformClient::new())
            .emitter(SyslogEmitter::new(MemorySink::new(), "app"))
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn cycle_emits_events_for_every_device() {
        let mut scheduler = live_scheduler(two_device_client(), fast_config(0));
        let report = scheduler.run_cycle().await;

        assert_eq!(report.cycle, 1);
        assert_eq!(report.devices_visited, 2);
        assert_eq!(report.events_emitted, 2);
        assert!(report.is_clean());

        let lines = scheduler.emitter().sink().lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("event=AuthSucceeded"));
        assert!(lines[1].contains("event=ConnClosedByClient"));
        assert!(lines[1].contains("clientID=d:li0f0v:NXPDev:b"));
    }

    #[tokio::test]
    async fn failed_sends_are_not_counted_as_emitted() {
        let mut scheduler = PollCycleSchedulerBuilder::new()
            .config(fast_config(0))
            .platform(two_device_client())
            .emitter(SyslogEmitter::new(MemorySink::failing(), "WIoTP:Connection"))
            .build()
            .unwrap();
        let report = scheduler.run_cycle().await;

        assert_eq!(report.devices_visited, 2);
        assert_eq!(report.events_emitted, 0);
        assert_eq!(report.send_failures, 2);
        // 전송 실패는 사이클 실패가 아님
        assert!(report.cycle_error.is_none());
        assert!(scheduler.cold_start_done());
    }

    #[tokio::test]
    async fn window_mode_cold_starts_then_uses_window() {
        let mut scheduler = live_scheduler(two_device_client(), fast_config(0));

        let first = scheduler.run_cycle().await;
        assert_eq!(first.mode, Some(FetchMode::Unbounded));
        assert!(scheduler.cold_start_done());

        let second = scheduler.run_cycle().await;
        assert_eq!(second.mode, Some(FetchMode::Window));
    }

    #[tokio::test]
    async fn window_from_equals_previous_to() {
        let mut scheduler = live_scheduler(
            two_device_client().with_failing_device("a"),
            fast_config(0),
        );
        scheduler.run_cycle().await;

        let used = scheduler.window();
        let report = scheduler.run_cycle().await;
        assert_eq!(report.device_errors, 1);
        assert_eq!(scheduler.window().from_time(), used.to_time());
        assert!(scheduler.window().from_time() <= scheduler.window().to_time());
    }

    #[tokio::test]
    async fn device_failure_does_not_stop_later_devices() {
        let mut scheduler = live_scheduler(
            two_device_client().with_failing_device("a"),
            fast_config(0),
        );
        let report = scheduler.run_cycle().await;

        assert_eq!(report.devices_visited, 2);
        assert_eq!(report.device_errors, 1);
        assert_eq!(report.events_emitted, 1);
        assert!(report.cycle_error.is_none());
        let lines = scheduler.emitter().sink().lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("clientID=d:li0f0v:NXPDev:b"));
    }

    #[tokio::test]
    async fn page_failure_is_cycle_error_and_window_still_advances() {
        // 첫 페이지가 구성되어 있지 않아 목록 조회 실패
        let mut scheduler = live_scheduler(MockPlatformClient::new(), fast_config(0));
        let before = scheduler.window();
        let report = scheduler.run_cycle().await;

        assert!(report.cycle_error.is_some());
        assert_eq!(scheduler.loop_count(), 1);
        assert!(!scheduler.cold_start_done());
        assert_eq!(scheduler.window().from_time(), before.to_time());
    }

    #[tokio::test]
    async fn replay_cycle_reads_file_and_uses_wall_clock() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"d:li0f0v:NXPDev:a LOGMSG={{"timestamp":"2018-02-28T20:02:50.585Z","message":"{AUTH_OK}"}}"#
        )
        .unwrap();
        writeln!(file, "not a replay line").unwrap();

        let mut scheduler = PollCycleSchedulerBuilder::<MockPlatformClient, MemorySink>::new()
            .config(fast_config(0))
            .replay(ReplaySource::new(file.path()))
            .emitter(SyslogEmitter::new(MemorySink::new(), "app"))
            .build()
            .unwrap();
        assert!(scheduler.emitter().uses_wall_clock());

        let report = scheduler.run_cycle().await;
        assert_eq!(report.mode, None);
        assert_eq!(report.devices_visited, 0);
        assert_eq!(report.events_emitted, 1);
        assert_eq!(report.lines_skipped, 1);

        let lines = scheduler.emitter().sink().lines();
        assert!(!lines[0].contains("2018-02-28T20:02:50.585Z app"));
        assert!(lines[0].contains("event=AuthSucceeded"));
    }

    #[tokio::test]
    async fn missing_replay_file_is_cycle_error() {
        let mut scheduler = PollCycleSchedulerBuilder::<MockPlatformClient, MemorySink>::new()
            .config(fast_config(0))
            .replay(ReplaySource::new("/nonexistent/replay.log"))
            .emitter(SyslogEmitter::new(MemorySink::new(), "app"))
            .build()
            .unwrap();
        let report = scheduler.run_cycle().await;
        assert!(report.cycle_error.unwrap().contains("/nonexistent/replay.log"));
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_after_max_cycles() {
        let scheduler = live_scheduler(two_device_client(), fast_config(2));
        let controller = scheduler.controller().clone();
        controller.start();

        let state = scheduler.run().await;
        assert_eq!(state, SchedulerState::Stopped);
        assert_eq!(controller.loop_count(), 2);
        assert_eq!(controller.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn run_waits_in_idle_until_start() {
        let scheduler = live_scheduler(two_device_client(), fast_config(1));
        let controller = scheduler.controller().clone();
        let task = tokio::spawn(scheduler.run());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(controller.state(), SchedulerState::Idle);
        assert_eq!(controller.loop_count(), 0);

        controller.start();
        assert_eq!(task.await.unwrap(), SchedulerState::Stopped);
        assert_eq!(controller.loop_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_finishes_current_cycle_then_stops() {
        let scheduler = live_scheduler(two_device_client(), fast_config(0));
        let controller = scheduler.controller().clone();
        controller.start();
        let task = tokio::spawn(scheduler.run());

        controller
            .wait_for_state(|s| s == SchedulerState::Running)
            .await;
        controller.stop();

        assert_eq!(task.await.unwrap(), SchedulerState::Stopped);
        assert!(controller.loop_count() >= 1);
    }

    #[tokio::test]
    async fn stop_before_start_goes_straight_to_stopped() {
        let scheduler = live_scheduler(two_device_client(), fast_config(0));
        let controller = scheduler.controller().clone();
        controller.stop();

        assert_eq!(scheduler.run().await, SchedulerState::Stopped);
        assert_eq!(controller.loop_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_during_sleep_terminates() {
        let config = SchedulerConfig {
            poll_interval: Duration::from_secs(3600),
            ..SchedulerConfig::default()
        };
        let scheduler = live_scheduler(two_device_client(), config);
        let controller = scheduler.controller().clone();
        controller.start();
        let task = tokio::spawn(scheduler.run());

        while controller.loop_count() == 0 {
            tokio::task::yield_now().await;
        }
        controller.interrupt();

        assert_eq!(task.await.unwrap(), SchedulerState::Terminated);
        assert_eq!(controller.state(), SchedulerState::Terminated);
        assert_eq!(controller.loop_count(), 1);
    }
}
