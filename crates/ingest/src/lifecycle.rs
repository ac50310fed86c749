//! 스케줄러 수명 주기 제어
//!
//! [`LifecycleController`]는 제어 HTTP 서버와 시그널 핸들러가 스케줄러 밖에서
//! `start` / `stop` / `interrupt`를 요청하는 핸들입니다. 복제해서 여러 곳에 나눠 줄 수 있습니다.
//!
//! # 상태 전이
//!
//! ```text
//! Idle --start()--> Running --stop() / max_cycles--> Stopping --> Stopped
//!   |                  |                                |
//!   +------------------+--------interrupt()-------------+--> Terminated
//! ```
//!
//! 플래그는 컨트롤러만 바꾸고, 상태와 사이클 수는 스케줄러만 기록합니다.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{Notify, watch};
use tracing::{debug, info};

/// 스케줄러 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// `start()` 대기 중
    Idle,
    /// 사이클 실행 중
    Running,
    /// 진행 중인 사이클을 마무리하는 중
    Stopping,
    /// 정상 종료
    Stopped,
    /// 인터럽트로 종료
    Terminated,
}

impl SchedulerState {
    /// 상태 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Shared {
    running: AtomicBool,
    stop_requested: AtomicBool,
    loop_count: AtomicU64,
    state: watch::Sender<SchedulerState>,
    wake: Notify,
}

/// 스케줄러 외부 제어 핸들
#[derive(Clone)]
pub struct LifecycleController {
    shared: Arc<Shared>,
}

impl Default for LifecycleController {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleController {
    /// `Idle` 상태의 컨트롤러를 만듭니다.
    pub fn new() -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                stop_requested: AtomicBool::new(false),
                loop_count: AtomicU64::new(0),
                state,
                wake: Notify::new(),
            }),
        }
    }

    /// 수집을 시작합니다. 이미 실행 중이면 아무 일도 하지 않습니다.
    pub fn start(&self) {
        let was_running = self.shared.running.swap(true, Ordering::SeqCst);
        if !was_running {
            info!(state = %self.state(), "start requested");
        }
        self.shared.wake.notify_one();
    }

    /// 정상 종료를 요청합니다. 진행 중인 사이클은 끝까지 실행됩니다.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        let already = self.shared.stop_requested.swap(true, Ordering::SeqCst);
        if !already {
            info!(state = %self.state(), "stop requested");
        }
        self.shared.wake.notify_one();
    }

    /// 즉시 종료를 요청합니다. 상태는 바로 `Terminated`가 됩니다.
    pub fn interrupt(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.stop_requested.store(true, Ordering::SeqCst);
        self.shared.state.send_replace(SchedulerState::Terminated);
        info!("interrupt requested");
        self.shared.wake.notify_one();
    }

    /// 현재 상태
    pub fn state(&self) -> SchedulerState {
        *self.shared.state.borrow()
    }

    /// 완료한 사이클 수
    pub fn loop_count(&self) -> u64 {
        self.shared.loop_count.load(Ordering::SeqCst)
    }

    /// `running` 플래그
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// `stop_requested` 플래그
    pub fn is_stop_requested(&self) -> bool {
        self.shared.stop_requested.load(Ordering::SeqCst)
    }

    /// 인터럽트 여부
    pub fn is_terminated(&self) -> bool {
        self.state() == SchedulerState::Terminated
    }

    /// 상태 변경 구독
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.shared.state.subscribe()
    }

    /// 조건을 만족하는 상태가 될 때까지 기다립니다.
    pub async fn wait_for_state<F>(&self, predicate: F) -> SchedulerState
    where
        F: Fn(SchedulerState) -> bool,
    {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| predicate(*s)).await {
            Ok(state) => *state,
            // 송신자는 컨트롤러가 들고 있으므로 닫히지 않음
            Err(_) => self.state(),
        }
    }

    /// 인터럽트될 때까지 기다립니다.
    pub async fn terminated(&self) {
        self.wait_for_state(|s| s == SchedulerState::Terminated)
            .await;
    }

    /// 스케줄러가 `start()` / `stop()` / `interrupt()` 중 하나를 받을 때까지 기다립니다.
    pub(crate) async fn wait_for_start(&self) {
        loop {
            if self.is_running() || self.is_stop_requested() || self.is_terminated() {
                return;
            }
            self.shared.wake.notified().await;
        }
    }

    /// 스케줄러 상태를 기록합니다. `Terminated` 이후에는 바꾸지 않습니다.
    pub(crate) fn set_state(&self, next: SchedulerState) {
        let changed = self.shared.state.send_if_modified(|current| {
            if *current == SchedulerState::Terminated || *current == next {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            debug!(state = %next, "scheduler state changed");
        }
    }

    /// 스케줄러가 완료한 사이클 수를 게시합니다.
    pub(crate) fn publish_loop_count(&self, loop_count: u64) {
        self.shared.loop_count.store(loop_count, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let controller = LifecycleController::new();
        assert_eq!(controller.state(), SchedulerState::Idle);
        assert!(!controller.is_running());
        assert!(!controller.is_stop_requested());
        assert_eq!(controller.loop_count(), 0);
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let controller = LifecycleController::new();
        controller.start();
        controller.start();
        assert!(controller.is_running());

        controller.stop();
        controller.stop();
        assert!(!controller.is_running());
        assert!(controller.is_stop_requested());
    }

    #[test]
    fn interrupt_is_terminal() {
        let controller = LifecycleController::new();
        controller.start();
        controller.interrupt();
        assert!(controller.is_terminated());
        assert!(controller.is_stop_requested());

        controller.set_state(SchedulerState::Running);
        assert_eq!(controller.state(), SchedulerState::Terminated);
    }

    #[test]
    fn clones_share_state() {
        let controller = LifecycleController::new();
        let handle = controller.clone();
        handle.start();
        assert!(controller.is_running());
        controller.publish_loop_count(3);
        assert_eq!(handle.loop_count(), 3);
    }

    #[test]
    fn state_names() {
        assert_eq!(SchedulerState::Stopping.to_string(), "stopping");
        assert_eq!(
            serde_json::to_string(&SchedulerState::Terminated).unwrap(),
            "\"terminated\""
        );
    }

    #[tokio::test]
    async fn wait_for_start_returns_after_start() {
        let controller = LifecycleController::new();
        let waiter = controller.clone();
        let task = tokio::spawn(async move { waiter.wait_for_start().await });
        tokio::task::yield_now().await;
        controller.start();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn start_before_wait_is_not_lost() {
        let controller = LifecycleController::new();
        controller.start();
        controller.wait_for_start().await;
    }

    #[tokio::test]
    async fn wait_for_state_sees_transition() {
        let controller = LifecycleController::new();
        let setter = controller.clone();
        tokio::spawn(async move { setter.set_state(SchedulerState::Running) });
        let state = controller
            .wait_for_state(|s| s == SchedulerState::Running)
            .await;
        assert_eq!(state, SchedulerState::Running);
    }
}
