//! 로그 조회 전략
//!
//! 사이클마다 한 번 조회 모드를 정하고, 그 사이클의 모든 디바이스에 같은 쿼리를 사용합니다.
//! 설정이 window 모드이고 콜드 스타트가 끝나지 않았다면 첫 사이클은 전체 이력을 가져옵니다.

use iotsentry_core::types::{FetchMode, FetchWindow};

/// 디바이스 하나에 대한 연결 로그 쿼리
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogQuery {
    /// `fromTime`/`toTime` 구간
    Window {
        /// 시작 시각 (`%Y-%m-%dT%H:%M:%S`)
        from: String,
        /// 끝 시각 (`%Y-%m-%dT%H:%M:%S`)
        to: String,
    },
    /// 최근 N개
    Count(u32),
    /// 제한 없음
    Unbounded,
}

impl LogQuery {
    /// `typeId`/`deviceId` 외에 붙는 쿼리 파라미터
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Window { from, to } => {
                vec![("fromTime", from.clone()), ("toTime", to.clone())]
            }
            Self::Count(n) => vec![("_limit", n.to_string())],
            Self::Unbounded => Vec::new(),
        }
    }

    /// 이 쿼리가 속한 조회 모드
    pub fn mode(&self) -> FetchMode {
        match self {
            Self::Window { .. } => FetchMode::Window,
            Self::Count(n) => FetchMode::Count(*n),
            Self::Unbounded => FetchMode::Unbounded,
        }
    }
}

/// 설정된 조회 모드와 콜드 스타트 규칙
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFetchStrategy {
    mode: FetchMode,
}

impl LogFetchStrategy {
    /// 설정된 모드로 전략을 생성합니다.
    pub fn new(mode: FetchMode) -> Self {
        Self { mode }
    }

    /// 설정된 모드
    pub fn configured_mode(&self) -> FetchMode {
        self.mode
    }

    /// 이번 사이클에 실제로 쓸 모드
    pub fn select(&self, cold_start_done: bool) -> FetchMode {
        match self.mode {
            FetchMode::Window if !cold_start_done => FetchMode::Unbounded,
            mode => mode,
        }
    }

    /// 이번 사이클의 쿼리를 만듭니다.
    pub fn plan(&self, cold_start_done: bool, window: &FetchWindow) -> LogQuery {
        match self.select(cold_start_done) {
            FetchMode::Window => LogQuery::Window {
                from: window.from_iso(),
                to: window.to_iso(),
            },
            FetchMode::Count(n) => LogQuery::Count(n),
            FetchMode::Unbounded => LogQuery::Unbounded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn window() -> FetchWindow {
        let mut w = FetchWindow::starting_at(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());
        w.advance(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 15).unwrap());
        w
    }

    #[test]
    fn window_mode_cold_start_is_unbounded() {
        let strategy = LogFetchStrategy::new(FetchMode::Window);
        assert_eq!(strategy.plan(false, &window()), LogQuery::Unbounded);
    }

    #[test]
    fn window_mode_after_cold_start_uses_window() {
        let strategy = LogFetchStrategy::new(FetchMode::Window);
        let query = strategy.plan(true, &window());
        assert_eq!(
            query,
            LogQuery::Window {
                from: "2024-03-01T08:00:00".to_owned(),
                to: "2024-03-01T08:00:15".to_owned(),
            }
        );
        assert_eq!(
            query.params(),
            vec![
                ("fromTime", "2024-03-01T08:00:00".to_owned()),
                ("toTime", "2024-03-01T08:00:15".to_owned()),
            ]
        );
    }

    #[test]
    fn count_mode_ignores_cold_start() {
        let strategy = LogFetchStrategy::new(FetchMode::Count(20));
        assert_eq!(strategy.plan(false, &window()), LogQuery::Count(20));
        assert_eq!(strategy.plan(true, &window()), LogQuery::Count(20));
        assert_eq!(
            LogQuery::Count(20).params(),
            vec![("_limit", "20".to_owned())]
        );
    }

    #[test]
    fn unbounded_mode_has_no_params() {
        let strategy = LogFetchStrategy::new(FetchMode::Unbounded);
        let query = strategy.plan(true, &window());
        assert_eq!(query, LogQuery::Unbounded);
        assert!(query.params().is_empty());
        assert_eq!(query.mode(), FetchMode::Unbounded);
    }
}
