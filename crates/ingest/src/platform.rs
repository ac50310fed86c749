//! IoT 플랫폼 REST API 추상화
//!
//! [`PlatformClient`] trait은 디바이스 목록 조회와 디바이스별 연결 로그 조회를 추상화합니다.
//! 운영 코드는 [`HttpPlatformClient`]를, 단위 테스트는 `MockPlatformClient`를 사용합니다.
//!
//! # 사용하는 엔드포인트
//!
//! ```text
//! GET {base}/bulk/devices?_limit=100&_bookmark=...&_sort=typeId,deviceId
//!     -> {"results": [...], "bookmark": "..."}
//! GET {base}/logs/connection?typeId=...&deviceId=...[&fromTime=&toTime= | &_limit=]
//!     -> [{"timestamp": "...", "message": "..."}]
//! ```

use std::future::Future;
use std::time::Duration;

use iotsentry_core::config::PlatformConfig;
use iotsentry_core::error::PlatformError;
use iotsentry_core::types::{Device, LogRecord};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::fetch::LogQuery;

/// 디바이스 목록 정렬 키
const DEVICE_SORT: &str = "typeId,deviceId";

/// 디바이스 목록 한 페이지
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DevicePage {
    /// 이 페이지의 디바이스
    #[serde(default)]
    pub results: Vec<Device>,
    /// 다음 페이지 커서. 없으면 마지막 페이지입니다.
    #[serde(default)]
    pub bookmark: Option<String>,
}

impl DevicePage {
    /// 테스트/목 구성용 생성자
    pub fn new(results: Vec<Device>, bookmark: Option<&str>) -> Self {
        Self {
            results,
            bookmark: bookmark.map(str::to_owned),
        }
    }
}

/// 플랫폼 API 호출을 추상화하는 trait
///
/// `Send + Sync + 'static`이므로 스케줄러 태스크로 옮겨 사용할 수 있습니다.
///
/// # 에러 처리
///
/// - 2xx가 아닌 응답: `PlatformError::Status`
/// - 연결 실패/타임아웃: `PlatformError::Http`
/// - 응답 본문 디코딩 실패: `PlatformError::Decode`
pub trait PlatformClient: Send + Sync + 'static {
    /// 디바이스 목록 한 페이지를 가져옵니다.
    fn list_devices(
        &self,
        page_size: u32,
        bookmark: Option<&str>,
    ) -> impl Future<Output = Result<DevicePage, PlatformError>> + Send;

    /// 디바이스 하나의 연결 로그를 가져옵니다.
    fn connection_logs(
        &self,
        device: &Device,
        query: &LogQuery,
    ) -> impl Future<Output = Result<Vec<LogRecord>, PlatformError>> + Send;
}

/// reqwest 기반 운영용 클라이언트
///
/// HTTP basic 인증(`api_key:api_token`)을 사용하며,
/// 모든 요청은 생성 시 지정한 타임아웃으로 제한됩니다.
#[derive(Debug, Clone)]
pub struct HttpPlatformClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_token: String,
}

impl HttpPlatformClient {
    /// 새 클라이언트를 생성합니다.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PlatformError::Http(format!("failed to build http client: {e}")))?;
        let base_url: String = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
            api_token: api_token.into(),
        })
    }

    /// `[platform]` 설정에서 클라이언트를 생성합니다.
    pub fn from_config(config: &PlatformConfig) -> Result<Self, PlatformError> {
        Self::new(
            config.resolved_base_url(),
            config.api_key.clone(),
            config.api_token.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// 요청에 사용하는 기본 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, PlatformError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, params = ?params, "platform request");

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.api_key, Some(&self.api_token))
            .query(params)
            .send()
            .await
            .map_err(|e| PlatformError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlatformError::Status {
                status: status.as_u16(),
                url,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))
    }
}

impl PlatformClient for HttpPlatformClient {
    async fn list_devices(
        &self,
        page_size: u32,
        bookmark: Option<&str>,
    ) -> Result<DevicePage, PlatformError> {
        let mut params = vec![
            ("_limit", page_size.to_string()),
            ("_sort", DEVICE_SORT.to_owned()),
        ];
        if let Some(bookmark) = bookmark {
            params.push(("_bookmark", bookmark.to_owned()));
        }
        self.get_json("/bulk/devices", &params).await
    }

    async fn connection_logs(
        &self,
        device: &Device,
        query: &LogQuery,
    ) -> Result<Vec<LogRecord>, PlatformError> {
        let mut params = vec![
            ("typeId", device.type_id.clone()),
            ("deviceId", device.device_id.clone()),
        ];
        params.extend(query.params());
        self.get_json("/logs/connection", &params).await
    }
}

/// 테스트용 Mock 플랫폼 클라이언트
///
/// 북마크별 페이지와 디바이스별 로그를 미리 구성해 두고,
/// 받은 요청을 기록합니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockPlatformClient {
    /// 보낸 북마크(첫 페이지는 `None`)별 응답 페이지
    pub pages: std::collections::HashMap<Option<String>, DevicePage>,
    /// `device_id`별 연결 로그
    pub logs: std::collections::HashMap<String, Vec<LogRecord>>,
    /// 로그 조회가 실패할 `device_id`
    pub failing_devices: std::collections::HashSet<String>,
    /// 받은 페이지 요청의 북마크
    pub page_requests: std::sync::Mutex<Vec<Option<String>>>,
    /// 받은 로그 쿼리 (`device_id`, 쿼리)
    pub log_queries: std::sync::Mutex<Vec<(String, LogQuery)>>,
}

#[cfg(test)]
impl MockPlatformClient {
    /// 빈 카탈로그로 mock 클라이언트를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// `bookmark`를 받았을 때 돌려줄 페이지를 추가합니다.
    pub fn with_page(mut self, bookmark: Option<&str>, page: DevicePage) -> Self {
        self.pages.insert(bookmark.map(str::to_owned), page);
        self
    }

    /// 디바이스 로그를 추가합니다.
    pub fn with_logs(mut self, device_id: &str, logs: Vec<LogRecord>) -> Self {
        self.logs.insert(device_id.to_owned(), logs);
        self
    }

    /// 해당 디바이스의 로그 조회가 실패하도록 설정합니다.
    pub fn with_failing_device(mut self, device_id: &str) -> Self {
        self.failing_devices.insert(device_id.to_owned());
        self
    }

    /// 지금까지 받은 로그 쿼리
    pub fn recorded_queries(&self) -> Vec<(String, LogQuery)> {
        self.log_queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }

    /// 지금까지 받은 페이지 요청 수
    pub fn page_request_count(&self) -> usize {
        self.page_requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[cfg(test)]
impl PlatformClient for MockPlatformClient {
    async fn list_devices(
        &self,
        _page_size: u32,
        bookmark: Option<&str>,
    ) -> Result<DevicePage, PlatformError> {
        let key = bookmark.map(str::to_owned);
        if let Ok(mut requests) = self.page_requests.lock() {
            requests.push(key.clone());
        }
        self.pages
            .get(&key)
            .cloned()
            .ok_or_else(|| PlatformError::Status {
                status: 500,
                url: format!("mock://bulk/devices?_bookmark={}", key.unwrap_or_default()),
            })
    }

    async fn connection_logs(
        &self,
        device: &Device,
        query: &LogQuery,
    ) -> Result<Vec<LogRecord>, PlatformError> {
        if let Ok(mut queries) = self.log_queries.lock() {
            queries.push((device.device_id.clone(), query.clone()));
        }
        if self.failing_devices.contains(&device.device_id) {
            return Err(PlatformError::Http(format!(
                "mock failure for {}",
                device.device_id
            )));
        }
        Ok(self
            .logs
            .get(&device.device_id)
            .cloned()
            .unwrap_or_default())
    }
}
