//! 디바이스 카탈로그 순회
//!
//! [`DeviceCatalogWalker`]는 북마크 커서로 디바이스 목록을 한 페이지씩 가져오며
//! 디바이스를 하나씩 돌려줍니다. 다음 페이지는 현재 페이지를 모두 소비한 뒤에만 요청합니다.
//!
//! - 북마크가 없는 응답에서 순회가 끝납니다.
//! - 이번 순회에서 이미 받은 북마크가 다시 돌아오면 [`IngestError::CursorLoop`]로 끝냅니다.
//! - 페이지 요청 실패는 재시도하지 않고 호출자에게 돌려줍니다.

use std::collections::{HashSet, VecDeque};

use iotsentry_core::types::Device;
use tracing::debug;

use crate::error::IngestError;
use crate::platform::PlatformClient;

/// 한 사이클 동안의 디바이스 카탈로그 커서
///
/// 사이클마다 새로 만들며, 이전 사이클의 북마크를 이어받지 않습니다.
pub struct DeviceCatalogWalker<'a, P> {
    client: &'a P,
    page_size: u32,
    buffered: VecDeque<Device>,
    bookmark: Option<String>,
    seen_bookmarks: HashSet<String>,
    exhausted: bool,
    pages_fetched: u32,
}

impl<'a, P: PlatformClient> DeviceCatalogWalker<'a, P> {
    /// 첫 페이지부터 시작하는 커서를 만듭니다. 요청은 첫 `next_device` 호출 때 나갑니다.
    pub fn walk(client: &'a P, page_size: u32) -> Self {
        Self {
            client,
            page_size,
            buffered: VecDeque::new(),
            bookmark: None,
            seen_bookmarks: HashSet::new(),
            exhausted: false,
            pages_fetched: 0,
        }
    }

    /// 다음 디바이스를 돌려줍니다. 순회가 끝나면 `Ok(None)`입니다.
    ///
    /// 에러를 돌려준 뒤에는 더 이상 페이지를 요청하지 않습니다.
    pub async fn next_device(&mut self) -> Result<Option<Device>, IngestError> {
        loop {
            if let Some(device) = self.buffered.pop_front() {
                return Ok(Some(device));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_page().await?;
        }
    }

    /// 지금까지 요청한 페이지 수
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    async fn fetch_page(&mut self) -> Result<(), IngestError> {
        let sent = self.bookmark.take();
        let page = match self.client.list_devices(self.page_size, sent.as_deref()).await {
            Ok(page) => page,
            Err(e) => {
                self.exhausted = true;
                return Err(e.into());
            }
        };
        self.pages_fetched += 1;

        debug!(
            page = self.pages_fetched,
            devices = page.results.len(),
            has_bookmark = page.bookmark.is_some(),
            "device page fetched"
        );

        match page.bookmark.filter(|b| !b.is_empty()) {
            Some(next) if !self.seen_bookmarks.insert(next.clone()) => {
                self.exhausted = true;
                return Err(IngestError::CursorLoop { bookmark: next });
            }
            Some(next) => self.bookmark = Some(next),
            None => self.exhausted = true,
        }

        self.buffered.extend(page.results);
        Ok(())
    }
}
