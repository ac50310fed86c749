//! 재생 모드 입력
//!
//! 캡처해 둔 연결 로그 파일을 플랫폼 API 대신 읽습니다.
//! 한 줄은 `<clientId> LOGMSG=<json LogRecord>` 형식입니다.
//!
//! ```text
//! d:li0f0v:NXPDev:testSub LOGMSG={"timestamp": "2018-02-28T20:02:50.585Z", "message": "Token auth succeeded: ..."}
//! ```
//!
//! 형식이 맞지 않는 줄(빈 줄, 잘못된 JSON, UTF-8이 아닌 바이트 포함)은 debug 로그를 남기고 건너뜁니다.
//! 파일을 읽는 도중의 I/O 실패만 에러입니다.

use std::path::{Path, PathBuf};

use iotsentry_core::metrics as m;
use iotsentry_core::types::LogRecord;
use metrics::counter;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::error::IngestError;

/// 클라이언트 ID와 JSON 레코드 사이의 구분자
pub const LOGMSG_MARKER: &str = " LOGMSG=";

/// 재생 파일 한 줄을 파싱합니다.
///
/// 형식이 맞지 않으면 `None`을 반환합니다.
pub fn parse_replay_line(line: &str) -> Option<(String, LogRecord)> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (client_id, json) = line.split_once(LOGMSG_MARKER)?;
    let client_id = client_id.trim();
    if client_id.is_empty() || client_id.contains(char::is_whitespace) {
        return None;
    }
    let record: LogRecord = serde_json::from_str(json.trim()).ok()?;
    Some((client_id.to_owned(), record))
}

/// 재생 파일 소스
///
/// `read`를 호출할 때마다 파일을 처음부터 다시 엽니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaySource {
    path: PathBuf,
}

impl ReplaySource {
    /// 재생 파일 경로로 소스를 생성합니다. 파일은 `read` 시점에 엽니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 재생 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 파일을 처음부터 읽는 리더를 엽니다.
    pub async fn read(&self) -> Result<ReplayReader, IngestError> {
        let file = File::open(&self.path).await.map_err(|e| self.replay_error(&e))?;
        Ok(ReplayReader {
            path: self.path.display().to_string(),
            reader: BufReader::new(file),
            buf: Vec::new(),
            line_no: 0,
            skipped: 0,
        })
    }

    fn replay_error(&self, e: &std::io::Error) -> IngestError {
        IngestError::Replay {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        }
    }
}

/// 재생 파일을 한 줄씩 읽는 리더
pub struct ReplayReader {
    path: String,
    reader: BufReader<File>,
    buf: Vec<u8>,
    line_no: u64,
    skipped: u64,
}

impl ReplayReader {
    /// 다음 유효한 레코드를 돌려줍니다. 파일 끝이면 `Ok(None)`입니다.
    pub async fn next_record(&mut self) -> Result<Option<(String, LogRecord)>, IngestError> {
        loop {
            self.buf.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.buf)
                .await
                .map_err(|e| IngestError::Replay {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let entry = match std::str::from_utf8(&self.buf) {
                Ok(line) => parse_replay_line(line),
                Err(e) => {
                    debug!(
                        path = %self.path,
                        line = self.line_no,
                        error = %e,
                        "replay line is not valid UTF-8"
                    );
                    None
                }
            };
            match entry {
                Some(entry) => return Ok(Some(entry)),
                None => self.skip(),
            }
        }
    }

    fn skip(&mut self) {
        self.skipped += 1;
        counter!(m::INGEST_REPLAY_LINES_SKIPPED_TOTAL).increment(1);
        debug!(
            path = %self.path,
            line = self.line_no,
            "skipping malformed replay line"
        );
    }

    /// 지금까지 건너뛴 줄 수
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}
