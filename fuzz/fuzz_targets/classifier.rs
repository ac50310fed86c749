#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use iotsentry_core::types::{EventType, LogRecord};
use iotsentry_ingest::classify;
use iotsentry_ingest::classifier::UNKNOWN_SOURCE_IP;

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    client_id: String,
    timestamp: String,
    message: String,
}

fuzz_target!(|input: FuzzInput| {
    let record = LogRecord::new(input.timestamp, input.message);

    // 어떤 입력에도 패닉 없이 분류되어야 하고, 같은 입력은 같은 결과여야 한다
    let first = classify(&input.client_id, &record);
    let second = classify(&input.client_id, &record);
    assert_eq!(first, second);
    assert_eq!(first.raw_message, record.message);

    if first.event_type == EventType::Unknown {
        assert_eq!(first.source_ip, UNKNOWN_SOURCE_IP);
    }
});
