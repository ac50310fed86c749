#![no_main]

use iotsentry_ingest::replay::parse_replay_line;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        // 크래시나 패닉 없이 Some 또는 None을 반환해야 한다
        if let Some((client_id, _record)) = parse_replay_line(line) {
            assert!(!client_id.is_empty());
            assert!(!client_id.contains(char::is_whitespace));
        }
    }
});
