#![no_main]

use std::net::{IpAddr, Ipv4Addr};

use libfuzzer_sys::fuzz_target;

use iotsentry_core::types::LogRecord;
use iotsentry_ingest::classify;
use iotsentry_ingest::emitter::{format_line, priority};

fuzz_target!(|data: &[u8]| {
    let message = String::from_utf8_lossy(data);
    let record = LogRecord::new("2018-02-28T20:02:50.585Z", message.as_ref());
    let event = classify("d:li0f0v:NXPDev:fuzz", &record);

    let line = format_line(
        &event.timestamp,
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        "WIoTP:Connection",
        &event,
    );
    assert!(line.starts_with("2018-02-28T20:02:50.585Z 127.0.0.1 WIoTP:Connection source="));
    assert!(line.ends_with(message.as_ref()));
    assert!(matches!(priority(event.event_type), 140 | 142));
});
