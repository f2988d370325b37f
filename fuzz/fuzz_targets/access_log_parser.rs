#![no_main]

use libfuzzer_sys::fuzz_target;
use trafficwatch_collector::AccessLogParser;

fuzz_target!(|data: &[u8]| {
    let Ok(parser) = AccessLogParser::new() else {
        return;
    };

    // 크래시나 패닉 없이 Ok 또는 Err을 반환해야 한다
    let line = String::from_utf8_lossy(data);
    if let Ok(entry) = parser.parse(&line) {
        let _ = entry.into_record("fuzz");
    }
});
