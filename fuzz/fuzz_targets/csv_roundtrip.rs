#![no_main]

use arbitrary::Arbitrary;
use chrono::{Local, TimeZone};
use libfuzzer_sys::fuzz_target;

use trafficwatch_core::TrafficRecord;
use trafficwatch_core::config::OutputFormat;
use trafficwatch_writer::format::{read_csv, render};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzRecord {
    src_ip: String,
    src_port: u16,
    source_tag: String,
    request_url: String,
    user_agent: String,
}

fuzz_target!(|input: Vec<FuzzRecord>| {
    let Some(at) = Local.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).single() else {
        return;
    };
    let records: Vec<TrafficRecord> = input
        .into_iter()
        .take(16)
        .map(|r| {
            TrafficRecord::proxy_log(at, r.source_tag, r.src_ip, r.src_port, r.request_url, r.user_agent)
        })
        .collect();

    // 인용 규칙이 맞다면 어떤 필드 내용이든 그대로 되읽혀야 한다
    let rows = read_csv(&render(OutputFormat::Csv, &records, true));
    assert_eq!(rows.len(), records.len() + 1);
    for (row, record) in rows.iter().skip(1).zip(&records) {
        assert_eq!(row[1], record.src_ip);
        assert_eq!(row[3], record.source_id);
        assert_eq!(row.get(5).map(String::as_str), record.user_agent.as_deref());
    }
});
