//! 출력 포맷 렌더링
//!
//! - csv: RFC 4180 인용, 새 파일에만 [`CSV_HEADER`]
//! - txt: `2024-01-15 10:00:00 1.2.3.4:5678 Interface: eth0 URL: N/A User-Agent: N/A`
//! - log: `[2024-01-15 10:00:00] INFO - Traffic: 1.2.3.4:5678 Interface: ...`

use std::borrow::Cow;
use std::fmt::Write as _;

use trafficwatch_core::TrafficRecord;
use trafficwatch_core::config::OutputFormat;

/// CSV 헤더 (줄바꿈 제외)
pub const CSV_HEADER: &str = "timestamp,src_ip,src_port,source_id,request_url,user_agent";

/// 레코드 시각 표기
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const NOT_AVAILABLE: &str = "N/A";

/// 레코드 배치를 파일에 append할 텍스트로 렌더링합니다.
///
/// `with_header`는 csv에서만 의미가 있습니다.
pub fn render(format: OutputFormat, records: &[TrafficRecord], with_header: bool) -> String {
    let mut out = String::with_capacity(records.len() * 96);
    if with_header && format == OutputFormat::Csv {
        out.push_str(CSV_HEADER);
        out.push_str("\r\n");
    }
    for record in records {
        match format {
            OutputFormat::Csv => {
                out.push_str(&csv_row(record));
                out.push_str("\r\n");
            }
            OutputFormat::Txt => {
                out.push_str(&txt_line(record));
                out.push('\n');
            }
            OutputFormat::Log => {
                out.push_str(&log_line(record));
                out.push('\n');
            }
        }
    }
    out
}

/// CSV 한 행 (줄바꿈 제외)
pub fn csv_row(record: &TrafficRecord) -> String {
    let fields = [
        Cow::Owned(record.timestamp.format(TIMESTAMP_FORMAT).to_string()),
        Cow::Borrowed(record.src_ip.as_str()),
        Cow::Owned(record.src_port.to_string()),
        Cow::Borrowed(record.source_id.as_str()),
        Cow::Borrowed(record.request_url.as_deref().unwrap_or("")),
        Cow::Borrowed(record.user_agent.as_deref().unwrap_or("")),
    ];
    fields
        .iter()
        .map(|field| quote_csv_field(field))
        .collect::<Vec<_>>()
        .join(",")
}

/// txt 한 줄 (줄바꿈 제외)
pub fn txt_line(record: &TrafficRecord) -> String {
    format!(
        "{} {}",
        record.timestamp.format(TIMESTAMP_FORMAT),
        traffic_summary(record)
    )
}

/// log 한 줄 (줄바꿈 제외)
pub fn log_line(record: &TrafficRecord) -> String {
    format!(
        "[{}] INFO - Traffic: {}",
        record.timestamp.format(TIMESTAMP_FORMAT),
        traffic_summary(record)
    )
}

fn traffic_summary(record: &TrafficRecord) -> String {
    let mut line = String::new();
    let _ = write!(
        line,
        "{}:{} Interface: {} URL: {} User-Agent: {}",
        record.src_ip,
        record.src_port,
        record.source_id,
        record.request_url.as_deref().unwrap_or(NOT_AVAILABLE),
        record.user_agent.as_deref().unwrap_or(NOT_AVAILABLE),
    );
    line
}

/// 구분자, 따옴표, 줄바꿈이 있으면 필드를 따옴표로 감쌉니다.
pub fn quote_csv_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// RFC 4180 CSV 텍스트를 행/필드로 나눕니다.
///
/// 출력 파일을 다시 읽는 도구와 테스트용이며, 헤더도 한 행으로 반환합니다.
pub fn read_csv(content: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}
