//! 출력 파일 로테이션 규칙
//!
//! | interval | bucket |
//! |---|---|
//! | hour | `YYYYMMDD_HH` |
//! | day | `YYYYMMDD` |
//! | week | `YYYYMMDD_week<n>` (`n` = 연중 일자 / 7) |
//!
//! 경로는 `base/YYYY-MM/<bucket>.<ext>` 입니다.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDateTime};

use trafficwatch_core::config::{IntervalType, OutputFormat};

/// 월 디렉토리 이름 (`YYYY-MM`)
pub fn month_dir(at: NaiveDateTime) -> String {
    at.format("%Y-%m").to_string()
}

/// 로테이션 버킷 이름
pub fn bucket_name(interval: IntervalType, at: NaiveDateTime) -> String {
    match interval {
        IntervalType::Hour => at.format("%Y%m%d_%H").to_string(),
        IntervalType::Day => at.format("%Y%m%d").to_string(),
        IntervalType::Week => format!("{}_week{}", at.format("%Y%m%d"), at.ordinal() / 7),
    }
}

/// 시각 `at`에 쓰일 실제(위장 전) 출력 파일 경로
pub fn output_path(
    base: &Path,
    interval: IntervalType,
    format: OutputFormat,
    at: NaiveDateTime,
) -> PathBuf {
    base.join(month_dir(at))
        .join(format!("{}.{}", bucket_name(interval, at), format.extension()))
}
