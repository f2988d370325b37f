//! 로테이션 파일 writer
//!
//! 한 번의 [`TrafficWriter::write`] 호출은 다음 순서로 진행됩니다:
//!
//! 1. 빈 배치면 아무것도 하지 않음
//! 2. (활성화 시) 인터페이스 레코드 중복 병합
//! 3. 지금 시각의 버킷 경로 결정, 월 디렉토리 생성
//! 4. (위장 시) 위장 파일을 실제 이름으로 복원
//! 5. 새 csv 파일이면 헤더, 이후 레코드를 append
//! 6. (위장 시) 다시 위장 이름으로 변경

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Local};
use metrics::{counter, histogram};
use tracing::{debug, info};

use trafficwatch_core::config::{IntervalType, OutputFormat, WriterConfig};
use trafficwatch_core::metrics as m;
use trafficwatch_core::{TrafficRecord, WriteError};

use crate::disguise;
use crate::format;
use crate::merge::merge_interface_records;
use crate::rotation::output_path;

/// 한 번의 쓰기 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// 쓰기가 끝난 뒤 디스크 상의 파일 경로 (위장 시 위장 경로)
    pub path: PathBuf,
    /// 기록된 레코드 수
    pub written: usize,
    /// 병합으로 줄어든 레코드 수
    pub merged: usize,
}

/// 레코드 배치를 로테이션 파일에 append하는 writer
#[derive(Debug, Clone)]
pub struct TrafficWriter {
    base: PathBuf,
    format: OutputFormat,
    interval: IntervalType,
    merge_duplicates: bool,
    /// `Some`이면 쓰기 후 이 확장자로 위장
    disguise_extension: Option<String>,
}

impl TrafficWriter {
    /// 설정으로부터 writer를 만들고 출력 루트를 생성합니다.
    ///
    /// `merge_duplicates`는 `system.filter_superfluous_ip`에서 옵니다.
    pub fn new(config: &WriterConfig, merge_duplicates: bool) -> Result<Self, WriteError> {
        let base = PathBuf::from(&config.path);
        fs::create_dir_all(&base).map_err(|source| WriteError::CreateDir {
            path: base.clone(),
            source,
        })?;

        Ok(Self {
            base,
            format: config.format,
            interval: config.interval_type,
            merge_duplicates,
            disguise_extension: config
                .fake_img
                .then(|| config.disguise_extension.clone()),
        })
    }

    /// 출력 루트 디렉토리
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// 출력 형식
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// 지금 시각 기준으로 배치를 씁니다. 빈 배치는 `Ok(None)`.
    pub fn write(&self, records: Vec<TrafficRecord>) -> Result<Option<WriteOutcome>, WriteError> {
        self.write_at(records, Local::now())
    }

    /// `now`를 버킷 기준 시각으로 사용해 배치를 씁니다.
    pub fn write_at(
        &self,
        records: Vec<TrafficRecord>,
        now: DateTime<Local>,
    ) -> Result<Option<WriteOutcome>, WriteError> {
        if records.is_empty() {
            return Ok(None);
        }

        let started = Instant::now();
        let result = self.append_batch(records, now);
        histogram!(m::WRITER_WRITE_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        match result {
            Ok(outcome) => {
                counter!(m::WRITER_RECORDS_WRITTEN_TOTAL, m::LABEL_FORMAT => self.format.extension())
                    .increment(outcome.written as u64);
                counter!(m::WRITER_RECORDS_MERGED_TOTAL).increment(outcome.merged as u64);
                Ok(Some(outcome))
            }
            Err(e) => {
                counter!(m::WRITER_WRITE_ERRORS_TOTAL).increment(1);
                Err(e)
            }
        }
    }

    fn append_batch(
        &self,
        records: Vec<TrafficRecord>,
        now: DateTime<Local>,
    ) -> Result<WriteOutcome, WriteError> {
        let received = records.len();
        let records = if self.merge_duplicates {
            merge_interface_records(records)
        } else {
            records
        };
        let merged = received - records.len();

        let path = output_path(&self.base, self.interval, self.format, now.naive_local());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| WriteError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let disguised = self
            .disguise_extension
            .as_deref()
            .map(|ext| disguise::disguised_path(&path, ext));
        if let Some(disguised) = &disguised {
            disguise::restore(&path, disguised)?;
        }

        let is_new = !path.exists();
        let text = format::render(self.format, &records, is_new);
        let append_err = |source: std::io::Error| WriteError::Append {
            path: path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(append_err)?;
        file.write_all(text.as_bytes()).map_err(append_err)?;
        file.flush().map_err(append_err)?;
        drop(file);

        debug!(path = %path.display(), new_file = is_new, "appended batch");

        let final_path = match disguised {
            Some(disguised) => {
                disguise::apply(&path, &disguised)?;
                disguised
            }
            None => path,
        };

        info!(
            path = %final_path.display(),
            written = records.len(),
            merged,
            "wrote traffic records"
        );

        Ok(WriteOutcome {
            path: final_path,
            written: records.len(),
            merged,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::format::{CSV_HEADER, read_csv};

    fn config(dir: &Path, format: OutputFormat, interval: IntervalType, fake_img: bool) -> WriterConfig {
        WriterConfig {
            path: dir.to_string_lossy().into_owned(),
            format,
            interval_type: interval,
            fake_img,
            disguise_extension: "jpg".to_owned(),
        }
    }

    fn at(h: u32, min: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 15, h, min, 0).single().unwrap()
    }

    fn rec(ip: &str, port: u16) -> TrafficRecord {
        TrafficRecord::interface(at(10, 0), "eth0", ip, port)
    }

    #[test]
    fn empty_batch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let writer =
            TrafficWriter::new(&config(dir.path(), OutputFormat::Csv, IntervalType::Day, false), false)
                .unwrap();
        assert!(writer.write_at(Vec::new(), at(10, 0)).unwrap().is_none());
        assert!(!dir.path().join("2024-01").exists());
    }

    #[test]
    fn csv_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let writer =
            TrafficWriter::new(&config(dir.path(), OutputFormat::Csv, IntervalType::Day, false), false)
                .unwrap();

        let first = writer.write_at(vec![rec("1.1.1.1", 22)], at(10, 0)).unwrap().unwrap();
        let second = writer.write_at(vec![rec("2.2.2.2", 22)], at(12, 0)).unwrap().unwrap();
        assert_eq!(first.path, dir.path().join("2024-01/20240115.csv"));
        assert_eq!(first.path, second.path);

        let rows = read_csv(&fs::read_to_string(&first.path).unwrap());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].join(","), CSV_HEADER);
        assert_eq!(rows.iter().filter(|r| r.join(",") == CSV_HEADER).count(), 1);
    }

    #[test]
    fn hourly_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let writer =
            TrafficWriter::new(&config(dir.path(), OutputFormat::Txt, IntervalType::Hour, false), false)
                .unwrap();

        let a = writer.write_at(vec![rec("1.1.1.1", 22)], at(10, 5)).unwrap().unwrap();
        let b = writer.write_at(vec![rec("1.1.1.1", 22)], at(10, 50)).unwrap().unwrap();
        let c = writer.write_at(vec![rec("1.1.1.1", 22)], at(11, 5)).unwrap().unwrap();
        assert_eq!(a.path, b.path);
        assert_ne!(b.path, c.path);
        assert_eq!(fs::read_to_string(&a.path).unwrap().lines().count(), 2);
    }

    #[test]
    fn merge_only_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let batch = || vec![rec("1.1.1.1", 22), rec("1.1.1.1", 22), rec("2.2.2.2", 22)];

        let plain =
            TrafficWriter::new(&config(dir.path(), OutputFormat::Log, IntervalType::Day, false), false)
                .unwrap();
        let outcome = plain.write_at(batch(), at(10, 0)).unwrap().unwrap();
        assert_eq!((outcome.written, outcome.merged), (3, 0));

        let merging =
            TrafficWriter::new(&config(dir.path(), OutputFormat::Log, IntervalType::Day, false), true)
                .unwrap();
        let outcome = merging.write_at(batch(), at(10, 0)).unwrap().unwrap();
        assert_eq!((outcome.written, outcome.merged), (2, 1));
    }

    #[test]
    fn disguise_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let writer =
            TrafficWriter::new(&config(dir.path(), OutputFormat::Csv, IntervalType::Day, true), false)
                .unwrap();
        let real = dir.path().join("2024-01/20240115.csv");
        let fake = dir.path().join("2024-01/20240115.jpg");

        let outcome = writer.write_at(vec![rec("1.1.1.1", 22)], at(10, 0)).unwrap().unwrap();
        assert_eq!(outcome.path, fake);
        assert!(fake.exists());
        assert!(!real.exists());

        writer.write_at(vec![rec("2.2.2.2", 22)], at(11, 0)).unwrap();
        assert!(fake.exists());
        assert!(!real.exists());

        // 복원 후 append 되었으므로 헤더 1개 + 2행
        let rows = read_csv(&fs::read_to_string(&fake).unwrap());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][1], "1.1.1.1");
        assert_eq!(rows[2][1], "2.2.2.2");
    }

    #[test]
    fn unwritable_base_is_create_dir_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let result = TrafficWriter::new(
            &config(&blocker.join("nested"), OutputFormat::Csv, IntervalType::Day, false),
            false,
        );
        assert!(matches!(result, Err(WriteError::CreateDir { .. })));
    }
}
