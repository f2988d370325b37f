//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수로 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `trafficwatch_`
//! - 컴포넌트: `collector_`, `writer_`, `retention_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(trafficwatch_core::metrics::WRITER_RECORDS_WRITTEN_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 모니터 이름 레이블 키 (인터페이스 이름 또는 로그 소스 태그)
pub const LABEL_MONITOR: &str = "monitor";

/// 출처 종류 레이블 키 (interface, proxy_log)
pub const LABEL_SOURCE_KIND: &str = "source_kind";

/// 출력 형식 레이블 키 (csv, txt, log)
pub const LABEL_FORMAT: &str = "format";

// ─── Collector 메트릭 ───────────────────────────────────────────────

/// Collector: 큐에 적재된 레코드 수 (counter, label: monitor)
pub const COLLECTOR_RECORDS_CAPTURED_TOTAL: &str = "trafficwatch_collector_records_captured_total";

/// Collector: 큐 오버플로로 버려진 레코드 수 (counter, label: monitor)
pub const COLLECTOR_RECORDS_DROPPED_TOTAL: &str = "trafficwatch_collector_records_dropped_total";

/// Collector: 필터 정책으로 거부된 프레임 수 (counter, label: monitor)
pub const COLLECTOR_FRAMES_FILTERED_TOTAL: &str = "trafficwatch_collector_frames_filtered_total";

/// Collector: 접근 로그 파싱 실패 수 (counter)
pub const COLLECTOR_PARSE_ERRORS_TOTAL: &str = "trafficwatch_collector_parse_errors_total";

/// Collector: 현재 큐 길이 (gauge, label: monitor)
pub const COLLECTOR_QUEUE_DEPTH: &str = "trafficwatch_collector_queue_depth";

// ─── Writer 메트릭 ──────────────────────────────────────────────────

/// Writer: 파일에 기록된 레코드 수 (counter, label: format)
pub const WRITER_RECORDS_WRITTEN_TOTAL: &str = "trafficwatch_writer_records_written_total";

/// Writer: 병합으로 줄어든 레코드 수 (counter)
pub const WRITER_RECORDS_MERGED_TOTAL: &str = "trafficwatch_writer_records_merged_total";

/// Writer: 쓰기 실패 수 (counter)
pub const WRITER_WRITE_ERRORS_TOTAL: &str = "trafficwatch_writer_write_errors_total";

/// Writer: 배치 쓰기 소요 시간 (histogram, 초)
pub const WRITER_WRITE_DURATION_SECONDS: &str = "trafficwatch_writer_write_duration_seconds";

// ─── Retention 메트릭 ───────────────────────────────────────────────

/// Retention: 삭제된 파일 수 (counter)
pub const RETENTION_FILES_REMOVED_TOTAL: &str = "trafficwatch_retention_files_removed_total";

/// Retention: 삭제 실패 수 (counter)
pub const RETENTION_CLEANUP_ERRORS_TOTAL: &str = "trafficwatch_retention_cleanup_errors_total";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 실행 중인 모니터 수 (gauge)
pub const DAEMON_MONITORS_RUNNING: &str = "trafficwatch_daemon_monitors_running";

/// Daemon: 수집 루프 틱 수 (counter)
pub const DAEMON_TICKS_TOTAL: &str = "trafficwatch_daemon_ticks_total";

/// Daemon: 프로세스 시작 시각 (gauge, unix epoch 초)
pub const DAEMON_START_TIME_SECONDS: &str = "trafficwatch_daemon_start_time_seconds";

/// 정의된 모든 메트릭 이름
pub const ALL_METRIC_NAMES: &[&str] = &[
    COLLECTOR_RECORDS_CAPTURED_TOTAL,
    COLLECTOR_RECORDS_DROPPED_TOTAL,
    COLLECTOR_FRAMES_FILTERED_TOTAL,
    COLLECTOR_PARSE_ERRORS_TOTAL,
    COLLECTOR_QUEUE_DEPTH,
    WRITER_RECORDS_WRITTEN_TOTAL,
    WRITER_RECORDS_MERGED_TOTAL,
    WRITER_WRITE_ERRORS_TOTAL,
    WRITER_WRITE_DURATION_SECONDS,
    RETENTION_FILES_REMOVED_TOTAL,
    RETENTION_CLEANUP_ERRORS_TOTAL,
    DAEMON_MONITORS_RUNNING,
    DAEMON_TICKS_TOTAL,
    DAEMON_START_TIME_SECONDS,
];

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다. 레코더가 없으면 아무 일도 하지 않습니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Collector
    describe_counter!(
        COLLECTOR_RECORDS_CAPTURED_TOTAL,
        "Records pushed onto monitor queues"
    );
    describe_counter!(
        COLLECTOR_RECORDS_DROPPED_TOTAL,
        "Records dropped because a bounded monitor queue was full"
    );
    describe_counter!(
        COLLECTOR_FRAMES_FILTERED_TOTAL,
        "Captured frames rejected by port or internal-address policy"
    );
    describe_counter!(
        COLLECTOR_PARSE_ERRORS_TOTAL,
        "Access log lines that did not match the expected grammar"
    );
    describe_gauge!(COLLECTOR_QUEUE_DEPTH, "Records waiting in a monitor queue");

    // Writer
    describe_counter!(
        WRITER_RECORDS_WRITTEN_TOTAL,
        "Records appended to output files"
    );
    describe_counter!(
        WRITER_RECORDS_MERGED_TOTAL,
        "Interface records collapsed into an existing flow during merge"
    );
    describe_counter!(WRITER_WRITE_ERRORS_TOTAL, "Batches that failed to persist");
    describe_histogram!(
        WRITER_WRITE_DURATION_SECONDS,
        "Time spent writing one batch in seconds"
    );

    // Retention
    describe_counter!(
        RETENTION_FILES_REMOVED_TOTAL,
        "Output files deleted by the retention sweep"
    );
    describe_counter!(
        RETENTION_CLEANUP_ERRORS_TOTAL,
        "Output files the retention sweep failed to delete"
    );

    // Daemon
    describe_gauge!(DAEMON_MONITORS_RUNNING, "Monitors currently running");
    describe_counter!(DAEMON_TICKS_TOTAL, "Collection loop ticks executed");
    describe_gauge!(
        DAEMON_START_TIME_SECONDS,
        "Daemon start time as unix epoch seconds"
    );
}
