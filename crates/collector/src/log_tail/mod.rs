//! 접근 로그 테일 모니터
//!
//! [`LogTailMonitor`]는 프록시 로그 디렉토리 하나를 소유합니다. 매 틱마다
//! 추적 중인 파일을 끝에서부터 거꾸로 읽으며 워터마크 이후의 라인만 레코드로 만듭니다.
//!
//! # 틱 동작
//! ```text
//! horizon = trunc_secs(now()) - 1s
//! for file in tracked_files:
//!     for line in reversed(lines):
//!         time > horizon    → 건너뜀 (아직 끝나지 않은 초이거나 시계 차이)
//!         time <= watermark → 이 파일 종료 (이미 내보낸 구간)
//!         otherwise         → 내보냄
//! watermark = horizon
//! ```
//!
//! 로그 시각은 초 단위이므로 틱이 속한 초는 다음 틱으로 미룹니다. 그렇지 않으면
//! 틱 이후 같은 초에 기록된 라인이 워터마크 이하로 취급되어 유실됩니다.
//!
//! 한 틱에서 내보내는 레코드는 파일 간 순서를 맞추기 위해 시각순으로 정렬됩니다.

pub mod discovery;
pub mod parser;

pub use discovery::{GLOBAL_ACCESS_LOG, discover_site_logs, is_site_log};
pub use parser::{AccessLogEntry, AccessLogParser, NGINX_LOG_FORMAT, NGINX_LOG_FORMAT_NAME};

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local, SubsecRound, TimeDelta};
use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use trafficwatch_core::config::DropPolicy;
use trafficwatch_core::metrics as m;
use trafficwatch_core::{
    ConfigError, MonitorError, SourceKind, TrafficRecord, TrafficwatchError,
};

use crate::monitor::{Monitor, MonitorState, SharedState};
use crate::queue::RecordQueue;

/// `at` 시점에 모든 라인이 기록을 마쳤다고 볼 수 있는 마지막 초
///
/// `at`이 속한 초는 아직 진행 중이므로 제외합니다.
pub fn settled_horizon(at: DateTime<Local>) -> DateTime<Local> {
    at.trunc_subsecs(0) - TimeDelta::seconds(1)
}

/// 로그 테일 상태 머신
///
/// 워터마크는 단조 증가하며, 워터마크 이하의 라인은 다시 내보내지 않습니다.
#[derive(Debug)]
pub struct LogTailState {
    logs_dir: PathBuf,
    source_tag: String,
    watermark: DateTime<Local>,
    tracked_files: Vec<PathBuf>,
    rediscover: bool,
    parser: AccessLogParser,
}

impl LogTailState {
    /// 디렉토리를 한 번 탐색하여 상태를 만듭니다.
    ///
    /// `watermark` 이전에 기록된 라인은 내보내지 않습니다.
    pub fn new(
        logs_dir: impl AsRef<Path>,
        source_tag: impl Into<String>,
        watermark: DateTime<Local>,
    ) -> Result<Self, ConfigError> {
        let logs_dir = logs_dir.as_ref().to_path_buf();
        let tracked_files =
            discover_site_logs(&logs_dir).map_err(|e| ConfigError::InvalidValue {
                field: "middleware.logs_dir".to_owned(),
                reason: format!("cannot read {}: {e}", logs_dir.display()),
            })?;
        let parser = AccessLogParser::new().map_err(|e| ConfigError::InvalidValue {
            field: "middleware.type".to_owned(),
            reason: format!("access log grammar failed to compile: {e}"),
        })?;

        info!(
            logs_dir = %logs_dir.display(),
            files = tracked_files.len(),
            "collected access log files"
        );

        Ok(Self {
            logs_dir,
            source_tag: source_tag.into(),
            watermark,
            tracked_files,
            rediscover: false,
            parser,
        })
    }

    /// 매 틱마다 디렉토리를 다시 탐색할지 지정합니다.
    pub fn with_rediscover(mut self, rediscover: bool) -> Self {
        self.rediscover = rediscover;
        self
    }

    /// 현재 워터마크
    pub fn watermark(&self) -> DateTime<Local> {
        self.watermark
    }

    /// 추적 중인 파일 목록
    pub fn tracked_files(&self) -> &[PathBuf] {
        &self.tracked_files
    }

    /// 레코드의 `source_id`로 쓰이는 태그
    pub fn source_tag(&self) -> &str {
        &self.source_tag
    }

    /// 한 틱을 수행합니다.
    ///
    /// `(watermark, settled_horizon(current_tick)]` 구간의 라인을 레코드로 만들어
    /// 시각순으로 반환하고, 워터마크를 그 horizon으로 올립니다.
    /// 블로킹 파일 I/O를 수행합니다.
    pub fn scan(&mut self, current_tick: DateTime<Local>) -> Vec<TrafficRecord> {
        if self.rediscover {
            self.refresh_files();
        }

        let horizon = settled_horizon(current_tick);

        let mut records = Vec::new();
        for path in &self.tracked_files {
            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read access log, skipping");
                    continue;
                }
            };
            let content = String::from_utf8_lossy(&bytes);

            for line in content.lines().rev() {
                if line.trim().is_empty() {
                    continue;
                }
                let entry = match self.parser.parse(line) {
                    Ok(entry) => entry,
                    Err(e) => {
                        counter!(m::COLLECTOR_PARSE_ERRORS_TOTAL).increment(1);
                        let preview: String = line.chars().take(50).collect();
                        debug!(path = %path.display(), error = %e, line = %preview, "unparsable access log line");
                        continue;
                    }
                };

                let logged_at = entry.time.with_timezone(&Local);
                if logged_at > horizon {
                    continue;
                }
                if logged_at <= self.watermark {
                    break;
                }
                records.push(entry.into_record(&self.source_tag));
            }
        }

        records.sort_by_key(|record| record.timestamp);
        if horizon > self.watermark {
            self.watermark = horizon;
        }
        records
    }

    fn refresh_files(&mut self) {
        match discover_site_logs(&self.logs_dir) {
            Ok(found) => {
                for path in found {
                    if !self.tracked_files.contains(&path) {
                        info!(path = %path.display(), "tracking new access log");
                        self.tracked_files.push(path);
                    }
                }
            }
            Err(e) => {
                warn!(logs_dir = %self.logs_dir.display(), error = %e, "access log rediscovery failed");
            }
        }
    }
}

/// 로그 테일 모니터 빌더
pub struct LogTailMonitorBuilder {
    logs_dir: PathBuf,
    poll_interval: Duration,
    source_tag: String,
    rediscover: bool,
    queue_capacity: usize,
    drop_policy: DropPolicy,
}

impl LogTailMonitorBuilder {
    fn new(logs_dir: impl AsRef<Path>) -> Self {
        Self {
            logs_dir: logs_dir.as_ref().to_path_buf(),
            poll_interval: Duration::from_secs(5),
            source_tag: "nginx".to_owned(),
            rediscover: false,
            queue_capacity: 0,
            drop_policy: DropPolicy::Oldest,
        }
    }

    /// 파싱 주기 (기본: 5초)
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// 레코드 `source_id` 태그 (기본: "nginx")
    pub fn source_tag(mut self, tag: impl Into<String>) -> Self {
        self.source_tag = tag.into();
        self
    }

    /// 매 틱 디렉토리 재탐색 여부 (기본: 끔)
    pub fn rediscover(mut self, rediscover: bool) -> Self {
        self.rediscover = rediscover;
        self
    }

    /// 큐 용량과 드롭 정책 (용량 0 = 무제한)
    pub fn queue(mut self, capacity: usize, drop_policy: DropPolicy) -> Self {
        self.queue_capacity = capacity;
        self.drop_policy = drop_policy;
        self
    }

    /// 디렉토리를 탐색하고 모니터를 생성합니다.
    ///
    /// 워터마크는 지금 시각의 [`settled_horizon`]에서 시작하므로, 생성 직전 초에
    /// 기록 중이던 라인도 첫 틱에서 내보냅니다.
    pub fn build(self) -> Result<LogTailMonitor, ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "middleware.interval_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        let watermark = settled_horizon(Local::now());
        let tail = LogTailState::new(&self.logs_dir, &self.source_tag, watermark)?
            .with_rediscover(self.rediscover);
        let queue = RecordQueue::new(&self.source_tag, self.queue_capacity, self.drop_policy);

        Ok(LogTailMonitor {
            name: self.source_tag,
            interval: self.poll_interval,
            tail: Some(tail),
            queue,
            state: SharedState::new(),
            cancel: None,
            handle: None,
        })
    }
}

/// 프록시 접근 로그 테일 모니터
pub struct LogTailMonitor {
    name: String,
    interval: Duration,
    /// 정지 상태에서만 존재 (실행 중에는 프로듀서 태스크가 소유)
    tail: Option<LogTailState>,
    queue: RecordQueue,
    state: SharedState,
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<Option<LogTailState>>>,
}

impl LogTailMonitor {
    /// 빌더를 생성합니다.
    pub fn builder(logs_dir: impl AsRef<Path>) -> LogTailMonitorBuilder {
        LogTailMonitorBuilder::new(logs_dir)
    }

    /// 테일 상태 (실행 중에는 `None`)
    pub fn tail_state(&self) -> Option<&LogTailState> {
        self.tail.as_ref()
    }

    /// 파싱 주기
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

async fn tail_loop(
    mut tail: LogTailState,
    interval: Duration,
    queue: RecordQueue,
    state: SharedState,
    cancel: CancellationToken,
) -> Option<LogTailState> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(source = %tail.source_tag, "log tail loop received shutdown signal");
                return Some(tail);
            }
            _ = ticker.tick() => {
                let current_tick = Local::now();
                let scanned = tokio::task::spawn_blocking(move || {
                    let records = tail.scan(current_tick);
                    (tail, records)
                })
                .await;

                match scanned {
                    Ok((returned, records)) => {
                        tail = returned;
                        if !records.is_empty() {
                            debug!(source = %tail.source_tag, count = records.len(), "access log records captured");
                        }
                        queue.extend(records);
                    }
                    Err(e) => {
                        error!(error = %e, "access log scan task failed");
                        state.set(MonitorState::Failed);
                        return None;
                    }
                }
            }
        }
    }
}

impl Monitor for LogTailMonitor {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::ProxyLog
    }

    fn state(&self) -> MonitorState {
        self.state.get()
    }

    fn queue(&self) -> &RecordQueue {
        &self.queue
    }

    async fn start(&mut self, cancel: CancellationToken) -> Result<(), TrafficwatchError> {
        if self.handle.is_some() {
            return Err(MonitorError::AlreadyRunning {
                name: self.name.clone(),
            }
            .into());
        }
        let Some(tail) = self.tail.take() else {
            return Err(MonitorError::Join {
                name: self.name.clone(),
                reason: "tail state was lost by a failed scan task".to_owned(),
            }
            .into());
        };

        info!(
            source = %self.name,
            logs_dir = %tail.logs_dir.display(),
            files = tail.tracked_files.len(),
            interval_secs = self.interval.as_secs_f64(),
            "log tail monitor starting"
        );

        self.state.set(MonitorState::Running);
        let handle = tokio::spawn(tail_loop(
            tail,
            self.interval,
            self.queue.clone(),
            self.state.clone(),
            cancel.clone(),
        ));
        self.cancel = Some(cancel);
        self.handle = Some(handle);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), TrafficwatchError> {
        let Some(handle) = self.handle.take() else {
            return Err(MonitorError::NotRunning {
                name: self.name.clone(),
            }
            .into());
        };
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }

        let tail = handle.await.map_err(|e| MonitorError::Join {
            name: self.name.clone(),
            reason: e.to_string(),
        })?;
        self.tail = tail;

        if self.state.get() != MonitorState::Failed {
            self.state.set(MonitorState::Stopped);
        }
        info!(source = %self.name, queued = self.queue.len(), "log tail monitor stopped");
        Ok(())
    }
}
