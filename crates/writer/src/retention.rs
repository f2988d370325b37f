//! 보존 기간 정리기
//!
//! 출력 트리 전체를 순회하며 수정 시각이 보존 기간보다 오래된 파일을 삭제합니다.
//! 삭제 실패는 기록만 하고 나머지 파일의 정리는 계속합니다.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use trafficwatch_core::CleanupError;
use trafficwatch_core::config::ObserverConfig;
use trafficwatch_core::metrics as m;

const SECS_PER_DAY: u64 = 86_400;

/// 한 번의 정리 결과
#[derive(Debug, Default)]
pub struct SweepReport {
    /// 삭제된 파일 경로
    pub removed: Vec<PathBuf>,
    /// 정리 중 발생한 에러 (디렉토리 순회, 메타데이터, 삭제)
    pub errors: Vec<CleanupError>,
}

impl SweepReport {
    /// 삭제된 파일 수
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    /// 실패 수
    pub fn failed_count(&self) -> usize {
        self.errors.len()
    }
}

/// `root` 아래에서 수정 시각이 `cutoff`보다 이전인 파일을 모두 삭제합니다.
///
/// 블로킹 파일 I/O를 수행합니다. 디렉토리는 삭제하지 않습니다.
pub fn sweep(root: &Path, cutoff: SystemTime) -> SweepReport {
    let mut report = SweepReport::default();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(source) => {
                report.errors.push(CleanupError::ReadDir { path: dir, source });
                continue;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(source) => {
                    report.errors.push(CleanupError::Metadata { path, source });
                    continue;
                }
            };

            if metadata.is_dir() {
                pending.push(path);
                continue;
            }

            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(source) => {
                    report.errors.push(CleanupError::Metadata { path, source });
                    continue;
                }
            };
            if modified >= cutoff {
                continue;
            }

            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "removed expired output file");
                    report.removed.push(path);
                }
                Err(source) => report.errors.push(CleanupError::Remove { path, source }),
            }
        }
    }

    report
}

/// 주기적으로 [`sweep`]을 실행하는 정리기
#[derive(Debug, Clone)]
pub struct RetentionObserver {
    root: PathBuf,
    retention: Duration,
    check_interval: Duration,
}

impl RetentionObserver {
    /// 새 정리기를 생성합니다.
    pub fn new(root: impl Into<PathBuf>, retention: Duration, check_interval: Duration) -> Self {
        Self {
            root: root.into(),
            retention,
            check_interval,
        }
    }

    /// 설정으로부터 생성합니다 (`cleanup_days`일, `check_interval_secs`초).
    pub fn from_config(root: impl Into<PathBuf>, config: &ObserverConfig) -> Self {
        Self::new(
            root,
            Duration::from_secs(u64::from(config.cleanup_days) * SECS_PER_DAY),
            Duration::from_secs(config.check_interval_secs),
        )
    }

    /// 정리 대상 루트
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 보존 기간
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// 현재 시각 기준으로 한 번 정리합니다.
    pub fn sweep_now(&self) -> SweepReport {
        let cutoff = SystemTime::now()
            .checked_sub(self.retention)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let report = sweep(&self.root, cutoff);

        counter!(m::RETENTION_FILES_REMOVED_TOTAL).increment(report.removed_count() as u64);
        counter!(m::RETENTION_CLEANUP_ERRORS_TOTAL).increment(report.failed_count() as u64);
        for err in &report.errors {
            warn!(error = %err, "retention cleanup error");
        }
        if report.removed_count() > 0 || report.failed_count() > 0 {
            info!(
                root = %self.root.display(),
                removed = report.removed_count(),
                failed = report.failed_count(),
                "retention sweep finished"
            );
        }
        report
    }

    /// 백그라운드 태스크로 실행합니다. 첫 정리는 즉시 수행됩니다.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// 취소될 때까지 `check_interval`마다 정리합니다.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            root = %self.root.display(),
            retention_days = self.retention.as_secs() / SECS_PER_DAY,
            interval_secs = self.check_interval.as_secs(),
            "retention observer started"
        );

        let mut ticker = tokio::time::interval(self.check_interval.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("retention observer stopped");
                    return;
                }
                _ = ticker.tick() => {
                    let observer = self.clone();
                    if let Err(e) = tokio::task::spawn_blocking(move || observer.sweep_now()).await {
                        error!(error = %e, "retention sweep task failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::{self, File};

    use super::*;

    fn age_file(path: &Path, days: u64) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(days * SECS_PER_DAY))
            .unwrap();
    }

    #[test]
    fn removes_only_files_past_retention() {
        let dir = tempfile::tempdir().unwrap();
        let month = dir.path().join("2024-01");
        fs::create_dir(&month).unwrap();

        let old = month.join("20240101.csv");
        let recent = month.join("20240108.csv");
        let fresh = dir.path().join("20240115.jpg");
        for path in [&old, &recent, &fresh] {
            fs::write(path, "x").unwrap();
        }
        age_file(&old, 8);
        age_file(&recent, 6);

        let observer = RetentionObserver::new(
            dir.path(),
            Duration::from_secs(7 * SECS_PER_DAY),
            Duration::from_secs(3600),
        );
        let report = observer.sweep_now();

        assert_eq!(report.removed, vec![old.clone()]);
        assert_eq!(report.failed_count(), 0);
        assert!(!old.exists());
        assert!(recent.exists());
        assert!(fresh.exists());
        assert!(month.exists());
    }

    #[test]
    fn missing_root_is_reported_not_fatal() {
        let report = sweep(Path::new("/nonexistent/trafficwatch/out"), SystemTime::now());
        assert_eq!(report.removed_count(), 0);
        assert!(matches!(report.errors.as_slice(), [CleanupError::ReadDir { .. }]));
    }

    #[test]
    fn from_config_converts_days() {
        let config = ObserverConfig {
            enabled: true,
            cleanup_days: 7,
            check_interval_secs: 60,
        };
        let observer = RetentionObserver::from_config("/tmp/out", &config);
        assert_eq!(observer.retention(), Duration::from_secs(7 * 86_400));
        assert_eq!(observer.root(), Path::new("/tmp/out"));
    }

    #[tokio::test]
    async fn first_sweep_runs_immediately_and_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.csv");
        fs::write(&old, "x").unwrap();
        age_file(&old, 30);

        let cancel = CancellationToken::new();
        let handle = RetentionObserver::new(
            dir.path(),
            Duration::from_secs(SECS_PER_DAY),
            Duration::from_secs(3600),
        )
        .spawn(cancel.clone());

        let deadline = std::time::Instant::now() + Duration::from_secs(3);
        while old.exists() && std::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!old.exists());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
