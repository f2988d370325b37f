//! 설정으로부터 모니터 집합을 구성합니다.
//!
//! 인터페이스 항목마다 [`InterfaceMonitor`] 하나, 미들웨어 섹션이 있으면
//! [`LogTailMonitor`] 하나를 만듭니다. 어떤 모니터도 시작하지 않습니다.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use trafficwatch_core::{ConfigError, TrafficwatchConfig};

use crate::interface::{CaptureBackend, InterfaceMonitor};
use crate::log_tail::LogTailMonitor;
use crate::monitor::DynMonitor;

/// 설정에 선언된 모든 모니터를 생성합니다 (시작하지 않음).
///
/// 순서는 인터페이스 모니터(설정 순서) 다음 로그 테일 모니터입니다.
///
/// # 에러
/// - 알 수 없는 인터페이스 이름
/// - 읽을 수 없는 로그 디렉토리
pub fn build_monitors(
    config: &TrafficwatchConfig,
    backend: Arc<dyn CaptureBackend>,
) -> Result<Vec<Box<dyn DynMonitor>>, ConfigError> {
    let system = &config.system;
    let mut monitors: Vec<Box<dyn DynMonitor>> = Vec::new();

    for entry in &config.monitors {
        let monitor = InterfaceMonitor::builder(&entry.interface)
            .poll_interval(Duration::from_secs(entry.interval))
            .ports(entry.ports.clone())
            .exclude_internal(system.filter_internal_ip)
            .queue(system.queue_capacity, system.drop_policy)
            .build(Arc::clone(&backend))?;
        monitors.push(Box::new(monitor));
    }

    if let Some(middleware) = &config.middleware {
        let monitor = LogTailMonitor::builder(&middleware.logs_dir)
            .poll_interval(Duration::from_secs(middleware.interval_secs))
            .source_tag(&middleware.source_tag)
            .rediscover(middleware.rediscover)
            .queue(system.queue_capacity, system.drop_policy)
            .build()?;
        monitors.push(Box::new(monitor));
    }

    info!(
        interfaces = config.monitors.len(),
        proxy_log = config.middleware.is_some(),
        "monitors constructed"
    );
    Ok(monitors)
}
