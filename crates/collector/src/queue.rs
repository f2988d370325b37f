//! 레코드 큐 -- 모니터 프로듀서와 수집 루프가 공유하는 인메모리 큐
//!
//! [`RecordQueue`]는 복제 가능한 핸들입니다. 프로듀서 루프는 `push`로 적재하고,
//! 수집 루프는 `drain_all`로 한 번에 비웁니다. 두 연산 모두 같은 뮤텍스 아래에서
//! 수행되므로 레코드가 유실되거나 중복되지 않습니다.
//!
//! # 오버플로우 정책
//! 용량이 0이면 무제한입니다 (유실 없음). 용량이 주어지고 가득 찬 경우:
//! - [`DropPolicy::Oldest`]: 가장 오래된 레코드를 드롭하고 새 레코드를 추가
//! - [`DropPolicy::Newest`]: 새 레코드를 거부

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use metrics::{counter, gauge};
use tracing::warn;

use trafficwatch_core::TrafficRecord;
use trafficwatch_core::config::DropPolicy;
use trafficwatch_core::metrics as m;

/// 모니터별 레코드 큐
#[derive(Debug, Clone)]
pub struct RecordQueue {
    inner: Arc<QueueInner>,
}

#[derive(Debug)]
struct QueueInner {
    /// 메트릭/로그 레이블 (모니터 이름)
    label: String,
    buffer: Mutex<VecDeque<TrafficRecord>>,
    /// 최대 용량 (0 = 무제한)
    capacity: usize,
    drop_policy: DropPolicy,
    dropped_count: AtomicU64,
    total_received: AtomicU64,
}

/// 큐 통계 스냅샷
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    /// 현재 대기 중인 레코드 수
    pub queued: usize,
    /// 오버플로로 드롭된 레코드 수
    pub dropped: u64,
    /// 지금까지 유입된 레코드 수
    pub total_received: u64,
}

impl RecordQueue {
    /// 무제한 큐를 생성합니다.
    pub fn unbounded(label: impl Into<String>) -> Self {
        Self::new(label, 0, DropPolicy::Oldest)
    }

    /// 새 큐를 생성합니다. `capacity`가 0이면 무제한입니다.
    pub fn new(label: impl Into<String>, capacity: usize, drop_policy: DropPolicy) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                label: label.into(),
                buffer: Mutex::new(VecDeque::new()),
                capacity,
                drop_policy,
                dropped_count: AtomicU64::new(0),
                total_received: AtomicU64::new(0),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<TrafficRecord>> {
        // 프로듀서가 패닉해도 이미 적재된 레코드는 살린다
        self.inner
            .buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 레코드를 적재합니다.
    ///
    /// 드롭이 발생하면 `true`를 반환합니다.
    pub fn push(&self, record: TrafficRecord) -> bool {
        let inner = &self.inner;
        inner.total_received.fetch_add(1, Ordering::Relaxed);

        let mut buffer = self.lock();
        if inner.capacity > 0 && buffer.len() >= inner.capacity {
            let dropped = inner.dropped_count.fetch_add(1, Ordering::Relaxed) + 1;
            counter!(m::COLLECTOR_RECORDS_DROPPED_TOTAL, m::LABEL_MONITOR => inner.label.clone())
                .increment(1);
            match inner.drop_policy {
                DropPolicy::Oldest => {
                    buffer.pop_front();
                    buffer.push_back(record);
                    warn!(
                        monitor = %inner.label,
                        dropped,
                        capacity = inner.capacity,
                        "queue full, dropped oldest record"
                    );
                }
                DropPolicy::Newest => {
                    warn!(
                        monitor = %inner.label,
                        dropped,
                        capacity = inner.capacity,
                        "queue full, rejected new record"
                    );
                }
            }
            return true;
        }

        buffer.push_back(record);
        counter!(m::COLLECTOR_RECORDS_CAPTURED_TOTAL, m::LABEL_MONITOR => inner.label.clone())
            .increment(1);
        false
    }

    /// 여러 레코드를 순서대로 적재합니다. 드롭된 수를 반환합니다.
    pub fn extend(&self, records: impl IntoIterator<Item = TrafficRecord>) -> usize {
        records
            .into_iter()
            .map(|record| usize::from(self.push(record)))
            .sum()
    }

    /// 큐의 모든 레코드를 적재 순서대로 꺼냅니다. 블로킹하지 않습니다.
    pub fn drain_all(&self) -> Vec<TrafficRecord> {
        let drained: Vec<_> = self.lock().drain(..).collect();
        gauge!(m::COLLECTOR_QUEUE_DEPTH, m::LABEL_MONITOR => self.inner.label.clone()).set(0.0);
        drained
    }

    /// 현재 대기 중인 레코드 수
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// 큐가 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// 최대 용량 (0 = 무제한)
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// 큐 통계 스냅샷
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            queued: self.len(),
            dropped: self.inner.dropped_count.load(Ordering::Relaxed),
            total_received: self.inner.total_received.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn record(port: u16) -> TrafficRecord {
        TrafficRecord::interface(Local::now(), "eth0", "203.0.113.1", port)
    }

    #[test]
    fn push_and_drain_preserves_order() {
        let queue = RecordQueue::unbounded("eth0");
        for port in 1..=3 {
            assert!(!queue.push(record(port)));
        }
        let drained = queue.drain_all();
        let ports: Vec<_> = drained.iter().map(|r| r.src_port).collect();
        assert_eq!(ports, vec![1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_empty_returns_empty_vec() {
        let queue = RecordQueue::unbounded("eth0");
        assert!(queue.drain_all().is_empty());
    }

    #[test]
    fn unbounded_queue_never_drops() {
        let queue = RecordQueue::unbounded("eth0");
        for port in 0..10_000 {
            queue.push(record(port));
        }
        let stats = queue.stats();
        assert_eq!(stats.queued, 10_000);
        assert_eq!(stats.dropped, 0);
    }

    #[test]
    fn oldest_drop_policy_keeps_newest() {
        let queue = RecordQueue::new("eth0", 2, DropPolicy::Oldest);
        queue.push(record(1));
        queue.push(record(2));
        assert!(queue.push(record(3)));

        let ports: Vec<_> = queue.drain_all().iter().map(|r| r.src_port).collect();
        assert_eq!(ports, vec![2, 3]);
        assert_eq!(queue.stats().dropped, 1);
    }

    #[test]
    fn newest_drop_policy_rejects_incoming() {
        let queue = RecordQueue::new("eth0", 2, DropPolicy::Newest);
        queue.push(record(1));
        queue.push(record(2));
        assert!(queue.push(record(3)));

        let ports: Vec<_> = queue.drain_all().iter().map(|r| r.src_port).collect();
        assert_eq!(ports, vec![1, 2]);
        assert_eq!(queue.stats().total_received, 3);
    }

    #[test]
    fn extend_reports_drops() {
        let queue = RecordQueue::new("eth0", 1, DropPolicy::Newest);
        let dropped = queue.extend((0..4).map(record));
        assert_eq!(dropped, 3);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn clones_share_storage() {
        let queue = RecordQueue::unbounded("eth0");
        let producer = queue.clone();
        producer.push(record(7));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn concurrent_push_and_drain_loses_nothing() {
        let queue = RecordQueue::unbounded("eth0");
        let producers: Vec<_> = (0..4)
            .map(|_| {
                let q = queue.clone();
                std::thread::spawn(move || {
                    for port in 0..1_000 {
                        q.push(record(port));
                    }
                })
            })
            .collect();

        let mut collected = 0;
        while producers.iter().any(|h| !h.is_finished()) {
            collected += queue.drain_all().len();
        }
        for handle in producers {
            handle.join().unwrap();
        }
        collected += queue.drain_all().len();
        assert_eq!(collected, 4_000);
    }
}
