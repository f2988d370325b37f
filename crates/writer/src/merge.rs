//! 인터페이스 레코드 중복 병합
//!
//! 같은 `(src_ip, src_port, source_id)` 흐름의 인터페이스 레코드는 하나만 남기고,
//! 그 시각을 흐름에서 가장 늦은 관측 시각으로 올립니다.
//! 프록시 로그 레코드는 병합하지 않고 그대로 통과시킵니다.

use std::collections::HashMap;

use trafficwatch_core::TrafficRecord;

/// 배치를 병합합니다. 출력 순서는 각 흐름이 처음 나타난 위치를 따릅니다.
pub fn merge_interface_records(records: Vec<TrafficRecord>) -> Vec<TrafficRecord> {
    let mut merged: Vec<TrafficRecord> = Vec::with_capacity(records.len());
    let mut index: HashMap<(String, u16, String), usize> = HashMap::new();

    for record in records {
        if !record.is_interface() {
            merged.push(record);
            continue;
        }

        let key = (
            record.src_ip.clone(),
            record.src_port,
            record.source_id.clone(),
        );
        match index.get(&key) {
            Some(&slot) => {
                let kept = &mut merged[slot];
                if record.timestamp > kept.timestamp {
                    kept.timestamp = record.timestamp;
                }
            }
            None => {
                index.insert(key, merged.len());
                merged.push(record);
            }
        }
    }

    merged
}
