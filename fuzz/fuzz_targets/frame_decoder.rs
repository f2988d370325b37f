#![no_main]

use libfuzzer_sys::fuzz_target;
use trafficwatch_collector::interface::{FramePolicy, decode_frame};

fuzz_target!(|data: &[u8]| {
    // 잘린 프레임이나 알 수 없는 ethertype은 None이어야 한다
    if let Some(frame) = decode_frame(data) {
        let policy = FramePolicy::new(Some(&[22, 80, 443]), true);
        let _ = policy.accepts(&frame);
    }
});
