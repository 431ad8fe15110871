#![no_main]

//! Typed side-data payloads decoded from arbitrary bytes.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use transcode_core::{AddPolicy, FrameSideDataType, SideDataSet};

#[derive(Arbitrary, Debug)]
struct Input {
    entries: Vec<(u8, u8, Vec<u8>)>,
}

fuzz_target!(|input: Input| {
    let mut set = SideDataSet::<FrameSideDataType>::new();
    for (kind, policy, bytes) in input.entries.iter().take(64) {
        let kind = FrameSideDataType::ALL[usize::from(*kind) % FrameSideDataType::ALL.len()];
        let policy = match policy % 3 {
            0 => AddPolicy::Replace,
            1 => AddPolicy::RejectDuplicate,
            _ => AddPolicy::Append,
        };
        let before = set.len();
        match set.add_bytes(kind, bytes, policy) {
            Ok(_) => {
                if let Ok(Some(value)) = set.value(kind) {
                    assert_eq!(value.kind().encoded_len(), value.encode().len());
                }
            }
            Err(_) => assert_eq!(set.len(), before),
        }
    }
});
