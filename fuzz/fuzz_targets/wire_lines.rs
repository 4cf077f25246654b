#![no_main]

use buildwire_report::wire::{encode_task, split_lines};
use buildwire_report::SourceLocation;
use libfuzzer_sys::fuzz_target;

const MAX_INPUT_BYTES: usize = 4096;

fuzz_target!(|data: &[u8]| {
    let capped = &data[..data.len().min(MAX_INPUT_BYTES)];
    let text = String::from_utf8_lossy(capped);
    let location = SourceLocation::new("build.xml", u32::from(capped.first().copied().unwrap_or(0)));
    for line in split_lines(&text) {
        assert!(!line.contains(['\r', '\n']));
        let encoded = encode_task(2, "fuzz", line, Some(&location));
        assert!(!encoded.contains('\n'));
    }
});
