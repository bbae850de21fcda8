#![no_main]

use libfuzzer_sys::fuzz_target;
use webparts_core::{decode_state, encode_state};

const MAX_BLOB_BYTES: usize = 64 * 1024;

fuzz_target!(|data: &[u8]| {
    let capped = &data[..data.len().min(MAX_BLOB_BYTES)];
    let Ok(records) = decode_state(capped) else {
        return;
    };
    // Whatever decodes must survive a rewrite.
    if let Some(bytes) = encode_state(&records) {
        let again = decode_state(&bytes).expect("re-encoded state decodes");
        assert!(again.len() <= records.len());
    }
});
