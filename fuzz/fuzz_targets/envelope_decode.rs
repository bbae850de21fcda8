#![no_main]

use libfuzzer_sys::fuzz_target;
use webparts_core::decode_state;
use webparts_runtime::store::{decode_envelope, encode_envelope};

fuzz_target!(|data: &[u8]| {
    if let Ok(payload) = decode_envelope(data) {
        assert_eq!(encode_envelope(&payload), data);
        let _ = decode_state(&payload);
    }

    let wrapped = encode_envelope(data);
    assert_eq!(decode_envelope(&wrapped).as_deref(), Ok(data));
});
