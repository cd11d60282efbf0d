//! Fuzz target: `StatusMsg::decode`
//!
//! Arbitrary bytes on the status topic must never panic the decoder, and
//! a decoded message must fit the fixed status buffer when re-encoded.
//!
//! cargo fuzz run fuzz_status_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use zcrelay::app::events::{STATUS_MSG_MAX_LEN, StatusMsg};

fuzz_target!(|data: &[u8]| {
    if let Some(msg) = StatusMsg::decode(data) {
        let mut buf = [0u8; STATUS_MSG_MAX_LEN];
        let bytes = msg.encode(&mut buf).expect("status fits STATUS_MSG_MAX_LEN");
        assert_eq!(StatusMsg::decode(bytes), Some(msg));
    }
});
