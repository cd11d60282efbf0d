//! Fuzz target: `RelayCommand::decode`
//!
//! Feeds arbitrary payloads on both command topics.  Decoding must never
//! panic, and anything that decodes must re-encode to the same bytes.
//!
//! cargo fuzz run fuzz_command_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use zcrelay::app::commands::{RelayCommand, TOPIC_RELAY_CMD, TOPIC_SYNC_CMD};

fuzz_target!(|data: &[u8]| {
    for topic in [TOPIC_RELAY_CMD, TOPIC_SYNC_CMD] {
        let Ok(cmd) = RelayCommand::decode(topic, data) else {
            continue;
        };
        assert_eq!(cmd.topic(), topic);

        let mut buf = [0u8; 16];
        let bytes = cmd.encode(&mut buf).expect("decoded command fits the buffer");
        assert_eq!(RelayCommand::decode(topic, bytes), Ok(cmd));
    }
});
