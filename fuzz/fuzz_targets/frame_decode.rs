//! Fuzz target for frame decoding
//!
//! Feeds arbitrary text to both decoders. Decoding must never panic, and a
//! frame that decodes must survive a re-encode unchanged.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(frame) = parley_proto::decode(text) {
        let encoded = parley_proto::encode_server(&frame).expect("decoded frame re-encodes");
        assert_eq!(parley_proto::decode(&encoded).ok(), Some(frame));
    }

    if let Ok(frame) = parley_proto::decode_client(text) {
        let encoded = parley_proto::encode(&frame).expect("decoded frame re-encodes");
        assert_eq!(parley_proto::decode_client(&encoded).ok(), Some(frame));
    }
});
