#![no_main]

use fairway_core::wire::{Inbound, decode_inbound, snapshot_frame};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoding must never panic, whatever the frame holds.
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(inbound) = decode_inbound(text) else {
        return;
    };

    // Whatever was coerced must survive a re-encode as a snapshot frame.
    if let Inbound::Snapshot(snapshot) = inbound {
        let frame = snapshot_frame(&snapshot);
        match decode_inbound(&frame) {
            Ok(Inbound::Snapshot(again)) => {
                assert_eq!(again.players.len(), snapshot.players.len());
                assert_eq!(again.deck_remaining, snapshot.deck_remaining);
            }
            other => panic!("re-encoded snapshot decoded as {other:?}"),
        }
    }
});
