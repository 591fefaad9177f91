//! Fuzz harness for `Address` parsing.
//!
//! Arbitrary text must parse or fail cleanly, and anything that parses must
//! print back to the same lowercase form.

#![no_main]
use libfuzzer_sys::fuzz_target;
use opman_core::Address;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(address) = s.parse::<Address>() {
        let printed = address.to_string();
        assert_eq!(printed, s.to_ascii_lowercase());
        assert_eq!(printed.parse::<Address>().ok(), Some(address));
    }
});
