#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Any body must yield points or a MalformedResponse, never a panic
    match elpris::prices::parse_points(data) {
        Ok(_) => {}
        Err(e) => assert!(matches!(
            e,
            elpris::ElprisError::MalformedResponse { .. }
        )),
    }
});
