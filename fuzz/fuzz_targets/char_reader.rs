#![no_main]
use aslap::{CharReader, REPL};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut consumed = 0;
    let mut output = Vec::new();
    for decoded in CharReader::new(data) {
        let decoded = decoded.unwrap();
        let end = consumed + decoded.consumed();

        // Every character covers exactly the input bytes it advanced over,
        // unless it replaces a single invalid byte.
        if decoded.is_replacement() {
            assert_eq!(decoded.char(), REPL);
            assert_eq!(decoded.consumed(), 1);
        } else {
            assert_eq!(decoded.as_bytes(), &data[consumed..end]);
        }

        output.extend_from_slice(decoded.as_bytes());
        consumed = end;
    }
    assert_eq!(consumed, data.len());
    assert!(std::str::from_utf8(&output).is_ok());
    if std::str::from_utf8(data).is_ok() {
        assert_eq!(output, data);
    }
});
