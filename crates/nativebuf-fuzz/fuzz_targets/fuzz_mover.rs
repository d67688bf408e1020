#![no_main]
use libfuzzer_sys::fuzz_target;
use nativebuf_core::{CopyRange, move_within};

fuzz_target!(|data: &[u8]| {
    // Header: src (u16), dest (u16), len (u16); the rest is the arena.
    if data.len() < 6 {
        return;
    }
    let src = u16::from_le_bytes([data[0], data[1]]) as usize;
    let dest = u16::from_le_bytes([data[2], data[3]]) as usize;
    let len = u16::from_le_bytes([data[4], data[5]]) as usize;

    let mut arena = data[6..].to_vec();
    let mut expected = arena.clone();
    let range = CopyRange::new(src, dest, len);

    match move_within(&mut arena, range) {
        Ok(_) => {
            expected.copy_within(src..src + len, dest);
            assert_eq!(arena, expected);
        }
        Err(_) => {
            assert!(src + len > expected.len() || dest + len > expected.len());
            assert_eq!(arena, expected);
        }
    }
});
