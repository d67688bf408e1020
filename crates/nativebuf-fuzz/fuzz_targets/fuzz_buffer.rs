#![no_main]
use libfuzzer_sys::fuzz_target;
use nativebuf::{BufferError, HeapAllocation, PointerWidth, SafeBuffer};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let capacity = usize::from(data[0]);
    let Ok(alloc) = HeapAllocation::zeroed(capacity) else {
        return;
    };
    let mut buf = SafeBuffer::with_pointer_width(alloc, PointerWidth::Bits64);
    if buf.initialize(capacity as u64).is_err() {
        return;
    }
    let mut shadow = vec![0_u8; capacity];

    for chunk in data[1..].chunks(4) {
        if chunk.len() < 4 {
            break;
        }
        let offset = usize::from(chunk[1]);
        let value = u16::from_le_bytes([chunk[2], chunk[3]]);
        let fits = offset + 2 <= capacity;

        match chunk[0] % 4 {
            0 => match buf.write(offset, value) {
                Ok(()) => {
                    assert!(fits);
                    shadow[offset..offset + 2].copy_from_slice(&value.to_ne_bytes());
                }
                Err(err) => {
                    assert!(!fits);
                    assert!(matches!(err, BufferError::BufferTooSmall { .. }));
                }
            },
            1 => match buf.read::<u16>(offset) {
                Ok(read) => {
                    assert!(fits);
                    let expected = [shadow[offset], shadow[offset + 1]];
                    assert_eq!(read, u16::from_ne_bytes(expected));
                }
                Err(err) => {
                    assert!(!fits);
                    assert!(matches!(err, BufferError::BufferTooSmall { .. }));
                }
            },
            2 => {
                let count = usize::from(chunk[2] % 16);
                let src = vec![chunk[3]; count];
                let ok = buf.write_array(offset, &src, 0, count).is_ok();
                assert_eq!(ok, offset + count <= capacity);
                if ok {
                    shadow[offset..offset + count].fill(chunk[3]);
                }
            }
            _ => {
                let guard = buf.acquire_pointer().expect("open buffer pins");
                assert_eq!(guard.len(), capacity);
                let pinned = buf.dangerous_add_ref().is_ok();
                assert!(pinned);
                assert!(buf.dangerous_release().is_ok());
                drop(guard);
                assert_eq!(buf.pin_count(), 0);
            }
        }
    }

    let mut out = vec![0_u8; capacity];
    buf.read_span(0, &mut out).expect("full span read");
    assert_eq!(out, shadow);
});
