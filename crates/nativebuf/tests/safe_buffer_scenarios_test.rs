use bytemuck::{Pod, Zeroable};
use nativebuf::{
    ArgumentError, BufferError, BufferState, HeapAllocation, PointerWidth, RangeLimit, SafeBuffer,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
struct Rgb {
    r: u8,
    g: u8,
    b: u8,
}

#[derive(Clone, Copy, Debug)]
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn gen_range_usize(&mut self, low: usize, high_inclusive: usize) -> usize {
        assert!(low <= high_inclusive);
        let span = high_inclusive - low + 1;
        low + (self.next_u64() as usize % span)
    }
}

fn sized(width: PointerWidth, capacity: usize) -> SafeBuffer {
    let mut buf = SafeBuffer::with_pointer_width(HeapAllocation::zeroed(capacity).unwrap(), width);
    buf.initialize(capacity as u64).unwrap();
    buf
}

#[test]
fn byte_array_round_trip() {
    let mut buf = sized(PointerWidth::Bits64, 16);
    let src: Vec<u8> = (1..=16).collect();
    buf.write_array(0, &src, 0, 16).unwrap();

    let mut dest = [0_u8; 16];
    buf.read_array(0, &mut dest, 0, 16).unwrap();
    assert_eq!(dest.as_slice(), src.as_slice());
}

#[test]
fn u64_round_trip() {
    let mut buf = sized(PointerWidth::NATIVE, 8);
    buf.write(0, 0xFFEE_DDCC_BBAA_9988_u64).unwrap();
    assert_eq!(buf.read::<u64>(0), Ok(0xFFEE_DDCC_BBAA_9988));
}

#[test]
fn bounds_boundary_is_exact() {
    let capacity = 24;
    let mut buf = sized(PointerWidth::Bits64, capacity);

    assert!(buf.write(capacity - 8, 1_u64).is_ok());
    assert_eq!(
        buf.write(capacity - 7, 1_u64),
        Err(BufferError::BufferTooSmall {
            offset: capacity - 7,
            len: 8,
            capacity
        })
    );
    assert!(buf.read::<u32>(capacity - 4).is_ok());
    assert!(matches!(
        buf.read::<u32>(capacity - 3),
        Err(BufferError::BufferTooSmall { .. })
    ));
    assert!(buf.read::<u8>(capacity - 1).is_ok());
    assert!(matches!(
        buf.read::<u8>(capacity),
        Err(BufferError::BufferTooSmall { .. })
    ));
    assert!(matches!(
        buf.read::<u8>(usize::MAX),
        Err(BufferError::BufferTooSmall { .. })
    ));
}

#[test]
fn value_larger_than_capacity_is_rejected() {
    let buf = sized(PointerWidth::Bits64, 4);
    assert_eq!(
        buf.read::<u64>(0),
        Err(BufferError::BufferTooSmall {
            offset: 0,
            len: 8,
            capacity: 4
        })
    );
}

#[test]
fn double_initialize_fails_and_keeps_capacity() {
    let mut buf = sized(PointerWidth::Bits64, 32);
    assert_eq!(
        buf.initialize(16),
        Err(BufferError::AlreadyInitialized { capacity: 32 })
    );
    assert_eq!(
        buf.initialize_elements(2, 4),
        Err(BufferError::AlreadyInitialized { capacity: 32 })
    );
    assert_eq!(buf.byte_length(), Ok(32));
}

#[test]
fn array_arguments_are_checked_before_state() {
    let buf = SafeBuffer::with_pointer_width(
        HeapAllocation::zeroed(8).unwrap(),
        PointerWidth::Bits64,
    );
    assert_eq!(buf.state(), BufferState::Uninitialized);

    let mut dest = [0_u16; 4];
    assert_eq!(
        buf.read_array(0, &mut dest, 5, 0),
        Err(BufferError::Argument(ArgumentError::IndexOutOfRange {
            index: 5,
            len: 4
        }))
    );
    assert_eq!(
        buf.read_array(0, &mut dest, 1, 4),
        Err(BufferError::Argument(ArgumentError::InvalidOffsetLength {
            index: 1,
            count: 4,
            len: 4
        }))
    );
    assert_eq!(
        buf.read_array(0, &mut dest, 0, 4),
        Err(BufferError::NotInitialized)
    );
}

#[test]
fn write_array_arguments_are_checked_before_state() {
    let mut buf = SafeBuffer::with_pointer_width(
        HeapAllocation::zeroed(8).unwrap(),
        PointerWidth::Bits64,
    );
    let src = [1_u16, 2, 3, 4];
    assert_eq!(
        buf.write_array(0, &src, 5, 0),
        Err(BufferError::Argument(ArgumentError::IndexOutOfRange {
            index: 5,
            len: 4
        }))
    );
    assert_eq!(
        buf.write_array(0, &src, 2, 3),
        Err(BufferError::Argument(ArgumentError::InvalidOffsetLength {
            index: 2,
            count: 3,
            len: 4
        }))
    );
    assert_eq!(
        buf.write_array(0, &src, 0, 4),
        Err(BufferError::NotInitialized)
    );

    buf.initialize(8).unwrap();
    assert!(matches!(
        buf.write_array(0, &src, 4, 1),
        Err(BufferError::Argument(ArgumentError::InvalidOffsetLength { .. }))
    ));
    assert!(buf.write_array(0, &src, 4, 0).is_ok());
    assert_eq!(buf.read::<u64>(0), Ok(0));
}

#[test]
fn array_window_moves_only_requested_elements() {
    let mut buf = sized(PointerWidth::Bits64, 16);
    let src = [10_u32, 20, 30, 40];
    buf.write_array(4, &src, 1, 2).unwrap();

    let mut dest = [0_u32; 4];
    buf.read_array(0, &mut dest, 0, 4).unwrap();
    assert_eq!(dest, [0, 20, 30, 0]);
}

#[test]
fn padded_stride_at_64_bit() {
    let mut buf = SafeBuffer::with_pointer_width(
        HeapAllocation::zeroed(64).unwrap(),
        PointerWidth::Bits64,
    );
    buf.initialize_for::<Rgb>(4).unwrap();
    assert_eq!(buf.byte_length(), Ok(32));

    let pixels = [
        Rgb { r: 1, g: 2, b: 3 },
        Rgb { r: 4, g: 5, b: 6 },
        Rgb { r: 7, g: 8, b: 9 },
        Rgb { r: 10, g: 11, b: 12 },
    ];
    buf.write_span(0, &pixels).unwrap();

    for (i, pixel) in pixels.iter().enumerate() {
        assert_eq!(buf.read::<Rgb>(i * 8).unwrap(), *pixel);
        // Padding bytes between elements stay untouched.
        assert_eq!(buf.read::<u8>(i * 8 + 3).unwrap(), 0);
    }

    let mut back = [Rgb::zeroed(); 4];
    buf.read_span(0, &mut back).unwrap();
    assert_eq!(back, pixels);

    // Four strided elements at offset 1 need 33 bytes.
    assert!(matches!(
        buf.read_span(1, &mut back),
        Err(BufferError::BufferTooSmall { len: 32, .. })
    ));
}

#[test]
fn padded_stride_at_32_bit() {
    let mut buf = SafeBuffer::with_pointer_width(
        HeapAllocation::zeroed(16).unwrap(),
        PointerWidth::Bits32,
    );
    buf.initialize_for::<Rgb>(4).unwrap();
    assert_eq!(buf.byte_length(), Ok(16));
    buf.write_span(0, &[Rgb { r: 9, g: 9, b: 9 }; 4]).unwrap();
    assert_eq!(buf.read::<Rgb>(12).unwrap(), Rgb { r: 9, g: 9, b: 9 });
}

#[test]
fn four_byte_elements_are_dense_at_64_bit() {
    let mut buf = SafeBuffer::with_pointer_width(
        HeapAllocation::zeroed(64).unwrap(),
        PointerWidth::Bits64,
    );
    buf.initialize_for::<u32>(8).unwrap();
    assert_eq!(buf.byte_length(), Ok(32));
}

#[test]
fn initialize_elements_multiplies_in_64_bits() {
    let mut buf = SafeBuffer::with_pointer_width(
        HeapAllocation::zeroed(0).unwrap(),
        PointerWidth::Bits32,
    );
    assert_eq!(
        buf.initialize_elements(u32::MAX, 2),
        Err(BufferError::OutOfRange {
            requested: u64::from(u32::MAX) * 2,
            max: u64::from(u32::MAX),
            limit: RangeLimit::AddressSpace,
        })
    );
    assert!(!buf.is_initialized());
}

#[test]
fn initialize_beyond_allocation_is_out_of_range() {
    let mut buf = SafeBuffer::with_pointer_width(
        HeapAllocation::zeroed(8).unwrap(),
        PointerWidth::Bits64,
    );
    assert_eq!(
        buf.initialize(9),
        Err(BufferError::OutOfRange {
            requested: 9,
            max: 8,
            limit: RangeLimit::Allocation,
        })
    );
    buf.initialize(8).unwrap();
}

#[test]
fn zero_capacity_buffer_accepts_empty_spans_only() {
    let mut buf = sized(PointerWidth::Bits64, 0);
    assert!(buf.write_span::<u64>(0, &[]).is_ok());
    assert!(matches!(
        buf.read::<u8>(0),
        Err(BufferError::BufferTooSmall { .. })
    ));
}

#[test]
fn allocate_sizes_and_zeroes() {
    let buf = SafeBuffer::allocate(32).unwrap();
    assert_eq!(buf.byte_length(), Ok(32));
    let mut out = [0xFF_u8; 32];
    buf.read_span(0, &mut out).unwrap();
    assert_eq!(out, [0_u8; 32]);
}

#[test]
fn deterministic_typed_writes_match_shadow() {
    const SEEDS: [u64; 3] = [7, 11, 13];
    const STEPS: usize = 1_000;
    const CAPACITY: usize = 256;

    for seed in SEEDS {
        let mut rng = XorShift64::new(seed);
        let mut buf = sized(PointerWidth::Bits64, CAPACITY);
        let mut shadow = vec![0_u8; CAPACITY];

        for _ in 0..STEPS {
            let offset = rng.gen_range_usize(0, CAPACITY + 8);
            let value = rng.next_u64();
            let width = [1_usize, 2, 4, 8][rng.gen_range_usize(0, 3)];
            let fits = offset + width <= CAPACITY;

            let (written, bytes) = match width {
                1 => (buf.write(offset, value as u8), vec![value as u8]),
                2 => (
                    buf.write(offset, value as u16),
                    (value as u16).to_ne_bytes().to_vec(),
                ),
                4 => (
                    buf.write(offset, value as u32),
                    (value as u32).to_ne_bytes().to_vec(),
                ),
                _ => (buf.write(offset, value), value.to_ne_bytes().to_vec()),
            };
            assert_eq!(written.is_ok(), fits, "seed={seed} offset={offset} width={width}");
            if fits {
                shadow[offset..offset + width].copy_from_slice(&bytes);
            }

            if offset + 8 <= CAPACITY {
                let expected = u64::from_ne_bytes(shadow[offset..offset + 8].try_into().unwrap());
                assert_eq!(buf.read::<u64>(offset), Ok(expected));
            }
        }

        let mut all = vec![0_u8; CAPACITY];
        buf.read_span(0, &mut all).unwrap();
        assert_eq!(all, shadow, "seed={seed}");
    }
}
