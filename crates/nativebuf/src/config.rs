//! Layout configuration.
//!
//! The pointer width used for array strides and address-space limits is read
//! from the `NATIVEBUF_POINTER_WIDTH` environment variable:
//! - `32`, `4`, `x86`: 32-bit interop layout (4-byte strides, 4 GiB limit).
//! - `64`, `8`, `x64`: 64-bit interop layout.
//! - unset or anything else: the width of the compilation target.
//!
//! The value is resolved once per process. Callers racing the first
//! resolution block until it finishes, so every buffer sees the same width.

use std::sync::OnceLock;

use nativebuf_core::PointerWidth;

/// Environment variable selecting the interop pointer width.
pub const POINTER_WIDTH_ENV: &str = "NATIVEBUF_POINTER_WIDTH";

static RESOLVED_WIDTH: OnceLock<PointerWidth> = OnceLock::new();

fn parse_width_env(raw: &str) -> PointerWidth {
    PointerWidth::from_str_loose(raw).unwrap_or(PointerWidth::NATIVE)
}

fn resolve_width() -> PointerWidth {
    let width = std::env::var(POINTER_WIDTH_ENV)
        .map(|v| parse_width_env(&v))
        .unwrap_or(PointerWidth::NATIVE);
    log::debug!("nativebuf: interop pointer width {width:?}");
    width
}

/// Get the configured pointer width (reads the env var on first call, caches
/// thereafter).
#[must_use]
pub fn pointer_width() -> PointerWidth {
    *RESOLVED_WIDTH.get_or_init(resolve_width)
}
