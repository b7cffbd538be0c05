//! Raw native values and their typed decoders.
//!
//! A ready native future exposes a single pointer-sized payload. How that
//! payload is interpreted is fixed when the wrapping future is constructed,
//! by choosing a decoder type; the payload itself carries no type
//! information and is never inspected at runtime.

/// Raw payload of a ready native future (the void*-equivalent).
pub type RawValue = u64;

/// A pointer-sized value left undecoded.
///
/// Used for operations whose result is a raw buffer pointer owned by the
/// native side; interpretation is up to the calling operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPointer(pub RawValue);

/// Types that can be decoded from a raw native payload.
///
/// Implemented for the value kinds the engine's operations produce:
/// no value, boolean, integer, and raw buffer pointer.
pub trait NativeDecode: Send + Sync + Sized + 'static {
    /// Interprets the raw payload as `Self`.
    fn decode(raw: RawValue) -> Self;
}

impl NativeDecode for () {
    fn decode(_raw: RawValue) -> Self {}
}

impl NativeDecode for bool {
    fn decode(raw: RawValue) -> Self {
        raw != 0
    }
}

impl NativeDecode for i64 {
    fn decode(raw: RawValue) -> Self {
        raw as i64
    }
}

impl NativeDecode for RawPointer {
    fn decode(raw: RawValue) -> Self {
        RawPointer(raw)
    }
}
