//! Generic register abstraction for decoding raw MSR values

/// Trait for register layouts that can be converted to/from raw MSR values
///
/// RAPL status and info registers are read-only from the point of view of
/// this crate; `to_msr_value` exists so callers can build synthetic register
/// contents (fixtures, simulators) that decode back to the same layout.
///
/// # Example
///
/// ```ignore
/// use powermon_raw::register::RegisterLayout;
///
/// #[derive(Debug, Default)]
/// struct Status {
///     ready: bool,
///     count: u8,
/// }
///
/// impl RegisterLayout for Status {
///     fn to_msr_value(&self) -> u64 {
///         (if self.ready { 1 } else { 0 }) | ((self.count as u64) << 8)
///     }
///
///     fn from_msr_value(value: u64) -> Self {
///         Self {
///             ready: (value & 1) != 0,
///             count: ((value >> 8) & 0xFF) as u8,
///         }
///     }
/// }
/// ```
pub trait RegisterLayout: Sized {
    /// Convert this register layout to a raw MSR value
    fn to_msr_value(&self) -> u64;

    /// Parse a raw MSR value into this register layout
    fn from_msr_value(value: u64) -> Self;
}

/// Extract `width` bits of `value` starting at bit `offset`
#[inline]
pub const fn bits(value: u64, offset: u32, width: u32) -> u64 {
    (value >> offset) & ((1u64 << width) - 1)
}
