//! Pull code — integer identifier for a category of pullable metric
//!
//! Every [`PullSource`](crate::PullSource) owns exactly one code, and every
//! receiver subscribes by code. Codes are plain integers on the wire between
//! processes, so the newtype stays a thin wrapper.

use std::fmt;

/// Identifier for a class of on-demand metric.
///
/// Maps 1:1 to a registered `PullSource`. Human-readable metric names are
/// resolved to codes through the engine's source registry; resolution returns
/// `Option<PullCode>` — there is no in-band "not found" integer.
///
/// # Example
///
/// ```
/// use nouto_core::PullCode;
///
/// const KERNEL_WAKELOCKS: PullCode = PullCode(20);
/// assert_eq!(KERNEL_WAKELOCKS.to_string(), "20");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PullCode(pub i32);

impl PullCode {
    /// Raw integer value of this code
    #[inline]
    pub fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for PullCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for PullCode {
    fn from(v: i32) -> Self {
        Self(v)
    }
}

impl From<PullCode> for i32 {
    fn from(code: PullCode) -> Self {
        code.0
    }
}
