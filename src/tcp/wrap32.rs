//! Conversion between 32-bit wrapping sequence numbers and 64-bit absolute
//! stream indices.

/// A 32-bit value interpreted as a point on the circular TCP sequence space.
///
/// An absolute index `n` maps onto the circle as `zero_point + n mod 2^32`;
/// going the other way is ambiguous, so [`unwrap`](Self::unwrap) picks the
/// preimage closest to a caller-supplied checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Wrap32(u32);

impl Wrap32 {
    const WINDOW: u64 = 1 << 32;

    pub const fn new(raw_value: u32) -> Self {
        Self(raw_value)
    }

    /// A random sequence number, for picking connection ISNs.
    pub fn random() -> Self {
        Self(rand::random())
    }

    pub const fn raw_value(self) -> u32 {
        self.0
    }

    /// Projects an absolute index onto the sequence circle.
    pub fn wrap(n: u64, zero_point: Wrap32) -> Wrap32 {
        Wrap32(zero_point.0.wrapping_add(n as u32))
    }

    /// The absolute index that projects to `self` and lies closest to
    /// `checkpoint`. Ties go to the smaller candidate; negative candidates
    /// are excluded, so near zero the smallest nonnegative preimage wins.
    pub fn unwrap(self, zero_point: Wrap32, checkpoint: u64) -> u64 {
        let offset = u64::from(self.0.wrapping_sub(zero_point.0));
        // The candidate sharing the checkpoint's 2^32 window, then the
        // windows directly below and above it.
        let anchor = (checkpoint & !(Self::WINDOW - 1)) + offset;
        let candidates = [
            anchor.checked_sub(Self::WINDOW),
            Some(anchor),
            anchor.checked_add(Self::WINDOW),
        ];

        let mut best: Option<u64> = None;
        for candidate in candidates.into_iter().flatten() {
            let improves = match best {
                None => true,
                Some(current) => candidate.abs_diff(checkpoint) < current.abs_diff(checkpoint),
            };
            if improves {
                best = Some(candidate);
            }
        }
        best.unwrap_or(anchor)
    }
}
