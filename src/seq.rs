//! Cyclic mod-8 sequence number arithmetic.
//!
//! N(S), N(R), V(A), V(S) and V(R) all live in `0..8` and wrap. Every place
//! that needs to add, subtract, or order them goes through here instead of
//! open-coding `% 8` — see 3GPP TS 04.06 §3 and the reimplementation note in
//! SPEC_FULL.md §9 ("Cyclic sequence arithmetic").

/// The modulus all LAPDm sequence numbers live in.
pub const MODULUS: u8 = 8;

/// Add `delta` to `n`, wrapping mod 8.
pub const fn add(n: u8, delta: u8) -> u8 {
    (n + delta) % MODULUS
}

/// `a - b` mod 8, always in `0..8`.
pub const fn diff(a: u8, b: u8) -> u8 {
    (a + MODULUS - (b % MODULUS)) % MODULUS
}

/// Window-membership check: is `n` in the half-open cyclic range `[lo, lo+len)`?
///
/// Used both to validate an incoming N(R) against `[V(A), V(S)]` and to
/// guard the sender against exceeding the window size `k`.
pub const fn in_window(n: u8, lo: u8, len: u8) -> bool {
    diff(n, lo) < len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_wraps() {
        assert_eq!(add(6, 3), 1);
        assert_eq!(add(0, 0), 0);
        assert_eq!(add(7, 1), 0);
    }

    #[test]
    fn diff_wraps() {
        assert_eq!(diff(1, 6), 3);
        assert_eq!(diff(6, 1), 5);
        assert_eq!(diff(3, 3), 0);
    }

    #[test]
    fn window_membership() {
        // V(A)=5, k=1: only N(R)=5 or 6 are valid acknowledgements of [V(A), V(S)] with V(S)=6.
        assert!(in_window(5, 5, 2));
        assert!(in_window(6, 5, 2));
        assert!(!in_window(7, 5, 2));
        // wrap-around case
        assert!(in_window(0, 7, 2));
        assert!(!in_window(1, 7, 2));
    }
}
