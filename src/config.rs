//! Per-channel-type protocol parameters.
//!
//! 3GPP TS 04.06 hard-codes N201 and the TIMER_RECOV N200 limit per channel
//! type in a handful of places. This module is the single lookup table the
//! rest of the crate uses instead (SPEC_FULL.md §5c / §9 open question (c)).

use core::time::Duration;

/// Logical radio channel category a Datalink/Entity pair is bound to.
///
/// This is the consolidated replacement for the channel-number-based
/// hard-coding the original keeps re-deriving in several call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Slow Associated Control Channel.
    Sacch,
    /// Stand-alone Dedicated Control Channel.
    Sdcch,
    /// Fast Associated Control Channel, full rate.
    FacchFull,
    /// Fast Associated Control Channel, half rate.
    FacchHalf,
}

/// Frame format an inbound/outbound block is carried in, per §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// Standard format A or B (address + control + length + payload).
    AB,
    /// Broadcast/paging format: single UI control octet, no address octet.
    Bbis,
    /// Short header format. Not implemented upstream; decodes are rejected.
    Bter,
    /// SACCH format, prefixed by a two-octet L1 header (tx power, timing advance).
    B4,
}

/// N201: maximum payload octets per frame for a given channel kind and format.
///
/// See SPEC_FULL.md §6. Bter is wired in as a recognized format (so framing
/// code does not have to special-case its absence) but is not implemented;
/// see [`FrameFormat::Bter`].
pub const fn n201(kind: ChannelKind, format: FrameFormat) -> u8 {
    match (kind, format) {
        (_, FrameFormat::Bbis) => 23,
        (ChannelKind::Sacch, FrameFormat::B4) => 19,
        (ChannelKind::Sacch, FrameFormat::AB) => 18,
        (ChannelKind::Sacch, FrameFormat::Bter) => 21,
        (ChannelKind::Sdcch, FrameFormat::AB)
        | (ChannelKind::FacchFull, FrameFormat::AB)
        | (ChannelKind::FacchHalf, FrameFormat::AB) => 20,
        (ChannelKind::Sdcch, FrameFormat::Bter)
        | (ChannelKind::FacchFull, FrameFormat::Bter)
        | (ChannelKind::FacchHalf, FrameFormat::Bter) => 23,
        (_, FrameFormat::B4) => 19,
    }
}

/// N200 during link establishment and release, per SPEC_FULL.md §5/§8 S6.
pub const N200_ESTABLISH_RELEASE: u8 = 5;

/// N200 while in TIMER_RECOV, which depends on channel kind.
pub const fn n200_timer_recovery(kind: ChannelKind) -> u8 {
    match kind {
        ChannelKind::Sacch => 5,
        ChannelKind::Sdcch => 23,
        ChannelKind::FacchFull => 34,
        ChannelKind::FacchHalf => 29,
    }
}

/// T200: the retransmission timer duration, fixed at 1 second for every SAPI/kind.
pub const fn t200() -> Duration {
    Duration::from_secs(1)
}

/// Fill octet used to pad a frame out to N201 (3GPP TS 04.06 §5.4.1.4).
pub const FILL_OCTET: u8 = 0x2B;

/// Reassembly buffer bound (invariant I5).
pub const MAX_REASSEMBLY_OCTETS: usize = 200;

/// Sliding window size `k`; fixed at 1 for every SAPI in this profile.
pub const WINDOW_SIZE: u8 = 1;
