//! Error types for the LAPDm engine.
//!
//! Two distinct surfaces, per 3GPP TS 04.06 §7 (peer protocol violations vs.
//! local programming errors): [`LapdmError`] is returned synchronously by
//! entry points when the *caller* misused the API; [`MdlCause`] is payload
//! carried by an `ERROR.ind` primitive when the *peer* violated the
//! protocol and the state machine otherwise proceeds normally.

use thiserror::Error;

/// Programming error returned synchronously by a library entry point.
///
/// These never produce an L3 indication — the datalink state is left
/// unchanged and the caller gets `Err` back directly.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum LapdmError {
    /// A primitive or frame buffer was shorter than its fixed header.
    #[error("buffer too short: need at least {need} octets, got {got}")]
    BufferTooShort {
        /// Minimum octets required to decode the header.
        need: usize,
        /// Octets actually available.
        got: usize,
    },
    /// Address octet had `EA=0`, implying an unsupported multi-byte address.
    #[error("multi-byte address (EA=0) is not supported")]
    MultiByteAddress,
    /// Control octet did not match any known U/S/I format.
    #[error("control octet 0x{0:02x} does not decode to a known frame format")]
    UnknownControl(u8),
    /// SAPI carried by a frame or primitive is not one this entity serves.
    #[error("unsupported SAPI {0}")]
    UnsupportedSapi(u8),
    /// An RSL/RLL primitive carried a discriminator this engine does not recognize.
    #[error("unknown RSL primitive discriminator {0}")]
    UnknownPrimitive(u8),
    /// Caller addressed a link-id / channel-number combination with no matching Entity.
    #[error("no entity routes link_id 0x{0:02x}")]
    NoSuchEntity(u8),
}

/// Cause code carried by an `ERROR.ind` (MDL-ERROR) primitive.
///
/// Mirrors `RLL_CAUSE_*` in 3GPP TS 04.06 Annex; constructing one of these
/// and handing it to L3 is an ordinary state-machine action, not a Rust
/// error — `MdlCause` intentionally does not implement [`std::error::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum MdlCause {
    /// Received frame format is not implemented (e.g. Bter).
    FrameNotImplemented,
    /// Frame addressed a SAPI this entity does not serve.
    InvalidSapi,
    /// U-frame carried an incorrect parameter (bad length/M-bit for SABM/DISC/UA/DM).
    UFrameIncorrectParameter,
    /// S-frame carried an incorrect parameter (non-zero length or M-bit set).
    SFrameIncorrectParameter,
    /// I-frame length is inconsistent with N201 and the M-bit.
    IFrameIncorrectLength,
    /// I-frame length/M-bit combination is invalid.
    IFrameIncorrectMbits,
    /// SABM carried a payload larger than fits in one segment.
    SabmInfoNotAll,
    /// Received an unsolicited DM while no link was being established.
    UnsolicitedDmResponse,
    /// Received an unsolicited DM while multiple-frame established.
    UnsolicitedDmResponseMultiFrame,
    /// Received an unsolicited UA.
    UnsolicitedUaResponse,
    /// Received an unsolicited supervisory response.
    UnsolicitedSupervisoryResponse,
    /// T200 expired N200 times without a valid response.
    T200Expired,
    /// N(R) fell outside `[V(A), V(S)]`.
    SequenceError,
}
