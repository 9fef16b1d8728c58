//! RSL/RLL primitives (L3 boundary) and PH-SAP primitives (L1 boundary).
//!
//! Named and shaped after the `*_req`/`*_ind`/`*_conf` primitive tables of
//! 3GPP TS 04.06 §5 rather than a generic "event" enum, mirroring the
//! `DlModeInd`/`DlReadWriteInd`-style SAP traits the teacher uses for its own
//! service primitives (SPEC_FULL.md §5c/§9 "Primitives").

use crate::error::MdlCause;
use heapless::Vec;

/// Maximum L3 payload this engine ever buffers in a single primitive
/// (matches [`crate::config::MAX_REASSEMBLY_OCTETS`]).
pub const MAX_L3_PAYLOAD: usize = crate::config::MAX_REASSEMBLY_OCTETS;

/// An L3 payload buffer, bounded the same way the reassembly buffer is.
pub type Payload = Vec<u8, MAX_L3_PAYLOAD>;

/// Release mode carried by `REL.req` (3GPP TS 04.06 §5.4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseMode {
    /// Local release: drop to IDLE immediately, no DISC exchange.
    Local,
    /// Normal release: send DISC and wait for UA/DM.
    Normal,
}

/// Downward RSL/RLL primitives: L3 to Channel/Entity/Datalink.
#[derive(Debug, Clone)]
pub enum RllRequest {
    /// Establish a multiple-frame link, optionally with contention-resolution payload.
    Establish {
        /// SAPI this request targets.
        sapi: u8,
        /// Contention-resolution payload carried in the SABM, if any.
        payload: Option<Payload>,
    },
    /// Send acknowledged data on an established link.
    Data {
        /// SAPI this request targets.
        sapi: u8,
        /// L3 message to segment and transmit.
        payload: Payload,
    },
    /// Send connectionless data (Bbis/UI).
    UnitData {
        /// SAPI this request targets.
        sapi: u8,
        /// L3 message payload.
        payload: Payload,
    },
    /// Suspend an established link (SAPI 0 only).
    Suspend {
        /// SAPI this request targets; must be 0.
        sapi: u8,
    },
    /// Resume a suspended link, optionally with new contention payload.
    Resume {
        /// SAPI this request targets.
        sapi: u8,
        /// Contention-resolution payload carried in the new SABM, if any.
        payload: Option<Payload>,
    },
    /// Reconnect: same as resume but discards any suspended state first.
    Reconnect {
        /// SAPI this request targets.
        sapi: u8,
        /// Contention-resolution payload carried in the new SABM, if any.
        payload: Option<Payload>,
    },
    /// Release an established or establishing link.
    Release {
        /// SAPI this request targets.
        sapi: u8,
        /// Local vs. normal release.
        mode: ReleaseMode,
    },
    /// Request a channel on the RACH (common control channel, SAPI-less).
    ChannelRequired {
        /// Establishment cause / random reference octet sent on RACH.
        ra: u8,
    },
}

/// Upward RSL/RLL primitives: Channel/Entity/Datalink to L3.
#[derive(Debug, Clone)]
pub enum RllIndication {
    /// Link establishment completed, peer-initiated or contention-resolved.
    Establish {
        /// SAPI the link was established on.
        sapi: u8,
        /// Payload carried by the peer's SABM, if any (contention resolution).
        payload: Option<Payload>,
    },
    /// Confirmation of our own `EST.req`.
    EstablishConfirm {
        /// SAPI the link was established on.
        sapi: u8,
    },
    /// Acknowledged data delivered from the peer, fully reassembled.
    Data {
        /// SAPI the data arrived on.
        sapi: u8,
        /// Reassembled L3 message.
        payload: Payload,
        /// Timing-advance IE, present when this is a SACCH I-frame.
        timing_advance: Option<u8>,
        /// MS-power IE, present when this is a SACCH I-frame.
        ms_power: Option<u8>,
    },
    /// Connectionless data delivered from the peer (Bbis/UI).
    UnitData {
        /// SAPI the data arrived on (forced 0 for Bbis).
        sapi: u8,
        /// L3 message payload.
        payload: Payload,
        /// Timing-advance IE, present when this is a SACCH UI frame.
        timing_advance: Option<u8>,
        /// MS-power IE, present when this is a SACCH UI frame.
        ms_power: Option<u8>,
    },
    /// Link released, peer-initiated, local, or after N200 exhaustion.
    Release {
        /// SAPI the link was released on.
        sapi: u8,
    },
    /// Confirmation of our own `REL.req`.
    ReleaseConfirm {
        /// SAPI the link was released on.
        sapi: u8,
    },
    /// Confirmation of our own `SUSP.req`.
    SuspendConfirm {
        /// SAPI the link was suspended on.
        sapi: u8,
    },
    /// A peer protocol violation or local timeout was observed; the state
    /// machine has already taken its recovery action.
    Error {
        /// SAPI the violation was observed on.
        sapi: u8,
        /// Cause code.
        cause: MdlCause,
    },
    /// RACH request was granted; carries the decomposed frame-number IE.
    ChannelConfirm {
        /// T1 component (FN div 51 mod 32).
        t1: u8,
        /// T2 component (FN mod 26).
        t2: u8,
        /// T3 component (FN mod 51).
        t3: u8,
    },
}

/// Downward PH-SAP primitives: Entity/Channel to L1.
#[derive(Debug, Clone)]
pub enum PhRequest<'a> {
    /// Transmit one already-framed block on the named channel/link.
    Data {
        /// Physical channel number.
        chan_nr: u8,
        /// Link identifier (SACCH bit + SAPI).
        link_id: u8,
        /// Complete frame octets, already padded to N201.
        block: &'a [u8],
    },
    /// Transmit a RACH burst.
    Rach {
        /// Random-access reference octet.
        ra: u8,
    },
    /// Nothing to send this slot; emit the idle fill frame.
    EmptyFrame {
        /// Physical channel number.
        chan_nr: u8,
        /// Link identifier.
        link_id: u8,
    },
}

/// Upward PH-SAP primitives: L1 to Entity/Channel.
#[derive(Debug, Clone)]
pub enum PhIndication<'a> {
    /// A block was received on the named channel/link.
    Data {
        /// Physical channel number.
        chan_nr: u8,
        /// Link identifier.
        link_id: u8,
        /// Raw received octets.
        block: &'a [u8],
    },
    /// L1 is ready to accept the next outbound block.
    ReadyToSend {
        /// Physical channel number.
        chan_nr: u8,
        /// Link identifier.
        link_id: u8,
    },
    /// A RACH burst was received (BTS side).
    Rach {
        /// Random-access reference octet.
        ra: u8,
        /// Frame number the burst arrived on.
        fn_: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_request_carries_mode() {
        let req = RllRequest::Release {
            sapi: 0,
            mode: ReleaseMode::Local,
        };
        match req {
            RllRequest::Release { mode, .. } => assert_eq!(mode, ReleaseMode::Local),
            _ => panic!("expected Release"),
        }
    }
}
