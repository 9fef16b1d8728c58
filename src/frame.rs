//! LAPDm frame octets: bit-exact pack/unpack of the address, control, and
//! length octets (3GPP TS 04.06 §3), and a typed [`Frame`] built on top of
//! them.
//!
//! The address and length octets are plain contiguous bitfields, packed
//! with `modular_bitfield`. The control octet's "M" subfield is split
//! across two non-contiguous bit ranges in the wire format (TS 04.06 Table
//! 3), which a derive-based bitfield struct cannot express directly, so it
//! is encoded/decoded with the same shift-and-mask arithmetic the protocol
//! itself defines, kept in the `control` submodule below as the single
//! place that bit layout lives (SPEC_FULL.md §9 "Frame representation").

use crate::error::LapdmError;
use modular_bitfield::prelude::*;

/// Link Protocol Discriminator carried in the address octet.
#[derive(BitfieldSpecifier, Debug, Clone, Copy, PartialEq, Eq)]
#[bits = 2]
pub enum Lpd {
    /// Normal GSM signalling.
    Normal = 0,
    /// SMS cell broadcast.
    Smscb = 1,
    /// Reserved values decode but carry no defined semantics here.
    Reserved2 = 2,
    /// Reserved values decode but carry no defined semantics here.
    Reserved3 = 3,
}

/// Address octet: `EA(1) | C/R(1) | SAPI(3) | LPD(2) | spare(1)`, LSB first.
#[bitfield(bits = 8)]
#[derive(Clone, Copy)]
pub struct AddressOctet {
    pub ea: bool,
    pub cr: bool,
    #[bits = 3]
    pub sapi: B3,
    pub lpd: Lpd,
    pub spare: B1,
}

/// Service Access Point Identifier. Only 0 (signalling) and 3 (SMS) are
/// served by this engine; any other value decodes but is rejected by the
/// Entity demux (§4.2).
pub type Sapi = u8;

/// Command/response bit as carried on the wire, before mode-dependent
/// polarity is applied (§6 "Modes").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrBit {
    /// Wire value 0.
    Zero,
    /// Wire value 1.
    One,
}

/// Decoded address octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    /// Command/response bit, before mode-dependent polarity interpretation.
    pub cr: CrBit,
    /// Service access point identifier.
    pub sapi: Sapi,
    /// Link protocol discriminator.
    pub lpd: Lpd,
}

impl Address {
    /// Decode an address octet. EA must be 1 — multi-byte addressing is
    /// unsupported (§3).
    pub fn decode(byte: u8) -> Result<Self, LapdmError> {
        let raw = AddressOctet::from_bytes([byte]);
        if !raw.ea() {
            return Err(LapdmError::MultiByteAddress);
        }
        Ok(Address {
            cr: if raw.cr() { CrBit::One } else { CrBit::Zero },
            sapi: raw.sapi(),
            lpd: raw.lpd(),
        })
    }

    /// Encode into the on-wire address octet. `EA` is always 1.
    pub fn encode(self) -> u8 {
        AddressOctet::new()
            .with_ea(true)
            .with_cr(matches!(self.cr, CrBit::One))
            .with_sapi(self.sapi)
            .with_lpd(self.lpd)
            .into_bytes()[0]
    }
}

/// Length octet: `L(6) | M(1) | EL(1)`.
#[bitfield(bits = 8)]
#[derive(Clone, Copy)]
pub struct LengthOctet {
    pub el: bool,
    pub more: bool,
    #[bits = 6]
    pub length: B6,
}

/// Decoded length octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Length {
    /// Payload length in octets (0..=63).
    pub l: u8,
    /// `true` if more segments follow this one.
    pub more: bool,
}

impl Length {
    /// Decode a length octet. `EL` must be 1.
    pub fn decode(byte: u8) -> Result<Self, LapdmError> {
        let raw = LengthOctet::from_bytes([byte]);
        if !raw.el() {
            return Err(LapdmError::BufferTooShort { need: 1, got: 0 });
        }
        Ok(Length {
            l: raw.length(),
            more: raw.more(),
        })
    }

    /// Encode into the on-wire length octet. `EL` is always 1.
    pub fn encode(self) -> u8 {
        LengthOctet::new()
            .with_el(true)
            .with_more(self.more)
            .with_length(self.l)
            .into_bytes()[0]
    }
}

/// Unnumbered-frame command/response variants (3GPP TS 04.06 Table 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UVariant {
    /// Set Asynchronous Balanced Mode — request to establish.
    Sabm,
    /// Disconnected Mode — establishment refused / link already down.
    Dm,
    /// Unnumbered Information — connectionless payload.
    Ui,
    /// Disconnect — request to release.
    Disc,
    /// Unnumbered Acknowledge — establishment/release accepted.
    Ua,
}

impl UVariant {
    /// 5-bit `M` field value for this variant (TS 04.06 Table 4).
    const fn m_bits(self) -> u8 {
        match self {
            UVariant::Sabm => 0x07,
            UVariant::Dm => 0x03,
            UVariant::Ui => 0x00,
            UVariant::Disc => 0x08,
            UVariant::Ua => 0x0C,
        }
    }

    const fn from_m_bits(m: u8) -> Option<Self> {
        match m {
            0x07 => Some(UVariant::Sabm),
            0x03 => Some(UVariant::Dm),
            0x00 => Some(UVariant::Ui),
            0x08 => Some(UVariant::Disc),
            0x0C => Some(UVariant::Ua),
            _ => None,
        }
    }
}

/// Supervisory-frame variants (3GPP TS 04.06 Table 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SVariant {
    /// Receive Ready.
    Rr,
    /// Receive Not Ready — peer is busy.
    Rnr,
    /// Reject — sequence error, resend from N(R).
    Rej,
}

impl SVariant {
    const fn ss_bits(self) -> u8 {
        match self {
            SVariant::Rr => 0b00,
            SVariant::Rnr => 0b01,
            SVariant::Rej => 0b10,
        }
    }

    const fn from_ss_bits(ss: u8) -> Option<Self> {
        match ss {
            0b00 => Some(SVariant::Rr),
            0b01 => Some(SVariant::Rnr),
            0b10 => Some(SVariant::Rej),
            _ => None,
        }
    }
}

/// Bit-exact pack/unpack of the control octet. Kept separate from
/// [`AddressOctet`]/[`LengthOctet`] because the U-frame `M` field is
/// non-contiguous (TS 04.06 Table 3) and does not fit a derive-based
/// bitfield struct.
mod control {
    use super::{SVariant, UVariant};

    pub fn encode_i(nr: u8, ns: u8, p: bool) -> u8 {
        ((nr & 0x7) << 5) | ((p as u8) << 4) | ((ns & 0x7) << 1)
    }

    pub fn encode_s(nr: u8, variant: SVariant, pf: bool) -> u8 {
        ((nr & 0x7) << 5) | ((pf as u8) << 4) | (variant.ss_bits() << 2) | 0x01
    }

    pub fn encode_u(variant: UVariant, pf: bool) -> u8 {
        let m = variant.m_bits();
        (((m & 0x1c) << 3) | ((pf as u8) << 4) | ((m & 0x3) << 2) | 0x03) as u8
    }

    pub fn is_i(ctrl: u8) -> bool {
        ctrl & 0x01 == 0
    }

    pub fn is_s(ctrl: u8) -> bool {
        ctrl & 0x03 == 0x01
    }

    pub fn is_u(ctrl: u8) -> bool {
        ctrl & 0x03 == 0x03
    }

    pub fn decode_i(ctrl: u8) -> (u8, u8, bool) {
        let nr = (ctrl >> 5) & 0x7;
        let p = (ctrl >> 4) & 0x1 != 0;
        let ns = (ctrl >> 1) & 0x7;
        (nr, ns, p)
    }

    pub fn decode_s(ctrl: u8) -> (u8, Option<SVariant>, bool) {
        let nr = (ctrl >> 5) & 0x7;
        let pf = (ctrl >> 4) & 0x1 != 0;
        let ss = (ctrl >> 2) & 0x3;
        (nr, SVariant::from_ss_bits(ss), pf)
    }

    pub fn decode_u(ctrl: u8) -> (Option<UVariant>, bool) {
        let pf = (ctrl >> 4) & 0x1 != 0;
        let m = ((ctrl & 0xE0) >> 3) | ((ctrl & 0x0C) >> 2);
        (UVariant::from_m_bits(m), pf)
    }
}

/// A fully decoded LAPDm frame, independent of its on-wire octet layout.
///
/// Payload-carrying variants borrow from the caller-provided buffer; callers
/// that need to retain a frame past the call that produced it (retransmission
/// history, reassembly) copy the bytes into their own storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    /// Information frame: sequenced payload.
    I {
        /// N(S): this frame's send sequence number.
        ns: u8,
        /// N(R): next sequence number the sender expects to receive.
        nr: u8,
        /// Poll bit.
        p: bool,
        /// `true` if more segments of the same L3 message follow.
        more: bool,
        /// Frame payload.
        payload: &'a [u8],
    },
    /// Supervisory frame: acknowledgement / flow control, no payload.
    S {
        /// Variant (RR/RNR/REJ).
        variant: SVariant,
        /// N(R): next sequence number the sender expects to receive.
        nr: u8,
        /// Poll/Final bit.
        pf: bool,
    },
    /// Unnumbered frame: connection control or connectionless data.
    U {
        /// Variant (SABM/DM/UI/DISC/UA).
        variant: UVariant,
        /// Poll/Final bit.
        pf: bool,
        /// Frame payload (empty for most variants; SABM/UA may carry contention payload, UI always may).
        payload: &'a [u8],
    },
}

impl<'a> Frame<'a> {
    /// Decode an address-carrying (A/B format) frame from `addr ctrl len [payload...]`.
    pub fn decode_ab(bytes: &'a [u8]) -> Result<(Address, Frame<'a>), LapdmError> {
        if bytes.len() < 3 {
            return Err(LapdmError::BufferTooShort {
                need: 3,
                got: bytes.len(),
            });
        }
        let addr = Address::decode(bytes[0])?;
        let (frame, _) = Self::decode_ctrl_len(&bytes[1..])?;
        Ok((addr, frame))
    }

    /// Decode a control+length(+payload) tail, shared by A/B and B4 formats
    /// (which differ only in what precedes the control octet).
    pub fn decode_ctrl_len(bytes: &'a [u8]) -> Result<(Frame<'a>, usize), LapdmError> {
        if bytes.len() < 2 {
            return Err(LapdmError::BufferTooShort {
                need: 2,
                got: bytes.len(),
            });
        }
        let ctrl = bytes[0];
        let len = Length::decode(bytes[1])?;
        let payload_end = 2 + len.l as usize;
        if bytes.len() < payload_end {
            return Err(LapdmError::BufferTooShort {
                need: payload_end,
                got: bytes.len(),
            });
        }
        let payload = &bytes[2..payload_end];

        let frame = if control::is_i(ctrl) {
            let (nr, ns, p) = control::decode_i(ctrl);
            Frame::I {
                ns,
                nr,
                p,
                more: len.more,
                payload,
            }
        } else if control::is_s(ctrl) {
            let (nr, variant, pf) = control::decode_s(ctrl);
            let variant = variant.ok_or(LapdmError::UnknownControl(ctrl))?;
            Frame::S { variant, nr, pf }
        } else {
            let (variant, pf) = control::decode_u(ctrl);
            let variant = variant.ok_or(LapdmError::UnknownControl(ctrl))?;
            Frame::U {
                variant,
                pf,
                payload,
            }
        };
        Ok((frame, payload_end))
    }

    /// Encode this frame's control+length+payload (no address octet) into `out`.
    /// Returns the number of octets written.
    pub fn encode_ctrl_len(&self, out: &mut [u8]) -> Result<usize, LapdmError> {
        let need = 2 + self.payload().len();
        if out.len() < need {
            return Err(LapdmError::BufferTooShort {
                need,
                got: out.len(),
            });
        }
        match *self {
            Frame::I {
                ns, nr, p, more, payload,
            } => {
                out[0] = control::encode_i(nr, ns, p);
                out[1] = Length {
                    l: payload.len() as u8,
                    more,
                }
                .encode();
                out[2..2 + payload.len()].copy_from_slice(payload);
            }
            Frame::S { variant, nr, pf } => {
                out[0] = control::encode_s(nr, variant, pf);
                out[1] = Length { l: 0, more: false }.encode();
            }
            Frame::U { variant, pf, payload } => {
                out[0] = control::encode_u(variant, pf);
                out[1] = Length {
                    l: payload.len() as u8,
                    more: false,
                }
                .encode();
                out[2..2 + payload.len()].copy_from_slice(payload);
            }
        }
        Ok(need)
    }

    /// Encode a full A/B-format frame (address + control + length + payload) into `out`.
    pub fn encode_ab(&self, addr: Address, out: &mut [u8]) -> Result<usize, LapdmError> {
        if out.is_empty() {
            return Err(LapdmError::BufferTooShort { need: 1, got: 0 });
        }
        out[0] = addr.encode();
        let n = self.encode_ctrl_len(&mut out[1..])?;
        Ok(1 + n)
    }

    /// This frame's payload slice (empty for S-frames).
    pub fn payload(&self) -> &'a [u8] {
        match *self {
            Frame::I { payload, .. } => payload,
            Frame::S { .. } => &[],
            Frame::U { payload, .. } => payload,
        }
    }

    /// The poll/final bit, uniformly named across all three formats.
    pub fn poll_final(&self) -> bool {
        match *self {
            Frame::I { p, .. } => p,
            Frame::S { pf, .. } => pf,
            Frame::U { pf, .. } => pf,
        }
    }
}
