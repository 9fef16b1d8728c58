//! Channel: the pair of Entities (DCCH, ACCH) bound to one dedicated radio
//! connection, plus RACH/channel-request handling.
//!
//! Grounded on `lapdm_channel_*` in the original C implementation for the
//! DCCH/ACCH pairing, reset, and mode-selection behavior, and on 3GPP TS
//! 05.02 §4.3 for the frame-number decomposition CHAN_CONF carries.

use crate::config::{ChannelKind, FrameFormat};
use crate::entity::Entity;
use crate::frame::CrBit;
use crate::primitives::{PhIndication, PhRequest, RllIndication};
use crate::timer::Scheduler;

/// Bit of the link identifier octet that selects the SACCH (ACCH) entity
/// over the dedicated control channel entity, per the conventional GSM Abis
/// link-identifier layout (3GPP TS 08.58 §9.3.2); reproduced here as the
/// single place that bit is interpreted.
pub const ACCH_LINK_BIT: u8 = 0x40;

/// Station role, which determines C/R polarity (SPEC_FULL.md §6 "Modes").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Mobile station.
    Ms,
    /// Base transceiver station.
    Bts,
}

impl Mode {
    fn polarity(self) -> (CrBit, CrBit) {
        match self {
            Mode::Ms => (CrBit::Zero, CrBit::One),
            Mode::Bts => (CrBit::One, CrBit::Zero),
        }
    }
}

/// GSM frame number decomposed into its three hyperframe counters (3GPP TS
/// 05.02 §4.3): `T1 = FN div 51 mod 32`, `T2 = FN mod 26`, `T3 = FN mod 51`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameNumber {
    /// FN div 51 mod 32.
    pub t1: u8,
    /// FN mod 26.
    pub t2: u8,
    /// FN mod 51.
    pub t3: u8,
}

impl FrameNumber {
    /// Decompose a raw GSM frame number.
    pub fn decompose(fn_: u32) -> Self {
        FrameNumber {
            t1: ((fn_ / 51) % 32) as u8,
            t2: (fn_ % 26) as u8,
            t3: (fn_ % 51) as u8,
        }
    }
}

/// One dedicated radio connection: a DCCH entity and an ACCH entity sharing
/// a mode and a timer scheduler.
pub struct Channel {
    dcch: Entity,
    acch: Entity,
    mode: Mode,
    sched: Scheduler,
    /// Random-access reference awaiting a PH-RACH.req slot. Only one CHAN_RQD
    /// can be outstanding at a time (SPEC_FULL.md §4.3).
    rach_pending: Option<u8>,
}

impl Channel {
    /// Build a Channel bound to `chan_nr`, initially in `mode`.
    pub fn new(chan_nr: u8, mode: Mode) -> Self {
        let mut dcch = Entity::new(0, chan_nr, ChannelKind::Sdcch, FrameFormat::AB);
        let mut acch = Entity::new(1, chan_nr, ChannelKind::Sacch, FrameFormat::B4);
        let mut sched = Scheduler::new();
        let (cr_command, cr_response) = mode.polarity();
        dcch.set_polarity(cr_command, cr_response, &mut sched);
        acch.set_polarity(cr_command, cr_response, &mut sched);
        Channel {
            dcch,
            acch,
            mode,
            sched,
            rach_pending: None,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// DCCH entity (SDCCH or FACCH, by deployment).
    pub fn dcch(&mut self) -> &mut Entity {
        &mut self.dcch
    }

    /// ACCH entity (SACCH).
    pub fn acch(&mut self) -> &mut Entity {
        &mut self.acch
    }

    /// Timer scheduler shared by both entities.
    pub fn scheduler(&mut self) -> &mut Scheduler {
        &mut self.sched
    }

    /// Route an inbound PH-DATA.ind to DCCH or ACCH by the link id's SACCH
    /// bit (SPEC_FULL.md §4.3).
    pub fn entity_for_link(&mut self, link_id: u8) -> &mut Entity {
        if link_id & ACCH_LINK_BIT != 0 {
            &mut self.acch
        } else {
            &mut self.dcch
        }
    }

    /// Reset both entities' Datalinks to IDLE unconditionally (channel
    /// release/reassignment).
    pub fn reset(&mut self) {
        self.dcch.reset(&mut self.sched);
        self.acch.reset(&mut self.sched);
    }

    /// Reprogram C/R polarity for both entities and force every Datalink
    /// back to IDLE — a mode change mid-connection has no defined recovery
    /// path in TS 04.06.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        let (cr_command, cr_response) = mode.polarity();
        self.dcch.set_polarity(cr_command, cr_response, &mut self.sched);
        self.acch.set_polarity(cr_command, cr_response, &mut self.sched);
    }

    /// Handle a CHAN_RQD primitive by queuing its random-access reference
    /// for the next PH-RACH.req slot (SPEC_FULL.md §4.3). A new request
    /// replaces whatever reference was still pending.
    pub fn channel_required(&mut self, ra: u8) {
        self.rach_pending = Some(ra);
    }

    /// Dequeue the pending PH-RACH.req, if a CHAN_RQD is waiting to go out.
    pub fn next_rach_request(&mut self) -> Option<PhRequest<'static>> {
        self.rach_pending.take().map(|ra| PhRequest::Rach { ra })
    }

    /// Handle the `PhIndication::Rach` L1 delivers for our outstanding
    /// request, carrying the frame number the burst was granted on, and
    /// build the resulting `CHAN_CONF` indication. Returns `None` for any
    /// other `PhIndication` variant.
    pub fn handle_ph_indication(&mut self, ind: &PhIndication) -> Option<RllIndication> {
        match ind {
            PhIndication::Rach { fn_, .. } => Some(Self::chan_conf(*fn_)),
            _ => None,
        }
    }

    /// Build the `CHAN_CONF` indication carrying the decomposed frame
    /// number, in response to a granted RACH request.
    pub fn chan_conf(frame_number: u32) -> RllIndication {
        let fn_ = FrameNumber::decompose(frame_number);
        RllIndication::ChannelConfirm {
            t1: fn_.t1,
            t2: fn_.t2,
            t3: fn_.t3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_number_decomposition() {
        // FN=0: start of hyperframe.
        assert_eq!(FrameNumber::decompose(0), FrameNumber { t1: 0, t2: 0, t3: 0 });
        // FN=51: one superframe (26-frame) cycle of T1 into the hyperframe.
        let fn51 = FrameNumber::decompose(51);
        assert_eq!(fn51.t1, 1);
        assert_eq!(fn51.t2, 51 % 26);
        assert_eq!(fn51.t3, 0);
    }

    #[test]
    fn link_routing_honors_sacch_bit() {
        let mut chan = Channel::new(0, Mode::Ms);
        let dcch_ptr = chan.entity_for_link(0x00) as *const Entity;
        let acch_ptr = chan.entity_for_link(ACCH_LINK_BIT) as *const Entity;
        assert_ne!(dcch_ptr, acch_ptr);
    }

    #[test]
    fn channel_required_round_trips_through_rach_to_chan_conf() {
        let mut chan = Channel::new(0, Mode::Ms);
        assert!(chan.next_rach_request().is_none());

        chan.channel_required(0x42);
        match chan.next_rach_request() {
            Some(PhRequest::Rach { ra }) => assert_eq!(ra, 0x42),
            other => panic!("expected a queued RACH request, got {other:?}"),
        }
        // Consumed: nothing left to send.
        assert!(chan.next_rach_request().is_none());

        let rach = PhIndication::Rach { ra: 0x42, fn_: 51 };
        match chan.handle_ph_indication(&rach) {
            Some(RllIndication::ChannelConfirm { t1, t2, t3 }) => {
                assert_eq!(t1, 1);
                assert_eq!(t2, 51 % 26);
                assert_eq!(t3, 0);
            }
            other => panic!("expected ChannelConfirm, got {other:?}"),
        }
    }

    #[test]
    fn non_rach_indication_yields_no_channel_confirm() {
        let mut chan = Channel::new(0, Mode::Ms);
        let ind = PhIndication::ReadyToSend { chan_nr: 0, link_id: 0 };
        assert!(chan.handle_ph_indication(&ind).is_none());
    }

    #[test]
    fn channel_required_replaces_pending_reference() {
        let mut chan = Channel::new(0, Mode::Ms);
        chan.channel_required(0x01);
        chan.channel_required(0x02);
        match chan.next_rach_request() {
            Some(PhRequest::Rach { ra }) => assert_eq!(ra, 0x02),
            other => panic!("expected the most recent reference, got {other:?}"),
        }
    }
}
