//! Per-SAPI LAPDm state machine.
//!
//! Grounded on `lapdm_datalink` / `lapdm_dl_*` in the original C
//! implementation for state/sequence semantics, and on the teacher's
//! `dl::mode_handler`/`dl::message_handler` pair for the
//! `(state, event) -> (state', action)` dispatch-per-state idiom (one
//! method per state, matched on the incoming event).

use crate::config::{self, ChannelKind, FrameFormat};
use crate::error::MdlCause;
use crate::frame::{Address, CrBit, Frame, Lpd, SVariant, UVariant};
use crate::primitives::{Payload, ReleaseMode, RllIndication, RllRequest};
use crate::seq;
use crate::timer::{Scheduler, Ticks, TimerId};
use heapless::{Deque, Vec};
use log::{debug, info, trace, warn};

/// Maximum encoded frame size this engine ever builds: 1 address + 1
/// control + 1 length + 23 payload octets (the largest N201, Bbis).
pub const MAX_FRAME_LEN: usize = 26;

/// Encoded frame bytes, address octet through payload, unpadded.
pub type FrameBytes = Vec<u8, MAX_FRAME_LEN>;

const SEND_QUEUE_CAP: usize = 4;
const TX_QUEUE_CAP: usize = 4;
const MAX_IND: usize = 2;

/// Indications produced by a single call into a Datalink.
pub type Indications = Vec<RllIndication, MAX_IND>;

/// LAPDm link states (3GPP TS 04.06 §4, SPEC_FULL.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DlState {
    /// No connection.
    Idle,
    /// SABM sent, awaiting UA.
    SabmSent,
    /// Multiple-frame established.
    MfEst,
    /// T200 expired in MF_EST; retransmitting and awaiting an F=1 response.
    TimerRecov,
    /// DISC sent, awaiting UA/DM.
    DiscSent,
}

/// Saved per-link context: which physical channel/frame-format this
/// Datalink rides on, and the N201 that implies.
#[derive(Debug, Clone, Copy)]
pub struct LinkCtx {
    /// Physical channel number.
    pub chan_nr: u8,
    /// Link identifier (SACCH bit + SAPI) as seen by L1.
    pub link_id: u8,
    /// Channel kind, selects the N201/N200 lookup.
    pub kind: ChannelKind,
    /// Frame format this link exchanges.
    pub format: FrameFormat,
}

impl LinkCtx {
    /// Maximum I-frame payload for this link.
    pub fn n201(&self) -> u8 {
        config::n201(self.kind, self.format)
    }
}

struct SendBuffer {
    payload: Payload,
    consumed: usize,
}

fn t200_ticks() -> Ticks {
    config::t200().as_millis() as Ticks
}

/// One SAPI's independent instance of the LAPDm state machine.
pub struct Datalink {
    sapi: u8,
    timer_id: TimerId,
    mctx: LinkCtx,
    cr_command: CrBit,
    cr_response: CrBit,

    state: DlState,
    v_s: u8,
    v_a: u8,
    v_r: u8,
    own_busy: bool,
    peer_busy: bool,
    seq_err_cond: bool,
    retrans_ctr: u8,

    tx_hist: [Option<FrameBytes>; 8],
    send_queue: Deque<Payload, SEND_QUEUE_CAP>,
    send_buffer: Option<SendBuffer>,
    rcv_buffer: Payload,
    tx_queue: Deque<FrameBytes, TX_QUEUE_CAP>,
}

impl Datalink {
    /// Build a Datalink for `sapi`, bound to `mctx`, initially polarized for
    /// MS mode (`set_polarity` reprograms this on mode change).
    pub fn new(sapi: u8, timer_id: TimerId, mctx: LinkCtx) -> Self {
        Datalink {
            sapi,
            timer_id,
            mctx,
            cr_command: CrBit::Zero,
            cr_response: CrBit::One,
            state: DlState::Idle,
            v_s: 0,
            v_a: 0,
            v_r: 0,
            own_busy: false,
            peer_busy: false,
            seq_err_cond: false,
            retrans_ctr: 0,
            tx_hist: Default::default(),
            send_queue: Deque::new(),
            send_buffer: None,
            rcv_buffer: Payload::new(),
            tx_queue: Deque::new(),
        }
    }

    /// SAPI this Datalink serves.
    pub fn sapi(&self) -> u8 {
        self.sapi
    }

    /// Current state (test/diagnostic visibility).
    pub fn state(&self) -> DlState {
        self.state
    }

    /// Current `(V(S), V(A), V(R))`, for invariant checks.
    pub fn sequence(&self) -> (u8, u8, u8) {
        (self.v_s, self.v_a, self.v_r)
    }

    /// Reprogram command/response C/R polarity (MS vs BTS, SPEC_FULL.md §6
    /// "Modes") and force back to IDLE — a mode change mid-connection has no
    /// defined recovery path in TS 04.06.
    pub fn set_polarity(&mut self, cr_command: CrBit, cr_response: CrBit, sched: &mut Scheduler) {
        self.cr_command = cr_command;
        self.cr_response = cr_response;
        self.reset(sched);
    }

    /// Force this link back to IDLE and release every buffer (invariant I2).
    pub fn reset(&mut self, sched: &mut Scheduler) {
        sched.cancel(self.timer_id);
        self.flush();
        self.state = DlState::Idle;
        self.v_s = 0;
        self.v_a = 0;
        self.v_r = 0;
        self.own_busy = false;
        self.peer_busy = false;
        self.seq_err_cond = false;
        self.retrans_ctr = 0;
    }

    fn flush(&mut self) {
        for slot in self.tx_hist.iter_mut() {
            *slot = None;
        }
        self.tx_queue.clear();
        self.send_queue.clear();
        self.send_buffer = None;
        self.rcv_buffer.clear();
    }

    /// Next outbound frame ready for L1, if any (round-robin dequeue point
    /// for [`crate::entity::Entity`]).
    pub fn dequeue_tx(&mut self) -> Option<FrameBytes> {
        self.tx_queue.pop_front()
    }

    /// Is there an outbound frame waiting?
    pub fn has_tx(&self) -> bool {
        !self.tx_queue.is_empty()
    }

    // ---- outbound frame construction -----------------------------------

    fn encode_and_queue(&mut self, frame: Frame<'_>, cr: CrBit, hist_slot: Option<u8>) {
        let addr = Address {
            cr,
            sapi: self.sapi,
            lpd: Lpd::Normal,
        };
        let mut buf = [0u8; MAX_FRAME_LEN];
        let n = match frame.encode_ab(addr, &mut buf) {
            Ok(n) => n,
            Err(e) => {
                warn!("sapi {}: failed to encode outbound frame: {e}", self.sapi);
                return;
            }
        };
        let bytes = FrameBytes::from_slice(&buf[..n]).unwrap_or_default();
        trace!("sapi {} tx {:02x?}", self.sapi, bytes.as_slice());
        if let Some(idx) = hist_slot {
            self.tx_hist[idx as usize] = Some(bytes.clone());
        }
        let _ = self.tx_queue.push_back(bytes);
    }

    fn send_s(&mut self, variant: SVariant, pf: bool, cr: CrBit) {
        self.encode_and_queue(
            Frame::S {
                variant,
                nr: self.v_r,
                pf,
            },
            cr,
            None,
        );
    }

    fn send_rr(&mut self, pf: bool) {
        let variant = if self.own_busy {
            SVariant::Rnr
        } else {
            SVariant::Rr
        };
        self.send_s(variant, pf, self.cr_response);
    }

    fn send_rej(&mut self, pf: bool) {
        self.send_s(SVariant::Rej, pf, self.cr_response);
    }

    fn send_dm(&mut self, pf: bool) {
        self.encode_and_queue(
            Frame::U {
                variant: UVariant::Dm,
                pf,
                payload: &[],
            },
            self.cr_response,
            None,
        );
    }

    fn send_ua(&mut self, pf: bool, payload: &[u8]) {
        self.encode_and_queue(
            Frame::U {
                variant: UVariant::Ua,
                pf,
                payload,
            },
            self.cr_response,
            None,
        );
    }

    fn send_sabm(&mut self, payload: &[u8]) {
        self.encode_and_queue(
            Frame::U {
                variant: UVariant::Sabm,
                pf: true,
                payload,
            },
            self.cr_command,
            Some(0),
        );
    }

    fn send_disc(&mut self) {
        self.encode_and_queue(
            Frame::U {
                variant: UVariant::Disc,
                pf: true,
                payload: &[],
            },
            self.cr_command,
            Some(0),
        );
    }

    /// Re-queue an already-built control frame (slot 0: SABM or DISC) with
    /// the poll bit forced to 1, leaving the stored copy untouched.
    fn resend_slot0(&mut self) {
        if let Some(bytes) = self.tx_hist[0].clone() {
            let mut copy = bytes;
            copy[1] |= 0x10;
            trace!("sapi {} retransmit {:02x?}", self.sapi, copy.as_slice());
            let _ = self.tx_queue.push_back(copy);
        }
    }

    fn retransmit_unacked_with_poll(&mut self) {
        let prev = seq::add(self.v_s, 7);
        if let Some(bytes) = self.tx_hist[prev as usize].clone() {
            let mut copy = bytes;
            copy[1] |= 0x10;
            trace!("sapi {} retransmit {:02x?}", self.sapi, copy.as_slice());
            let _ = self.tx_queue.push_back(copy);
        } else {
            // Nothing unacked to retransmit: poll instead, per the
            // consolidated open-question (b) decision (DESIGN.md).
            self.send_rr(true);
        }
    }

    /// Segment and transmit the next pending L3 message, if the window
    /// (k=1) is free and nothing blocks sending.
    fn try_send_next(&mut self, now: Ticks, sched: &mut Scheduler) {
        if self.state != DlState::MfEst || self.peer_busy {
            return;
        }
        if seq::diff(self.v_s, self.v_a) != 0 {
            return; // window full
        }
        if self.send_buffer.is_none() {
            match self.send_queue.pop_front() {
                Some(msg) => {
                    self.send_buffer = Some(SendBuffer {
                        payload: msg,
                        consumed: 0,
                    })
                }
                None => return,
            }
        }
        let n201 = self.mctx.n201() as usize;
        let max_chunk = n201.saturating_sub(3);
        let (ns, chunk_owned, more);
        {
            let buf = self.send_buffer.as_ref().unwrap();
            let remaining = buf.payload.len() - buf.consumed;
            let take = remaining.min(max_chunk.max(1));
            chunk_owned = buf.payload[buf.consumed..buf.consumed + take].to_vec();
            more = remaining > take;
            ns = self.v_s;
            self.send_buffer.as_mut().unwrap().consumed += take;
        }
        if !more {
            self.send_buffer = None;
        }
        let nr = self.v_r;
        self.encode_and_queue(
            Frame::I {
                ns,
                nr,
                p: false,
                more,
                payload: &chunk_owned,
            },
            self.cr_command,
            Some(ns),
        );
        self.v_s = seq::add(self.v_s, 1);
        if !sched.is_running(self.timer_id) {
            sched.start(self.timer_id, now, t200_ticks());
        }
    }

    fn deliver_or_accumulate(&mut self, payload: &[u8], more: bool) -> Option<RllIndication> {
        if !more && self.rcv_buffer.is_empty() {
            return Some(RllIndication::Data {
                sapi: self.sapi,
                payload: Payload::from_slice(payload).unwrap_or_default(),
                timing_advance: None,
                ms_power: None,
            });
        }
        if self.rcv_buffer.len() + payload.len() > config::MAX_REASSEMBLY_OCTETS {
            warn!(
                "sapi {}: reassembly overflow past {} octets, dropping",
                self.sapi,
                config::MAX_REASSEMBLY_OCTETS
            );
            self.rcv_buffer.clear();
            return None;
        }
        let _ = self.rcv_buffer.extend_from_slice(payload);
        if !more {
            let msg = Payload::from_slice(&self.rcv_buffer).unwrap_or_default();
            self.rcv_buffer.clear();
            Some(RllIndication::Data {
                sapi: self.sapi,
                payload: msg,
                timing_advance: None,
                ms_power: None,
            })
        } else {
            None
        }
    }

    /// Clear `tx_hist[V(A)..nr)` unconditionally, then validate `nr` falls
    /// within `[V(A), V(S)]` and advance `V(A)` to `nr` (the acknowledgement
    /// algorithm, §4.1). History is purged before the validity check, not
    /// after, matching the reference implementation's `lapdm_acknowledge`.
    /// Returns `Ok(advanced)` or `Err(())` on an out-of-window N(R).
    fn apply_ack(&mut self, nr: u8) -> Result<bool, ()> {
        let v_a = self.v_a;
        let v_s = self.v_s;
        let mut i = v_a;
        while i != nr {
            self.tx_hist[i as usize] = None;
            i = seq::add(i, 1);
        }
        if seq::diff(nr, v_a) > seq::diff(v_s, v_a) {
            return Err(());
        }
        let advanced = nr != v_a;
        self.v_a = nr;
        Ok(advanced)
    }

    fn retime_after_ack(&mut self, advanced: bool, now: Ticks, sched: &mut Scheduler) {
        if matches!(self.state, DlState::TimerRecov) {
            return;
        }
        if advanced {
            if seq::diff(self.v_s, self.v_a) == 0 {
                sched.cancel(self.timer_id);
            } else {
                sched.start(self.timer_id, now, t200_ticks());
            }
        }
    }

    // ---- inbound frame dispatch -----------------------------------------

    /// Feed one inbound, already-decoded frame through the state machine.
    pub fn handle_frame(&mut self, frame: Frame<'_>, now: Ticks, sched: &mut Scheduler) -> Indications {
        debug!(
            "sapi {} state {:?} frame {:?}",
            self.sapi, self.state, frame
        );
        match self.state {
            DlState::Idle => self.idle_on_frame(frame),
            DlState::SabmSent => self.sabm_sent_on_frame(frame, sched),
            DlState::MfEst => self.mf_est_on_frame(frame, now, sched),
            DlState::TimerRecov => self.timer_recov_on_frame(frame, now, sched),
            DlState::DiscSent => self.disc_sent_on_frame(frame, sched),
        }
    }

    fn idle_on_frame(&mut self, frame: Frame<'_>) -> Indications {
        let mut inds = Indications::new();
        match frame {
            Frame::U {
                variant: UVariant::Sabm,
                payload,
                ..
            } => {
                if payload.is_empty() {
                    self.send_ua(true, &[]);
                    self.v_s = 0;
                    self.v_a = 0;
                    self.v_r = 0;
                    self.state = DlState::MfEst;
                    info!("sapi {}: established (peer-initiated)", self.sapi);
                    let _ = inds.push(RllIndication::Establish {
                        sapi: self.sapi,
                        payload: None,
                    });
                } else if self.sapi == 0 {
                    self.send_ua(true, payload);
                    self.v_s = 0;
                    self.v_a = 0;
                    self.v_r = 0;
                    self.state = DlState::MfEst;
                    info!("sapi {}: established (contention)", self.sapi);
                    let _ = inds.push(RllIndication::Establish {
                        sapi: self.sapi,
                        payload: Payload::from_slice(payload).ok(),
                    });
                } else {
                    warn!("sapi {}: SABM with payload on non-zero SAPI", self.sapi);
                    self.send_dm(true);
                    let _ = inds.push(RllIndication::Error {
                        sapi: self.sapi,
                        cause: MdlCause::UFrameIncorrectParameter,
                    });
                }
            }
            Frame::U {
                variant: UVariant::Disc,
                pf,
                ..
            } => self.send_dm(pf),
            other if other.poll_final() => self.send_dm(true),
            _ => {}
        }
        inds
    }

    fn sabm_sent_on_frame(&mut self, frame: Frame<'_>, sched: &mut Scheduler) -> Indications {
        let mut inds = Indications::new();
        match frame {
            Frame::U {
                variant: UVariant::Ua,
                pf: true,
                payload,
            } => {
                let sent = self.tx_hist[0].clone();
                let sent_payload = sent.as_ref().map(|b| &b[2 + 1..]).unwrap_or(&[]);
                let sent_len = sent.as_ref().map(|b| b[2] >> 2).unwrap_or(0) as usize;
                let matches_sent = sent_payload.len() >= sent_len
                    && &sent_payload[..sent_len.min(sent_payload.len())] == payload;
                sched.cancel(self.timer_id);
                if matches_sent {
                    self.tx_hist[0] = None;
                    self.state = DlState::MfEst;
                    info!("sapi {}: established", self.sapi);
                    let _ = inds.push(RllIndication::EstablishConfirm { sapi: self.sapi });
                    self.try_send_next(0, sched);
                } else {
                    warn!("sapi {}: contention mismatch on UA", self.sapi);
                    self.flush();
                    self.state = DlState::Idle;
                    let _ = inds.push(RllIndication::Release { sapi: self.sapi });
                }
            }
            Frame::U {
                variant: UVariant::Dm,
                pf: true,
                ..
            } => {
                sched.cancel(self.timer_id);
                self.flush();
                self.state = DlState::Idle;
                let _ = inds.push(RllIndication::Release { sapi: self.sapi });
            }
            _ => {}
        }
        inds
    }

    fn mf_est_on_frame(&mut self, frame: Frame<'_>, now: Ticks, sched: &mut Scheduler) -> Indications {
        match frame {
            Frame::I {
                ns, nr, p, more, payload,
            } => self.i_frame_common(ns, nr, p, more, payload, now, sched),
            Frame::S { variant, nr, pf } => {
                let mut inds = Indications::new();
                match self.apply_ack(nr) {
                    Ok(advanced) => {
                        self.peer_busy = matches!(variant, SVariant::Rnr);
                        if matches!(variant, SVariant::Rej) {
                            self.peer_busy = false;
                            self.retransmit_unacked_with_poll();
                        }
                        self.retime_after_ack(advanced, now, sched);
                        self.try_send_next(now, sched);
                    }
                    Err(()) => {
                        let _ = inds.push(RllIndication::Error {
                            sapi: self.sapi,
                            cause: MdlCause::SequenceError,
                        });
                    }
                }
                if pf {
                    self.send_rr(true);
                }
                inds
            }
            Frame::U {
                variant: UVariant::Disc,
                pf,
                ..
            } => {
                self.send_ua(pf, &[]);
                sched.cancel(self.timer_id);
                self.flush();
                self.state = DlState::Idle;
                let mut inds = Indications::new();
                let _ = inds.push(RllIndication::Release { sapi: self.sapi });
                inds
            }
            Frame::U {
                variant: UVariant::Sabm,
                ..
            } => {
                let mut inds = Indications::new();
                if self.tx_hist[0].is_some() {
                    warn!("sapi {}: unsolicited SABM during MF_EST (contention)", self.sapi);
                    let _ = inds.push(RllIndication::Error {
                        sapi: self.sapi,
                        cause: MdlCause::UFrameIncorrectParameter,
                    });
                }
                inds
            }
            _ => Indications::new(),
        }
    }

    fn i_frame_common(
        &mut self,
        ns: u8,
        nr: u8,
        p: bool,
        more: bool,
        payload: &[u8],
        now: Ticks,
        sched: &mut Scheduler,
    ) -> Indications {
        let mut inds = Indications::new();
        if ns == self.v_r {
            self.v_r = seq::add(self.v_r, 1);
            self.seq_err_cond = false;
            match self.apply_ack(nr) {
                Ok(advanced) => {
                    if matches!(self.state, DlState::TimerRecov) && seq::diff(self.v_s, self.v_a) == 0 {
                        sched.cancel(self.timer_id);
                        self.state = DlState::MfEst;
                        self.retrans_ctr = 0;
                    }
                    self.retime_after_ack(advanced, now, sched);
                }
                Err(()) => {
                    let _ = inds.push(RllIndication::Error {
                        sapi: self.sapi,
                        cause: MdlCause::SequenceError,
                    });
                }
            }
            if let Some(ind) = self.deliver_or_accumulate(payload, more) {
                let _ = inds.push(ind);
            }
            if p {
                self.send_rr(true);
            }
            self.try_send_next(now, sched);
        } else if !self.seq_err_cond {
            warn!(
                "sapi {}: sequence error, expected N(S)={} got {}",
                self.sapi, self.v_r, ns
            );
            self.send_rej(p);
            self.seq_err_cond = true;
        }
        inds
    }

    fn timer_recov_on_frame(&mut self, frame: Frame<'_>, now: Ticks, sched: &mut Scheduler) -> Indications {
        match frame {
            Frame::I {
                ns, nr, p, more, payload,
            } => self.i_frame_common(ns, nr, p, more, payload, now, sched),
            Frame::S { variant, nr, pf: true } => {
                let mut inds = Indications::new();
                match self.apply_ack(nr) {
                    Ok(_) => {
                        self.peer_busy = matches!(variant, SVariant::Rnr);
                        sched.cancel(self.timer_id);
                        self.state = DlState::MfEst;
                        self.retrans_ctr = 0;
                        self.try_send_next(now, sched);
                    }
                    Err(()) => {
                        let _ = inds.push(RllIndication::Error {
                            sapi: self.sapi,
                            cause: MdlCause::SequenceError,
                        });
                    }
                }
                inds
            }
            Frame::U {
                variant: UVariant::Disc,
                pf,
                ..
            } => {
                self.send_ua(pf, &[]);
                sched.cancel(self.timer_id);
                self.flush();
                self.state = DlState::Idle;
                let mut inds = Indications::new();
                let _ = inds.push(RllIndication::Release { sapi: self.sapi });
                inds
            }
            _ => Indications::new(),
        }
    }

    fn disc_sent_on_frame(&mut self, frame: Frame<'_>, sched: &mut Scheduler) -> Indications {
        let mut inds = Indications::new();
        match frame {
            Frame::U {
                variant: UVariant::Ua,
                pf: true,
                ..
            }
            | Frame::U {
                variant: UVariant::Dm,
                pf: true,
                ..
            } => {
                sched.cancel(self.timer_id);
                self.flush();
                self.state = DlState::Idle;
                let _ = inds.push(RllIndication::ReleaseConfirm { sapi: self.sapi });
            }
            _ => {}
        }
        inds
    }

    // ---- T200 expiry ------------------------------------------------------

    /// Called when this link's T200 fires.
    pub fn handle_timer(&mut self, now: Ticks, sched: &mut Scheduler) -> Indications {
        let mut inds = Indications::new();
        match self.state {
            DlState::SabmSent => {
                if self.retrans_ctr < config::N200_ESTABLISH_RELEASE {
                    self.retrans_ctr += 1;
                    self.resend_slot0();
                    sched.start(self.timer_id, now, t200_ticks());
                } else {
                    log::error!("sapi {}: N200 exhausted in SABM_SENT", self.sapi);
                    self.flush();
                    self.state = DlState::Idle;
                    let _ = inds.push(RllIndication::Release { sapi: self.sapi });
                    let _ = inds.push(RllIndication::Error {
                        sapi: self.sapi,
                        cause: MdlCause::T200Expired,
                    });
                }
            }
            DlState::MfEst => {
                self.state = DlState::TimerRecov;
                self.retrans_ctr = 0;
                self.retransmit_unacked_with_poll();
                sched.start(self.timer_id, now, t200_ticks());
            }
            DlState::TimerRecov => {
                let limit = config::n200_timer_recovery(self.mctx.kind);
                if self.retrans_ctr < limit {
                    self.retrans_ctr += 1;
                    self.retransmit_unacked_with_poll();
                    sched.start(self.timer_id, now, t200_ticks());
                } else {
                    log::error!("sapi {}: N200 exhausted in TIMER_RECOV", self.sapi);
                    let _ = inds.push(RllIndication::Error {
                        sapi: self.sapi,
                        cause: MdlCause::T200Expired,
                    });
                }
            }
            DlState::DiscSent => {
                if self.retrans_ctr < config::N200_ESTABLISH_RELEASE {
                    self.retrans_ctr += 1;
                    self.resend_slot0();
                    sched.start(self.timer_id, now, t200_ticks());
                } else {
                    log::error!("sapi {}: N200 exhausted in DISC_SENT", self.sapi);
                    self.flush();
                    self.state = DlState::Idle;
                    let _ = inds.push(RllIndication::ReleaseConfirm { sapi: self.sapi });
                    let _ = inds.push(RllIndication::Error {
                        sapi: self.sapi,
                        cause: MdlCause::T200Expired,
                    });
                }
            }
            DlState::Idle => {}
        }
        inds
    }

    // ---- L3 requests --------------------------------------------------

    /// Feed one downward RSL/RLL primitive through the state machine.
    pub fn handle_request(&mut self, req: RllRequest, now: Ticks, sched: &mut Scheduler) -> Indications {
        match req {
            RllRequest::Establish { payload, .. } => self.on_est_req(payload, now, sched),
            RllRequest::Data { payload, .. } => self.on_data_req(payload, now, sched),
            RllRequest::UnitData { payload, .. } => {
                self.on_unit_data_req(payload);
                Indications::new()
            }
            RllRequest::Suspend { .. } => self.on_susp_req(),
            RllRequest::Resume { payload, .. } | RllRequest::Reconnect { payload, .. } => {
                self.on_resume_req(payload, now, sched)
            }
            RllRequest::Release { mode, .. } => self.on_rel_req(mode, now, sched),
            // CHAN_RQD carries no SAPI and is not per-Datalink state; hosts
            // route it through `Channel::channel_required` instead, which
            // queues a PH-RACH.req directly (SPEC_FULL.md §4.3). Reached
            // only if a caller misroutes it through a SAPI entry point.
            RllRequest::ChannelRequired { .. } => Indications::new(),
        }
    }

    fn on_est_req(&mut self, payload: Option<Payload>, now: Ticks, sched: &mut Scheduler) -> Indications {
        let mut inds = Indications::new();
        if self.state != DlState::Idle {
            return inds;
        }
        if let Some(p) = &payload {
            if self.sapi != 0 {
                let _ = inds.push(RllIndication::Release { sapi: self.sapi });
                return inds;
            }
            let limit = self.mctx.n201() as usize - 3;
            if p.len() > limit {
                let _ = inds.push(RllIndication::Error {
                    sapi: self.sapi,
                    cause: MdlCause::SabmInfoNotAll,
                });
                return inds;
            }
        }
        self.v_s = 0;
        self.v_a = 0;
        self.v_r = 0;
        self.retrans_ctr = 0;
        self.send_sabm(payload.as_deref().unwrap_or(&[]));
        self.state = DlState::SabmSent;
        sched.start(self.timer_id, now, t200_ticks());
        inds
    }

    fn on_data_req(&mut self, payload: Payload, now: Ticks, sched: &mut Scheduler) -> Indications {
        if self.send_queue.push_back(payload).is_err() {
            warn!("sapi {}: send_queue full, dropping message", self.sapi);
        }
        self.try_send_next(now, sched);
        Indications::new()
    }

    fn on_unit_data_req(&mut self, payload: Payload) {
        self.encode_and_queue(
            Frame::U {
                variant: UVariant::Ui,
                pf: false,
                payload: &payload,
            },
            self.cr_command,
            None,
        );
    }

    fn on_susp_req(&mut self) -> Indications {
        let mut inds = Indications::new();
        if self.sapi != 0 {
            return inds;
        }
        if let Some(buf) = self.send_buffer.take() {
            // Push back to the head: a bounded Deque has no push_front
            // capacity guard beyond its own bound, so best-effort like the
            // rest of this buffer's backpressure handling.
            let mut requeued: Deque<Payload, SEND_QUEUE_CAP> = Deque::new();
            let _ = requeued.push_back(buf.payload);
            while let Some(m) = self.send_queue.pop_front() {
                let _ = requeued.push_back(m);
            }
            self.send_queue = requeued;
        }
        self.tx_queue.clear();
        info!("sapi {}: suspended", self.sapi);
        let _ = inds.push(RllIndication::SuspendConfirm { sapi: self.sapi });
        inds
    }

    fn on_resume_req(&mut self, payload: Option<Payload>, now: Ticks, sched: &mut Scheduler) -> Indications {
        sched.cancel(self.timer_id);
        for slot in self.tx_hist.iter_mut() {
            *slot = None;
        }
        self.tx_queue.clear();
        self.v_s = 0;
        self.v_a = 0;
        self.v_r = 0;
        self.retrans_ctr = 0;
        self.send_sabm(payload.as_deref().unwrap_or(&[]));
        self.state = DlState::SabmSent;
        sched.start(self.timer_id, now, t200_ticks());
        info!("sapi {}: resuming", self.sapi);
        Indications::new()
    }

    fn on_rel_req(&mut self, mode: ReleaseMode, now: Ticks, sched: &mut Scheduler) -> Indications {
        let mut inds = Indications::new();
        match mode {
            ReleaseMode::Local => {
                sched.cancel(self.timer_id);
                self.flush();
                self.state = DlState::Idle;
                let _ = inds.push(RllIndication::ReleaseConfirm { sapi: self.sapi });
            }
            ReleaseMode::Normal => match self.state {
                DlState::Idle => {
                    let _ = inds.push(RllIndication::ReleaseConfirm { sapi: self.sapi });
                }
                DlState::MfEst | DlState::TimerRecov => {
                    self.retrans_ctr = 0;
                    self.send_disc();
                    self.state = DlState::DiscSent;
                    sched.start(self.timer_id, now, t200_ticks());
                }
                DlState::SabmSent | DlState::DiscSent => {
                    sched.cancel(self.timer_id);
                    self.flush();
                    self.state = DlState::Idle;
                    let _ = inds.push(RllIndication::ReleaseConfirm { sapi: self.sapi });
                }
            },
        }
        inds
    }
}
