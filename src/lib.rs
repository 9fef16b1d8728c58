//! GSM air-interface LAPDm (Link Access Procedure on the Dm channel)
//! data-link entity, per 3GPP TS 04.06.
//!
//! A deployment instantiates one [`channel::Channel`] per dedicated radio
//! connection. Each Channel holds two [`entity::Entity`] instances (DCCH,
//! ACCH); each Entity holds a fixed array of [`datalink::Datalink`]
//! instances, one per SAPI, each running an independent instance of the
//! LAPDm state machine.
//!
//! ```text
//! L3 ──RSL/RLL primitives──▶ Channel ──▶ Entity ──▶ Datalink[SAPI] ──▶ frames ──▶ L1
//! L1 ──frames──▶ Entity (demux by SAPI/format) ──▶ Datalink ──▶ RSL/RLL primitives ──▶ L3
//! ```
//!
//! The engine is single-threaded and cooperative: every public entry point
//! runs a state transition to completion before returning, and external
//! collaborators (L1, L3, the timer) are plain callbacks the host drives.

pub mod channel;
pub mod config;
pub mod datalink;
pub mod entity;
pub mod error;
pub mod frame;
pub mod primitives;
pub mod seq;
#[cfg(any(test, feature = "test-util"))]
pub mod test_support;
pub mod timer;

pub use channel::{Channel, Mode};
pub use error::{LapdmError, MdlCause};
