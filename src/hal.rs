//! Hardware seams of the PSX bus.
//!
//! The bus driver never touches hardware directly. A board crate provides
//! the clocked byte exchange, the per-slot select lines and a microsecond
//! delay, and forwards the ACK edge interrupt to an [`AckLine`].

use core::sync::atomic::{AtomicBool, Ordering};

/// Synchronous full-duplex byte exchange on the PSX data lines.
///
/// Implementations clock at 125 kHz, least significant bit first, with the
/// clock idling high (SPI mode 3).
pub trait ByteTransfer {
    /// Clock out `command` and return the byte clocked in at the same time.
    fn transfer(&mut self, command: u8) -> u8;
}

/// Active-low select (attention) line of one slot.
pub trait SelectLine {
    fn set_low(&mut self);

    fn set_high(&mut self);
}

/// Microsecond delay source.
///
/// The bus spins on this while waiting for ACK, so a test double can
/// account simulated time or raise the ACK line at a chosen moment.
pub trait DelayUs {
    fn delay_us(&mut self, us: u32);
}

/// Busy-waiting delay on the host clock.
#[cfg(feature = "std")]
#[derive(Debug, Default, Copy, Clone)]
pub struct SpinDelay;

#[cfg(feature = "std")]
impl DelayUs for SpinDelay {
    fn delay_us(&mut self, us: u32) {
        let until = std::time::Instant::now() + std::time::Duration::from_micros(us.into());
        while std::time::Instant::now() < until {
            core::hint::spin_loop();
        }
    }
}

/// ACK signal shared between the edge interrupt and the bus driver.
///
/// The interrupt handler calls [`acknowledge`](Self::acknowledge) on every
/// rising edge; the bus arms the line before each byte and spins until it
/// flips. Only atomic loads and stores are involved, so the handler can
/// never block on the foreground.
///
/// ```
/// use jvs_psx_proto::AckLine;
/// static ACK: AckLine = AckLine::new();
///
/// ACK.arm();
/// assert!(ACK.is_waiting());
/// ACK.acknowledge(); // from the interrupt handler
/// assert!(!ACK.is_waiting());
/// ```
#[derive(Debug)]
pub struct AckLine {
    waiting: AtomicBool,
}

impl AckLine {
    pub const fn new() -> Self {
        Self {
            waiting: AtomicBool::new(false),
        }
    }

    /// Start waiting for the next pulse.
    pub fn arm(&self) {
        self.waiting.store(true, Ordering::Release);
    }

    /// Edge handler entry point, toggles the latched state.
    pub fn acknowledge(&self) {
        // no fetch_xor on thumbv6m; the handler is the only writer while
        // the bus spins
        let waiting = self.waiting.load(Ordering::Acquire);
        self.waiting.store(!waiting, Ordering::Release);
    }

    /// True until a pulse has been seen since the last [`arm`](Self::arm).
    pub fn is_waiting(&self) -> bool {
        self.waiting.load(Ordering::Acquire)
    }
}

impl Default for AckLine {
    fn default() -> Self {
        Self::new()
    }
}
