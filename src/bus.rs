//! PSX peripheral bus driver.
//!
//! Every exchange is one byte out, one byte in, after which the peripheral
//! pulses ACK to say it is ready for the next byte. [`PsxBus`] paces the
//! exchange on that pulse. Peripherals that never pulse ACK are handled by
//! a fallback: once an ACK fails to arrive within [`ACK_TIMEOUT_US`], the
//! rest of the operation trusts the per-step timeouts chosen by the caller.
//!
//! An operation is a [`Session`] obtained from [`PsxBus::select`]. The
//! session holds the slot's select line low and raises it again when
//! dropped, whichever way the operation ends.

use log::{trace, warn};

use crate::hal::{AckLine, ByteTransfer, DelayUs, SelectLine};
use crate::types::Slot;

/// Upper bound on the ACK wait while ACK tracking is active.
pub const ACK_TIMEOUT_US: u32 = 3000;
/// Settle time between selecting a slot and the first byte.
pub const TRANSFER_WAIT_US: u32 = 20;
/// Bus clock expected from [`ByteTransfer`] implementations.
pub const CLOCK_HZ: u32 = 125_000;

/// First byte of every exchange, addressing the device class.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Device {
    Controller = 0x01,
    MemoryCard = 0x81,
}

/// Timing of a single exchange: ACK timeout and delay before the byte.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Pace {
    pub timeout_us: u32,
    pub pre_delay_us: u32,
}

impl Pace {
    pub const fn new(timeout_us: u32, pre_delay_us: u32) -> Self {
        Self {
            timeout_us,
            pre_delay_us,
        }
    }
}

/// Half-duplex command/response driver for both PSX slots.
///
/// Only one session can exist at a time since [`select`](Self::select)
/// borrows the bus mutably; callers sharing a bus must serialize access
/// themselves.
#[derive(Debug)]
pub struct PsxBus<'a, T, S, D> {
    port: T,
    select: [S; 2],
    delay: D,
    ack: &'a AckLine,
    compatible: bool,
}

impl<'a, T, S, D> PsxBus<'a, T, S, D>
where
    T: ByteTransfer,
    S: SelectLine,
    D: DelayUs,
{
    /// Take ownership of the bus hardware. Both slots are deselected.
    pub fn new(port: T, mut select: [S; 2], delay: D, ack: &'a AckLine) -> Self {
        for line in select.iter_mut() {
            line.set_high();
        }
        Self {
            port,
            select,
            delay,
            ack,
            compatible: false,
        }
    }

    /// Start an operation on `slot`.
    ///
    /// ACK tracking is re-enabled, the select line is driven low and the
    /// settle time elapses before the session is returned.
    pub fn select(&mut self, slot: Slot) -> Session<'_, 'a, T, S, D> {
        self.compatible = false;
        self.select[slot.index()].set_low();
        self.delay.delay_us(TRANSFER_WAIT_US);
        Session { bus: self, slot }
    }

    /// Whether the last operation fell back to compatibility pacing.
    pub fn compatibility_mode(&self) -> bool {
        self.compatible
    }

    /// Give back the hardware.
    pub fn release(self) -> (T, [S; 2], D) {
        (self.port, self.select, self.delay)
    }
}

/// One operation on a selected slot.
pub struct Session<'b, 'a, T, S: SelectLine, D> {
    bus: &'b mut PsxBus<'a, T, S, D>,
    slot: Slot,
}

impl<T, S, D> Session<'_, '_, T, S, D>
where
    T: ByteTransfer,
    S: SelectLine,
    D: DelayUs,
{
    /// Exchange one byte and wait for the peripheral's ACK.
    ///
    /// While ACK tracking is active `timeout_us` is replaced by
    /// [`ACK_TIMEOUT_US`]. If no ACK arrives within the timeout the session
    /// switches to compatibility pacing for good, and later calls wait at
    /// most their own `timeout_us`.
    pub fn transfer(&mut self, command: u8, timeout_us: u32, pre_delay_us: u32) -> u8 {
        let bus = &mut *self.bus;
        let mut remaining = if bus.compatible {
            timeout_us
        } else {
            ACK_TIMEOUT_US
        };

        bus.ack.arm();
        if pre_delay_us > 0 {
            bus.delay.delay_us(pre_delay_us);
        }
        let response = bus.port.transfer(command);

        while bus.ack.is_waiting() {
            if remaining == 0 {
                if !bus.compatible {
                    warn!(
                        "no ACK from slot {} after {:#04x}, using compatibility pacing",
                        self.slot.index(),
                        command
                    );
                    bus.compatible = true;
                }
                break;
            }
            remaining -= 1;
            bus.delay.delay_us(1);
        }

        trace!("{:#04x} -> {:#04x}", command, response);
        response
    }

    /// [`transfer`](Self::transfer) with the timing taken from `pace`.
    pub fn exchange(&mut self, command: u8, pace: Pace) -> u8 {
        self.transfer(command, pace.timeout_us, pace.pre_delay_us)
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn compatibility_mode(&self) -> bool {
        self.bus.compatible
    }
}

impl<T, S: SelectLine, D> Drop for Session<'_, '_, T, S, D> {
    fn drop(&mut self) {
        self.bus.select[self.slot.index()].set_high();
    }
}
