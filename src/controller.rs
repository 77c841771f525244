//! Digital controller polling.

use crate::bus::{Device, Pace, PsxBus};
use crate::hal::{ByteTransfer, DelayUs, SelectLine};
use crate::types::Slot;

/// Poll command; the response is the low ID byte.
pub const POLL: u8 = b'B';
/// ID of a digital pad, low byte first.
pub const DIGITAL_PAD_ID: [u8; 2] = [0x41, 0x5a];

const HEADER: Pace = Pace::new(300, 45);
const STATE: Pace = Pace::new(200, 0);

impl<T, S, D> PsxBus<'_, T, S, D>
where
    T: ByteTransfer,
    S: SelectLine,
    D: DelayUs,
{
    /// Read the button state of a digital pad in `slot`.
    ///
    /// Returns false, with `output` zeroed, unless a digital pad answers.
    /// The two state bytes are copied as received: active low, see
    /// [`Buttons`].
    pub fn try_read_controller_input(&mut self, slot: Slot, output: &mut [u8; 2]) -> bool {
        let mut session = self.select(slot);

        session.exchange(Device::Controller as u8, HEADER);
        let id = [
            session.exchange(POLL, HEADER),
            session.exchange(0x00, HEADER),
        ];
        let connected = id == DIGITAL_PAD_ID;

        if connected {
            output[0] = session.exchange(0x00, STATE);
            output[1] = session.exchange(0x00, STATE);
        } else {
            *output = [0x00, 0x00];
        }
        connected
    }

    /// Poll a digital pad in `slot`, `None` if none is connected.
    pub fn read_buttons(&mut self, slot: Slot) -> Option<Buttons> {
        let mut state = [0; 2];
        if self.try_read_controller_input(slot, &mut state) {
            Some(Buttons::from_bytes(state))
        } else {
            None
        }
    }
}

/// Digital pad buttons, by bit in the little endian state word.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Button {
    Select = 1 << 0,
    L3 = 1 << 1,
    R3 = 1 << 2,
    Start = 1 << 3,
    Up = 1 << 4,
    Right = 1 << 5,
    Down = 1 << 6,
    Left = 1 << 7,
    L2 = 1 << 8,
    R2 = 1 << 9,
    L1 = 1 << 10,
    R1 = 1 << 11,
    Triangle = 1 << 12,
    Circle = 1 << 13,
    Cross = 1 << 14,
    Square = 1 << 15,
}

/// Button state as sent by the pad: a cleared bit is a pressed button.
///
/// ```
/// use jvs_psx_proto::{Button, Buttons};
/// let buttons = Buttons::from_bytes([0xf7, 0xbf]);
/// assert!(buttons.is_pressed(Button::Start));
/// assert!(buttons.is_pressed(Button::Cross));
/// assert!(!buttons.is_pressed(Button::Select));
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Buttons(u16);

impl Buttons {
    /// Nothing pressed.
    pub const RELEASED: Buttons = Buttons(0xffff);

    pub const fn from_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_le_bytes(bytes))
    }

    pub const fn to_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    pub const fn is_pressed(self, button: Button) -> bool {
        self.0 & button as u16 == 0
    }

    /// Bitmask of pressed buttons, active high.
    pub const fn pressed(self) -> u16 {
        !self.0
    }
}

impl Default for Buttons {
    fn default() -> Self {
        Self::RELEASED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buttons() {
        assert_eq!(Buttons::default().pressed(), 0);
        let b = Buttons::from_bytes([0xef, 0x7f]);
        assert!(b.is_pressed(Button::Up));
        assert!(b.is_pressed(Button::Square));
        assert!(!b.is_pressed(Button::Down));
        assert_eq!(b.pressed(), Button::Up as u16 | Button::Square as u16);
        assert_eq!(b.to_bytes(), [0xef, 0x7f]);
    }
}
