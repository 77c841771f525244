#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{Error, ErrorKind};
use std::rc::Rc;

use jvs_psx_proto::memcard::{Frame, FRAME_SIZE};
use jvs_psx_proto::{AckLine, ByteTransfer, Channel, DelayUs, PsxBus, SelectLine};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

type WireT = Rc<RefCell<VecDeque<u8>>>;

/// One end of an in-memory serial line.
pub struct SerialEnd {
    rx: WireT,
    tx: WireT,
    /// Report at most this many bytes as available per call.
    pub chunk: Option<usize>,
    pub do_read_error: bool,
    pub do_write_error: bool,
    pub flushes: usize,
}

pub fn serial_pair() -> (SerialEnd, SerialEnd) {
    let a: WireT = Default::default();
    let b: WireT = Default::default();
    (SerialEnd::new(&a, &b), SerialEnd::new(&b, &a))
}

impl SerialEnd {
    fn new(rx: &WireT, tx: &WireT) -> SerialEnd {
        SerialEnd {
            rx: Rc::clone(rx),
            tx: Rc::clone(tx),
            chunk: None,
            do_read_error: false,
            do_write_error: false,
            flushes: 0,
        }
    }

    /// Inject raw bytes as if the other end had sent them.
    pub fn inject(&self, data: &[u8]) {
        self.rx.borrow_mut().extend(data.iter().copied());
    }

    pub fn pending(&self) -> usize {
        self.rx.borrow().len()
    }

    pub fn take_sent(&self) -> Vec<u8> {
        self.tx.borrow_mut().drain(..).collect()
    }
}

impl Channel for SerialEnd {
    type Error = Error;

    fn bytes_available(&mut self) -> Result<usize, Error> {
        let len = self.rx.borrow().len();
        Ok(self.chunk.map_or(len, |chunk| len.min(chunk)))
    }

    fn read_byte(&mut self) -> Result<u8, Error> {
        if self.do_read_error {
            self.do_read_error = false;
            return Err(Error::new(ErrorKind::PermissionDenied, "IO read error"));
        }
        self.rx
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| Error::new(ErrorKind::WouldBlock, "no data"))
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), Error> {
        if self.do_write_error {
            self.do_write_error = false;
            return Err(Error::new(ErrorKind::PermissionDenied, "IO write error"));
        }
        self.tx.borrow_mut().push_back(byte);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Error> {
        self.flushes += 1;
        Ok(())
    }
}

/// Select line that remembers its level and counts activations.
#[derive(Clone)]
pub struct SimPin {
    pub high: Rc<Cell<bool>>,
    pub selections: Rc<Cell<u32>>,
}

impl SimPin {
    pub fn new() -> SimPin {
        SimPin {
            high: Rc::new(Cell::new(false)),
            selections: Rc::new(Cell::new(0)),
        }
    }

    pub fn is_high(&self) -> bool {
        self.high.get()
    }
}

impl SelectLine for SimPin {
    fn set_low(&mut self) {
        self.high.set(false);
        self.selections.set(self.selections.get() + 1);
    }

    fn set_high(&mut self) {
        self.high.set(true);
    }
}

/// Simulated microsecond clock.
#[derive(Clone, Default)]
pub struct SimClock {
    pub now: Rc<Cell<u64>>,
}

impl DelayUs for SimClock {
    fn delay_us(&mut self, us: u32) {
        self.now.set(self.now.get() + u64::from(us));
    }
}

/// Peripheral answering from a fixed script, 0xff once the script runs out.
pub struct Scripted<'a> {
    pub ack: &'a AckLine,
    pub acks: bool,
    pub responses: VecDeque<u8>,
    pub sent: Vec<u8>,
}

impl<'a> Scripted<'a> {
    pub fn new(ack: &'a AckLine, responses: &[u8]) -> Self {
        Scripted {
            ack,
            acks: true,
            responses: responses.iter().copied().collect(),
            sent: Vec::new(),
        }
    }
}

impl ByteTransfer for Scripted<'_> {
    fn transfer(&mut self, command: u8) -> u8 {
        self.sent.push(command);
        if self.acks {
            self.ack.acknowledge();
        }
        self.responses.pop_front().unwrap_or(0xff)
    }
}

pub const SECTORS: usize = 1024;

/// Memory card following the read and write frame protocol.
///
/// A transaction restarts whenever the select line is activated again.
pub struct SimCard<'a> {
    pub ack: &'a AckLine,
    pub acks: bool,
    pub frames: Vec<Frame>,
    /// Flip a bit of the checksum sent with read frames.
    pub corrupt_read_checksum: bool,
    selections: Rc<Cell<u32>>,
    seen_selection: u32,
    step: usize,
    command: u8,
    address: u16,
    checksum: u8,
    buffer: Frame,
}

impl<'a> SimCard<'a> {
    pub fn new(ack: &'a AckLine, pin: &SimPin) -> Self {
        SimCard {
            ack,
            acks: true,
            frames: vec![[0; FRAME_SIZE]; SECTORS],
            corrupt_read_checksum: false,
            selections: Rc::clone(&pin.selections),
            seen_selection: 0,
            step: 0,
            command: 0,
            address: 0,
            checksum: 0,
            buffer: [0; FRAME_SIZE],
        }
    }

    fn respond(&mut self, byte: u8) -> u8 {
        let step = self.step;
        self.step += 1;
        match (step, self.command) {
            (0, _) => 0xff,
            (1, _) => {
                self.command = byte;
                0x08
            }
            (2, _) => 0x5a,
            (3, _) => 0x5d,
            (4, _) => {
                self.address = u16::from(byte) << 8;
                self.checksum = byte;
                0x00
            }
            (5, _) => {
                self.address |= u16::from(byte);
                self.checksum ^= byte;
                0x00
            }
            (6, b'R') => 0x5c,
            (7, b'R') => 0x5d,
            (8, b'R') => (self.address >> 8) as u8,
            (9, b'R') => self.address as u8,
            (10..=137, b'R') => {
                let byte = self.frame()[step - 10];
                self.checksum ^= byte;
                byte
            }
            (138, b'R') => {
                if self.corrupt_read_checksum {
                    self.checksum ^ 0x01
                } else {
                    self.checksum
                }
            }
            (139, b'R') => self.status(b'G'),
            (6..=133, b'W') => {
                self.buffer[step - 6] = byte;
                self.checksum ^= byte;
                0x00
            }
            (134, b'W') => {
                self.checksum ^= byte;
                0x00
            }
            (135, b'W') => 0x5c,
            (136, b'W') => 0x5d,
            (137, b'W') => {
                if self.checksum != 0 {
                    b'N'
                } else if usize::from(self.address) >= SECTORS {
                    0xff
                } else {
                    let buffer = self.buffer;
                    self.frames[usize::from(self.address)] = buffer;
                    b'G'
                }
            }
            _ => 0xff,
        }
    }

    fn frame(&self) -> Frame {
        self.frames
            .get(usize::from(self.address))
            .copied()
            .unwrap_or([0xff; FRAME_SIZE])
    }

    fn status(&self, good: u8) -> u8 {
        if usize::from(self.address) < SECTORS {
            good
        } else {
            0xff
        }
    }
}

impl ByteTransfer for SimCard<'_> {
    fn transfer(&mut self, command: u8) -> u8 {
        if self.selections.get() != self.seen_selection {
            self.seen_selection = self.selections.get();
            self.step = 0;
            self.command = 0;
        }
        if self.acks {
            self.ack.acknowledge();
        }
        self.respond(command)
    }
}

pub type SimBus<'a, T> = PsxBus<'a, T, SimPin, SimClock>;

pub fn sim_pins() -> [SimPin; 2] {
    [SimPin::new(), SimPin::new()]
}

pub fn sim_bus<'a, T: ByteTransfer>(
    port: T,
    pins: &[SimPin; 2],
    ack: &'a AckLine,
) -> (SimBus<'a, T>, SimClock) {
    let clock = SimClock::default();
    let bus = PsxBus::new(port, pins.clone(), clock.clone(), ack);
    (bus, clock)
}
