//! JVS node on stdin/stdout that echoes every request back to the master.
//!
//! Reset and SetAddress are honoured, Retry resends the previous reply.
//! Pipe a serial line through it, e.g. with `socat`.

use std::io::{self, Read, Stdin, Stdout, Write};

use anyhow::Result;
use log::info;

use jvs_psx_proto::command::{AckReport, AckStatus, Command, RESET_ARGUMENT};
use jvs_psx_proto::{Channel, Node, NodeNo, Packet};

struct Stdio {
    stdin: Stdin,
    stdout: Stdout,
    next: Option<u8>,
    eof: bool,
}

impl Channel for Stdio {
    type Error = io::Error;

    // blocks for the first byte, stdin can't tell how many are buffered
    fn bytes_available(&mut self) -> io::Result<usize> {
        if self.next.is_none() && !self.eof {
            let mut buf = [0];
            match self.stdin.read(&mut buf)? {
                0 => self.eof = true,
                _ => self.next = Some(buf[0]),
            }
        }
        Ok(usize::from(self.next.is_some()))
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        self.next
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::WouldBlock, "no data"))
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.stdout.write_all(&[byte])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()
    }
}

fn handle(node: &mut Node, io: &mut Stdio, request: &Packet) -> Result<()> {
    let payload = request.payload();
    let command = payload.first().copied().map(Command::try_from);
    match command {
        Some(Ok(Command::Reset)) if payload.get(1) == Some(&RESET_ARGUMENT) => {
            info!("reset");
            node.reset();
        }
        Some(Ok(Command::SetAddress)) if payload.len() >= 2 => {
            let address = NodeNo::new(payload[1])?;
            info!("assigned node {}", *address);
            node.set_address(address);
            let mut reply = Packet::reply(AckStatus::Ok);
            reply.push(AckReport::Ok as u8)?;
            node.send(io, &reply)?;
        }
        Some(Ok(Command::Retry)) => {
            node.resend(io)?;
        }
        _ => {
            let mut reply = Packet::reply(AckStatus::Ok);
            if reply.extend_from_slice(payload).is_err() {
                reply = Packet::reply(AckStatus::Overflow);
            }
            node.send(io, &reply)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let mut io = Stdio {
        stdin: io::stdin(),
        stdout: io::stdout(),
        next: None,
        eof: false,
    };
    let mut node = Node::new(NodeNo::MASTER);

    while !io.eof {
        if let Some(request) = node.poll(&mut io)? {
            info!("request {:02x?}", request.payload());
            handle(&mut node, &mut io, &request)?;
        }
    }
    Ok(())
}
