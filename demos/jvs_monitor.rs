use anyhow::{Context, Result};
use std::io::{ErrorKind, Read};

use jvs_psx_proto::command::{AckStatus, Command};
use jvs_psx_proto::wire::BAUD_RATE;
use jvs_psx_proto::{parse_frame, FrameToken, NodeNo, Packet};

fn describe(packet: &Packet) -> String {
    let first = match packet.payload().first() {
        Some(first) => *first,
        None => return String::from("empty"),
    };
    if packet.node_no() == NodeNo::MASTER {
        match AckStatus::try_from(first) {
            Ok(status) => format!("reply {:?}", status),
            Err(_) => String::from("reply ?"),
        }
    } else {
        match Command::try_from(first) {
            Ok(command) => format!("{:?}", command),
            Err(_) => String::from("?"),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args();
    args.next(); // Skip program name
    let port = args.next().unwrap_or_else(|| "/dev/ttyUSB0".to_string());

    let mut serial = serialport::new(&port, BAUD_RATE)
        .timeout(std::time::Duration::from_millis(100))
        .open()
        .with_context(|| format!("Failed to open serial port {}", port))?;

    let mut pending = Vec::new();
    let mut chunk = [0; 256];
    loop {
        let len = match serial.read(&mut chunk) {
            Ok(len) => len,
            Err(e) if e.kind() == ErrorKind::TimedOut => continue,
            Err(e) => return Err(e).context("Serial read failed"),
        };
        pending.extend_from_slice(&chunk[..len]);

        loop {
            let (consumed, token) = parse_frame(&pending);
            pending.drain(..consumed);
            match token {
                FrameToken::Packet(packet) => println!(
                    "{:02x} [{}] {:02x?}",
                    *packet.node_no(),
                    describe(&packet),
                    packet.payload()
                ),
                FrameToken::Corrupt => println!("-- corrupt frame"),
                FrameToken::NeedData => break,
            }
        }
    }
}
