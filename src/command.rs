//! JVS command bytes and acknowledge codes.
//!
//! Requests carry one or more commands in their payload. Every reply starts
//! with an [`AckStatus`] for the whole packet, followed by an [`AckReport`]
//! and result data per command.

use core::convert::TryFrom;

/// Second byte of the reset command, `[0xf0, 0xd9]`.
pub const RESET_ARGUMENT: u8 = 0xd9;

/// Konami 573 sub-commands of [`Command::K573Buffer`].
pub mod buffer {
    pub const READ: u8 = 0x00;
    pub const WRITE: u8 = 0x01;
    pub const SET_ADDRESS: u8 = 0x02;
}

/// Konami 573 sub-commands of [`Command::K573SecurityPlate`], combined with the slot by xor.
pub mod security_plate {
    pub const INSERT_CHECK: u8 = 0x00;
    pub const SET_PASSWORD: u8 = 0x10;
    pub const GET_DATA: u8 = 0x20;
    pub const CONFIG_REGISTER: u8 = 0x40;
}

/// Konami 573 sub-commands of [`Command::K573MemoryCard`].
pub mod memory_card {
    pub const READ: u8 = 0x74;
    pub const WRITE: u8 = 0x75;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Reset every node, `[0xf0, 0xd9]`.
    Reset = 0xf0,
    /// Assign a node number, `[0xf1, node]`.
    SetAddress = 0xf1,
    /// I/O identification string.
    IoId = 0x10,
    CommandRev = 0x11,
    JvRev = 0x12,
    ProtocolVer = 0x13,
    FunctionCheck = 0x14,
    /// Resend the previous reply.
    Retry = 0x2f,
    K573Buffer = 0x70,
    K573Status = 0x71,
    K573SecurityPlate = 0x72,
    K573Execute = 0x73,
    /// Memory card transfer between a card and node RAM.
    K573MemoryCard = 0x76,
    /// Digital controller state of both ports.
    K573Controller = 0x77,
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        use Command::*;
        Ok(match byte {
            0xf0 => Reset,
            0xf1 => SetAddress,
            0x10 => IoId,
            0x11 => CommandRev,
            0x12 => JvRev,
            0x13 => ProtocolVer,
            0x14 => FunctionCheck,
            0x2f => Retry,
            0x70 => K573Buffer,
            0x71 => K573Status,
            0x72 => K573SecurityPlate,
            0x73 => K573Execute,
            0x76 => K573MemoryCard,
            0x77 => K573Controller,
            other => return Err(other),
        })
    }
}

/// Packet level status, first payload byte of every reply.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AckStatus {
    Ok = 0x01,
    UnknownCommand = 0x02,
    SumError = 0x03,
    Overflow = 0x04,
}

impl TryFrom<u8> for AckStatus {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(Self::Ok),
            0x02 => Ok(Self::UnknownCommand),
            0x03 => Ok(Self::SumError),
            0x04 => Ok(Self::Overflow),
            other => Err(other),
        }
    }
}

/// Per command report.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AckReport {
    Ok = 0x01,
    ParamErrorNoResult = 0x02,
    ParamErrorIgnored = 0x03,
    Busy = 0x04,
}

impl TryFrom<u8> for AckReport {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(Self::Ok),
            0x02 => Ok(Self::ParamErrorNoResult),
            0x03 => Ok(Self::ParamErrorIgnored),
            0x04 => Ok(Self::Busy),
            other => Err(other),
        }
    }
}
