//! The 32-bit tagged command value emitted by the matcher and accepted by
//! the dispatch pipeline.

/// Opcode family occupying the upper byte of a `Command`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandBlock {
    PassChar = 0,
    PassKey = 1,
    PassDots = 2,
    Route = 3,
    SwitchVt = 4,
    SwitchVtPrev = 5,
    SwitchVtNext = 6,
    Toggle = 7,
    Misc = 8,
}

impl CommandBlock {
    fn from_u8(v: u8) -> Option<Self> {
        use CommandBlock::*;
        Some(match v {
            0 => PassChar,
            1 => PassKey,
            2 => PassDots,
            3 => Route,
            4 => SwitchVt,
            5 => SwitchVtPrev,
            6 => SwitchVtNext,
            7 => Toggle,
            8 => Misc,
            _ => return None,
        })
    }
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct CommandFlags: u8 {
        const TOGGLE_ON   = 0b0000_0001;
        const TOGGLE_OFF  = 0b0000_0010;
        const MOTION_SCALED = 0b0000_0100;
        const INPUT_SHIFT  = 0b0000_1000;
        const INPUT_CONTROL = 0b0001_0000;
        const INPUT_META    = 0b0010_0000;
    }
}

/// `{ block: u8 | flags: u8 | arg: u16 }` packed into one `u32`, matching
/// the data model's "upper byte opcode family, low 16 bits argument,
/// remaining bits flags" layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command {
    pub block: CommandBlock,
    pub flags: CommandFlags,
    pub arg: u16,
}

impl Command {
    pub fn new(block: CommandBlock, arg: u16) -> Self {
        Self {
            block,
            flags: CommandFlags::empty(),
            arg,
        }
    }

    pub fn with_flags(mut self, flags: CommandFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn encode(&self) -> u32 {
        ((self.block as u32) << 24) | ((self.flags.bits() as u32) << 16) | self.arg as u32
    }

    pub fn decode(raw: u32) -> Option<Self> {
        let block = CommandBlock::from_u8((raw >> 24) as u8)?;
        let flags = CommandFlags::from_bits_truncate((raw >> 16) as u8);
        let arg = (raw & 0xFFFF) as u16;
        Some(Self { block, flags, arg })
    }
}
