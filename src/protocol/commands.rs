//! Remote-control command opcodes.
//!
//! Every command is a two-byte opcode (class byte, action byte) written to the
//! command characteristic.

/// Command class byte shared by all shutter commands.
pub const SHUTTER_CLASS: u8 = 0x01;

/// Shutter button commands understood by the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Command {
    /// Shutter button released (full press ended).
    ShutterReleased = 0x06,
    /// Shutter button half-pressed: start autofocus.
    PressToFocus = 0x07,
    /// Half-press released: stop holding focus.
    HoldFocus = 0x08,
    /// Shutter button fully pressed: take the picture.
    TakePicture = 0x09,
}

impl Command {
    /// The action byte of this command.
    pub fn action(&self) -> u8 {
        *self as u8
    }

    /// The two-byte opcode written to the camera.
    pub fn opcode(&self) -> [u8; 2] {
        [SHUTTER_CLASS, self.action()]
    }

    /// Parse a two-byte opcode.
    pub fn from_opcode(opcode: &[u8]) -> Option<Self> {
        match opcode {
            [SHUTTER_CLASS, 0x06] => Some(Self::ShutterReleased),
            [SHUTTER_CLASS, 0x07] => Some(Self::PressToFocus),
            [SHUTTER_CLASS, 0x08] => Some(Self::HoldFocus),
            [SHUTTER_CLASS, 0x09] => Some(Self::TakePicture),
            _ => None,
        }
    }

    /// Get a human-readable name for this command.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ShutterReleased => "Shutter Released",
            Self::PressToFocus => "Press To Focus",
            Self::HoldFocus => "Hold Focus",
            Self::TakePicture => "Take Picture",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One write of the trigger sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceStep {
    /// Command to write.
    pub command: Command,
    /// Whether the camera needs a settle pause after this write.
    pub settle_after: bool,
}

/// The fixed shutter sequence: focus, shoot, release, release focus.
pub const TRIGGER_SEQUENCE: [SequenceStep; 4] = [
    SequenceStep {
        command: Command::PressToFocus,
        settle_after: false,
    },
    SequenceStep {
        command: Command::TakePicture,
        settle_after: true,
    },
    SequenceStep {
        command: Command::ShutterReleased,
        settle_after: true,
    },
    SequenceStep {
        command: Command::HoldFocus,
        settle_after: false,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcodes() {
        assert_eq!(Command::PressToFocus.opcode(), [0x01, 0x07]);
        assert_eq!(Command::TakePicture.opcode(), [0x01, 0x09]);
        assert_eq!(Command::ShutterReleased.opcode(), [0x01, 0x06]);
        assert_eq!(Command::HoldFocus.opcode(), [0x01, 0x08]);
    }

    #[test]
    fn test_from_opcode() {
        assert_eq!(Command::from_opcode(&[0x01, 0x09]), Some(Command::TakePicture));
        assert_eq!(Command::from_opcode(&[0x02, 0x09]), None);
        assert_eq!(Command::from_opcode(&[0x01]), None);
        assert_eq!(Command::from_opcode(&[0x01, 0x07, 0x00]), None);
    }

    #[test]
    fn test_trigger_sequence_order() {
        let commands: Vec<_> = TRIGGER_SEQUENCE.iter().map(|s| s.command).collect();
        assert_eq!(
            commands,
            vec![
                Command::PressToFocus,
                Command::TakePicture,
                Command::ShutterReleased,
                Command::HoldFocus,
            ]
        );

        let settles: Vec<_> = TRIGGER_SEQUENCE.iter().map(|s| s.settle_after).collect();
        assert_eq!(settles, vec![false, true, true, false]);
    }

    #[test]
    fn test_command_display() {
        assert_eq!(format!("{}", Command::TakePicture), "Take Picture");
    }
}
