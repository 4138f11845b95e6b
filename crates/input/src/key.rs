use serde::{Deserialize, Serialize};

/// Keys the runtime core reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Key {
    Escape,
    Grave,
    W,
    A,
    S,
    D,
    Space,
    LShift,
    Enter,
    Backspace,
}

impl Key {
    pub const COUNT: usize = 10;

    pub const ALL: [Key; Self::COUNT] = [
        Key::Escape,
        Key::Grave,
        Key::W,
        Key::A,
        Key::S,
        Key::D,
        Key::Space,
        Key::LShift,
        Key::Enter,
        Key::Backspace,
    ];

    /// Position in [`Key::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Key::Escape => "escape",
            Key::Grave => "grave",
            Key::W => "w",
            Key::A => "a",
            Key::S => "s",
            Key::D => "d",
            Key::Space => "space",
            Key::LShift => "lshift",
            Key::Enter => "enter",
            Key::Backspace => "backspace",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
