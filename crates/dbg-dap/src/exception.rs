use tracing::debug;

pub mod keyword {
    pub const NEVER: &str = "never";
    pub const ALWAYS: &str = "always";
    pub const ALL: &str = "all";
    pub const UNHANDLED: &str = "unhandled";
    pub const USER_UNHANDLED: &str = "userUnhandled";
    pub const USER_UNHANDLED_ALT: &str = "user-unhandled";
}

/// When the engine should stop on an exception.
///
/// An empty mask means never. `UNHANDLED` is the default and is always
/// permitted; clients cannot set it independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExceptionBreakMode(u8);

impl ExceptionBreakMode {
    pub const NEVER: Self = Self(0);
    pub const ALL: Self = Self(0b001);
    pub const USER_UNHANDLED: Self = Self(0b010);
    pub const UNHANDLED: Self = Self(0b100);

    pub const fn from_bits_retain(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn reset(&mut self) {
        *self = Self::NEVER;
    }

    pub fn is_never(self) -> bool {
        self.0 == 0
    }

    pub fn is_all(self) -> bool {
        self.contains(Self::ALL)
    }

    pub fn is_unhandled_only(self) -> bool {
        self == Self::UNHANDLED
    }

    pub fn is_user_unhandled(self) -> bool {
        self.contains(Self::USER_UNHANDLED)
    }

    /// Folds client filter keywords in order; a later `never` discards earlier ones.
    pub fn from_filters<I, S>(filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        filters
            .into_iter()
            .fold(Self::default(), |mut mode, filter| {
                match filter.as_ref() {
                    keyword::ALL | keyword::ALWAYS => mode.insert(Self::ALL),
                    keyword::USER_UNHANDLED | keyword::USER_UNHANDLED_ALT => {
                        mode.insert(Self::USER_UNHANDLED)
                    }
                    keyword::NEVER => mode.reset(),
                    keyword::UNHANDLED => {}
                    other => debug!(filter = other, "Ignoring unknown exception filter"),
                }
                mode
            })
    }

    /// Client keyword for this mode, or `None` for a combination no keyword describes.
    pub fn keyword(self) -> Option<&'static str> {
        if self.is_never() {
            Some(keyword::NEVER)
        } else if self.is_all() {
            Some(keyword::ALWAYS)
        } else if self.is_unhandled_only() {
            Some(keyword::UNHANDLED)
        } else if self.is_user_unhandled() {
            Some(keyword::USER_UNHANDLED)
        } else {
            None
        }
    }
}

impl Default for ExceptionBreakMode {
    fn default() -> Self {
        Self::UNHANDLED
    }
}
