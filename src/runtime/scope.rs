//! Context scope bitmask

use std::fmt;

/// Bitmask of execution scopes (process, thread, task)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScopeMask(pub u32);

impl ScopeMask {
    pub const NONE: ScopeMask = ScopeMask(0);
    pub const PROCESS: ScopeMask = ScopeMask(1);
    pub const THREAD: ScopeMask = ScopeMask(2);
    pub const TASK: ScopeMask = ScopeMask(4);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: ScopeMask) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for ScopeMask {
    type Output = ScopeMask;

    fn bitor(self, rhs: ScopeMask) -> ScopeMask {
        ScopeMask(self.0 | rhs.0)
    }
}

impl From<u32> for ScopeMask {
    fn from(bits: u32) -> Self {
        ScopeMask(bits)
    }
}

// Output order, most specific first
const SCOPE_NAMES: [(ScopeMask, &str); 3] = [
    (ScopeMask::TASK, "task"),
    (ScopeMask::THREAD, "thread"),
    (ScopeMask::PROCESS, "process"),
];

/// Render a scope mask as colon-separated scope names.
///
/// Undefined bits are ignored; an empty mask yields an empty string.
pub fn scope_to_string(scope: ScopeMask) -> String {
    SCOPE_NAMES
        .iter()
        .filter(|(bit, _)| scope.contains(*bit))
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(":")
}

impl fmt::Display for ScopeMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&scope_to_string(*self))
    }
}
