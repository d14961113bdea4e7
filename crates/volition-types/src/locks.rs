//! Subsystem resource locks.
//!
//! A robot has three independently lockable subsystems. An action declares
//! which subsystems it needs as a [`LockSet`]; the framework acquires the
//! whole set once when the outermost action of a tree starts and releases it
//! once when the tree terminates. Two actions whose sets intersect cannot
//! run at the same time.

use serde::{Deserialize, Serialize};

/// A physically independent part of the robot that an action can lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Subsystem {
    /// The head pitch axis.
    Head,
    /// The lift arm.
    Lift,
    /// The drive wheels.
    Wheels,
}

impl Subsystem {
    /// All subsystems, in lock-ordering order.
    pub const ALL: [Self; 3] = [Self::Head, Self::Lift, Self::Wheels];

    /// The single-subsystem [`LockSet`] for this subsystem.
    pub const fn mask(self) -> LockSet {
        match self {
            Self::Head => LockSet::HEAD,
            Self::Lift => LockSet::LIFT,
            Self::Wheels => LockSet::WHEELS,
        }
    }

    /// Static lowercase name, used in lock-set displays and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Lift => "lift",
            Self::Wheels => "wheels",
        }
    }
}

impl core::fmt::Display for Subsystem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of [`Subsystem`]s, stored as a bit mask.
///
/// The empty set is the default; an action that declares no locks can always
/// run alongside anything else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LockSet(u8);

impl LockSet {
    /// The empty set.
    pub const NONE: Self = Self(0);
    /// Only the head.
    pub const HEAD: Self = Self(1);
    /// Only the lift.
    pub const LIFT: Self = Self(1 << 1);
    /// Only the wheels.
    pub const WHEELS: Self = Self(1 << 2);
    /// Every subsystem.
    pub const ALL: Self = Self(0b111);

    /// Whether no subsystem is named.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether `subsystem` is named in this set.
    pub const fn contains(self, subsystem: Subsystem) -> bool {
        self.0 & subsystem.mask().0 != 0
    }

    /// Whether every subsystem named in `other` is also named here.
    pub const fn contains_all(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether the two sets name at least one common subsystem.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// The set naming every subsystem named in either input.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// This set with `subsystem` added.
    pub const fn with(self, subsystem: Subsystem) -> Self {
        Self(self.0 | subsystem.mask().0)
    }

    /// This set with `subsystem` removed.
    pub const fn without(self, subsystem: Subsystem) -> Self {
        Self(self.0 & !subsystem.mask().0)
    }

    /// Iterate the subsystems named in this set, in lock-ordering order.
    pub fn subsystems(self) -> impl Iterator<Item = Subsystem> {
        Subsystem::ALL.into_iter().filter(move |&s| self.contains(s))
    }
}

impl core::fmt::Display for LockSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for subsystem in self.subsystems() {
            if !first {
                f.write_str("|")?;
            }
            f.write_str(subsystem.as_str())?;
            first = false;
        }
        Ok(())
    }
}

impl From<Subsystem> for LockSet {
    fn from(subsystem: Subsystem) -> Self {
        subsystem.mask()
    }
}
