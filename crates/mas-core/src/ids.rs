//! Strongly typed, zero-cost identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as map keys and sorted
//! collection elements without ceremony.  Value `0` is reserved everywhere to
//! mean "unassigned": allocators hand out identifiers starting at 1.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no identifier was assigned".
            pub const UNASSIGNED: $name = $name(0);

            /// `true` unless this is the [`UNASSIGNED`](Self::UNASSIGNED) sentinel.
            #[inline(always)]
            pub fn is_assigned(self) -> bool {
                self.0 != 0
            }

            /// Raw integer value, widened to `u64` for allocator bookkeeping.
            #[inline(always)]
            pub fn raw(self) -> u64 {
                self.0 as u64
            }
        }

        impl Default for $name {
            /// Returns the `UNASSIGNED` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::UNASSIGNED
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl TryFrom<u64> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: u64) -> Result<$name, Self::Error> {
                <$inner>::try_from(n as u128).map($name)
            }
        }
    };
}

typed_id! {
    /// Identifier of an agent, unique among live agents of one registry.
    pub struct AgentId(u64);
}

typed_id! {
    /// Identifier of a thread agent group inside a simulation manager.
    pub struct ThreadId(u32);
}

typed_id! {
    /// Handle of a spatial index registered in an index registry.
    pub struct IndexHandle(u64);
}
