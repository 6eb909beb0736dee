//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a prop or entity within a level.
///
/// Props, entities and backdrop props draw from a single id space. Ids
/// below 100 are reserved by the game for special objects such as the
/// camera, so allocation starts at 100.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// First id handed out by a fresh allocator.
    pub const FIRST: ObjectId = ObjectId(100);

    /// Largest storable id. Files hold ids as signed 32-bit values and treat
    /// negative ones as deleted records.
    pub const MAX: ObjectId = ObjectId(i32::MAX as u32);
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ObjectId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_ordering() {
        assert_eq!(ObjectId(7).to_string(), "7");
        assert!(ObjectId(100) < ObjectId(101));
        assert_eq!(ObjectId::from(100), ObjectId::FIRST);
        assert!(ObjectId(0x8000_0000) > ObjectId::MAX);
    }
}
