use serde::{
    Serialize,
    ser::{SerializeSeq, Serializer},
};

/// A `Location` represents a byte range in a source file.
///
/// `start` is inclusive, `end` is exclusive. Both are byte offsets into the text that
/// was handed to the parser, so they are always on UTF-8 character boundaries.
#[derive(Debug, Default, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Location {
    /// The absolute start offset of the location.
    pub start: usize,
    /// The absolute end offset of the location.
    pub end: usize,
}

impl Location {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Check whether `offset` is inside this location.
    ///
    /// Both ends are inclusive so that a cursor placed right after the last character of
    /// an identifier still selects it.
    #[must_use]
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// Check whether `other` lies completely inside this location.
    #[must_use]
    pub fn encloses(&self, other: &Location) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest location covering both `self` and `other`.
    #[must_use]
    pub fn join(&self, other: &Location) -> Location {
        Location {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Validates that this location is a valid range of `input`.
    ///
    /// # Errors
    /// Returned as strings for easier debugging.
    pub fn validate(&self, input: &str) -> Result<(), String> {
        if self.start > self.end {
            return Err(format!(
                "Invalid range: start {} > end {}",
                self.start, self.end
            ));
        }
        if self.end > input.len() {
            return Err(format!(
                "End offset {} exceeds input length {}",
                self.end,
                input.len()
            ));
        }
        if !input.is_char_boundary(self.start) || !input.is_char_boundary(self.end) {
            return Err(format!(
                "Range {}..{} not on UTF-8 boundaries",
                self.start, self.end
            ));
        }
        Ok(())
    }
}

// Locations are serialized as a compact `[start, end]` pair, which keeps dumped syntax
// trees readable.
impl Serialize for Location {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_seq(Some(2))?;
        state.serialize_element(&self.start)?;
        state.serialize_element(&self.end)?;
        state.end()
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_inclusive() {
        let location = Location::new(10, 20);
        assert!(!location.contains(9));
        assert!(location.contains(10));
        assert!(location.contains(15));
        assert!(location.contains(20));
        assert!(!location.contains(21));
    }

    #[test]
    fn test_join_and_encloses() {
        let a = Location::new(4, 8);
        let b = Location::new(6, 12);
        let joined = a.join(&b);
        assert_eq!(joined, Location::new(4, 12));
        assert!(joined.encloses(&a));
        assert!(joined.encloses(&b));
        assert!(!a.encloses(&b));
    }

    #[test]
    fn test_validate() {
        let input = "héllo";
        assert!(Location::new(0, 1).validate(input).is_ok());
        assert!(Location::new(0, 2).validate(input).is_err());
        assert!(Location::new(3, 2).validate(input).is_err());
        assert!(Location::new(0, 10).validate(input).is_err());
    }
}
