use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::HouseId;

/// Unordered pair of houses, stored in canonical (sorted) order so that
/// `(A, B)` and `(B, A)` are the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HousePair {
    first: HouseId,
    second: HouseId,
}

impl HousePair {
    pub fn new(a: HouseId, b: HouseId) -> Self {
        if a <= b {
            Self {
                first: a,
                second: b,
            }
        } else {
            Self {
                first: b,
                second: a,
            }
        }
    }

    pub fn of(a: &HouseId, b: &HouseId) -> Self {
        Self::new(a.clone(), b.clone())
    }

    pub fn first(&self) -> &HouseId {
        &self.first
    }

    pub fn second(&self) -> &HouseId {
        &self.second
    }
}

impl fmt::Display for HousePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} and {}", self.first, self.second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_is_unordered() {
        let a = HouseId::new("bear");
        let b = HouseId::new("wolf");
        assert_eq!(HousePair::of(&a, &b), HousePair::of(&b, &a));
        assert_eq!(HousePair::of(&b, &a).first(), &a);
    }
}
