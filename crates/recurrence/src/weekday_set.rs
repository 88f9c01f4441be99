//! Compact set of civil weekdays (0=Sunday..6=Saturday).

use std::collections::BTreeSet;

/// Bit `n` set means civil weekday `n` is included.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const ALL: WeekdaySet = WeekdaySet(0b0111_1111);
    /// Monday to Friday.
    pub const WORKWEEK: WeekdaySet = WeekdaySet(0b0011_1110);

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, civil: u8) {
        if civil < 7 {
            self.0 |= 1 << civil;
        }
    }

    pub fn contains(&self, civil: u8) -> bool {
        civil < 7 && self.0 & (1 << civil) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..7u8).filter(move |d| self.contains(*d))
    }

    pub fn to_btree_set(&self) -> BTreeSet<u8> {
        self.iter().collect()
    }
}

impl FromIterator<u8> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = WeekdaySet::empty();
        for day in iter {
            set.insert(day);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workweek_is_monday_to_friday() {
        let days: Vec<u8> = WeekdaySet::WORKWEEK.iter().collect();
        assert_eq!(days, vec![1, 2, 3, 4, 5]);
        assert_eq!(WeekdaySet::ALL.len(), 7);
    }

    #[test]
    fn out_of_range_days_are_ignored() {
        let set: WeekdaySet = [0, 6, 9].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(!set.contains(9));
    }
}
