//! Nine-axis machine position record.

use std::fmt;
use std::ops::{Index, IndexMut};

use crate::Point3;

/// Values for the nine machine axes X Y Z A B C U V W.
///
/// Used both for move end points and for tool offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Axes([f64; 9]);

impl Axes {
    /// Axis letters in storage order.
    pub const AXES: &'static str = "XYZABCUVW";

    /// All axes at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every axis set to `value`.
    pub fn splat(value: f64) -> Self {
        Self([value; 9])
    }

    /// Position with X, Y and Z set and the rest zero.
    pub fn from_xyz(p: &Point3) -> Self {
        let mut axes = Self::default();
        axes.set_xyz(p);
        axes
    }

    /// Storage index for an axis letter (case-insensitive).
    pub fn index_of(letter: char) -> Option<usize> {
        let upper = letter.to_ascii_uppercase();
        Self::AXES.chars().position(|c| c == upper)
    }

    /// Axis letter for a storage index.
    pub fn letter(index: usize) -> Option<char> {
        Self::AXES.chars().nth(index)
    }

    /// Value of the axis named by `letter`.
    pub fn get(&self, letter: char) -> Option<f64> {
        Self::index_of(letter).map(|i| self.0[i])
    }

    /// Set the axis named by `letter`. Returns false for unknown letters.
    pub fn set(&mut self, letter: char, value: f64) -> bool {
        match Self::index_of(letter) {
            Some(i) => {
                self.0[i] = value;
                true
            }
            None => false,
        }
    }

    /// The linear X, Y, Z part.
    pub fn xyz(&self) -> Point3 {
        Point3::new(self.0[0], self.0[1], self.0[2])
    }

    /// Replace the linear X, Y, Z part.
    pub fn set_xyz(&mut self, p: &Point3) {
        self.0[0] = p.x;
        self.0[1] = p.y;
        self.0[2] = p.z;
    }

    /// Set every axis to zero.
    pub fn clear(&mut self) {
        self.0 = [0.0; 9];
    }

    /// Raw values in storage order.
    pub fn values(&self) -> &[f64; 9] {
        &self.0
    }
}

impl Index<usize> for Axes {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl IndexMut<usize> for Axes {
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.0[index]
    }
}

/// Writes the non-zero axes, each preceded by a space: ` X1 Z-2`.
impl fmt::Display for Axes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (letter, value) in Self::AXES.chars().zip(self.0.iter()) {
            if *value != 0.0 {
                write!(f, " {}{}", letter, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_lookup() {
        assert_eq!(Axes::index_of('x'), Some(0));
        assert_eq!(Axes::index_of('W'), Some(8));
        assert_eq!(Axes::index_of('Q'), None);
        assert_eq!(Axes::letter(3), Some('A'));
        assert_eq!(Axes::letter(9), None);
    }

    #[test]
    fn test_get_set() {
        let mut a = Axes::new();
        assert!(a.set('b', 2.5));
        assert!(!a.set('q', 1.0));
        assert_eq!(a.get('B'), Some(2.5));
        assert_eq!(a[4], 2.5);
    }

    #[test]
    fn test_xyz() {
        let p = Point3::new(1.0, 2.0, 3.0);
        let mut a = Axes::from_xyz(&p);
        assert_eq!(a.xyz(), p);
        a.clear();
        assert_eq!(a, Axes::new());
    }

    #[test]
    fn test_display_skips_zero_axes() {
        let mut a = Axes::new();
        a.set('X', 1.0);
        a.set('Z', -2.0);
        assert_eq!(a.to_string(), " X1 Z-2");
        assert_eq!(Axes::new().to_string(), "");
    }
}
