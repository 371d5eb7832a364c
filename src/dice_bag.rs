use std::{fmt, str::FromStr};

use rand::Rng;

use crate::{dice_string_parser, dice_string_parser::DiceFormatError, wasm_safe};

pub type Value = i64;
pub type AggrValue = fraction::BigFraction;

/// One segment of a dice string.
///
/// Numeric bonuses are stored as one-sided dice, so `+7` becomes `7d1` and `-2` becomes `-2d1`.
/// A negative `quantity` subtracts the roll of that many dice.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "wasm", derive(serde::Serialize))]
pub struct Die {
    /// how many times the die is rolled, negative for subtracted dice
    pub quantity: Value,
    /// number of sides, always at least 1
    pub sides: Value,
}

impl Die {
    pub fn new(quantity: Value, sides: Value) -> Die {
        Die { quantity, sides }
    }

    pub fn constant(value: Value) -> Die {
        Die::new(value, 1)
    }

    pub fn is_constant(&self) -> bool {
        self.sides == 1
    }

    fn minimum(&self) -> Value {
        if self.quantity >= 0 {
            self.quantity
        } else {
            self.quantity * self.sides
        }
    }

    fn maximum(&self) -> Value {
        if self.quantity >= 0 {
            self.quantity * self.sides
        } else {
            self.quantity
        }
    }

    /// twice the expected value, which is always an integer
    fn doubled_mean(&self) -> Value {
        self.quantity * (1 + self.sides)
    }

    /// `[minimum, maximum, doubled_mean]`, or `None` if any of them overflows [`Value`]
    pub(crate) fn checked_bounds(&self) -> Option<[Value; 3]> {
        let scaled = self.quantity.checked_mul(self.sides)?;
        let doubled = self.quantity.checked_mul(self.sides.checked_add(1)?)?;
        if self.quantity >= 0 {
            Some([self.quantity, scaled, doubled])
        } else {
            Some([scaled, self.quantity, doubled])
        }
    }

    fn sample_using(&self, roll: &mut impl FnMut(Value) -> Value) -> Value {
        if self.is_constant() {
            return self.quantity;
        }
        let rolled: Value = (0..self.quantity.unsigned_abs())
            .map(|_| roll(self.sides))
            .sum();
        if self.quantity < 0 {
            -rolled
        } else {
            rolled
        }
    }
}

impl fmt::Display for Die {
    /// renders the magnitude only, the sign is written by [`DiceBag`]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quantity = self.quantity.unsigned_abs();
        if self.is_constant() {
            write!(f, "{quantity}")
        } else {
            write!(f, "{quantity}d{}", self.sides)
        }
    }
}

/// A [`DiceBag`] holds the dice of a dice string like `3d6+1-2d2` and answers questions about its rolls.
///
/// ```
/// use dicebag::DiceBag;
///
/// let bag = DiceBag::from_string("3d6+1-2d2").unwrap();
/// assert_eq!(bag.minimum(), 0);
/// assert_eq!(bag.maximum(), 17);
/// assert_eq!(bag.average(), 8);
/// ```
///
/// A bag is immutable once built. Every method except the `sample*` family is a pure function of the dice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceBag {
    dice_string: String,
    dice: Vec<Die>,
}

impl DiceBag {
    /// parses `input` into a [`DiceBag`]
    ///
    /// `input` may contain only `0-9`, `+`, `-`, `d` and whitespace. Whitespace is ignored.
    pub fn from_string(input: &str) -> Result<DiceBag, DiceFormatError> {
        let dice = dice_string_parser::string_to_dice(input)?;
        Ok(DiceBag {
            dice_string: input.to_owned(),
            dice,
        })
    }

    /// the string this bag was parsed from, unchanged
    pub fn dice_string(&self) -> &str {
        &self.dice_string
    }

    /// the dice in the order they appeared in the dice string
    pub fn dice(&self) -> &[Die] {
        &self.dice
    }

    /// the mean roll, truncated toward zero.
    ///
    /// Truncation happens once on the exact total, not per die: `3d2+3d2` averages 9, not 8.
    pub fn average(&self) -> Value {
        let doubled: Value = self.dice.iter().map(Die::doubled_mean).sum();
        doubled / 2
    }

    /// the exact mean roll
    pub fn mean(&self) -> AggrValue {
        let doubled: Value = self.dice.iter().map(Die::doubled_mean).sum();
        AggrValue::from(doubled) / AggrValue::from(2)
    }

    /// the lowest possible roll. Subtracted dice count at their highest face.
    pub fn minimum(&self) -> Value {
        self.dice.iter().map(Die::minimum).sum()
    }

    /// the highest possible roll. Subtracted dice count at their lowest face.
    pub fn maximum(&self) -> Value {
        self.dice.iter().map(Die::maximum).sum()
    }

    /// Rolls every die once and returns the total.
    ///
    /// Uses the thread local generator of [`rand`], or `Math.random()` when built with the `wasm` feature.
    ///
    /// # Examples
    ///
    /// ```
    /// use dicebag::DiceBag;
    ///
    /// let bag = DiceBag::from_string("2d6+3").unwrap();
    /// let rolled = bag.sample();
    /// assert!((5..=15).contains(&rolled));
    /// ```
    pub fn sample(&self) -> Value {
        self.sample_using(wasm_safe::roll_die)
    }

    /// like [`DiceBag::sample`], but draws from `rng`
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Value {
        self.sample_using(|sides| rng.gen_range(1..=sides))
    }

    /// samples the [`DiceBag`] `n` times and returns the results as a vector
    pub fn sample_multiple(&self, n: usize) -> Vec<Value> {
        (0..n).map(|_| self.sample()).collect()
    }

    fn sample_using(&self, mut roll: impl FnMut(Value) -> Value) -> Value {
        self.dice.iter().map(|die| die.sample_using(&mut roll)).sum()
    }
}

impl fmt::Display for DiceBag {
    /// writes the normalized dice string, e.g. `3d6 + 1 - 2d2`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, die) in self.dice.iter().enumerate() {
            match (i, die.quantity < 0) {
                (0, true) => write!(f, "-{die}")?,
                (0, false) => write!(f, "{die}")?,
                (_, true) => write!(f, " - {die}")?,
                (_, false) => write!(f, " + {die}")?,
            }
        }
        Ok(())
    }
}

impl FromStr for DiceBag {
    type Err = DiceFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceBag::from_string(s)
    }
}

impl TryFrom<&str> for DiceBag {
    type Error = DiceFormatError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        DiceBag::from_string(value)
    }
}
