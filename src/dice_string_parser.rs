use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use super::dice_bag::{Die, Value};

/// Reasons a string cannot be turned into a [`DiceBag`](crate::DiceBag).
///
/// Every variant keeps the original `input`, segment level variants also name the offending segment.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DiceFormatError {
    #[error("invalid dice string {input:?}: contains invalid characters (only 0-9, +, -, d and spaces are allowed)")]
    InvalidCharacters { input: String },
    #[error("invalid dice string {input:?}: contains no dice")]
    Empty { input: String },
    #[error("invalid dice string {input:?}: segment {segment:?} does not match die-roll or constant grammar")]
    InvalidSegment { input: String, segment: String },
    #[error("invalid dice string {input:?}: number in segment {segment:?} is out of range")]
    NumberOutOfRange { input: String, segment: String },
    #[error("invalid dice string {input:?}: die in segment {segment:?} has zero sides")]
    ZeroSides { input: String, segment: String },
}

fn valid_dice_regex() -> &'static Regex {
    static VALID_DICE: OnceLock<Regex> = OnceLock::new();
    VALID_DICE.get_or_init(|| Regex::new(r"^[0-9\sd+-]+$").expect("dice charset regex must compile"))
}

fn die_roll_regex() -> &'static Regex {
    // 2d3, -1d2, +10d10
    static DIE_ROLL: OnceLock<Regex> = OnceLock::new();
    DIE_ROLL.get_or_init(|| Regex::new(r"^([+-]?[0-9]+)d([0-9]+)$").expect("die roll regex must compile"))
}

fn die_bonus_regex() -> &'static Regex {
    // +3, -1, 17
    static DIE_BONUS: OnceLock<Regex> = OnceLock::new();
    DIE_BONUS.get_or_init(|| Regex::new(r"^([+-]?[0-9]+)$").expect("die bonus regex must compile"))
}

/// parses a dice string like `3d6+1-2d2` into its dice, in left-to-right order.
///
/// Constants are normalized to one-sided dice, so `7` becomes `7d1`.
pub fn string_to_dice(input: &str) -> Result<Vec<Die>, DiceFormatError> {
    if !valid_dice_regex().is_match(input) {
        log::debug!("rejected dice string {input:?}: invalid characters");
        return Err(DiceFormatError::InvalidCharacters {
            input: input.to_owned(),
        });
    }
    let cleaned = string_utils::clean_string(input);
    if cleaned.is_empty() {
        log::debug!("rejected dice string {input:?}: only whitespace");
        return Err(DiceFormatError::Empty {
            input: input.to_owned(),
        });
    }

    let segments = string_utils::segments(&cleaned);
    let dice = segments
        .iter()
        .map(|segment| segment_to_die(input, segment))
        .collect::<Result<Vec<Die>, DiceFormatError>>()?;
    check_totals(input, &segments, &dice)?;

    log::trace!("parsed dice string {input:?} into {dice:?}");
    Ok(dice)
}

fn segment_to_die(input: &str, segment: &str) -> Result<Die, DiceFormatError> {
    if let Some(caps) = die_roll_regex().captures(segment) {
        let quantity = parse_value(input, segment, &caps[1])?;
        let sides = parse_value(input, segment, &caps[2])?;
        if sides == 0 {
            log::debug!("rejected dice string {input:?}: zero-sided die in {segment:?}");
            return Err(DiceFormatError::ZeroSides {
                input: input.to_owned(),
                segment: segment.to_owned(),
            });
        }
        return Ok(Die::new(quantity, sides));
    }
    if let Some(caps) = die_bonus_regex().captures(segment) {
        let bonus = parse_value(input, segment, &caps[1])?;
        return Ok(Die::constant(bonus));
    }
    log::debug!("rejected dice string {input:?}: unsupported segment {segment:?}");
    Err(DiceFormatError::InvalidSegment {
        input: input.to_owned(),
        segment: segment.to_owned(),
    })
}

/// rejects dice whose minimum, maximum or doubled mean, alone or as a running total, leaves [`Value`].
///
/// Samples always lie between the running minimum and maximum, so evaluation cannot overflow afterwards.
fn check_totals(input: &str, segments: &[&str], dice: &[Die]) -> Result<(), DiceFormatError> {
    let mut totals: [Value; 3] = [0; 3];
    for (segment, die) in segments.iter().zip(dice) {
        let summed = die.checked_bounds().and_then(|bounds| {
            let mut next = totals;
            for (total, bound) in next.iter_mut().zip(bounds) {
                *total = total.checked_add(bound)?;
            }
            Some(next)
        });
        match summed {
            Some(next) => totals = next,
            None => {
                log::debug!("rejected dice string {input:?}: {segment:?} overflows");
                return Err(DiceFormatError::NumberOutOfRange {
                    input: input.to_owned(),
                    segment: (*segment).to_owned(),
                });
            }
        }
    }
    Ok(())
}

fn parse_value(input: &str, segment: &str, digits: &str) -> Result<Value, DiceFormatError> {
    digits
        .parse::<Value>()
        .map_err(|_| DiceFormatError::NumberOutOfRange {
            input: input.to_owned(),
            segment: segment.to_owned(),
        })
}

mod string_utils {
    /// strips all whitespace
    pub fn clean_string(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    /// splits a cleaned dice string in front of every `+` and `-`.
    ///
    /// Each segment keeps its leading sign. A sign without a body still yields a segment,
    /// so `2d6+` gives `["2d6", "+"]` and the grammar check rejects the dangling `+`.
    pub fn segments(s: &str) -> Vec<&str> {
        let mut segments: Vec<&str> = vec![];
        let mut start = 0;
        for (i, c) in s.char_indices() {
            if (c == '+' || c == '-') && i > start {
                segments.push(&s[start..i]);
                start = i;
            }
        }
        if start < s.len() {
            segments.push(&s[start..]);
        }
        segments
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn clean_string_test() {
        let cleaned = string_utils::clean_string(" 3d6 +\t1 -  2d2\n");
        assert_eq!(cleaned, "3d6+1-2d2");
    }

    #[test]
    fn segments_test() {
        assert_eq!(
            string_utils::segments("3d6+1-2d2"),
            vec!["3d6", "+1", "-2d2"]
        );
        assert_eq!(string_utils::segments("-4+7"), vec!["-4", "+7"]);
        assert_eq!(string_utils::segments("17"), vec!["17"]);
        assert_eq!(string_utils::segments("2d6+"), vec!["2d6", "+"]);
        assert_eq!(string_utils::segments("1--2"), vec!["1", "-", "-2"]);
    }

    #[test]
    fn string_to_dice_1() {
        let real = string_to_dice("3d6+1-2d2").unwrap();
        let expected = vec![Die::new(3, 6), Die::new(1, 1), Die::new(-2, 2)];
        assert_eq!(real, expected);
    }

    #[test]
    fn string_to_dice_2() {
        let real = string_to_dice("  4 d32 - 3 ").unwrap();
        let expected = vec![Die::new(4, 32), Die::new(-3, 1)];
        assert_eq!(real, expected);
    }

    #[test]
    fn leading_plus_and_zero_quantity() {
        let real = string_to_dice("+0d6+2").unwrap();
        assert_eq!(real, vec![Die::new(0, 6), Die::new(2, 1)]);
    }

    #[test]
    fn invalid_characters() {
        assert_eq!(
            string_to_dice("2x6"),
            Err(DiceFormatError::InvalidCharacters {
                input: "2x6".to_owned()
            })
        );
        assert!(matches!(
            string_to_dice("2d6*2"),
            Err(DiceFormatError::InvalidCharacters { .. })
        ));
        assert!(matches!(
            string_to_dice("2D6"),
            Err(DiceFormatError::InvalidCharacters { .. })
        ));
        assert!(matches!(
            string_to_dice(""),
            Err(DiceFormatError::InvalidCharacters { .. })
        ));
    }

    #[test]
    fn whitespace_only_is_empty() {
        assert_eq!(
            string_to_dice("   "),
            Err(DiceFormatError::Empty {
                input: "   ".to_owned()
            })
        );
    }

    #[test]
    fn missing_quantity() {
        assert_eq!(
            string_to_dice("d6"),
            Err(DiceFormatError::InvalidSegment {
                input: "d6".to_owned(),
                segment: "d6".to_owned()
            })
        );
        assert_eq!(
            string_to_dice("1+d6"),
            Err(DiceFormatError::InvalidSegment {
                input: "1+d6".to_owned(),
                segment: "+d6".to_owned()
            })
        );
    }

    #[test]
    fn malformed_segments() {
        for input in ["2d", "1d2d3", "2d6+", "1--2", "+", "-", "dd"] {
            assert!(
                matches!(
                    string_to_dice(input),
                    Err(DiceFormatError::InvalidSegment { .. })
                ),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn zero_sides() {
        assert_eq!(
            string_to_dice("2+1d0"),
            Err(DiceFormatError::ZeroSides {
                input: "2+1d0".to_owned(),
                segment: "+1d0".to_owned()
            })
        );
    }

    #[test]
    fn number_out_of_range() {
        let input = "99999999999999999999d6";
        assert_eq!(
            string_to_dice(input),
            Err(DiceFormatError::NumberOutOfRange {
                input: input.to_owned(),
                segment: input.to_owned()
            })
        );
    }

    #[test]
    fn evaluation_overflow_is_rejected() {
        // doubling for the mean leaves i64
        assert_eq!(
            string_to_dice("5000000000000000000"),
            Err(DiceFormatError::NumberOutOfRange {
                input: "5000000000000000000".to_owned(),
                segment: "5000000000000000000".to_owned()
            })
        );
        // quantity * sides leaves i64
        assert_eq!(
            string_to_dice("9999999999d9999999999"),
            Err(DiceFormatError::NumberOutOfRange {
                input: "9999999999d9999999999".to_owned(),
                segment: "9999999999d9999999999".to_owned()
            })
        );
        assert!(matches!(
            string_to_dice("-9223372036854775808"),
            Err(DiceFormatError::NumberOutOfRange { .. })
        ));
    }

    #[test]
    fn running_total_overflow_names_segment() {
        let input = "4000000000000000000+4000000000000000000";
        assert_eq!(
            string_to_dice(input),
            Err(DiceFormatError::NumberOutOfRange {
                input: input.to_owned(),
                segment: "+4000000000000000000".to_owned()
            })
        );
    }

    #[test]
    fn large_but_fitting_dice_are_kept() {
        let real = string_to_dice("3000000000000000000-1000000d1000").unwrap();
        assert_eq!(
            real,
            vec![Die::new(3_000_000_000_000_000_000, 1), Die::new(-1_000_000, 1000)]
        );
    }

    #[test]
    fn error_messages_name_segment() {
        let err = string_to_dice("3d6+d4").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("\"+d4\""), "{msg}");
        assert!(msg.contains("does not match die-roll or constant grammar"));

        let err = string_to_dice("2x6").unwrap_err();
        assert!(err.to_string().contains("contains invalid characters"));
    }
}
