//! Hexagram derivation from three user-supplied numbers.
//!
//! Three integers become a coordinate pair (`"X-Y"`, `"N"`): `X` selects the
//! upper trigram, `Y` the lower trigram, and `N` the single changing line.
//! From that pair the initial hexagram and its transformed counterpart are
//! built as six-line sequences, index 0 being the bottom line.
//!
//! Every function here is total. Malformed input degrades to a well-defined
//! default (all lines broken) so rendering never fails.

use serde::{Deserialize, Serialize};

/* --------------------------------------------------------------------------
Lines and trigrams
-------------------------------------------------------------------------- */

/// A single hexagram line: solid (yang) or broken (yin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Line {
    Solid,
    Broken,
}

impl Line {
    /// The opposite line (solid becomes broken and vice versa).
    pub fn flipped(self) -> Self {
        match self {
            Line::Solid => Line::Broken,
            Line::Broken => Line::Solid,
        }
    }
}

/// Six lines, index 0 is the bottom line and index 5 the top.
pub type HexagramLines = [Line; 6];

/// Returned for any malformed input.
pub const DEFAULT_HEXAGRAM: HexagramLines = [Line::Broken; 6];

use Line::{Broken as B, Solid as S};

/// Trigram line patterns keyed by digit, listed top-to-bottom.
const TRIGRAM_TABLE: [[Line; 3]; 8] = [
    [B, B, B], // 0
    [S, S, S], // 1
    [B, S, S], // 2
    [S, B, S], // 3
    [B, B, S], // 4
    [S, S, B], // 5
    [B, S, B], // 6
    [S, B, B], // 7
];

/// Child coordinate -> index of the line that flips.
const CHANGING_LINE_REMAP: [usize; 6] = [5, 0, 1, 2, 3, 4];

/// The eight trigrams of the Ba Gua.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigram {
    Qian,
    Dui,
    Li,
    Zhen,
    Xun,
    Kan,
    Gen,
    Kun,
}

impl Trigram {
    /// Trigram for a digit 0-7. Values outside that range wrap modulo 8.
    pub fn from_digit(digit: u8) -> Self {
        match digit % 8 {
            1 => Trigram::Qian,
            2 => Trigram::Dui,
            3 => Trigram::Li,
            4 => Trigram::Zhen,
            5 => Trigram::Xun,
            6 => Trigram::Kan,
            7 => Trigram::Gen,
            _ => Trigram::Kun,
        }
    }

    /// The digit this trigram is keyed by in coordinates.
    pub fn digit(self) -> u8 {
        match self {
            Trigram::Kun => 0,
            Trigram::Qian => 1,
            Trigram::Dui => 2,
            Trigram::Li => 3,
            Trigram::Zhen => 4,
            Trigram::Xun => 5,
            Trigram::Kan => 6,
            Trigram::Gen => 7,
        }
    }

    /// Line pattern, top line first.
    pub fn lines_top_down(self) -> [Line; 3] {
        TRIGRAM_TABLE[self.digit() as usize]
    }

    /// Identify a trigram from its lines listed bottom line first.
    pub fn from_lines_bottom_up(lines: [Line; 3]) -> Self {
        let top_down = [lines[2], lines[1], lines[0]];
        TRIGRAM_TABLE
            .iter()
            .position(|pattern| *pattern == top_down)
            .map(|digit| Trigram::from_digit(digit as u8))
            .unwrap_or(Trigram::Kun)
    }

    pub fn name(self) -> &'static str {
        match self {
            Trigram::Qian => "Qian",
            Trigram::Dui => "Dui",
            Trigram::Li => "Li",
            Trigram::Zhen => "Zhen",
            Trigram::Xun => "Xun",
            Trigram::Kan => "Kan",
            Trigram::Gen => "Gen",
            Trigram::Kun => "Kun",
        }
    }

    /// The natural image traditionally associated with the trigram.
    pub fn image(self) -> &'static str {
        match self {
            Trigram::Qian => "Heaven",
            Trigram::Dui => "Lake",
            Trigram::Li => "Fire",
            Trigram::Zhen => "Thunder",
            Trigram::Xun => "Wind",
            Trigram::Kan => "Water",
            Trigram::Gen => "Mountain",
            Trigram::Kun => "Earth",
        }
    }

    /// Row/column position in [`KING_WEN`].
    fn king_wen_index(self) -> usize {
        match self {
            Trigram::Qian => 0,
            Trigram::Zhen => 1,
            Trigram::Kan => 2,
            Trigram::Gen => 3,
            Trigram::Kun => 4,
            Trigram::Xun => 5,
            Trigram::Li => 6,
            Trigram::Dui => 7,
        }
    }
}

/* --------------------------------------------------------------------------
King Wen sequence
-------------------------------------------------------------------------- */

/// King Wen numbers indexed `[lower][upper]`, both in the order
/// Qian, Zhen, Kan, Gen, Kun, Xun, Li, Dui.
const KING_WEN: [[u8; 8]; 8] = [
    [1, 34, 5, 26, 11, 9, 14, 43],
    [25, 51, 3, 27, 24, 42, 21, 17],
    [6, 40, 29, 4, 7, 59, 64, 47],
    [33, 62, 39, 52, 15, 53, 56, 31],
    [12, 16, 8, 23, 2, 20, 35, 45],
    [44, 32, 48, 18, 46, 57, 50, 28],
    [13, 55, 63, 22, 36, 37, 30, 49],
    [10, 54, 60, 41, 19, 61, 38, 58],
];

/// English hexagram names, index `n - 1` for King Wen number `n`.
const HEXAGRAM_NAMES: [&str; 64] = [
    "The Creative",
    "The Receptive",
    "Difficulty at the Beginning",
    "Youthful Folly",
    "Waiting",
    "Conflict",
    "The Army",
    "Holding Together",
    "Small Taming",
    "Treading",
    "Peace",
    "Standstill",
    "Fellowship",
    "Great Possession",
    "Modesty",
    "Enthusiasm",
    "Following",
    "Work on the Decayed",
    "Approach",
    "Contemplation",
    "Biting Through",
    "Grace",
    "Splitting Apart",
    "Return",
    "Innocence",
    "Great Taming",
    "Nourishment",
    "Preponderance of the Great",
    "The Abysmal",
    "The Clinging",
    "Influence",
    "Duration",
    "Retreat",
    "Great Power",
    "Progress",
    "Darkening of the Light",
    "The Family",
    "Opposition",
    "Obstruction",
    "Deliverance",
    "Decrease",
    "Increase",
    "Breakthrough",
    "Coming to Meet",
    "Gathering Together",
    "Pushing Upward",
    "Oppression",
    "The Well",
    "Revolution",
    "The Cauldron",
    "The Arousing",
    "Keeping Still",
    "Development",
    "The Marrying Maiden",
    "Abundance",
    "The Wanderer",
    "The Gentle",
    "The Joyous",
    "Dispersion",
    "Limitation",
    "Inner Truth",
    "Small Preponderance",
    "After Completion",
    "Before Completion",
];

/// Identity of a hexagram in the King Wen sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HexagramInfo {
    /// King Wen number, 1-64.
    pub number: u8,
    pub name: &'static str,
    pub upper: Trigram,
    pub lower: Trigram,
}

/// Look up the King Wen number and name of a six-line hexagram.
pub fn identify(lines: &HexagramLines) -> HexagramInfo {
    let lower = Trigram::from_lines_bottom_up([lines[0], lines[1], lines[2]]);
    let upper = Trigram::from_lines_bottom_up([lines[3], lines[4], lines[5]]);
    let number = KING_WEN[lower.king_wen_index()][upper.king_wen_index()];
    HexagramInfo {
        number,
        name: HEXAGRAM_NAMES[(number - 1) as usize],
        upper,
        lower,
    }
}

/* --------------------------------------------------------------------------
Coordinates
-------------------------------------------------------------------------- */

/// Parent (`"X-Y"`) and child (`"N"`) coordinates of a reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatePair {
    /// Upper and lower trigram digits, each 0-7.
    pub parent: String,
    /// Changing-line coordinate, 0-5.
    pub child: String,
}

/// Parse user input as an integer without failing.
///
/// Integers parse directly. Other finite numbers become their absolute value,
/// floored, so `-2.5` reads as `2`. Anything else (empty, non-numeric, NaN,
/// infinite) becomes `0`.
pub fn lenient_number(raw: &str) -> i64 {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return n;
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => f.abs().floor().min(i64::MAX as f64) as i64,
        _ => 0,
    }
}

/// Derive the coordinate pair from three integers.
///
/// `X = |n1| mod 8`, `Y = |n2| mod 8`, `N = |n3| mod 6`, so any integer,
/// negative or beyond 999, lands in range.
pub fn coordinates_from_numbers(n1: i64, n2: i64, n3: i64) -> CoordinatePair {
    let upper = n1.unsigned_abs() % 8;
    let lower = n2.unsigned_abs() % 8;
    let child = n3.unsigned_abs() % 6;
    CoordinatePair {
        parent: format!("{upper}-{lower}"),
        child: child.to_string(),
    }
}

/// Same as [`coordinates_from_numbers`] for raw text input.
pub fn coordinates_from_input(n1: &str, n2: &str, n3: &str) -> CoordinatePair {
    coordinates_from_numbers(lenient_number(n1), lenient_number(n2), lenient_number(n3))
}

/// Parse a parent coordinate into `(upper, lower)` digits.
///
/// Both parts must be a single digit 0-7; anything else is malformed.
fn parse_parent(parent: &str) -> Option<(u8, u8)> {
    let (upper, lower) = parent.trim().split_once('-')?;
    let digit = |part: &str| -> Option<u8> {
        let part = part.trim();
        if part.len() != 1 {
            return None;
        }
        part.parse::<u8>().ok().filter(|d| *d < 8)
    };
    Some((digit(upper)?, digit(lower)?))
}

/* --------------------------------------------------------------------------
Line derivation
-------------------------------------------------------------------------- */

/// Trigram lines for a digit, top-to-bottom. Wraps `|digit| mod 8`.
pub fn trigram_lines(digit: i64) -> [Line; 3] {
    TRIGRAM_TABLE[(digit.unsigned_abs() % 8) as usize]
}

/// Trigram lines for raw text; non-numeric input resolves to digit 0.
pub fn trigram_lines_str(raw: &str) -> [Line; 3] {
    trigram_lines(lenient_number(raw))
}

/// Initial hexagram for a parent coordinate, bottom line first.
///
/// The lower trigram supplies lines 0-2 and the upper trigram lines 3-5, each
/// reversed from its top-down table order. A malformed coordinate yields
/// [`DEFAULT_HEXAGRAM`].
pub fn initial_hexagram_lines(parent: &str) -> HexagramLines {
    let Some((upper, lower)) = parse_parent(parent) else {
        return DEFAULT_HEXAGRAM;
    };
    let top = TRIGRAM_TABLE[upper as usize];
    let bottom = TRIGRAM_TABLE[lower as usize];
    [bottom[2], bottom[1], bottom[0], top[2], top[1], top[0]]
}

/// Index (0 = bottom) of the line flipped for a child coordinate.
///
/// Coordinate 0 flips the top line; 1 through 5 flip lines 0 through 4.
pub fn changing_line_index(child: i64) -> usize {
    CHANGING_LINE_REMAP[(child.unsigned_abs() % 6) as usize]
}

/// Transformed hexagram: `initial` with exactly one line flipped.
///
/// Anything other than six lines yields [`DEFAULT_HEXAGRAM`].
pub fn transformed_hexagram_lines(initial: &[Line], child: i64) -> HexagramLines {
    let Ok(mut lines) = <HexagramLines>::try_from(initial) else {
        return DEFAULT_HEXAGRAM;
    };
    let index = changing_line_index(child);
    lines[index] = lines[index].flipped();
    lines
}

/* --------------------------------------------------------------------------
Full pipeline
-------------------------------------------------------------------------- */

/// Everything needed to render a reading's two hexagrams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Divination {
    pub coordinates: CoordinatePair,
    pub initial_lines: HexagramLines,
    pub transformed_lines: HexagramLines,
    /// Index (0 = bottom) of the changing line.
    pub changing_line: usize,
    pub initial: HexagramInfo,
    pub transformed: HexagramInfo,
}

/// Run the whole derivation for three numbers.
pub fn derive_divination(n1: i64, n2: i64, n3: i64) -> Divination {
    let coordinates = coordinates_from_numbers(n1, n2, n3);
    let child = lenient_number(&coordinates.child);
    let initial_lines = initial_hexagram_lines(&coordinates.parent);
    let transformed_lines = transformed_hexagram_lines(&initial_lines, child);
    Divination {
        initial: identify(&initial_lines),
        transformed: identify(&transformed_lines),
        changing_line: changing_line_index(child),
        coordinates,
        initial_lines,
        transformed_lines,
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    // -- coordinates --

    #[test]
    fn coordinates_known_vector() {
        let pair = coordinates_from_numbers(12, 19, 7);
        assert_eq!(pair.parent, "4-3");
        assert_eq!(pair.child, "1");
    }

    #[test]
    fn coordinates_stay_in_range_for_extreme_inputs() {
        let inputs = [
            (0, 0, 0),
            (-1, -9, -13),
            (999, 1000, 1001),
            (i64::MIN, i64::MAX, i64::MIN),
            (-8, 16, -6),
        ];
        for (a, b, c) in inputs {
            let pair = coordinates_from_numbers(a, b, c);
            let (upper, lower) = parse_parent(&pair.parent).expect("parent must be well-formed");
            assert!(upper < 8 && lower < 8, "{pair:?}");
            let child: u8 = pair.child.parse().unwrap();
            assert!(child < 6, "{pair:?}");
        }
    }

    #[test]
    fn negative_numbers_use_absolute_value() {
        assert_eq!(
            coordinates_from_numbers(-12, -19, -7),
            coordinates_from_numbers(12, 19, 7)
        );
    }

    #[test]
    fn coordinates_from_text_input() {
        assert_eq!(coordinates_from_input("12", " 19 ", "7.9").parent, "4-3");
        assert_eq!(coordinates_from_input("12", "19", "7.9").child, "1");
        assert_eq!(coordinates_from_input("abc", "", "x").parent, "0-0");
    }

    #[test]
    fn lenient_number_handles_garbage() {
        assert_eq!(lenient_number("42"), 42);
        assert_eq!(lenient_number("-3"), -3);
        assert_eq!(lenient_number("2.7"), 2);
        assert_eq!(lenient_number("-2.5"), 2);
        assert_eq!(lenient_number("-0.9"), 0);
        assert_eq!(lenient_number("NaN"), 0);
        assert_eq!(lenient_number("inf"), 0);
        assert_eq!(lenient_number("twelve"), 0);
    }

    // -- trigrams --

    #[test]
    fn trigram_lines_known_vectors() {
        assert_eq!(trigram_lines(1), [S, S, S]);
        assert_eq!(trigram_lines(0), [B, B, B]);
        assert_eq!(trigram_lines(8), trigram_lines(0));
        assert_eq!(trigram_lines(4), [B, B, S]);
    }

    #[test]
    fn trigram_lines_non_numeric_is_digit_zero() {
        assert_eq!(trigram_lines_str("?"), [B, B, B]);
        assert_eq!(trigram_lines_str("5"), [S, S, B]);
    }

    #[test]
    fn trigram_digit_round_trips_through_lines() {
        for digit in 0..8u8 {
            let trigram = Trigram::from_digit(digit);
            assert_eq!(trigram.digit(), digit);
            let top_down = trigram.lines_top_down();
            let bottom_up = [top_down[2], top_down[1], top_down[0]];
            assert_eq!(Trigram::from_lines_bottom_up(bottom_up), trigram);
        }
    }

    // -- initial hexagram --

    #[test]
    fn initial_hexagram_known_vector() {
        assert_eq!(initial_hexagram_lines("4-5"), [B, S, S, S, B, B]);
    }

    #[test]
    fn malformed_parent_yields_default() {
        for bad in ["bad-input", "abc", "", "9-9", "4", "4-", "-5", "44-5", "4-5-6"] {
            assert_eq!(initial_hexagram_lines(bad), DEFAULT_HEXAGRAM, "input {bad:?}");
        }
    }

    #[test]
    fn all_parent_coordinates_produce_six_lines_from_both_trigrams() {
        for upper in 0..8i64 {
            for lower in 0..8i64 {
                let lines = initial_hexagram_lines(&format!("{upper}-{lower}"));
                let top = trigram_lines(upper);
                let bottom = trigram_lines(lower);
                assert_eq!(&lines[..3], &[bottom[2], bottom[1], bottom[0]]);
                assert_eq!(&lines[3..], &[top[2], top[1], top[0]]);
            }
        }
    }

    // -- transformed hexagram --

    #[test]
    fn child_zero_flips_top_line() {
        let lines = transformed_hexagram_lines(&[S; 6], 0);
        assert_eq!(lines, [S, S, S, S, S, B]);
    }

    #[test]
    fn remap_is_one_off_rotation() {
        assert_eq!(changing_line_index(0), 5);
        assert_eq!(changing_line_index(1), 0);
        assert_eq!(changing_line_index(5), 4);
        assert_eq!(changing_line_index(-7), 0);
    }

    #[test]
    fn exactly_one_line_flips() {
        let initial = initial_hexagram_lines("3-6");
        for child in 0..6 {
            let transformed = transformed_hexagram_lines(&initial, child);
            let diffs = initial
                .iter()
                .zip(transformed.iter())
                .filter(|(a, b)| a != b)
                .count();
            assert_eq!(diffs, 1, "child {child}");
        }
    }

    #[test]
    fn wrong_length_yields_default() {
        assert_eq!(transformed_hexagram_lines(&[S; 5], 2), DEFAULT_HEXAGRAM);
        assert_eq!(transformed_hexagram_lines(&[], 0), DEFAULT_HEXAGRAM);
        assert_eq!(transformed_hexagram_lines(&[S; 7], 0), DEFAULT_HEXAGRAM);
    }

    // -- King Wen --

    #[test]
    fn king_wen_table_covers_all_64() {
        let numbers: HashSet<u8> = KING_WEN.iter().flatten().copied().collect();
        assert_eq!(numbers.len(), 64);
        assert!(numbers.iter().all(|n| (1..=64).contains(n)));
    }

    #[test]
    fn identify_known_hexagrams() {
        let creative = identify(&[S; 6]);
        assert_eq!(creative.number, 1);
        assert_eq!(creative.name, "The Creative");

        let receptive = identify(&DEFAULT_HEXAGRAM);
        assert_eq!(receptive.number, 2);

        // Thunder over wind.
        let duration = identify(&initial_hexagram_lines("4-5"));
        assert_eq!(duration.upper, Trigram::Zhen);
        assert_eq!(duration.lower, Trigram::Xun);
        assert_eq!(duration.number, 32);
        assert_eq!(duration.name, "Duration");

        // Water over fire.
        let after = identify(&[S, B, S, B, S, B]);
        assert_eq!(after.number, 63);
    }

    // -- pipeline --

    #[test]
    fn derivation_is_deterministic() {
        let a = derive_divination(123, 456, 789);
        let b = derive_divination(123, 456, 789);
        assert_eq!(a, b);
    }

    #[test]
    fn derivation_links_initial_and_transformed() {
        let d = derive_divination(12, 19, 7);
        assert_eq!(d.coordinates.parent, "4-3");
        assert_eq!(d.changing_line, 0);
        assert_eq!(d.transformed_lines[0], d.initial_lines[0].flipped());
        assert_eq!(&d.transformed_lines[1..], &d.initial_lines[1..]);
    }

    #[test]
    fn lines_serialize_lowercase() {
        let json = serde_json::to_string(&[Line::Solid, Line::Broken]).unwrap();
        assert_eq!(json, r#"["solid","broken"]"#);
    }

    // -- properties --

    mod properties {
        use proptest::prelude::*;

        use super::*;

        fn line() -> impl Strategy<Value = Line> {
            any::<bool>().prop_map(|solid| if solid { Line::Solid } else { Line::Broken })
        }

        proptest! {
            #[test]
            fn derivation_is_deterministic(n1 in any::<i64>(), n2 in any::<i64>(), n3 in any::<i64>()) {
                prop_assert_eq!(derive_divination(n1, n2, n3), derive_divination(n1, n2, n3));
            }

            #[test]
            fn coordinates_are_always_in_range(n1 in any::<i64>(), n2 in any::<i64>(), n3 in any::<i64>()) {
                let pair = coordinates_from_numbers(n1, n2, n3);
                let (upper, lower) = parse_parent(&pair.parent).expect("parent must be well-formed");
                prop_assert!(upper < 8 && lower < 8);
                prop_assert_eq!(pair.child.len(), 1);
                prop_assert!(pair.child.parse::<u8>().unwrap() < 6);
            }

            #[test]
            fn text_input_never_escapes_range(a in ".*", b in ".*", c in ".*") {
                let pair = coordinates_from_input(&a, &b, &c);
                prop_assert!(parse_parent(&pair.parent).is_some());
                prop_assert!(pair.child.parse::<u8>().unwrap() < 6);
            }

            #[test]
            fn any_parent_string_gives_six_lines(parent in ".*") {
                let lines = initial_hexagram_lines(&parent);
                prop_assert_eq!(lines.len(), 6);
                if parse_parent(&parent).is_none() {
                    prop_assert_eq!(lines, DEFAULT_HEXAGRAM);
                }
            }

            #[test]
            fn any_line_slice_gives_six_lines(lines in prop::collection::vec(line(), 0..12), child in any::<i64>()) {
                let out = transformed_hexagram_lines(&lines, child);
                prop_assert_eq!(out.len(), 6);
                if lines.len() != 6 {
                    prop_assert_eq!(out, DEFAULT_HEXAGRAM);
                }
            }

            #[test]
            fn exactly_one_line_flips(lines in prop::array::uniform6(line()), child in 0i64..6) {
                let out = transformed_hexagram_lines(&lines, child);
                let changed: Vec<usize> = (0..6).filter(|&i| out[i] != lines[i]).collect();
                prop_assert_eq!(changed, vec![changing_line_index(child)]);
            }
        }
    }
}
