//! Helpers for exploring game data.
//!
//! - [`DiceBag`]: parse dice strings like `3d6+1-2d2` and compute their average, minimum, maximum or a random roll
//! - [`codepage`]: CP437 code points to Unicode glyphs
//! - [`version_info`]: version fields from the resources of Windows executables
//!
//! ```
//! use dicebag::DiceBag;
//!
//! let bag = DiceBag::from_string("1d4").unwrap();
//! assert_eq!((bag.minimum(), bag.average(), bag.maximum()), (1, 2, 4));
//! ```

pub mod codepage;
mod dice_bag;
mod dice_string_parser;
pub mod version_info;
#[cfg(feature = "wasm")]
pub mod wasm;
mod wasm_safe;

pub use dice_bag::{AggrValue, DiceBag, Die, Value};
pub use dice_string_parser::DiceFormatError;
