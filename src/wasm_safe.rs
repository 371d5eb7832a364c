use crate::dice_bag::Value;

#[cfg(not(any(feature = "wasm", feature = "nowasm")))]
compile_error!("enable either the `nowasm` or the `wasm` feature");

#[cfg(not(feature = "wasm"))]
use rand::Rng;

/// rolls a single die with faces `1..=sides`
#[cfg(not(feature = "wasm"))]
pub fn roll_die(sides: Value) -> Value {
    rand::thread_rng().gen_range(1..=sides)
}

#[cfg(feature = "wasm")]
pub fn roll_die(sides: Value) -> Value {
    let face = (random_number_between_0_and_1() * sides as f64) as Value + 1;
    // Math.random() is in [0, 1), rounding could still land on sides + 1
    face.min(sides)
}

#[cfg(feature = "wasm")]
fn random_number_between_0_and_1() -> f64 {
    js_sys::Math::random()
}
