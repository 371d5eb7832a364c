//! JavaScript bindings, built with the `wasm` feature.

use wasm_bindgen::prelude::*;

use crate::dice_bag::{DiceBag, Value};

#[wasm_bindgen(start)]
pub fn start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// a [`DiceBag`] exported to JavaScript as `DiceBag`
#[wasm_bindgen(js_name = DiceBag)]
pub struct JsDiceBag {
    bag: DiceBag,
}

#[wasm_bindgen(js_class = DiceBag)]
impl JsDiceBag {
    /// throws a string describing the format error if `input` is not a valid dice string
    #[wasm_bindgen(constructor)]
    pub fn new(input: &str) -> Result<JsDiceBag, JsValue> {
        DiceBag::from_string(input)
            .map(|bag| JsDiceBag { bag })
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn average(&self) -> Value {
        self.bag.average()
    }

    pub fn minimum(&self) -> Value {
        self.bag.minimum()
    }

    pub fn maximum(&self) -> Value {
        self.bag.maximum()
    }

    pub fn sample(&self) -> Value {
        self.bag.sample()
    }

    /// `[{quantity, sides}, ...]` in parse order
    pub fn dice(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.bag.dice()).map_err(JsValue::from)
    }

    #[wasm_bindgen(js_name = toString)]
    pub fn to_js_string(&self) -> String {
        self.bag.to_string()
    }
}
