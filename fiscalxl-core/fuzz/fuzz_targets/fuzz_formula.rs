#![no_main]

//! Fuzz target for formula relocation.
//!
//! Translation must never panic, and a zero move must leave the text alone.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use fiscalxl_core::translate_formula;

#[derive(Arbitrary, Debug)]
struct FormulaInput {
    formula: String,
    origin_row: u16,
    origin_column: u8,
    rows_down: u16,
}

fuzz_target!(|input: FormulaInput| {
    let origin = (u32::from(input.origin_row) + 1, u32::from(input.origin_column) + 1);
    let destination = (origin.0 + u32::from(input.rows_down), origin.1);

    if let Ok(moved) = translate_formula(&input.formula, origin, destination) {
        let _ = translate_formula(&moved, destination, origin);
    }
    assert_eq!(
        translate_formula(&input.formula, origin, origin).as_deref(),
        Ok(input.formula.as_str())
    );
});
