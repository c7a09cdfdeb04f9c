extern crate self as calmform;

pub mod form;
pub mod prelude;
pub mod scroll;

pub use form::{FormController, FormOptions};
pub use rust_decimal::Decimal;
