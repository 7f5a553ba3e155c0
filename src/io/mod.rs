//! Input/output helpers.
//!
//! - CSV reading + declared column roles (`table`)
//! - price / date parsing and the date-strategy chain (`parse`)
//! - output table exports (`export`)

pub mod export;
pub mod parse;
pub mod table;
