//! In-memory matrices and their element types
//!
//! `Matrix<T>` is the unit of exchange with the store: batches are appended
//! as matrices and reads return matrices or individual rows.

mod dtype;
#[allow(clippy::module_inception)]
mod matrix;

pub use dtype::{decode_elements, encode_elements, DType, Element};
pub use matrix::{Matrix, Schema};
