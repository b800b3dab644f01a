//! Table operations, one module per table or concern.
//!
//! Each module contains `impl Database` blocks.

mod adhoc;
mod notas;
mod people;
