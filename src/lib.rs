#![allow(clippy::comparison_chain)]
#![allow(clippy::too_many_arguments)]
extern crate num;
#[macro_use]
extern crate num_derive;
pub mod error;
pub mod arithmetic_decoder;
pub mod arithmetic_encoder;
pub mod binarization;
pub mod binary_reader;
pub mod binary_writer;
pub mod bins;
pub mod cabac_contexts;
pub mod cabac_reader;
pub mod cabac_tables;
pub mod cabac_writer;
pub mod context;
pub mod ctx_derivation;
pub mod neighbour;
pub mod slice_header;
pub mod trace;
