#![deny(
    absolute_paths_not_starting_with_crate,
    anonymous_parameters,
    keyword_idents,
    macro_use_extern_crate,
    non_ascii_idents,
    unsafe_code,
    unused_extern_crates,
    unused_lifetimes,
    unused_qualifications
)]

pub use digest::{
    generic_array::{typenum::U8, GenericArray},
    FixedOutput, Reset, Update,
};

mod combine;
mod crc64;
pub use combine::combine;
pub use crc64::{crc64_of, crc64_of_reader, Crc64};
