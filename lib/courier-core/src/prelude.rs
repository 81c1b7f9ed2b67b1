//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier_core::prelude::*;
//! ```

pub use crate::{
    Codec, Cookies, Error, File, FormData, Header, Method, PathParams, QueryParams, Reset, Result,
    ToParams,
};
