//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier::prelude::*;
//! ```

pub use crate::{
    Client, Config, CookieJar, Error, File, MemoryCookieJar, Method, Params, Request, Response,
    Result, StatusCode, ToParams,
};

pub use serde::{Deserialize, Serialize};
