//! This module handles the BLCP connection and its dispatcher.

mod blcpconn;
mod tlssource;

pub use self::{blcpconn::*, tlssource::*};
