//! This module handles the websocket connection and its dispatcher.

mod wsconn;
mod wssource;

pub use self::{wsconn::*, wssource::*};
