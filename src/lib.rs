pub mod cli;
pub mod io;
pub mod logging;
pub mod model;
pub mod ops;
pub mod reminder;
pub mod service;
pub mod util;

#[cfg(test)]
pub(crate) mod test_utils;
