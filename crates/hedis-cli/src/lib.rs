//! File handling for the HEDIS mockup command line: input loading, table
//! export, run manifests and logging setup.

#![allow(missing_docs)]

pub mod export;
pub mod load;
pub mod logging;
pub mod manifest;
