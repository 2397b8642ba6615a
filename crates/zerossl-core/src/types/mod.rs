mod certificate;
mod challenge;
mod common;
mod download;

pub use certificate::*;
pub use challenge::*;
pub use common::*;
pub use download::*;
