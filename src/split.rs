//! Record sources and the policies that cut byte streams into records.

pub mod policy;
pub mod reader;
pub mod source;
