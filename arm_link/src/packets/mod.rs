mod command;
mod jog;
mod response;

pub use command::*;
pub use jog::*;
pub use response::*;
