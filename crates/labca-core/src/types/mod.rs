mod bundle;
mod info;
mod input;
mod node;

pub use bundle::*;
pub use info::*;
pub use input::*;
pub use node::*;
