pub mod performance;
pub mod position;
pub mod record;
pub mod window;

pub use performance::*;
pub use position::*;
pub use record::*;
pub use window::*;
