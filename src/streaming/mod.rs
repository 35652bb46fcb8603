pub mod decoder;
pub mod dispatch;
pub mod frame;

pub use decoder::Utf8Decoder;
pub use dispatch::{Action, Dispatcher, Outcome};
pub use frame::{DATA_PREFIX, FrameBuffer};
