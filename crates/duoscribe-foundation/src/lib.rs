pub mod error;
pub mod shutdown;

pub use error::AudioError;
pub use shutdown::StopSignal;
