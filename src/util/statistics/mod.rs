pub mod counter;
pub mod stats;

pub use self::counter::Timer;
