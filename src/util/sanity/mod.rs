pub mod sanity_checker;

pub use self::sanity_checker::{Liveness, SanityChecker, SanityTraceLocal};
