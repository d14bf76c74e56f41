mod local_queue;
mod shared_queue;

pub use self::local_queue::LocalQueue;
pub use self::shared_queue::SharedQueue;

use crate::util::constants::LOG_BYTES_IN_PAGE;

const LOG_PAGES_PER_BUFFER: usize = 0;
pub const BUFFER_SIZE: usize = 1 << (LOG_BYTES_IN_PAGE as usize + LOG_PAGES_PER_BUFFER);
