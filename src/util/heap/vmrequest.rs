use crate::util::constants::*;
use crate::util::Address;

/// How much of the virtual heap range a space wants, and at which end.
#[derive(Clone, Copy, Debug)]
pub enum VMRequest {
    RequestFixed {
        start: Address,
        extent: usize,
        top: bool,
    },
    RequestExtent {
        extent: usize,
        top: bool,
    },
    RequestFraction {
        frac: f32,
        top: bool,
    },
}

impl VMRequest {
    pub fn fixed_size(mb: usize) -> Self {
        VMRequest::RequestExtent {
            extent: mb << LOG_BYTES_IN_MBYTE,
            top: false,
        }
    }

    pub fn fraction(frac: f32) -> Self {
        debug_assert!(frac > 0.0 && frac <= 1.0);
        VMRequest::RequestFraction { frac, top: false }
    }

    pub fn high_fixed_size(mb: usize) -> Self {
        VMRequest::RequestExtent {
            extent: mb << LOG_BYTES_IN_MBYTE,
            top: true,
        }
    }

    pub fn fixed_extent(extent: usize, top: bool) -> Self {
        VMRequest::RequestExtent { extent, top }
    }

    pub fn top(&self) -> bool {
        match self {
            VMRequest::RequestFixed { top, .. } => *top,
            VMRequest::RequestExtent { top, .. } => *top,
            VMRequest::RequestFraction { top, .. } => *top,
        }
    }
}
