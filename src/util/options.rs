use std::cell::UnsafeCell;
use std::default::Default;
use std::ops::Deref;

use crate::util::constants::LOG_BYTES_IN_PAGE;

/// Single writer during boot, read-only afterwards.
pub struct UnsafeOptionsWrapper(UnsafeCell<Options>);

unsafe impl Sync for UnsafeOptionsWrapper {}

impl UnsafeOptionsWrapper {
    pub const fn new(o: Options) -> UnsafeOptionsWrapper {
        UnsafeOptionsWrapper(UnsafeCell::new(o))
    }

    /// # Safety
    /// Not thread safe: takes a mutable reference to the shared options.
    /// To be called by one thread during boot, before any allocation.
    pub unsafe fn process(&self, name: &str, value: &str) -> bool {
        (*self.0.get()).set_from_camelcase_str(name, value)
    }
}

impl Deref for UnsafeOptionsWrapper {
    type Target = Options;
    fn deref(&self) -> &Options {
        unsafe { &*self.0.get() }
    }
}

fn always_valid<T>(_: &T) -> bool {
    true
}

macro_rules! options {
    ($($name:ident: $type:ty[$validator:expr] = $default:expr),*,) => [
        options!($($name: $type[$validator] = $default),*);
    ];
    ($($name:ident: $type:ty[$validator:expr] = $default:expr),*) => [
        pub struct Options {
            $(pub $name: $type),*
        }
        impl Options {
            /// Apply one setting. An unknown key, an unparseable value or
            /// a value the option's validator rejects is a configuration
            /// error, and configuration errors are fatal.
            pub fn set_from_str(&mut self, s: &str, val: &str) -> bool {
                match s {
                    $(stringify!($name) => {
                        let val = val.parse::<$type>().unwrap_or_else(|_| {
                            panic!("Invalid option {}={:?}: cannot parse value", s, val)
                        });
                        let validate_fn = $validator;
                        if !validate_fn(&val) {
                            panic!("Invalid option {}={:?}: value rejected", s, val);
                        }
                        self.$name = val;
                        true
                    })*
                    _ => panic!("Invalid option key {:?}", s),
                }
            }
        }
        impl Default for Options {
            fn default() -> Self {
                let mut options = Options {
                    $($name: $default),*
                };

                // Environment overrides: GCTK_THREADS=8 sets `threads`.
                const PREFIX: &str = "GCTK_";
                for (key, val) in std::env::vars() {
                    if let Some(rest_of_key) = key.strip_prefix(PREFIX) {
                        let lowercase: &str = &rest_of_key.to_lowercase();
                        match lowercase {
                            $(stringify!($name) => { options.set_from_str(lowercase, &val); },)*
                            _ => {}
                        }
                    }
                }
                options
            }
        }
    ]
}

options! {
    // Number of GC worker threads.
    threads:          usize [|v: &usize| *v > 0]                     = num_cpus::get(),
    // Verbosity of collection reporting; 0 is silent.
    verbose:          usize [always_valid]                           = 0,
    // Cross-check every collection with the independent sanity trace.
    // Only honored when the crate is built with the sanity feature.
    sanity:           bool  [always_valid]                           = false,
    // Share of available pages withheld as the collection reserve after
    // a productive collection.
    reserve_fraction: f32   [|v: &f32| *v > 0.0 && *v <= 1.0]        = 0.1,
    // Floor for the adaptive reserve, in pages.
    min_reserve:      usize [|v: &usize| *v > 0] = (512 * 1024) >> LOG_BYTES_IN_PAGE,
}

impl Options {
    /// Setter for runtimes that hand option names through in their own
    /// camelCase convention.
    fn set_from_camelcase_str(&mut self, s: &str, val: &str) -> bool {
        let mut snake = String::with_capacity(s.len());
        for c in s.chars() {
            if c.is_uppercase() {
                snake.push('_');
                for lower in c.to_lowercase() {
                    snake.push(lower);
                }
            } else {
                snake.push(c);
            }
        }
        trace!("Trying to process option pair: ({}, {})", snake, val);
        self.set_from_str(&snake, val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let options = Options::default();
        assert!(options.threads >= 1);
        assert!(!options.sanity);
        assert!(options.reserve_fraction > 0.0);
        assert!(options.min_reserve > 0);
    }

    #[test]
    fn set_from_str_applies_valid_values() {
        let mut options = Options::default();
        assert!(options.set_from_str("threads", "3"));
        assert_eq!(options.threads, 3);
        assert!(options.set_from_str("reserve_fraction", "0.25"));
        assert!((options.reserve_fraction - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn camelcase_names_reach_the_same_options() {
        let mut options = Options::default();
        assert!(options.set_from_camelcase_str("reserveFraction", "0.5"));
        assert!((options.reserve_fraction - 0.5).abs() < f32::EPSILON);
        assert!(options.set_from_camelcase_str("minReserve", "64"));
        assert_eq!(options.min_reserve, 64);
    }

    #[test]
    #[should_panic]
    fn zero_threads_is_rejected() {
        let mut options = Options::default();
        options.set_from_str("threads", "0");
    }

    #[test]
    #[should_panic]
    fn unparseable_values_are_rejected() {
        let mut options = Options::default();
        options.set_from_str("threads", "many");
    }

    #[test]
    #[should_panic]
    fn unknown_keys_are_rejected() {
        let mut options = Options::default();
        options.set_from_str("tile_size", "16");
    }
}
