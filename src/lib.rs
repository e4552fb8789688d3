#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]

//! Networked jigsaw puzzle core.
//!
//! [`puzzle`] cuts an image into interlocking pieces and builds a visual and
//! a collision solid for each; [`assembly`] runs the grab/release protocol
//! that snaps fitting pieces together into clusters under a single
//! authority.

pub mod assembly;
pub mod config;
pub mod geom;
pub mod puzzle;

pub use assembly::{Authority, Replica};
pub use config::{ConfigError, PuzzleConfig};
pub use puzzle::{Puzzle, PuzzleError};

cfg_if::cfg_if! {
    if #[cfg(feature = "debug_logs")] {
        /// Install the `env_logger` backend, filtered by `RUST_LOG` and
        /// defaulting to `info`. Calling it again is harmless.
        pub fn init_logger() {
            let _ = env_logger::Builder::from_env(
                env_logger::Env::default().default_filter_or("info"),
            )
            .try_init();
        }
    } else {
        pub fn init_logger() {
            // no-op fallback when debug logs are disabled
        }
    }
}
