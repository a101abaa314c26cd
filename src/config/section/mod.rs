//! Configuration section definitions.
//!
//! Each module corresponds to a section in `hotbrew.toml`:
//!
//! | Module    | TOML Section  | Purpose                                 |
//! |-----------|---------------|-----------------------------------------|
//! | `scripts` | `[scripts]`   | Script roots, namespace, reference set  |
//! | `watch`   | `[watch]`     | Hot reload on/off and debounce delay    |

mod scripts;
mod watch;

pub use scripts::ScriptsConfig;
pub use watch::WatchConfig;
