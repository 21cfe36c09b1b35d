// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Log macros: `defmt` when the feature is enabled, nothing otherwise.

#[cfg(feature = "defmt")]
pub(crate) use defmt::{debug, error, info, warn};

#[cfg(not(feature = "defmt"))]
mod noop {
    macro_rules! noop_log {
        ($fmt:literal $(, $arg:expr)* $(,)?) => {{
            $( let _ = &$arg; )*
        }};
    }

    pub(crate) use noop_log as debug;
    pub(crate) use noop_log as error;
    pub(crate) use noop_log as info;
    pub(crate) use noop_log as warn;
}

#[cfg(not(feature = "defmt"))]
pub(crate) use noop::{debug, error, info, warn};
