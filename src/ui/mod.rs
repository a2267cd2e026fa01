//! Terminal output with plain fallback for CI and pipes
//!
//! Interactive terminals get symbols and a spinner; everything else gets
//! bracketed tags so logs stay greppable.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    confirm, key_value, key_value_status, remark, section, step_error_detail, step_info,
    step_ok, step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::TaskSpinner;
