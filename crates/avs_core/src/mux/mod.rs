//! Export planning for the FFmpeg transcoder.
//!
//! - **plan_builder**: Builds an `EncodePlan` (program + ordered arguments)
//!   from an export profile and mix policy.

mod plan_builder;

pub use plan_builder::{
    build_encode_plan, format_tokens_pretty, validate_profile, EncodePlan, EncodePlanInput,
    PlanError, PlanMode,
};
