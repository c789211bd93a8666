//! Clinical rules
//!
//! Measurement parsing, the vitals classifier, range flags and the comment
//! narrative.

pub mod classifier;
pub mod flags;
pub mod measure;
pub mod narrative;

pub use classifier::{
    assess, classify_numeric, classify_subjective, Comment, CommentSource, Severity,
};
pub use flags::{check_range, flag_value, Flag};
pub use measure::{parse_measurement, parse_pair, parse_range};
pub use narrative::{join_comments, to_paragraph, NO_FINDINGS};
