pub mod config;
pub mod duck;
pub mod export;
pub mod import;
pub mod normalize;
pub mod source;

pub use import::{run_import, ImportReport};
pub use normalize::{
    normalize, normalize_all, parse_numeric_with_range, RawRecord, TypedRecord, DEFAULT_OEE_RATIO,
};
