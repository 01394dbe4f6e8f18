//! Conda-style package specifier matching
//!
//! Parse a specifier once, then evaluate it against single candidates or
//! filter whole catalogs, optionally across a worker pool.
//!
//! ```
//! use matchspec::{Candidate, MatchSpec, is_match};
//!
//! let spec = MatchSpec::parse("python>=3.9,<3.11").unwrap();
//! assert!(is_match(&spec, &Candidate::new("python", "3.10.4")));
//! assert!(!is_match(&spec, &Candidate::new("python", "3.11.0")));
//! ```

pub mod candidate;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod matcher;
pub mod spec;
pub mod version;

pub use candidate::Candidate;
pub use error::{CandidateError, ParseError, ParseErrorKind};
pub use filter::{
    CandidateSource, ParallelFilter, filter, filter_candidates, filter_with_spec_list,
    parallel_filter, parallel_filter_with_spec_list,
};
pub use matcher::{Matcher, is_match, match_against_matchspec};
pub use spec::{MatchSpec, VersionSpec, parse_spec_list};
pub use version::Version;
