//! Filter engine
//!
//! Applies the match engine across a catalog. Specifiers are parsed once
//! per call; catalog entries that cannot be turned into a [`Candidate`] are
//! skipped with a warning instead of aborting the batch. Output always keeps
//! the input order and borrows the original entries.
//!
//! The parallel variants split the catalog into contiguous partitions, filter
//! each on a rayon worker and concatenate the partial results in partition
//! order, so they return exactly what the sequential variants return.

use std::borrow::Cow;

use rayon::prelude::*;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::candidate::Candidate;
use crate::config::{DEFAULT_MIN_PARTITION_LEN, FilterConfig};
use crate::error::{CandidateError, ParseError};
use crate::matcher::is_match;
use crate::spec::{MatchSpec, parse_spec_list};

/// Anything a catalog can hold that converts into a [`Candidate`]
pub trait CandidateSource {
    fn to_candidate(&self) -> Result<Cow<'_, Candidate>, CandidateError>;
}

impl CandidateSource for Candidate {
    fn to_candidate(&self) -> Result<Cow<'_, Candidate>, CandidateError> {
        Ok(Cow::Borrowed(self))
    }
}

impl CandidateSource for Map<String, Value> {
    fn to_candidate(&self) -> Result<Cow<'_, Candidate>, CandidateError> {
        Candidate::from_mapping(self).map(Cow::Owned)
    }
}

impl CandidateSource for Value {
    fn to_candidate(&self) -> Result<Cow<'_, Candidate>, CandidateError> {
        Candidate::try_from(self).map(Cow::Owned)
    }
}

/// Lets an earlier filter result be filtered again
impl<T: CandidateSource + ?Sized> CandidateSource for &T {
    fn to_candidate(&self) -> Result<Cow<'_, Candidate>, CandidateError> {
        (**self).to_candidate()
    }
}

/// Keep the entries matching `spec`
pub fn filter<'a, T: CandidateSource>(
    spec: &str,
    candidates: &'a [T],
) -> Result<Vec<&'a T>, ParseError> {
    let spec = MatchSpec::parse(spec)?;
    Ok(filter_candidates(std::slice::from_ref(&spec), candidates))
}

/// Keep the entries matching every specifier in `specs`
pub fn filter_with_spec_list<'a, S: AsRef<str>, T: CandidateSource>(
    specs: &[S],
    candidates: &'a [T],
) -> Result<Vec<&'a T>, ParseError> {
    let specs = parse_spec_list(specs)?;
    Ok(filter_candidates(&specs, candidates))
}

/// [`filter`] on rayon's global pool
pub fn parallel_filter<'a, T: CandidateSource + Sync>(
    spec: &str,
    candidates: &'a [T],
) -> Result<Vec<&'a T>, ParseError> {
    let spec = MatchSpec::parse(spec)?;
    Ok(partitioned(
        std::slice::from_ref(&spec),
        candidates,
        DEFAULT_MIN_PARTITION_LEN,
    ))
}

/// [`filter_with_spec_list`] on rayon's global pool
pub fn parallel_filter_with_spec_list<'a, S: AsRef<str>, T: CandidateSource + Sync>(
    specs: &[S],
    candidates: &'a [T],
) -> Result<Vec<&'a T>, ParseError> {
    let specs = parse_spec_list(specs)?;
    Ok(partitioned(&specs, candidates, DEFAULT_MIN_PARTITION_LEN))
}

/// Sequential filter over already parsed specifiers. An empty list keeps
/// every valid entry.
pub fn filter_candidates<'a, T: CandidateSource>(
    specs: &[MatchSpec],
    candidates: &'a [T],
) -> Vec<&'a T> {
    candidates
        .iter()
        .filter(|item| keep(specs, *item))
        .collect()
}

/// Worker pool used for parallel filtering with a configured size
pub struct ParallelFilter {
    pool: rayon::ThreadPool,
    min_partition_len: usize,
}

impl ParallelFilter {
    pub fn new(config: &FilterConfig) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|idx| format!("matchspec-filter-{}", idx))
            .build()?;
        debug!(
            "filter pool started with {} threads, min partition {}",
            pool.current_num_threads(),
            config.min_partition_len
        );

        Ok(Self {
            pool,
            min_partition_len: config.min_partition_len.max(1),
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Parallel counterpart of [`filter_candidates`]
    pub fn filter<'a, T: CandidateSource + Sync>(
        &self,
        specs: &[MatchSpec],
        candidates: &'a [T],
    ) -> Vec<&'a T> {
        self.pool
            .install(|| partitioned(specs, candidates, self.min_partition_len))
    }
}

fn keep<T: CandidateSource>(specs: &[MatchSpec], item: &T) -> bool {
    match item.to_candidate() {
        Ok(candidate) => specs.iter().all(|spec| is_match(spec, &candidate)),
        Err(e) => {
            warn!("skipping catalog entry: {}", e);
            false
        }
    }
}

/// Filter contiguous partitions on the current rayon pool and concatenate
/// the results in partition order
fn partitioned<'a, T: CandidateSource + Sync>(
    specs: &[MatchSpec],
    candidates: &'a [T],
    min_partition_len: usize,
) -> Vec<&'a T> {
    let workers = rayon::current_num_threads().max(1);
    let partition_len = candidates
        .len()
        .div_ceil(workers)
        .max(min_partition_len)
        .max(1);

    if partition_len >= candidates.len() {
        return filter_candidates(specs, candidates);
    }

    debug!(
        "filtering {} entries in partitions of {} across {} workers",
        candidates.len(),
        partition_len,
        workers
    );
    let partials: Vec<Vec<&'a T>> = candidates
        .par_chunks(partition_len)
        .map(|partition| filter_candidates(specs, partition))
        .collect();
    partials.concat()
}
