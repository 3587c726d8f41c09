//! Version dispatch for movement generation.
//!
//! Tournaments store the version tag of the algorithm they were created with, and keep using
//! it: a movement that has been printed and handed out must come out identical every time it is
//! rebuilt. New tournaments get [`AlgorithmVersion::CURRENT`].
//!
//! # Versions
//! - [`AlgorithmVersion::V1`] (tag `"1"`): the board count is the total number of hands dealt.
//!   Hands per round are derived from it and boards are never short.
//! - [`AlgorithmVersion::V2`] (tag `"2"`, current): hands per round are explicit and the board
//!   count is the number of physical boards, which may force relay tables.
//!
//! # Example
//!
//! ```
//! use pair_movement::prelude::*;
//!
//! let factory = MovementFactory::new(Configuration::new());
//! let request = MovementRequest::new(10, 7).with_hands_per_round(3);
//! let movement = factory.create(&request).unwrap();
//! assert_eq!(movement.num_rounds(), 9);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use tracing::{info, instrument, trace};

use crate::configuration::Configuration;
use crate::error::{MovementError, Result};
use crate::logger::init_logger;
use crate::movement::{Movement, MovementBuilder};
use crate::pairing::PairingTopology;

/// Generation algorithm a tournament was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlgorithmVersion {
    /// Board count is the number of hands dealt, hands per round implied.
    V1,
    /// Explicit hands per round, board count is the physical supply.
    V2,
}

impl AlgorithmVersion {
    /// Version given to new tournaments.
    pub const CURRENT: AlgorithmVersion = AlgorithmVersion::V2;

    /// Tag stored alongside the tournament.
    pub fn tag(self) -> &'static str {
        match self {
            AlgorithmVersion::V1 => "1",
            AlgorithmVersion::V2 => "2",
        }
    }

    /// Reads a stored tag. A missing or empty tag means the current version.
    ///
    /// # Errors
    /// [`MovementError::UnknownVersion`] for any other unrecognised tag.
    pub fn from_tag(tag: Option<&str>) -> Result<Self> {
        match tag.map(str::trim) {
            None | Some("") => Ok(Self::CURRENT),
            Some(tag) => tag.parse(),
        }
    }

    fn build(self, request: &MovementRequest) -> Result<Movement> {
        match self {
            AlgorithmVersion::V1 => {
                let rounds = PairingTopology::new(request.pair_count)?.rounds();
                let hands_per_round = request.board_count / rounds;
                if hands_per_round == 0 {
                    return Err(MovementError::TooFewBoards {
                        board_count: request.board_count,
                        rounds,
                    });
                }
                MovementBuilder::new(request.pair_count)
                    .with_hands_per_round(hands_per_round)
                    .with_unlimited_boards()
                    .build()
            }
            AlgorithmVersion::V2 => {
                let hands_per_round = request
                    .hands_per_round
                    .ok_or(MovementError::MissingHandsPerRound(self))?;
                MovementBuilder::new(request.pair_count)
                    .with_hands_per_round(hands_per_round)
                    .with_board_count(request.board_count)
                    .build()
            }
        }
    }
}

impl Default for AlgorithmVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for AlgorithmVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for AlgorithmVersion {
    type Err = MovementError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1" => Ok(AlgorithmVersion::V1),
            "2" => Ok(AlgorithmVersion::V2),
            other => Err(MovementError::UnknownVersion(other.to_owned())),
        }
    }
}

/// Stored tournament parameters a movement is generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MovementRequest {
    /// Number of pairs.
    pub pair_count: u32,
    /// Number of boards, read according to `version`.
    pub board_count: u32,
    /// Hands per table per round, implied by older versions.
    pub hands_per_round: Option<u32>,
    /// Algorithm the tournament was created with.
    pub version: AlgorithmVersion,
}

impl MovementRequest {
    /// A request for a new tournament, using the current version.
    pub fn new(pair_count: u32, board_count: u32) -> Self {
        Self {
            pair_count,
            board_count,
            hands_per_round: None,
            version: AlgorithmVersion::CURRENT,
        }
    }

    /// Sets the hands played per table per round.
    #[must_use]
    pub fn with_hands_per_round(mut self, hands_per_round: u32) -> Self {
        self.hands_per_round = Some(hands_per_round);
        self
    }

    /// Uses the algorithm of an existing tournament.
    #[must_use]
    pub fn with_version(mut self, version: AlgorithmVersion) -> Self {
        self.version = version;
        self
    }

    /// Uses the algorithm named by a stored tag.
    ///
    /// # Errors
    /// [`MovementError::UnknownVersion`] if the tag is not recognised. Callers usually report it
    /// as a corrupted tournament.
    pub fn with_version_tag(self, tag: Option<&str>) -> Result<Self> {
        Ok(self.with_version(AlgorithmVersion::from_tag(tag)?))
    }
}

/// Builds movements for stored tournaments, remembering them when caching is enabled.
///
/// The cache only saves work: a cached movement is identical to a freshly built one.
#[derive(Debug)]
pub struct MovementFactory {
    config: Configuration,
    cache: RwLock<HashMap<MovementRequest, Arc<Movement>>>,
}

impl MovementFactory {
    #[instrument(skip_all)]
    /// Creates a factory with the given [`Configuration`].
    pub fn new(config: Configuration) -> Self {
        if config.log {
            if let Err(err) = init_logger() {
                eprintln!("movement log disabled: {err:#}");
            }
        }
        trace!(?config);

        Self {
            config,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the movement for `request`.
    ///
    /// # Errors
    /// Configuration errors for invalid or unsupported requests,
    /// [`MovementError::Inconsistent`] if generation went wrong.
    #[instrument(skip(self), level = "debug")]
    pub fn create(&self, request: &MovementRequest) -> Result<Arc<Movement>> {
        if self.config.cache {
            if let Some(movement) = self.cached(request) {
                trace!("cache hit");
                return Ok(movement);
            }
        }

        info!(
            "building movement v{} for {} pairs and {} boards",
            request.version, request.pair_count, request.board_count
        );
        let movement = Arc::new(request.version.build(request)?);

        if self.config.cache {
            // a poisoned lock only loses the memo, the movement is still valid
            if let Ok(mut cache) = self.cache.write() {
                cache.entry(*request).or_insert_with(|| movement.clone());
            }
        }
        Ok(movement)
    }

    /// Number of movements currently memoized.
    pub fn cached_len(&self) -> usize {
        self.cache.read().map(|cache| cache.len()).unwrap_or(0)
    }

    fn cached(&self, request: &MovementRequest) -> Option<Arc<Movement>> {
        self.cache.read().ok()?.get(request).cloned()
    }
}

impl Default for MovementFactory {
    fn default() -> Self {
        Self::new(Configuration::default())
    }
}

#[cfg(test)]
mod factory_tests {
    use std::thread;

    use super::*;

    #[test]
    fn test_tags() {
        assert_eq!(AlgorithmVersion::from_tag(None), Ok(AlgorithmVersion::V2));
        assert_eq!(AlgorithmVersion::from_tag(Some("")), Ok(AlgorithmVersion::CURRENT));
        assert_eq!(AlgorithmVersion::from_tag(Some("1")), Ok(AlgorithmVersion::V1));
        assert_eq!("2".parse::<AlgorithmVersion>(), Ok(AlgorithmVersion::V2));
        assert_eq!(AlgorithmVersion::V1.to_string(), "1");

        let err = AlgorithmVersion::from_tag(Some("7")).unwrap_err();
        assert_eq!(err, MovementError::UnknownVersion("7".to_owned()));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_legacy_implies_hands_per_round() {
        let factory = MovementFactory::new(Configuration::new().with_cache(false));
        let request = MovementRequest::new(8, 21).with_version(AlgorithmVersion::V1);
        let movement = factory.create(&request).unwrap();
        assert_eq!(movement.num_rounds(), 7);
        assert_eq!(movement.hands_per_round(), 3);
        assert_eq!(movement.total_hands(), 21);
    }

    #[test]
    fn test_legacy_too_few_boards() {
        let factory = MovementFactory::new(Configuration::new());
        let request = MovementRequest::new(8, 6).with_version(AlgorithmVersion::V1);
        let err = factory.create(&request).unwrap_err();
        assert_eq!(
            err,
            MovementError::TooFewBoards {
                board_count: 6,
                rounds: 7
            }
        );
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "6 boards cannot deal one hand to each of 7 rounds");
    }

    #[test]
    fn test_current_requires_hands_per_round() {
        let factory = MovementFactory::new(Configuration::new());
        let err = factory.create(&MovementRequest::new(8, 24)).unwrap_err();
        assert_eq!(err, MovementError::MissingHandsPerRound(AlgorithmVersion::V2));
    }

    #[test]
    fn test_versions_read_board_count_differently() {
        let factory = MovementFactory::new(Configuration::new());
        let legacy = MovementRequest::new(6, 10).with_version(AlgorithmVersion::V1);
        let current = MovementRequest::new(6, 10).with_hands_per_round(2);
        let legacy = factory.create(&legacy).unwrap();
        let current = factory.create(&current).unwrap();
        assert_eq!(legacy.hands_per_round(), 2);
        assert_eq!(current.hands_per_round(), 2);
        assert_eq!(legacy.num_rounds(), current.num_rounds());
    }

    #[test]
    fn test_cache_is_transparent() {
        let cached = MovementFactory::new(Configuration::new().with_cache(true));
        let uncached = MovementFactory::new(Configuration::new().with_cache(false));
        let request = MovementRequest::new(12, 8).with_hands_per_round(2);

        let first = cached.create(&request).unwrap();
        let second = cached.create(&request).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cached.cached_len(), 1);

        assert_eq!(*first, *uncached.create(&request).unwrap());
        assert_eq!(uncached.cached_len(), 0);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let factory = MovementFactory::new(Configuration::new());
        assert!(factory.create(&MovementRequest::new(1, 8).with_hands_per_round(2)).is_err());
        assert_eq!(factory.cached_len(), 0);
    }

    #[test]
    fn test_concurrent_requests() {
        let factory = Arc::new(MovementFactory::new(Configuration::new()));
        let request = MovementRequest::new(11, 9).with_hands_per_round(3);
        let expected = Movement::build(11, 3, 9).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let factory = factory.clone();
                thread::spawn(move || factory.create(&request))
            })
            .collect();
        for handle in handles {
            let movement = handle.join().unwrap().unwrap();
            assert_eq!(*movement, expected);
        }
    }
}
