//! Seedable, named random number streams.
//!
//! Every stochastic call in the simulation draws from an explicit [`RngStore`] handle rather than
//! a process-wide generator. Streams are declared with [`define_rng!`] and are independent of each
//! other: consuming numbers from one stream never shifts the sequence of another, so adding a
//! draw to (say) the network drift does not perturb node transitions.
//!
//! Keyed sub-streams ([`RngStore::sample_keyed`]) derive a fresh generator from the base seed,
//! the stream name and a caller-supplied key. The network engine keys per-node draws by tick and
//! node id, which makes each draw attributable and independent of evaluation order.
mod macros;
mod sampling_algorithms;

use std::any::{Any, TypeId};

use log::trace;
pub use macros::define_rng;
pub use sampling_algorithms::{sample_multiple_from_known_length, sample_single_from_known_length};

use crate::hashing::{hash_key, hash_str, HashMap};
use crate::rand::{Rng, SeedableRng};

pub trait RngId: Copy + Clone + 'static {
    type RngType: SeedableRng;
    fn get_name() -> &'static str;
}

// This is a wrapper that allows for future support for different types of
// random number generators (anything that implements SeedableRng is valid).
struct RngHolder {
    rng: Box<dyn Any>,
}

/// Holds the base seed of a run and the lazily created generator of each stream.
pub struct RngStore {
    base_seed: u64,
    rng_holders: HashMap<TypeId, RngHolder>,
}

impl RngStore {
    #[must_use]
    pub fn new(base_seed: u64) -> Self {
        trace!("initializing random store with seed {}", base_seed);
        RngStore {
            base_seed,
            rng_holders: HashMap::default(),
        }
    }

    fn stream_seed<R: RngId>(&self) -> u64 {
        self.base_seed.wrapping_add(hash_str(R::get_name()))
    }

    /// Gets a mutable reference to the random number generator associated with the given
    /// [`RngId`]. If the Rng has not been used before, one will be created from the base seed.
    fn get_rng<R: RngId>(&mut self) -> &mut R::RngType {
        let seed = self.stream_seed::<R>();
        self.rng_holders
            .entry(TypeId::of::<R>())
            .or_insert_with(|| {
                trace!("creating new RNG (seed={}) for {}", seed, R::get_name());
                RngHolder {
                    rng: Box::new(R::RngType::seed_from_u64(seed)),
                }
            })
            .rng
            .downcast_mut::<R::RngType>()
            .expect("RngHolder always stores the RngType of its key")
    }

    /// Gets a random sample from the stream associated with the given [`RngId`] by applying
    /// the specified sampler function.
    pub fn sample<R: RngId, T>(
        &mut self,
        _rng_id: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T {
        sampler(self.get_rng::<R>())
    }

    /// Applies `sampler` to a generator seeded from the stream of `R` and `key`. The same
    /// `(base seed, stream, key)` triple always yields the same generator, and no state is
    /// shared with the sequential stream of `R` or with other keys.
    pub fn sample_keyed<R: RngId, T>(
        &self,
        _rng_id: R,
        key: u64,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T {
        let mut rng = R::RngType::seed_from_u64(hash_key(self.stream_seed::<R>(), key));
        sampler(&mut rng)
    }

    /// A uniform draw in `[0, 1)` from the keyed sub-stream `key` of `R`.
    pub fn uniform_for_key<R: RngId>(&self, rng_id: R, key: u64) -> f64
    where
        R::RngType: Rng,
    {
        self.sample_keyed(rng_id, key, |rng| rng.random::<f64>())
    }
}
