//! Deterministic random streams for a run.
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

/// Independent streams derived from one run seed, so that a handler drawing
/// an extra number never shifts which question gets selected.
#[derive(Debug, Clone)]
pub struct RngBundle {
    selection: CountingRng<SmallRng>,
    effects: CountingRng<SmallRng>,
    display: CountingRng<SmallRng>,
}

/// Draw counters per stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngDraws {
    pub selection: u64,
    pub effects: u64,
    pub display: u64,
}

impl RngBundle {
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            selection: CountingRng::seeded(derive_stream_seed(seed, b"selection")),
            effects: CountingRng::seeded(derive_stream_seed(seed, b"effects")),
            display: CountingRng::seeded(derive_stream_seed(seed, b"display")),
        }
    }

    pub fn selection(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.selection
    }

    pub fn effects(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.effects
    }

    pub fn display(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.display
    }

    #[must_use]
    pub const fn draws(&self) -> RngDraws {
        RngDraws {
            selection: self.selection.draws(),
            effects: self.effects.draws(),
            display: self.display.draws(),
        }
    }
}

/// RNG wrapper counting draw calls.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R> CountingRng<R> {
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    // HMAC accepts keys of any length, so the error arm is unreachable.
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
