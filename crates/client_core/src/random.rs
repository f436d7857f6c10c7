use rand::{rngs::StdRng, Rng, SeedableRng};

/// Source of the uniform choices made when synthesizing fallback content.
pub trait RandomSource: Send {
    /// Returns an index in `0..len`. `len == 0` yields 0.
    fn pick(&mut self, len: usize) -> usize;
}

pub struct StdRandomSource {
    rng: StdRng,
}

impl StdRandomSource {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for StdRandomSource {
    fn pick(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_sources_repeat_their_sequence() {
        let mut a = StdRandomSource::seeded(7);
        let mut b = StdRandomSource::seeded(7);
        let first: Vec<usize> = (0..16).map(|_| a.pick(8)).collect();
        let second: Vec<usize> = (0..16).map(|_| b.pick(8)).collect();
        assert_eq!(first, second);
        assert!(first.iter().all(|index| *index < 8));
    }

    #[test]
    fn empty_range_picks_zero() {
        assert_eq!(StdRandomSource::seeded(1).pick(0), 0);
    }
}
