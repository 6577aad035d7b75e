use crate::routing::RoutingTable;

pub const DEFAULT_SEED: u64 = 42;

/// Knobs for a generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSettings {
    /// Base seed; each member's RNG is derived from it and the member id.
    pub seed: u64,
    /// Retry unresolvable value sets with codes outside their validity window.
    pub allow_expired_fallback: bool,
    pub routing: RoutingTable,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            allow_expired_fallback: false,
            routing: RoutingTable::default(),
        }
    }
}

impl GenerationSettings {
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_expired_fallback(mut self, allow: bool) -> Self {
        self.allow_expired_fallback = allow;
        self
    }

    #[must_use]
    pub fn with_routing(mut self, routing: RoutingTable) -> Self {
        self.routing = routing;
        self
    }

    /// Seed for one member: the run seed mixed with an FNV-1a hash of the id,
    /// so output does not depend on batch order.
    pub fn member_seed(&self, member_id: &str) -> u64 {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;
        let hash = member_id
            .bytes()
            .fold(OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME));
        self.seed ^ hash
    }
}
