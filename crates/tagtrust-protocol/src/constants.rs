/// Minimum magnitude of a voter's trust value for their vote to count
/// towards a tag's reputation.
pub const DEFAULT_TRUST_THRESHOLD: f64 = 0.2;

/// Interval between two gossip rounds of the same peer, in seconds.
pub const DEFAULT_EXCHANGE_INTERVAL_SECS: u64 = 5;

/// Maximum number of votes pulled from a neighbour in one gossip round.
pub const DEFAULT_EXCHANGE_BATCH_SIZE: usize = 20;

/// Number of DAG tips a freshly cast vote links to.
pub const DEFAULT_TIPS_PER_VOTE: usize = 2;

/// Default simulated duration of a run, in seconds.
pub const DEFAULT_SIMULATION_DURATION_SECS: u64 = 300;

/// Default seed for the simulation PRNG.
pub const DEFAULT_SIMULATION_SEED: u64 = 42;

/// Domain separator mixed into vote identities.
pub const VOTE_ID_DOMAIN: &[u8] = b"tagtrust/vote/v1";

/// Domain separator mixed into rule applicability seeds.
pub const RULE_SEED_DOMAIN: &[u8] = b"tagtrust/rule/v1";
