//! Built-in demo network used by the `tagtrust-sim` binary.
//!
//! A handful of honest peers and one random voter share a small corpus. One
//! rule tags content accurately, one spams a misleading tag. Honest peers
//! vote on the tags of a few popular items according to ground truth; the
//! random voter flips a coin on every tag it holds. A short script has peer 1
//! author an extra tag that the others vote on once gossip has carried it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tagtrust_protocol::{ContentId, PeerId, PeerRole, RuleId, RuleKind, Tag, TagKey};

use crate::config::SimConfig;
use crate::network::Network;
use crate::scenario::ScenarioAction;
use crate::simulation::Simulation;
use crate::NodeError;

const DEMO_CONTENT_ITEMS: u64 = 20;
const DEMO_VOTES_PER_PEER: usize = 8;
pub const ACCURATE_RULE: RuleId = RuleId(1);
pub const SPAM_RULE: RuleId = RuleId(2);

/// Verdict of a well-informed peer: a rule-generated tag is accurate only if
/// every generating rule is correct on that content.
fn ground_truth(network: &Network, tag: &Tag) -> bool {
    tag.rules.iter().all(|id| {
        network
            .rule(*id)
            .and_then(|rule| rule.accuracy_on(tag.key.content_id))
            .unwrap_or(true)
    })
}

/// Build the demo network with `honest_peers` honest peers plus one random
/// voter, all connected to each other.
pub fn build_network(config: &SimConfig, honest_peers: u64) -> Result<Network, NodeError> {
    let mut rng = StdRng::seed_from_u64(config.simulation.seed);
    let mut network = Network::new(config.peer_settings());

    let random_voter = PeerId(honest_peers + 1);
    for id in 1..=honest_peers {
        network.add_peer(PeerId(id), PeerRole::Honest);
    }
    network.add_peer(random_voter, PeerRole::RandomVoter);

    for item in 0..DEMO_CONTENT_ITEMS {
        network.create_content(ContentId(item), 1.0 / (item + 1) as f64)?;
    }
    network.create_rule(ACCURATE_RULE, PeerId(1), "well-tagged", 0.5, 0.1, RuleKind::Accurate)?;
    network.create_rule(SPAM_RULE, random_voter, "free-download", 0.5, 1.0, RuleKind::Spam)?;
    let tags = network.apply_rules_everywhere();
    network.connect_all();

    for peer_id in network.peer_ids() {
        let Some(peer) = network.peer(peer_id) else {
            continue;
        };
        let votes: Vec<(TagKey, bool)> = if peer.role() == PeerRole::Honest {
            let mut picks = Vec::new();
            for _ in 0..DEMO_VOTES_PER_PEER {
                if let Some(content) = peer.content().random_by_popularity(&mut rng) {
                    for tag in peer.tags().tags_for_content(content) {
                        picks.push((tag.key.clone(), ground_truth(&network, tag)));
                    }
                }
            }
            picks
        } else {
            peer.all_tags()
                .into_iter()
                .map(|tag| (tag.key.clone(), rng.gen_bool(0.5)))
                .collect()
        };

        for (key, verdict) in votes {
            network.vote(peer_id, &key, verdict, &mut rng)?;
        }
    }

    tracing::info!(
        peers = network.len(),
        content = DEMO_CONTENT_ITEMS,
        rule_tags = tags,
        "Built demo network"
    );
    Ok(network)
}

/// Scripted actions: peer 1 authors and upvotes a tag early, every other
/// honest peer upvotes it later.
pub fn script(honest_peers: u64) -> Vec<ScenarioAction> {
    let content = ContentId(0);
    let name = "classic";
    let mut actions = vec![
        ScenarioAction::create(10.0, PeerId(1), content, name),
        ScenarioAction::vote(10.0, PeerId(1), content, name, true),
    ];
    for id in 2..=honest_peers {
        actions.push(ScenarioAction::vote(60.0 + 5.0 * id as f64, PeerId(id), content, name, true));
    }
    actions
}

/// Demo network plus script, ready to run.
pub fn build_simulation(config: &SimConfig, honest_peers: u64) -> Result<Simulation, NodeError> {
    let network = build_network(config, honest_peers)?;
    let mut simulation = Simulation::new(network, config);
    simulation.schedule_actions(script(honest_peers))?;
    Ok(simulation)
}
