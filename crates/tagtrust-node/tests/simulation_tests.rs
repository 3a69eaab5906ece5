//! End-to-end tests: peers, gossip and reputation on the simulated clock.
//!
//! Verifies:
//! - Two agreeing peers trust each other after one exchange each way
//! - A random voter ends up with near-zero similarity to honest peers
//! - A spam rule downvoted by honest peers gets a negative reputation
//! - Identical seeds and actions reproduce identical results
//! - Peers added after the clock started still gossip
//! - Scripted actions and the demo network run to completion

use rand::rngs::StdRng;
use rand::SeedableRng;
use tagtrust_gossip::GossipTask;
use tagtrust_node::{demo, Network, NodeError, ScenarioAction, SimConfig, Simulation};
use tagtrust_protocol::{ContentId, PeerId, PeerRole, RuleId, RuleKind, TagKey};

// -----------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------

fn config(duration_secs: u64, seed: u64) -> SimConfig {
    let mut config = SimConfig::default();
    config.simulation.duration_secs = duration_secs;
    config.simulation.seed = seed;
    config
}

fn network_with_peers(peers: &[(u64, PeerRole)], content_items: u64) -> Network {
    let mut network = Network::new(SimConfig::default().peer_settings());
    for (id, role) in peers {
        network.add_peer(PeerId(*id), *role);
    }
    for item in 0..content_items {
        network.create_content(ContentId(item), 1.0).unwrap();
    }
    network
}

// ═══════════════════════════════════════════════════════════════
// Scenario A: two agreeing peers
// ═══════════════════════════════════════════════════════════════

#[test]
fn agreeing_peers_trust_each_other() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut network = network_with_peers(&[(1, PeerRole::Honest), (2, PeerRole::Honest)], 1);
    network.connect(PeerId(1), PeerId(2)).unwrap();

    let key = TagKey::new(ContentId(0), "drama");
    network.create_tag(PeerId(1), ContentId(0), "drama").unwrap();
    network.vote(PeerId(1), &key, true, &mut rng).unwrap();

    // Peer 2 learns the tag through gossip, then agrees with it.
    let outcome = GossipTask::new(PeerId(2)).run_round(&mut network, &mut rng).unwrap();
    assert_eq!(outcome.ingested, 1);
    network.vote(PeerId(2), &key, true, &mut rng).unwrap();
    GossipTask::new(PeerId(1)).run_round(&mut network, &mut rng).unwrap();

    network.recompute_all();

    let peer = network.peer(PeerId(1)).unwrap();
    assert!((peer.trust().get_similarity(PeerId(1), PeerId(2)) - 1.0).abs() < 1e-9);
    assert!(peer.trust().get_flow(PeerId(2)) > 0.0);
    let tag = peer.tags().get(&key).unwrap();
    assert!(tag.reputation_score > 0.0);

    let learned = network.peer(PeerId(2)).unwrap().tags().get(&key).unwrap();
    assert!(learned.authors.contains(&PeerId(1)));
}

// ═══════════════════════════════════════════════════════════════
// Scenario B: random voter
// ═══════════════════════════════════════════════════════════════

#[test]
fn random_voter_is_not_similar_to_honest_peers() {
    let items = 200;
    let mut network = network_with_peers(
        &[
            (1, PeerRole::Honest),
            (2, PeerRole::Honest),
            (3, PeerRole::RandomVoter),
        ],
        items,
    );
    network.connect_all();

    let mut rng = StdRng::seed_from_u64(3);
    for peer in [PeerId(1), PeerId(2)] {
        for item in 0..items {
            network.create_tag(peer, ContentId(item), "genre").unwrap();
            network
                .vote(peer, &TagKey::new(ContentId(item), "genre"), true, &mut rng)
                .unwrap();
        }
    }

    let mut simulation = Simulation::new(network, &config(1_000, 3));
    simulation.run().unwrap();

    let peer = simulation.network().peer(PeerId(1)).unwrap();
    let honest = peer.trust().get_similarity(PeerId(1), PeerId(2));
    let random = peer.trust().get_similarity(PeerId(1), PeerId(3));
    assert!(honest > 0.9, "honest similarity {honest}");
    assert!(random.abs() < 0.3, "random similarity {random}");
    assert!(peer.ledger().votes_for_user(PeerId(3)).len() > 50);
}

// ═══════════════════════════════════════════════════════════════
// Scenario C: spam rule
// ═══════════════════════════════════════════════════════════════

#[test]
fn downvoted_spam_rule_gets_negative_reputation() {
    let mut network = network_with_peers(
        &[(1, PeerRole::Honest), (2, PeerRole::Honest), (3, PeerRole::Honest)],
        10,
    );
    network
        .create_rule(RuleId(7), PeerId(9), "must-watch", 1.0, 1.0, RuleKind::Spam)
        .unwrap();
    assert_eq!(network.apply_rules_everywhere(), 30);
    network.connect_all();

    let mut rng = StdRng::seed_from_u64(5);
    for peer in network.peer_ids() {
        for item in 0..10 {
            let key = TagKey::new(ContentId(item), "must-watch");
            network.vote(peer, &key, false, &mut rng).unwrap();
        }
    }

    let mut simulation = Simulation::new(network, &config(60, 5));
    let report = simulation.run().unwrap();

    for snapshot in &report.peers {
        let rule = snapshot.rules.iter().find(|r| r.rule == RuleId(7)).unwrap();
        assert!(rule.reputation < 0.0, "{}: {}", snapshot.peer, rule.reputation);
        assert!(snapshot.tags.iter().all(|t| t.weight < 0.0));
    }
}

// ═══════════════════════════════════════════════════════════════
// Determinism
// ═══════════════════════════════════════════════════════════════

#[test]
fn same_seed_reproduces_run() {
    let config = config(120, 11);
    let first = demo::build_simulation(&config, 3).unwrap().run().unwrap();
    let second = demo::build_simulation(&config, 3).unwrap().run().unwrap();

    assert_eq!(first.gossip_rounds, second.gossip_rounds);
    assert_eq!(first.votes_exchanged, second.votes_exchanged);
    assert_eq!(first.peers, second.peers);
}

// ═══════════════════════════════════════════════════════════════
// Late peers
// ═══════════════════════════════════════════════════════════════

fn network_with_one_vote() -> Network {
    let mut rng = StdRng::seed_from_u64(2);
    let mut network = network_with_peers(&[(1, PeerRole::Honest)], 1);
    network.create_tag(PeerId(1), ContentId(0), "noir").unwrap();
    network
        .vote(PeerId(1), &TagKey::new(ContentId(0), "noir"), true, &mut rng)
        .unwrap();
    network
}

#[test]
fn peer_added_through_network_after_start_gossips() {
    let mut simulation = Simulation::new(network_with_one_vote(), &config(60, 2));
    simulation.start();
    assert!(simulation.network_mut().add_peer(PeerId(2), PeerRole::Honest));
    simulation.network_mut().connect(PeerId(1), PeerId(2)).unwrap();

    simulation.run().unwrap();

    let task = simulation.gossip_task(PeerId(2)).unwrap();
    assert!(task.rounds() > 0);
    let late = simulation.network().peer(PeerId(2)).unwrap();
    assert_eq!(late.ledger().votes_for_user(PeerId(1)).len(), 1);
}

#[test]
fn simulation_add_peer_schedules_gossip() {
    let mut simulation = Simulation::new(network_with_one_vote(), &config(60, 2));
    simulation.start();
    assert!(simulation.add_peer(PeerId(2), PeerRole::Honest));
    assert!(!simulation.add_peer(PeerId(2), PeerRole::RandomVoter));
    assert!(simulation.gossip_task(PeerId(2)).is_some());
    simulation.network_mut().connect(PeerId(1), PeerId(2)).unwrap();

    let report = simulation.run().unwrap();

    assert!(simulation.gossip_task(PeerId(2)).unwrap().rounds() > 0);
    assert!(report.votes_exchanged >= 1);
}

// ═══════════════════════════════════════════════════════════════
// Scripted actions and the demo
// ═══════════════════════════════════════════════════════════════

#[test]
fn scripted_vote_on_unlearned_tag_is_skipped() {
    let network = network_with_peers(&[(1, PeerRole::Honest), (2, PeerRole::Honest)], 1);
    let mut simulation = Simulation::new(network, &config(30, 1));
    simulation
        .schedule_actions([
            ScenarioAction::create(1.0, PeerId(1), ContentId(0), "noir"),
            ScenarioAction::vote(2.0, PeerId(1), ContentId(0), "noir", true),
            // Peers are not connected: peer 2 never learns the tag.
            ScenarioAction::vote(3.0, PeerId(2), ContentId(0), "noir", true),
        ])
        .unwrap();

    let report = simulation.run().unwrap();

    assert_eq!(report.actions_applied, 2);
    assert_eq!(report.actions_skipped, 1);
    assert!(report.gossip_rounds > 0);
    assert_eq!(report.gossip_rounds, report.skipped_rounds);
}

#[test]
fn scripted_vote_on_unknown_content_aborts() {
    let network = network_with_peers(&[(1, PeerRole::Honest)], 1);
    let mut simulation = Simulation::new(network, &config(30, 1));
    simulation
        .schedule_action(ScenarioAction::vote(1.0, PeerId(1), ContentId(42), "x", true))
        .unwrap();

    assert!(matches!(
        simulation.run(),
        Err(NodeError::UnknownContent { .. })
    ));
}

#[test]
fn demo_runs_to_completion() {
    let config = config(120, 42);
    let mut simulation = demo::build_simulation(&config, 4).unwrap();
    let report = simulation.run().unwrap();

    assert_eq!(report.peers.len(), 5);
    assert!(report.gossip_rounds >= 5 * 20);
    assert!(report.votes_exchanged > 0);
    assert_eq!(report.end_time_secs, 120.0);
    for snapshot in &report.peers {
        assert_eq!(snapshot.user_reputations[&snapshot.peer], 1.0);
        for rule in &snapshot.rules {
            assert!((-1.0..=1.0).contains(&rule.reputation));
        }
    }
    assert!(serde_json::to_string(&report).is_ok());
}
