//! Choice of the next connection to build.

use std::collections::BTreeSet;

use bevy::prelude::*;
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

use crate::ai::config::AiConfig;
use crate::ai::ledger::ForbiddenConnections;
use crate::ai::markers::AiKind;
use crate::ai::plan::Target;
use crate::ai::state::PassengerFocus;
use crate::constants::{NEED_WEIGHT_SCALE, SUPPLY_TREE_DEPTH};
use crate::economy::nodes::{ConnectionKey, EconomicNode, NodeId, NodeKind};
use crate::services::{EconomyRegistry, FleetService};

/// Read-only inputs of target selection.
pub struct SelectionView<'a> {
    pub economy: &'a dyn EconomyRegistry,
    pub fleet: &'a dyn FleetService,
    pub ledger: &'a ForbiddenConnections,
}

impl SelectionView<'_> {
    /// Neither served by any line nor known to be infeasible.
    pub fn is_open(&self, key: &ConnectionKey) -> bool {
        !self.fleet.is_connected(key) && !self.ledger.contains(key)
    }

    fn missing_links(&self, node: NodeId) -> Vec<crate::economy::nodes::MissingLink> {
        self.economy
            .missing_links(node, &|key| self.fleet.is_connected(key))
    }

    /// Number of unserved links in the supply tree below `node`.
    pub fn count_missing_links(&self, node: NodeId, depth: u32, visited: &mut BTreeSet<NodeId>) -> u32 {
        if !visited.insert(node) {
            return 0;
        }
        let links = self.missing_links(node);
        let mut count = links.len() as u32;
        if depth > 0 {
            for link in &links {
                if let Some(&nearest) = link.suppliers.first() {
                    count += self.count_missing_links(nearest, depth - 1, visited);
                }
            }
        }
        count
    }

    fn distance(&self, a: NodeId, b: NodeId) -> u32 {
        match (self.economy.node(a), self.economy.node(b)) {
            (Some(a), Some(b)) => a.pos.distance_to(b.pos),
            _ => u32::MAX,
        }
    }

    /// Walk down from `consumer` to the deepest open link worth building first.
    fn find_link(&self, consumer: NodeId, depth: u32, visited: &mut BTreeSet<NodeId>) -> Option<Target> {
        if !visited.insert(consumer) {
            return None;
        }

        for link in self.missing_links(consumer) {
            let best = link
                .suppliers
                .iter()
                .copied()
                .filter(|&s| self.is_open(&ConnectionKey::new(s, consumer, link.good)))
                .map(|s| {
                    let missing =
                        self.count_missing_links(s, depth.saturating_sub(1), &mut BTreeSet::new());
                    (missing, self.distance(s, consumer), s)
                })
                .min();
            let Some((supplier_missing, _, supplier)) = best else {
                continue;
            };

            if supplier_missing > 0 && depth > 0 {
                if let Some(deeper) = self.find_link(supplier, depth - 1, visited) {
                    return Some(deeper);
                }
            }
            return Some(Target::new(supplier, consumer, link.good));
        }
        None
    }
}

/// Pick one under-served connection for a player, or `None` if nothing is left.
pub fn select_target(
    kind: AiKind,
    focus: &mut PassengerFocus,
    view: &SelectionView,
    rng: &mut impl Rng,
    config: &AiConfig,
) -> Option<Target> {
    match kind {
        AiKind::Freight => select_freight_target(view, rng),
        AiKind::Passenger => {
            let target = select_passenger_target(*focus, view, rng, config);
            *focus = focus.toggled();
            target
        }
    }
}

fn select_freight_target(view: &SelectionView, rng: &mut impl Rng) -> Option<Target> {
    let mut candidates: Vec<(Target, u32)> = Vec::new();

    for consumer in view.economy.nodes().filter(|n| !n.inputs().is_empty()) {
        let missing = view.count_missing_links(consumer.id, SUPPLY_TREE_DEPTH, &mut BTreeSet::new());
        if missing == 0 {
            continue;
        }
        let Some(target) = view.find_link(consumer.id, SUPPLY_TREE_DEPTH, &mut BTreeSet::new()) else {
            continue;
        };
        // Nearly complete supply trees are preferred.
        let weight = (NEED_WEIGHT_SCALE / missing).max(1);
        candidates.push((target, weight));
    }

    pick_weighted(&candidates, rng)
}

fn pick_weighted(candidates: &[(Target, u32)], rng: &mut impl Rng) -> Option<Target> {
    if candidates.is_empty() {
        return None;
    }
    let index = WeightedIndex::new(candidates.iter().map(|(_, w)| *w)).ok()?;
    let (target, _) = candidates[index.sample(rng)];
    debug!(
        "Selected {:?} -> {:?} out of {} candidates",
        target.start,
        target.end,
        candidates.len()
    );
    Some(target)
}

fn is_destination(node: &EconomicNode, focus: PassengerFocus) -> bool {
    match focus {
        PassengerFocus::CityPairs => node.is_city(),
        PassengerFocus::Attractions => matches!(node.kind, NodeKind::Attraction { .. }),
    }
}

fn select_passenger_target(
    focus: PassengerFocus,
    view: &SelectionView,
    rng: &mut impl Rng,
    config: &AiConfig,
) -> Option<Target> {
    let passengers = view.economy.passenger_good()?;
    let cities: Vec<&EconomicNode> = view
        .economy
        .nodes()
        .filter(|n| n.is_city() && n.population() > 0)
        .collect();

    for focus in [focus, focus.toggled()] {
        let candidates: Vec<(Target, u32)> = cities
            .iter()
            .filter_map(|city| {
                view.economy
                    .nodes()
                    .filter(|n| n.id != city.id && n.population() > 0)
                    .filter(|n| is_destination(n, focus))
                    .filter(|n| city.pos.distance_to(n.pos) <= config.max_passenger_distance)
                    .filter(|n| view.is_open(&ConnectionKey::new(city.id, n.id, passengers)))
                    .min_by_key(|n| (city.pos.distance_to(n.pos), n.id))
                    .map(|dest| (Target::new(city.id, dest.id, passengers), city.population()))
            })
            .collect();
        if let Some(target) = pick_weighted(&candidates, rng) {
            return Some(target);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::economy::goods::{FreightCategory, GoodCatalog, GoodId};
    use crate::economy::nodes::{NodeRegistry, Production};
    use crate::fleet::{FleetRegistry, Infrastructure, NewLine, Schedule};
    use crate::ai::state::TransportMode;
    use crate::map::tile_pos::TilePos;

    struct Economy {
        nodes: NodeRegistry,
        coal: GoodId,
        ore: GoodId,
        mine: NodeId,
        ore_mine: NodeId,
        mill: NodeId,
    }

    fn economy() -> Economy {
        let mut goods = GoodCatalog::default();
        let coal = goods.register("Coal", FreightCategory::Bulk, 3, 10);
        let ore = goods.register("Iron Ore", FreightCategory::Bulk, 3, 10);
        let steel = goods.register("Steel", FreightCategory::Piece, 6, 20);
        let mut nodes = NodeRegistry::with_goods(goods);
        let mine = nodes.add_factory(
            "Coal Mine",
            TilePos::new(0, 0),
            vec![],
            vec![Production {
                good: coal,
                per_month: 100,
            }],
        );
        let ore_mine = nodes.add_factory(
            "Ore Mine",
            TilePos::new(0, 10),
            vec![],
            vec![Production {
                good: ore,
                per_month: 80,
            }],
        );
        let mill = nodes.add_factory(
            "Steel Mill",
            TilePos::new(10, 0),
            vec![coal, ore],
            vec![Production {
                good: steel,
                per_month: 40,
            }],
        );
        Economy {
            nodes,
            coal,
            ore,
            mine,
            ore_mine,
            mill,
        }
    }

    fn connect(fleet: &mut FleetRegistry, key: ConnectionKey) {
        fleet.create_line(NewLine {
            owner: Entity::PLACEHOLDER,
            name: "Existing".into(),
            key: Some(key),
            mode: TransportMode::Road,
            schedule: Schedule::default(),
            infrastructure: Infrastructure::default(),
        });
    }

    #[test]
    fn freight_selects_open_supplier_link() {
        let eco = economy();
        let fleet = FleetRegistry::default();
        let ledger = ForbiddenConnections::default();
        let view = SelectionView {
            economy: &eco.nodes,
            fleet: &fleet,
            ledger: &ledger,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut focus = PassengerFocus::default();

        let target = select_target(
            AiKind::Freight,
            &mut focus,
            &view,
            &mut rng,
            &AiConfig::default(),
        )
        .unwrap();
        assert_eq!(target.end, eco.mill);
        assert!(target.start == eco.mine || target.start == eco.ore_mine);
    }

    #[test]
    fn forbidden_and_connected_keys_are_skipped() {
        let eco = economy();
        let mut fleet = FleetRegistry::default();
        connect(&mut fleet, ConnectionKey::new(eco.mine, eco.mill, eco.coal));
        let mut ledger = ForbiddenConnections::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut focus = PassengerFocus::default();
        let config = AiConfig::default();

        {
            let view = SelectionView {
                economy: &eco.nodes,
                fleet: &fleet,
                ledger: &ledger,
            };
            for _ in 0..10 {
                let target =
                    select_target(AiKind::Freight, &mut focus, &view, &mut rng, &config).unwrap();
                assert_eq!(target.key, ConnectionKey::new(eco.ore_mine, eco.mill, eco.ore));
            }
        }

        ledger.push(ConnectionKey::new(eco.ore_mine, eco.mill, eco.ore), 1930);
        let view = SelectionView {
            economy: &eco.nodes,
            fleet: &fleet,
            ledger: &ledger,
        };
        assert!(select_target(AiKind::Freight, &mut focus, &view, &mut rng, &config).is_none());
    }

    #[test]
    fn supply_tree_is_walked_before_consumer() {
        let mut eco = economy();
        let steel = GoodId(2);
        let works = eco.nodes.add_factory(
            "Machine Works",
            TilePos::new(20, 0),
            vec![steel],
            vec![],
        );
        let fleet = FleetRegistry::default();
        let ledger = ForbiddenConnections::default();
        let view = SelectionView {
            economy: &eco.nodes,
            fleet: &fleet,
            ledger: &ledger,
        };

        assert_eq!(view.count_missing_links(works, SUPPLY_TREE_DEPTH, &mut BTreeSet::new()), 3);
        let target = view
            .find_link(works, SUPPLY_TREE_DEPTH, &mut BTreeSet::new())
            .unwrap();
        assert_eq!(target.end, eco.mill);
    }

    #[test]
    fn passenger_ai_alternates_focus() {
        let mut goods = GoodCatalog::default();
        let pax = goods.register("Passengers", FreightCategory::Passengers, 4, 60);
        let mut nodes = NodeRegistry::with_goods(goods);
        let town = nodes.add_city("Ashford", TilePos::new(0, 0), 2_000);
        let city = nodes.add_city("Brampton", TilePos::new(15, 0), 5_000);
        let museum = nodes.add_attraction("Museum", TilePos::new(0, 6), 300);
        let fleet = FleetRegistry::default();
        let ledger = ForbiddenConnections::default();
        let view = SelectionView {
            economy: &nodes,
            fleet: &fleet,
            ledger: &ledger,
        };
        let mut rng = StdRng::seed_from_u64(3);
        let mut focus = PassengerFocus::CityPairs;
        let config = AiConfig::default();

        let first = select_target(AiKind::Passenger, &mut focus, &view, &mut rng, &config).unwrap();
        assert_eq!(first.key, ConnectionKey::new(town, city, pax));
        assert_eq!(focus, PassengerFocus::Attractions);

        let second = select_target(AiKind::Passenger, &mut focus, &view, &mut rng, &config).unwrap();
        assert!(second.key.involves(museum));
        assert_eq!(focus, PassengerFocus::CityPairs);
    }
}
