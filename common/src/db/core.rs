use crate::db::error::DbError;
use crate::db::graph::RoutingGraph;
use crate::db::indices::*;
use crate::geom::coord::TileCoord;
use std::collections::HashMap;

/// Block names starting with this prefix are registers folded into the
/// interconnect; their sink location is decided by the router.
pub const REGISTER_PREFIX: char = 'r';

pub fn is_register_block(name: &str) -> bool {
    name.starts_with(REGISTER_PREFIX)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PinRef {
    pub block: String,
    pub port: String,
}

impl PinRef {
    pub fn new(block: &str, port: &str) -> Self {
        Self {
            block: block.to_string(),
            port: port.to_string(),
        }
    }
}

/// A net as handed over by the netlist loader. The first pin drives the rest.
#[derive(Clone, Debug)]
pub struct NetDescription {
    pub name: String,
    pub width: u32,
    pub pins: Vec<PinRef>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndpointKind {
    Pin,
    Register,
}

#[derive(Clone, Debug)]
pub struct NetEndpoint {
    pub block: String,
    pub port: String,
    pub pos: TileCoord,
    pub kind: EndpointKind,
    /// `None` until bound; register sinks are bound by the router.
    pub node: Option<NodeId>,
}

impl NetEndpoint {
    pub fn is_register(&self) -> bool {
        self.kind == EndpointKind::Register
    }

    pub fn label(&self) -> String {
        format!("{}:{}", self.block, self.port)
    }
}

#[derive(Clone, Debug)]
pub struct Net {
    pub id: NetId,
    pub name: String,
    pub width: u32,
    pub source: NetEndpoint,
    pub sinks: Vec<NetEndpoint>,
}

impl Net {
    pub fn has_register_sink(&self) -> bool {
        self.sinks.iter().any(NetEndpoint::is_register)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SinkRoute {
    pub sink: NodeId,
    pub path: Vec<NodeId>,
}

/// Realized paths of one net, one slot per sink in endpoint order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetRoute {
    pub sinks: Vec<Option<SinkRoute>>,
}

impl NetRoute {
    pub fn new(num_sinks: usize) -> Self {
        Self {
            sinks: vec![None; num_sinks],
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.sinks
            .iter()
            .flatten()
            .flat_map(|r| r.path.iter().copied())
    }

    pub fn is_complete(&self) -> bool {
        self.sinks.iter().all(Option::is_some)
    }
}

pub struct RoutingDB {
    pub graph: RoutingGraph,
    pub nets: Vec<Net>,
    pub routes: Vec<NetRoute>,

    pub placement: HashMap<String, TileCoord>,
    pub net_name_map: HashMap<String, NetId>,
    /// Register block -> (feeding net, sink slot).
    register_feeds: HashMap<String, (NetId, usize)>,
}

impl RoutingDB {
    pub fn new(graph: RoutingGraph) -> Self {
        Self {
            graph,
            nets: Vec::with_capacity(1000),
            routes: Vec::with_capacity(1000),
            placement: HashMap::new(),
            net_name_map: HashMap::new(),
            register_feeds: HashMap::new(),
        }
    }

    pub fn num_nets(&self) -> usize {
        self.nets.len()
    }

    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id.index()]
    }

    pub fn route_of(&self, id: NetId) -> &NetRoute {
        &self.routes[id.index()]
    }

    pub fn routes(&self) -> &[NetRoute] {
        &self.routes
    }

    pub fn bind_block(&mut self, x: u32, y: u32, name: &str) -> Result<(), DbError> {
        if self.placement.contains_key(name) {
            return Err(DbError::DuplicateBinding {
                block: name.to_string(),
            });
        }
        self.placement.insert(name.to_string(), TileCoord::new(x, y));
        Ok(())
    }

    /// Resolves the pins of `desc` against the placement and the graph and
    /// appends the net. Pin sinks with no matching port are kept unresolved;
    /// the router rejects them.
    pub fn register_net(&mut self, desc: &NetDescription) -> Result<NetId, DbError> {
        if self.net_name_map.contains_key(&desc.name) {
            return Err(DbError::DuplicateNet {
                net: desc.name.clone(),
            });
        }
        if desc.pins.len() < 2 {
            return Err(DbError::NoSinks {
                net: desc.name.clone(),
            });
        }

        let mut endpoints = Vec::with_capacity(desc.pins.len());
        for (i, pin) in desc.pins.iter().enumerate() {
            let pos = *self
                .placement
                .get(&pin.block)
                .ok_or_else(|| DbError::UnplacedBlock {
                    net: desc.name.clone(),
                    block: pin.block.clone(),
                })?;

            let (kind, node) = if is_register_block(&pin.block) {
                // Driving registers sit on the first bypass point of their tile.
                let node = if i == 0 {
                    self.graph.registers_at(pos).first().copied()
                } else {
                    None
                };
                (EndpointKind::Register, node)
            } else {
                (EndpointKind::Pin, self.graph.find_port(pos, &pin.port))
            };

            endpoints.push(NetEndpoint {
                block: pin.block.clone(),
                port: pin.port.clone(),
                pos,
                kind,
                node,
            });
        }

        let id = NetId::new(self.nets.len());
        let source = endpoints.remove(0);
        for (slot, sink) in endpoints.iter().enumerate() {
            if sink.is_register() {
                self.register_feeds
                    .entry(sink.block.clone())
                    .or_insert((id, slot));
            }
        }
        self.routes.push(NetRoute::new(endpoints.len()));
        self.nets.push(Net {
            id,
            name: desc.name.clone(),
            width: desc.width,
            source,
            sinks: endpoints,
        });
        self.net_name_map.insert(desc.name.clone(), id);
        Ok(id)
    }

    /// Clears realized routes, occupancy and router-chosen register bindings.
    /// Register sources fall back to the first bypass point of their tile.
    pub fn reset_routes(&mut self) {
        for (net, route) in self.nets.iter_mut().zip(self.routes.iter_mut()) {
            *route = NetRoute::new(net.sinks.len());
            for sink in net.sinks.iter_mut().filter(|s| s.is_register()) {
                sink.node = None;
            }
            if net.source.is_register() {
                net.source.node = self.graph.registers_at(net.source.pos).first().copied();
            }
        }
        self.graph.reset_occupancy();
    }

    /// The net and sink slot feeding register `block`, if any.
    pub fn register_feed(&self, block: &str) -> Option<(NetId, usize)> {
        self.register_feeds.get(block).copied()
    }

    /// The bypass point the feeding net of register `block` is pinned to.
    pub fn register_location(&self, block: &str) -> Option<NodeId> {
        let (net, slot) = self.register_feed(block)?;
        self.nets[net.index()].sinks[slot].node
    }

    /// Moves the source of a register-driven net onto the node its register
    /// is currently pinned to. A register nobody feeds stays on the first
    /// bypass point of its tile; one whose feeding net failed to pin it keeps
    /// its previous location. Returns true if the binding moved.
    pub fn rebind_register_source(&mut self, id: NetId) -> bool {
        let source = &self.nets[id.index()].source;
        if !source.is_register() {
            return false;
        }
        let target = if self.register_feeds.contains_key(&source.block) {
            self.register_location(&source.block)
        } else {
            self.graph.registers_at(source.pos).first().copied()
        };
        let Some(node) = target else {
            return false;
        };

        let source = &mut self.nets[id.index()].source;
        let moved = source.node != Some(node);
        source.node = Some(node);
        moved
    }

    pub fn overflowed_nodes(&self) -> Vec<NodeId> {
        self.graph.overflowed_nodes()
    }

    pub fn has_overflow(&self) -> bool {
        self.graph.nodes.iter().any(|n| n.is_overflowed())
    }

    pub fn total_wirelength(&self) -> usize {
        self.routes
            .iter()
            .map(|r| {
                let mut nodes: Vec<NodeId> = r.nodes().collect();
                nodes.sort_unstable();
                nodes.dedup();
                nodes.len()
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::graph::NodeKind;

    fn small_db() -> RoutingDB {
        let mut g = RoutingGraph::new();
        g.add_node(TileCoord::new(0, 0), "out", NodeKind::Port, 0.0, 1);
        g.add_node(TileCoord::new(1, 0), "in0", NodeKind::Port, 0.0, 1);
        g.add_node(TileCoord::new(1, 0), "reg0", NodeKind::Register, 1.0, 1);
        let mut db = RoutingDB::new(g);
        db.bind_block(0, 0, "p0").unwrap();
        db.bind_block(1, 0, "p1").unwrap();
        db.bind_block(1, 0, "r0").unwrap();
        db
    }

    fn desc(name: &str, pins: &[(&str, &str)]) -> NetDescription {
        NetDescription {
            name: name.to_string(),
            width: 16,
            pins: pins.iter().map(|(b, p)| PinRef::new(b, p)).collect(),
        }
    }

    #[test]
    fn duplicate_binding_is_rejected() {
        let mut db = small_db();
        assert_eq!(
            db.bind_block(3, 3, "p0"),
            Err(DbError::DuplicateBinding {
                block: "p0".to_string()
            })
        );
        assert_eq!(db.placement["p0"], TileCoord::new(0, 0));
    }

    #[test]
    fn register_net_resolves_pins() {
        let mut db = small_db();
        let id = db
            .register_net(&desc("n0", &[("p0", "out"), ("p1", "in0"), ("r0", "reg")]))
            .unwrap();
        let net = db.net(id);
        assert!(net.source.node.is_some());
        assert_eq!(net.sinks.len(), 2);
        assert_eq!(net.sinks[0].kind, EndpointKind::Pin);
        assert!(net.sinks[0].node.is_some());
        assert_eq!(net.sinks[1].kind, EndpointKind::Register);
        assert!(net.sinks[1].node.is_none());
        assert!(net.has_register_sink());
        assert_eq!(db.route_of(id).sinks.len(), 2);
    }

    #[test]
    fn unknown_port_stays_unresolved() {
        let mut db = small_db();
        let id = db
            .register_net(&desc("n0", &[("p0", "out"), ("p1", "in7")]))
            .unwrap();
        assert!(db.net(id).sinks[0].node.is_none());
    }

    #[test]
    fn register_source_binds_first_bypass_point() {
        let mut db = small_db();
        let id = db
            .register_net(&desc("n0", &[("r0", "reg"), ("p0", "out")]))
            .unwrap();
        assert_eq!(db.net(id).source.kind, EndpointKind::Register);
        assert_eq!(
            db.net(id).source.node,
            db.graph.registers_at(TileCoord::new(1, 0)).first().copied()
        );
    }

    #[test]
    fn malformed_nets_are_rejected() {
        let mut db = small_db();
        assert!(matches!(
            db.register_net(&desc("n0", &[("p0", "out")])),
            Err(DbError::NoSinks { .. })
        ));
        assert!(matches!(
            db.register_net(&desc("n1", &[("p0", "out"), ("p9", "in0")])),
            Err(DbError::UnplacedBlock { .. })
        ));
        db.register_net(&desc("n2", &[("p0", "out"), ("p1", "in0")]))
            .unwrap();
        assert!(matches!(
            db.register_net(&desc("n2", &[("p0", "out"), ("p1", "in0")])),
            Err(DbError::DuplicateNet { .. })
        ));
        assert_eq!(db.num_nets(), 1);
    }

    #[test]
    fn register_source_follows_its_feeding_net() {
        let mut db = small_db();
        let reg1 = db
            .graph
            .add_node(TileCoord::new(1, 0), "reg1", NodeKind::Register, 1.0, 1);
        let feed = db
            .register_net(&desc("feed", &[("p0", "out"), ("r0", "reg")]))
            .unwrap();
        let drive = db
            .register_net(&desc("drive", &[("r0", "reg"), ("p1", "in0")]))
            .unwrap();
        let reg0 = db.graph.registers_at(TileCoord::new(1, 0))[0];
        assert_eq!(db.register_feed("r0"), Some((feed, 0)));
        assert_eq!(db.net(drive).source.node, Some(reg0));

        // Unpinned: the driving side keeps where it was.
        assert!(!db.rebind_register_source(drive));
        assert_eq!(db.net(drive).source.node, Some(reg0));

        db.nets[feed.index()].sinks[0].node = Some(reg1);
        assert_eq!(db.register_location("r0"), Some(reg1));
        assert!(db.rebind_register_source(drive));
        assert_eq!(db.net(drive).source.node, Some(reg1));
        assert!(!db.rebind_register_source(feed));

        db.reset_routes();
        assert_eq!(db.net(drive).source.node, Some(reg0));
    }

    #[test]
    fn reset_routes_clears_register_bindings() {
        let mut db = small_db();
        let id = db
            .register_net(&desc("n0", &[("p0", "out"), ("r0", "reg")]))
            .unwrap();
        let reg = db.graph.registers_at(TileCoord::new(1, 0))[0];
        db.nets[id.index()].sinks[0].node = Some(reg);
        db.routes[id.index()].sinks[0] = Some(SinkRoute {
            sink: reg,
            path: vec![reg],
        });
        db.graph.occupy(reg, id);

        db.reset_routes();
        assert!(db.net(id).sinks[0].node.is_none());
        assert!(!db.route_of(id).is_complete());
        assert_eq!(db.graph.node(reg).occupancy(), 0);
    }
}
