//! Board topology: tiles, the derived node/edge graph, and ports.
//!
//! The board is stored as flat arenas of tiles, nodes and edges addressed
//! by integer ids; every cross-reference (adjacent tiles, neighbor nodes,
//! road endpoints) is an id into these arenas. Nodes are discovered by
//! projecting each tile's six corners to pixel space, quantizing to the
//! integer pixel grid, and merging corners that collapse to the same key.
//! For the standard 19-tile layout this yields exactly 54 nodes and 72
//! edges, which the tests pin down.

use crate::hex::{HexCoord, HEX_SIZE};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Player identifier (0-3 for a 4-player game)
pub type PlayerId = u8;

/// Index into [`Board::tiles`]
pub type TileId = usize;
/// Index into [`Board::nodes`]
pub type NodeId = usize;
/// Index into [`Board::edges`]
pub type EdgeId = usize;

/// The five producible resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    Wood,
    Brick,
    Sheep,
    Wheat,
    Ore,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Wood,
        Resource::Brick,
        Resource::Sheep,
        Resource::Wheat,
        Resource::Ore,
    ];
}

/// A single hex tile. `resource` is `None` for the desert, and exactly
/// then `token` is `None` as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub coord: HexCoord,
    pub resource: Option<Resource>,
    /// Dice number that triggers production (2-12, never 7)
    pub token: Option<u8>,
    pub has_robber: bool,
}

impl Tile {
    pub fn is_desert(&self) -> bool {
        self.resource.is_none()
    }

    /// Whether this tile produces for the given roll (robber blocks)
    pub fn produces_for(&self, roll: u8) -> bool {
        self.token == Some(roll) && !self.has_robber
    }
}

/// What's built on a node (corner)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Building {
    #[default]
    Empty,
    Settlement(PlayerId),
    City(PlayerId),
}

impl Building {
    pub fn owner(&self) -> Option<PlayerId> {
        match self {
            Building::Empty => None,
            Building::Settlement(p) | Building::City(p) => Some(*p),
        }
    }

    pub fn victory_points(&self) -> u32 {
        match self {
            Building::Empty => 0,
            Building::Settlement(_) => 1,
            Building::City(_) => 2,
        }
    }

    /// Resource cards granted per production hit
    pub fn resource_multiplier(&self) -> u32 {
        match self {
            Building::Empty => 0,
            Building::Settlement(_) => 1,
            Building::City(_) => 2,
        }
    }
}

/// Port trade bonus attached to a pair of coastal nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortKind {
    /// 3:1 trade of any resource
    Generic,
    /// 2:1 trade of a specific resource
    Resource(Resource),
}

impl PortKind {
    /// Cards given per card received when trading through this port
    pub fn ratio(&self) -> u32 {
        match self {
            PortKind::Generic => 3,
            PortKind::Resource(_) => 2,
        }
    }
}

/// A settlement node: a corner shared by up to 3 tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Quantized pixel position; this is the node's identity during
    /// board construction.
    pub position: (i64, i64),
    /// Tiles touching this corner (1-3)
    pub adjacent_tiles: Vec<TileId>,
    /// Nodes one edge away (2-3)
    pub neighbors: Vec<NodeId>,
    /// Edges touching this node (2-3), parallel to `neighbors` ordering
    /// is not guaranteed
    pub incident_edges: Vec<EdgeId>,
    pub building: Building,
    pub port: Option<PortKind>,
}

/// A road slot between two adjacent nodes. Undirected; `nodes` is sorted
/// ascending so each physical edge has exactly one representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub nodes: [NodeId; 2],
    pub road: Option<PlayerId>,
}

impl Edge {
    /// The endpoint that isn't `node`
    pub fn other_end(&self, node: NodeId) -> NodeId {
        if self.nodes[0] == node {
            self.nodes[1]
        } else {
            self.nodes[0]
        }
    }
}

/// A port and the two nodes it serves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub kind: PortKind,
    pub nodes: [NodeId; 2],
}

/// Fixed port table for the standard layout: an outer tile, the first
/// corner of its outward-facing corner pair (the pair is (i, i+1) mod 6),
/// and the port kind. 4 generic + one 2:1 port per resource.
const PORT_TABLE: [(HexCoord, usize, PortKind); 9] = [
    (HexCoord::new(0, -2), 4, PortKind::Generic),
    (HexCoord::new(1, -2), 5, PortKind::Resource(Resource::Wheat)),
    (HexCoord::new(2, -1), 0, PortKind::Resource(Resource::Ore)),
    (HexCoord::new(2, 0), 0, PortKind::Generic),
    (HexCoord::new(1, 1), 1, PortKind::Resource(Resource::Sheep)),
    (HexCoord::new(0, 2), 1, PortKind::Generic),
    (HexCoord::new(-1, 2), 2, PortKind::Resource(Resource::Brick)),
    (HexCoord::new(-2, 1), 3, PortKind::Resource(Resource::Wood)),
    (HexCoord::new(-1, -1), 4, PortKind::Generic),
];

/// The 19 axial positions of the standard board: rows of 3-4-5-4-3 hexes
/// (the hexagon of radius 2), north row first, west to east.
pub fn standard_layout() -> Vec<HexCoord> {
    let mut coords = Vec::with_capacity(19);
    for r in -2..=2i32 {
        for q in (-2).max(-2 - r)..=2.min(2 - r) {
            coords.push(HexCoord::new(q, r));
        }
    }
    coords
}

/// The complete game board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    tiles: Vec<Tile>,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    ports: Vec<Port>,
    robber_tile: TileId,
}

impl Board {
    /// Generate a standard board with randomized resources and tokens
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self::generate_with_rng(&mut rng)
    }

    /// Generate a standard board with a provided RNG (deterministic when
    /// the RNG is seeded)
    pub fn generate_with_rng<R: Rng>(rng: &mut R) -> Self {
        Self::from_layout(&standard_layout(), rng)
    }

    fn from_layout<R: Rng>(layout: &[HexCoord], rng: &mut R) -> Self {
        // A malformed layout is a programming error, not a runtime error.
        assert_eq!(layout.len(), 19, "standard layout must have 19 tiles");
        for (r, expected) in [(-2, 3), (-1, 4), (0, 5), (1, 4), (2, 3)] {
            let row = layout.iter().filter(|c| c.r == r).count();
            assert_eq!(row, expected, "row r={} must have {} tiles", r, expected);
        }

        // Resource bag: wood x4, brick x3, sheep x4, wheat x4, ore x3,
        // desert x1 (None). Token bag: one 2 and 12, two of everything
        // else, no 7. Shuffled independently (Fisher-Yates via `shuffle`);
        // tokens go to non-desert tiles in shuffle order.
        let mut resources: Vec<Option<Resource>> = Vec::with_capacity(19);
        for (resource, count) in [
            (Resource::Wood, 4),
            (Resource::Brick, 3),
            (Resource::Sheep, 4),
            (Resource::Wheat, 4),
            (Resource::Ore, 3),
        ] {
            resources.extend(std::iter::repeat(Some(resource)).take(count));
        }
        resources.push(None);
        resources.shuffle(rng);

        let mut tokens: Vec<u8> = vec![2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12];
        tokens.shuffle(rng);

        let mut token_iter = tokens.into_iter();
        let mut robber_tile = 0;
        let mut tiles = Vec::with_capacity(19);
        for (id, (&coord, &resource)) in layout.iter().zip(resources.iter()).enumerate() {
            let is_desert = resource.is_none();
            if is_desert {
                robber_tile = id;
            }
            tiles.push(Tile {
                id,
                coord,
                resource,
                token: if is_desert { None } else { token_iter.next() },
                has_robber: is_desert,
            });
        }

        let (nodes, edges) = Self::derive_graph(&tiles);

        let mut board = Self {
            tiles,
            nodes,
            edges,
            ports: Vec::new(),
            robber_tile,
        };
        board.attach_ports();
        board
    }

    /// Derive the deduplicated node/edge graph from tile corners.
    fn derive_graph(tiles: &[Tile]) -> (Vec<Node>, Vec<Edge>) {
        let mut nodes: Vec<Node> = Vec::new();
        let mut edges: Vec<Edge> = Vec::new();
        let mut corner_index: HashMap<(i64, i64), NodeId> = HashMap::new();
        let mut edge_index: HashMap<(NodeId, NodeId), EdgeId> = HashMap::new();

        for tile in tiles {
            // Resolve (allocating on first sight) the six corner nodes.
            let mut corner_ids = [0usize; 6];
            for (i, corner_id) in corner_ids.iter_mut().enumerate() {
                let key = tile.coord.corner_key(i, HEX_SIZE);
                let id = match corner_index.get(&key) {
                    Some(&id) => id,
                    None => {
                        let id = nodes.len();
                        nodes.push(Node {
                            id,
                            position: key,
                            adjacent_tiles: Vec::new(),
                            neighbors: Vec::new(),
                            incident_edges: Vec::new(),
                            building: Building::Empty,
                            port: None,
                        });
                        corner_index.insert(key, id);
                        id
                    }
                };
                nodes[id].adjacent_tiles.push(tile.id);
                *corner_id = id;
            }

            // Consecutive corners bound an edge; canonicalize by sorted
            // node pair so the tile on the other side doesn't duplicate it.
            for i in 0..6 {
                let a = corner_ids[i];
                let b = corner_ids[(i + 1) % 6];
                let key = (a.min(b), a.max(b));
                if !edge_index.contains_key(&key) {
                    let id = edges.len();
                    edges.push(Edge {
                        id,
                        nodes: [key.0, key.1],
                        road: None,
                    });
                    edge_index.insert(key, id);
                    nodes[a].neighbors.push(b);
                    nodes[b].neighbors.push(a);
                    nodes[a].incident_edges.push(id);
                    nodes[b].incident_edges.push(id);
                }
            }
        }

        (nodes, edges)
    }

    /// Attach the fixed port table, writing `port` onto both nodes.
    fn attach_ports(&mut self) {
        for (coord, corner, kind) in PORT_TABLE {
            let a = self.node_at(coord.corner_key(corner, HEX_SIZE));
            let b = self.node_at(coord.corner_key((corner + 1) % 6, HEX_SIZE));
            self.nodes[a].port = Some(kind);
            self.nodes[b].port = Some(kind);
            self.ports.push(Port { kind, nodes: [a, b] });
        }
    }

    fn node_at(&self, position: (i64, i64)) -> NodeId {
        self.nodes
            .iter()
            .find(|n| n.position == position)
            .map(|n| n.id)
            .expect("port table must reference corners of the standard layout")
    }

    // ==================== Query Methods ====================

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn robber_tile(&self) -> TileId {
        self.robber_tile
    }

    /// The edge connecting two adjacent nodes, if any
    pub fn edge_between(&self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        self.nodes.get(a)?.incident_edges.iter().copied().find(|&e| {
            self.edges[e].nodes.contains(&b)
        })
    }

    /// Nodes touching a tile (its six corners)
    pub fn nodes_of_tile(&self, tile: TileId) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(move |n| n.adjacent_tiles.contains(&tile))
    }

    /// Port kinds reachable through a player's buildings
    pub fn player_ports(&self, player: PlayerId) -> Vec<PortKind> {
        self.ports
            .iter()
            .filter(|port| {
                port.nodes
                    .iter()
                    .any(|&n| self.nodes[n].building.owner() == Some(player))
            })
            .map(|port| port.kind)
            .collect()
    }

    // ==================== Validation Methods ====================

    /// Distance rule: a node is buildable only if no neighbor node has a
    /// building.
    pub fn satisfies_distance_rule(&self, node: NodeId) -> bool {
        self.nodes[node]
            .neighbors
            .iter()
            .all(|&n| self.nodes[n].building == Building::Empty)
    }

    /// Whether one of the node's incident edges carries the player's road
    pub fn is_connected_to_road(&self, node: NodeId, player: PlayerId) -> bool {
        self.nodes[node]
            .incident_edges
            .iter()
            .any(|&e| self.edges[e].road == Some(player))
    }

    /// Whether an edge attaches to the player's network: a building of
    /// theirs at an endpoint, or one of their roads continuing through an
    /// endpoint that no opponent building blocks.
    pub fn is_connected_to_network(&self, edge: EdgeId, player: PlayerId) -> bool {
        for &end in &self.edges[edge].nodes {
            let owner = self.nodes[end].building.owner();
            if owner == Some(player) {
                return true;
            }
            if owner.is_none()
                && self.nodes[end]
                    .incident_edges
                    .iter()
                    .any(|&e| e != edge && self.edges[e].road == Some(player))
            {
                return true;
            }
        }
        false
    }

    /// Legal settlement nodes for a player. During setup only the
    /// distance rule applies; afterwards the node must also touch the
    /// player's road network.
    pub fn valid_settlement_spots(&self, player: PlayerId, is_setup: bool) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| {
                n.building == Building::Empty
                    && self.satisfies_distance_rule(n.id)
                    && (is_setup || self.is_connected_to_road(n.id, player))
            })
            .map(|n| n.id)
            .collect()
    }

    /// Settlements of the player that can be upgraded to cities
    pub fn valid_city_spots(&self, player: PlayerId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.building == Building::Settlement(player))
            .map(|n| n.id)
            .collect()
    }

    /// Unbuilt edges attached to the player's network
    pub fn valid_road_spots(&self, player: PlayerId) -> Vec<EdgeId> {
        self.edges
            .iter()
            .filter(|e| e.road.is_none() && self.is_connected_to_network(e.id, player))
            .map(|e| e.id)
            .collect()
    }

    // ==================== Mutation Methods ====================

    /// Place a settlement (assumes validation already done)
    pub fn place_settlement(&mut self, node: NodeId, player: PlayerId) {
        self.nodes[node].building = Building::Settlement(player);
    }

    /// Upgrade a settlement to a city
    pub fn upgrade_to_city(&mut self, node: NodeId, player: PlayerId) {
        self.nodes[node].building = Building::City(player);
    }

    /// Place a road
    pub fn place_road(&mut self, edge: EdgeId, player: PlayerId) {
        self.edges[edge].road = Some(player);
    }

    /// Move the robber to a new tile, clearing the old tile's flag
    pub fn move_robber(&mut self, tile: TileId) {
        self.tiles[self.robber_tile].has_robber = false;
        self.tiles[tile].has_robber = true;
        self.robber_tile = tile;
    }

    // ==================== Resource Distribution ====================

    /// Resources produced for a dice roll: 1 card per settlement, 2 per
    /// city, on every tile with a matching token not blocked by the
    /// robber.
    pub fn resources_for_roll(&self, roll: u8) -> HashMap<PlayerId, HashMap<Resource, u32>> {
        let mut distribution: HashMap<PlayerId, HashMap<Resource, u32>> = HashMap::new();

        for tile in &self.tiles {
            if !tile.produces_for(roll) {
                continue;
            }
            let resource = match tile.resource {
                Some(r) => r,
                None => continue,
            };

            for node in self.nodes_of_tile(tile.id) {
                if let Some(owner) = node.building.owner() {
                    *distribution
                        .entry(owner)
                        .or_default()
                        .entry(resource)
                        .or_insert(0) += node.building.resource_multiplier();
                }
            }
        }

        distribution
    }

    /// Players with a building on one of the tile's corners (robber
    /// steal candidates)
    pub fn players_adjacent_to_tile(&self, tile: TileId) -> BTreeSet<PlayerId> {
        self.nodes_of_tile(tile)
            .filter_map(|n| n.building.owner())
            .collect()
    }

    // ==================== Longest Road ====================

    /// Length of the player's longest road: the longest simple path over
    /// their road edges. A path may revisit a node but never reuse an
    /// edge, and cannot continue through a node carrying an opponent's
    /// building.
    pub fn longest_road(&self, player: PlayerId) -> u32 {
        let mut best = 0;
        for node in &self.nodes {
            if node
                .incident_edges
                .iter()
                .any(|&e| self.edges[e].road == Some(player))
            {
                let mut visited = HashSet::new();
                best = best.max(self.longest_path_from(player, node.id, &mut visited));
            }
        }
        best
    }

    /// DFS over road edges with a visited-edge set. Recursion depth is
    /// bounded by the player's road count (at most 15 pieces).
    fn longest_path_from(
        &self,
        player: PlayerId,
        node: NodeId,
        visited: &mut HashSet<EdgeId>,
    ) -> u32 {
        let mut best = 0;
        for &eid in &self.nodes[node].incident_edges {
            if visited.contains(&eid) || self.edges[eid].road != Some(player) {
                continue;
            }
            let other = self.edges[eid].other_end(node);
            visited.insert(eid);
            // An opponent building ends the path at `other`; the edge
            // leading into it still counts.
            let blocked = self.nodes[other]
                .building
                .owner()
                .is_some_and(|o| o != player);
            let len = if blocked {
                1
            } else {
                1 + self.longest_path_from(player, other, visited)
            };
            best = best.max(len);
            visited.remove(&eid);
        }
        best
    }
}
