use crate::config::Limits;
use crate::reader::{ByteReader, ReaderError};
use crate::stats::{Aggregate, StatsError};
use crate::table::{HandleTable, TableError};

/// Result of scanning a binary directed-graph description:
///
/// ```text
/// [u32 node_count][u32 edge_count] then edge_count × [u32 src][u32 dst]
/// ```
///
/// Adjacency lists live in a handle table with one slot per node, so every
/// edge insertion goes through validated index access. Edges naming nodes
/// outside `0..node_count` are rejected and counted, not written.
#[derive(Debug)]
pub struct GraphScan {
    pub adjacency: HandleTable<Vec<u32>>,
    pub node_count: usize,
    pub edges_added: u64,
    pub rejected_edges: Vec<TableError>,
    pub fault: Option<ReaderError>,
}

impl GraphScan {
    /// Mean out-degree across all nodes.
    pub fn average_out_degree(&self) -> Result<i64, StatsError> {
        let mut agg = Aggregate::new();
        for (_, neighbors) in self.adjacency.iter() {
            agg.push(neighbors.len() as i64);
        }
        agg.mean()
    }

    pub fn neighbors(&self, node: usize) -> Option<&Vec<u32>> {
        self.adjacency.get(node).ok()
    }
}

pub fn scan(bytes: &[u8], limits: &Limits) -> GraphScan {
    let mut reader = ByteReader::new(bytes);
    let mut scan = GraphScan {
        adjacency: HandleTable::new(limits.max_records),
        node_count: 0,
        edges_added: 0,
        rejected_edges: Vec::new(),
        fault: None,
    };

    let node_count = match reader.read_count(limits.max_records) {
        Ok(count) => count,
        Err(e) => {
            scan.fault = Some(e);
            return scan;
        }
    };
    let edge_count = match reader.read_count(limits.max_records) {
        Ok(count) => count,
        Err(e) => {
            scan.fault = Some(e);
            return scan;
        }
    };

    scan.node_count = node_count;
    for node in 0..node_count {
        // Within the cap by construction: node_count was validated above.
        if scan.adjacency.create(node, Vec::new()).is_err() {
            break;
        }
    }

    for _ in 0..edge_count {
        let src = match reader.read_u32() {
            Ok(v) => v,
            Err(e) => {
                scan.fault = Some(e);
                break;
            }
        };
        let dst = match reader.read_u32() {
            Ok(v) => v,
            Err(e) => {
                scan.fault = Some(e);
                break;
            }
        };

        match insert_edge(&mut scan.adjacency, node_count, src, dst) {
            Ok(()) => scan.edges_added += 1,
            Err(e) => scan.rejected_edges.push(e),
        }
    }

    scan
}

fn insert_edge(
    adjacency: &mut HandleTable<Vec<u32>>,
    node_count: usize,
    src: u32,
    dst: u32,
) -> Result<(), TableError> {
    for endpoint in [src, dst] {
        if endpoint as usize >= node_count {
            return Err(TableError::IndexOutOfRange {
                index: i64::from(endpoint),
                max: node_count,
            });
        }
    }
    adjacency.get_mut(src as usize)?.push(dst);
    Ok(())
}
