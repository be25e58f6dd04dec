//! Database dump and restore.
//!
//! A dump is line oriented. Each node is written as `n {json}` and each
//! relationship as `r {json}`. Node ids are renumbered from 0 in id order
//! and relationship endpoints refer to the renumbered ids, so a dump does
//! not depend on the ids of the database it came from.
//!
//! ```text
//! n {"id":0,"labels":["Person"],"properties":{"name":"Alice"}}
//! n {"id":1,"labels":["Person"],"properties":{"name":"Bob"}}
//! r {"from":0,"to":1,"type":"KNOWS","properties":{}}
//! ```

use std::collections::HashMap;
use std::io::{BufRead, Write};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::client::Client;
use super::error::{DriverError, DriverResult};
use super::transport::Connector;
use super::types::PropertyMap;

/// Nodes per CREATE batch
const NODE_BATCH_SIZE: usize = 256;
/// Serialized JSON bytes after which a node batch is closed
const NODE_BATCH_BYTES: usize = 0x20000;
/// Relationships per CREATE batch
const RELATIONSHIP_BATCH_SIZE: usize = 256;

type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Counts of what a dump load created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub nodes: usize,
    pub relationships: usize,
}

#[derive(Serialize)]
struct NodeLine<'a> {
    id: i64,
    labels: &'a [String],
    properties: &'a PropertyMap,
}

#[derive(Serialize)]
struct RelationshipLine<'a> {
    from: Option<i64>,
    to: Option<i64>,
    #[serde(rename = "type")]
    rel_type: &'a str,
    properties: &'a PropertyMap,
}

#[derive(Debug, Serialize, Deserialize)]
struct DumpedNode {
    id: i64,
    labels: Vec<String>,
    properties: JsonMap,
}

#[derive(Debug, Deserialize)]
struct DumpedRelationship {
    from: Option<i64>,
    to: Option<i64>,
    #[serde(rename = "type")]
    rel_type: String,
    properties: JsonMap,
}

#[derive(Serialize)]
struct RelationshipParams<'a> {
    from: Option<i64>,
    to: Option<i64>,
    properties: &'a JsonMap,
}

impl<C: Connector> Client<C> {
    /// Write every node and relationship to `writer`.
    ///
    /// Both passes run in one transaction so the dump is consistent.
    pub fn dump_database<W: Write>(&mut self, writer: &mut W) -> DriverResult<()> {
        self.transaction(|client| {
            let mut id_map: HashMap<i64, i64> = HashMap::new();

            client.run_query("MATCH (n) RETURN n ORDER BY ID(n);", (), |row| {
                let node = row.get_node("n")?;
                let id = id_map.len() as i64;
                id_map.insert(node.id(), id);
                let line = NodeLine {
                    id,
                    labels: node.labels(),
                    properties: node.properties(),
                };
                write_line(&mut *writer, 'n', &line)
            })?;

            client.run_query("MATCH ()-[r]->() RETURN r;", (), |row| {
                let rel = row.get_relationship("r")?;
                let line = RelationshipLine {
                    from: id_map.get(&rel.start_node_id()).copied(),
                    to: id_map.get(&rel.end_node_id()).copied(),
                    rel_type: rel.rel_type(),
                    properties: rel.properties(),
                };
                write_line(&mut *writer, 'r', &line)
            })?;

            writer.flush()?;
            Ok(())
        })
    }

    /// Load a dump written by [`Client::dump_database`].
    ///
    /// Refuses to load into a database that already has nodes unless
    /// `force_append` is set. Nodes are created in batches per label set,
    /// then relationships in batches per type.
    pub fn load_database_dump<R: BufRead>(&mut self, reader: R, force_append: bool) -> DriverResult<LoadSummary> {
        if !force_append {
            let count = self
                .expect_one("MATCH (n) RETURN COUNT(n) as count;", ())?
                .get_int("count")?;
            if count != 0 {
                return Err(DriverError::invalid_dump(format!(
                    "Database already contains {} nodes; use force_append to load anyway",
                    count
                )));
            }
        }

        let (nodes_by_labels, rels_by_type) = parse_dump(reader)?;
        let mut summary = LoadSummary::default();
        let mut id_map: HashMap<i64, i64> = HashMap::new();

        for (_, batch) in nodes_by_labels {
            let mut batch = batch.into_iter().peekable();
            while batch.peek().is_some() {
                let mut slice = Vec::new();
                let mut json_size = 0;
                while json_size < NODE_BATCH_BYTES && slice.len() < NODE_BATCH_SIZE {
                    let Some(node) = batch.next() else { break };
                    json_size += serde_json::to_string(&node)
                        .map_err(|e| DriverError::invalid_dump(e.to_string()))?
                        .len();
                    slice.push(node);
                }

                let query = format!(
                    "UNWIND $properties AS props CREATE (n{}) SET n = props RETURN ID(n) AS id;",
                    label_clause(&slice[0].labels)
                );
                let properties: Vec<&JsonMap> = slice.iter().map(|n| &n.properties).collect();
                let rows = self.query(&query, serde_json::json!({ "properties": properties }))?;
                if rows.len() != slice.len() {
                    return Err(DriverError::invalid_dump(format!(
                        "Expected {} node ids, got {}",
                        slice.len(),
                        rows.len()
                    )));
                }
                for (node, row) in slice.iter().zip(&rows) {
                    id_map.insert(node.id, row.get_int("id")?);
                }

                summary.nodes += slice.len();
                info!("Loaded {} nodes, {} relationships...", summary.nodes, summary.relationships);
            }
        }

        for (rel_type, batch) in rels_by_type {
            let query = format!(
                "UNWIND $slice AS props \
                 MATCH (from), (to) WHERE ID(from) = props.from AND ID(to) = props.to \
                 CREATE (from)-[r:{}]->(to) \
                 SET r = props.properties \
                 RETURN COUNT(r) AS count_r, COUNT(from) AS count_from, COUNT(to) AS count_to;",
                quote_name(&rel_type)
            );
            for slice in batch.chunks(RELATIONSHIP_BATCH_SIZE) {
                let params: Vec<RelationshipParams<'_>> = slice
                    .iter()
                    .map(|rel| RelationshipParams {
                        from: rel.from.and_then(|id| id_map.get(&id).copied()),
                        to: rel.to.and_then(|id| id_map.get(&id).copied()),
                        properties: &rel.properties,
                    })
                    .collect();
                let created = self
                    .expect_one(&query, serde_json::json!({ "slice": params }))?
                    .get_int("count_r")?;
                if created != slice.len() as i64 {
                    return Err(DriverError::invalid_dump(format!(
                        "Expected {} relationships, got {}",
                        slice.len(),
                        created
                    )));
                }

                summary.relationships += slice.len();
                info!("Loaded {} nodes, {} relationships...", summary.nodes, summary.relationships);
            }
        }

        Ok(summary)
    }
}

fn write_line<W: Write, T: Serialize>(writer: &mut W, prefix: char, entry: &T) -> DriverResult<()> {
    let json = serde_json::to_string(entry).map_err(|e| DriverError::invalid_dump(e.to_string()))?;
    writeln!(writer, "{} {}", prefix, json)?;
    Ok(())
}

type NodeGroups = IndexMap<String, Vec<DumpedNode>>;
type RelationshipGroups = IndexMap<String, Vec<DumpedRelationship>>;

/// Group dump lines: nodes by sorted label set, relationships by type.
fn parse_dump<R: BufRead>(reader: R) -> DriverResult<(NodeGroups, RelationshipGroups)> {
    let mut nodes = NodeGroups::new();
    let mut rels = RelationshipGroups::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let invalid = |e: serde_json::Error| {
            DriverError::invalid_dump(format!("line {}: {}", index + 1, e))
        };

        if let Some(json) = line.strip_prefix("n ") {
            let node: DumpedNode = serde_json::from_str(json).map_err(invalid)?;
            let mut labels = node.labels.clone();
            labels.sort();
            nodes.entry(labels.join("/")).or_default().push(node);
        } else if let Some(json) = line.strip_prefix("r ") {
            let rel: DumpedRelationship = serde_json::from_str(json).map_err(invalid)?;
            rels.entry(rel.rel_type.clone()).or_default().push(rel);
        } else {
            return Err(DriverError::invalid_dump(format!(
                "line {}: invalid entry: {}",
                index + 1,
                line
            )));
        }
    }

    Ok((nodes, rels))
}

/// `:A:B` for a label list, empty for none.
fn label_clause(labels: &[String]) -> String {
    labels.iter().map(|l| format!(":{}", quote_name(l))).collect()
}

/// Backtick-quote a label or relationship type.
fn quote_name(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_groups_by_sorted_labels() {
        let dump = "\
n {\"id\":0,\"labels\":[\"B\",\"A\"],\"properties\":{}}

n {\"id\":1,\"labels\":[\"A\",\"B\"],\"properties\":{\"x\":1}}
n {\"id\":2,\"labels\":[],\"properties\":{}}
r {\"from\":0,\"to\":1,\"type\":\"KNOWS\",\"properties\":{}}
r {\"from\":1,\"to\":null,\"type\":\"LIKES\",\"properties\":{}}
";
        let (nodes, rels) = parse_dump(dump.as_bytes()).unwrap();
        assert_eq!(nodes.keys().collect::<Vec<_>>(), ["A/B", ""]);
        assert_eq!(nodes["A/B"].len(), 2);
        assert_eq!(rels.keys().collect::<Vec<_>>(), ["KNOWS", "LIKES"]);
        assert_eq!(rels["LIKES"][0].to, None);
    }

    #[test]
    fn test_parse_rejects_unknown_prefix() {
        let err = parse_dump("x {}\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DriverError::InvalidDump(ref m) if m.starts_with("line 1")));

        let err = parse_dump("n {not json}\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DriverError::InvalidDump(_)));
    }

    #[test]
    fn test_label_quoting() {
        assert_eq!(label_clause(&["Person".into(), "Odd`Name".into()]), ":`Person`:`Odd``Name`");
        assert_eq!(label_clause(&[]), "");
    }

    #[test]
    fn test_node_line_format() {
        let mut properties = PropertyMap::new();
        properties.insert("name".into(), "Alice".into());
        let labels = vec!["Person".to_string()];
        let mut out = Vec::new();
        write_line(
            &mut out,
            'n',
            &NodeLine {
                id: 0,
                labels: &labels,
                properties: &properties,
            },
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "n {\"id\":0,\"labels\":[\"Person\"],\"properties\":{\"name\":\"Alice\"}}\n"
        );
    }
}
