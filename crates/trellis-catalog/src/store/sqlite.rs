use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::Connection;

use super::CatalogStore;
use crate::error::CatalogError;
use crate::types::{Direction, Edge, NodeInput, NodeRecord, Row};

pub struct SqliteCatalogStore {
    conn: Mutex<Connection>,
}

impl SqliteCatalogStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: &str) -> Result<Self, CatalogError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(Self::new(conn))
    }

    pub fn open_in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self::new(conn))
    }
}

const MIGRATE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS catalog_nodes (
    id TEXT PRIMARY KEY,
    node_type TEXT,
    name TEXT NOT NULL,
    owner_id TEXT,
    stewards TEXT NOT NULL DEFAULT '[]',
    attrs TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS catalog_edges (
    from_id TEXT NOT NULL REFERENCES catalog_nodes(id) ON DELETE CASCADE,
    to_id TEXT NOT NULL REFERENCES catalog_nodes(id) ON DELETE CASCADE,
    edge_type TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (from_id, to_id, edge_type)
);

CREATE INDEX IF NOT EXISTS idx_catalog_edges_to ON catalog_edges(to_id);
CREATE INDEX IF NOT EXISTS idx_catalog_nodes_owner ON catalog_nodes(owner_id);
"#;

const NODE_COLUMNS: &str =
    "id, node_type, name, owner_id, stewards, attrs, created_at, updated_at";

const NODE_COLUMNS_QUALIFIED: &str =
    "n.id, n.node_type, n.name, n.owner_id, n.stewards, n.attrs, n.created_at, n.updated_at";

fn node_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NodeRecord> {
    let stewards: String = row.get(4)?;
    let attrs: String = row.get(5)?;
    Ok(NodeRecord {
        id: row.get(0)?,
        node_type: row.get(1)?,
        name: row.get(2)?,
        owner_id: row.get(3)?,
        stewards: serde_json::from_str(&stewards).unwrap_or_default(),
        attrs: serde_json::from_str(&attrs).unwrap_or_default(),
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Structured columns addressable in a filter; everything else lives in the
/// attrs JSON document.
fn structured_column(field: &str) -> Option<&'static str> {
    match field {
        "id" => Some("id"),
        "name" => Some("name"),
        "type" | "node_type" => Some("node_type"),
        "owner_id" | "ownerId" | "ownerid" => Some("owner_id"),
        _ => None,
    }
}

fn valid_attr_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn migrate(&self) -> Result<(), CatalogError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(MIGRATE_SQL)?;
        Ok(())
    }

    async fn get_node(&self, id: &str) -> Result<Option<NodeRecord>, CatalogError> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            &format!("SELECT {NODE_COLUMNS} FROM catalog_nodes WHERE id = ?1"),
            [id],
            node_from_row,
        );
        match result {
            Ok(node) => Ok(Some(node)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(CatalogError::Database(e.to_string())),
        }
    }

    async fn insert_node(&self, input: &NodeInput) -> Result<NodeRecord, CatalogError> {
        let id = {
            let conn = self.conn.lock().unwrap();
            let id = input
                .id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
            let stewards = serde_json::to_string(&input.stewards)
                .map_err(|e| CatalogError::Database(e.to_string()))?;
            let attrs = serde_json::to_string(&input.attrs)
                .map_err(|e| CatalogError::Database(e.to_string()))?;
            conn.execute(
                "INSERT INTO catalog_nodes (id, node_type, name, owner_id, stewards, attrs)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, input.node_type, input.name, input.owner_id, stewards, attrs],
            )
            .map_err(|e| {
                if let rusqlite::Error::SqliteFailure(ref err, _) = e {
                    if err.extended_code == 1555 || err.extended_code == 2067 {
                        return CatalogError::InvalidInput(format!("node '{id}' already exists"));
                    }
                }
                CatalogError::Database(e.to_string())
            })?;
            id
        };
        self.get_node(&id)
            .await?
            .ok_or_else(|| CatalogError::Database("inserted node missing".into()))
    }

    async fn update_node_fields(&self, id: &str, fields: &Row) -> Result<NodeRecord, CatalogError> {
        let mut node = self
            .get_node(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("node '{id}' not found")))?;

        for (key, value) in fields {
            match key.as_str() {
                "id" | "created_at" | "updated_at" => {}
                "name" => {
                    if let Some(s) = value.as_str() {
                        node.name = s.to_string();
                    }
                }
                "type" | "node_type" => {
                    if let Some(s) = value.as_str() {
                        node.node_type = Some(s.to_string());
                    }
                }
                "owner_id" | "ownerId" | "ownerid" => {
                    if let Some(s) = value.as_str() {
                        node.owner_id = Some(s.to_string());
                    }
                }
                "stewards" => {
                    if let Some(items) = value.as_array() {
                        node.stewards = items
                            .iter()
                            .filter_map(|v| v.as_str().map(str::to_string))
                            .collect();
                    }
                }
                _ => {
                    node.attrs.insert(key.clone(), value.clone());
                }
            }
        }

        {
            let conn = self.conn.lock().unwrap();
            let stewards = serde_json::to_string(&node.stewards)
                .map_err(|e| CatalogError::Database(e.to_string()))?;
            let attrs = serde_json::to_string(&node.attrs)
                .map_err(|e| CatalogError::Database(e.to_string()))?;
            let changed = conn.execute(
                "UPDATE catalog_nodes
                    SET node_type = ?1, name = ?2, owner_id = ?3, stewards = ?4, attrs = ?5,
                        updated_at = datetime('now')
                  WHERE id = ?6",
                rusqlite::params![node.node_type, node.name, node.owner_id, stewards, attrs, id],
            )?;
            if changed == 0 {
                return Err(CatalogError::NotFound(format!("node '{id}' not found")));
            }
        }
        self.get_node(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("node '{id}' not found")))
    }

    async fn find_one(&self, filter: &[(String, String)]) -> Result<Option<NodeRecord>, CatalogError> {
        if filter.is_empty() {
            return Err(CatalogError::InvalidInput("empty filter".into()));
        }

        let mut clauses = Vec::with_capacity(filter.len());
        let mut params: Vec<&str> = Vec::with_capacity(filter.len());
        for (field, value) in filter {
            if let Some(column) = structured_column(field) {
                clauses.push(format!("{column} = ?"));
            } else if valid_attr_key(field) {
                clauses.push(format!("json_extract(attrs, '$.{field}') = ?"));
            } else {
                return Err(CatalogError::InvalidInput(format!(
                    "invalid filter field '{field}'"
                )));
            }
            params.push(value.as_str());
        }

        let sql = format!(
            "SELECT {NODE_COLUMNS} FROM catalog_nodes WHERE {} ORDER BY id LIMIT 1",
            clauses.join(" AND ")
        );

        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(&sql, rusqlite::params_from_iter(params), node_from_row);
        match result {
            Ok(node) => Ok(Some(node)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(CatalogError::Database(e.to_string())),
        }
    }

    async fn list_nodes(&self, seed: Option<&str>, cap: u32) -> Result<Vec<NodeRecord>, CatalogError> {
        let conn = self.conn.lock().unwrap();
        let nodes = match seed {
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {NODE_COLUMNS} FROM catalog_nodes ORDER BY id LIMIT ?1"
                ))?;
                let rows = stmt.query_map([cap], node_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            Some(seed) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {NODE_COLUMNS} FROM catalog_nodes
                      WHERE owner_id = ?1
                         OR EXISTS (SELECT 1 FROM json_each(stewards) WHERE json_each.value = ?1)
                      ORDER BY id LIMIT ?2"
                ))?;
                let rows = stmt.query_map(rusqlite::params![seed, cap], node_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(nodes)
    }

    async fn add_edge(&self, edge: &Edge) -> Result<Edge, CatalogError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO catalog_edges (from_id, to_id, edge_type) VALUES (?1, ?2, ?3)",
            rusqlite::params![edge.from_id, edge.to_id, edge.edge_type],
        )
        .map_err(|e| {
            if let rusqlite::Error::SqliteFailure(ref err, _) = e {
                if err.extended_code == 787 {
                    return CatalogError::NotFound("edge endpoint not found".into());
                }
            }
            CatalogError::Database(e.to_string())
        })?;
        Ok(edge.clone())
    }

    async fn neighbors(
        &self,
        node_id: &str,
        direction: Direction,
        depth: u32,
        cap: u32,
    ) -> Result<Vec<NodeRecord>, CatalogError> {
        // Lineage follows derived_from/contains edges; upstream walks
        // against edge direction, downstream with it.
        let sql = match direction {
            Direction::Upstream => format!(
                "WITH RECURSIVE walk(id, depth) AS (
                     SELECT ?1, 0
                     UNION
                     SELECT e.from_id, walk.depth + 1
                       FROM catalog_edges e JOIN walk ON e.to_id = walk.id
                      WHERE walk.depth < ?2
                        AND e.edge_type IN ('derived_from', 'contains')
                 )
                 SELECT DISTINCT {NODE_COLUMNS_QUALIFIED}
                   FROM catalog_nodes n JOIN walk ON n.id = walk.id
                  WHERE n.id <> ?1
                  ORDER BY n.id LIMIT ?3"
            ),
            Direction::Downstream => format!(
                "WITH RECURSIVE walk(id, depth) AS (
                     SELECT ?1, 0
                     UNION
                     SELECT e.to_id, walk.depth + 1
                       FROM catalog_edges e JOIN walk ON e.from_id = walk.id
                      WHERE walk.depth < ?2
                        AND e.edge_type IN ('derived_from', 'contains')
                 )
                 SELECT DISTINCT {NODE_COLUMNS_QUALIFIED}
                   FROM catalog_nodes n JOIN walk ON n.id = walk.id
                  WHERE n.id <> ?1
                  ORDER BY n.id LIMIT ?3"
            ),
        };

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params![node_id, depth, cap], node_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
