//! Persistent storage for units, entities, mentions, and links
//!
//! RocksDB holds the records; three derived indexes serve retrieval:
//! a per-agent vector index ([`vector::VectorIndex`]), a BM25 full-text
//! index ([`fulltext::FulltextIndex`]), and prefix-keyed secondary indexes
//! in a dedicated index DB (event dates, documents, text hashes, entity
//! mentions, entity name tokens).
//!
//! Readers and writers are concurrent. Link upserts are read-modify-write
//! and serialize behind a single lock; everything else relies on RocksDB's
//! own write ordering. Unit + mention writes for one unit go through one
//! WriteBatch with a synced WAL, so a crash never leaves a unit half
//! recorded.
//!
//! Key layout, primary DB:
//!   unit:{uuid}                      -> MemoryUnit
//!   entity:{uuid}                    -> Entity
//!   link:{from}:{type}:{to}          -> Link       (both directions stored)
//!
//! Key layout, index DB:
//!   event:{agent}:{ts16}:{uuid}      -> ""   ordered event_date scan
//!   doc:{agent}:{document_id}:{uuid} -> ""   document cascade
//!   hash:{agent}:{fnv64}             -> uuid  exact-text dedupe
//!   mention:{entity}:{unit}          -> ""   units_for_entity
//!   umention:{unit}:{entity}         -> ""   mention cascade
//!   etok:{agent}:{kind}:{token}:{entity} -> ""  resolver candidates
//!   eagent:{agent}:{entity}          -> ""   agent cascade

pub mod fulltext;
pub mod vector;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::{Mutex, RwLock};
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, WriteOptions, DB};
use tracing::{debug, info, warn};

use crate::errors::{MemoryError, Result};
use crate::types::{
    Entity, EntityId, EntityMention, FactType, Link, LinkMetadata, LinkType, MemoryUnit, UnitId,
};

pub use fulltext::FulltextIndex;
pub use vector::{cosine_similarity, VectorIndex, VectorIndexConfig};

/// Durable store plus derived retrieval indexes
pub struct MemoryStore {
    db: Arc<DB>,
    index_db: Arc<DB>,
    fulltext: FulltextIndex,
    vector_config: VectorIndexConfig,
    vectors: RwLock<HashMap<String, Arc<VectorIndex>>>,
    /// Serializes link upserts (read-modify-write on weights)
    link_lock: Mutex<()>,
    storage_path: PathBuf,
}

impl MemoryStore {
    /// Open or create the store, rebuilding in-memory indexes from disk
    pub fn new(path: &Path, vector_config: VectorIndexConfig) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = Arc::new(DB::open(&opts, path.join("records"))?);
        let index_db = Arc::new(DB::open(&opts, path.join("indexes"))?);
        let fulltext = FulltextIndex::new(&path.join("fulltext"))?;

        let store = Self {
            db,
            index_db,
            fulltext,
            vector_config,
            vectors: RwLock::new(HashMap::new()),
            link_lock: Mutex::new(()),
            storage_path: path.to_path_buf(),
        };

        let rebuilt = store.rebuild_vector_indexes()?;
        if rebuilt > 0 {
            info!("Rebuilt vector indexes for {} units", rebuilt);
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    /// Replay stored units into the per-agent vector indexes at startup
    fn rebuild_vector_indexes(&self) -> Result<usize> {
        let mut count = 0;
        let iter = self
            .db
            .iterator(IteratorMode::From(b"unit:", Direction::Forward));
        for (key, value) in iter.flatten() {
            if !key.starts_with(b"unit:") {
                break;
            }
            let unit: MemoryUnit = bincode::deserialize(&value)?;
            self.agent_vectors(&unit.agent_id)
                .insert(unit.id, unit.fact_type, unit.embedding.clone())?;
            count += 1;
        }
        Ok(count)
    }

    fn agent_vectors(&self, agent_id: &str) -> Arc<VectorIndex> {
        if let Some(index) = self.vectors.read().get(agent_id) {
            return Arc::clone(index);
        }
        let mut vectors = self.vectors.write();
        Arc::clone(
            vectors
                .entry(agent_id.to_string())
                .or_insert_with(|| Arc::new(VectorIndex::new(self.vector_config.clone()))),
        )
    }

    fn sync_writes() -> WriteOptions {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(true);
        write_opts
    }

    // =========================================================================
    // UNITS
    // =========================================================================

    /// Insert a unit and its entity mentions as one logical transaction
    ///
    /// Fails with `Conflict` only on an exact-id collision; content dedupe
    /// is the ingestor's job. The vector index and BM25 document are added
    /// here; BM25 visibility still requires [`MemoryStore::commit`].
    pub fn insert_unit(&self, unit: &MemoryUnit, entity_ids: &[EntityId]) -> Result<UnitId> {
        if unit.embedding.len() != self.vector_config.dimension {
            return Err(MemoryError::invalid_input(
                "embedding",
                format!(
                    "dimension mismatch: expected {}, got {}",
                    self.vector_config.dimension,
                    unit.embedding.len()
                ),
            ));
        }

        let key = unit_key(&unit.id);
        if self.db.get(&key)?.is_some() {
            return Err(MemoryError::Conflict(format!(
                "unit {} already exists",
                unit.id
            )));
        }

        let mut batch = WriteBatch::default();
        batch.put(&key, bincode::serialize(unit)?);
        self.db.write_opt(batch, &Self::sync_writes())?;

        let mut index_batch = WriteBatch::default();
        index_batch.put(event_key(&unit.agent_id, unit.event_date, &unit.id), b"");
        if let Some(doc) = &unit.document_id {
            index_batch.put(doc_key(&unit.agent_id, doc, &unit.id), b"");
        }
        index_batch.put(
            hash_key(&unit.agent_id, &unit.text),
            unit.id.to_string().as_bytes(),
        );
        for entity_id in entity_ids {
            index_batch.put(mention_key(entity_id, &unit.id), b"");
            index_batch.put(unit_mention_key(&unit.id, entity_id), b"");
        }
        self.index_db.write_opt(index_batch, &Self::sync_writes())?;

        self.fulltext
            .add(&unit.id, &unit.agent_id, unit.fact_type, &unit.text)?;
        self.agent_vectors(&unit.agent_id)
            .insert(unit.id, unit.fact_type, unit.embedding.clone())?;

        debug!(unit = %unit.id, agent = %unit.agent_id, "unit inserted");
        Ok(unit.id)
    }

    pub fn get_unit(&self, id: &UnitId) -> Result<MemoryUnit> {
        match self.db.get(unit_key(id))? {
            Some(value) => Ok(bincode::deserialize(&value)?),
            None => Err(MemoryError::NotFound(format!("unit {id}"))),
        }
    }

    /// Delete a unit, cascading its mentions, links, and index entries
    pub fn delete_unit(&self, id: &UnitId) -> Result<()> {
        let unit = self.get_unit(id)?;

        let mut batch = WriteBatch::default();
        let mut index_batch = WriteBatch::default();

        // Links: scan outgoing, delete both directions
        for link in self.neighbors(id, 0.0)? {
            batch.delete(link_key(&link.from, link.link_type, &link.to));
            batch.delete(link_key(&link.to, link.link_type, &link.from));
        }

        // Mentions, both index directions
        for entity_id in self.entities_for_unit(id)? {
            index_batch.delete(mention_key(&entity_id, id));
            index_batch.delete(unit_mention_key(id, &entity_id));
        }

        index_batch.delete(event_key(&unit.agent_id, unit.event_date, id));
        if let Some(doc) = &unit.document_id {
            index_batch.delete(doc_key(&unit.agent_id, doc, id));
        }
        // The hash slot cascades only while it still points at this unit
        let hkey = hash_key(&unit.agent_id, &unit.text);
        if let Some(existing) = self.index_db.get(&hkey)? {
            if existing.as_slice() == unit.id.to_string().as_bytes() {
                index_batch.delete(&hkey);
            }
        }

        batch.delete(unit_key(id));
        self.db.write_opt(batch, &Self::sync_writes())?;
        self.index_db.write_opt(index_batch, &Self::sync_writes())?;

        self.fulltext.remove(id)?;
        self.agent_vectors(&unit.agent_id).remove(id);

        debug!(unit = %id, "unit deleted with cascades");
        Ok(())
    }

    /// Delete all units of a document, returning the deleted ids
    pub fn delete_document(&self, agent_id: &str, document_id: &str) -> Result<Vec<UnitId>> {
        let prefix = format!("doc:{agent_id}:{document_id}:");
        let ids = self.scan_suffix_ids(&prefix)?;
        let unit_ids: Vec<UnitId> = ids.into_iter().map(UnitId).collect();
        for id in &unit_ids {
            self.delete_unit(id)?;
        }
        Ok(unit_ids)
    }

    /// Delete every record belonging to an agent
    pub fn delete_agent(&self, agent_id: &str) -> Result<()> {
        let prefix = format!("event:{agent_id}:");
        let mut unit_ids = Vec::new();
        let iter = self
            .index_db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward));
        for (key, _) in iter.flatten() {
            let key_str = String::from_utf8_lossy(&key);
            if !key_str.starts_with(&prefix) {
                break;
            }
            if let Some(id) = key_str.rsplit(':').next().and_then(|s| s.parse().ok()) {
                unit_ids.push(UnitId(id));
            }
        }
        for id in &unit_ids {
            self.delete_unit(id)?;
        }

        // Entities of the agent
        let eprefix = format!("eagent:{agent_id}:");
        let mut batch = WriteBatch::default();
        let mut index_batch = WriteBatch::default();
        let iter = self
            .index_db
            .iterator(IteratorMode::From(eprefix.as_bytes(), Direction::Forward));
        for (key, _) in iter.flatten() {
            let key_str = String::from_utf8_lossy(&key);
            if !key_str.starts_with(&eprefix) {
                break;
            }
            if let Some(id) = key_str.rsplit(':').next().and_then(|s| s.parse().ok()) {
                batch.delete(entity_key(&EntityId(id)));
            }
            index_batch.delete(key.as_ref());
        }
        // Entity token keys for the agent
        let tprefix = format!("etok:{agent_id}:");
        let iter = self
            .index_db
            .iterator(IteratorMode::From(tprefix.as_bytes(), Direction::Forward));
        for (key, _) in iter.flatten() {
            if !key.starts_with(tprefix.as_bytes()) {
                break;
            }
            index_batch.delete(key.as_ref());
        }

        self.db.write_opt(batch, &Self::sync_writes())?;
        self.index_db.write_opt(index_batch, &Self::sync_writes())?;
        self.fulltext.remove_agent(agent_id)?;
        self.vectors.write().remove(agent_id);

        info!(agent = %agent_id, units = unit_ids.len(), "agent deleted");
        Ok(())
    }

    /// Exact-text dedupe lookup
    pub fn find_duplicate(&self, agent_id: &str, text: &str) -> Result<Option<UnitId>> {
        let Some(value) = self.index_db.get(hash_key(agent_id, text))? else {
            return Ok(None);
        };
        let id_str = String::from_utf8_lossy(&value);
        let Ok(raw) = id_str.parse() else {
            return Ok(None);
        };
        let id = UnitId(raw);
        // Hash slots can collide or go stale; trust only a live exact match
        match self.get_unit(&id) {
            Ok(unit) if unit.text == text => Ok(Some(id)),
            _ => Ok(None),
        }
    }

    /// Best-effort access counting; increments may be dropped
    pub fn increment_access(&self, ids: &[UnitId]) {
        for id in ids {
            match self.get_unit(id) {
                Ok(mut unit) => {
                    unit.access_count += 1;
                    if let Ok(bytes) = bincode::serialize(&unit) {
                        if let Err(e) = self.db.put(unit_key(id), bytes) {
                            warn!(unit = %id, "access count write failed: {e}");
                        }
                    }
                }
                Err(_) => continue,
            }
        }
    }

    // =========================================================================
    // SEARCH SURFACES
    // =========================================================================

    /// Approximate k-nearest-neighbor search over an agent's embeddings
    pub fn vector_knn(
        &self,
        agent_id: &str,
        fact_type: Option<FactType>,
        query_vec: &[f32],
        k: usize,
        min_sim: f32,
    ) -> Result<Vec<(UnitId, f32)>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let Some(index) = self.vectors.read().get(agent_id).map(Arc::clone) else {
            return Ok(Vec::new());
        };
        index.search(query_vec, k, min_sim, fact_type)
    }

    /// BM25 search over pre-stemmed query tokens
    pub fn bm25_search(
        &self,
        agent_id: &str,
        fact_type: Option<FactType>,
        query_tokens: &[String],
        k: usize,
    ) -> Result<Vec<(UnitId, f32)>> {
        self.fulltext.search(agent_id, fact_type, query_tokens, k)
    }

    /// All outgoing links of a unit at or above a weight threshold
    pub fn neighbors(&self, unit_id: &UnitId, min_weight: f32) -> Result<Vec<Link>> {
        let prefix = format!("link:{unit_id}:");
        let mut links = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward));
        for (key, value) in iter.flatten() {
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            let link: Link = bincode::deserialize(&value)?;
            if link.weight >= min_weight {
                links.push(link);
            }
        }
        Ok(links)
    }

    /// Units mentioning an entity
    pub fn units_for_entity(&self, entity_id: &EntityId) -> Result<Vec<UnitId>> {
        let prefix = format!("mention:{entity_id}:");
        Ok(self
            .scan_suffix_ids(&prefix)?
            .into_iter()
            .map(UnitId)
            .collect())
    }

    /// Entities mentioned by a unit
    pub fn entities_for_unit(&self, unit_id: &UnitId) -> Result<Vec<EntityId>> {
        let prefix = format!("umention:{unit_id}:");
        Ok(self
            .scan_suffix_ids(&prefix)?
            .into_iter()
            .map(EntityId)
            .collect())
    }

    /// Mentions of a unit as (unit, entity) pairs
    pub fn mentions_for_unit(&self, unit_id: &UnitId) -> Result<Vec<EntityMention>> {
        Ok(self
            .entities_for_unit(unit_id)?
            .into_iter()
            .map(|entity_id| EntityMention {
                unit_id: *unit_id,
                entity_id,
            })
            .collect())
    }

    /// Units of an agent with event_date inside [start, end], ordered by
    /// event_date ascending. Backed by the event index; no full scans.
    pub fn units_in_range(
        &self,
        agent_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<(UnitId, DateTime<Utc>)>> {
        if end < start {
            return Ok(Vec::new());
        }
        let agent_prefix = format!("event:{agent_id}:");
        let from = format!("{agent_prefix}{}", encode_ts(start));
        let end_enc = encode_ts(end);

        let mut out = Vec::new();
        let iter = self
            .index_db
            .iterator(IteratorMode::From(from.as_bytes(), Direction::Forward));
        for (key, _) in iter.flatten() {
            let key_str = String::from_utf8_lossy(&key);
            if !key_str.starts_with(&agent_prefix) {
                break;
            }
            let rest = &key_str[agent_prefix.len()..];
            let Some((ts_part, id_part)) = rest.split_once(':') else {
                continue;
            };
            if ts_part > end_enc.as_str() {
                break;
            }
            let Some(ts) = decode_ts(ts_part) else {
                continue;
            };
            if let Ok(raw) = id_part.parse() {
                out.push((UnitId(raw), ts));
            }
        }
        Ok(out)
    }

    // =========================================================================
    // LINKS
    // =========================================================================

    /// Upsert one link; see [`MemoryStore::upsert_links`]
    pub fn upsert_link(
        &self,
        from: &UnitId,
        to: &UnitId,
        link_type: LinkType,
        weight: f32,
        metadata: LinkMetadata,
    ) -> Result<()> {
        self.upsert_links(&[(*from, *to, link_type, weight, metadata)])
    }

    /// Upsert a batch of links in one synced write
    ///
    /// Both directions are stored per link; an existing link of the same
    /// type between the same pair keeps the greater weight. Upserts are
    /// serialized so concurrent read-modify-write cycles cannot lose a
    /// weight.
    pub fn upsert_links(
        &self,
        links: &[(UnitId, UnitId, LinkType, f32, LinkMetadata)],
    ) -> Result<()> {
        if links.is_empty() {
            return Ok(());
        }
        for (from, to, _, weight, _) in links {
            if from == to {
                return Err(MemoryError::invalid_input("link", "self links not allowed"));
            }
            if !(0.0..=1.0).contains(weight) {
                return Err(MemoryError::invalid_input(
                    "weight",
                    format!("must be within [0, 1], got {weight}"),
                ));
            }
        }

        let _guard = self.link_lock.lock();

        // Merge duplicates within the batch before touching disk
        let mut merged: HashMap<(UnitId, LinkType, UnitId), Link> = HashMap::new();
        for (from, to, link_type, weight, metadata) in links {
            for (a, b) in [(from, to), (to, from)] {
                let key = (*a, *link_type, *b);
                match merged.get_mut(&key) {
                    Some(link) if link.weight >= *weight => {}
                    Some(link) => link.weight = *weight,
                    None => {
                        let existing_weight = match self.db.get(link_key(a, *link_type, b))? {
                            Some(bytes) => {
                                let existing: Link = bincode::deserialize(&bytes)?;
                                Some(existing.weight)
                            }
                            None => None,
                        };
                        merged.insert(
                            key,
                            Link {
                                from: *a,
                                to: *b,
                                link_type: *link_type,
                                weight: existing_weight.map_or(*weight, |w| w.max(*weight)),
                                metadata: metadata.clone(),
                            },
                        );
                    }
                }
            }
        }

        let mut batch = WriteBatch::default();
        for ((a, link_type, b), link) in &merged {
            batch.put(link_key(a, *link_type, b), bincode::serialize(link)?);
        }
        self.db.write_opt(batch, &Self::sync_writes())?;
        Ok(())
    }

    // =========================================================================
    // ENTITIES
    // =========================================================================

    /// Insert a new entity with its normalized name tokens
    pub fn insert_entity(&self, entity: &Entity, tokens: &[String]) -> Result<EntityId> {
        let key = entity_key(&entity.id);
        if self.db.get(&key)?.is_some() {
            return Err(MemoryError::Conflict(format!(
                "entity {} already exists",
                entity.id
            )));
        }
        self.db
            .put_opt(&key, bincode::serialize(entity)?, &Self::sync_writes())?;

        let mut index_batch = WriteBatch::default();
        index_batch.put(
            format!("eagent:{}:{}", entity.agent_id, entity.id).as_bytes(),
            b"",
        );
        for token in tokens {
            index_batch.put(entity_token_key(&entity.agent_id, entity.kind, token, &entity.id), b"");
        }
        self.index_db.write_opt(index_batch, &Self::sync_writes())?;
        Ok(entity.id)
    }

    pub fn get_entity(&self, id: &EntityId) -> Result<Entity> {
        match self.db.get(entity_key(id))? {
            Some(value) => Ok(bincode::deserialize(&value)?),
            None => Err(MemoryError::NotFound(format!("entity {id}"))),
        }
    }

    /// Rewrite an entity record, adding any new name tokens
    pub fn update_entity(&self, entity: &Entity, new_tokens: &[String]) -> Result<()> {
        self.db.put_opt(
            entity_key(&entity.id),
            bincode::serialize(entity)?,
            &Self::sync_writes(),
        )?;
        if !new_tokens.is_empty() {
            let mut index_batch = WriteBatch::default();
            for token in new_tokens {
                index_batch.put(
                    entity_token_key(&entity.agent_id, entity.kind, token, &entity.id),
                    b"",
                );
            }
            self.index_db.write_opt(index_batch, &Self::sync_writes())?;
        }
        Ok(())
    }

    /// Entities of an agent and kind whose name tokens intersect the given
    /// token set
    pub fn entities_by_token(
        &self,
        agent_id: &str,
        kind: crate::types::EntityKind,
        tokens: &[String],
    ) -> Result<Vec<Entity>> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for token in tokens {
            let prefix = format!("etok:{agent_id}:{}:{token}:", kind.as_str());
            for raw in self.scan_suffix_ids(&prefix)? {
                let id = EntityId(raw);
                if seen.insert(id) {
                    if let Ok(entity) = self.get_entity(&id) {
                        out.push(entity);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Record additional mentions after unit insertion (repair path)
    pub fn record_mentions(&self, unit_id: &UnitId, entity_ids: &[EntityId]) -> Result<()> {
        let mut index_batch = WriteBatch::default();
        for entity_id in entity_ids {
            index_batch.put(mention_key(entity_id, unit_id), b"");
            index_batch.put(unit_mention_key(unit_id, entity_id), b"");
        }
        self.index_db.write_opt(index_batch, &Self::sync_writes())?;
        Ok(())
    }

    /// BM25 visibility fence: commit pending documents and reload readers
    pub fn commit(&self) -> Result<()> {
        self.fulltext.commit_and_reload()
    }

    /// Access to the fulltext analyzer (query-side stemming)
    pub fn fulltext(&self) -> &FulltextIndex {
        &self.fulltext
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    /// Scan keys `{prefix}{uuid}` and parse the trailing uuid segment
    fn scan_suffix_ids(&self, prefix: &str) -> Result<Vec<uuid::Uuid>> {
        let mut out = Vec::new();
        let iter = self
            .index_db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward));
        for (key, _) in iter.flatten() {
            let key_str = String::from_utf8_lossy(&key);
            if !key_str.starts_with(prefix) {
                break;
            }
            if let Ok(raw) = key_str[prefix.len()..].parse() {
                out.push(raw);
            }
        }
        Ok(out)
    }
}

// =============================================================================
// KEY ENCODING
// =============================================================================

fn unit_key(id: &UnitId) -> String {
    format!("unit:{id}")
}

fn entity_key(id: &EntityId) -> String {
    format!("entity:{id}")
}

fn link_key(from: &UnitId, link_type: LinkType, to: &UnitId) -> String {
    format!("link:{from}:{}:{to}", link_type.as_str())
}

fn event_key(agent_id: &str, ts: DateTime<Utc>, id: &UnitId) -> String {
    format!("event:{agent_id}:{}:{id}", encode_ts(ts))
}

fn doc_key(agent_id: &str, document_id: &str, id: &UnitId) -> String {
    format!("doc:{agent_id}:{document_id}:{id}")
}

fn hash_key(agent_id: &str, text: &str) -> String {
    format!("hash:{agent_id}:{:016x}", fnv1a64(text.as_bytes()))
}

fn mention_key(entity_id: &EntityId, unit_id: &UnitId) -> String {
    format!("mention:{entity_id}:{unit_id}")
}

fn unit_mention_key(unit_id: &UnitId, entity_id: &EntityId) -> String {
    format!("umention:{unit_id}:{entity_id}")
}

fn entity_token_key(
    agent_id: &str,
    kind: crate::types::EntityKind,
    token: &str,
    entity_id: &EntityId,
) -> String {
    format!("etok:{agent_id}:{}:{token}:{entity_id}", kind.as_str())
}

/// Order-preserving hex encoding of a millisecond timestamp; sign bit is
/// flipped so pre-epoch dates sort before post-epoch ones.
fn encode_ts(ts: DateTime<Utc>) -> String {
    format!("{:016x}", (ts.timestamp_millis() as u64) ^ (1u64 << 63))
}

fn decode_ts(encoded: &str) -> Option<DateTime<Utc>> {
    let raw = u64::from_str_radix(encoded, 16).ok()?;
    let millis = (raw ^ (1u64 << 63)) as i64;
    Utc.timestamp_millis_opt(millis).single()
}

/// FNV-1a over unit text; collisions are disambiguated by comparing the
/// stored text before trusting a dedupe hit.
fn fnv1a64(data: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in data {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
