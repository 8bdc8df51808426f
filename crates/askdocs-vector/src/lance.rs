//! LanceDB-backed store with sequential record ids.
//!
//! Every row carries a `seq` assigned at first insert and kept across
//! upserts, which is what window merging walks. Filters on `source`,
//! `category` and `chunk_index` run inside LanceDB as `only_if` SQL; the
//! payload JSON is only decoded for rows that make the cut or for conditions
//! the SQL cannot express. The store owns a private
//! tokio runtime and blocks on it, so it must not be called from inside
//! another runtime.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use arrow_array::cast::AsArray;
use arrow_array::types::{Float32Type, UInt32Type};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int64Array, ListArray, RecordBatch, RecordBatchIterator, StringArray,
    TimestampMillisecondArray,
};
use askdocs_core::filter::Predicate;
use askdocs_core::traits::{SequentialStore, VectorStore};
use askdocs_core::types::{IndexedPoint, Payload, RetrievalCandidate, SeqRecord, SparseVector};
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::Table;
use tokio::runtime::Runtime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::pushdown::LanceFilter;
use crate::ranking::{dot, top_k};
use crate::schema::build_chunk_schema;
use crate::table::{ensure_table, open_db, quoted_list};

struct StoredRow {
    seq: i64,
    point_id: Uuid,
    content: String,
    source: String,
    payload_json: String,
    vector: Vec<f32>,
    sparse: SparseVector,
}

pub struct LanceStore {
    rt: Runtime,
    table: Table,
    dim: usize,
    // Next seq to hand out; also serialises writers.
    next_seq: Mutex<i64>,
}

impl LanceStore {
    pub fn open(path: &Path, table_name: &str, dim: usize) -> Result<Self> {
        let rt = Runtime::new()?;
        let uri = path.to_string_lossy().to_string();
        let table = rt.block_on(async {
            let db = open_db(&uri).await?;
            ensure_table(&db, table_name, build_chunk_schema(dim as i32)).await?;
            Ok::<_, anyhow::Error>(db.open_table(table_name).execute().await?)
        })?;
        let max_seq = rt.block_on(async {
            let mut stream = table.query().execute().await?;
            let mut max_seq = 0i64;
            while let Some(batch) = stream.try_next().await? {
                let seqs = int64_column(&batch, "seq")?;
                max_seq = seqs.iter().flatten().fold(max_seq, i64::max);
            }
            Ok::<_, anyhow::Error>(max_seq)
        })?;
        info!(uri = %uri, table = table_name, max_seq, "opened lance store");
        Ok(Self { rt, table, dim, next_seq: Mutex::new(max_seq + 1) })
    }

    async fn existing_seqs(&self, ids: &[String]) -> Result<HashMap<String, i64>> {
        let mut out = HashMap::new();
        if ids.is_empty() {
            return Ok(out);
        }
        let filter = format!("point_id IN ({})", quoted_list(ids.iter().map(String::as_str)));
        let mut stream = self.table.query().only_if(filter).execute().await?;
        while let Some(batch) = stream.try_next().await? {
            let id_col = string_column(&batch, "point_id")?;
            let seq_col = int64_column(&batch, "seq")?;
            for i in 0..batch.num_rows() {
                out.insert(id_col.value(i).to_string(), seq_col.value(i));
            }
        }
        Ok(out)
    }

    async fn scan(&self, filter_sql: Option<String>) -> Result<Vec<StoredRow>> {
        let mut query = self.table.query();
        if let Some(sql) = filter_sql {
            query = query.only_if(sql);
        }
        let mut stream = query.execute().await?;
        let mut rows = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            rows.extend(decode_rows(&batch)?.into_iter().map(|(row, _)| row));
        }
        Ok(rows)
    }

    fn scan_scored<F>(&self, filter: Option<&Predicate>, k: usize, score: F) -> Result<Vec<RetrievalCandidate>>
    where
        F: Fn(&StoredRow) -> f32,
    {
        let pushed = filter.map(LanceFilter::from_predicate);
        let sql = pushed.as_ref().and_then(|f| f.sql.clone());
        let residual = filter.filter(|_| pushed.as_ref().is_some_and(|f| !f.exact));
        let rows = self.rt.block_on(self.scan(sql))?;
        let mut scored: Vec<(f32, StoredRow)> = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(p) = residual {
                if !p.matches(&row.payload()?.filter_view()) {
                    continue;
                }
            }
            scored.push((score(&row), row));
        }
        top_k(scored, k).into_iter().map(|(score, row)| row.into_candidate(score)).collect()
    }

    fn to_record_batch(&self, points: &[(i64, &IndexedPoint)]) -> Result<RecordBatch> {
        let dim = self.dim as i32;
        let now = Utc::now().timestamp_millis();
        let mut seqs = Vec::new();
        let mut ids = Vec::new();
        let mut contents = Vec::new();
        let mut payloads = Vec::new();
        let mut sources = Vec::new();
        let mut chunk_indices = Vec::new();
        let mut categories = Vec::new();
        let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::new();
        let mut sparse_indices: Vec<Option<Vec<Option<u32>>>> = Vec::new();
        let mut sparse_values: Vec<Option<Vec<Option<f32>>>> = Vec::new();
        let mut hashes = Vec::new();
        let mut times = Vec::new();
        for (seq, p) in points {
            if p.dense.len() != self.dim {
                return Err(anyhow!("dim mismatch: got {} expected {}", p.dense.len(), self.dim));
            }
            seqs.push(*seq);
            ids.push(p.id.to_string());
            contents.push(p.payload.display_text.clone());
            payloads.push(serde_json::to_string(&p.payload)?);
            sources.push(p.payload.source.clone());
            chunk_indices.push(i64::try_from(p.payload.chunk_index)?);
            categories.push(p.payload.extra.get("category").and_then(scalar_text));
            vectors.push(Some(p.dense.iter().map(|&x| Some(x)).collect()));
            sparse_indices.push(Some(p.sparse.indices().iter().map(|&i| Some(i)).collect()));
            sparse_values.push(Some(p.sparse.values().iter().map(|&v| Some(v)).collect()));
            hashes.push(p.payload.content_hash.clone());
            times.push(now);
        }
        Ok(RecordBatch::try_new(
            build_chunk_schema(dim),
            vec![
                Arc::new(Int64Array::from(seqs)),
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(contents)),
                Arc::new(StringArray::from(payloads)),
                Arc::new(StringArray::from(sources)),
                Arc::new(Int64Array::from(chunk_indices)),
                Arc::new(StringArray::from(categories)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dim)),
                Arc::new(ListArray::from_iter_primitive::<UInt32Type, _, _>(sparse_indices)),
                Arc::new(ListArray::from_iter_primitive::<Float32Type, _, _>(sparse_values)),
                Arc::new(StringArray::from(hashes)),
                Arc::new(TimestampMillisecondArray::from(times)),
            ],
        )?)
    }
}

impl StoredRow {
    fn payload(&self) -> Result<Payload> {
        Ok(serde_json::from_str(&self.payload_json)?)
    }

    fn into_candidate(self, score: f32) -> Result<RetrievalCandidate> {
        let payload = self.payload()?;
        Ok(RetrievalCandidate { id: self.point_id, seq: u64::try_from(self.seq).ok(), payload, score })
    }
}

// Text form of a scalar category; lists and maps get no column value.
fn scalar_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl VectorStore for LanceStore {
    fn upsert(&self, points: &[IndexedPoint]) -> Result<usize> {
        if points.is_empty() {
            return Ok(0);
        }
        // Last write wins for ids repeated within one call.
        let mut order: Vec<Uuid> = Vec::new();
        let mut latest: HashMap<Uuid, &IndexedPoint> = HashMap::new();
        for p in points {
            if latest.insert(p.id, p).is_none() {
                order.push(p.id);
            }
        }
        let ids: Vec<String> = order.iter().map(Uuid::to_string).collect();

        let mut next_seq = self.next_seq.lock().map_err(|_| anyhow!("lance store lock poisoned"))?;
        let existing = self.rt.block_on(self.existing_seqs(&ids))?;
        let mut assigned: Vec<(i64, &IndexedPoint)> = Vec::with_capacity(order.len());
        for (id, key) in order.iter().zip(&ids) {
            let seq = match existing.get(key) {
                Some(&seq) => seq,
                None => {
                    let seq = *next_seq;
                    *next_seq += 1;
                    seq
                }
            };
            if let Some(p) = latest.get(id) {
                assigned.push((seq, *p));
            }
        }

        let batch = self.to_record_batch(&assigned)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        self.rt.block_on(async {
            let mut mi = self.table.merge_insert(&["point_id"]);
            mi.when_matched_update_all(None).when_not_matched_insert_all();
            mi.execute(reader).await?;
            Ok::<_, anyhow::Error>(())
        })?;
        debug!(points = assigned.len(), updated = existing.len(), "lance upsert");
        Ok(points.len())
    }

    fn search_dense(&self, query: &[f32], filter: Option<&Predicate>, k: usize) -> Result<Vec<RetrievalCandidate>> {
        let filter = filter.filter(|p| !p.is_always());
        let pushed = filter.map(LanceFilter::from_predicate);
        if pushed.as_ref().is_some_and(|f| !f.exact) {
            return self.scan_scored(filter, k, |row| dot(&row.vector, query));
        }
        let sql = pushed.and_then(|f| f.sql);
        self.rt.block_on(async {
            let mut search = self.table.vector_search(query.to_vec())?;
            if let Some(sql) = sql {
                search = search.only_if(sql);
            }
            let mut stream = search.limit(k).execute().await?;
            let mut out = Vec::new();
            while let Some(batch) = stream.try_next().await? {
                for (row, distance) in decode_rows(&batch)? {
                    // Squared L2 over unit vectors: d = 2 - 2cos.
                    let score = distance.map_or_else(|| dot(&row.vector, query), |d| 1.0 - d / 2.0);
                    out.push(row.into_candidate(score)?);
                }
            }
            Ok(out)
        })
    }

    fn search_sparse(&self, query: &SparseVector, filter: Option<&Predicate>, k: usize) -> Result<Vec<RetrievalCandidate>> {
        let filter = filter.filter(|p| !p.is_always());
        self.scan_scored(filter, k, |row| row.sparse.dot(query))
    }

    fn len(&self) -> Result<usize> {
        Ok(self.rt.block_on(self.table.count_rows(None))?)
    }
}

impl SequentialStore for LanceStore {
    fn fetch_by_seq(&self, seqs: &[u64]) -> Result<Vec<SeqRecord>> {
        let mut wanted: Vec<i64> = seqs.iter().filter_map(|&s| i64::try_from(s).ok()).collect();
        wanted.sort_unstable();
        wanted.dedup();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }
        let list = wanted.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
        let mut rows = self.rt.block_on(self.scan(Some(format!("seq IN ({list})"))))?;
        rows.sort_by_key(|r| r.seq);
        Ok(rows
            .into_iter()
            .filter_map(|r| {
                let seq = u64::try_from(r.seq).ok()?;
                Some(SeqRecord { seq, content: r.content, source: r.source })
            })
            .collect())
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("{} column missing", name))
}

fn int64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int64Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
        .ok_or_else(|| anyhow!("{} column missing", name))
}

fn decode_rows(batch: &RecordBatch) -> Result<Vec<(StoredRow, Option<f32>)>> {
    let seq_col = int64_column(batch, "seq")?;
    let id_col = string_column(batch, "point_id")?;
    let payload_col = string_column(batch, "payload")?;
    let content_col = string_column(batch, "content")?;
    let source_col = string_column(batch, "source")?;
    let vec_col = batch
        .column_by_name("vector")
        .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
        .ok_or_else(|| anyhow!("vector column missing"))?;
    let list = |name: &str| {
        batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<ListArray>())
            .ok_or_else(|| anyhow!("{} column missing", name))
    };
    let idx_col = list("sparse_indices")?;
    let val_col = list("sparse_values")?;
    let distance_col = batch.column_by_name("_distance").and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    let mut rows = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let point_id = Uuid::parse_str(id_col.value(i))?;
        let vector = if vec_col.is_null(i) {
            Vec::new()
        } else {
            vec_col.value(i).as_primitive::<Float32Type>().values().to_vec()
        };
        let sparse = SparseVector::from_parts(
            idx_col.value(i).as_primitive::<UInt32Type>().values().to_vec(),
            val_col.value(i).as_primitive::<Float32Type>().values().to_vec(),
        )?;
        let distance = distance_col.map(|d| d.value(i));
        rows.push((
            StoredRow {
                seq: seq_col.value(i),
                point_id,
                content: content_col.value(i).to_string(),
                source: source_col.value(i).to_string(),
                payload_json: payload_col.value(i).to_string(),
                vector,
                sparse,
            },
            distance,
        ));
    }
    Ok(rows)
}
