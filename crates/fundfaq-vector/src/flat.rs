//! Exact brute-force nearest-neighbour index over squared L2 distance.
//!
//! On-disk layout (little-endian):
//!
//! ```text
//! magic "FFQFLAT1" | version u32 | dim u32 | rows u64 | id_len u32 | embedder id
//! | documents fingerprint [u8; 32] | rows * dim f32
//! ```

use fundfaq_core::{Error, Result};

pub const INDEX_MAGIC: &[u8; 8] = b"FFQFLAT1";
pub const FORMAT_VERSION: u32 = 1;
pub type Fingerprint = [u8; 32];

/// One slot of a search result. `row` is `None` for padding slots emitted
/// when the index holds fewer than `k` vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: Option<usize>,
    pub distance: f32,
}

impl Neighbor {
    const NONE: Neighbor = Neighbor { row: None, distance: f32::INFINITY };
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
    dim: usize,
    embedder_id: String,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub fn new(dim: usize, embedder_id: impl Into<String>) -> Self {
        Self { dim, embedder_id: embedder_id.into(), data: Vec::new() }
    }

    pub fn dim(&self) -> usize { self.dim }
    pub fn embedder_id(&self) -> &str { &self.embedder_id }
    pub fn len(&self) -> usize { if self.dim == 0 { 0 } else { self.data.len() / self.dim } }
    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: vector.len() });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(Error::Embedding("vector contains non-finite values".into()));
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    pub fn row(&self, i: usize) -> Option<&[f32]> {
        self.data.chunks_exact(self.dim.max(1)).nth(i)
    }

    /// Exactly `k` slots, closest first. Equal distances keep row order.
    /// Padding slots trail the real rows and are produced lazily, so `k` may
    /// exceed the row count by any amount.
    pub fn search(&self, query: &[f32], k: usize) -> Result<impl Iterator<Item = Neighbor>> {
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        let mut scored: Vec<(f32, usize)> = self
            .data
            .chunks_exact(self.dim.max(1))
            .enumerate()
            .map(|(row, v)| (l2_squared(query, v), row))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        scored.truncate(k);

        let padding = k - scored.len();
        Ok(scored
            .into_iter()
            .map(|(distance, row)| Neighbor { row: Some(row), distance })
            .chain(std::iter::repeat(Neighbor::NONE).take(padding)))
    }

    pub fn to_bytes(&self, documents_fingerprint: &Fingerprint) -> Vec<u8> {
        let id = self.embedder_id.as_bytes();
        let mut out = Vec::with_capacity(64 + id.len() + std::mem::size_of_val(self.data.as_slice()));
        out.extend_from_slice(INDEX_MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.dim as u32).to_le_bytes());
        out.extend_from_slice(&(self.len() as u64).to_le_bytes());
        out.extend_from_slice(&(id.len() as u32).to_le_bytes());
        out.extend_from_slice(id);
        out.extend_from_slice(documents_fingerprint);
        for value in &self.data {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out
    }

    /// Decode an index blob, returning it with the document-store fingerprint it was written against.
    pub fn from_bytes(bytes: &[u8]) -> Result<(Self, Fingerprint)> {
        let mut r = Reader { bytes, pos: 0 };
        if r.take(INDEX_MAGIC.len())? != INDEX_MAGIC {
            return Err(Error::CorruptIndex("bad magic".into()));
        }
        let version = r.u32()?;
        if version != FORMAT_VERSION {
            return Err(Error::CorruptIndex(format!("unsupported format version {version}")));
        }
        let dim = r.u32()? as usize;
        let rows = usize::try_from(r.u64()?).map_err(|_| Error::CorruptIndex("row count overflows".into()))?;
        let id_len = r.u32()? as usize;
        let embedder_id = std::str::from_utf8(r.take(id_len)?)
            .map_err(|_| Error::CorruptIndex("embedder id is not UTF-8".into()))?
            .to_string();
        let mut fingerprint = [0u8; 32];
        fingerprint.copy_from_slice(r.take(32)?);

        let floats = rows.checked_mul(dim).ok_or_else(|| Error::CorruptIndex("vector data overflows".into()))?;
        let payload = r.take(floats.checked_mul(4).ok_or_else(|| Error::CorruptIndex("vector data overflows".into()))?)?;
        if r.pos != bytes.len() {
            return Err(Error::CorruptIndex(format!("{} trailing bytes", bytes.len() - r.pos)));
        }
        let data = payload.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect();
        Ok((Self { dim, embedder_id, data }, fingerprint))
    }
}

pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.bytes.len()).ok_or_else(|| {
            Error::CorruptIndex(format!("truncated at byte {} (wanted {} more)", self.pos, n))
        })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_le_bytes(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(rows: &[[f32; 2]]) -> FlatL2Index {
        let mut index = FlatL2Index::new(2, "test");
        for r in rows { index.add(r).unwrap(); }
        index
    }

    #[test]
    fn search_orders_by_ascending_distance() {
        let index = index_of(&[[5.0, 0.0], [1.0, 0.0], [3.0, 0.0]]);
        let hits: Vec<_> = index.search(&[0.0, 0.0], 3).unwrap().collect();
        let rows: Vec<_> = hits.iter().map(|n| n.row).collect();
        assert_eq!(rows, [Some(1), Some(2), Some(0)]);
        assert_eq!(hits[0].distance, 1.0);
        assert_eq!(hits[2].distance, 25.0);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let index = index_of(&[[0.0, 1.0], [1.0, 0.0], [0.0, -1.0]]);
        let rows: Vec<_> = index.search(&[0.0, 0.0], 3).unwrap().map(|n| n.row).collect();
        assert_eq!(rows, [Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn short_index_pads_with_empty_slots() {
        let index = index_of(&[[1.0, 1.0]]);
        let hits: Vec<_> = index.search(&[0.0, 0.0], 3).unwrap().collect();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].row, Some(0));
        assert!(hits[1..].iter().all(|n| n.row.is_none() && n.distance.is_infinite()));
    }

    #[test]
    fn huge_k_does_not_allocate_padding() {
        let index = index_of(&[[1.0, 1.0], [2.0, 2.0]]);
        let mut hits = index.search(&[0.0, 0.0], usize::MAX).unwrap();
        assert_eq!(hits.next().map(|n| n.row), Some(Some(0)));
        assert_eq!(hits.next().map(|n| n.row), Some(Some(1)));
        assert_eq!(hits.next(), Some(Neighbor::NONE));
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        let mut index = index_of(&[[1.0, 1.0]]);
        assert!(matches!(index.add(&[1.0]), Err(Error::DimensionMismatch { expected: 2, actual: 1 })));
        assert!(matches!(index.search(&[1.0, 2.0, 3.0], 1).map(|_| ()), Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn blob_round_trips_with_fingerprint() {
        let index = index_of(&[[0.5, -0.25], [1.0, 2.0]]);
        let fp = [7u8; 32];
        let (decoded, got_fp) = FlatL2Index::from_bytes(&index.to_bytes(&fp)).unwrap();
        assert_eq!(decoded, index);
        assert_eq!(got_fp, fp);
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn truncated_blob_is_corrupt() {
        let bytes = index_of(&[[0.5, -0.25]]).to_bytes(&[0u8; 32]);
        assert!(matches!(FlatL2Index::from_bytes(&bytes[..bytes.len() - 1]), Err(Error::CorruptIndex(_))));
        assert!(matches!(FlatL2Index::from_bytes(b"NOTANIDX"), Err(Error::CorruptIndex(_))));
    }
}
