use std::collections::BTreeMap;
use crc32fast::Hasher;
use tracing::debug;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, DocValue};

// [len u32][crc32 u32] then `len` bytes of [doc id u64][JSON]
pub const FRAME_HEADER: usize = 8;

fn checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Frame one document record.
pub fn encode_doc(id: DocId, doc: &DocValue) -> Result<Vec<u8>> {
    let mut payload = Vec::with_capacity(64);
    payload.extend_from_slice(&id.0.to_le_bytes());
    serde_json::to_writer(&mut payload, doc)?;

    let mut frame = Vec::with_capacity(FRAME_HEADER + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&checksum(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode every record in `data`. Later records for the same id win.
///
/// With `tolerant` set, records with a bad checksum or unparsable body are
/// skipped and a truncated tail ends the scan. Otherwise the first damaged
/// record fails the whole read.
pub fn decode_docs(data: &[u8], tolerant: bool) -> Result<BTreeMap<DocId, DocValue>> {
    let mut docs = BTreeMap::new();
    let mut pos = 0usize;
    let mut skipped = 0usize;

    while pos < data.len() {
        if data.len() - pos < FRAME_HEADER {
            if tolerant {
                break;
            }
            return Err(corrupted(pos, "truncated frame header"));
        }

        let len = u32::from_le_bytes(read4(data, pos)) as usize;
        let crc = u32::from_le_bytes(read4(data, pos + 4));
        let body_start = pos + FRAME_HEADER;
        if len < 8 || data.len() - body_start < len {
            if tolerant {
                break;
            }
            return Err(corrupted(pos, "truncated record"));
        }

        let body = &data[body_start..body_start + len];
        pos = body_start + len;

        if checksum(body) != crc {
            if tolerant {
                skipped += 1;
                continue;
            }
            return Err(corrupted(body_start - FRAME_HEADER, "checksum mismatch"));
        }

        let mut id_bytes = [0u8; 8];
        id_bytes.copy_from_slice(&body[..8]);
        let id = DocId(u64::from_le_bytes(id_bytes));

        match serde_json::from_slice::<DocValue>(&body[8..]) {
            Ok(doc) => {
                docs.insert(id, doc);
            }
            Err(e) if tolerant => {
                debug!(doc = id.0, error = %e, "dropping unparsable document");
                skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    if skipped > 0 {
        debug!(skipped, salvaged = docs.len(), "tolerant read skipped damaged records");
    }
    Ok(docs)
}

/// Number of frames in `data`, without validating them.
pub fn count_frames(data: &[u8]) -> u64 {
    let mut pos = 0usize;
    let mut count = 0u64;
    while data.len() - pos >= FRAME_HEADER {
        let len = u32::from_le_bytes(read4(data, pos)) as usize;
        if data.len() - pos - FRAME_HEADER < len {
            break;
        }
        pos += FRAME_HEADER + len;
        count += 1;
    }
    count
}

fn read4(data: &[u8], pos: usize) -> [u8; 4] {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[pos..pos + 4]);
    buf
}

fn corrupted(offset: usize, what: &str) -> Error {
    Error::new(ErrorKind::Corrupted, format!("{} at byte {}", what, offset))
}
