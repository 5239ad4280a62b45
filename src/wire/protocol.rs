use bytes::{Buf, BufMut, Bytes, BytesMut};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, HashTableId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    HtPut = 1,
    HtGet = 2,
}

impl TryFrom<u8> for Opcode {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Opcode::HtPut),
            2 => Ok(Opcode::HtGet),
            other => Err(Error::new(ErrorKind::Parse, format!("unknown opcode {}", other))),
        }
    }
}

pub fn bint32(v: i32) -> Bytes {
    let mut buf = BytesMut::with_capacity(4);
    buf.put_i32(v);
    buf.freeze()
}

pub fn buint64(v: u64) -> Bytes {
    let mut buf = BytesMut::with_capacity(8);
    buf.put_u64(v);
    buf.freeze()
}

pub fn read_int32(param: &[u8]) -> Result<i32> {
    if param.len() != 4 {
        return Err(Error::new(ErrorKind::Parse, format!("expected 4 bytes, got {}", param.len())));
    }
    Ok((&param[..]).get_i32())
}

pub fn read_uint64(param: &[u8]) -> Result<u64> {
    if param.len() != 8 {
        return Err(Error::new(ErrorKind::Parse, format!("expected 8 bytes, got {}", param.len())));
    }
    Ok((&param[..]).get_u64())
}

/// A routed command: opcode plus length-prefixed parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub opcode: Opcode,
    pub params: Vec<Bytes>,
}

impl Command {
    pub fn ht_put(ht: HashTableId, key: u64, doc: DocId) -> Self {
        Command {
            opcode: Opcode::HtPut,
            params: vec![bint32(ht.0), buint64(key), buint64(doc.0)],
        }
    }

    pub fn ht_get(ht: HashTableId, key: u64) -> Self {
        Command {
            opcode: Opcode::HtGet,
            params: vec![bint32(ht.0), buint64(key)],
        }
    }

    // [opcode u8][count u8] then per param [len u32][bytes], all big-endian
    pub fn encode(&self) -> Bytes {
        let size = 2 + self.params.iter().map(|p| 4 + p.len()).sum::<usize>();
        let mut buf = BytesMut::with_capacity(size);
        buf.put_u8(self.opcode as u8);
        buf.put_u8(self.params.len() as u8);
        for param in &self.params {
            buf.put_u32(param.len() as u32);
            buf.put_slice(param);
        }
        buf.freeze()
    }

    pub fn decode(mut frame: Bytes) -> Result<Self> {
        if frame.remaining() < 2 {
            return Err(Error::new(ErrorKind::Parse, "command frame too short".to_string()));
        }
        let opcode = Opcode::try_from(frame.get_u8())?;
        let count = frame.get_u8() as usize;

        let mut params = Vec::with_capacity(count);
        for _ in 0..count {
            if frame.remaining() < 4 {
                return Err(Error::new(ErrorKind::Parse, "truncated parameter length".to_string()));
            }
            let len = frame.get_u32() as usize;
            if frame.remaining() < len {
                return Err(Error::new(ErrorKind::Parse, "truncated parameter".to_string()));
            }
            params.push(frame.split_to(len));
        }
        if frame.has_remaining() {
            return Err(Error::new(ErrorKind::Parse, "trailing bytes after command".to_string()));
        }

        Ok(Command { opcode, params })
    }

    pub fn expect_params(&self, n: usize) -> Result<()> {
        if self.params.len() != n {
            return Err(Error::new(
                ErrorKind::Parse,
                format!("{:?} takes {} parameters, got {}", self.opcode, n, self.params.len()),
            ));
        }
        Ok(())
    }
}
