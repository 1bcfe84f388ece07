//! Intermediate posting record format
//!
//! Temp runs and the merged stream share one layout:
//! `u32 termLen (LE) | termLen bytes | i32 docId | i32 freq`.
//!
//! EOF at a record boundary is clean termination. A zero termLen is
//! treated as an EOF sentinel. A short read anywhere inside a record is
//! corruption.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{DocId, Error, Result, TermFreq};

/// One `(term, docId, freq)` posting in the intermediate stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingRecord {
    pub term: Vec<u8>,
    pub doc_id: DocId,
    pub freq: TermFreq,
}

/// Read the length prefix, distinguishing clean EOF (no bytes at all)
/// from a truncated prefix.
fn read_len_prefix<R: Read>(reader: &mut R) -> Result<Option<u32>> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < 4 {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(Error::truncated("record length prefix"));
        }
        filled += n;
    }
    Ok(Some(u32::from_le_bytes(buf)))
}

/// Read the next record, or `None` on clean end of stream.
pub fn read_record<R: Read>(reader: &mut R) -> Result<Option<PostingRecord>> {
    let term_len = match read_len_prefix(reader)? {
        None | Some(0) => return Ok(None),
        Some(len) => len as usize,
    };

    let mut term = vec![0u8; term_len];
    reader
        .read_exact(&mut term)
        .map_err(|_| Error::truncated("record term bytes"))?;

    let doc_id = reader
        .read_i32::<LittleEndian>()
        .map_err(|_| Error::truncated("record docId"))?;
    let freq = reader
        .read_i32::<LittleEndian>()
        .map_err(|_| Error::truncated("record freq"))?;

    Ok(Some(PostingRecord {
        term,
        doc_id: doc_id as DocId,
        freq: freq as TermFreq,
    }))
}

/// Append one record to the stream.
pub fn write_record<W: Write>(
    writer: &mut W,
    term: &[u8],
    doc_id: DocId,
    freq: TermFreq,
) -> std::io::Result<()> {
    writer.write_u32::<LittleEndian>(term.len() as u32)?;
    writer.write_all(term)?;
    writer.write_i32::<LittleEndian>(doc_id as i32)?;
    writer.write_i32::<LittleEndian>(freq as i32)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"apple", 42, 3).unwrap();
        write_record(&mut buf, b"banana", 7, 1).unwrap();

        let mut reader = &buf[..];
        let first = read_record(&mut reader).unwrap().unwrap();
        assert_eq!(first.term, b"apple");
        assert_eq!(first.doc_id, 42);
        assert_eq!(first.freq, 3);

        let second = read_record(&mut reader).unwrap().unwrap();
        assert_eq!(second.term, b"banana");
        assert!(read_record(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_doc_id_zero_round_trips() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"a", 0, 1).unwrap();
        let rec = read_record(&mut &buf[..]).unwrap().unwrap();
        assert_eq!(rec.doc_id, 0);
    }

    #[test]
    fn test_zero_term_len_is_eof_sentinel() {
        let buf = 0u32.to_le_bytes();
        assert!(read_record(&mut &buf[..]).unwrap().is_none());
    }

    #[test]
    fn test_short_read_mid_record_is_corruption() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"apple", 42, 3).unwrap();
        // Chop the freq field in half
        buf.truncate(buf.len() - 2);
        let mut reader = &buf[..];
        assert!(matches!(
            read_record(&mut reader),
            Err(Error::Corruption(_))
        ));
    }

    #[test]
    fn test_truncated_prefix_is_corruption() {
        let buf = [0x05u8, 0x00]; // two of four length bytes
        assert!(read_record(&mut &buf[..]).is_err());
    }
}
