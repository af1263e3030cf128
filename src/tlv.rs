//! The TLV (tag/length/value) wire codec shared by the media-sharing
//! protocol's responses: an eight-byte-header tagged tree of typed atoms.
//!
//! `[4-byte ASCII tag][4-byte big-endian length][payload]`. Containers are
//! atoms whose payload is itself a sequence of atoms.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::CoreError;

/// Atom nesting depth limit. Matches the spec's decoder invariant; chosen
/// generously above anything a real response tree needs.
const MAX_DEPTH: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomType {
    /// 1 byte, unsigned-or-bool.
    Byte,
    /// 1 byte, signed.
    SignedByte,
    /// 2 bytes, big-endian.
    Short,
    /// 4 bytes, big-endian.
    Int,
    /// 8 bytes, big-endian.
    Long,
    /// UTF-8 string, no embedded NUL.
    Str,
    /// 4 bytes, seconds since epoch.
    Date,
    /// 4 bytes, (major<<16)|minor.
    Version,
    /// Recursive container.
    Container,
}

impl AtomType {
    /// Fixed payload width in bytes, or `None` for variable-width types.
    fn fixed_len(self) -> Option<usize> {
        match self {
            AtomType::Byte | AtomType::SignedByte => Some(1),
            AtomType::Short => Some(2),
            AtomType::Int | AtomType::Date | AtomType::Version => Some(4),
            AtomType::Long => Some(8),
            AtomType::Str | AtomType::Container => None,
        }
    }
}

/// One decoded or to-be-encoded node.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Byte(u8),
    SignedByte(i8),
    Short(u16),
    Int(u32),
    Long(u64),
    Str(String),
    Date(u32),
    Version(u16, u16),
    Container(Vec<(String, Atom)>),
}

impl Atom {
    fn atom_type(&self) -> AtomType {
        match self {
            Atom::Byte(_) => AtomType::Byte,
            Atom::SignedByte(_) => AtomType::SignedByte,
            Atom::Short(_) => AtomType::Short,
            Atom::Int(_) => AtomType::Int,
            Atom::Long(_) => AtomType::Long,
            Atom::Str(_) => AtomType::Str,
            Atom::Date(_) => AtomType::Date,
            Atom::Version(_, _) => AtomType::Version,
            Atom::Container(_) => AtomType::Container,
        }
    }
}

/// Static tag table: tag -> (type, human name). An unknown tag encountered
/// while decoding is skipped, not fatal.
fn tag_table() -> &'static HashMap<&'static str, (AtomType, &'static str)> {
    static TABLE: OnceLock<HashMap<&'static str, (AtomType, &'static str)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        use AtomType::*;
        HashMap::from([
            ("mstt", (Int, "status")),
            ("msts", (Str, "status string")),
            ("mpro", (Version, "protocol version")),
            ("apro", (Version, "daap protocol version")),
            ("mlog", (Container, "login response")),
            ("mlid", (Int, "session id")),
            ("msrv", (Container, "server info response")),
            ("minm", (Str, "item name")),
            ("msau", (Byte, "authentication method")),
            ("mslr", (Byte, "login required")),
            ("mstm", (Int, "timeout interval")),
            ("msal", (Byte, "supports auto logout")),
            ("msup", (Byte, "supports update")),
            ("mspi", (Byte, "supports persistent ids")),
            ("msex", (Byte, "supports extensions")),
            ("msbr", (Byte, "supports browse")),
            ("msqy", (Byte, "supports query")),
            ("msix", (Byte, "supports index")),
            ("msrs", (Byte, "supports resolve")),
            ("msdc", (Int, "database count")),
            ("mupd", (Container, "update response")),
            ("musr", (Int, "update server revision")),
            ("avdb", (Container, "server databases")),
            ("mlcl", (Container, "listing")),
            ("mlit", (Container, "listing item")),
            ("miid", (Int, "item id")),
            ("mper", (Long, "persistent id")),
            ("mimc", (Int, "item count")),
            ("mctc", (Int, "container count")),
            ("mrco", (Int, "returned count")),
            ("mtco", (Int, "specified total count")),
            ("adbs", (Container, "database songs")),
            ("apso", (Container, "playlist songs")),
            ("aply", (Container, "databases playlists")),
            ("abpl", (Byte, "base playlist")),
            ("abar", (Container, "browse artists")),
            ("abal", (Container, "browse albums")),
            ("abgn", (Container, "browse genres")),
            ("abcp", (Container, "browse composers")),
            ("asal", (Str, "song album")),
            ("asar", (Str, "song artist")),
            ("asaa", (Str, "song album artist")),
            ("asgn", (Str, "song genre")),
            ("ascp", (Str, "song composer")),
            ("asco", (Byte, "song compilation")),
            ("asbr", (Short, "song bitrate")),
            ("assr", (Int, "song samplerate")),
            ("astm", (Int, "song time")),
            ("assz", (Int, "song size")),
            ("asyr", (Short, "song year")),
            ("astn", (Short, "song track number")),
            ("astc", (Short, "song track count")),
            ("asdc", (Short, "song disc number")),
            ("asdn", (Short, "song disc count")),
            ("asbp", (Int, "song bpm")),
            ("cmmk", (Int, "content kind")),
            ("asdt", (Str, "song description")),
            ("asda", (Date, "song date added")),
            ("asdm", (Date, "song date modified")),
            ("asdp", (Date, "song date played")),
            ("asur", (Byte, "song user rating")),
            ("aspc", (Int, "song play count")),
            ("asdk", (Byte, "song data kind")),
            ("asmk", (Byte, "song media kind")),
            ("ascd", (Int, "song content description")),
            ("asdb", (Byte, "song disabled")),
            ("ascm", (Str, "song comment")),
            ("asgp", (Str, "song grouping")),
            ("asct", (Long, "song sample count")),
            ("ascr", (Byte, "song content rating")),
            ("aeNV", (Int, "force update")),
            ("ascdt", (Str, "song codec type")),
            ("msas", (Byte, "sort caps")),
            ("mcon", (Container, "containers")),
            ("mcti", (Int, "container item id")),
            ("abro", (Container, "browse response")),
            ("mccr", (Container, "content codes response")),
            ("mdcl", (Container, "dictionary entry")),
            ("mcnm", (Str, "content code name")),
            ("mcna", (Str, "content code display name")),
            ("mcty", (Short, "content code type")),
        ])
    })
}

fn lookup_tag(tag: &str) -> Option<(AtomType, &'static str)> {
    tag_table().get(tag).copied()
}

/// Encodes a tree depth-first. Every container is re-visited on pop to
/// patch in its final length — containers always carry a length field, even
/// when empty.
pub fn encode(tag: &str, atom: &Atom) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(tag, atom, &mut out);
    out
}

fn encode_into(tag: &str, atom: &Atom, out: &mut Vec<u8>) {
    let tag_bytes = tag_header_bytes(tag);
    match atom {
        Atom::Byte(v) => emit(out, &tag_bytes, &[*v]),
        Atom::SignedByte(v) => emit(out, &tag_bytes, &[*v as u8]),
        Atom::Short(v) => emit(out, &tag_bytes, &v.to_be_bytes()),
        Atom::Int(v) => emit(out, &tag_bytes, &v.to_be_bytes()),
        Atom::Long(v) => emit(out, &tag_bytes, &v.to_be_bytes()),
        Atom::Str(s) => emit(out, &tag_bytes, s.as_bytes()),
        Atom::Date(v) => emit(out, &tag_bytes, &v.to_be_bytes()),
        Atom::Version(major, minor) => {
            let packed = ((*major as u32) << 16) | (*minor as u32);
            emit(out, &tag_bytes, &packed.to_be_bytes());
        }
        Atom::Container(children) => {
            out.extend_from_slice(&tag_bytes);
            let len_pos = out.len();
            out.extend_from_slice(&[0u8; 4]);
            let body_start = out.len();
            for (child_tag, child) in children {
                encode_into(child_tag, child, out);
            }
            let body_len = (out.len() - body_start) as u32;
            out[len_pos..len_pos + 4].copy_from_slice(&body_len.to_be_bytes());
        }
    }
}

fn tag_header_bytes(tag: &str) -> [u8; 4] {
    let bytes = tag.as_bytes();
    let mut out = [0u8; 4];
    let n = bytes.len().min(4);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

fn emit(out: &mut Vec<u8>, tag: &[u8; 4], payload: &[u8]) {
    out.extend_from_slice(tag);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
}

/// Decodes a byte slice expected to hold exactly one top-level atom,
/// returning its tag and value. Unknown tags at any depth are skipped
/// (their bytes consumed, no atom produced) rather than treated as an error.
pub fn decode(bytes: &[u8]) -> Result<(String, Atom), CoreError> {
    let mut cursor = 0usize;
    let result = decode_one(bytes, &mut cursor, 0)?;
    match result {
        Some(atom) => Ok(atom),
        None => Err(CoreError::ProtocolFraming(
            "document contains no recognized top-level atom".to_string(),
        )),
    }
}

/// Decodes a container's children, skipping any unknown tags encountered.
pub fn decode_container_body(bytes: &[u8]) -> Result<Vec<(String, Atom)>, CoreError> {
    decode_container_body_at(bytes, 1)
}

fn decode_container_body_at(bytes: &[u8], depth: u32) -> Result<Vec<(String, Atom)>, CoreError> {
    let mut cursor = 0usize;
    let mut out = Vec::new();
    while cursor < bytes.len() {
        if let Some(atom) = decode_one(bytes, &mut cursor, depth)? {
            out.push(atom);
        }
    }
    Ok(out)
}

fn decode_one(
    bytes: &[u8],
    cursor: &mut usize,
    depth: u32,
) -> Result<Option<(String, Atom)>, CoreError> {
    if depth > MAX_DEPTH {
        return Err(CoreError::ProtocolFraming(format!(
            "nesting exceeds {MAX_DEPTH} levels"
        )));
    }
    if bytes.len() - *cursor < 8 {
        return Err(CoreError::ProtocolFraming(
            "truncated atom header".to_string(),
        ));
    }
    let tag_bytes = &bytes[*cursor..*cursor + 4];
    let tag = String::from_utf8_lossy(tag_bytes).into_owned();
    let len = u32::from_be_bytes(bytes[*cursor + 4..*cursor + 8].try_into().unwrap()) as usize;
    *cursor += 8;

    if len > bytes.len() - *cursor {
        return Err(CoreError::ProtocolFraming(format!(
            "atom {tag} length {len} exceeds enclosing container"
        )));
    }
    let payload = &bytes[*cursor..*cursor + len];
    *cursor += len;

    let Some((atom_type, _name)) = lookup_tag(&tag) else {
        return Ok(None);
    };

    if let Some(expected) = atom_type.fixed_len() {
        if len != expected {
            return Err(CoreError::ProtocolFraming(format!(
                "atom {tag} expected {expected} bytes, got {len}"
            )));
        }
    }

    let atom = match atom_type {
        AtomType::Byte => Atom::Byte(payload[0]),
        AtomType::SignedByte => Atom::SignedByte(payload[0] as i8),
        AtomType::Short => Atom::Short(u16::from_be_bytes(payload.try_into().unwrap())),
        AtomType::Int => Atom::Int(u32::from_be_bytes(payload.try_into().unwrap())),
        AtomType::Long => Atom::Long(u64::from_be_bytes(payload.try_into().unwrap())),
        AtomType::Date => Atom::Date(u32::from_be_bytes(payload.try_into().unwrap())),
        AtomType::Version => {
            let packed = u32::from_be_bytes(payload.try_into().unwrap());
            Atom::Version((packed >> 16) as u16, (packed & 0xFFFF) as u16)
        }
        AtomType::Str => {
            if payload.contains(&0) {
                return Err(CoreError::ProtocolFraming(format!(
                    "atom {tag} string contains embedded NUL"
                )));
            }
            let s = std::str::from_utf8(payload).map_err(|_| {
                CoreError::ProtocolFraming(format!("atom {tag} is not valid UTF-8"))
            })?;
            Atom::Str(s.to_string())
        }
        AtomType::Container => Atom::Container(decode_container_body_at(payload, depth + 1)?),
    };

    Ok(Some((tag, atom)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trips_a_scalar_atom() {
        let atom = Atom::Int(200);
        let bytes = encode("mstt", &atom);
        let (tag, decoded) = decode(&bytes).unwrap();
        assert_eq!(tag, "mstt");
        assert_eq!(decoded, atom);
    }

    #[test]
    fn round_trips_a_container() {
        let tree = Atom::Container(vec![
            ("mstt".to_string(), Atom::Int(200)),
            ("msts".to_string(), Atom::Str("OK".to_string())),
            ("mpro".to_string(), Atom::Version(2, 0)),
        ]);
        let bytes = encode("msrv", &tree);
        let (tag, decoded) = decode(&bytes).unwrap();
        assert_eq!(tag, "msrv");
        assert_eq!(decoded, tree);
        assert!(bytes.len() <= 12 + 4 + 10 + 8 + 8 + 2 + 8);
    }

    #[test]
    fn empty_container_still_carries_a_length() {
        let bytes = encode("mlog", &Atom::Container(vec![]));
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[4..8], &0u32.to_be_bytes());
    }

    #[test]
    fn rejects_fixed_width_mismatch() {
        let mut bytes = encode("mstt", &Atom::Int(1));
        bytes[7] = 3; // claim a 3-byte payload for a 4-byte int
        bytes.truncate(11);
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn rejects_string_with_embedded_nul() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"minm");
        bytes.extend_from_slice(&3u32.to_be_bytes());
        bytes.extend_from_slice(b"a\0b");
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn unknown_top_level_tag_is_skipped_not_fatal() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"xzzy");
        bytes.extend_from_slice(&4u32.to_be_bytes());
        bytes.extend_from_slice(b"ABCD");
        assert!(decode(&bytes).is_err());

        let mut wrapped = Vec::new();
        wrapped.extend_from_slice(b"mlit");
        let mut body = bytes.clone();
        body.extend_from_slice(&encode("mstt", &Atom::Int(5)));
        wrapped.extend_from_slice(&(body.len() as u32).to_be_bytes());
        wrapped.extend_from_slice(&body);
        let (tag, atom) = decode(&wrapped).unwrap();
        assert_eq!(tag, "mlit");
        assert_eq!(atom, Atom::Container(vec![("mstt".to_string(), Atom::Int(5))]));
    }

    #[test]
    fn depth_limit_is_enforced() {
        let mut inner = Atom::Int(1);
        let mut tag = "mstt".to_string();
        for i in 0..MAX_DEPTH + 2 {
            let wrap_tag = if i % 2 == 0 { "mlcl" } else { "mlit" };
            inner = Atom::Container(vec![(tag.clone(), inner)]);
            tag = wrap_tag.to_string();
        }
        let bytes = encode(&tag, &inner);
        assert!(decode(&bytes).is_err());
    }
}
