//! Protocol handlers: renders the browse/enumerate engine's rows into
//! either the TLV document (media-sharing protocol, §4.3) or the RSP XML
//! document, both sharing the
//! `{status{errorcode,errorstring,records,totalrecords}, payload}`
//! skeleton from spec §4.9. Field-tag mapping for TLV grounded in
//! `tlv::tag_table`'s DAAP names; XML field names grounded in
//! `original_source/src/plugins/rsp.c`'s `xml_output` calls.

use crate::browse::Row;

/// The shared reply envelope both wire formats carry.
#[derive(Debug, Clone)]
pub struct Status {
    pub errorcode: u32,
    pub errorstring: Option<String>,
    pub records: u64,
    pub totalrecords: u64,
}

impl Status {
    pub fn ok(records: u64, totalrecords: u64) -> Self {
        Status { errorcode: 200, errorstring: None, records, totalrecords }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Status { errorcode: 500, errorstring: Some(message.into()), records: 0, totalrecords: 0 }
    }
}

pub mod tlv_handlers {
    use super::*;
    use crate::tlv::{Atom, encode};

    /// `(field name, DAAP tag)`. Only the fields a `mlit` entry commonly
    /// carries are mapped; fields with no entry here are silently omitted
    /// from the TLV rendering (the RSP rendering carries all of them).
    const FIELD_TAGS: &[(&str, &str)] = &[
        ("id", "miid"),
        ("title", "minm"),
        ("artist", "asar"),
        ("album", "asal"),
        ("genre", "asgn"),
        ("composer", "ascp"),
        ("track", "astn"),
        ("total_tracks", "astc"),
        ("disc", "asdc"),
        ("total_discs", "asdn"),
        ("bitrate", "asbr"),
        ("samplerate", "assr"),
        ("song_length", "astm"),
        ("file_size", "assz"),
        ("year", "asyr"),
        ("rating", "asur"),
        ("play_count", "aspc"),
        ("time_added", "asda"),
        ("time_modified", "asdm"),
        ("codectype", "ascdt"),
        ("disabled", "asdb"),
        ("compilation", "asco"),
        ("comment", "ascm"),
        ("grouping", "asgp"),
        ("description", "asdt"),
        ("bpm", "asbp"),
    ];

    fn atom_for(name: &str, tag: &str, text: &str) -> Option<Atom> {
        Some(match name {
            "id" | "samplerate" | "song_length" | "file_size" | "bpm" => Atom::Int(text.parse().ok()?),
            "track" | "total_tracks" | "disc" | "total_discs" | "bitrate" | "year" => {
                Atom::Short(text.parse().ok()?)
            }
            "time_added" | "time_modified" => Atom::Date(text.parse().ok()?),
            "disabled" | "compilation" | "rating" => Atom::Byte(if text == "0" { 0 } else { 1 }),
            "play_count" => Atom::Int(text.parse().ok()?),
            _ => {
                let _ = tag;
                Atom::Str(text.to_string())
            }
        })
    }

    fn row_to_atoms(row: &Row) -> Vec<(String, Atom)> {
        row.iter()
            .filter_map(|(name, value)| {
                let (_, tag) = FIELD_TAGS.iter().find(|(n, _)| n == name)?;
                atom_for(name, tag, value).map(|atom| (tag.to_string(), atom))
            })
            .collect()
    }

    /// A static `msrv` server-info reply — the fixed capability flags this
    /// core advertises never vary per request.
    pub fn server_info() -> Vec<u8> {
        let tree = Atom::Container(vec![
            ("mstt".into(), Atom::Int(200)),
            ("mpro".into(), Atom::Version(2, 0)),
            ("apro".into(), Atom::Version(3, 0)),
            ("minm".into(), Atom::Str("media-catalog-core".into())),
            ("mslr".into(), Atom::Byte(0)),
            ("mstm".into(), Atom::Int(1800)),
            ("msal".into(), Atom::Byte(1)),
            ("msup".into(), Atom::Byte(1)),
            ("mspi".into(), Atom::Byte(1)),
            ("msex".into(), Atom::Byte(1)),
            ("msbr".into(), Atom::Byte(1)),
            ("msqy".into(), Atom::Byte(1)),
            ("msix".into(), Atom::Byte(1)),
            ("msrs".into(), Atom::Byte(1)),
            ("msdc".into(), Atom::Int(1)),
        ]);
        encode("msrv", &tree)
    }

    pub fn login(session_id: i64) -> Vec<u8> {
        let tree =
            Atom::Container(vec![("mstt".into(), Atom::Int(200)), ("mlid".into(), Atom::Int(session_id as u32))]);
        encode("mlog", &tree)
    }

    /// `mccr`: advertises the DAAP tags this core understands, one `mdcl`
    /// entry per tag in [`FIELD_TAGS`] plus the envelope tags every reply
    /// carries.
    pub fn content_codes() -> Vec<u8> {
        let mut entries: Vec<(String, Atom)> = FIELD_TAGS
            .iter()
            .map(|(name, tag)| {
                ("mdcl".to_string(), Atom::Container(vec![("mcnm".into(), Atom::Str(tag.to_string())), ("mcna".into(), Atom::Str(name.to_string()))]))
            })
            .collect();
        entries.insert(0, ("mdcl".to_string(), Atom::Container(vec![("mcnm".into(), Atom::Str("mstt".into())), ("mcna".into(), Atom::Str("status".into()))])));
        let tree = Atom::Container(std::iter::once(("mstt".to_string(), Atom::Int(200))).chain(entries).collect());
        encode("mccr", &tree)
    }

    /// `mupd`: reports the current queue/catalog revision counter. There is
    /// no push-update subsystem behind this core, so callers get the
    /// current value immediately rather than a long-poll.
    pub fn update(revision: i64) -> Vec<u8> {
        let tree =
            Atom::Container(vec![("mstt".into(), Atom::Int(200)), ("musr".into(), Atom::Int(revision as u32))]);
        encode("mupd", &tree)
    }

    /// `adbs`/`apso`-shaped item listing, depending on `container_tag`.
    pub fn item_listing(container_tag: &str, status: &Status, rows: &[Row]) -> Vec<u8> {
        let items: Vec<(String, Atom)> =
            rows.iter().map(|row| ("mlit".to_string(), Atom::Container(row_to_atoms(row)))).collect();
        let mut children = vec![
            ("mstt".to_string(), Atom::Int(status.errorcode)),
            ("mtco".to_string(), Atom::Int(status.totalrecords as u32)),
            ("mrco".to_string(), Atom::Int(status.records as u32)),
        ];
        if let Some(msg) = &status.errorstring {
            children.push(("msts".to_string(), Atom::Str(msg.clone())));
        }
        children.push(("mlcl".to_string(), Atom::Container(items)));
        encode(container_tag, &Atom::Container(children))
    }

    /// `avdb`: the single implicit database this core exposes.
    pub fn databases() -> Vec<u8> {
        let entry = Atom::Container(vec![
            ("miid".into(), Atom::Int(1)),
            ("minm".into(), Atom::Str("Library".into())),
            ("mimc".into(), Atom::Int(0)),
            ("mctc".into(), Atom::Int(0)),
        ]);
        let tree = Atom::Container(vec![
            ("mstt".into(), Atom::Int(200)),
            ("mtco".into(), Atom::Int(1)),
            ("mrco".into(), Atom::Int(1)),
            ("mlcl".into(), Atom::Container(vec![("mlit".into(), entry)])),
        ]);
        encode("avdb", &tree)
    }
}

pub mod rsp_handlers {
    use super::*;
    use quick_xml::escape::escape;

    fn status_xml(status: &Status) -> String {
        format!(
            "<status><errorcode>{}</errorcode><errorstring>{}</errorstring><records>{}</records><totalrecords>{}</totalrecords></status>",
            status.errorcode,
            escape(status.errorstring.as_deref().unwrap_or("")),
            status.records,
            status.totalrecords,
        )
    }

    /// Renders a list of projected rows as `<items><item>...</item></items>`.
    pub fn items_xml(status: &Status, rows: &[Row]) -> String {
        let mut items = String::new();
        for row in rows {
            items.push_str("<item>");
            for (name, value) in row {
                items.push_str(&format!("<{name}>{}</{name}>", escape(value.as_str())));
            }
            items.push_str("</item>");
        }
        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?><response>{}<items>{items}</items></response>",
            status_xml(status)
        )
    }

    pub fn error_xml(status: &Status) -> String {
        format!("<?xml version=\"1.0\" encoding=\"utf-8\"?><response>{}</response>", status_xml(status))
    }

    pub fn info_xml() -> String {
        "<?xml version=\"1.0\" encoding=\"utf-8\"?><response><status><errorcode>0</errorcode><errorstring></errorstring><records>1</records><totalrecords>1</totalrecords></status><info><rsp-version>1.0</rsp-version><server-version>media-catalog-core</server-version></info></response>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_info_round_trips_through_the_tlv_decoder() {
        let bytes = tlv_handlers::server_info();
        let (tag, atom) = crate::tlv::decode(&bytes).unwrap();
        assert_eq!(tag, "msrv");
        let crate::tlv::Atom::Container(children) = atom else { panic!("expected container") };
        assert!(children.iter().any(|(t, _)| t == "mstt"));
    }

    #[test]
    fn item_listing_encodes_rows_under_mlcl() {
        let rows = vec![vec![("id", "42".to_string()), ("title", "Song".to_string())]];
        let status = Status::ok(1, 1);
        let bytes = tlv_handlers::item_listing("adbs", &status, &rows);
        let (tag, atom) = crate::tlv::decode(&bytes).unwrap();
        assert_eq!(tag, "adbs");
        let crate::tlv::Atom::Container(children) = atom else { panic!("expected container") };
        let listing = children.iter().find(|(t, _)| t == "mlcl").unwrap();
        let crate::tlv::Atom::Container(items) = &listing.1 else { panic!("expected container") };
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn rsp_items_xml_escapes_values() {
        let rows = vec![vec![("title", "Tom & Jerry".to_string())]];
        let xml = rsp_handlers::items_xml(&Status::ok(1, 1), &rows);
        assert!(xml.contains("Tom &amp; Jerry"));
    }

    #[test]
    fn rsp_error_xml_carries_the_message() {
        let xml = rsp_handlers::error_xml(&Status::error("bad predicate"));
        assert!(xml.contains("bad predicate"));
        assert!(xml.contains("<errorcode>500</errorcode>"));
    }
}
