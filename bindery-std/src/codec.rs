//! Attribute codec - bindings to and from `data-cb-*` attributes.
//!
//! Encoding is a pure string transform so it runs the same during server
//! rendering (no DOM) and on the client.
//!
//! # Grammar
//!
//! ```text
//! attribute = "data-cb-" slot
//! slot      = event-type | "mount" | "afterhide" | "visibility" | "validate"
//! value     = entry *( " " entry )
//! entry     = field *( ":" field )        ; id, then bound arguments
//! field     = *( unreserved | "%" HEXDIG HEXDIG )
//! ```
//!
//! `%`, `:`, ASCII whitespace and ASCII control characters inside a field are
//! escaped as `%XX`. Everything else, non-ASCII included, is written as is, so
//! values survive HTML attribute serialization unchanged. `id` carries zero
//! arguments, `id:` carries one empty argument.

use bindery_core::{Callback, CallbackKind, DecodeError, Document, EncodeError, NodeId};
use std::fmt::Write as _;

/// Prefix shared by every binding attribute.
pub const ATTRIBUTE_PREFIX: &str = "data-cb-";

/// A callback id plus the literal arguments bound to it, tagged with its slot.
///
/// Produced by [`bind`] when rendering and by [`from_attributes`] when
/// processing. It does not own the handler; the id is resolved against a
/// registry at processing time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoundReference {
    id: String,
    kind: CallbackKind,
    args: Vec<String>,
}

/// What [`from_attributes`] yields.
pub type DecodedBinding = BoundReference;

impl BoundReference {
    pub(crate) fn new(kind: CallbackKind, id: String, args: Vec<String>) -> Self {
        Self { id, kind, args }
    }

    /// Callback id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Slot the binding is encoded in.
    pub fn kind(&self) -> &CallbackKind {
        &self.kind
    }

    /// Bound literal arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Bind literal arguments to a callback.
///
/// In debug builds an argument count that differs from the callback's
/// declared arity is logged; it is never an error.
pub fn bind<I, S>(callback: &Callback, args: I) -> Result<BoundReference, EncodeError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    if callback.id().is_empty() {
        return Err(EncodeError::EmptyId);
    }
    if let CallbackKind::Event(event_type) = callback.kind() {
        validate_event_type(event_type)?;
    }
    let args: Vec<String> = args.into_iter().map(Into::into).collect();

    #[cfg(debug_assertions)]
    if let Some(arity) = callback.arity()
        && arity != args.len()
    {
        tracing::warn!(
            id = callback.id(),
            expected = arity,
            got = args.len(),
            "bound argument count does not match declared arity"
        );
    }

    Ok(BoundReference::new(
        callback.kind().clone(),
        callback.id().to_string(),
        args,
    ))
}

/// Check that an event type can be used as an attribute slot.
pub fn validate_event_type(event_type: &str) -> Result<(), EncodeError> {
    let valid = is_slot_name(event_type) && !CallbackKind::RESERVED.contains(&event_type);
    if valid {
        Ok(())
    } else {
        Err(EncodeError::InvalidEventType(event_type.to_string()))
    }
}

fn is_slot_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
}

/// Attribute name for a slot.
pub fn attribute_name(kind: &CallbackKind) -> String {
    format!("{ATTRIBUTE_PREFIX}{}", kind.slot())
}

/// Slot named by a binding attribute, or `None` for any other attribute.
pub fn slot_of(attribute: &str) -> Option<CallbackKind> {
    let slot = attribute.strip_prefix(ATTRIBUTE_PREFIX)?;
    is_slot_name(slot).then(|| CallbackKind::from_slot(slot))
}

// ============================================================================
// Fields & entries
// ============================================================================

fn needs_escape(c: char) -> bool {
    c == '%' || c == ':' || c.is_ascii_whitespace() || c.is_ascii_control()
}

fn escape_into(field: &str, out: &mut String) {
    for c in field.chars() {
        if needs_escape(c) {
            // Escaped characters are all ASCII, so one byte each.
            let _ = write!(out, "%{:02X}", c as u32);
        } else {
            out.push(c);
        }
    }
}

fn unescape(field: &str, offset: usize) -> Result<String, DecodeError> {
    if !field.contains('%') {
        return Ok(field.to_string());
    }
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .filter(|h| h.iter().all(u8::is_ascii_hexdigit))
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            match hex {
                Some(byte) => out.push(byte),
                None => return Err(DecodeError::BadEscape { position: offset + i }),
            }
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| DecodeError::InvalidUtf8)
}

/// One decoded entry of an attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Callback id.
    pub id: String,
    /// Bound arguments.
    pub args: Vec<String>,
}

/// Encode a single entry.
pub fn encode_entry(id: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(id.len());
    escape_into(id, &mut out);
    for arg in args {
        out.push(':');
        escape_into(arg, &mut out);
    }
    out
}

/// Decode a single entry. `index` is only used in error reports.
pub fn decode_entry(entry: &str, index: usize) -> Result<Entry, DecodeError> {
    let mut offset = 0;
    let mut fields = Vec::new();
    for raw in entry.split(':') {
        fields.push(unescape(raw, offset)?);
        offset += raw.len() + 1;
    }
    let mut fields = fields.into_iter();
    let id = fields.next().unwrap_or_default();
    if id.is_empty() {
        return Err(DecodeError::EmptyId { entry: index });
    }
    Ok(Entry {
        id,
        args: fields.collect(),
    })
}

/// Encode references as one attribute value, in order. Slots are ignored.
pub fn encode_value(refs: &[BoundReference]) -> String {
    refs.iter()
        .map(|r| encode_entry(&r.id, &r.args))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strictly decode an attribute value: the first bad entry fails the whole
/// value.
pub fn decode_value(value: &str) -> Result<Vec<Entry>, DecodeError> {
    value
        .split_ascii_whitespace()
        .enumerate()
        .map(|(index, entry)| decode_entry(entry, index))
        .collect()
}

// ============================================================================
// Attribute sets
// ============================================================================

/// Attributes produced by [`to_attributes`], in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap(Vec<(String, String)>);

impl AttributeMap {
    /// Value of an attribute.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Set every attribute on `node`, replacing existing values.
    pub fn spread_onto(&self, document: &Document, node: NodeId) {
        for (name, value) in &self.0 {
            document.set_attribute(node, name, value);
        }
    }

    /// Render as ` name="value"` pairs for hand-written markup.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.0 {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            crate::html::escape_attribute(value, &mut out);
            out.push('"');
        }
        out
    }
}

impl IntoIterator for AttributeMap {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Serialize references into the minimal attribute set.
///
/// References sharing a slot are merged into one attribute in the order
/// given; attributes appear in the order their slot is first seen.
pub fn to_attributes<'a, I>(refs: I) -> AttributeMap
where
    I: IntoIterator<Item = &'a BoundReference>,
{
    let mut groups: Vec<(CallbackKind, Vec<BoundReference>)> = Vec::new();
    for r in refs {
        match groups.iter_mut().find(|(kind, _)| *kind == r.kind) {
            Some((_, group)) => group.push(r.clone()),
            None => groups.push((r.kind.clone(), vec![r.clone()])),
        }
    }
    AttributeMap(
        groups
            .into_iter()
            .map(|(kind, group)| (attribute_name(&kind), encode_value(&group)))
            .collect(),
    )
}

/// Decode binding attributes from `(name, value)` pairs.
///
/// Malformed entries are skipped with a warning; the rest still decode.
pub fn decode_attributes<'a, I>(attrs: I) -> Vec<DecodedBinding>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut out = Vec::new();
    for (name, value) in attrs {
        let Some(kind) = slot_of(name) else {
            continue;
        };
        for (index, raw) in value.split_ascii_whitespace().enumerate() {
            match decode_entry(raw, index) {
                Ok(entry) => out.push(BoundReference::new(kind.clone(), entry.id, entry.args)),
                Err(err) => {
                    tracing::warn!(
                        attribute = name,
                        entry = raw,
                        error = %err,
                        "skipping malformed binding"
                    );
                }
            }
        }
    }
    out
}

/// Decode the bindings carried by an element, in attribute then entry order.
pub fn from_attributes(document: &Document, node: NodeId) -> Vec<DecodedBinding> {
    let attrs = document.attributes(node);
    decode_attributes(attrs.iter().map(|a| (a.name.as_str(), a.value.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click(id: &str) -> Callback {
        Callback::event("click", id.to_string(), |_, _| ())
    }

    #[test]
    fn test_entry_round_trip_with_awkward_arguments() {
        let args = vec![
            "".to_string(),
            "a:b".to_string(),
            "50% off".to_string(),
            "tab\tnew\nline".to_string(),
            "héllo 👋".to_string(),
            "%3A".to_string(),
        ];
        let encoded = encode_entry("demo:open", &args);
        assert!(!encoded.contains(' '));
        assert_eq!(encoded.split(':').count(), args.len() + 1);
        let decoded = decode_entry(&encoded, 0).unwrap();
        assert_eq!(decoded.id, "demo:open");
        assert_eq!(decoded.args, args);
    }

    #[test]
    fn test_zero_args_versus_one_empty_arg() {
        assert_eq!(decode_entry("x", 0).unwrap().args, Vec::<String>::new());
        assert_eq!(decode_entry("x:", 0).unwrap().args, vec![String::new()]);
        assert_eq!(encode_entry("x", &[]), "x");
        assert_eq!(encode_entry("x", &[String::new()]), "x:");
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(decode_entry(":a", 3), Err(DecodeError::EmptyId { entry: 3 }));
        assert_eq!(
            decode_entry("id:ab%4", 0),
            Err(DecodeError::BadEscape { position: 5 })
        );
        assert_eq!(
            decode_entry("id:%zz", 0),
            Err(DecodeError::BadEscape { position: 3 })
        );
        assert_eq!(decode_entry("id:%FF", 0), Err(DecodeError::InvalidUtf8));
        assert!(decode_value("ok bad%").is_err());
    }

    #[test]
    fn test_to_attributes_merges_per_slot() {
        let a = bind(&click("demo:a"), ["1"]).unwrap();
        let m = bind(&Callback::mount("demo:m", |_, _| ()), Vec::<String>::new()).unwrap();
        let b = bind(&click("demo:b"), ["x y", "z"]).unwrap();

        let attrs = to_attributes([&a, &m, &b]);
        assert_eq!(attrs.len(), 2);
        let names: Vec<_> = attrs.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["data-cb-click", "data-cb-mount"]);
        assert_eq!(
            attrs.get("data-cb-click"),
            Some("demo%3Aa:1 demo%3Ab:x%20y:z")
        );
        assert_eq!(attrs.get("data-cb-mount"), Some("demo%3Am"));
    }

    #[test]
    fn test_decode_attributes_skips_foreign_and_malformed() {
        let decoded = decode_attributes([
            ("class", "t-hidden"),
            ("data-cb-click", "good:1 %zz also"),
            ("data-cb-Bad", "ignored"),
            ("data-cb-validate", "demo%3Areq"),
        ]);
        let ids: Vec<_> = decoded.iter().map(|d| (d.kind().slot(), d.id())).collect();
        assert_eq!(
            ids,
            vec![("click", "good"), ("click", "also"), ("validate", "demo:req")]
        );
        assert_eq!(decoded[0].args(), ["1"]);
    }

    #[test]
    fn test_event_types_are_checked_at_bind() {
        for bad in ["Click", "", "mount", "on click"] {
            let cb = Callback::event(bad, "demo:x", |_, _| ());
            assert_eq!(
                bind(&cb, Vec::<String>::new()),
                Err(EncodeError::InvalidEventType(bad.to_string()))
            );
        }
        let empty = Callback::mount("", |_, _| ());
        assert_eq!(bind(&empty, Vec::<String>::new()), Err(EncodeError::EmptyId));
    }

    #[test]
    fn test_element_round_trip() {
        let doc = Document::new();
        let button = doc.create_element("button");
        doc.set_attribute(button, "class", "primary");
        let refs = vec![
            bind(&click("demo:a"), ["target-id"]).unwrap(),
            bind(&click("demo:b"), Vec::<String>::new()).unwrap(),
            bind(&Callback::after_hide("demo:h", |_, _| ()), [""]).unwrap(),
        ];
        to_attributes(&refs).spread_onto(&doc, button);
        assert_eq!(from_attributes(&doc, button), refs);
        assert_eq!(doc.get_attribute(button, "class").as_deref(), Some("primary"));
    }
}
