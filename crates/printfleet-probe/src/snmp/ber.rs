// ── BER codec for SNMPv2c ──
//
// Just enough ASN.1 BER to speak community-based SNMP: definite lengths,
// the universal types SNMP uses, the SMIv2 application types, and the
// three v2 exception markers. Decoding is bounds-checked throughout; a
// malformed datagram is an error, never a panic.

use serde::Serialize;

use super::oid::Oid;
use crate::error::Error;
use crate::text::decode_loose;

/// Tag octets used by SNMPv2c.
pub mod tag {
    pub const INTEGER: u8 = 0x02;
    pub const OCTET_STRING: u8 = 0x04;
    pub const NULL: u8 = 0x05;
    pub const OBJECT_IDENTIFIER: u8 = 0x06;
    pub const SEQUENCE: u8 = 0x30;
    pub const IP_ADDRESS: u8 = 0x40;
    pub const COUNTER32: u8 = 0x41;
    pub const GAUGE32: u8 = 0x42;
    pub const TIMETICKS: u8 = 0x43;
    pub const OPAQUE: u8 = 0x44;
    pub const COUNTER64: u8 = 0x46;
    pub const NO_SUCH_OBJECT: u8 = 0x80;
    pub const NO_SUCH_INSTANCE: u8 = 0x81;
    pub const END_OF_MIB_VIEW: u8 = 0x82;
}

/// SNMPv2c is version 1 on the wire.
pub const VERSION_2C: i64 = 1;

// ── Values ───────────────────────────────────────────────────────────

/// A varbind value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Value {
    Integer(i64),
    OctetString(Vec<u8>),
    Null,
    ObjectId(Oid),
    IpAddress([u8; 4]),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    Counter64(u64),
    Opaque(Vec<u8>),
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
}

impl Value {
    /// Numeric view of any integer-like value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Counter32(v) | Self::Gauge32(v) | Self::TimeTicks(v) => Some(i64::from(*v)),
            Self::Counter64(v) => i64::try_from(*v).ok(),
            Self::OctetString(bytes) => decode_loose(bytes).trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::OctetString(bytes) | Self::Opaque(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Text view; numbers are rendered, octet strings decoded loosely.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::OctetString(bytes) => Some(decode_loose(bytes)),
            Self::Integer(_)
            | Self::Counter32(_)
            | Self::Gauge32(_)
            | Self::TimeTicks(_)
            | Self::Counter64(_) => self.as_i64().map(|v| v.to_string()),
            Self::ObjectId(oid) => Some(oid.to_string()),
            _ => None,
        }
    }

    /// v2 exception markers (`noSuchObject`, `noSuchInstance`, `endOfMibView`).
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Self::NoSuchObject | Self::NoSuchInstance | Self::EndOfMibView
        )
    }
}

// ── PDUs ─────────────────────────────────────────────────────────────

/// PDU types this client sends or accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduKind {
    Get,
    GetNext,
    Response,
    GetBulk,
}

impl PduKind {
    fn tag(self) -> u8 {
        match self {
            Self::Get => 0xa0,
            Self::GetNext => 0xa1,
            Self::Response => 0xa2,
            Self::GetBulk => 0xa5,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0xa0 => Some(Self::Get),
            0xa1 => Some(Self::GetNext),
            0xa2 => Some(Self::Response),
            0xa5 => Some(Self::GetBulk),
            _ => None,
        }
    }
}

/// One PDU. For GETBULK the two middle integers are `non-repeaters` and
/// `max-repetitions`; everywhere else they are `error-status` and
/// `error-index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdu {
    pub kind: PduKind,
    pub request_id: i32,
    pub error_status: i64,
    pub error_index: i64,
    pub varbinds: Vec<(Oid, Value)>,
}

impl Pdu {
    pub fn get(request_id: i32, oids: &[Oid]) -> Self {
        Self::request(PduKind::Get, request_id, oids)
    }

    pub fn get_next(request_id: i32, oids: &[Oid]) -> Self {
        Self::request(PduKind::GetNext, request_id, oids)
    }

    pub fn get_bulk(request_id: i32, max_repetitions: u32, oids: &[Oid]) -> Self {
        Self {
            error_index: i64::from(max_repetitions),
            ..Self::request(PduKind::GetBulk, request_id, oids)
        }
    }

    pub fn response(request_id: i32, varbinds: Vec<(Oid, Value)>) -> Self {
        Self {
            kind: PduKind::Response,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds,
        }
    }

    fn request(kind: PduKind, request_id: i32, oids: &[Oid]) -> Self {
        Self {
            kind,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds: oids.iter().map(|oid| (oid.clone(), Value::Null)).collect(),
        }
    }
}

/// A community-based SNMP message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub version: i64,
    pub community: Vec<u8>,
    pub pdu: Pdu,
}

impl Message {
    pub fn v2c(community: impl Into<Vec<u8>>, pdu: Pdu) -> Self {
        Self {
            version: VERSION_2C,
            community: community.into(),
            pdu,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut varbinds = Vec::new();
        for (oid, value) in &self.pdu.varbinds {
            let mut vb = Vec::new();
            write_tlv(&mut vb, tag::OBJECT_IDENTIFIER, &encode_oid(oid));
            encode_value(&mut vb, value);
            write_tlv(&mut varbinds, tag::SEQUENCE, &vb);
        }

        let mut pdu = Vec::new();
        write_tlv(&mut pdu, tag::INTEGER, &encode_integer(i64::from(self.pdu.request_id)));
        write_tlv(&mut pdu, tag::INTEGER, &encode_integer(self.pdu.error_status));
        write_tlv(&mut pdu, tag::INTEGER, &encode_integer(self.pdu.error_index));
        write_tlv(&mut pdu, tag::SEQUENCE, &varbinds);

        let mut body = Vec::new();
        write_tlv(&mut body, tag::INTEGER, &encode_integer(self.version));
        write_tlv(&mut body, tag::OCTET_STRING, &self.community);
        write_tlv(&mut body, self.pdu.kind.tag(), &pdu);

        let mut out = Vec::with_capacity(body.len() + 4);
        write_tlv(&mut out, tag::SEQUENCE, &body);
        out
    }

    pub fn decode(datagram: &[u8]) -> Result<Self, Error> {
        let mut outer = Reader::new(datagram);
        let mut msg = outer.expect(tag::SEQUENCE)?;

        let version = decode_integer(msg.expect(tag::INTEGER)?.rest())?;
        let community = msg.expect(tag::OCTET_STRING)?.rest().to_vec();

        let (pdu_tag, pdu_body) = msg.read_tlv()?;
        let kind = PduKind::from_tag(pdu_tag)
            .ok_or_else(|| Error::Ber(format!("unsupported PDU tag 0x{pdu_tag:02x}")))?;
        let mut pdu = Reader::new(pdu_body);

        let request_id = decode_integer(pdu.expect(tag::INTEGER)?.rest())?;
        let request_id = i32::try_from(request_id)
            .map_err(|_| Error::Ber(format!("request-id {request_id} out of range")))?;
        let error_status = decode_integer(pdu.expect(tag::INTEGER)?.rest())?;
        let error_index = decode_integer(pdu.expect(tag::INTEGER)?.rest())?;

        let mut list = pdu.expect(tag::SEQUENCE)?;
        let mut varbinds = Vec::new();
        while !list.is_empty() {
            let mut vb = list.expect(tag::SEQUENCE)?;
            let oid = decode_oid(vb.expect(tag::OBJECT_IDENTIFIER)?.rest())?;
            let (value_tag, value_body) = vb.read_tlv()?;
            varbinds.push((oid, decode_value(value_tag, value_body)?));
        }

        Ok(Self {
            version,
            community,
            pdu: Pdu {
                kind,
                request_id,
                error_status,
                error_index,
                varbinds,
            },
        })
    }
}

// ── Encoding ─────────────────────────────────────────────────────────

fn write_tlv(out: &mut Vec<u8>, tag: u8, content: &[u8]) {
    out.push(tag);
    encode_length(out, content.len());
    out.extend_from_slice(content);
}

fn encode_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.extend(u8::try_from(len));
        return;
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let significant = &bytes[skip..];
    out.extend(u8::try_from(0x80 | significant.len()));
    out.extend_from_slice(significant);
}

/// Minimal two's-complement encoding.
pub fn encode_integer(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start + 1 < bytes.len() {
        let (cur, next) = (bytes[start], bytes[start + 1]);
        let redundant = (cur == 0x00 && next & 0x80 == 0) || (cur == 0xff && next & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

fn encode_unsigned(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = bytes
        .iter()
        .take(bytes.len() - 1)
        .take_while(|b| **b == 0)
        .count();
    let mut out = Vec::with_capacity(9);
    if bytes[skip] & 0x80 != 0 {
        out.push(0);
    }
    out.extend_from_slice(&bytes[skip..]);
    out
}

fn encode_base128(out: &mut Vec<u8>, mut value: u64) {
    let mut chunk = [0u8; 10];
    let mut i = chunk.len();
    loop {
        i -= 1;
        chunk[i] = u8::try_from(value & 0x7f).unwrap_or_default();
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    let last = chunk.len() - 1;
    for (pos, byte) in chunk.iter().enumerate().skip(i) {
        out.push(if pos == last { *byte } else { byte | 0x80 });
    }
}

pub fn encode_oid(oid: &Oid) -> Vec<u8> {
    let arcs = oid.arcs();
    let mut out = Vec::new();
    match arcs {
        [] => {}
        [only] => encode_base128(&mut out, u64::from(*only) * 40),
        [first, second, rest @ ..] => {
            encode_base128(&mut out, u64::from(*first) * 40 + u64::from(*second));
            for arc in rest {
                encode_base128(&mut out, u64::from(*arc));
            }
        }
    }
    out
}

fn encode_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(v) => write_tlv(out, tag::INTEGER, &encode_integer(*v)),
        Value::OctetString(bytes) => write_tlv(out, tag::OCTET_STRING, bytes),
        Value::Null => write_tlv(out, tag::NULL, &[]),
        Value::ObjectId(oid) => write_tlv(out, tag::OBJECT_IDENTIFIER, &encode_oid(oid)),
        Value::IpAddress(ip) => write_tlv(out, tag::IP_ADDRESS, ip),
        Value::Counter32(v) => write_tlv(out, tag::COUNTER32, &encode_unsigned(u64::from(*v))),
        Value::Gauge32(v) => write_tlv(out, tag::GAUGE32, &encode_unsigned(u64::from(*v))),
        Value::TimeTicks(v) => write_tlv(out, tag::TIMETICKS, &encode_unsigned(u64::from(*v))),
        Value::Counter64(v) => write_tlv(out, tag::COUNTER64, &encode_unsigned(*v)),
        Value::Opaque(bytes) => write_tlv(out, tag::OPAQUE, bytes),
        Value::NoSuchObject => write_tlv(out, tag::NO_SUCH_OBJECT, &[]),
        Value::NoSuchInstance => write_tlv(out, tag::NO_SUCH_INSTANCE, &[]),
        Value::EndOfMibView => write_tlv(out, tag::END_OF_MIB_VIEW, &[]),
    }
}

// ── Decoding ─────────────────────────────────────────────────────────

/// Cursor over a run of TLVs.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn rest(&self) -> &'a [u8] {
        self.data.get(self.pos..).unwrap_or_default()
    }

    fn byte(&mut self) -> Result<u8, Error> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| Error::Ber("unexpected end of data".into()))?;
        self.pos += 1;
        Ok(b)
    }

    fn length(&mut self) -> Result<usize, Error> {
        let first = self.byte()?;
        if first & 0x80 == 0 {
            return Ok(usize::from(first));
        }
        let count = usize::from(first & 0x7f);
        if count == 0 || count > 4 {
            return Err(Error::Ber(format!("unsupported length form 0x{first:02x}")));
        }
        let mut len = 0usize;
        for _ in 0..count {
            len = (len << 8) | usize::from(self.byte()?);
        }
        Ok(len)
    }

    fn read_tlv(&mut self) -> Result<(u8, &'a [u8]), Error> {
        let tag = self.byte()?;
        let len = self.length()?;
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| Error::Ber(format!("length {len} overruns buffer")))?;
        let body = &self.data[self.pos..end];
        self.pos = end;
        Ok((tag, body))
    }

    fn expect(&mut self, want: u8) -> Result<Reader<'a>, Error> {
        let (got, body) = self.read_tlv()?;
        if got != want {
            return Err(Error::Ber(format!(
                "expected tag 0x{want:02x}, found 0x{got:02x}"
            )));
        }
        Ok(Reader::new(body))
    }
}

pub fn decode_integer(content: &[u8]) -> Result<i64, Error> {
    if content.is_empty() || content.len() > 8 {
        return Err(Error::Ber(format!("integer of {} bytes", content.len())));
    }
    let negative = content[0] & 0x80 != 0;
    let mut value: i64 = if negative { -1 } else { 0 };
    for byte in content {
        value = (value << 8) | i64::from(*byte);
    }
    Ok(value)
}

fn decode_unsigned(content: &[u8]) -> Result<u64, Error> {
    let trimmed = match content {
        [0, rest @ ..] if !rest.is_empty() => rest,
        other => other,
    };
    if trimmed.is_empty() || trimmed.len() > 8 {
        return Err(Error::Ber(format!("unsigned of {} bytes", content.len())));
    }
    Ok(trimmed
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)))
}

fn decode_u32(content: &[u8]) -> Result<u32, Error> {
    let value = decode_unsigned(content)?;
    u32::try_from(value).map_err(|_| Error::Ber(format!("{value} exceeds 32 bits")))
}

pub fn decode_oid(content: &[u8]) -> Result<Oid, Error> {
    let mut subids = Vec::new();
    let mut acc: u64 = 0;
    for (i, byte) in content.iter().enumerate() {
        acc = (acc << 7) | u64::from(byte & 0x7f);
        if acc > u64::from(u32::MAX) * 128 {
            return Err(Error::Ber("OID sub-identifier overflow".into()));
        }
        if byte & 0x80 == 0 {
            subids.push(acc);
            acc = 0;
        } else if i + 1 == content.len() {
            return Err(Error::Ber("truncated OID sub-identifier".into()));
        }
    }

    let Some((first, rest)) = subids.split_first() else {
        return Err(Error::Ber("empty OID".into()));
    };
    let (a, b) = match *first {
        v if v < 40 => (0, v),
        v if v < 80 => (1, v - 40),
        v => (2, v - 80),
    };

    let mut arcs = Vec::with_capacity(subids.len() + 1);
    for v in [a, b].iter().chain(rest) {
        arcs.push(
            u32::try_from(*v).map_err(|_| Error::Ber(format!("OID arc {v} exceeds 32 bits")))?,
        );
    }
    Ok(Oid::from_arcs(arcs))
}

fn decode_value(value_tag: u8, content: &[u8]) -> Result<Value, Error> {
    Ok(match value_tag {
        tag::INTEGER => Value::Integer(decode_integer(content)?),
        tag::OCTET_STRING => Value::OctetString(content.to_vec()),
        tag::NULL => Value::Null,
        tag::OBJECT_IDENTIFIER => Value::ObjectId(decode_oid(content)?),
        tag::IP_ADDRESS => Value::IpAddress(
            content
                .try_into()
                .map_err(|_| Error::Ber(format!("IpAddress of {} bytes", content.len())))?,
        ),
        tag::COUNTER32 => Value::Counter32(decode_u32(content)?),
        tag::GAUGE32 => Value::Gauge32(decode_u32(content)?),
        tag::TIMETICKS => Value::TimeTicks(decode_u32(content)?),
        tag::COUNTER64 => Value::Counter64(decode_unsigned(content)?),
        tag::OPAQUE => Value::Opaque(content.to_vec()),
        tag::NO_SUCH_OBJECT => Value::NoSuchObject,
        tag::NO_SUCH_INSTANCE => Value::NoSuchInstance,
        tag::END_OF_MIB_VIEW => Value::EndOfMibView,
        other => return Err(Error::Ber(format!("unsupported value tag 0x{other:02x}"))),
    })
}
