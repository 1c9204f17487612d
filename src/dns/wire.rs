//! DNS wire codec
//!
//! Minimal RFC 1035 encoder/decoder covering the record types this
//! responder serves. Decoding is defensive: every read is bounds-checked
//! and compression pointers may only point backwards.

use std::collections::HashMap;

use super::message::{Flags, Message, Question, RecordClass, RecordType};
use super::record::{Record, RecordData, Soa};

/// DNS packet constants
pub const DNS_HEADER_SIZE: usize = 12;

/// Payload limit for clients that do not advertise EDNS
pub const DNS_MAX_PACKET_SIZE: usize = 512;

const MAX_LABEL_LEN: usize = 63;
const MAX_NAME_LEN: usize = 255;
const MAX_POINTER_HOPS: usize = 64;
const MAX_CHARACTER_STRING: usize = 255;
const POINTER_MASK: u8 = 0xC0;

/// Wire format errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("truncated {0}")]
    Truncated(&'static str),

    #[error("label longer than 63 octets")]
    LabelTooLong,

    #[error("name longer than 255 octets")]
    NameTooLong,

    #[error("invalid compression pointer")]
    BadPointer,

    #[error("reserved label type {0:#04x}")]
    BadLabelType(u8),

    #[error("label is not valid text")]
    InvalidLabel,

    #[error("rdata length mismatch for {0}")]
    RdataLength(RecordType),

    #[error("too many entries in one section")]
    TooManyEntries,
}

/// Bounds-checked cursor over a received packet
struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn read_bytes(&mut self, len: usize, what: &'static str) -> Result<&'a [u8], WireError> {
        let end = self.pos.checked_add(len).ok_or(WireError::Truncated(what))?;
        if end > self.data.len() {
            return Err(WireError::Truncated(what));
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_u8(&mut self, what: &'static str) -> Result<u8, WireError> {
        Ok(self.read_bytes(1, what)?[0])
    }

    fn read_u16(&mut self, what: &'static str) -> Result<u16, WireError> {
        let bytes = self.read_bytes(2, what)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self, what: &'static str) -> Result<u32, WireError> {
        let bytes = self.read_bytes(4, what)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a possibly compressed name, returned without the root dot
    fn read_name(&mut self) -> Result<String, WireError> {
        let mut labels: Vec<String> = Vec::new();
        let mut wire_len = 1;
        let mut cursor = self.pos;
        let mut resume: Option<usize> = None;
        let mut hops = 0;

        loop {
            let len = *self.data.get(cursor).ok_or(WireError::Truncated("name"))?;

            match len & POINTER_MASK {
                0x00 => {}
                POINTER_MASK => {
                    let low = *self.data.get(cursor + 1).ok_or(WireError::Truncated("name"))?;
                    let target = (((len & !POINTER_MASK) as usize) << 8) | low as usize;

                    // Pointers must go strictly backwards
                    if target >= cursor {
                        return Err(WireError::BadPointer);
                    }
                    hops += 1;
                    if hops > MAX_POINTER_HOPS {
                        return Err(WireError::BadPointer);
                    }
                    if resume.is_none() {
                        resume = Some(cursor + 2);
                    }
                    cursor = target;
                    continue;
                }
                other => return Err(WireError::BadLabelType(other)),
            }

            cursor += 1;
            if len == 0 {
                break;
            }

            let len = len as usize;
            wire_len += len + 1;
            if wire_len > MAX_NAME_LEN {
                return Err(WireError::NameTooLong);
            }

            let raw = self
                .data
                .get(cursor..cursor + len)
                .ok_or(WireError::Truncated("label"))?;
            let label = std::str::from_utf8(raw).map_err(|_| WireError::InvalidLabel)?;
            if label.contains('.') {
                return Err(WireError::InvalidLabel);
            }
            labels.push(label.to_string());
            cursor += len;
        }

        self.pos = resume.unwrap_or(cursor);
        Ok(labels.join("."))
    }

    fn read_question(&mut self) -> Result<Question, WireError> {
        let name = self.read_name()?;
        let qtype = RecordType::from(self.read_u16("question type")?);
        let qclass = RecordClass::from(self.read_u16("question class")?);
        Ok(Question::new(name, qtype, qclass))
    }

    fn read_record(&mut self) -> Result<Record, WireError> {
        let name = self.read_name()?;
        let rtype = self.read_u16("record type")?;
        let class = RecordClass::from(self.read_u16("record class")?);
        let ttl = self.read_u32("record ttl")?;
        let rdlength = self.read_u16("rdlength")? as usize;

        let start = self.pos;
        let end = start + rdlength;
        if end > self.data.len() {
            return Err(WireError::Truncated("rdata"));
        }

        let record_type = RecordType::from(rtype);
        let data = match record_type {
            RecordType::A => {
                if rdlength != 4 {
                    return Err(WireError::RdataLength(record_type));
                }
                let octets = self.read_bytes(4, "A rdata")?;
                RecordData::A(std::net::Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]))
            }
            RecordType::NS => RecordData::NS(self.read_name()?),
            RecordType::TXT => {
                let mut text = String::new();
                while self.pos < end {
                    let len = self.read_u8("TXT length")? as usize;
                    let chunk = self.read_bytes(len, "TXT string")?;
                    text.push_str(&String::from_utf8_lossy(chunk));
                }
                RecordData::TXT(text)
            }
            RecordType::SRV => RecordData::SRV {
                priority: self.read_u16("SRV priority")?,
                weight: self.read_u16("SRV weight")?,
                port: self.read_u16("SRV port")?,
                target: self.read_name()?,
            },
            RecordType::SOA => RecordData::SOA(Soa {
                mname: self.read_name()?,
                rname: self.read_name()?,
                serial: self.read_u32("SOA serial")?,
                refresh: self.read_u32("SOA refresh")?,
                retry: self.read_u32("SOA retry")?,
                expire: self.read_u32("SOA expire")?,
                minimum: self.read_u32("SOA minimum")?,
            }),
            _ => RecordData::Opaque {
                rtype,
                data: self.read_bytes(rdlength, "rdata")?.to_vec(),
            },
        };

        if self.pos != end {
            return Err(WireError::RdataLength(record_type));
        }

        Ok(Record {
            name,
            ttl,
            class,
            data,
        })
    }
}

/// Packet builder with name compression
struct WireWriter {
    buf: Vec<u8>,
    names: HashMap<String, u16>,
}

impl WireWriter {
    fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DNS_MAX_PACKET_SIZE),
            names: HashMap::new(),
        }
    }

    fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn write_name(&mut self, name: &str, compress: bool) -> Result<(), WireError> {
        let labels: Vec<&str> = name
            .trim_end_matches('.')
            .split('.')
            .filter(|label| !label.is_empty())
            .collect();

        if labels.iter().any(|label| label.len() > MAX_LABEL_LEN) {
            return Err(WireError::LabelTooLong);
        }
        let wire_len: usize = labels.iter().map(|label| label.len() + 1).sum::<usize>() + 1;
        if wire_len > MAX_NAME_LEN {
            return Err(WireError::NameTooLong);
        }

        for i in 0..labels.len() {
            // Exact-case match, so decoded names keep the case they were written with
            let suffix = labels[i..].join(".");
            if compress {
                if let Some(&offset) = self.names.get(&suffix) {
                    self.write_u16(0xC000 | offset);
                    return Ok(());
                }
            }
            // Only offsets that fit in a 14-bit pointer are reusable
            if self.buf.len() <= 0x3FFF {
                self.names.entry(suffix).or_insert(self.buf.len() as u16);
            }
            self.buf.push(labels[i].len() as u8);
            self.buf.extend_from_slice(labels[i].as_bytes());
        }
        self.buf.push(0);
        Ok(())
    }

    fn write_question(&mut self, question: &Question) -> Result<(), WireError> {
        self.write_name(&question.name, true)?;
        self.write_u16(question.qtype.to_u16());
        self.write_u16(question.qclass.to_u16());
        Ok(())
    }

    fn write_record(&mut self, record: &Record) -> Result<(), WireError> {
        self.write_name(&record.name, true)?;
        self.write_u16(record.record_type().to_u16());
        self.write_u16(record.class.to_u16());
        self.write_u32(record.ttl);

        let rdlength_at = self.buf.len();
        self.write_u16(0);

        match &record.data {
            RecordData::A(addr) => self.buf.extend_from_slice(&addr.octets()),
            RecordData::NS(name) => self.write_name(name, true)?,
            RecordData::TXT(text) => {
                let bytes = text.as_bytes();
                if bytes.is_empty() {
                    self.buf.push(0);
                }
                for chunk in bytes.chunks(MAX_CHARACTER_STRING) {
                    self.buf.push(chunk.len() as u8);
                    self.buf.extend_from_slice(chunk);
                }
            }
            RecordData::SRV {
                priority,
                weight,
                port,
                target,
            } => {
                self.write_u16(*priority);
                self.write_u16(*weight);
                self.write_u16(*port);
                // RFC 2782: SRV targets are never compressed
                self.write_name(target, false)?;
            }
            RecordData::SOA(soa) => {
                self.write_name(&soa.mname, true)?;
                self.write_name(&soa.rname, true)?;
                self.write_u32(soa.serial);
                self.write_u32(soa.refresh);
                self.write_u32(soa.retry);
                self.write_u32(soa.expire);
                self.write_u32(soa.minimum);
            }
            RecordData::Opaque { data, .. } => self.buf.extend_from_slice(data),
        }

        let rdlength = self.buf.len() - rdlength_at - 2;
        let rdlength = u16::try_from(rdlength)
            .map_err(|_| WireError::RdataLength(record.record_type()))?;
        self.buf[rdlength_at..rdlength_at + 2].copy_from_slice(&rdlength.to_be_bytes());
        Ok(())
    }
}

fn section_count(len: usize) -> Result<u16, WireError> {
    u16::try_from(len).map_err(|_| WireError::TooManyEntries)
}

impl Message {
    /// Parse a message from wire bytes
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        if data.len() < DNS_HEADER_SIZE {
            return Err(WireError::Truncated("header"));
        }

        let mut reader = WireReader::new(data);
        let id = reader.read_u16("header")?;
        let (flags, opcode, rcode) = Flags::from_header_bits(reader.read_u16("header")?);
        let qdcount = reader.read_u16("header")?;
        let ancount = reader.read_u16("header")?;
        let nscount = reader.read_u16("header")?;
        let arcount = reader.read_u16("header")?;

        let mut questions = Vec::new();
        for _ in 0..qdcount {
            questions.push(reader.read_question()?);
        }

        let mut sections: [Vec<Record>; 3] = Default::default();
        for (section, count) in sections.iter_mut().zip([ancount, nscount, arcount]) {
            for _ in 0..count {
                section.push(reader.read_record()?);
            }
        }
        let [answers, authorities, additionals] = sections;

        Ok(Message::build(
            id,
            opcode,
            rcode,
            flags,
            questions,
            answers,
            authorities,
            additionals,
        ))
    }

    /// Serialize to wire bytes
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let mut writer = WireWriter::new();

        writer.write_u16(self.id);
        writer.write_u16(self.flags.to_header_bits(self.opcode, self.rcode));
        writer.write_u16(section_count(self.questions.len())?);
        writer.write_u16(section_count(self.answers.len())?);
        writer.write_u16(section_count(self.authorities.len())?);
        writer.write_u16(section_count(self.additionals.len())?);

        for question in &self.questions {
            writer.write_question(question)?;
        }
        for record in self
            .answers
            .iter()
            .chain(&self.authorities)
            .chain(&self.additionals)
        {
            writer.write_record(record)?;
        }

        Ok(writer.buf)
    }

    /// Serialize, falling back to an empty truncated reply when the
    /// encoded message exceeds `limit` bytes
    ///
    /// The fallback keeps the questions and any OPT record.
    pub fn encode_with_limit(&self, limit: usize) -> Result<(Vec<u8>, bool), WireError> {
        let bytes = self.encode()?;
        if bytes.len() <= limit {
            return Ok((bytes, false));
        }

        let mut truncated = self.clone();
        truncated.answers.clear();
        truncated.authorities.clear();
        truncated
            .additionals
            .retain(|record| record.record_type() == RecordType::OPT);
        truncated.flags.tc = true;
        Ok((truncated.encode()?, true))
    }

    /// UDP payload size advertised through an EDNS(0) OPT record
    pub fn edns_payload_size(&self) -> Option<u16> {
        self.additionals
            .iter()
            .find(|record| record.record_type() == RecordType::OPT)
            .map(|record| record.class.to_u16())
    }

    /// Largest UDP response this message's sender accepts
    pub fn max_response_size(&self) -> usize {
        self.edns_payload_size()
            .map(|size| (size as usize).max(DNS_MAX_PACKET_SIZE))
            .unwrap_or(DNS_MAX_PACKET_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::message::{OpCode, ResponseCode};
    use crate::dns::record::{
        address_record, authority_record, edns_opt_record, nameserver_record, service_record,
        text_record,
    };
    use std::net::Ipv4Addr;

    fn question_bytes(labels: &[&str], qtype: u16) -> Vec<u8> {
        let mut data = Vec::new();
        for label in labels {
            data.push(label.len() as u8);
            data.extend_from_slice(label.as_bytes());
        }
        data.push(0);
        data.extend_from_slice(&qtype.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data
    }

    fn query_packet(id: u16, labels: &[&str], qtype: u16) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&id.to_be_bytes());
        data.extend_from_slice(&0x0100u16.to_be_bytes()); // RD
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
        data.extend_from_slice(&question_bytes(labels, qtype));
        data
    }

    #[test]
    fn test_parse_question() {
        let data = query_packet(0x1234, &["cluster", "Example", "org"], 1);

        let message = Message::decode(&data).unwrap();
        assert_eq!(message.id, 0x1234);
        assert!(message.flags.rd);
        assert!(!message.is_response());
        assert_eq!(message.questions.len(), 1);
        assert_eq!(message.questions[0].name, "cluster.Example.org");
        assert_eq!(message.questions[0].qtype, RecordType::A);
        assert_eq!(message.questions[0].qclass, RecordClass::IN);
    }

    #[test]
    fn test_short_packet_rejected() {
        assert_eq!(Message::decode(&[0u8; 5]), Err(WireError::Truncated("header")));
    }

    #[test]
    fn test_truncated_question_rejected() {
        let mut data = query_packet(1, &["cluster", "example"], 1);
        data.truncate(data.len() - 3);
        assert!(matches!(Message::decode(&data), Err(WireError::Truncated(_))));
    }

    #[test]
    fn test_qdcount_beyond_data_rejected() {
        let mut data = query_packet(1, &["cluster", "example"], 1);
        data[5] = 3;
        assert!(Message::decode(&data).is_err());
    }

    #[test]
    fn test_pointer_loop_rejected() {
        let mut data = query_packet(1, &[], 1);
        data.truncate(DNS_HEADER_SIZE);
        // Name is a pointer to itself
        data.extend_from_slice(&[0xC0, DNS_HEADER_SIZE as u8, 0, 1, 0, 1]);
        assert_eq!(Message::decode(&data), Err(WireError::BadPointer));
    }

    #[test]
    fn test_reserved_label_type_rejected() {
        let mut data = query_packet(1, &[], 1);
        data.truncate(DNS_HEADER_SIZE);
        data.extend_from_slice(&[0x40, 0, 0, 1, 0, 1]);
        assert_eq!(Message::decode(&data), Err(WireError::BadLabelType(0x40)));
    }

    #[test]
    fn test_name_too_long_rejected() {
        let label = "a".repeat(63);
        let labels = [label.as_str(); 5];
        let data = query_packet(1, &labels, 1);
        assert_eq!(Message::decode(&data), Err(WireError::NameTooLong));
    }

    #[test]
    fn test_non_utf8_label_rejected() {
        let mut data = query_packet(1, &[], 1);
        data.truncate(DNS_HEADER_SIZE);
        data.extend_from_slice(&[2, 0xFF, 0xFE, 0, 0, 1, 0, 1]);
        assert_eq!(Message::decode(&data), Err(WireError::InvalidLabel));
    }

    #[test]
    fn test_label_too_long_on_encode() {
        let name = format!("{}.example", "a".repeat(64));
        let query = Message::query(1, Question::new(name, RecordType::A, RecordClass::IN));
        assert_eq!(query.encode(), Err(WireError::LabelTooLong));
    }

    #[test]
    fn test_response_roundtrip() {
        let domain = "cluster.example";
        let response = Message::build(
            0xBEEF,
            OpCode::Query,
            ResponseCode::NoError,
            Flags::authoritative_response(),
            vec![Question::new(domain, RecordType::A, RecordClass::IN)],
            vec![
                address_record(domain, 30, Ipv4Addr::new(10, 0, 0, 1)),
                address_record(domain, 30, Ipv4Addr::new(10, 0, 0, 2)),
                nameserver_record(domain, 30, Ipv4Addr::new(10, 0, 0, 1)),
                text_record(domain, 30, "LEADER 10.0.0.1:14000"),
                service_record(
                    "_cluster._tcp.cluster.example",
                    30,
                    14000,
                    "10.0.0.1.ipaddr.cluster.example",
                ),
                authority_record(domain, 30, domain, 2024060101),
            ],
            Vec::new(),
            Vec::new(),
        );

        let bytes = response.encode().unwrap();
        let decoded = Message::decode(&bytes).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_owner_names_are_compressed() {
        let domain = "cluster.example";
        let response = Message::build(
            1,
            OpCode::Query,
            ResponseCode::NoError,
            Flags::authoritative_response(),
            vec![Question::new(domain, RecordType::A, RecordClass::IN)],
            vec![address_record(domain, 30, Ipv4Addr::new(10, 0, 0, 1))],
            Vec::new(),
            Vec::new(),
        );

        let bytes = response.encode().unwrap();
        let answer_start = DNS_HEADER_SIZE + "cluster.example".len() + 2 + 4;
        assert_eq!(bytes[answer_start..answer_start + 2], [0xC0, DNS_HEADER_SIZE as u8]);
    }

    #[test]
    fn test_long_txt_split_into_strings() {
        let text = "x".repeat(600);
        let response = Message::build(
            1,
            OpCode::Query,
            ResponseCode::NoError,
            Flags::authoritative_response(),
            vec![Question::new("cluster.example", RecordType::TXT, RecordClass::IN)],
            vec![text_record("cluster.example", 30, text.clone())],
            Vec::new(),
            Vec::new(),
        );

        let bytes = response.encode().unwrap();
        let decoded = Message::decode(&bytes).unwrap();
        assert_eq!(decoded.answers[0].data, RecordData::TXT(text));
    }

    #[test]
    fn test_edns_payload_size() {
        let mut data = query_packet(9, &["cluster", "example"], 1);
        data[11] = 1; // arcount
        // OPT: root name, type 41, class 4096, ttl 0, rdlength 0
        data.extend_from_slice(&[0, 0, 41, 0x10, 0x00, 0, 0, 0, 0, 0, 0]);

        let message = Message::decode(&data).unwrap();
        assert_eq!(message.edns_payload_size(), Some(4096));
        assert_eq!(message.max_response_size(), 4096);

        let plain = Message::decode(&query_packet(9, &["cluster", "example"], 1)).unwrap();
        assert_eq!(plain.max_response_size(), DNS_MAX_PACKET_SIZE);
    }

    #[test]
    fn test_oversized_response_truncated() {
        let domain = "cluster.example";
        let answers = (0..60)
            .map(|i| address_record(domain, 30, Ipv4Addr::new(10, 0, 0, i)))
            .collect();
        let response = Message::build(
            1,
            OpCode::Query,
            ResponseCode::NoError,
            Flags::authoritative_response(),
            vec![Question::new(domain, RecordType::A, RecordClass::IN)],
            answers,
            Vec::new(),
            Vec::new(),
        );

        let (bytes, truncated) = response.encode_with_limit(DNS_MAX_PACKET_SIZE).unwrap();
        assert!(truncated);
        let decoded = Message::decode(&bytes).unwrap();
        assert!(decoded.flags.tc);
        assert!(decoded.answers.is_empty());
        assert_eq!(decoded.questions, response.questions);

        let (_, truncated) = response.encode_with_limit(4096).unwrap();
        assert!(!truncated);
    }

    #[test]
    fn test_truncated_response_keeps_opt() {
        let domain = "cluster.example";
        let answers = (0..60)
            .map(|i| address_record(domain, 30, Ipv4Addr::new(10, 0, 0, i)))
            .collect();
        let response = Message::build(
            1,
            OpCode::Query,
            ResponseCode::NoError,
            Flags::authoritative_response(),
            vec![Question::new(domain, RecordType::A, RecordClass::IN)],
            answers,
            Vec::new(),
            vec![edns_opt_record(512)],
        );

        let (bytes, truncated) = response.encode_with_limit(DNS_MAX_PACKET_SIZE).unwrap();
        assert!(truncated);
        let decoded = Message::decode(&bytes).unwrap();
        assert!(decoded.flags.tc);
        assert_eq!(decoded.additionals.len(), 1);
        assert_eq!(decoded.edns_payload_size(), Some(512));
    }

    #[test]
    fn test_compression_preserves_case() {
        let response = Message::build(
            1,
            OpCode::Query,
            ResponseCode::NoError,
            Flags::authoritative_response(),
            vec![Question::new("CLUSTER.EXAMPLE.ORG", RecordType::SOA, RecordClass::IN)],
            vec![authority_record(
                "CLUSTER.EXAMPLE.ORG",
                30,
                "cluster.example.org",
                2024060101,
            )],
            Vec::new(),
            Vec::new(),
        );

        let decoded = Message::decode(&response.encode().unwrap()).unwrap();
        assert_eq!(decoded.answers[0].name, "CLUSTER.EXAMPLE.ORG");
        let RecordData::SOA(soa) = &decoded.answers[0].data else {
            panic!("expected SOA, got {:?}", decoded.answers[0].data);
        };
        assert_eq!(soa.mname, "cluster.example.org");
        assert_eq!(soa.rname, "dns-admin.cluster.example.org");
    }
}
