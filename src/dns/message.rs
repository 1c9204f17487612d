//! DNS message model
//!
//! Structured form of queries and responses. Wire conversion lives in
//! [`super::wire`]; the `Display` impl renders the line-oriented text form
//! used in debug logs.

use std::fmt;

use super::record::Record;

/// Resource record types this responder knows by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    NS,
    SOA,
    TXT,
    AAAA,
    SRV,
    /// EDNS(0) pseudo-record
    OPT,
    Other(u16),
}

impl RecordType {
    pub fn to_u16(self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::NS => 2,
            RecordType::SOA => 6,
            RecordType::TXT => 16,
            RecordType::AAAA => 28,
            RecordType::SRV => 33,
            RecordType::OPT => 41,
            RecordType::Other(value) => value,
        }
    }
}

impl From<u16> for RecordType {
    fn from(value: u16) -> Self {
        match value {
            1 => RecordType::A,
            2 => RecordType::NS,
            6 => RecordType::SOA,
            16 => RecordType::TXT,
            28 => RecordType::AAAA,
            33 => RecordType::SRV,
            41 => RecordType::OPT,
            other => RecordType::Other(other),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => f.write_str("A"),
            RecordType::NS => f.write_str("NS"),
            RecordType::SOA => f.write_str("SOA"),
            RecordType::TXT => f.write_str("TXT"),
            RecordType::AAAA => f.write_str("AAAA"),
            RecordType::SRV => f.write_str("SRV"),
            RecordType::OPT => f.write_str("OPT"),
            RecordType::Other(value) => write!(f, "TYPE{}", value),
        }
    }
}

/// Record class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordClass {
    IN,
    Other(u16),
}

impl RecordClass {
    pub fn to_u16(self) -> u16 {
        match self {
            RecordClass::IN => 1,
            RecordClass::Other(value) => value,
        }
    }
}

impl From<u16> for RecordClass {
    fn from(value: u16) -> Self {
        match value {
            1 => RecordClass::IN,
            other => RecordClass::Other(other),
        }
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordClass::IN => f.write_str("IN"),
            RecordClass::Other(value) => write!(f, "CLASS{}", value),
        }
    }
}

/// Header operation code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Query,
    IQuery,
    Status,
    Other(u8),
}

impl OpCode {
    pub fn to_u8(self) -> u8 {
        match self {
            OpCode::Query => 0,
            OpCode::IQuery => 1,
            OpCode::Status => 2,
            OpCode::Other(value) => value & 0x0F,
        }
    }
}

impl From<u8> for OpCode {
    fn from(value: u8) -> Self {
        match value & 0x0F {
            0 => OpCode::Query,
            1 => OpCode::IQuery,
            2 => OpCode::Status,
            other => OpCode::Other(other),
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpCode::Query => f.write_str("QUERY"),
            OpCode::IQuery => f.write_str("IQUERY"),
            OpCode::Status => f.write_str("STATUS"),
            OpCode::Other(value) => write!(f, "{}", value),
        }
    }
}

/// Header result code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    NoError,
    FormErr,
    ServFail,
    NXDomain,
    NotImp,
    Refused,
    Other(u8),
}

impl ResponseCode {
    pub fn to_u8(self) -> u8 {
        match self {
            ResponseCode::NoError => 0,
            ResponseCode::FormErr => 1,
            ResponseCode::ServFail => 2,
            ResponseCode::NXDomain => 3,
            ResponseCode::NotImp => 4,
            ResponseCode::Refused => 5,
            ResponseCode::Other(value) => value & 0x0F,
        }
    }
}

impl From<u8> for ResponseCode {
    fn from(value: u8) -> Self {
        match value & 0x0F {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormErr,
            2 => ResponseCode::ServFail,
            3 => ResponseCode::NXDomain,
            4 => ResponseCode::NotImp,
            5 => ResponseCode::Refused,
            other => ResponseCode::Other(other),
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseCode::NoError => f.write_str("NOERROR"),
            ResponseCode::FormErr => f.write_str("FORMERR"),
            ResponseCode::ServFail => f.write_str("SERVFAIL"),
            ResponseCode::NXDomain => f.write_str("NXDOMAIN"),
            ResponseCode::NotImp => f.write_str("NOTIMP"),
            ResponseCode::Refused => f.write_str("REFUSED"),
            ResponseCode::Other(value) => write!(f, "RCODE{}", value),
        }
    }
}

/// Single-bit header flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    /// Query/Response
    pub qr: bool,
    /// Authoritative Answer
    pub aa: bool,
    /// Truncated
    pub tc: bool,
    /// Recursion Desired
    pub rd: bool,
    /// Recursion Available
    pub ra: bool,
}

const FLAG_QR: u16 = 0x8000;
const FLAG_AA: u16 = 0x0400;
const FLAG_TC: u16 = 0x0200;
const FLAG_RD: u16 = 0x0100;
const FLAG_RA: u16 = 0x0080;

impl Flags {
    /// `QR AA`
    pub fn authoritative_response() -> Self {
        Self {
            qr: true,
            aa: true,
            ..Default::default()
        }
    }

    /// `QR`
    pub fn response() -> Self {
        Self {
            qr: true,
            ..Default::default()
        }
    }

    /// Pack flags, opcode and rcode into the second header word
    pub fn to_header_bits(self, opcode: OpCode, rcode: ResponseCode) -> u16 {
        let mut bits = ((opcode.to_u8() as u16) << 11) | rcode.to_u8() as u16;
        if self.qr {
            bits |= FLAG_QR;
        }
        if self.aa {
            bits |= FLAG_AA;
        }
        if self.tc {
            bits |= FLAG_TC;
        }
        if self.rd {
            bits |= FLAG_RD;
        }
        if self.ra {
            bits |= FLAG_RA;
        }
        bits
    }

    /// Unpack the second header word
    pub fn from_header_bits(bits: u16) -> (Self, OpCode, ResponseCode) {
        let flags = Self {
            qr: bits & FLAG_QR != 0,
            aa: bits & FLAG_AA != 0,
            tc: bits & FLAG_TC != 0,
            rd: bits & FLAG_RD != 0,
            ra: bits & FLAG_RA != 0,
        };
        let opcode = OpCode::from(((bits >> 11) & 0x0F) as u8);
        let rcode = ResponseCode::from((bits & 0x0F) as u8);
        (flags, opcode, rcode)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (self.qr, "QR"),
            (self.aa, "AA"),
            (self.tc, "TC"),
            (self.rd, "RD"),
            (self.ra, "RA"),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, name)| *name)
        .collect();
        f.write_str(&names.join(" "))
    }
}

/// One question from the question section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Queried name, without the trailing root dot, case as received
    pub name: String,
    pub qtype: RecordType,
    pub qclass: RecordClass,
}

impl Question {
    pub fn new(name: impl Into<String>, qtype: RecordType, qclass: RecordClass) -> Self {
        Self {
            name: name.into(),
            qtype,
            qclass,
        }
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {} {}", self.name, self.qclass, self.qtype)
    }
}

/// A DNS message, query or response
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: u16,
    pub opcode: OpCode,
    pub rcode: ResponseCode,
    pub flags: Flags,
    pub questions: Vec<Question>,
    pub answers: Vec<Record>,
    pub authorities: Vec<Record>,
    pub additionals: Vec<Record>,
}

impl Message {
    /// Assemble a message from its parts
    ///
    /// Pure structural assembly; record contents are not validated.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        id: u16,
        opcode: OpCode,
        rcode: ResponseCode,
        flags: Flags,
        questions: Vec<Question>,
        answers: Vec<Record>,
        authorities: Vec<Record>,
        additionals: Vec<Record>,
    ) -> Self {
        Self {
            id,
            opcode,
            rcode,
            flags,
            questions,
            answers,
            authorities,
            additionals,
        }
    }

    /// Build a plain query with a single question
    pub fn query(id: u16, question: Question) -> Self {
        Self::build(
            id,
            OpCode::Query,
            ResponseCode::NoError,
            Flags {
                rd: true,
                ..Default::default()
            },
            vec![question],
            Vec::new(),
            Vec::new(),
            Vec::new(),
        )
    }

    pub fn is_response(&self) -> bool {
        self.flags.qr
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "id {}", self.id)?;
        writeln!(f, "opcode {}", self.opcode)?;
        writeln!(f, "rcode {}", self.rcode)?;
        writeln!(f, "flags {}", self.flags)?;
        writeln!(f, ";QUESTION")?;
        for question in &self.questions {
            writeln!(f, "{}", question)?;
        }

        // Empty sections are left out entirely
        for (title, records) in [
            (";ANSWER", &self.answers),
            (";AUTHORITY", &self.authorities),
            (";ADDITIONAL", &self.additionals),
        ] {
            if records.is_empty() {
                continue;
            }
            writeln!(f, "{}", title)?;
            for record in records {
                writeln!(f, "{}", record)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::record::{Record, RecordData};
    use std::net::Ipv4Addr;

    #[test]
    fn test_record_type_codes() {
        assert_eq!(RecordType::from(33), RecordType::SRV);
        assert_eq!(RecordType::SRV.to_u16(), 33);
        assert_eq!(RecordType::from(99), RecordType::Other(99));
        assert_eq!(RecordType::Other(99).to_string(), "TYPE99");
    }

    #[test]
    fn test_header_bits() {
        let bits = Flags::authoritative_response()
            .to_header_bits(OpCode::Query, ResponseCode::NoError);
        assert_eq!(bits, 0x8400);

        let (flags, opcode, rcode) = Flags::from_header_bits(0x8183);
        assert!(flags.qr && flags.rd && flags.ra);
        assert!(!flags.aa);
        assert_eq!(opcode, OpCode::Query);
        assert_eq!(rcode, ResponseCode::NXDomain);
    }

    #[test]
    fn test_text_rendering_omits_empty_sections() {
        let question = Question::new("example.com", RecordType::A, RecordClass::IN);
        let answer = Record::new(
            "example.com",
            30,
            RecordData::A(Ipv4Addr::new(10, 0, 0, 1)),
        );
        let message = Message::build(
            7,
            OpCode::Query,
            ResponseCode::NoError,
            Flags::authoritative_response(),
            vec![question],
            vec![answer],
            Vec::new(),
            Vec::new(),
        );

        let text = message.to_string();
        assert_eq!(
            text,
            concat!(
                "id 7\nopcode QUERY\nrcode NOERROR\nflags QR AA\n",
                ";QUESTION\nexample.com. IN A\n",
                ";ANSWER\nexample.com. 30 IN A 10.0.0.1\n",
            )
        );
        assert!(!text.contains(";AUTHORITY"));
        assert!(!text.contains(";ADDITIONAL"));
    }
}
