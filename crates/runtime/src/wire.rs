//! Wire (de)serialization glue around `hickory-proto`: building iterative
//! query packets, reading referrals/answers back out of a response, and the
//! EDNS(0) sizing policy from §6.
//!
//! This module owns every direct dependency on `hickory_proto::op`/`rr` so
//! the rest of the crate deals in `tern_dns_domain` types.

use std::net::IpAddr;
use std::str::FromStr;

use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query as HQuery, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA, CNAME, NS};
use hickory_proto::rr::{Name as HName, RData, Record, RecordType as HRecordType};
use tern_dns_domain::{CaseSecret, Name, RRSet, RecordType, ResolverError};

/// Default outgoing EDNS buffer when nothing more specific is configured
/// (§6: "outgoing buffer = max(configured EDNS payload, 4096)").
pub const DEFAULT_EDNS_PAYLOAD: u16 = 4096;
/// Floor for the answer size sent back to the client (§6: "answer size =
/// max(advertised payload, 512)").
pub const MIN_UDP_PAYLOAD: u16 = 512;

pub fn to_hickory_name(name: &Name) -> Result<HName, ResolverError> {
    if name.is_root() {
        return Ok(HName::root());
    }
    HName::from_str(name.as_str()).map_err(|_| ResolverError::Ilseq)
}

pub fn from_hickory_name(name: &HName) -> Result<Name, ResolverError> {
    Name::parse(&name.to_utf8()).map_err(|_| ResolverError::Ilseq)
}

pub fn to_hickory_type(rt: RecordType) -> HRecordType {
    HRecordType::from(rt.to_u16())
}

pub fn from_hickory_type(rt: HRecordType) -> Option<RecordType> {
    RecordType::from_u16(u16::from(rt))
}

/// Build an iterative query packet (§4.4: "write an iterative query packet
/// into `out_packet`"). Recursion Desired is never set — this resolver asks
/// authoritative servers, it does not ask another recursive resolver to do
/// the work. The name is 0x20-randomized with `case_secret` per §3/§9.
pub fn build_query_packet(
    id: u16,
    name: &Name,
    rrtype: RecordType,
    case_secret: CaseSecret,
    edns_payload: u16,
    tcp: bool,
) -> Result<Vec<u8>, ResolverError> {
    let randomized = case_secret.randomize_case(name);
    let hname = if name.is_root() {
        HName::root()
    } else {
        HName::from_str(&randomized).map_err(|_| ResolverError::Ilseq)?
    };

    let mut message = Message::new();
    message.set_id(id);
    message.set_message_type(MessageType::Query);
    message.set_op_code(OpCode::Query);
    message.set_recursion_desired(false);
    message.add_query(HQuery::query(hname, to_hickory_type(rrtype)));

    if !tcp {
        let mut edns = Edns::new();
        edns.set_max_payload(edns_payload.max(MIN_UDP_PAYLOAD));
        message.set_edns(edns);
    }

    message.to_vec().map_err(|_| ResolverError::Proto)
}

pub fn parse_message(bytes: &[u8]) -> Result<Message, ResolverError> {
    Message::from_vec(bytes).map_err(|_| ResolverError::Proto)
}

/// True when a UDP response is truncated and must be retried over TCP
/// (§4.4 TCP fallback).
pub fn is_truncated(message: &Message) -> bool {
    message.header().truncated()
}

pub fn is_authoritative(message: &Message) -> bool {
    message.header().authoritative()
}

pub fn response_code(message: &Message) -> ResponseCode {
    message.response_code()
}

/// Extract every address rdata of the requested type for `owner` from a
/// message's answer (or additional, for glue) section.
pub fn addresses_for(message: &Message, owner: &HName, v6: bool) -> Vec<IpAddr> {
    message
        .answers()
        .iter()
        .chain(message.additionals())
        .filter(|r| r.name() == owner)
        .filter_map(|r| match r.data() {
            Some(RData::A(A(addr))) if !v6 => Some(IpAddr::V4(*addr)),
            Some(RData::AAAA(AAAA(addr))) if v6 => Some(IpAddr::V6(*addr)),
            _ => None,
        })
        .collect()
}

/// NS owner/rdata pairs out of the authority section — the referral this
/// resolver re-anchors the zone cut onto (§4.3 iterator layer).
pub fn referral_nameservers(message: &Message) -> Vec<(Name, Name)> {
    message
        .name_servers()
        .iter()
        .filter_map(|r| match r.data() {
            Some(RData::NS(NS(ns_name))) => {
                let owner = from_hickory_name(r.name()).ok()?;
                let ns = from_hickory_name(ns_name).ok()?;
                Some((owner, ns))
            }
            _ => None,
        })
        .collect()
}

/// TSIG on the inbound query is preserved on the outbound answer but never
/// propagated to sub-queries (§6): this resolver doesn't validate or
/// re-sign it, it just carries the raw record through, the way a
/// passthrough proxy would.
pub fn inbound_tsig(query: &Message) -> Option<Record> {
    query
        .additionals()
        .iter()
        .find(|r| r.record_type() == HRecordType::TSIG)
        .cloned()
}

pub fn append_tsig(message: &mut Message, tsig: Record) {
    message.add_additional(tsig);
}

/// Negative-caching TTL for an NXDOMAIN/NODATA response (RFC 2308): the
/// minimum of the SOA's own TTL and the minimum field of its rdata, off
/// whichever SOA record appears in the authority section. Falls back to
/// `DEFAULT_NEGATIVE_TTL` when no SOA is present, which the source's own
/// distillation leaves unspecified.
pub const DEFAULT_NEGATIVE_TTL: u32 = 60;

pub fn negative_ttl(message: &Message) -> u32 {
    message
        .name_servers()
        .iter()
        .find_map(|r| match r.data() {
            Some(RData::SOA(soa)) => Some(r.ttl().min(soa.minimum())),
            _ => None,
        })
        .unwrap_or(DEFAULT_NEGATIVE_TTL)
}

/// CNAME target, if the answer section redirects the sought name.
pub fn cname_target(message: &Message, owner: &HName) -> Option<Name> {
    message.answers().iter().find(|r| r.name() == owner).and_then(|r| match r.data() {
        Some(RData::CNAME(CNAME(target))) => from_hickory_name(target).ok(),
        _ => None,
    })
}

/// Positive answer RRset for `(owner, rrtype)`, if the message's answer
/// section contains one.
pub fn answer_rrset(message: &Message, owner: &HName, rrtype: RecordType) -> Option<RRSet> {
    let hrt = to_hickory_type(rrtype);
    let records: Vec<&Record> = message
        .answers()
        .iter()
        .filter(|r| r.name() == owner && r.record_type() == hrt)
        .collect();
    if records.is_empty() {
        return None;
    }
    let ttl = records.iter().map(|r| r.ttl()).max().unwrap_or(0);
    let owner_name = from_hickory_name(owner).ok()?;
    let rdata = records
        .iter()
        .filter_map(|r| r.data().map(encode_rdata))
        .collect();
    Some(RRSet::new(owner_name, rrtype, ttl, rdata))
}

/// Inverse of the A/AAAA branch of `encode_rdata`: used to turn glue/
/// address rdata harvested from an `AWAIT_ADDR` sub-query back into an
/// `IpAddr` on the parent's nameserver candidate (§4.4).
pub fn decode_ip_rdata(rrtype: RecordType, raw: &bytes::Bytes) -> Option<IpAddr> {
    match (rrtype, raw.len()) {
        (RecordType::A, 4) => Some(IpAddr::V4(std::net::Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3]))),
        (RecordType::AAAA, 16) => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(raw);
            Some(IpAddr::V6(std::net::Ipv6Addr::from(octets)))
        }
        _ => None,
    }
}

fn encode_rdata(data: &RData) -> bytes::Bytes {
    // Best-effort opaque capture: the cache only ever needs to replay these
    // bytes back into a response message, never to reinterpret them, so a
    // debug-format fallback is acceptable for the handful of less common
    // rdata variants that don't already have a cheap fixed-width encoding.
    // NS/CNAME reuse the same name-as-UTF8-bytes convention the cache layer
    // already uses for referral NS storage, so a direct NS/CNAME query (not
    // just a referral or CNAME chase) round-trips back out of the cache too.
    match data {
        RData::A(A(addr)) => bytes::Bytes::copy_from_slice(&addr.octets()),
        RData::AAAA(AAAA(addr)) => bytes::Bytes::copy_from_slice(&addr.octets()),
        RData::NS(NS(name)) => bytes::Bytes::from(name.to_utf8().into_bytes()),
        RData::CNAME(CNAME(name)) => bytes::Bytes::from(name.to_utf8().into_bytes()),
        other => bytes::Bytes::from(format!("{other:?}").into_bytes()),
    }
}

/// Build the final client-facing answer message from the resolved RRSet
/// (or negative/CNAME result), applying the terminate policy from §4.4:
/// `QR` set, `AA` cleared, `RA` set, `SERVFAIL` only when the internal
/// result was a fatal failure and the RCODE is still `NOERROR`.
pub fn build_answer(
    query_id: u16,
    question: &HQuery,
    rcode: ResponseCode,
    answers: Vec<Record>,
) -> Message {
    let mut message = Message::new();
    message.set_id(query_id);
    message.set_message_type(MessageType::Response);
    message.set_op_code(OpCode::Query);
    message.add_query(question.clone());
    message.set_authoritative(false);
    message.set_recursion_available(true);
    message.set_response_code(rcode);
    for answer in answers {
        message.add_answer(answer);
    }
    message
}

pub fn record_from_rrset(rrset: &RRSet) -> Result<Vec<Record>, ResolverError> {
    let owner = to_hickory_name(&rrset.owner)?;
    let hrt = to_hickory_type(rrset.rrtype);
    rrset
        .rdata
        .iter()
        .map(|raw| decode_record(&owner, hrt, rrset.ttl, raw))
        .collect()
}

fn decode_record(
    owner: &HName,
    hrt: HRecordType,
    ttl: u32,
    raw: &bytes::Bytes,
) -> Result<Record, ResolverError> {
    let rdata = match hrt {
        HRecordType::A if raw.len() == 4 => {
            RData::A(A(std::net::Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3])))
        }
        HRecordType::AAAA if raw.len() == 16 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(raw);
            RData::AAAA(AAAA(std::net::Ipv6Addr::from(octets)))
        }
        HRecordType::NS | HRecordType::CNAME if !raw.is_empty() => {
            let text = std::str::from_utf8(raw).map_err(|_| ResolverError::Ilseq)?;
            let name = HName::from_str(text).map_err(|_| ResolverError::Ilseq)?;
            if hrt == HRecordType::NS {
                RData::NS(NS(name))
            } else {
                RData::CNAME(CNAME(name))
            }
        }
        _ => return Err(ResolverError::Ilseq),
    };
    Ok(Record::from_rdata(owner.clone(), ttl, rdata))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_query_packet_round_trips_through_parse() {
        let name = Name::parse("example.com").unwrap();
        let packet = build_query_packet(42, &name, RecordType::A, CaseSecret(1), 4096, false).unwrap();
        let parsed = parse_message(&packet).unwrap();
        assert_eq!(parsed.id(), 42);
        assert_eq!(parsed.queries().len(), 1);
    }

    #[test]
    fn a_query_with_no_tsig_yields_none() {
        let name = Name::parse("example.com").unwrap();
        let packet = build_query_packet(7, &name, RecordType::A, CaseSecret(1), 4096, false).unwrap();
        let parsed = parse_message(&packet).unwrap();
        assert!(inbound_tsig(&parsed).is_none());
    }

    #[test]
    fn answer_rrset_extracts_a_records_by_owner_and_type() {
        let owner = HName::from_str("example.com.").unwrap();
        let mut message = Message::new();
        message.add_answer(Record::from_rdata(
            owner.clone(),
            300,
            RData::A(A(std::net::Ipv4Addr::new(10, 0, 0, 1))),
        ));
        let rrset = answer_rrset(&message, &owner, RecordType::A).unwrap();
        assert_eq!(rrset.ttl, 300);
        assert_eq!(rrset.rdata.len(), 1);
    }

    #[test]
    fn cname_rrset_round_trips_through_encode_and_decode() {
        let owner = HName::from_str("www.example.com.").unwrap();
        let target = HName::from_str("edge.example.net.").unwrap();
        let mut message = Message::new();
        message.add_answer(Record::from_rdata(owner.clone(), 60, RData::CNAME(CNAME(target.clone()))));

        let rrset = answer_rrset(&message, &owner, RecordType::CNAME).unwrap();
        let records = record_from_rrset(&rrset).unwrap();
        assert_eq!(records.len(), 1);
        match records[0].data() {
            Some(RData::CNAME(CNAME(name))) => assert_eq!(*name, target),
            other => panic!("expected a CNAME record, got {other:?}"),
        }
    }

    #[test]
    fn ns_rrset_round_trips_through_encode_and_decode() {
        let owner = HName::from_str("example.com.").unwrap();
        let ns_name = HName::from_str("ns1.example.com.").unwrap();
        let mut message = Message::new();
        message.add_answer(Record::from_rdata(owner.clone(), 3600, RData::NS(NS(ns_name.clone()))));

        let rrset = answer_rrset(&message, &owner, RecordType::NS).unwrap();
        let records = record_from_rrset(&rrset).unwrap();
        assert_eq!(records.len(), 1);
        match records[0].data() {
            Some(RData::NS(NS(name))) => assert_eq!(*name, ns_name),
            other => panic!("expected an NS record, got {other:?}"),
        }
    }
}
