//! The compiled-in root KSK-2017 (key tag 20326) anchor, ported from the
//! teacher's `TrustAnchorStore::root_ksk_20326`: same base64 blob, same
//! `base64::engine::general_purpose::STANDARD` decoding idiom, stored here
//! as a DNSKEY `RRSet` under the root name instead of a bespoke
//! `DnskeyRecord` struct, since that is the shape `TrustAnchorPort` traffics
//! in.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use tern_dns_domain::{Name, RRSet, RecordType};

const ROOT_KSK_2017_PUBLIC_KEY_B64: &str = concat!(
    "AwEAAaz/tAm8yTn4Mfeh5eyI96WSVexTBAvkMgJzkKTOiW1vkIbzxeF3",
    "+/4RgWOq7HrxRixHlFlExOLAJr5emLvN7SWXgnLh4+B5xQlNVz8Og8kv",
    "ArMtNROxVQuCaSnIDdD5LKyWbRd2n9WGe2R8PzgCmr3EgVLrjyBxWezF",
    "0jLHwVN8efS3rCj/EWgvIWgb9tarpVUDK/b58Da+sqqls3eNbuv7pr+e",
    "oZG+SrDK6nWeL3c6H5Apxz7LjVc1uTIdsIXxuOLYA4/ilBmSVIzuDWfd",
    "RUfhHdY6+cn8HFRm+2hM8AnXGXws9555KrUB5qihylGa8subX2Nn6UwN",
    "R1AkUTV74bU=",
);

/// Flags(257)/protocol(3)/algorithm(8) header octets ahead of the decoded
/// public key, matching the DNSKEY RDATA wire layout (RFC 4034 §2.1).
pub fn root_ksk_2017() -> (Name, RRSet) {
    let public_key = STANDARD
        .decode(ROOT_KSK_2017_PUBLIC_KEY_B64)
        .expect("root KSK-2017 public key is a fixed, valid base64 literal");

    let mut rdata = Vec::with_capacity(4 + public_key.len());
    rdata.extend_from_slice(&257u16.to_be_bytes());
    rdata.push(3);
    rdata.push(8);
    rdata.extend_from_slice(&public_key);

    let root = Name::root();
    let rrset = RRSet::new(root.clone(), RecordType::DNSKEY, u32::MAX, vec![bytes::Bytes::from(rdata)]);
    (root, rrset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_ksk_decodes_with_the_dnskey_header_prefix() {
        let (name, rrset) = root_ksk_2017();
        assert!(name.is_root());
        assert_eq!(rrset.rdata.len(), 1);
        let rdata = &rrset.rdata[0];
        assert!(rdata.len() > 4);
        assert_eq!(&rdata[0..2], &257u16.to_be_bytes());
        assert_eq!(rdata[2], 3);
        assert_eq!(rdata[3], 8);
    }
}
