use super::encrypted_data::EncryptedData;
use super::principal_name::PrincipalName;
use super::realm::Realm;
use crate::error::KrbError;
use der::{Decode, DecodeValue, Encode, EncodeValue, FixedTag, Sequence, Tag, TagNumber};

/// ```text
/// Ticket          ::= [APPLICATION 1] SEQUENCE {
///         tkt-vno         [0] INTEGER (5),
///         realm           [1] Realm,
///         sname           [2] PrincipalName,
///         enc-part        [3] EncryptedData -- EncTicketPart
/// }
/// ````
#[derive(Debug, Clone, Eq, PartialEq, Sequence)]
pub(crate) struct Ticket {
    #[asn1(context_specific = "0")]
    pub(crate) tkt_vno: u8,
    #[asn1(context_specific = "1")]
    pub(crate) realm: Realm,
    #[asn1(context_specific = "2")]
    pub(crate) sname: PrincipalName,
    #[asn1(context_specific = "3")]
    pub(crate) enc_part: EncryptedData,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct TaggedTicket(pub(crate) Ticket);

impl FixedTag for TaggedTicket {
    const TAG: Tag = Tag::Application {
        constructed: true,
        number: TagNumber(1),
    };
}

impl<'a> DecodeValue<'a> for TaggedTicket {
    type Error = der::Error;

    fn decode_value<R: der::Reader<'a>>(reader: &mut R, _header: der::Header) -> der::Result<Self> {
        let t: Ticket = Ticket::decode(reader)?;
        Ok(Self(t))
    }
}

impl EncodeValue for TaggedTicket {
    fn value_len(&self) -> der::Result<der::Length> {
        self.0.encoded_len()
    }
    fn encode_value(&self, encoder: &mut impl der::Writer) -> der::Result<()> {
        self.0.encode(encoder)
    }
}

impl From<TaggedTicket> for Ticket {
    fn from(value: TaggedTicket) -> Self {
        value.0
    }
}

/// Emit DER length octets for `len`.
fn der_length_octets(len: usize) -> Vec<u8> {
    if len < 0x80 {
        vec![len as u8]
    } else {
        let be = len.to_be_bytes();
        let lead = be.iter().take_while(|b| **b == 0).count();
        let mut out = Vec::with_capacity(1 + be.len() - lead);
        out.push(0x80 | (be.len() - lead) as u8);
        out.extend_from_slice(&be[lead..]);
        out
    }
}

/// Measure the header (identifier + length octets) and content length of the
/// TLV starting at `b[0]`.
fn der_header(b: &[u8]) -> Result<(usize, usize), KrbError> {
    let first_len_octet = *b.get(1).ok_or(KrbError::TicketSequenceInvalid)?;
    if first_len_octet < 0x80 {
        return Ok((2, first_len_octet as usize));
    }
    let len_octets = (first_len_octet & 0x7f) as usize;
    if len_octets == 0 || len_octets > std::mem::size_of::<usize>() {
        return Err(KrbError::TicketSequenceInvalid);
    }
    let octets = b
        .get(2..2 + len_octets)
        .ok_or(KrbError::TicketSequenceInvalid)?;
    let mut content = 0usize;
    for octet in octets {
        content = content << 8 | *octet as usize;
    }
    Ok((2 + len_octets, content))
}

/// Encode a sequence of tickets: a constructed SEQUENCE header followed by
/// the concatenation of the application-tagged ticket encodings.
pub(crate) fn marshal_ticket_sequence(tkts: &[TaggedTicket]) -> Result<Vec<u8>, KrbError> {
    if tkts.is_empty() {
        return Ok(Vec::new());
    }
    let mut body = Vec::new();
    for tkt in tkts {
        let b = tkt.to_der().map_err(|_| KrbError::DerEncodeTicket)?;
        body.extend_from_slice(&b);
    }
    let mut out = vec![0x30];
    out.extend_from_slice(&der_length_octets(body.len()));
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decode a sequence of tickets without going through a generic
/// SEQUENCE OF decode: skip the outer identifier and length octets, then
/// repeatedly pull one application-tagged ticket by its own length until the
/// buffer is exhausted. Application-class elements nested in an implicitly
/// tagged sequence trip up generic decoders, so the walk stays manual.
pub(crate) fn unmarshal_ticket_sequence(b: &[u8]) -> Result<Vec<TaggedTicket>, KrbError> {
    if b.is_empty() {
        return Ok(Vec::new());
    }
    let (outer_header, outer_content) = der_header(b)?;
    if outer_header + outer_content != b.len() {
        return Err(KrbError::TicketSequenceInvalid);
    }

    let mut tkts = Vec::new();
    let mut p = outer_header;
    while p < b.len() {
        if b[p] != 0x61 {
            // Application class, constructed, tag number 1.
            return Err(KrbError::TicketSequenceInvalid);
        }
        let (header, content) = der_header(&b[p..])?;
        let end = p
            .checked_add(header + content)
            .filter(|end| *end <= b.len())
            .ok_or(KrbError::TicketSequenceInvalid)?;
        let tkt = TaggedTicket::from_der(&b[p..end]).map_err(|_| KrbError::DerDecodeTicket)?;
        tkts.push(tkt);
        p = end;
    }
    Ok(tkts)
}
