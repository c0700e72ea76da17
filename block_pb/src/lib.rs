#![doc = include_str!("../README.md")]

use std::marker::PhantomData;

use biometrics::{Collector, Counter};

use varbuf::{pack_helper, stack_pack, Packable, Unpackable, Unpacker};

use wiretk::field_types::{int64, message};
use wiretk::{
    skip, tag, Error, FieldPackHelper, FieldPacker, FieldType, FieldUnpackHelper, Message, Tag,
    WireType,
};

//////////////////////////////////////////// Biometrics ////////////////////////////////////////////

static ENCODE: Counter = Counter::new("block_pb.encode");
static DECODE: Counter = Counter::new("block_pb.decode");
static FIELD_SKIPPED: Counter = Counter::new("block_pb.field_skipped");

/// Register this crate's biometrics.
pub fn register_biometrics(collector: &Collector) {
    collector.register_counter(&ENCODE);
    collector.register_counter(&DECODE);
    collector.register_counter(&FIELD_SKIPPED);
}

///////////////////////////////////////////// Constants ////////////////////////////////////////////

/// The default ceiling [decode] enforces on its input.
pub const MAX_MESSAGE_SIZE: usize = 1 << 20;

////////////////////////////////////////////// helpers /////////////////////////////////////////////

fn field<'a, 'b, T, F>(tag: Tag, f: &'b F) -> FieldPacker<'a, 'b, T, F>
where
    T: FieldType<'a>,
    F: FieldPackHelper<'a, T>,
{
    FieldPacker::new(tag, f, PhantomData)
}

////////////////////////////////////////// opaque records //////////////////////////////////////////

// These records cross this wire format with their schemas defined elsewhere.  We carry their
// encoded bodies verbatim and leave interpretation to the layer that owns them.
macro_rules! opaque_record {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Eq)]
        pub struct $name {
            /// The encoded body of the record, carried verbatim.
            pub body: Vec<u8>,
        }

        impl Packable for $name {
            fn pack_sz(&self) -> usize {
                self.body.len()
            }

            fn pack(&self, out: &mut [u8]) {
                assert_eq!(self.body.len(), out.len());
                out.copy_from_slice(&self.body);
            }
        }

        impl<'a> Unpackable<'a> for $name {
            type Error = Error;

            fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
                let record = $name { body: buf.to_vec() };
                Ok((record, &buf[buf.len()..]))
            }
        }

        impl<'a> Message<'a> for $name {}

        impl<'a> FieldPackHelper<'a, message<$name>> for $name {
            fn field_pack_sz(&self, tag: &Tag) -> usize {
                stack_pack(tag)
                    .pack(stack_pack(self).length_prefixed())
                    .pack_sz()
            }

            fn field_pack(&self, tag: &Tag, out: &mut [u8]) {
                stack_pack(tag)
                    .pack(stack_pack(self).length_prefixed())
                    .into_slice(out);
            }
        }

        impl<'a> FieldUnpackHelper<'a, message<$name>> for $name {
            fn merge_field(&mut self, proto: message<$name>) {
                *self = proto.unwrap_message();
            }
        }
    };
}

opaque_record! {
    /// The hash-and-parts reference that pins one block.
    BlockId
}

opaque_record! {
    /// A complete block:  header, data, evidence, and commit.
    Block
}

opaque_record! {
    /// A typed event emitted while executing a block or transaction.
    Event
}

opaque_record! {
    /// The result of executing one transaction.
    TxResult
}

opaque_record! {
    /// A change to the validator set.
    ValidatorUpdate
}

opaque_record! {
    /// Consensus parameters in force after a block.
    ConsensusParams
}

///////////////////////////////////// height-carrying messages /////////////////////////////////////

macro_rules! height_only_message {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Eq)]
        pub struct $name {
            /// Block height.  Zero is the proto default and is elided on the wire.
            pub height: i64,
        }

        impl Packable for $name {
            fn pack_sz(&self) -> usize {
                let mut sz = 0;
                if self.height != 0 {
                    sz += field::<int64, _>(tag!(1, Varint), &self.height).pack_sz();
                }
                sz
            }

            fn pack(&self, out: &mut [u8]) {
                assert_eq!(self.pack_sz(), out.len());
                let mut out = out;
                if self.height != 0 {
                    out = pack_helper(field::<int64, _>(tag!(1, Varint), &self.height), out);
                }
                let _ = out;
            }
        }

        impl<'a> Unpackable<'a> for $name {
            type Error = Error;

            fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
                let mut ret = $name::default();
                let mut up = Unpacker::new(buf);
                while !up.is_empty() {
                    let tag: Tag = up.unpack()?;
                    if tag.wire_type == WireType::EndGroup {
                        return Err(Error::UnexpectedEndOfGroup);
                    }
                    let f: u32 = tag.field_number.into();
                    match (f, tag.wire_type) {
                        (1, WireType::Varint) => {
                            let x: int64 = up.unpack()?;
                            ret.height.merge_field(x);
                        }
                        (1, _) => {
                            return Err(Error::WireTypeMismatch {
                                field_number: f,
                                wire_type: tag.wire_type.tag_bits(),
                            });
                        }
                        _ => {
                            FIELD_SKIPPED.click();
                            let consumed = skip(tag.wire_type, up.remain())?;
                            up.advance(consumed);
                        }
                    }
                }
                Ok((ret, up.remain()))
            }
        }

        impl<'a> Message<'a> for $name {}
    };
}

height_only_message! {
    /// The height of the newest committed block.
    GetLatestHeightResponse
}

height_only_message! {
    /// Request one block by height.  Height zero selects the latest committed block.
    GetBlockRequest
}

height_only_message! {
    /// Request the execution results of one block by height.  Height zero selects the latest
    /// committed block.
    GetBlockResultsRequest
}

/////////////////////////////////////// GetLatestHeightRequest //////////////////////////////////////

/// Request the height of the newest committed block.  Carries no fields and encodes to nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GetLatestHeightRequest {}

impl Packable for GetLatestHeightRequest {
    fn pack_sz(&self) -> usize {
        0
    }

    fn pack(&self, out: &mut [u8]) {
        assert_eq!(0, out.len());
    }
}

impl<'a> Unpackable<'a> for GetLatestHeightRequest {
    type Error = Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
        let mut up = Unpacker::new(buf);
        while !up.is_empty() {
            let tag: Tag = up.unpack()?;
            if tag.wire_type == WireType::EndGroup {
                return Err(Error::UnexpectedEndOfGroup);
            }
            FIELD_SKIPPED.click();
            let consumed = skip(tag.wire_type, up.remain())?;
            up.advance(consumed);
        }
        Ok((GetLatestHeightRequest {}, up.remain()))
    }
}

impl<'a> Message<'a> for GetLatestHeightRequest {}

///////////////////////////////////////// GetBlockResponse /////////////////////////////////////////

/// One block fetched by height, along with the identifier that pins it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GetBlockResponse {
    /// Height of the returned block.
    pub height: i64,
    /// Identifier of the returned block.
    pub block_id: Option<BlockId>,
    /// The block itself.
    pub block: Option<Block>,
}

impl Packable for GetBlockResponse {
    fn pack_sz(&self) -> usize {
        let mut sz = 0;
        if self.height != 0 {
            sz += field::<int64, _>(tag!(1, Varint), &self.height).pack_sz();
        }
        sz += field::<message<BlockId>, _>(tag!(2, LengthDelimited), &self.block_id).pack_sz();
        sz += field::<message<Block>, _>(tag!(3, LengthDelimited), &self.block).pack_sz();
        sz
    }

    fn pack(&self, out: &mut [u8]) {
        assert_eq!(self.pack_sz(), out.len());
        let mut out = out;
        if self.height != 0 {
            out = pack_helper(field::<int64, _>(tag!(1, Varint), &self.height), out);
        }
        out = pack_helper(
            field::<message<BlockId>, _>(tag!(2, LengthDelimited), &self.block_id),
            out,
        );
        out = pack_helper(
            field::<message<Block>, _>(tag!(3, LengthDelimited), &self.block),
            out,
        );
        let _ = out;
    }
}

impl<'a> Unpackable<'a> for GetBlockResponse {
    type Error = Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
        let mut ret = GetBlockResponse::default();
        let mut up = Unpacker::new(buf);
        while !up.is_empty() {
            let tag: Tag = up.unpack()?;
            if tag.wire_type == WireType::EndGroup {
                return Err(Error::UnexpectedEndOfGroup);
            }
            let f: u32 = tag.field_number.into();
            match (f, tag.wire_type) {
                (1, WireType::Varint) => {
                    let x: int64 = up.unpack()?;
                    ret.height.merge_field(x);
                }
                (2, WireType::LengthDelimited) => {
                    let m: message<BlockId> = up.unpack()?;
                    ret.block_id.merge_field(m);
                }
                (3, WireType::LengthDelimited) => {
                    let m: message<Block> = up.unpack()?;
                    ret.block.merge_field(m);
                }
                (1, _) | (2, _) | (3, _) => {
                    return Err(Error::WireTypeMismatch {
                        field_number: f,
                        wire_type: tag.wire_type.tag_bits(),
                    });
                }
                _ => {
                    FIELD_SKIPPED.click();
                    let consumed = skip(tag.wire_type, up.remain())?;
                    up.advance(consumed);
                }
            }
        }
        Ok((ret, up.remain()))
    }
}

impl<'a> Message<'a> for GetBlockResponse {}

////////////////////////////////////// GetBlockResultsResponse /////////////////////////////////////

/// Everything block execution produced at one height.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GetBlockResultsResponse {
    /// Height of the executed block.
    pub height: i64,
    /// Events emitted before any transaction ran.
    pub begin_block_events: Vec<Event>,
    /// Per-transaction execution results, in block order.
    pub tx_results: Vec<TxResult>,
    /// Changes to the validator set.
    pub validator_updates: Vec<ValidatorUpdate>,
    /// Consensus parameters in force after this block, if they changed.
    pub consensus_param_updates: Option<ConsensusParams>,
    /// Events emitted after the last transaction ran.
    pub end_block_events: Vec<Event>,
}

impl Packable for GetBlockResultsResponse {
    fn pack_sz(&self) -> usize {
        let mut sz = 0;
        if self.height != 0 {
            sz += field::<int64, _>(tag!(1, Varint), &self.height).pack_sz();
        }
        sz += field::<message<Event>, _>(tag!(2, LengthDelimited), &self.begin_block_events)
            .pack_sz();
        sz += field::<message<TxResult>, _>(tag!(3, LengthDelimited), &self.tx_results).pack_sz();
        sz += field::<message<ValidatorUpdate>, _>(tag!(4, LengthDelimited), &self.validator_updates)
            .pack_sz();
        sz += field::<message<ConsensusParams>, _>(
            tag!(5, LengthDelimited),
            &self.consensus_param_updates,
        )
        .pack_sz();
        sz += field::<message<Event>, _>(tag!(6, LengthDelimited), &self.end_block_events).pack_sz();
        sz
    }

    fn pack(&self, out: &mut [u8]) {
        assert_eq!(self.pack_sz(), out.len());
        let mut out = out;
        if self.height != 0 {
            out = pack_helper(field::<int64, _>(tag!(1, Varint), &self.height), out);
        }
        out = pack_helper(
            field::<message<Event>, _>(tag!(2, LengthDelimited), &self.begin_block_events),
            out,
        );
        out = pack_helper(
            field::<message<TxResult>, _>(tag!(3, LengthDelimited), &self.tx_results),
            out,
        );
        out = pack_helper(
            field::<message<ValidatorUpdate>, _>(tag!(4, LengthDelimited), &self.validator_updates),
            out,
        );
        out = pack_helper(
            field::<message<ConsensusParams>, _>(
                tag!(5, LengthDelimited),
                &self.consensus_param_updates,
            ),
            out,
        );
        out = pack_helper(
            field::<message<Event>, _>(tag!(6, LengthDelimited), &self.end_block_events),
            out,
        );
        let _ = out;
    }
}

impl<'a> Unpackable<'a> for GetBlockResultsResponse {
    type Error = Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
        let mut ret = GetBlockResultsResponse::default();
        let mut up = Unpacker::new(buf);
        while !up.is_empty() {
            let tag: Tag = up.unpack()?;
            if tag.wire_type == WireType::EndGroup {
                return Err(Error::UnexpectedEndOfGroup);
            }
            let f: u32 = tag.field_number.into();
            match (f, tag.wire_type) {
                (1, WireType::Varint) => {
                    let x: int64 = up.unpack()?;
                    ret.height.merge_field(x);
                }
                (2, WireType::LengthDelimited) => {
                    let m: message<Event> = up.unpack()?;
                    ret.begin_block_events.merge_field(m);
                }
                (3, WireType::LengthDelimited) => {
                    let m: message<TxResult> = up.unpack()?;
                    ret.tx_results.merge_field(m);
                }
                (4, WireType::LengthDelimited) => {
                    let m: message<ValidatorUpdate> = up.unpack()?;
                    ret.validator_updates.merge_field(m);
                }
                (5, WireType::LengthDelimited) => {
                    let m: message<ConsensusParams> = up.unpack()?;
                    ret.consensus_param_updates.merge_field(m);
                }
                (6, WireType::LengthDelimited) => {
                    let m: message<Event> = up.unpack()?;
                    ret.end_block_events.merge_field(m);
                }
                (1, _) | (2, _) | (3, _) | (4, _) | (5, _) | (6, _) => {
                    return Err(Error::WireTypeMismatch {
                        field_number: f,
                        wire_type: tag.wire_type.tag_bits(),
                    });
                }
                _ => {
                    FIELD_SKIPPED.click();
                    let consumed = skip(tag.wire_type, up.remain())?;
                    up.advance(consumed);
                }
            }
        }
        Ok((ret, up.remain()))
    }
}

impl<'a> Message<'a> for GetBlockResultsResponse {}

///////////////////////////////////////// encode and decode ////////////////////////////////////////

/// Serialize `msg`, allocating exactly the bytes it needs.
pub fn encode<M: Packable>(msg: &M) -> Vec<u8> {
    ENCODE.click();
    stack_pack(msg).to_vec()
}

/// Serialize `msg` into a prefix of `buf`, returning the number of bytes written.
pub fn marshal_into<M: Packable>(msg: &M, buf: &mut [u8]) -> Result<usize, Error> {
    let required = msg.pack_sz();
    if buf.len() < required {
        return Err(Error::BufferTooSmall {
            required,
            had: buf.len(),
        });
    }
    ENCODE.click();
    msg.pack(&mut buf[..required]);
    Ok(required)
}

/// Deserialize one message from `buf`, enforcing [MAX_MESSAGE_SIZE].
pub fn decode<'a, M: Message<'a>>(buf: &'a [u8]) -> Result<M, Error> {
    decode_limited(buf, MAX_MESSAGE_SIZE)
}

/// Deserialize one message from `buf`, enforcing the provided ceiling instead of the default.
pub fn decode_limited<'a, M: Message<'a>>(buf: &'a [u8], limit: usize) -> Result<M, Error> {
    if buf.len() > limit {
        return Err(Error::MessageTooLarge {
            size: buf.len(),
            limit,
        });
    }
    DECODE.click();
    let mut up = Unpacker::new(buf);
    let msg: M = up.unpack()?;
    Ok(msg)
}

/////////////////////////////////////////// service seams //////////////////////////////////////////

/// The query surface a block service answers from.
pub trait BlockQuery {
    type Error;

    fn get_latest_height(
        &self,
        req: GetLatestHeightRequest,
    ) -> Result<GetLatestHeightResponse, Self::Error>;
    fn get_block(&self, req: GetBlockRequest) -> Result<GetBlockResponse, Self::Error>;
    fn get_block_results(
        &self,
        req: GetBlockResultsRequest,
    ) -> Result<GetBlockResultsResponse, Self::Error>;
}

/// Peer-management facilities of the surrounding node.
pub trait PeerManager {
    type Error;

    fn listeners(&self) -> Vec<String>;
    fn is_listening(&self) -> bool;
    fn list_peers(&self) -> Vec<String>;
    fn dial_peers_async(&self, peers: &[String]) -> Result<(), Self::Error>;
    fn add_persistent_peers(&self, peers: &[String]) -> Result<(), Self::Error>;
}

/// Chunked access to the genesis document, for documents too large to ship whole.
pub trait GenesisStore {
    type Error;

    fn num_chunks(&self) -> usize;
    fn genesis_chunk(&self, chunk: usize) -> Result<Vec<u8>, Self::Error>;
}
