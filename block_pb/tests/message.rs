use guacamole::Guacamole;
use varbuf::Packable;

use block_pb::{
    decode, encode, marshal_into, Block, BlockId, ConsensusParams, Event, GetBlockRequest,
    GetBlockResponse, GetBlockResultsRequest, GetBlockResultsResponse, GetLatestHeightRequest,
    GetLatestHeightResponse, TxResult, ValidatorUpdate,
};
use wiretk::Error;

#[test]
fn latest_height_request_is_empty() {
    let req = GetLatestHeightRequest::default();
    assert_eq!(0, req.pack_sz());
    assert!(encode(&req).is_empty());
    let got: GetLatestHeightRequest = decode(&[]).unwrap();
    assert_eq!(req, got);
}

#[test]
fn latest_height_response_golden_bytes() {
    let resp = GetLatestHeightResponse { height: 5 };
    assert_eq!(&[0x08, 0x05], encode(&resp).as_slice());
    let got: GetLatestHeightResponse = decode(&[0x08, 0x05]).unwrap();
    assert_eq!(resp, got);
}

#[test]
fn zero_height_elided() {
    assert!(encode(&GetLatestHeightResponse { height: 0 }).is_empty());
    assert!(encode(&GetBlockRequest { height: 0 }).is_empty());
    assert!(encode(&GetBlockResultsRequest { height: 0 }).is_empty());
    let got: GetBlockRequest = decode(&[]).unwrap();
    assert_eq!(0, got.height);
}

#[test]
fn block_request_golden_bytes() {
    let req = GetBlockRequest { height: 100 };
    assert_eq!(&[0x08, 0x64], encode(&req).as_slice());
    let got: GetBlockRequest = decode(&[0x08, 0x64]).unwrap();
    assert_eq!(req, got);
}

#[test]
fn negative_height_round_trip() {
    let req = GetBlockRequest { height: -1 };
    let buf = encode(&req);
    // negative varints always occupy the full ten bytes, plus one byte of tag
    assert_eq!(11, buf.len());
    let got: GetBlockRequest = decode(&buf).unwrap();
    assert_eq!(req, got);
}

#[test]
fn block_response_golden_bytes() {
    let resp = GetBlockResponse {
        height: 7,
        block_id: Some(BlockId {
            body: vec![0xde, 0xad],
        }),
        block: None,
    };
    let buf = encode(&resp);
    assert_eq!(&[0x08, 0x07, 0x12, 0x02, 0xde, 0xad], buf.as_slice());
    let got: GetBlockResponse = decode(&buf).unwrap();
    assert_eq!(resp, got);
}

#[test]
fn block_response_round_trip() {
    let resp = GetBlockResponse {
        height: 42,
        block_id: Some(BlockId {
            body: vec![0x0a, 0x02, 0xab, 0xcd],
        }),
        block: Some(Block {
            body: vec![1, 2, 3, 4, 5],
        }),
    };
    let buf = encode(&resp);
    assert_eq!(resp.pack_sz(), buf.len());
    let got: GetBlockResponse = decode(&buf).unwrap();
    assert_eq!(resp, got);
}

#[test]
fn block_results_response_golden_bytes() {
    let resp = GetBlockResultsResponse {
        height: 12,
        begin_block_events: vec![Event { body: vec![0x01] }, Event { body: vec![] }],
        tx_results: vec![TxResult {
            body: vec![0x02, 0x03],
        }],
        validator_updates: vec![ValidatorUpdate { body: vec![] }],
        consensus_param_updates: Some(ConsensusParams { body: vec![0x04] }),
        end_block_events: vec![Event { body: vec![0x05] }],
    };
    let buf = encode(&resp);
    assert_eq!(
        &[
            0x08, 0x0c, // height
            0x12, 0x01, 0x01, // begin event
            0x12, 0x00, // empty begin event
            0x1a, 0x02, 0x02, 0x03, // tx result
            0x22, 0x00, // validator update
            0x2a, 0x01, 0x04, // consensus params
            0x32, 0x01, 0x05, // end event
        ],
        buf.as_slice(),
    );
    let got: GetBlockResultsResponse = decode(&buf).unwrap();
    assert_eq!(resp, got);
}

#[test]
fn block_results_response_defaults_are_empty() {
    let resp = GetBlockResultsResponse::default();
    assert!(encode(&resp).is_empty());
    let got: GetBlockResultsResponse = decode(&[]).unwrap();
    assert_eq!(resp, got);
}

#[test]
fn repeated_fields_preserve_order() {
    let resp = GetBlockResultsResponse {
        begin_block_events: vec![
            Event { body: vec![0] },
            Event { body: vec![1] },
            Event { body: vec![2] },
        ],
        ..GetBlockResultsResponse::default()
    };
    let buf = encode(&resp);
    let got: GetBlockResultsResponse = decode(&buf).unwrap();
    assert_eq!(3, got.begin_block_events.len());
    for (idx, event) in got.begin_block_events.iter().enumerate() {
        assert_eq!(vec![idx as u8], event.body, "event {} out of order?", idx);
    }
}

#[test]
fn size_agreement() {
    fn check<M: Packable>(msg: &M) {
        assert_eq!(msg.pack_sz(), encode(msg).len());
    }
    check(&GetLatestHeightRequest::default());
    check(&GetLatestHeightResponse { height: i64::MAX });
    check(&GetBlockRequest { height: 1 << 21 });
    check(&GetBlockResultsRequest { height: -5 });
    check(&GetBlockResponse {
        height: 300,
        block_id: Some(BlockId { body: vec![0; 200] }),
        block: Some(Block { body: vec![0; 300] }),
    });
    check(&GetBlockResultsResponse {
        height: 1,
        tx_results: vec![TxResult { body: vec![7; 40] }; 5],
        ..GetBlockResultsResponse::default()
    });
}

#[test]
fn marshal_into_exact_prefix() {
    let resp = GetLatestHeightResponse { height: 5 };
    let mut buf = [0xffu8; 8];
    let written = marshal_into(&resp, &mut buf).unwrap();
    assert_eq!(2, written);
    assert_eq!(&[0x08, 0x05], &buf[..written]);
    // untouched suffix
    assert_eq!(&[0xff; 6], &buf[written..]);
}

#[test]
fn marshal_into_short_buffer() {
    let resp = GetLatestHeightResponse { height: 5 };
    let mut buf = [0u8; 1];
    assert_eq!(
        Err(Error::BufferTooSmall { required: 2, had: 1 }),
        marshal_into(&resp, &mut buf),
    );
}

#[test]
fn random_heights_round_trip() {
    let mut g = Guacamole::new(0xb10cu64);
    for _ in 0..1000 {
        let mut raw = [0u8; 8];
        g.generate(&mut raw);
        let x = u64::from_le_bytes(raw);
        // bias toward every encoded length
        let height = (x >> (x & 63)) as i64;
        let msg = GetBlockRequest { height };
        let buf = encode(&msg);
        assert_eq!(msg.pack_sz(), buf.len());
        let got: GetBlockRequest = decode(&buf).unwrap();
        assert_eq!(msg, got);
    }
}
