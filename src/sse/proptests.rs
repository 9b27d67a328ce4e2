//! Chunk-boundary independence of the frame decoder

use super::{Frame, FrameDecoder};
use proptest::prelude::*;

fn arb_payload() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9{}\":, é]{1,30}".prop_filter("not blank", |s| !s.trim().is_empty())
}

fn encode(payloads: &[String], with_done: bool) -> Vec<u8> {
    let mut out = String::new();
    for payload in payloads {
        out.push_str("data: ");
        out.push_str(payload);
        out.push_str("\n\n");
    }
    if with_done {
        out.push_str("data: [DONE]\n\n");
    }
    out.into_bytes()
}

fn decode_in_chunks(bytes: &[u8], cuts: &[usize]) -> Vec<Frame> {
    let mut cuts: Vec<usize> = cuts.iter().map(|c| c % (bytes.len() + 1)).collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut decoder = FrameDecoder::new();
    let mut frames = Vec::new();
    let mut start = 0;
    for cut in cuts {
        frames.extend(decoder.push(&bytes[start..cut]));
        start = cut;
    }
    frames.extend(decoder.push(&bytes[start..]));
    frames.extend(decoder.finish());
    frames
}

proptest! {
    #[test]
    fn any_chunking_yields_same_frames(
        payloads in proptest::collection::vec(arb_payload(), 1..6),
        with_done in any::<bool>(),
        cuts in proptest::collection::vec(any::<usize>(), 0..12),
    ) {
        let bytes = encode(&payloads, with_done);
        let whole = decode_in_chunks(&bytes, &[]);
        let chunked = decode_in_chunks(&bytes, &cuts);
        prop_assert_eq!(&chunked, &whole);

        let mut expected: Vec<Frame> = payloads.into_iter().map(Frame::Data).collect();
        if with_done {
            expected.push(Frame::Done);
        }
        prop_assert_eq!(whole, expected);
    }

    #[test]
    fn byte_at_a_time_matches_whole(payloads in proptest::collection::vec(arb_payload(), 1..4)) {
        let bytes = encode(&payloads, true);
        let every_byte: Vec<usize> = (1..bytes.len()).collect();
        prop_assert_eq!(decode_in_chunks(&bytes, &every_byte), decode_in_chunks(&bytes, &[]));
    }
}
