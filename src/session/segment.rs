//! Command segmentation
//!
//! A request too large for one frame travels as one initial frame followed
//! by trailing `SEG_CONFIG_REQ` frames. The logical payload is cut into
//! pieces of at most `segment_size` bytes and the pieces are concatenated
//! again in receipt order.
//!
//! The initial frame is the first piece as is: the request schema itself
//! holds the remaining-segment counter (`SegCnt`), so no extra header goes
//! in front of it. Every trailing piece is preceded by a 36-byte header:
//!
//! ```text
//!  0        4        5                                 36
//! +--------+--------+---------------------------------+-------------
//! |  UeId  | SegCnt |          Spare (0)              | data ...
//! +--------+--------+---------------------------------+-------------
//! ```
//!
//! `SegCnt` is the number of segments still to follow, so the last segment
//! carries 0 and the counters of one run descend by exactly one.

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::codec::{CodecError, Record, decode_prefix, encode_record};
use crate::protocol::metrics::Metrics;
use crate::schema::RecordSchema;

use super::{ReassemblyError, SplitError};

/// Size of the header in front of each trailing segment
pub const HEADER_SIZE: usize = 36;

const SPARE: [u8; 31] = [0; 31];

/// Layout of the header in front of each trailing segment
pub fn header_schema() -> crate::schema::Result<Arc<RecordSchema>> {
    RecordSchema::builder("SegConfigReq")
        .u32("UeId")
        .u8("SegCnt")
        .bytes("Spare", SPARE.len())
        .build()
}

/// One piece of a segmented payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Segments still to follow this one
    pub remaining: u8,
    /// Payload slice carried by this segment
    pub data: Bytes,
}

impl Segment {
    /// Read the initial segment; its counter sits at `counter_offset`
    pub fn initial(payload: &Bytes, counter_offset: usize) -> Result<Self, ReassemblyError> {
        let Some(&remaining) = payload.get(counter_offset) else {
            return Err(ReassemblyError::MissingCounter {
                offset: counter_offset,
                len: payload.len(),
            });
        };
        Ok(Self {
            remaining,
            data: payload.clone(),
        })
    }

    /// Frame payload of a trailing segment: `header` record, then the data
    ///
    /// `header` is the schema returned by [`header_schema`].
    pub fn encode_trailing(&self, header: &RecordSchema, id: u32) -> Result<Bytes, CodecError> {
        let fields = Record::new()
            .with("UeId", id)
            .with("SegCnt", self.remaining)
            .with("Spare", Bytes::from_static(&SPARE));
        let head = encode_record(header, &fields)?;

        let mut buf = BytesMut::with_capacity(head.len() + self.data.len());
        buf.put_slice(&head);
        buf.put_slice(&self.data);
        Ok(buf.freeze())
    }

    /// Parse a trailing segment frame; returns the id it repeats
    pub fn decode_trailing(
        header: &RecordSchema,
        payload: &Bytes,
    ) -> Result<(u32, Self), ReassemblyError> {
        let (decoded, consumed) = decode_prefix(header, payload).map_err(ReassemblyError::Header)?;
        let field = |name: &'static str| {
            decoded
                .record
                .get_u64(name)
                .ok_or(ReassemblyError::MissingHeaderField { field: name })
        };
        let id = u32::try_from(field("UeId")?)
            .map_err(|_| ReassemblyError::MissingHeaderField { field: "UeId" })?;
        let remaining = u8::try_from(field("SegCnt")?)
            .map_err(|_| ReassemblyError::MissingHeaderField { field: "SegCnt" })?;
        Ok((
            id,
            Self {
                remaining,
                data: payload.slice(consumed..),
            },
        ))
    }
}

/// Number of segments a payload of `len` bytes needs
///
/// An empty payload still takes one segment.
pub fn count(len: usize, segment_size: usize) -> Result<usize, SplitError> {
    if segment_size == 0 {
        return Err(SplitError::ZeroSegmentSize);
    }
    let needed = len.div_ceil(segment_size).max(1);
    if needed > usize::from(u8::MAX) + 1 {
        return Err(SplitError::TooManySegments { needed });
    }
    Ok(needed)
}

/// Split `payload` into segments of at most `segment_size` data bytes
///
/// An empty payload still yields one (empty) segment. Slices share the
/// payload's buffer.
pub fn split(payload: &Bytes, segment_size: usize) -> Result<Vec<Segment>, SplitError> {
    let needed = count(payload.len(), segment_size)?;

    let segments: Vec<Segment> = (0..needed)
        .map(|i| {
            let start = i * segment_size;
            let end = (start + segment_size).min(payload.len());
            #[allow(clippy::cast_possible_truncation)]
            let remaining = (needed - 1 - i) as u8;
            Segment {
                remaining,
                data: payload.slice(start..end),
            }
        })
        .collect();

    trace!(len = payload.len(), segments = segments.len(), "payload split");
    Ok(segments)
}

/// Reassemble a complete run of segments
///
/// Fails if the counters do not descend by one, if the run stops before the
/// segment with counter 0, or if anything follows that segment.
pub fn reassemble<I>(segments: I) -> Result<Bytes, ReassemblyError>
where
    I: IntoIterator<Item = Segment>,
{
    let mut reassembler = Reassembler::new();
    let mut complete = None;
    for segment in segments {
        if complete.is_some() {
            return Err(ReassemblyError::TrailingSegment);
        }
        complete = reassembler.push(segment)?;
    }
    match complete {
        Some(payload) => Ok(payload),
        None => Err(ReassemblyError::Incomplete {
            remaining: reassembler.expected().map_or(0, |next| next.saturating_add(1)),
        }),
    }
}

/// Incremental reassembler for segments arriving one frame at a time
#[derive(Debug, Default)]
pub struct Reassembler {
    buffer: BytesMut,
    expected: Option<u8>,
}

impl Reassembler {
    /// Reassembler waiting for the first segment of a run
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter the next segment must carry, once a run has started
    #[must_use]
    pub const fn expected(&self) -> Option<u8> {
        self.expected
    }

    /// Whether a run is in progress
    #[must_use]
    pub const fn in_progress(&self) -> bool {
        self.expected.is_some()
    }

    /// Add the next segment; returns the payload when the run completes
    ///
    /// The first segment announces the run length. After a completed run or
    /// an error the reassembler is ready for a new run.
    pub fn push(&mut self, segment: Segment) -> Result<Option<Bytes>, ReassemblyError> {
        if let Some(expected) = self.expected {
            if segment.remaining != expected {
                self.reset();
                return Err(ReassemblyError::OutOfOrder {
                    expected,
                    found: segment.remaining,
                });
            }
        }
        Metrics::record_segment_received();
        self.buffer.put_slice(&segment.data);

        if segment.remaining == 0 {
            self.expected = None;
            let payload = self.buffer.split().freeze();
            trace!(len = payload.len(), "segments reassembled");
            return Ok(Some(payload));
        }
        self.expected = Some(segment.remaining - 1);
        Ok(None)
    }

    /// Drop any partial run
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.expected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(remaining: u8, data: &'static [u8]) -> Segment {
        Segment {
            remaining,
            data: Bytes::from_static(data),
        }
    }

    #[test]
    fn test_split_counters() {
        let payload = Bytes::from(vec![7u8; 30_000]);
        let segments = split(&payload, 20_000).unwrap();

        let counters: Vec<u8> = segments.iter().map(|s| s.remaining).collect();
        assert_eq!(counters, vec![1, 0]);
        assert_eq!(segments[0].data.len(), 20_000);
        assert_eq!(segments[1].data.len(), 10_000);
        assert_eq!(reassemble(segments).unwrap(), payload);
    }

    #[test]
    fn test_split_edges() {
        let empty = split(&Bytes::new(), 10).unwrap();
        assert_eq!(empty.len(), 1);
        assert_eq!(empty[0].remaining, 0);

        let exact = split(&Bytes::from(vec![0u8; 20]), 10).unwrap();
        assert_eq!(exact.len(), 2);

        assert_eq!(split(&Bytes::new(), 0), Err(SplitError::ZeroSegmentSize));
        assert_eq!(
            split(&Bytes::from(vec![0u8; 257]), 1),
            Err(SplitError::TooManySegments { needed: 257 })
        );
        assert_eq!(split(&Bytes::from(vec![0u8; 256]), 1).unwrap()[0].remaining, 255);
        assert_eq!(count(30_000, 20_000), Ok(2));
    }

    #[test]
    fn test_out_of_order() {
        let segments = vec![segment(2, b"a"), segment(0, b"b")];
        assert_eq!(
            reassemble(segments),
            Err(ReassemblyError::OutOfOrder { expected: 1, found: 0 })
        );
    }

    #[test]
    fn test_incomplete_and_trailing() {
        assert_eq!(
            reassemble(vec![segment(1, b"a")]),
            Err(ReassemblyError::Incomplete { remaining: 1 })
        );
        assert_eq!(reassemble(Vec::new()), Err(ReassemblyError::Incomplete { remaining: 0 }));

        let run = vec![segment(0, b"a"), segment(0, b"b")];
        assert_eq!(reassemble(run), Err(ReassemblyError::TrailingSegment));
    }

    #[test]
    fn test_trailing_header() {
        let header = header_schema().unwrap();
        assert_eq!(header.fixed_size(), Some(HEADER_SIZE));

        let payload = segment(3, b"xyz").encode_trailing(&header, 0x0102_0304).unwrap();
        assert_eq!(payload.len(), HEADER_SIZE + 3);
        assert_eq!(&payload[..5], &[0x04, 0x03, 0x02, 0x01, 3]);
        assert!(payload[5..HEADER_SIZE].iter().all(|&b| b == 0));
        assert_eq!(&payload[HEADER_SIZE..], b"xyz");

        let (id, decoded) = Segment::decode_trailing(&header, &payload).unwrap();
        assert_eq!(id, 0x0102_0304);
        assert_eq!(decoded, segment(3, b"xyz"));

        let short = Bytes::from_static(&[1, 0, 0, 0, 2]);
        assert!(matches!(
            Segment::decode_trailing(&header, &short),
            Err(ReassemblyError::Header(_))
        ));
    }

    #[test]
    fn test_initial_counter() {
        let payload = Bytes::from_static(&[0xFF, 0xFF, 0xFF, 0xFF, 2, 9]);
        let initial = Segment::initial(&payload, 4).unwrap();
        assert_eq!(initial.remaining, 2);
        assert_eq!(initial.data, payload);
        assert_eq!(
            Segment::initial(&payload, 6),
            Err(ReassemblyError::MissingCounter { offset: 6, len: 6 })
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn split_then_reassemble_is_identity(
                data in proptest::collection::vec(any::<u8>(), 0..4096),
                size in 16usize..2048,
            ) {
                let payload = Bytes::from(data);
                let segments = split(&payload, size).unwrap();
                prop_assert!(segments.iter().all(|s| s.data.len() <= size));
                prop_assert_eq!(reassemble(segments).unwrap(), payload);
            }
        }
    }
}
