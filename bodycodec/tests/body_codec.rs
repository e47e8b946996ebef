use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::Poll;

use bodycodec::prelude::*;
use bodycodec::{
    AnyCodec, AnyValue, BodyCodecRegistry, BodyError, ByteStream, CodecError, FrameDecoder,
    FrameEncoder, Framing, ValueStream,
};
use bytes::Bytes;
use futures::{StreamExt, stream};
use http_body_util::BodyExt;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Fixed 4-byte big-endian i32 codec.
#[derive(Clone, Copy)]
struct BigEndianI32;

impl BinaryCodec<i32> for BigEndianI32 {
    fn name(&self) -> &'static str {
        "i32be"
    }

    fn decode_one(&self, bytes: &[u8]) -> Result<i32, CodecError> {
        let raw = <[u8; 4]>::try_from(bytes)
            .map_err(|_| CodecError::new(format!("expected 4 bytes, got {}", bytes.len())))?;
        Ok(i32::from_be_bytes(raw))
    }

    fn encode_one(&self, value: &i32) -> Result<Bytes, CodecError> {
        Ok(Bytes::copy_from_slice(&value.to_be_bytes()))
    }

    fn decode_stream(&self, chunks: ByteStream, limits: MessageLimits) -> ValueStream<i32> {
        Box::pin(FrameDecoder::new(chunks, *self, Framing::Fixed(4)).with_limits(limits))
    }

    fn encode_stream(&self, values: ValueStream<i32>) -> ByteStream {
        Box::pin(FrameEncoder::new(values, *self, Framing::Fixed(4)))
    }
}

/// Codec that fails the test if any method is called.
struct UnusableCodec;

impl BinaryCodec<()> for UnusableCodec {
    fn name(&self) -> &'static str {
        "unusable"
    }

    fn decode_one(&self, _bytes: &[u8]) -> Result<(), CodecError> {
        panic!("decode_one must not be called");
    }

    fn encode_one(&self, _value: &()) -> Result<Bytes, CodecError> {
        panic!("encode_one must not be called");
    }

    fn decode_stream(&self, _chunks: ByteStream, _limits: MessageLimits) -> ValueStream<()> {
        panic!("decode_stream must not be called");
    }

    fn encode_stream(&self, _values: ValueStream<()>) -> ByteStream {
        panic!("encode_stream must not be called");
    }
}

/// Body whose first poll fails the test.
fn unreadable_body() -> Body {
    Body::streaming(stream::poll_fn(
        |_| -> Poll<Option<Result<Bytes, Error>>> { panic!("body must not be read") },
    ))
}

#[derive(Clone, PartialEq, prost::Message)]
struct Reading {
    #[prost(string, tag = "1")]
    sensor: String,
    #[prost(double, tag = "2")]
    value: f64,
}

fn reading(sensor: &str, value: f64) -> Reading {
    Reading {
        sensor: sensor.into(),
        value,
    }
}

// ============================================================================
// Empty
// ============================================================================

#[tokio::test]
async fn empty_decode_ignores_body_and_codec() {
    init_tracing();

    Empty.decode(unreadable_body(), &UnusableCodec).await.unwrap();
    Empty
        .decode(Body::full(Bytes::from_static(b"\xff\x00garbage")), &UnusableCodec)
        .await
        .unwrap();
}

#[tokio::test]
async fn empty_encode_yields_empty_body() {
    let body = Empty.encode((), &UnusableCodec);

    assert!(http_body::Body::is_end_stream(&body));
    assert!(body.collect_unlimited().await.unwrap().is_empty());
}

// ============================================================================
// Single
// ============================================================================

#[tokio::test]
async fn single_big_endian_scenario() {
    let single = Single::new(Schema::<i32>::of());

    let body = single.encode(258, &BigEndianI32);
    let bytes = body.collect_unlimited().await.unwrap();
    assert_eq!(&bytes[..], &[0x00, 0x00, 0x01, 0x02]);

    let value = single.decode(Body::full(bytes), &BigEndianI32).await.unwrap();
    assert_eq!(value, 258);
}

#[tokio::test]
async fn single_round_trip_with_each_codec() {
    let single = Single::new(Schema::<i32>::of());
    for v in [0, 1, -1, i32::MIN, i32::MAX] {
        let body = single.encode(v, &BigEndianI32);
        assert_eq!(single.decode(body, &BigEndianI32).await.unwrap(), v);

        let body = single.encode(v, &JsonCodec::new());
        assert_eq!(single.decode(body, &JsonCodec::new()).await.unwrap(), v);
    }

    let single = Single::new(Schema::<Reading>::named("acme.Reading"));
    let body = single.encode(reading("t1", 21.5), &ProtoCodec);
    assert_eq!(
        single.decode(body, &ProtoCodec).await.unwrap(),
        reading("t1", 21.5)
    );
}

#[tokio::test]
async fn single_decode_reads_chunked_body() {
    let single = Single::new(Schema::<i32>::of());
    let body = Body::streaming(stream::iter(vec![
        Ok(Bytes::from_static(&[0x00, 0x00])),
        Ok(Bytes::from_static(&[0x01, 0x02])),
    ]));

    assert_eq!(single.decode(body, &BigEndianI32).await.unwrap(), 258);
}

#[tokio::test]
async fn single_unit_schema_never_touches_body_or_codec() {
    init_tracing();
    let single = Single::new(Schema::unit());

    single.decode(unreadable_body(), &UnusableCodec).await.unwrap();
    single
        .decode(Body::full("stray bytes"), &UnusableCodec)
        .await
        .unwrap();
}

#[tokio::test]
async fn single_unit_type_schema_is_unit_however_built() {
    for schema in [
        Schema::<()>::of(),
        Schema::<()>::named("google.protobuf.Empty"),
    ] {
        assert_eq!(schema, Schema::unit());
        let single = Single::new(schema);

        single.decode(unreadable_body(), &UnusableCodec).await.unwrap();
        single
            .decode(Body::full("stray bytes"), &UnusableCodec)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn single_decode_error_keeps_codec_message() {
    let single = Single::new(Schema::<i32>::of());

    let err = single
        .decode(Body::full(Bytes::from_static(&[0x01, 0x02])), &BigEndianI32)
        .await
        .unwrap_err();
    assert!(err.is_decode());
    assert_eq!(err.message(), Some("expected 4 bytes, got 2"));

    let err = single
        .decode(Body::full("{\"not\": \"an int\"}"), &JsonCodec::new())
        .await
        .unwrap_err();
    assert!(err.message().unwrap().starts_with("JSON decoding failed: "));
}

#[tokio::test]
async fn single_propagates_body_failure_unchanged() {
    let single = Single::new(Schema::<i32>::of());
    let body = Body::streaming(stream::iter(vec![
        Ok(Bytes::from_static(&[0x00, 0x00])),
        Err(Error::Body(BodyError::Transport("connection closed".into()))),
    ]));

    let err = single.decode(body, &BigEndianI32).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Body(BodyError::Transport(ref msg)) if msg == "connection closed"
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_is_reusable_across_tasks() {
    let single = Arc::new(Single::new(Schema::<i32>::of()));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let single = single.clone();
            tokio::spawn(async move {
                let body = single.encode(i, &BigEndianI32);
                single.decode(body, &BigEndianI32).await.unwrap()
            })
        })
        .collect();

    for (i, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await.unwrap(), i as i32);
    }
}

// ============================================================================
// Multiple
// ============================================================================

#[tokio::test]
async fn multiple_big_endian_scenario() {
    let multiple = Multiple::new(Schema::<i32>::of());

    let body = multiple.encode(Streaming::from_values(vec![1, 2]), &BigEndianI32);
    let bytes = body.collect_unlimited().await.unwrap();
    assert_eq!(&bytes[..], &[0, 0, 0, 1, 0, 0, 0, 2]);

    let mut decoded = multiple
        .decode(Body::full(bytes), &BigEndianI32)
        .await
        .unwrap();
    assert_eq!(decoded.next().await.unwrap().unwrap(), 1);
    assert_eq!(decoded.next().await.unwrap().unwrap(), 2);
    assert!(decoded.next().await.is_none());
}

#[tokio::test]
async fn multiple_round_trip_preserves_order() {
    let multiple = Multiple::new(Schema::<Reading>::named("acme.Reading"));
    let readings: Vec<Reading> = (0..50).map(|i| reading("t", i as f64)).collect();

    let body = multiple.encode(Streaming::from_values(readings.clone()), &ProtoCodec);
    let decoded: Vec<Reading> = multiple
        .decode(body, &ProtoCodec)
        .await
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
        .await;

    assert_eq!(decoded, readings);
}

#[tokio::test]
async fn multiple_decode_does_not_read_past_consumed_prefix() {
    let tail_read = Arc::new(AtomicBool::new(false));
    let flag = tail_read.clone();
    let body = Body::streaming(async_stream::stream! {
        yield Ok(Bytes::from_static(&[0, 0, 0, 1]));
        yield Ok(Bytes::from_static(&[0, 0, 0, 2]));
        flag.store(true, Ordering::SeqCst);
        yield Ok(Bytes::from_static(&[0, 0, 0, 3]));
    });

    let multiple = Multiple::new(Schema::<i32>::of());
    let mut decoded = multiple.decode(body, &BigEndianI32).await.unwrap();

    assert_eq!(decoded.next().await.unwrap().unwrap(), 1);
    assert_eq!(decoded.next().await.unwrap().unwrap(), 2);
    assert!(!tail_read.load(Ordering::SeqCst));
}

#[tokio::test]
async fn multiple_decode_is_lazy_until_polled() {
    let multiple = Multiple::new(Schema::<i32>::of());

    // building the stream must not poll the body
    let decoded = multiple.decode(unreadable_body(), &BigEndianI32).await.unwrap();
    drop(decoded);
}

#[tokio::test]
async fn multiple_encode_is_lazy_until_polled() {
    let pulled = Arc::new(AtomicBool::new(false));
    let flag = pulled.clone();
    let values = Streaming::from_stream(async_stream::stream! {
        flag.store(true, Ordering::SeqCst);
        yield Ok::<_, Error>(7);
    });

    let multiple = Multiple::new(Schema::<i32>::of());
    let body = multiple.encode(values, &BigEndianI32);
    assert!(!pulled.load(Ordering::SeqCst));

    let bytes = BodyExt::collect(body).await.unwrap().to_bytes();
    assert!(pulled.load(Ordering::SeqCst));
    assert_eq!(&bytes[..], &[0, 0, 0, 7]);
}

#[tokio::test]
async fn multiple_failure_is_delivered_in_position() {
    let multiple = Multiple::new(Schema::<i32>::of());
    let body = Body::full("1\n2\nnope\n4\n");

    let items: Vec<Result<i32, Error>> = multiple
        .decode(body, &JsonCodec::newline_delimited())
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_ref().unwrap(), &1);
    assert_eq!(items[1].as_ref().unwrap(), &2);
    let err = items[2].as_ref().unwrap_err();
    assert!(err.is_decode());
    assert!(err.message().unwrap().starts_with("JSON decoding failed: "));
}

#[tokio::test]
async fn multiple_drop_releases_body_source() {
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    let released = Arc::new(AtomicBool::new(false));
    let guard = DropFlag(released.clone());
    let body = Body::streaming(async_stream::stream! {
        let _guard = guard;
        let mut i: i32 = 0;
        loop {
            i += 1;
            yield Ok(Bytes::copy_from_slice(&i.to_be_bytes()));
        }
    });

    let multiple = Multiple::new(Schema::<i32>::of());
    let mut decoded = multiple.decode(body, &BigEndianI32).await.unwrap();
    assert_eq!(decoded.next().await.unwrap().unwrap(), 1);
    assert_eq!(decoded.next().await.unwrap().unwrap(), 2);
    assert!(!released.load(Ordering::SeqCst));

    drop(decoded);
    assert!(released.load(Ordering::SeqCst));
}

#[tokio::test]
async fn multiple_frame_limit() {
    let multiple =
        Multiple::new(Schema::<String>::of()).with_limits(MessageLimits::new(8));
    let body = multiple.encode(
        Streaming::from_values(vec!["short".to_string(), "much too long".to_string()]),
        &JsonCodec::new(),
    );

    let mut decoded = multiple.decode(body, &JsonCodec::new()).await.unwrap();
    assert_eq!(decoded.next().await.unwrap().unwrap(), "short");
    let err = decoded.next().await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        Error::Body(BodyError::LengthLimitExceeded { limit: 8, .. })
    ));
}

// ============================================================================
// Erasure
// ============================================================================

#[tokio::test]
async fn registry_dispatches_on_variant() {
    init_tracing();
    let mut registry = BodyCodecRegistry::new();
    registry.insert("acme.Ping", Empty);
    registry.insert("acme.Get", Single::new(Schema::<i32>::of()));
    registry.insert("acme.Watch", Multiple::new(Schema::<i32>::of()));

    let unit_codec = AnyCodec::new::<(), _>(JsonCodec::new());
    let int_codec = AnyCodec::new::<i32, _>(BigEndianI32);

    let ping = registry.get("acme.Ping").unwrap();
    assert_eq!(ping.kind(), BodyKind::Empty);
    let value = ping.decode(Body::full("ignored"), &unit_codec).await.unwrap();
    assert!(value.is::<()>());

    let get = registry.get("acme.Get").unwrap();
    let body = get.encode(AnyValue::new(258i32), &int_codec).unwrap();
    let value = get.decode(body, &int_codec).await.unwrap();
    assert_eq!(value.downcast::<i32>().unwrap(), 258);

    let watch = registry.get("acme.Watch").unwrap();
    assert_eq!(watch.kind(), BodyKind::Multiple);
    let body = watch
        .encode(AnyValue::new(Streaming::from_values(vec![1, 2, 3])), &int_codec)
        .unwrap();
    let stream = watch
        .decode(body, &int_codec)
        .await
        .unwrap()
        .downcast::<Streaming<i32>>()
        .unwrap();
    let values: Vec<i32> = stream.map(|r| r.unwrap()).collect().await;
    assert_eq!(values, vec![1, 2, 3]);
}

#[tokio::test]
async fn registry_unit_shapes_ignore_codec_type() {
    let mut registry = BodyCodecRegistry::new();
    registry.insert("acme.Ping", Empty);
    registry.insert("acme.Ack", Single::new(Schema::<()>::of()));
    let int_codec = AnyCodec::new::<i32, _>(JsonCodec::new());

    let ping = registry.get("acme.Ping").unwrap();
    let value = ping.decode(Body::empty(), &int_codec).await.unwrap();
    assert!(value.is::<()>());
    let body = ping.encode(AnyValue::new(()), &int_codec).unwrap();
    assert!(body.collect_unlimited().await.unwrap().is_empty());

    let ack = registry.get("acme.Ack").unwrap();
    let value = ack.decode(unreadable_body(), &int_codec).await.unwrap();
    assert!(value.is::<()>());
}

#[tokio::test]
async fn registry_rejects_mismatched_value() {
    let mut registry = BodyCodecRegistry::new();
    registry.insert("acme.Get", Single::new(Schema::<i32>::of()));
    let codec = AnyCodec::new::<i32, _>(BigEndianI32);

    let err = registry
        .get("acme.Get")
        .unwrap()
        .encode(AnyValue::new("258".to_string()), &codec)
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { expected: "i32", .. }));
}
