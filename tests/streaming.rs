use bytes::Bytes;
use chat_stream::transport::ChunkStream;
use chat_stream::{
    ChatMessage, ChatRequest, Outcome, ReplayTransport, StreamSession, StreamUpdate, stream_chat,
};
use futures::{StreamExt, stream};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Answers with multi-byte text, blank separators, an SSE comment and a frame
/// whose JSON spans several lines
const BODY: &str = concat!(
    ": ping\n\n",
    "data: {\"code\":0,\"data\":{\"answer\":\"你\"}}\n\n",
    "data: {\"code\":0,\"data\":{\"answer\":\"你好 🦀\"}}\n\n",
    "data: {\"code\":0,\n",
    "\"data\":{\"answer\":\n",
    "\"你好 🦀 world\"}}\n\n",
    "data:{\"code\":0,\"data\":{\"reference\":[]}}\n\n",
    "data: {\"code\":0,\"data\":true}\n\n",
);

fn request() -> ChatRequest {
    ChatRequest::new("conv-1", vec![ChatMessage::user("hello")])
}

async fn collect(transport: &ReplayTransport) -> (Outcome, Vec<StreamUpdate>) {
    let mut updates = Vec::new();
    let outcome = stream_chat(transport, &request(), |u| updates.push(u)).await;
    (outcome, updates)
}

fn counted(chunks: Vec<&'static str>, pulls: Arc<AtomicUsize>) -> ChunkStream {
    Box::pin(
        stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from_static(c.as_bytes()))))
            .inspect(move |_| {
                pulls.fetch_add(1, Ordering::SeqCst);
            }),
    )
}

#[tokio::test]
async fn test_expected_updates_single_chunk() {
    let (outcome, updates) = collect(&ReplayTransport::from_chunks([BODY])).await;

    assert_eq!(outcome, Outcome::Done);
    assert_eq!(
        updates,
        vec![
            StreamUpdate::partial("你"),
            StreamUpdate::partial("你好 🦀"),
            StreamUpdate::partial("你好 🦀 world"),
            StreamUpdate::finished(),
        ]
    );
}

#[tokio::test]
async fn test_every_chunk_size_gives_same_updates() {
    let (_, expected) = collect(&ReplayTransport::from_chunks([BODY])).await;

    for size in 1..=BODY.len() {
        let (outcome, updates) = collect(&ReplayTransport::split(BODY, size)).await;
        assert_eq!(outcome, Outcome::Done, "chunk size {}", size);
        assert_eq!(updates, expected, "chunk size {}", size);
    }
}

#[tokio::test]
async fn test_split_inside_multibyte_character() {
    let bytes = BODY.as_bytes();
    // first byte of "你" is followed by two continuation bytes
    let start = BODY.find('你').unwrap();
    let (_, expected) = collect(&ReplayTransport::from_chunks([BODY])).await;

    for cut in [start + 1, start + 2] {
        let transport = ReplayTransport::from_chunks([
            Bytes::copy_from_slice(&bytes[..cut]),
            Bytes::copy_from_slice(&bytes[cut..]),
        ]);
        let (_, updates) = collect(&transport).await;
        assert_eq!(updates, expected, "cut at {}", cut);
    }
}

#[tokio::test]
async fn test_envelope_split_across_two_chunks() {
    let transport = ReplayTransport::from_chunks([
        "data: {\"code\":0,\"data\":{\"ans",
        "wer\":\"Hello\"}}\n\ndata: {\"code\":0,\"data\":true}\n\n",
    ]);
    let (outcome, updates) = collect(&transport).await;

    assert_eq!(outcome, Outcome::Done);
    assert_eq!(
        updates,
        vec![StreamUpdate::partial("Hello"), StreamUpdate::finished()]
    );
}

#[tokio::test]
async fn test_error_envelope_stops_reading() {
    let pulls = Arc::new(AtomicUsize::new(0));
    let chunks = counted(
        vec![
            "data: {\"code\":1,\"message\":\"boom\"}\n\n",
            "data: {\"code\":0,\"data\":{\"answer\":\"late\"}}\n\n",
            "data: {\"code\":0,\"data\":true}\n\n",
        ],
        pulls.clone(),
    );

    let mut updates = Vec::new();
    let outcome = StreamSession::new().run(chunks, |u| updates.push(u)).await;

    assert_eq!(outcome, Outcome::Failed("boom".to_string()));
    assert_eq!(updates, vec![StreamUpdate::failed("boom")]);
    assert_eq!(pulls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_error_envelope_with_object_message_stops_reading() {
    let body = concat!(
        "data: {\"code\":500,\"message\":{\"detail\":\"db down\"}}\n\n",
        "data: {\"code\":0,\"data\":{\"answer\":\"after error\"}}\n\n",
        "data: {\"code\":0,\"data\":true}\n\n",
    );
    let (outcome, updates) = collect(&ReplayTransport::from_chunks([body])).await;

    let message = r#"{"detail":"db down"}"#;
    assert_eq!(outcome, Outcome::Failed(message.to_string()));
    assert_eq!(updates, vec![StreamUpdate::failed(message)]);
}

#[tokio::test]
async fn test_error_envelope_with_float_code() {
    let body = concat!(
        "data: {\"code\":1.0,\"message\":\"boom\"}\n\n",
        "data: {\"code\":0,\"data\":true}\n\n",
    );
    let (outcome, updates) = collect(&ReplayTransport::from_chunks([body])).await;

    assert_eq!(outcome, Outcome::Failed("boom".to_string()));
    assert_eq!(updates, vec![StreamUpdate::failed("boom")]);
}

#[tokio::test]
async fn test_done_stops_reading() {
    let pulls = Arc::new(AtomicUsize::new(0));
    let chunks = counted(
        vec![
            "data: {\"code\":0,\"data\":true}\n\n",
            "data: {\"code\":0,\"data\":{\"answer\":\"extra\"}}\n\n",
        ],
        pulls.clone(),
    );

    let mut updates = Vec::new();
    let outcome = StreamSession::new().run(chunks, |u| updates.push(u)).await;

    assert_eq!(outcome, Outcome::Done);
    assert_eq!(updates, vec![StreamUpdate::finished()]);
    assert_eq!(pulls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_hung_stream_after_partial() {
    let pulls = Arc::new(AtomicUsize::new(0));
    let first = counted(
        vec!["data: {\"code\":0,\"data\":{\"answer\":\"Hel\"}}\n\n"],
        pulls.clone(),
    );
    // the connection never delivers anything else
    let chunks: ChunkStream = Box::pin(first.chain(stream::pending()));

    let session = StreamSession::new();
    let handle = session.cancel_handle();
    let mut updates = Vec::new();

    let (outcome, ()) = tokio::join!(session.run(chunks, |u| updates.push(u)), async {
        tokio::task::yield_now().await;
        handle.cancel();
        handle.cancel();
    });

    assert_eq!(outcome, Outcome::Cancelled);
    assert_eq!(
        updates,
        vec![StreamUpdate::partial("Hel"), StreamUpdate::finished()]
    );
    assert_eq!(pulls.load(Ordering::SeqCst), 1);
    assert!(handle.is_cancelled());
}

#[tokio::test]
async fn test_cancel_after_done_adds_nothing() {
    let session = StreamSession::new();
    let handle = session.cancel_handle();
    let mut updates = Vec::new();

    let outcome = session
        .send(
            &ReplayTransport::from_chunks(["data: {\"code\":0,\"data\":true}\n"]),
            &request(),
            |u| updates.push(u),
        )
        .await;
    handle.cancel();

    assert_eq!(outcome, Outcome::Done);
    assert_eq!(updates, vec![StreamUpdate::finished()]);
}

#[tokio::test]
async fn test_truncated_tail_is_dropped() {
    let transport = ReplayTransport::from_chunks([
        "data: {\"code\":0,\"data\":{\"answer\":\"Hi\"}}\n\n",
        "data: {\"code\":0,\"data\":{\"answ",
    ]);
    let (outcome, updates) = collect(&transport).await;

    assert_eq!(outcome, Outcome::Ended);
    assert_eq!(
        updates,
        vec![StreamUpdate::partial("Hi"), StreamUpdate::finished()]
    );
}

#[tokio::test]
async fn test_empty_body() {
    let (outcome, updates) = collect(&ReplayTransport::from_chunks(Vec::<Bytes>::new())).await;

    assert_eq!(outcome, Outcome::Ended);
    assert_eq!(updates, vec![StreamUpdate::finished()]);
}
