//! Execution-stream framing
//!
//! The backend streams server-sent events; each `data:` payload is one record.
//! Transport chunks may split a record (or a UTF-8 sequence) anywhere, so framing
//! is left to `eventsource-stream`.

use crate::error::{InspectorError, Result};
use eventsource_stream::{EventStreamError, Eventsource};
use futures::{Stream, StreamExt};

/// Payloads of the complete records carried by `chunks`, trimmed.
///
/// Empty payloads and records without a `data:` field are skipped. An incomplete
/// trailing record is dropped when the transport closes.
pub fn records<S>(chunks: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = Result<Vec<u8>>>,
{
    chunks.eventsource().filter_map(|event| async move {
        match event {
            Ok(event) => {
                let payload = event.data.trim();
                if payload.is_empty() {
                    log::debug!("Skipping empty record (event: {:?})", event.event);
                    None
                } else {
                    Some(Ok(payload.to_string()))
                }
            }
            Err(EventStreamError::Transport(e)) => Some(Err(e)),
            Err(e) => Some(Err(InspectorError::InvalidStream(e.to_string()))),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(chunks: &[&[u8]]) -> Vec<String> {
        let chunks: Vec<Result<Vec<u8>>> = chunks.iter().map(|c| Ok(c.to_vec())).collect();
        records(futures::stream::iter(chunks))
            .filter_map(|r| async move { r.ok() })
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_complete_records() {
        let payloads = collect(&[b"data: [1/2] step (running)\n\ndata: hello\n\n".as_slice()]).await;
        assert_eq!(payloads, vec!["[1/2] step (running)", "hello"]);
    }

    #[tokio::test]
    async fn test_record_split_across_chunks() {
        let payloads = collect(&[
            b"data: [DONE] EXIT".as_slice(),
            b"_CODE: 0\n".as_slice(),
            b"\ndata: next\n\n".as_slice(),
        ]).await;
        assert_eq!(payloads, vec!["[DONE] EXIT_CODE: 0", "next"]);
    }

    #[tokio::test]
    async fn test_multibyte_character_split_across_chunks() {
        let record = "data: ✓ done\n\n".as_bytes();
        // Split inside the three-byte check mark
        let payloads = collect(&[&record[..7], &record[7..]]).await;
        assert_eq!(payloads, vec!["✓ done"]);
    }

    #[tokio::test]
    async fn test_skips_comments_and_empty_records() {
        let payloads = collect(&[b": keep-alive\n\ndata: \n\nevent: x\n\ndata: ok\n\n".as_slice()]).await;
        assert_eq!(payloads, vec!["ok"]);
    }

    #[tokio::test]
    async fn test_crlf_framing() {
        let payloads = collect(&[b"data: one\r\n\r\ndata: two\r\n\r\n".as_slice()]).await;
        assert_eq!(payloads, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_transport_error_is_passed_through() {
        let chunks: Vec<Result<Vec<u8>>> = vec![
            Ok(b"data: first\n\n".to_vec()),
            Err(InspectorError::StepFailed("connection reset".into())),
        ];
        let results: Vec<Result<String>> = records(futures::stream::iter(chunks)).collect().await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().ok().map(String::as_str), Some("first"));
        assert!(matches!(results[1], Err(InspectorError::StepFailed(_))));
    }
}
