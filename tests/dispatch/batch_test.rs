//! Batch partitioning, pacing, aggregation and cancellation.

use std::time::Duration;

use herald::dispatch::BatchDispatcher;
use herald::providers::{ProviderError, ProviderReceipt};
use herald::types::SendOptions;
use tokio_util::sync::CancellationToken;

use crate::support::{addresses, chain_of, ScriptedProvider};

fn dispatcher(provider: &std::sync::Arc<ScriptedProvider>) -> BatchDispatcher {
    BatchDispatcher::new(chain_of(&[provider.clone()], 3))
        .with_batch_size(5)
        .with_pacing(Duration::ZERO)
}

#[tokio::test]
async fn twelve_addresses_go_out_in_three_ordered_batches() {
    let provider = ScriptedProvider::succeeding("primary", 1);
    let list = addresses(12);

    let outcome = dispatcher(&provider)
        .send_to_recipients(&list, "Test", "Hello", &SendOptions::default())
        .await;

    let seen = provider.seen();
    let sizes: Vec<usize> = seen.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![5, 5, 2]);
    assert_eq!(seen.concat(), list);

    assert!(outcome.success);
    assert_eq!(outcome.sent_count, 12);
    assert_eq!(outcome.failed_count, 0);
    assert_eq!(outcome.sent_emails, list);
    assert_eq!(outcome.message, "sent to 12/12 recipients");
}

#[tokio::test]
async fn partial_success_is_aggregated() {
    let provider = ScriptedProvider::new("primary", 1, |_, request| {
        if request.recipients.emails.iter().any(|e| e == "user5@example.com") {
            Err(ProviderError::Terminal("rejected".to_owned()))
        } else {
            Ok(ProviderReceipt::new("ok"))
        }
    });
    let list = addresses(12);

    let outcome = dispatcher(&provider)
        .send_to_recipients(&list, "Test", "Hello", &SendOptions::default())
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.sent_count, 7);
    assert_eq!(outcome.failed_count, 5);
    assert_eq!(outcome.failed_emails, list.get(5..10).unwrap_or_default().to_vec());
    assert_eq!(outcome.message, "sent to 7/12 recipients");
    assert_eq!(
        outcome.errors,
        vec![
            "batch 2: all providers failed; last error: rejected".to_owned(),
            "batch 2: primary (attempt 1): rejected".to_owned(),
        ]
    );
    // A failed batch does not stop the next one.
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn every_batch_failing_is_a_failure() {
    let provider = ScriptedProvider::terminal("primary", 1);
    let outcome = dispatcher(&provider)
        .send_to_recipients(&addresses(7), "Test", "Hello", &SendOptions::default())
        .await;
    assert!(!outcome.success);
    assert_eq!(outcome.sent_count, 0);
    assert_eq!(outcome.failed_count, 7);
    assert_eq!(outcome.message, "delivery failed for all recipients");
}

#[tokio::test]
async fn malformed_address_fails_only_its_batch() {
    let provider = ScriptedProvider::succeeding("primary", 1);
    let mut list = addresses(12);
    if let Some(slot) = list.get_mut(6) {
        *slot = "broken".to_owned();
    }

    let outcome = dispatcher(&provider)
        .send_to_recipients(&list, "Test", "Hello", &SendOptions::default())
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.sent_count, 7);
    assert_eq!(outcome.failed_count, 5);
    assert_eq!(
        outcome.errors.first().map(String::as_str),
        Some("batch 2: validation failed: invalid email address: broken")
    );
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn empty_list_and_blank_subject_are_rejected_up_front() {
    let provider = ScriptedProvider::succeeding("primary", 1);
    let dispatcher = dispatcher(&provider);

    let empty = dispatcher
        .send_to_recipients(&[], "Test", "Hello", &SendOptions::default())
        .await;
    assert!(!empty.success);
    assert_eq!(empty.sent_count, 0);
    assert_eq!(
        empty.message,
        "validation failed: at least one recipient is required"
    );

    let blank = dispatcher
        .send_to_recipients(&addresses(3), " ", "Hello", &SendOptions::default())
        .await;
    assert!(!blank.success);
    assert_eq!(blank.failed_count, 3);
    assert_eq!(blank.message, "validation failed: subject is required");

    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn options_reach_every_batch() {
    let provider = ScriptedProvider::new("primary", 1, |_, request| {
        if request.html && request.template_id.as_deref() == Some("welcome") {
            Ok(ProviderReceipt::new("ok"))
        } else {
            Err(ProviderError::Terminal("options lost".to_owned()))
        }
    });
    let options = SendOptions {
        html: true,
        html_content: Some("<p>Hello</p>".to_owned()),
        template_id: Some("welcome".to_owned()),
        ..SendOptions::default()
    };
    let outcome = dispatcher(&provider)
        .send_to_recipients(&addresses(6), "Test", "Hello", &options)
        .await;
    assert_eq!(outcome.sent_count, 6);
}

#[tokio::test(start_paused = true)]
async fn batches_are_paced() {
    let provider = ScriptedProvider::succeeding("primary", 1);
    let dispatcher = dispatcher(&provider).with_pacing(Duration::from_millis(500));

    let started = tokio::time::Instant::now();
    let outcome = dispatcher
        .send_to_recipients(&addresses(12), "Test", "Hello", &SendOptions::default())
        .await;
    assert!(outcome.success);
    // Two pauses between three batches, none after the last.
    assert_eq!(started.elapsed(), Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn cancellation_skips_unstarted_batches() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let provider = ScriptedProvider::new("primary", 1, move |call, _| {
        if call == 1 {
            trigger.cancel();
        }
        Ok(ProviderReceipt::new("ok"))
    });
    let dispatcher = dispatcher(&provider).with_pacing(Duration::from_secs(60));

    let started = tokio::time::Instant::now();
    let outcome = dispatcher
        .send_to_recipients_cancellable(
            &addresses(12),
            "Test",
            "Hello",
            &SendOptions::default(),
            &cancel,
        )
        .await;

    // The in-flight batch completed; the pacing pause was cut short.
    assert_eq!(provider.calls(), 1);
    assert!(started.elapsed() < Duration::from_secs(60));
    assert!(outcome.success);
    assert_eq!(outcome.sent_count, 5);
    assert_eq!(outcome.failed_count, 7);
    assert_eq!(
        outcome.errors,
        vec!["batch 2: cancelled".to_owned(), "batch 3: cancelled".to_owned()]
    );
}

#[tokio::test]
async fn cancelled_before_start_sends_nothing() {
    let provider = ScriptedProvider::succeeding("primary", 1);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = dispatcher(&provider)
        .send_to_recipients_cancellable(
            &addresses(3),
            "Test",
            "Hello",
            &SendOptions::default(),
            &cancel,
        )
        .await;
    assert!(!outcome.success);
    assert_eq!(outcome.failed_count, 3);
    assert_eq!(provider.calls(), 0);
}
