// Guestbook runtime: transaction lifecycle for on-chain guestbooks
//
// SPDX-License-Identifier: Apache-2.0
//
// Written in 2025 by the Guestbook contributors.
//
// Copyright (C) 2025 Guestbook contributors. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express
// or implied. See the License for the specific language governing permissions and limitations under
// the License.

mod utils;

use std::sync::Arc;

use guestbook::{Mining, OperationError, OperationKind, Reconciler, TxStatus};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::utils::bob;
use crate::utils::runtime::{wait_status, TestGuestbook};

fn counter(initial: u64) -> Reconciler<u64, u64, String> {
    Reconciler::new(initial, |count, add| count + add)
}

#[tokio::test]
async fn failure_restores_exact_value() {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let reconciler = counter(5).on_error({
        let errors = errors.clone();
        move |err: &String, restored: &u64| errors.lock().push((err.clone(), *restored))
    });

    let res = reconciler
        .mutate(1, async {
            assert_eq!(reconciler.effective(), 6);
            assert!(reconciler.is_pending());
            Err::<(), _>("nonce too low".to_owned())
        })
        .await;

    assert_eq!(res, Err("nonce too low".to_owned()));
    assert_eq!(reconciler.effective(), 5);
    assert_eq!(reconciler.authoritative(), 5);
    assert!(!reconciler.is_pending());
    assert_eq!(*errors.lock(), vec![("nonce too low".to_owned(), 5)]);
}

#[tokio::test]
async fn subscribers_see_speculative_value() {
    let reconciler = counter(0);
    let mut rx = reconciler.subscribe();

    reconciler
        .mutate(3, async {
            rx.changed().await.unwrap();
            let view = rx.borrow_and_update().clone();
            assert_eq!(*view.effective(), 3);
            assert_eq!(*view.authoritative(), 0);
            assert_eq!(view.speculative(), Some(&3));
            Ok::<_, String>(())
        })
        .await
        .unwrap();

    rx.changed().await.unwrap();
    assert!(!rx.borrow().is_pending());
}

#[tokio::test]
async fn mutations_are_serialized() {
    let reconciler = counter(0);
    let log = Mutex::new(Vec::new());
    let (tx, rx) = oneshot::channel::<()>();
    let (reconciler, log) = (&reconciler, &log);

    let first = reconciler.mutate(1, async move {
        log.lock().push("first started");
        rx.await.unwrap();
        log.lock().push("first settled");
        Ok::<_, String>(())
    });
    let second = reconciler.mutate(10, async move {
        assert_eq!(reconciler.effective(), 10);
        log.lock().push("second started");
        Ok::<_, String>(())
    });
    let release = async move {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(reconciler.effective(), 1);
        assert_eq!(*log.lock(), vec!["first started"]);
        tx.send(()).unwrap();
    };

    let (first, second, _) = tokio::join!(first, second, release);
    first.unwrap();
    second.unwrap();
    assert_eq!(*log.lock(), vec!["first started", "first settled", "second started"]);
    assert!(!reconciler.is_pending());
}

#[tokio::test]
async fn fresher_authoritative_value_survives_rollback() {
    let restored = Arc::new(Mutex::new(None));
    let reconciler = counter(7).on_error({
        let restored = restored.clone();
        move |_: &String, value: &u64| *restored.lock() = Some(*value)
    });

    let res = reconciler
        .mutate(1, async {
            reconciler.set_authoritative(42);
            assert_eq!(reconciler.effective(), 8);
            Err::<(), _>("replaced".to_owned())
        })
        .await;

    assert!(res.is_err());
    assert_eq!(reconciler.effective(), 42);
    assert_eq!(*restored.lock(), Some(42));
}

#[tokio::test]
async fn dropped_mutation_rolls_back() {
    let reconciler = counter(2);
    {
        let mutation = reconciler.mutate(5, std::future::pending::<Result<(), String>>());
        tokio::pin!(mutation);
        tokio::select! {
            biased;
            _ = &mut mutation => unreachable!(),
            _ = tokio::task::yield_now() => {}
        }
        assert_eq!(reconciler.effective(), 7);
    }
    assert_eq!(reconciler.effective(), 2);
    assert!(!reconciler.is_pending());
}

#[tokio::test]
async fn reaction_count_follows_ledger() {
    let gb = TestGuestbook::new(Mining::Auto);
    let reactions = Reconciler::<u64, (), OperationError>::new(3, |count, _| count + 1);

    gb.ledger.revert_next("already reacted");
    let err = reactions
        .mutate((), gb.react(bob(), 0))
        .await
        .unwrap_err();
    assert!(matches!(err, OperationError::Reverted(_, ref reason) if reason == "already reacted"));
    assert_eq!(reactions.effective(), 3);

    reactions.mutate((), gb.react(bob(), 0)).await.unwrap();
    assert!(!reactions.is_pending());
    reactions.set_authoritative(4);
    assert_eq!(reactions.effective(), 4);
}

#[tokio::test]
async fn optimistic_value_while_confirming() {
    let gb = TestGuestbook::new(Mining::Manual);
    let reactions = Reconciler::<u64, (), OperationError>::new(0, |count, _| count + 1);

    let mutation = reactions.mutate((), gb.react(bob(), 1));
    let observer = async {
        wait_status(gb.controller(OperationKind::React), TxStatus::Pending).await;
        assert_eq!(reactions.effective(), 1);
        assert_eq!(reactions.authoritative(), 0);
        gb.ledger.mine(1);
    };
    let (res, _) = tokio::join!(mutation, observer);
    res.unwrap();
    assert_eq!(gb.record(OperationKind::React).status(), TxStatus::Confirmed);
}
