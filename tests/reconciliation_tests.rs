//! Integration tests for reconciling local orders with exchange state.

mod support;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use betflow::config::Config;
use betflow::domain::{
    BetId, CurrentOrderStatus, MarketId, OrderId, OrderPackageType, OrderStatus, SelectionKey,
    StrategyName, TradeStatus,
};
use betflow::engine::Engine;
use betflow::testkit::domain::current_order_for;
use betflow::testkit::executor::RecordingExecutor;
use betflow::testkit::strategy::RecordingStrategy;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use support::engine::{book_event, process_all, recording_engine, simulated_engine};
use support::orders::{current_orders, order, place_back, report};

/// An engine whose strategy places one back order of 4 @ 2.0 on the first book.
fn engine_with_order() -> (Engine, RecordingExecutor, OrderId) {
    let (mut engine, executor) = recording_engine(&Config::default());
    let placed = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&placed);
    let strategy = RecordingStrategy::new("s1").on_market_book(move |ctx, _book| {
        if ctx.market().blotter().is_active() {
            return Ok(());
        }
        let mut tx = ctx.transaction()?;
        let (order_id, _) = place_back(&mut tx, "s1", 1, dec!(2.0), dec!(4), None, false)?;
        *slot.lock() = Some(order_id);
        Ok(())
    });
    engine.add_strategy(Box::new(strategy)).unwrap();
    process_all(&mut engine, book_event("1.23", &[1]));
    let order_id = placed.lock().clone().unwrap();
    (engine, executor, order_id)
}

fn live_trade_count(engine: &Engine) -> usize {
    engine
        .markets()
        .get(&MarketId::from("1.23"))
        .unwrap()
        .runner_context(&StrategyName::from("s1"), SelectionKey::new(1))
        .map_or(0, |context| context.live_trade_count())
}

#[test]
fn executable_report_adopts_bet_id() {
    let (mut engine, _, order_id) = engine_with_order();
    assert!(order(&engine, "1.23", &order_id).bet_id().is_none());

    let event = report(
        order(&engine, "1.23", &order_id),
        "42",
        CurrentOrderStatus::Executable,
        Decimal::ZERO,
    );
    process_all(&mut engine, event);

    let reconciled = order(&engine, "1.23", &order_id);
    assert_eq!(reconciled.bet_id(), Some(&BetId::from("42")));
    assert_eq!(reconciled.status(), OrderStatus::Executable);
    let confirmed = reconciled.date_time_placed_confirmed();
    assert!(confirmed.is_some());
    let market = engine.markets().get(&MarketId::from("1.23")).unwrap();
    assert_eq!(
        market.blotter().get_order_by_bet_id(&BetId::from("42")).unwrap().id(),
        &order_id
    );

    let again = report(
        order(&engine, "1.23", &order_id),
        "42",
        CurrentOrderStatus::Executable,
        dec!(1),
    );
    process_all(&mut engine, again);
    assert_eq!(
        order(&engine, "1.23", &order_id).date_time_placed_confirmed(),
        confirmed
    );
}

#[test]
fn process_orders_receives_live_orders_after_reconciliation() {
    let (mut engine, _) = recording_engine(&Config::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);
    let strategy = RecordingStrategy::new("s1")
        .on_market_book(|ctx, _book| {
            if ctx.market().blotter().is_active() {
                return Ok(());
            }
            let mut tx = ctx.transaction()?;
            place_back(&mut tx, "s1", 1, dec!(2.0), dec!(4), None, false)?;
            Ok(())
        })
        .on_orders(move |_ctx, order_ids| {
            record.lock().push(order_ids.to_vec());
            Ok(())
        });
    let calls = strategy.calls();
    engine.add_strategy(Box::new(strategy)).unwrap();
    process_all(&mut engine, book_event("1.23", &[1]));

    let order_id = engine
        .markets()
        .get(&MarketId::from("1.23"))
        .unwrap()
        .blotter()
        .live_order_ids()[0]
        .clone();
    let event = report(
        order(&engine, "1.23", &order_id),
        "1",
        CurrentOrderStatus::Executable,
        Decimal::ZERO,
    );
    process_all(&mut engine, event);

    assert_eq!(calls.orders(), 1);
    assert_eq!(*seen.lock(), vec![vec![order_id]]);
}

#[test]
fn completion_is_idempotent_and_resets_runner_context() {
    let (mut engine, _, order_id) = engine_with_order();
    assert_eq!(live_trade_count(&engine), 1);

    let complete = report(
        order(&engine, "1.23", &order_id),
        "1",
        CurrentOrderStatus::ExecutionComplete,
        dec!(4),
    );
    process_all(&mut engine, complete.clone());

    let completed = order(&engine, "1.23", &order_id);
    assert_eq!(completed.status(), OrderStatus::ExecutionComplete);
    assert_eq!(completed.size_matched(), dec!(4));
    let log_len = completed.status_log().len();
    let market = engine.markets().get(&MarketId::from("1.23")).unwrap();
    assert!(market.blotter().live_order_ids().is_empty());
    let trade = market.blotter().trade(completed.trade_id()).unwrap();
    assert_eq!(trade.status(), TradeStatus::Complete);
    assert!(trade.date_time_complete().is_some());
    assert_eq!(live_trade_count(&engine), 0);

    process_all(&mut engine, complete);

    let again = order(&engine, "1.23", &order_id);
    assert_eq!(again.status(), OrderStatus::ExecutionComplete);
    assert_eq!(again.status_log().len(), log_len);
}

#[test]
fn expired_without_match_is_expired() {
    let (mut engine, _, order_id) = engine_with_order();
    let event = report(
        order(&engine, "1.23", &order_id),
        "1",
        CurrentOrderStatus::Expired,
        Decimal::ZERO,
    );
    process_all(&mut engine, event);

    assert_eq!(order(&engine, "1.23", &order_id).status(), OrderStatus::Expired);
}

#[test]
fn expired_with_partial_match_is_complete() {
    let (mut engine, _, order_id) = engine_with_order();
    let event = report(
        order(&engine, "1.23", &order_id),
        "1",
        CurrentOrderStatus::Expired,
        dec!(1),
    );
    process_all(&mut engine, event);

    let reconciled = order(&engine, "1.23", &order_id);
    assert_eq!(reconciled.status(), OrderStatus::ExecutionComplete);
    assert_eq!(reconciled.size_matched(), dec!(1));
}

#[test]
fn cancel_reverts_to_executable_while_unmatched_size_remains() {
    let (mut engine, executor, order_id) = engine_with_order();
    let event = report(
        order(&engine, "1.23", &order_id),
        "1",
        CurrentOrderStatus::Executable,
        Decimal::ZERO,
    );
    process_all(&mut engine, event);

    // Cancel half of the order from the next book.
    let cancelled = Arc::new(AtomicBool::new(false));
    let id = order_id.clone();
    let flag = Arc::clone(&cancelled);
    let strategy = RecordingStrategy::new("s2").on_market_book(move |ctx, _book| {
        if flag.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut tx = ctx.transaction()?;
        tx.cancel_order(&id, Some(dec!(2)), false)?;
        Ok(())
    });
    engine.add_strategy(Box::new(strategy)).unwrap();
    process_all(&mut engine, book_event("1.23", &[1]));

    assert_eq!(order(&engine, "1.23", &order_id).status(), OrderStatus::Cancelling);
    let last = executor.packages().pop().unwrap();
    assert_eq!(last.package_type(), OrderPackageType::Cancel);

    let mut current = current_order_for(
        order(&engine, "1.23", &order_id),
        "1",
        CurrentOrderStatus::Executable,
    );
    current.size_cancelled = dec!(2);
    current.size_remaining = dec!(2);
    process_all(&mut engine, current_orders(vec![current]));

    let reconciled = order(&engine, "1.23", &order_id);
    assert_eq!(reconciled.status(), OrderStatus::Executable);
    assert_eq!(reconciled.size_remaining(), dec!(2));
}

#[test]
fn mismatched_bet_id_without_replacement_is_skipped() {
    let (mut engine, _, order_id) = engine_with_order();
    let event = report(
        order(&engine, "1.23", &order_id),
        "1",
        CurrentOrderStatus::Executable,
        Decimal::ZERO,
    );
    process_all(&mut engine, event);

    let stray = report(
        order(&engine, "1.23", &order_id),
        "999",
        CurrentOrderStatus::ExecutionComplete,
        dec!(4),
    );
    process_all(&mut engine, stray);

    let unchanged = order(&engine, "1.23", &order_id);
    assert_eq!(unchanged.status(), OrderStatus::Executable);
    assert_eq!(unchanged.bet_id(), Some(&BetId::from("1")));
}

#[test]
fn mismatched_bet_id_updates_the_order_holding_that_bet_id() {
    let (mut engine, _) = recording_engine(&Config::default());
    let placed = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&placed);
    let strategy = RecordingStrategy::new("s1").on_market_book(move |ctx, _book| {
        if ctx.market().blotter().is_active() {
            return Ok(());
        }
        let mut tx = ctx.transaction()?;
        for selection_id in [1, 2] {
            let (order_id, _) =
                place_back(&mut tx, "s1", selection_id, dec!(2.0), dec!(4), None, false)?;
            record.lock().push(order_id);
        }
        Ok(())
    });
    engine.add_strategy(Box::new(strategy)).unwrap();
    process_all(&mut engine, book_event("1.23", &[1, 2]));
    let (first, second) = {
        let placed = placed.lock();
        (placed[0].clone(), placed[1].clone())
    };
    let confirm = current_orders(vec![
        current_order_for(order(&engine, "1.23", &first), "10", CurrentOrderStatus::Executable),
        current_order_for(order(&engine, "1.23", &second), "20", CurrentOrderStatus::Executable),
    ]);
    process_all(&mut engine, confirm);

    // first order's reference, second order's bet id
    let crossed = report(
        order(&engine, "1.23", &first),
        "20",
        CurrentOrderStatus::ExecutionComplete,
        dec!(4),
    );
    process_all(&mut engine, crossed);

    let untouched = order(&engine, "1.23", &first);
    assert_eq!(untouched.status(), OrderStatus::Executable);
    assert_eq!(untouched.bet_id(), Some(&BetId::from("10")));
    assert_eq!(untouched.size_matched(), Decimal::ZERO);

    let resolved = order(&engine, "1.23", &second);
    assert_eq!(resolved.status(), OrderStatus::ExecutionComplete);
    assert_eq!(resolved.bet_id(), Some(&BetId::from("20")));
    assert_eq!(resolved.size_matched(), dec!(4));
}

#[test]
fn unknown_references_are_ignored() {
    let (mut engine, _, order_id) = engine_with_order();
    let mut foreign = current_order_for(
        order(&engine, "1.23", &order_id),
        "7",
        CurrentOrderStatus::Executable,
    );
    foreign.market_id = MarketId::from("9.99");
    let mut unreferenced = foreign.clone();
    unreferenced.market_id = MarketId::from("1.23");
    unreferenced.customer_order_ref = None;

    process_all(&mut engine, current_orders(vec![foreign, unreferenced]));

    assert_eq!(order(&engine, "1.23", &order_id).status(), OrderStatus::Pending);
}

#[test]
fn simulated_replace_moves_to_the_replacement_order() {
    let mut engine = simulated_engine(&Config::default(), false);
    let replaced = Arc::new(AtomicBool::new(false));
    let strategy = RecordingStrategy::new("s1")
        .on_market_book(|ctx, _book| {
            if ctx.market().blotter().is_active() {
                return Ok(());
            }
            let mut tx = ctx.transaction()?;
            place_back(&mut tx, "s1", 1, dec!(2.0), dec!(4), None, false)?;
            Ok(())
        })
        .on_orders(move |ctx, order_ids| {
            if replaced.swap(true, Ordering::SeqCst) {
                return Ok(());
            }
            let mut tx = ctx.transaction()?;
            tx.replace_order(&order_ids[0], dec!(3.0), None, false)?;
            Ok(())
        });
    engine.add_strategy(Box::new(strategy)).unwrap();

    process_all(&mut engine, book_event("1.23", &[1]));

    let market = engine.markets().get(&MarketId::from("1.23")).unwrap();
    assert_eq!(market.blotter().len(), 2);
    let replacement = market
        .blotter()
        .iter()
        .find(|o| o.replacement_of().is_some())
        .unwrap();
    let original = market
        .blotter()
        .get(replacement.replacement_of().unwrap())
        .unwrap();

    assert_eq!(original.status(), OrderStatus::ExecutionComplete);
    assert_eq!(original.size_cancelled(), dec!(4));
    assert_eq!(original.replaced_by(), Some(replacement.id()));

    assert_eq!(replacement.replacement_of(), Some(original.id()));
    assert_eq!(replacement.status(), OrderStatus::Executable);
    assert_eq!(replacement.bet_id(), Some(&BetId::from("2")));
    assert_eq!(replacement.order_type().price(), Some(dec!(3.0)));
    assert_eq!(replacement.trade_id(), original.trade_id());
    assert_eq!(market.blotter().live_order_ids(), &[replacement.id().clone()]);
}
