//! End-to-end matching scenarios against a single engine instance.

use std::sync::{Arc, Mutex};

use exchange_core::{
    BookSnapshot, ExecutedTrade, MatchingEngine, Order, OrderType, PersistenceGateway, Side,
};

fn submit_limit(engine: &mut MatchingEngine, owner: &str, side: Side, size: u64, price: u64) -> Vec<ExecutedTrade> {
    let id = engine.next_order_id();
    engine
        .match_limit(Order::limit(id, owner, side, size, price))
        .expect("valid limit order")
}

fn submit_market(engine: &mut MatchingEngine, owner: &str, side: Side, size: u64) -> Vec<ExecutedTrade> {
    let id = engine.next_order_id();
    engine
        .match_market(Order::market(id, owner, side, size))
        .expect("valid market order")
}

fn submit_stop(engine: &mut MatchingEngine, owner: &str, side: Side, size: u64, stop_price: u64) -> u64 {
    let id = engine.next_order_id();
    engine
        .insert_stop(Order::stop(id, owner, side, size, stop_price))
        .expect("valid stop order");
    id
}

fn total_resting(engine: &MatchingEngine, side: Side, price: u64) -> u64 {
    engine
        .book()
        .limit_levels(side)
        .get(&price)
        .map(|level| level.iter().map(|o| o.remaining()).sum())
        .unwrap_or(0)
}

#[test]
fn partial_fill_rests_the_remainder_at_maker_price() {
    // Empty book; ask 10@50 rests; bid 4@55 crosses.
    let mut engine = MatchingEngine::new();
    assert!(submit_limit(&mut engine, "seller", Side::Ask, 10, 50).is_empty());

    let trades = submit_limit(&mut engine, "buyer", Side::Bid, 4, 55);
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].size, 4);
    assert_eq!(trades[0].price, 50); // maker's price, not 55
    assert_eq!(trades[0].buyer, "buyer");
    assert_eq!(trades[0].seller, "seller");
    assert_eq!(trades[0].aggressor_side, Side::Bid);

    // Ask book shows remaining 6 at 50; the bid was fully consumed.
    assert_eq!(total_resting(&engine, Side::Ask, 50), 6);
    assert!(engine.book().limit_levels(Side::Bid).is_empty());
}

#[test]
fn price_time_priority_within_a_level() {
    let mut engine = MatchingEngine::new();
    submit_limit(&mut engine, "first", Side::Ask, 5, 100);
    submit_limit(&mut engine, "second", Side::Ask, 5, 100);

    let trades = submit_limit(&mut engine, "buyer", Side::Bid, 7, 100);
    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].seller, "first");
    assert_eq!(trades[0].size, 5);
    assert_eq!(trades[1].seller, "second");
    assert_eq!(trades[1].size, 2);
    assert_eq!(total_resting(&engine, Side::Ask, 100), 3);
}

#[test]
fn best_price_first_across_levels() {
    let mut engine = MatchingEngine::new();
    submit_limit(&mut engine, "cheap", Side::Ask, 5, 90);
    submit_limit(&mut engine, "dear", Side::Ask, 5, 110);

    // Crosses 90 but not 110; the walk must stop at the first
    // non-crossing level.
    let trades = submit_limit(&mut engine, "buyer", Side::Bid, 10, 100);
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].price, 90);
    assert_eq!(trades[0].size, 5);

    // Residual 5 rests on the bid side at 100.
    assert_eq!(total_resting(&engine, Side::Bid, 100), 5);
    assert_eq!(total_resting(&engine, Side::Ask, 110), 5);
}

#[test]
fn market_order_sweeps_and_discards_remainder() {
    let mut engine = MatchingEngine::new();
    submit_limit(&mut engine, "a", Side::Ask, 3, 90);
    submit_limit(&mut engine, "b", Side::Ask, 3, 110);

    let trades = submit_market(&mut engine, "buyer", Side::Bid, 10);
    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].price, 90);
    assert_eq!(trades[1].price, 110);
    assert_eq!(trades[0].order_type, OrderType::Market);

    // 4 units unfilled: never rests anywhere.
    assert!(engine.book().limit_levels(Side::Bid).is_empty());
    assert!(engine.book().limit_levels(Side::Ask).is_empty());
}

#[test]
fn market_order_on_empty_book_trades_nothing() {
    let mut engine = MatchingEngine::new();
    let trades = submit_market(&mut engine, "buyer", Side::Bid, 10);
    assert!(trades.is_empty());
    assert!(engine.book().limit_levels(Side::Bid).is_empty());
}

#[test]
fn bid_stop_triggers_at_or_above_its_price() {
    let mut engine = MatchingEngine::new();
    let stop_id = submit_stop(&mut engine, "stopper", Side::Bid, 5, 100);

    // Liquidity for both the triggering trade and the stop itself.
    submit_limit(&mut engine, "maker", Side::Ask, 2, 99);
    submit_limit(&mut engine, "maker", Side::Ask, 3, 100);
    submit_limit(&mut engine, "maker", Side::Ask, 5, 105);

    // Trade at 99: below the trigger, stop untouched.
    let trades = submit_limit(&mut engine, "buyer", Side::Bid, 2, 99);
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].price, 99);
    assert!(engine.book().contains(stop_id));

    // Trade at 100: stop fires and its synthetic market bid takes the
    // next level, tagged as a stop trade.
    let trades = submit_limit(&mut engine, "buyer", Side::Bid, 3, 100);
    assert!(trades.len() >= 2);
    assert_eq!(trades[0].order_type, OrderType::Limit);
    let stop_trades: Vec<_> = trades
        .iter()
        .filter(|t| t.order_type == OrderType::Stop)
        .collect();
    assert_eq!(stop_trades.iter().map(|t| t.size).sum::<u64>(), 5);
    assert!(stop_trades.iter().all(|t| t.buyer == "stopper"));
    assert!(!engine.book().contains(stop_id));
}

#[test]
fn ask_stop_needs_a_trade_at_or_below_its_price() {
    // Resting bid 5@100; ask stop at 90; market ask trades at 100.
    // 100 >= 90 is irrelevant for an ask stop: it needs price <= 90.
    let mut engine = MatchingEngine::new();
    submit_limit(&mut engine, "bidder", Side::Bid, 5, 100);
    let stop_id = submit_stop(&mut engine, "stopper", Side::Ask, 5, 90);

    let trades = submit_market(&mut engine, "seller", Side::Ask, 5);
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].price, 100);
    assert!(engine.book().contains(stop_id));

    // Now a trade at 90 fires it.
    submit_limit(&mut engine, "bidder", Side::Bid, 4, 90);
    submit_limit(&mut engine, "bidder", Side::Bid, 5, 90);
    let trades = submit_market(&mut engine, "seller", Side::Ask, 4);
    assert_eq!(trades[0].price, 90);
    let stop_trades: Vec<_> = trades
        .iter()
        .filter(|t| t.order_type == OrderType::Stop)
        .collect();
    assert_eq!(stop_trades.iter().map(|t| t.size).sum::<u64>(), 5);
    assert!(stop_trades.iter().all(|t| t.seller == "stopper"));
    assert!(!engine.book().contains(stop_id));
}

#[test]
fn stop_cascade_chains_until_no_trigger_crosses() {
    // First stop's execution moves the last price into the second
    // stop's trigger range.
    let mut engine = MatchingEngine::new();
    submit_stop(&mut engine, "s1", Side::Bid, 2, 101);
    submit_stop(&mut engine, "s2", Side::Bid, 2, 105);

    submit_limit(&mut engine, "maker", Side::Ask, 2, 101);
    submit_limit(&mut engine, "maker", Side::Ask, 2, 105);
    submit_limit(&mut engine, "maker", Side::Ask, 2, 120);

    // Aggressor lifts 101 and triggers s1; s1's market bid fills at
    // 105, which crosses s2's trigger, and s2 fills at 120.
    let trades = submit_limit(&mut engine, "buyer", Side::Bid, 2, 101);
    let prices: Vec<u64> = trades.iter().map(|t| t.price).collect();
    assert_eq!(prices, vec![101, 105, 120]);
    assert_eq!(trades[1].buyer, "s1");
    assert_eq!(trades[2].buyer, "s2");
    assert!(engine.book().stop_levels(Side::Bid).is_empty());
}

#[test]
fn cancel_is_idempotent() {
    let mut engine = MatchingEngine::new();
    let id = engine.next_order_id();
    engine
        .match_limit(Order::limit(id, "a", Side::Bid, 5, 100))
        .unwrap();

    assert!(engine.cancel(id));
    assert!(!engine.cancel(id));
    assert!(engine.book().limit_levels(Side::Bid).is_empty());
}

#[test]
fn cancel_works_for_stop_orders_too() {
    let mut engine = MatchingEngine::new();
    let id = submit_stop(&mut engine, "a", Side::Ask, 5, 90);
    assert!(engine.cancel(id));
    assert!(engine.book().stop_levels(Side::Ask).is_empty());
}

#[test]
fn restart_preserves_time_priority() {
    let mut engine = MatchingEngine::new();
    submit_limit(&mut engine, "first", Side::Ask, 5, 100);
    submit_limit(&mut engine, "second", Side::Ask, 5, 100);

    // Simulate restart: snapshot out, restore into a fresh engine.
    let snapshot = engine.book().snapshot();
    let mut restarted = MatchingEngine::new();
    restarted.restore(snapshot);

    let trades = submit_limit(&mut restarted, "buyer", Side::Bid, 5, 100);
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].seller, "first");
}

/// Gateway that records calls, for ordering assertions.
#[derive(Default)]
struct RecordingGateway {
    trades: Arc<Mutex<Vec<ExecutedTrade>>>,
    snapshots: Arc<Mutex<usize>>,
}

impl PersistenceGateway for RecordingGateway {
    fn append_trade(&mut self, trade: &ExecutedTrade) {
        self.trades.lock().unwrap().push(trade.clone());
    }

    fn snapshot_resting(&mut self, _snapshot: &BookSnapshot) {
        *self.snapshots.lock().unwrap() += 1;
    }
}

#[test]
fn trades_reach_the_gateway_in_execution_order() {
    let gateway = RecordingGateway::default();
    let trades_log = gateway.trades.clone();
    let snapshots = gateway.snapshots.clone();

    let mut engine = MatchingEngine::with_gateway(Box::new(gateway));
    submit_limit(&mut engine, "a", Side::Ask, 5, 90);
    submit_limit(&mut engine, "b", Side::Ask, 5, 100);
    let trades = submit_market(&mut engine, "buyer", Side::Bid, 10);

    let logged = trades_log.lock().unwrap();
    assert_eq!(*logged, trades);
    // One snapshot per mutating call.
    assert_eq!(*snapshots.lock().unwrap(), 3);
}
