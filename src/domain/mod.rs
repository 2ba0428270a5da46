//! Exchange-agnostic domain types.

mod book;
mod current_order;
mod exposure;
mod id;
mod money;
mod runner_context;

pub mod order;

// Identifiers
pub use id::{
    BetId, ClientId, MarketId, OrderId, SelectionKey, StrategyName, TradeId,
    CUSTOMER_ORDER_REF_MAX_LENGTH, STRATEGY_NAME_HASH_LENGTH,
};
pub use money::{round_money, Price, Size};

// Exchange resources
pub use book::{
    MarketBook, MarketCatalogue, MarketDefinition, MarketStatus, RunnerBook, RunnerStatus,
};
pub use current_order::{
    ClearedMarket, ClearedMarkets, ClearedOrder, ClearedOrders, CurrentOrder, CurrentOrderStatus,
    CurrentOrders,
};

// Orders, trades and exposure
pub use exposure::{calculate_matched_exposure, calculate_unmatched_exposure, Exposures};
pub use order::{
    LimitOnCloseOrder, LimitOrder, MarketOnCloseOrder, Order, OrderPackage, OrderPackageType,
    OrderStatus, OrderType, OrderUpdate, PersistenceType, PriceLadder, Settlement, Side, Trade,
    TradeStatus,
};
pub use runner_context::RunnerContext;
