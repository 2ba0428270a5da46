//! Immutable batches of order actions sent to an executor.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Order;
use crate::domain::id::{ClientId, MarketId};

/// Kind of exchange request a package represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderPackageType {
    Place,
    Cancel,
    Update,
    Replace,
}

impl OrderPackageType {
    pub const ALL: [Self; 4] = [Self::Place, Self::Cancel, Self::Update, Self::Replace];
}

impl fmt::Display for OrderPackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Place => "PLACE",
            Self::Cancel => "CANCEL",
            Self::Update => "UPDATE",
            Self::Replace => "REPLACE",
        };
        write!(f, "{s}")
    }
}

/// A batch of same-type order actions for one market and client.
///
/// Orders are snapshots taken when the package was built.
#[derive(Debug, Clone)]
pub struct OrderPackage {
    id: Uuid,
    client_id: ClientId,
    market_id: MarketId,
    package_type: OrderPackageType,
    orders: Vec<Order>,
    market_version: Option<u64>,
    bet_delay: u32,
    async_place: bool,
    date_time_created: DateTime<Utc>,
}

impl OrderPackage {
    pub fn new(
        client_id: ClientId,
        market_id: MarketId,
        package_type: OrderPackageType,
        orders: Vec<Order>,
        market_version: Option<u64>,
        bet_delay: u32,
        async_place: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            market_id,
            package_type,
            orders,
            market_version,
            bet_delay,
            async_place,
            date_time_created: Utc::now(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    #[must_use]
    pub fn market_id(&self) -> &MarketId {
        &self.market_id
    }

    #[must_use]
    pub fn package_type(&self) -> OrderPackageType {
        self.package_type
    }

    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    #[must_use]
    pub fn market_version(&self) -> Option<u64> {
        self.market_version
    }

    #[must_use]
    pub fn bet_delay(&self) -> u32 {
        self.bet_delay
    }

    #[must_use]
    pub fn async_place(&self) -> bool {
        self.async_place
    }

    #[must_use]
    pub fn date_time_created(&self) -> DateTime<Utc> {
        self.date_time_created
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

impl fmt::Display for OrderPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} package {} ({} orders, market {})",
            self.package_type,
            self.id,
            self.orders.len(),
            self.market_id
        )
    }
}
