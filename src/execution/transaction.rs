//! Batched order mutations against one market.

use std::mem;

use tracing::{debug, error, warn};

use super::Client;
use crate::config::ExecutionConfig;
use crate::control::{validate_all, ControlRequest, TradingControl};
use crate::domain::{
    Order, OrderId, OrderPackage, OrderPackageType, PersistenceType, Price, Size, Trade, TradeId,
};
use crate::error::{ControlError, ExecutionError, OrderError, Result};
use crate::market::Market;
use crate::strategy::Strategy;

type Pending = Vec<(OrderId, Option<u64>)>;

/// Result of [`Transaction::place_order`].
#[derive(Debug, Clone)]
pub enum PlaceOutcome {
    /// The order is in the blotter and queued for sending.
    Placed,
    /// A control rejected the order. It is returned with status `Violation`
    /// and was never added to the blotter.
    Violation(Box<Order>),
}

impl PlaceOutcome {
    #[must_use]
    pub fn is_placed(&self) -> bool {
        matches!(self, Self::Placed)
    }

    /// The rejected order, if a control rejected it.
    #[must_use]
    pub fn rejected(&self) -> Option<&Order> {
        match self {
            Self::Placed => None,
            Self::Violation(order) => Some(order),
        }
    }

    #[must_use]
    pub fn violation_msg(&self) -> Option<&str> {
        self.rejected().and_then(Order::violation_msg)
    }
}

/// Scope for placing, cancelling, updating and replacing orders in one
/// market on behalf of one client.
///
/// An immediate transaction sends every mutation as its own package. A
/// batched transaction queues them until [`Transaction::execute`] or drop,
/// then groups them by market version and splits each group by the package
/// limit. Controls run once, when the mutation is requested.
pub struct Transaction<'a> {
    market: &'a mut Market,
    client: &'a Client,
    controls: &'a [Box<dyn TradingControl>],
    strategy: &'a dyn Strategy,
    config: &'a ExecutionConfig,
    batched: bool,
    pending_place: Pending,
    pending_cancel: Pending,
    pending_update: Pending,
    pending_replace: Pending,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(
        market: &'a mut Market,
        client: &'a Client,
        controls: &'a [Box<dyn TradingControl>],
        strategy: &'a dyn Strategy,
        config: &'a ExecutionConfig,
        batched: bool,
    ) -> Self {
        Self {
            market,
            client,
            controls,
            strategy,
            config,
            batched,
            pending_place: Vec::new(),
            pending_cancel: Vec::new(),
            pending_update: Vec::new(),
            pending_replace: Vec::new(),
        }
    }

    #[must_use]
    pub fn market(&self) -> &Market {
        &*self.market
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        self.client
    }

    #[must_use]
    pub fn is_batched(&self) -> bool {
        self.batched
    }

    /// Mutations queued and not yet sent.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending_place.len()
            + self.pending_cancel.len()
            + self.pending_update.len()
            + self.pending_replace.len()
    }

    /// Register a trade in the market's blotter so orders can be created from it.
    pub fn add_trade(&mut self, trade: Trade) -> &mut Trade {
        self.market.blotter_mut().add_trade(trade)
    }

    pub fn trade_mut(&mut self, trade_id: &TradeId) -> Option<&mut Trade> {
        self.market.blotter_mut().trade_mut(trade_id)
    }

    /// Place a new order.
    ///
    /// A control rejection returns [`PlaceOutcome::Violation`] and leaves the
    /// blotter, the trade and the runner context untouched.
    ///
    /// # Errors
    ///
    /// Returns an [`OrderError`] if the order id is already in the blotter or
    /// its trade is unknown, and an [`ExecutionError`] if an immediate send fails.
    pub fn place_order(
        &mut self,
        mut order: Order,
        market_version: Option<u64>,
        force: bool,
    ) -> Result<PlaceOutcome> {
        let blotter = self.market.blotter();
        if blotter.contains(order.id()) {
            return Err(OrderError::DuplicateOrder {
                order_id: order.id().to_string(),
                market_id: self.market.market_id().to_string(),
            }
            .into());
        }
        if blotter.trade(order.trade_id()).is_none() {
            return Err(OrderError::UnknownTrade {
                trade_id: order.trade_id().to_string(),
                market_id: self.market.market_id().to_string(),
            }
            .into());
        }

        order.set_client(self.client.id().clone(), self.client.simulated());
        if !force {
            if let Err((control, violation)) = self.validate(&order, OrderPackageType::Place) {
                warn!(
                    order_id = %order.id(),
                    market_id = %self.market.market_id(),
                    control,
                    error = %violation,
                    "Order has violated a trading control"
                );
                order.violation(violation.to_string());
                if let Some(trade) = self.market.blotter_mut().trade_mut(order.trade_id()) {
                    trade.discard_order(order.id());
                }
                return Ok(PlaceOutcome::Violation(Box::new(order)));
            }
        }

        order.place(
            self.market.market_book().publish_time,
            market_version,
            self.config.async_place_orders,
            self.config.separator(),
        );
        let order_id = order.id().clone();
        let trade_id = order.trade_id().clone();
        let strategy = order.strategy().clone();
        let selection = order.selection();

        if let Some(trade) = self.market.blotter_mut().trade_mut(&trade_id) {
            trade.mark_live();
        }
        self.market
            .runner_context_mut(&strategy, selection)
            .place(&trade_id);
        self.market.blotter_mut().insert(order)?;
        self.queue(OrderPackageType::Place, order_id, market_version)?;
        Ok(PlaceOutcome::Placed)
    }

    /// Cancel an executable order, fully or by `size_reduction`.
    ///
    /// # Errors
    ///
    /// Returns an [`OrderError`] if the order is unknown or not executable.
    pub fn cancel_order(
        &mut self,
        order_id: &OrderId,
        size_reduction: Option<Size>,
        force: bool,
    ) -> Result<bool> {
        if !force && !self.validate_existing(order_id, OrderPackageType::Cancel)? {
            return Ok(false);
        }
        self.order_mut(order_id)?.cancel(size_reduction)?;
        self.queue(OrderPackageType::Cancel, order_id.clone(), None)?;
        Ok(true)
    }

    /// Change the persistence type of an executable limit order.
    ///
    /// # Errors
    ///
    /// Returns an [`OrderError`] if the order is unknown, not an executable
    /// limit order, or already has `persistence_type`.
    pub fn update_order(
        &mut self,
        order_id: &OrderId,
        persistence_type: PersistenceType,
        force: bool,
    ) -> Result<bool> {
        if !force && !self.validate_existing(order_id, OrderPackageType::Update)? {
            return Ok(false);
        }
        self.order_mut(order_id)?.update(persistence_type)?;
        self.queue(OrderPackageType::Update, order_id.clone(), None)?;
        Ok(true)
    }

    /// Replace an executable limit order at `new_price`.
    ///
    /// The replacement is a new order in the same trade, sized to the
    /// original's remaining size and carrying its context and notes. It is
    /// pending until the exchange confirms the replace.
    ///
    /// # Errors
    ///
    /// Returns an [`OrderError`] if the order is unknown or cannot be replaced.
    pub fn replace_order(
        &mut self,
        order_id: &OrderId,
        new_price: Price,
        market_version: Option<u64>,
        force: bool,
    ) -> Result<bool> {
        let original = self.order(order_id)?.clone();
        original.check_replace()?;
        let trade_id = original.trade_id().clone();

        let mut replacement = self
            .market
            .blotter_mut()
            .trade_mut(&trade_id)
            .ok_or_else(|| OrderError::UnknownTrade {
                trade_id: trade_id.to_string(),
                market_id: original.market_id().to_string(),
            })?
            .create_order_replacement(&original, new_price);

        if !force {
            if let Err((control, violation)) =
                self.validate(&replacement, OrderPackageType::Replace)
            {
                warn!(
                    order_id = %order_id,
                    market_id = %self.market.market_id(),
                    control,
                    error = %violation,
                    "Replace has violated a trading control"
                );
                if let Some(trade) = self.market.blotter_mut().trade_mut(&trade_id) {
                    trade.discard_order(replacement.id());
                }
                self.order_mut(order_id)?
                    .set_violation_msg(violation.to_string());
                return Ok(false);
            }
        }

        self.order_mut(order_id)?
            .replace(new_price, replacement.id().clone())?;
        replacement.place(
            self.market.market_book().publish_time,
            market_version,
            self.config.async_place_orders,
            self.config.separator(),
        );
        self.market.blotter_mut().insert(replacement)?;
        self.queue(OrderPackageType::Replace, order_id.clone(), market_version)?;
        Ok(true)
    }

    /// Send every queued mutation.
    ///
    /// Each package type is grouped by market version in request order and
    /// split into packages of at most the configured limit.
    ///
    /// Returns the number of packages sent.
    ///
    /// # Errors
    ///
    /// Returns the first error from the client's executor. The package that
    /// failed and every package after it stay queued for the next `execute`.
    pub fn execute(&mut self) -> std::result::Result<usize, ExecutionError> {
        let queued = [
            (OrderPackageType::Place, mem::take(&mut self.pending_place)),
            (OrderPackageType::Cancel, mem::take(&mut self.pending_cancel)),
            (OrderPackageType::Update, mem::take(&mut self.pending_update)),
            (OrderPackageType::Replace, mem::take(&mut self.pending_replace)),
        ];

        let mut batches: Vec<(OrderPackageType, Option<u64>, Vec<OrderId>)> = Vec::new();
        for (package_type, pending) in queued {
            let limit = self.config.limit(package_type).max(1);
            for (market_version, order_ids) in group_by_version(pending) {
                batches.extend(
                    order_ids
                        .chunks(limit)
                        .map(|chunk| (package_type, market_version, chunk.to_vec())),
                );
            }
        }

        let mut sent = 0;
        let mut batches = batches.into_iter();
        while let Some((package_type, market_version, order_ids)) = batches.next() {
            let orders: Vec<Order> = order_ids
                .iter()
                .filter_map(|id| self.market.blotter().get(id).cloned())
                .collect();
            if orders.is_empty() {
                continue;
            }
            let package = OrderPackage::new(
                self.client.id().clone(),
                self.market.market_id().clone(),
                package_type,
                orders,
                market_version,
                self.market.market_book().bet_delay,
                self.config.async_place_orders,
            );
            debug!(
                package_id = %package.id(),
                market_id = %package.market_id(),
                package_type = %package_type,
                orders = package.len(),
                "Sending order package"
            );
            if let Err(err) = self.client.executor().execute(package) {
                self.requeue(package_type, market_version, order_ids);
                for (package_type, market_version, order_ids) in batches.by_ref() {
                    self.requeue(package_type, market_version, order_ids);
                }
                warn!(
                    market_id = %self.market.market_id(),
                    client_id = %self.client.id(),
                    sent,
                    pending = self.pending(),
                    error = %err,
                    "Order package failed, unsent orders kept pending"
                );
                return Err(err);
            }
            sent += 1;
        }
        Ok(sent)
    }

    fn pending_mut(&mut self, package_type: OrderPackageType) -> &mut Pending {
        match package_type {
            OrderPackageType::Place => &mut self.pending_place,
            OrderPackageType::Cancel => &mut self.pending_cancel,
            OrderPackageType::Update => &mut self.pending_update,
            OrderPackageType::Replace => &mut self.pending_replace,
        }
    }

    fn requeue(
        &mut self,
        package_type: OrderPackageType,
        market_version: Option<u64>,
        order_ids: Vec<OrderId>,
    ) {
        self.pending_mut(package_type)
            .extend(order_ids.into_iter().map(|id| (id, market_version)));
    }

    fn queue(
        &mut self,
        package_type: OrderPackageType,
        order_id: OrderId,
        market_version: Option<u64>,
    ) -> std::result::Result<(), ExecutionError> {
        self.pending_mut(package_type).push((order_id, market_version));
        if !self.batched {
            self.execute()?;
        }
        Ok(())
    }

    fn validate(
        &self,
        order: &Order,
        package_type: OrderPackageType,
    ) -> std::result::Result<(), (&'static str, ControlError)> {
        let request = ControlRequest {
            order,
            market: &*self.market,
            strategy: self.strategy,
            package_type,
        };
        validate_all(
            self.controls.iter().chain(self.client.controls()),
            &request,
        )
    }

    /// Run the controls for a mutation of an order already in the blotter.
    ///
    /// A violation is recorded on the order without changing its status.
    fn validate_existing(
        &mut self,
        order_id: &OrderId,
        package_type: OrderPackageType,
    ) -> Result<bool> {
        let Err((control, violation)) = self.validate(self.order(order_id)?, package_type) else {
            return Ok(true);
        };
        warn!(
            order_id = %order_id,
            market_id = %self.market.market_id(),
            control,
            package_type = %package_type,
            error = %violation,
            "Order mutation has violated a trading control"
        );
        self.order_mut(order_id)?
            .set_violation_msg(violation.to_string());
        Ok(false)
    }

    fn order(&self, order_id: &OrderId) -> std::result::Result<&Order, OrderError> {
        self.market
            .blotter()
            .get(order_id)
            .ok_or_else(|| OrderError::UnknownOrder {
                order_id: order_id.to_string(),
                market_id: self.market.market_id().to_string(),
            })
    }

    fn order_mut(&mut self, order_id: &OrderId) -> std::result::Result<&mut Order, OrderError> {
        let market_id = self.market.market_id().to_string();
        self.market
            .blotter_mut()
            .get_mut(order_id)
            .ok_or_else(|| OrderError::UnknownOrder {
                order_id: order_id.to_string(),
                market_id,
            })
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.pending() == 0 {
            return;
        }
        if let Err(err) = self.execute() {
            error!(
                market_id = %self.market.market_id(),
                client_id = %self.client.id(),
                error = %err,
                "Failed to execute pending orders on transaction close"
            );
        }
    }
}

/// Group pending mutations by market version, keeping first-seen order.
fn group_by_version(pending: Pending) -> Vec<(Option<u64>, Vec<OrderId>)> {
    let mut groups: Vec<(Option<u64>, Vec<OrderId>)> = Vec::new();
    for (order_id, market_version) in pending {
        match groups.iter_mut().find(|(version, _)| *version == market_version) {
            Some((_, order_ids)) => order_ids.push(order_id),
            None => groups.push((market_version, vec![order_id])),
        }
    }
    groups
}
