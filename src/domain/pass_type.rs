//! Pass types (ticket tiers) with quantity and sale-window rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EventId, PassTypeId};
use crate::error::ServerError;

/// A purchasable pass definition nested under an event.
///
/// `sold` only ever increases; cancellations do not return quantity to the
/// pool. Prices are integer minor units (paise), with `0` meaning a free
/// pass that skips the payment leg entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassType {
    /// Pass type identifier.
    pub id: PassTypeId,
    /// Owning event.
    pub event_id: EventId,
    /// Display name, e.g. `"Early Bird"`.
    pub name: String,
    /// Price in minor units. `0` = free.
    pub price: u32,
    /// Maximum sellable quantity. `None` = unlimited.
    pub quantity: Option<u32>,
    /// Monotonic count of confirmed sales.
    pub sold: u32,
    /// Whether the pass currently accepts registrations at all.
    pub is_active: bool,
    /// Optional sale-window start.
    pub sale_start: Option<DateTime<Utc>>,
    /// Optional sale-window end.
    pub sale_end: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl PassType {
    /// Creates a new active pass type for an event.
    #[must_use]
    pub fn new(event_id: EventId, name: impl Into<String>, price: u32) -> Self {
        Self {
            id: PassTypeId::new(),
            event_id,
            name: name.into(),
            price,
            quantity: None,
            sold: 0,
            is_active: true,
            sale_start: None,
            sale_end: None,
            created_at: Utc::now(),
        }
    }

    /// Returns `true` when all quantity has been sold.
    #[must_use]
    pub fn is_sold_out(&self) -> bool {
        match self.quantity {
            Some(q) => self.sold >= q,
            None => false,
        }
    }

    /// Returns `true` if `at` falls inside the sale window (both bounds
    /// optional and inclusive of the start, exclusive of the end).
    #[must_use]
    pub fn within_sale_window(&self, at: DateTime<Utc>) -> bool {
        if let Some(start) = self.sale_start
            && at < start
        {
            return false;
        }
        if let Some(end) = self.sale_end
            && at >= end
        {
            return false;
        }
        true
    }

    /// Checks that this pass can accept a new registration at `at`.
    ///
    /// # Errors
    ///
    /// - [`ServerError::InvalidRequest`] when inactive or outside the
    ///   sale window.
    /// - [`ServerError::SoldOut`] when quantity is exhausted.
    pub fn check_purchasable(&self, at: DateTime<Utc>) -> Result<(), ServerError> {
        if !self.is_active {
            return Err(ServerError::InvalidRequest(format!(
                "pass '{}' is not on sale",
                self.name
            )));
        }
        if !self.within_sale_window(at) {
            return Err(ServerError::InvalidRequest(format!(
                "pass '{}' is outside its sale window",
                self.name
            )));
        }
        if self.is_sold_out() {
            return Err(ServerError::SoldOut);
        }
        Ok(())
    }

    /// Returns `true` if the pass is free of charge.
    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.price == 0
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn make_pass() -> PassType {
        PassType::new(EventId::new(), "General", 15_000)
    }

    #[test]
    fn unlimited_pass_never_sells_out() {
        let mut pass = make_pass();
        pass.sold = 1_000_000;
        assert!(!pass.is_sold_out());
        assert!(pass.check_purchasable(Utc::now()).is_ok());
    }

    #[test]
    fn quantity_exhaustion_yields_sold_out() {
        let mut pass = make_pass();
        pass.quantity = Some(1);
        pass.sold = 1;
        let err = pass.check_purchasable(Utc::now());
        assert!(matches!(err, Err(ServerError::SoldOut)));
    }

    #[test]
    fn inactive_pass_rejects() {
        let mut pass = make_pass();
        pass.is_active = false;
        assert!(pass.check_purchasable(Utc::now()).is_err());
    }

    #[test]
    fn sale_window_is_enforced() {
        let now = Utc::now();
        let mut pass = make_pass();
        pass.sale_start = Some(now + Duration::hours(1));
        assert!(!pass.within_sale_window(now));

        pass.sale_start = Some(now - Duration::hours(2));
        pass.sale_end = Some(now - Duration::hours(1));
        assert!(!pass.within_sale_window(now));

        pass.sale_end = Some(now + Duration::hours(1));
        assert!(pass.within_sale_window(now));
    }

    #[test]
    fn zero_price_is_free() {
        let pass = PassType::new(EventId::new(), "Community", 0);
        assert!(pass.is_free());
        assert!(!make_pass().is_free());
    }
}
