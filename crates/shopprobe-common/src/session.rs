use crate::error::{ProbeError, Result};
use crate::extract::EntityId;

/// State accumulated across one run of a dependent chain.
///
/// Every slot is write-once: a step may only read slots filled by earlier
/// steps, and nothing overwrites what an earlier step recorded.
#[derive(Debug, Default)]
pub struct SessionContext {
    token: Option<String>,
    user_id: Option<EntityId>,
    category_id: Option<EntityId>,
    product_id: Option<EntityId>,
    order_id: Option<EntityId>,
    order_number: Option<String>,
    purchase: Option<Purchase>,
}

/// What the chain bought, recorded so the verifier can derive its expectations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Purchase {
    pub initial_stock: u32,
    pub quantity: u32,
}

impl Purchase {
    pub fn expected_stock(&self) -> i64 {
        i64::from(self.initial_stock) - i64::from(self.quantity)
    }
}

fn fill<T>(slot: &mut Option<T>, name: &'static str, value: T) -> Result<()> {
    if slot.is_some() {
        return Err(ProbeError::ContextAlreadySet { slot: name });
    }
    *slot = Some(value);
    Ok(())
}

fn read<'a, T>(slot: &'a Option<T>, name: &'static str) -> Result<&'a T> {
    slot.as_ref().ok_or(ProbeError::MissingContext { slot: name })
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_token(&mut self, token: String) -> Result<()> {
        fill(&mut self.token, "token", token)
    }

    pub fn token(&self) -> Result<&str> {
        read(&self.token, "token").map(String::as_str)
    }

    pub fn set_user_id(&mut self, id: EntityId) -> Result<()> {
        fill(&mut self.user_id, "user_id", id)
    }

    pub fn user_id(&self) -> Result<&EntityId> {
        read(&self.user_id, "user_id")
    }

    pub fn set_category_id(&mut self, id: EntityId) -> Result<()> {
        fill(&mut self.category_id, "category_id", id)
    }

    pub fn category_id(&self) -> Result<&EntityId> {
        read(&self.category_id, "category_id")
    }

    pub fn set_product_id(&mut self, id: EntityId) -> Result<()> {
        fill(&mut self.product_id, "product_id", id)
    }

    pub fn product_id(&self) -> Result<&EntityId> {
        read(&self.product_id, "product_id")
    }

    pub fn set_order_id(&mut self, id: EntityId) -> Result<()> {
        fill(&mut self.order_id, "order_id", id)
    }

    pub fn order_id(&self) -> Result<&EntityId> {
        read(&self.order_id, "order_id")
    }

    pub fn set_order_number(&mut self, number: String) -> Result<()> {
        fill(&mut self.order_number, "order_number", number)
    }

    /// Display number is optional: some checkout responses omit it.
    pub fn order_number(&self) -> Option<&str> {
        self.order_number.as_deref()
    }

    pub fn set_purchase(&mut self, purchase: Purchase) -> Result<()> {
        fill(&mut self.purchase, "purchase", purchase)
    }

    pub fn purchase(&self) -> Result<Purchase> {
        read(&self.purchase, "purchase").copied()
    }
}
